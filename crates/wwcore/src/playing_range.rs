//! Reactance root-finding: exponential bracket expansion followed by
//! Brent's method refinement (spec §4.8).

use crate::calculator::InstrumentCalculator;
use crate::error::{CoreResult, NoPlayingRange};
use crate::instrument::Fingering;

/// Total bracket span, in octaves, before giving up.
const MAX_BRACKET_OCTAVES: f64 = 8.0;

/// Successive expansion factors: an initial doubling, then smaller
/// geometric steps so the bracket doesn't overshoot by a large margin.
const EXPANSION_FACTORS: &[f64] = &[2.0, 1.5, 1.25, 1.125];

const RELATIVE_TOLERANCE: f64 = 1e-6;
const ABSOLUTE_TOLERANCE: f64 = 1e-14;

/// Root-finds a scalar shape function of frequency, seeded at a guess
/// frequency, for one fingering of one instrument.
pub struct PlayingRange<'a, 'b> {
    calc: &'a InstrumentCalculator<'a>,
    fingering: &'b Fingering,
}

impl<'a, 'b> PlayingRange<'a, 'b> {
    pub fn new(calc: &'a InstrumentCalculator<'a>, fingering: &'b Fingering) -> Self {
        Self { calc, fingering }
    }

    /// Finds the frequency near `seed_hz` where `Im(Z) = 0` and `Re(Z) > 0`.
    /// Im(Z) also crosses zero at anti-resonances, where Re(Z) is small or
    /// negative; those crossings are skipped rather than returned.
    pub fn find_resonance(&self, seed_hz: f64) -> CoreResult<f64> {
        self.find_x(seed_hz, 0.0)
    }

    /// Finds the frequency near `seed_hz` where `Im(Z) = target` and
    /// `Re(Z) > 0`.
    pub fn find_x(&self, seed_hz: f64, target: f64) -> CoreResult<f64> {
        let shape = |f: f64| self.calc.reactance(f, self.fingering) - target;
        let resistance = |f: f64| self.calc.calc_z(f, self.fingering).re;
        bracket_and_refine(shape, resistance, seed_hz)
    }

    /// Finds the frequency near `seed_hz` where `Im(Z)/Re(Z) = ratio` and
    /// `Re(Z) > 0`.
    pub fn find_z_ratio(&self, seed_hz: f64, ratio: f64) -> CoreResult<f64> {
        let shape = |f: f64| {
            let z = self.calc.calc_z(f, self.fingering);
            z.im / z.re - ratio
        };
        let resistance = |f: f64| self.calc.calc_z(f, self.fingering).re;
        bracket_and_refine(shape, resistance, seed_hz)
    }
}

/// Expands a bracket around `seed_hz` until the shape function changes
/// sign on the resistive-positive branch (`Re(Z) > 0`), then refines the
/// root with [`brent_root`] and re-checks `Re(Z) > 0` at the converged
/// root. A sign change where `resistance` is non-positive is an
/// anti-resonance, not a playing frequency (spec §4.8); expansion keeps
/// looking past it. Any non-finite shape value, or failure to bracket
/// within [`MAX_BRACKET_OCTAVES`], reports [`NoPlayingRange`].
fn bracket_and_refine(
    f: impl Fn(f64) -> f64,
    resistance: impl Fn(f64) -> f64,
    seed_hz: f64,
) -> CoreResult<f64> {
    if !seed_hz.is_finite() || seed_hz <= 0.0 {
        return Err(NoPlayingRange { seed_hz }.into());
    }

    let f_seed = f(seed_hz);
    if !f_seed.is_finite() {
        return Err(NoPlayingRange { seed_hz }.into());
    }
    if f_seed.abs() < ABSOLUTE_TOLERANCE {
        return if resistance(seed_hz) > 0.0 { Ok(seed_hz) } else { Err(NoPlayingRange { seed_hz }.into()) };
    }
    let seed_sign = f_seed.signum();

    let mut lo = seed_hz;
    let mut hi = seed_hz;
    let mut f_lo = f_seed;
    let mut f_hi = f_seed;

    let mut factor_index = 0usize;
    loop {
        if (hi / lo).log2() > MAX_BRACKET_OCTAVES {
            return Err(NoPlayingRange { seed_hz }.into());
        }
        let factor = EXPANSION_FACTORS[factor_index.min(EXPANSION_FACTORS.len() - 1)];
        factor_index += 1;

        let new_hi = hi * factor;
        let f_new_hi = f(new_hi);
        if !f_new_hi.is_finite() {
            return Err(NoPlayingRange { seed_hz }.into());
        }
        if f_new_hi.signum() != seed_sign && resistance(new_hi) > 0.0 {
            let root = brent_root(&f, hi, new_hi, f_hi, f_new_hi, seed_hz)?;
            return if resistance(root) > 0.0 { Ok(root) } else { Err(NoPlayingRange { seed_hz }.into()) };
        }
        hi = new_hi;
        f_hi = f_new_hi;

        let new_lo = lo / factor;
        if new_lo <= 0.0 {
            continue;
        }
        let f_new_lo = f(new_lo);
        if !f_new_lo.is_finite() {
            return Err(NoPlayingRange { seed_hz }.into());
        }
        if f_new_lo.signum() != seed_sign && resistance(new_lo) > 0.0 {
            let root = brent_root(&f, new_lo, lo, f_new_lo, f_lo, seed_hz)?;
            return if resistance(root) > 0.0 { Ok(root) } else { Err(NoPlayingRange { seed_hz }.into()) };
        }
        lo = new_lo;
        f_lo = f_new_lo;
    }
}

/// Brent's method: inverse-quadratic / secant / bisection hybrid root
/// finder, given a bracket `[a, b]` with `f(a)` and `f(b)` of opposite
/// sign.
#[allow(clippy::too_many_arguments)]
fn brent_root(
    f: impl Fn(f64) -> f64,
    mut a: f64,
    mut b: f64,
    mut fa: f64,
    mut fb: f64,
    seed_hz: f64,
) -> CoreResult<f64> {
    if fa.abs() < fb.abs() {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut c = a;
    let mut fc = fa;
    let mut mflag = true;
    let mut d = a;

    for _ in 0..200 {
        if fb.abs() < ABSOLUTE_TOLERANCE || (b - a).abs() < RELATIVE_TOLERANCE * b.abs().max(1.0) {
            return Ok(b);
        }

        let s = if fa != fc && fb != fc {
            // Inverse quadratic interpolation.
            a * fb * fc / ((fa - fb) * (fa - fc))
                + b * fa * fc / ((fb - fa) * (fb - fc))
                + c * fa * fb / ((fc - fa) * (fc - fb))
        } else {
            // Secant.
            b - fb * (b - a) / (fb - fa)
        };

        let bisection_mid = (a + b) / 2.0;
        let use_bisection = !(s > b.min(bisection_mid) && s < b.max(bisection_mid) || s > bisection_mid.min(b) && s < bisection_mid.max(b))
            || (mflag && (s - b).abs() >= (b - c).abs() / 2.0)
            || (!mflag && (s - b).abs() >= (c - d).abs() / 2.0);

        let s = if use_bisection { bisection_mid } else { s };
        mflag = use_bisection;

        let fs = f(s);
        if !fs.is_finite() {
            return Err(NoPlayingRange { seed_hz }.into());
        }

        d = c;
        c = b;
        fc = fb;

        if fa.signum() != fs.signum() {
            b = s;
            fb = fs;
        } else {
            a = s;
            fa = fs;
        }

        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }
    }
    let _ = d;
    Ok(b)
}

//! Brent's method for 1-D minimization (golden-section / parabolic-fit
//! hybrid), used as the line search inside [`super::powell`].
//!
//! This is a different classical algorithm from the inverse-quadratic
//! root finder of the same name in `playing_range.rs`: that one brackets
//! a sign change and converges on a zero; this one brackets a minimum and
//! converges on a stationary point.

const GOLDEN_RATIO_COMPLEMENT: f64 = 0.3819660112501051;
const MAX_ITERATIONS: usize = 100;
const TINY: f64 = 1e-12;

/// Minimizes `f` over `[lo, hi]`, returning `(x_min, f_min)`.
pub fn minimize(mut f: impl FnMut(f64) -> f64, lo: f64, hi: f64, tolerance: f64) -> (f64, f64) {
    let (mut a, mut b) = if lo < hi { (lo, hi) } else { (hi, lo) };

    let mut x = a + GOLDEN_RATIO_COMPLEMENT * (b - a);
    let mut w = x;
    let mut v = x;
    let mut fx = f(x);
    let mut fw = fx;
    let mut fv = fx;

    let mut d: f64 = 0.0;
    let mut e: f64 = 0.0;

    for _ in 0..MAX_ITERATIONS {
        let mid = 0.5 * (a + b);
        let tol1 = tolerance * x.abs() + TINY;
        let tol2 = 2.0 * tol1;

        if (x - mid).abs() <= tol2 - 0.5 * (b - a) {
            return (x, fx);
        }

        let mut use_golden = true;
        if e.abs() > tol1 {
            // Parabolic fit through (v, fv), (w, fw), (x, fx).
            let r = (x - w) * (fx - fv);
            let q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * r;
            let mut q2 = 2.0 * (q - r);
            if q2 > 0.0 {
                p = -p;
            }
            q2 = q2.abs();
            let e_prev = e;
            e = d;

            if p.abs() < (0.5 * q2 * e_prev).abs() && p > q2 * (a - x) && p < q2 * (b - x) {
                d = p / q2;
                let u = x + d;
                if u - a < tol2 || b - u < tol2 {
                    d = if mid >= x { tol1 } else { -tol1 };
                }
                use_golden = false;
            }
        }

        if use_golden {
            e = if x >= mid { a - x } else { b - x };
            d = GOLDEN_RATIO_COMPLEMENT * e;
        }

        let u = if d.abs() >= tol1 { x + d } else if d >= 0.0 { x + tol1 } else { x - tol1 };
        let fu = f(u);

        if fu <= fx {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            v = w;
            fv = fw;
            w = x;
            fw = fx;
            x = u;
            fx = fu;
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                fv = fw;
                w = u;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
    }
    (x, fx)
}

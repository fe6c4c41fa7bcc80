//! Bounded derivative-free optimization: DIRECT global search and
//! Powell+Brent local polish, with multi-start and bound handling
//! (spec §4.11).

pub mod brent;
pub mod direct;
pub mod powell;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

use crate::instrument::{CalculatorKind, Instrument, Tuning};
use crate::objective::{Evaluator, ObjectiveFunction};
use crate::physics::PhysicalParameters;

/// Cooperative cancellation flag. Checked at the top of each outer
/// iteration and between multi-start rounds; never forcibly interrupts a
/// running evaluation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Snapshot passed to the optional progress callback after each optimizer
/// iteration or multi-start round. Must not be used to mutate optimizer
/// state; it is a read-only report.
#[derive(Debug, Clone, Copy)]
pub struct OptimizerProgress {
    pub iteration: usize,
    pub best_value: f64,
    pub evaluations: usize,
}

pub type ProgressCallback<'a> = dyn Fn(&OptimizerProgress) + Send + Sync + 'a;

pub struct OptimizerOptions<'a> {
    pub evaluation_budget: usize,
    pub relative_tolerance: f64,
    pub absolute_tolerance: f64,
    pub force_direct_optimizer: bool,
    pub multi_start_count: usize,
    pub seed: u64,
    pub cancellation_token: Option<CancellationToken>,
    pub progress_callback: Option<Box<ProgressCallback<'a>>>,
}

impl<'a> Default for OptimizerOptions<'a> {
    fn default() -> Self {
        Self {
            evaluation_budget: 1000,
            relative_tolerance: 1e-8,
            absolute_tolerance: 1e-10,
            force_direct_optimizer: false,
            multi_start_count: 1,
            seed: 0,
            cancellation_token: None,
            progress_callback: None,
        }
    }
}

impl<'a> OptimizerOptions<'a> {
    pub(super) fn is_cancelled(&self) -> bool {
        self.cancellation_token.as_ref().map(|t| t.is_cancelled()).unwrap_or(false)
    }

    pub(super) fn report_progress(&self, iteration: usize, best_value: f64, evaluations: usize) {
        if let Some(cb) = &self.progress_callback {
            cb(&OptimizerProgress { iteration, best_value, evaluations });
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimizerReport {
    pub initial_error: f64,
    pub final_error: f64,
    pub evaluations: usize,
    pub success: bool,
    pub elapsed: Duration,
    pub final_x: Vec<f64>,
    pub final_instrument: Instrument,
}

/// Evaluates `x` against a fixed objective/physics/tuning context,
/// clamped to the bound box, counting evaluations as it goes.
pub(super) struct ScoredContext<'a> {
    pub(super) objective: &'a dyn ObjectiveFunction,
    pub(super) template: &'a Instrument,
    pub(super) params: &'a PhysicalParameters,
    pub(super) calculator_kind: CalculatorKind,
    pub(super) tuning: &'a Tuning,
    pub(super) evaluator: &'a dyn Evaluator,
    pub(super) bounds: &'a [(f64, f64)],
    pub(super) evaluations: usize,
}

impl<'a> ScoredContext<'a> {
    pub(super) fn dimension(&self) -> usize {
        self.bounds.len()
    }

    pub(super) fn bounds(&self) -> &[(f64, f64)] {
        self.bounds
    }

    pub(super) fn evaluations(&self) -> usize {
        self.evaluations
    }

    fn project(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.bounds.iter())
            .map(|(&v, &(lo, hi))| v.clamp(lo, hi))
            .collect()
    }

    pub(super) fn score(&mut self, x: &[f64]) -> f64 {
        self.evaluations += 1;
        let projected = self.project(x);
        let value = self.objective.evaluate(
            &projected,
            self.template,
            self.params,
            self.calculator_kind,
            self.tuning,
            self.evaluator,
        );
        // The optimizer treats NaN (arithmetic failure / invalid decode)
        // as +infinity so search continues toward feasible regions.
        if value.is_nan() {
            f64::INFINITY
        } else {
            value
        }
    }
}

/// Draws `count` seed points inside the bound box via Latin-hypercube
/// sampling (one independently shuffled stratum permutation per
/// dimension) from a deterministically-seeded PRNG, so multi-start seed
/// distribution is reproducible given the caller's seed (spec §4.11, §5).
fn multi_start_seeds(bounds: &[(f64, f64)], count: usize, seed: u64) -> Vec<Vec<f64>> {
    if count == 0 {
        return Vec::new();
    }
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let strata: Vec<Vec<usize>> = bounds
        .iter()
        .map(|_| {
            let mut idx: Vec<usize> = (0..count).collect();
            for i in (1..count).rev() {
                let j = rng.gen_range(0..=i);
                idx.swap(i, j);
            }
            idx
        })
        .collect();
    (0..count)
        .map(|sample| {
            bounds
                .iter()
                .enumerate()
                .map(|(dim, &(lo, hi))| {
                    let stratum = strata[dim][sample];
                    let within: f64 = rng.gen_range(0.0..1.0);
                    let frac = (stratum as f64 + within) / count as f64;
                    lo + frac * (hi - lo)
                })
                .collect()
        })
        .collect()
}

/// Runs the configured optimizer strategy from `initial_x`, optionally
/// with multiple random restarts, and returns the best result found.
#[allow(clippy::too_many_arguments)]
pub fn optimize(
    objective: &dyn ObjectiveFunction,
    template: &Instrument,
    params: &PhysicalParameters,
    calculator_kind: CalculatorKind,
    tuning: &Tuning,
    evaluator: &dyn Evaluator,
    bounds: &[(f64, f64)],
    initial_x: &[f64],
    options: &OptimizerOptions,
) -> OptimizerReport {
    let started = Instant::now();
    let mut ctx = ScoredContext {
        objective,
        template,
        params,
        calculator_kind,
        tuning,
        evaluator,
        bounds,
        evaluations: 0,
    };
    let initial_error = ctx.score(initial_x);

    let starts: Vec<Vec<f64>> = if options.multi_start_count > 1 {
        let mut seeds = multi_start_seeds(bounds, options.multi_start_count - 1, options.seed);
        seeds.insert(0, initial_x.to_vec());
        seeds
    } else {
        vec![initial_x.to_vec()]
    };

    let mut best_x = initial_x.to_vec();
    let mut best_value = initial_error;
    let mut success = false;

    for (round, start) in starts.iter().enumerate() {
        if options.is_cancelled() {
            break;
        }
        let (x, value, round_success) = run_single_start(&mut ctx, start, options);
        if value < best_value {
            best_value = value;
            best_x = x;
        }
        success = success || round_success;
        options.report_progress(round, best_value, ctx.evaluations);
        if ctx.evaluations >= options.evaluation_budget {
            break;
        }
    }

    let final_instrument = objective.decode(&ctx.project(&best_x), template);
    OptimizerReport {
        initial_error,
        final_error: best_value,
        evaluations: ctx.evaluations,
        success: success && !options.is_cancelled(),
        elapsed: started.elapsed(),
        final_x: best_x,
        final_instrument,
    }
}

fn run_single_start(
    ctx: &mut ScoredContext,
    start: &[f64],
    options: &OptimizerOptions,
) -> (Vec<f64>, f64, bool) {
    if options.force_direct_optimizer {
        let (x_direct, _value_direct) = direct::run(ctx, options);
        powell::run(ctx, &x_direct, options)
    } else {
        powell::run(ctx, start, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{
        BorePoint, Fingering, Hole, Mouthpiece, MouthpieceKind, NoteTarget, Termination,
    };
    use crate::objective::catalog::BoreLengthObjectiveFunction;
    use crate::objective::CentDeviationEvaluator;

    fn whistle() -> Instrument {
        Instrument {
            name: "whistle".into(),
            mouthpiece: Mouthpiece {
                position: 0.0,
                kind: MouthpieceKind::Fipple {
                    window_length: 0.010,
                    window_width: 0.008,
                    windway_height: 0.003,
                    fipple_factor: 1.0,
                },
            },
            bore: vec![
                BorePoint { position: 0.0, diameter: 0.016 },
                BorePoint { position: 0.300, diameter: 0.016 },
            ],
            holes: vec![Hole { position: 0.150, diameter: 0.008, height: 0.003, key: None }],
            termination: Termination { flange_diameter: 0.0 },
        }
    }

    fn tuning_with_target() -> Tuning {
        Tuning {
            name: "t".into(),
            hole_count: 1,
            fingerings: vec![Fingering {
                name: "all closed".into(),
                note: Some(NoteTarget { target_frequency: 300.0, min_frequency: None, max_frequency: None }),
                open: vec![false],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn multi_start_seeds_stay_within_bounds() {
        let bounds = vec![(0.1, 0.6), (-1.0, 1.0)];
        let seeds = multi_start_seeds(&bounds, 5, 42);
        assert_eq!(seeds.len(), 5);
        for seed in &seeds {
            assert!(seed[0] >= 0.1 && seed[0] <= 0.6);
            assert!(seed[1] >= -1.0 && seed[1] <= 1.0);
        }
    }

    #[test]
    fn multi_start_seeds_are_deterministic_given_same_seed() {
        let bounds = vec![(0.0, 1.0)];
        let a = multi_start_seeds(&bounds, 4, 7);
        let b = multi_start_seeds(&bounds, 4, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn optimize_never_returns_worse_than_initial_error() {
        let inst = whistle();
        let objective = BoreLengthObjectiveFunction;
        let params = PhysicalParameters::default();
        let tuning = tuning_with_target();
        let evaluator = CentDeviationEvaluator;
        let bounds = vec![(0.1, 0.6)];
        let initial_x = vec![0.15];

        let options = OptimizerOptions { evaluation_budget: 300, ..Default::default() };
        let report = optimize(
            &objective,
            &inst,
            &params,
            CalculatorKind::Auto,
            &tuning,
            &evaluator,
            &bounds,
            &initial_x,
            &options,
        );
        assert!(report.final_error <= report.initial_error + 1e-9);
        assert!(report.evaluations > 0);
    }

    #[test]
    fn cancelled_token_stops_before_multi_start_rounds_complete() {
        let inst = whistle();
        let objective = BoreLengthObjectiveFunction;
        let params = PhysicalParameters::default();
        let tuning = tuning_with_target();
        let evaluator = CentDeviationEvaluator;
        let bounds = vec![(0.1, 0.6)];
        let initial_x = vec![0.15];

        let token = CancellationToken::new();
        token.cancel();
        let options = OptimizerOptions {
            evaluation_budget: 300,
            multi_start_count: 4,
            cancellation_token: Some(token),
            ..Default::default()
        };
        let report = optimize(
            &objective,
            &inst,
            &params,
            CalculatorKind::Auto,
            &tuning,
            &evaluator,
            &bounds,
            &initial_x,
            &options,
        );
        assert!(!report.success);
    }
}

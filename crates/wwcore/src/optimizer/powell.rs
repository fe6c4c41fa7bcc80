//! Powell's conjugate-direction method with a bounded Brent line search
//! (spec §4.11 local polish phase).

use super::brent;
use super::{OptimizerOptions, ScoredContext};

const MAX_CYCLES: usize = 200;

/// A direction shorter than this is treated as null and skipped by the
/// line search.
const NULL_DIRECTION_NORM: f64 = 1e-20;

/// Runs Powell's method from `start`, staying within `ctx`'s bound box,
/// until the evaluation budget is spent or successive cycles fail to
/// improve the objective by more than the configured tolerances.
///
/// Returns `(best_x, best_value, converged)`.
pub fn run(ctx: &mut ScoredContext, start: &[f64], options: &OptimizerOptions) -> (Vec<f64>, f64, bool) {
    let n = ctx.dimension();
    let mut point = ctx.project(start);
    let mut value = ctx.score(&point);

    let mut directions: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let mut e = vec![0.0; n];
            e[i] = 1.0;
            e
        })
        .collect();

    let mut converged = false;

    for cycle in 0..MAX_CYCLES {
        if options.is_cancelled() || ctx.evaluations() >= options.evaluation_budget {
            break;
        }
        let value_at_cycle_start = value;
        let point_at_cycle_start = point.clone();

        let mut largest_decrease = 0.0;
        let mut largest_decrease_index = 0;

        for (i, direction) in directions.iter().enumerate() {
            if ctx.evaluations() >= options.evaluation_budget {
                break;
            }
            let norm = direction.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm < NULL_DIRECTION_NORM {
                continue;
            }
            let value_before = value;
            let (new_point, new_value) = line_search(ctx, &point, direction);
            point = new_point;
            value = new_value;
            let decrease = value_before - value;
            if decrease > largest_decrease {
                largest_decrease = decrease;
                largest_decrease_index = i;
            }
        }

        let improvement = value_at_cycle_start - value;
        options.report_progress(cycle, value, ctx.evaluations());
        if improvement.abs() <= options.absolute_tolerance
            || improvement.abs() <= options.relative_tolerance * value_at_cycle_start.abs().max(1.0)
        {
            converged = true;
            break;
        }

        // Extrapolated point and Powell's replacement test: only adopt the
        // new conjugate direction if it actually buys a real decrease,
        // avoiding directions that merely retrace prior progress.
        let extrapolated: Vec<f64> =
            (0..n).map(|i| 2.0 * point[i] - point_at_cycle_start[i]).collect();
        let extrapolated = ctx.project(&extrapolated);
        let value_extrapolated = ctx.score(&extrapolated);

        if value_extrapolated < value_at_cycle_start {
            let overall_decrease = value_at_cycle_start - value_extrapolated;
            let t = 2.0 * (value_at_cycle_start - 2.0 * value + value_extrapolated)
                * (value_at_cycle_start - value - largest_decrease).powi(2)
                - largest_decrease * overall_decrease.powi(2);
            if t < 0.0 {
                let new_direction: Vec<f64> =
                    (0..n).map(|i| point[i] - point_at_cycle_start[i]).collect();
                let norm = new_direction.iter().map(|v| v * v).sum::<f64>().sqrt();
                if norm > NULL_DIRECTION_NORM {
                    let (final_point, final_value) = line_search(ctx, &point, &new_direction);
                    point = final_point;
                    value = final_value;
                    directions[largest_decrease_index] = new_direction;
                }
            }
        }
    }

    (point, value, converged)
}

/// Minimizes `f(point + t * direction)` over the range of `t` that keeps
/// `point + t * direction` inside the bound box, using Brent's method.
fn line_search(ctx: &mut ScoredContext, point: &[f64], direction: &[f64]) -> (Vec<f64>, f64) {
    let n = point.len();
    let (mut t_lo, mut t_hi) = (-1.0_f64, 1.0_f64);
    for i in 0..n {
        if direction[i].abs() < 1e-15 {
            continue;
        }
        let (lo_bound, hi_bound) = ctx.bounds()[i];
        let t_a = (lo_bound - point[i]) / direction[i];
        let t_b = (hi_bound - point[i]) / direction[i];
        let (t_min, t_max) = if t_a < t_b { (t_a, t_b) } else { (t_b, t_a) };
        t_lo = t_lo.max(t_min);
        t_hi = t_hi.min(t_max);
    }
    if !(t_lo < t_hi) {
        let current = point.to_vec();
        let value = ctx.score(&current);
        return (current, value);
    }

    let eval_at = |ctx: &mut ScoredContext, t: f64| -> Vec<f64> {
        (0..n).map(|i| point[i] + t * direction[i]).collect()
    };

    // Brent's minimizer wants an FnMut(f64) -> f64; ctx is threaded
    // through a local mutable borrow captured by the closure.
    let mut evaluate = |t: f64| {
        let candidate = eval_at(ctx, t);
        ctx.score(&candidate)
    };
    let (best_t, best_value) = brent::minimize(&mut evaluate, t_lo, t_hi, 1e-6);
    let best_point = eval_at(ctx, best_t);
    (best_point, best_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{
        BorePoint, CalculatorKind, Fingering, Hole, Instrument, Mouthpiece, MouthpieceKind, NoteTarget,
        Termination, Tuning,
    };
    use crate::objective::catalog::BoreLengthObjectiveFunction;
    use crate::objective::{CentDeviationEvaluator, ObjectiveFunction};
    use crate::physics::PhysicalParameters;

    fn tuned_fingering() -> Fingering {
        Fingering {
            name: "all closed".into(),
            note: Some(NoteTarget { target_frequency: 300.0, min_frequency: None, max_frequency: None }),
            open: vec![false],
            ..Default::default()
        }
    }

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

    #[test]
    fn powell_run_does_not_increase_objective_value() {
        let inst = whistle();
        let objective = BoreLengthObjectiveFunction;
        let params = PhysicalParameters::default();
        let tuning = Tuning { name: "t".into(), hole_count: 1, fingerings: vec![tuned_fingering()] };
        let evaluator = CentDeviationEvaluator;
        let bounds = vec![(0.1, 0.6)];
        let start = objective.encode(&inst);

        let mut ctx = ScoredContext {
            objective: &objective,
            template: &inst,
            params: &params,
            calculator_kind: CalculatorKind::Auto,
            tuning: &tuning,
            evaluator: &evaluator,
            bounds: &bounds,
            evaluations: 0,
        };
        let initial_value = ctx.score(&start);
        let (_, final_value, _) = run(
            &mut ctx,
            &start,
            &OptimizerOptions { evaluation_budget: 200, ..Default::default() },
        );
        assert!(final_value <= initial_value + 1e-9);
    }

    #[test]
    fn line_search_stays_within_bounds() {
        let inst = whistle();
        let objective = BoreLengthObjectiveFunction;
        let params = PhysicalParameters::default();
        let tuning = Tuning { name: "t".into(), hole_count: 1, fingerings: vec![] };
        let evaluator = CentDeviationEvaluator;
        let bounds = vec![(0.29, 0.31)];
        let mut ctx = ScoredContext {
            objective: &objective,
            template: &inst,
            params: &params,
            calculator_kind: CalculatorKind::Auto,
            tuning: &tuning,
            evaluator: &evaluator,
            bounds: &bounds,
            evaluations: 0,
        };
        let (point, _) = line_search(&mut ctx, &[0.300], &[1.0]);
        assert!(point[0] >= 0.29 - 1e-9 && point[0] <= 0.31 + 1e-9);
    }
}

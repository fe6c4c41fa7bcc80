//! DIviding RECTangles global search (Jones' DIRECT algorithm), used as
//! the coarse first phase ahead of [`super::powell`]'s local polish when
//! `force_direct_optimizer` is set (spec §4.11).
//!
//! Operates in a normalized `[0, 1]^n` hypercube; [`super::ScoredContext`]
//! handles the mapping back to real bound-box coordinates.

use super::{OptimizerOptions, ScoredContext};

/// Consecutive non-improving rounds before the global phase hands off to
/// the local polish.
const STALL_ROUNDS: usize = 5;

#[derive(Debug, Clone)]
struct Rectangle {
    center: Vec<f64>,
    sizes: Vec<f64>,
    value: f64,
}

impl Rectangle {
    /// Distance from center to corner; the DIRECT "size" measure used to
    /// rank candidates for potential optimality.
    fn diameter(&self) -> f64 {
        0.5 * self.sizes.iter().map(|s| s * s).sum::<f64>().sqrt()
    }

    fn longest_axes(&self) -> Vec<usize> {
        let max = self.sizes.iter().cloned().fold(f64::MIN, f64::max);
        self.sizes
            .iter()
            .enumerate()
            .filter(|(_, &s)| (s - max).abs() < 1e-12)
            .map(|(i, _)| i)
            .collect()
    }
}

fn to_real(normalized: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    normalized.iter().zip(bounds).map(|(&c, &(lo, hi))| lo + c * (hi - lo)).collect()
}

/// Runs the DIRECT global phase until the evaluation budget is spent or
/// the best value stalls for [`STALL_ROUNDS`] consecutive rounds, then
/// returns the best point found (in real, not normalized, coordinates).
pub fn run(ctx: &mut ScoredContext, options: &OptimizerOptions) -> (Vec<f64>, f64) {
    let n = ctx.dimension();
    let bounds = ctx.bounds().to_vec();

    let center = vec![0.5; n];
    let value = ctx.score(&to_real(&center, &bounds));
    let mut rectangles = vec![Rectangle { center, sizes: vec![1.0; n], value }];

    let mut best_value = value;
    let mut best_center = rectangles[0].center.clone();
    let mut stalled_rounds = 0;
    let mut last_best = best_value;

    let mut iteration = 0;
    loop {
        if options.is_cancelled() || ctx.evaluations() >= options.evaluation_budget {
            break;
        }
        let optimal_indices = potentially_optimal(&rectangles);
        if optimal_indices.is_empty() {
            break;
        }

        let mut new_rectangles = Vec::new();
        for &idx in &optimal_indices {
            if ctx.evaluations() >= options.evaluation_budget {
                break;
            }
            new_rectangles.extend(divide(ctx, &bounds, &rectangles[idx]));
        }

        let mut kept: Vec<Rectangle> = rectangles
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !optimal_indices.contains(i))
            .map(|(_, r)| r)
            .collect();
        kept.extend(new_rectangles);
        rectangles = kept;

        for r in &rectangles {
            if r.value < best_value {
                best_value = r.value;
                best_center = r.center.clone();
            }
        }

        options.report_progress(iteration, best_value, ctx.evaluations());
        iteration += 1;

        let improvement = last_best - best_value;
        if improvement.abs() <= options.absolute_tolerance
            || improvement.abs() <= options.relative_tolerance * last_best.abs().max(1.0)
        {
            stalled_rounds += 1;
        } else {
            stalled_rounds = 0;
        }
        last_best = best_value;
        if stalled_rounds >= STALL_ROUNDS {
            break;
        }
    }

    (to_real(&best_center, &bounds), best_value)
}

/// Selects rectangles on the lower convex hull of (diameter, value),
/// i.e. those for which some trade-off constant `K >= 0` makes them the
/// best choice — Jones' definition of "potentially optimal".
fn potentially_optimal(rectangles: &[Rectangle]) -> Vec<usize> {
    let mut by_diameter: Vec<(usize, f64, f64)> =
        rectangles.iter().enumerate().map(|(i, r)| (i, r.diameter(), r.value)).collect();
    by_diameter.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

    // Within each distinct diameter, only the lowest-value rectangle can
    // possibly be on the hull; ties keep the earliest (stable sort order).
    let mut reps: Vec<(usize, f64, f64)> = Vec::new();
    let mut i = 0;
    while i < by_diameter.len() {
        let mut j = i;
        let mut best = by_diameter[i];
        while j < by_diameter.len() && (by_diameter[j].1 - by_diameter[i].1).abs() < 1e-12 {
            if by_diameter[j].2 < best.2 {
                best = by_diameter[j];
            }
            j += 1;
        }
        reps.push(best);
        i = j;
    }

    let mut hull: Vec<(usize, f64, f64)> = Vec::new();
    for p in reps {
        while hull.len() >= 2 {
            let (_, d1, v1) = hull[hull.len() - 2];
            let (_, d2, v2) = hull[hull.len() - 1];
            let (_, d3, v3) = p;
            let cross = (d2 - d1) * (v3 - v1) - (v2 - v1) * (d3 - d1);
            if cross <= 0.0 {
                hull.pop();
            } else {
                break;
            }
        }
        hull.push(p);
    }
    hull.into_iter().map(|(i, _, _)| i).collect()
}

/// Trisects `rect` along each of its longest axes, innermost axis first
/// by ascending best-neighbor value (Jones' tie-break for equal-length
/// sides), replacing it with three sub-rectangles per axis processed.
fn divide(ctx: &mut ScoredContext, bounds: &[(f64, f64)], rect: &Rectangle) -> Vec<Rectangle> {
    let longest = rect.longest_axes();
    let mut axis_evals: Vec<(usize, f64, f64, f64)> = longest
        .iter()
        .map(|&axis| {
            let delta = rect.sizes[axis] / 3.0;
            let mut c_plus = rect.center.clone();
            c_plus[axis] += delta;
            let mut c_minus = rect.center.clone();
            c_minus[axis] -= delta;
            let v_plus = ctx.score(&to_real(&c_plus, bounds));
            let v_minus = ctx.score(&to_real(&c_minus, bounds));
            (axis, v_plus.min(v_minus), v_plus, v_minus)
        })
        .collect();
    axis_evals.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

    let mut current_sizes = rect.sizes.clone();
    let mut children = Vec::new();

    for (axis, _, v_plus, v_minus) in axis_evals {
        let delta = current_sizes[axis] / 3.0;
        let mut sizes_children = current_sizes.clone();
        sizes_children[axis] = delta;

        let mut c_plus = rect.center.clone();
        c_plus[axis] += delta;
        let mut c_minus = rect.center.clone();
        c_minus[axis] -= delta;

        children.push(Rectangle { center: c_plus, sizes: sizes_children.clone(), value: v_plus });
        children.push(Rectangle { center: c_minus, sizes: sizes_children, value: v_minus });

        current_sizes[axis] = delta;
    }

    children.push(Rectangle { center: rect.center.clone(), sizes: current_sizes, value: rect.value });
    children
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
    fn longest_axes_picks_single_max_dimension() {
        let rect = Rectangle { center: vec![0.5, 0.5], sizes: vec![1.0, 0.5], value: 0.0 };
        assert_eq!(rect.longest_axes(), vec![0]);
    }

    #[test]
    fn longest_axes_picks_all_tied_dimensions() {
        let rect = Rectangle { center: vec![0.5, 0.5], sizes: vec![1.0, 1.0], value: 0.0 };
        assert_eq!(rect.longest_axes(), vec![0, 1]);
    }

    #[test]
    fn divide_produces_three_times_axis_count_children() {
        let objective = BoreLengthObjectiveFunction;
        let inst = whistle();
        let params = PhysicalParameters::default();
        let tuning = Tuning { name: "t".into(), hole_count: 1, fingerings: vec![tuned_fingering()] };
        let evaluator = CentDeviationEvaluator;
        let bounds = vec![(0.1, 0.6)];
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
        let rect = Rectangle { center: vec![0.5], sizes: vec![1.0], value: ctx.score(&[0.35]) };
        let children = divide(&mut ctx, &bounds, &rect);
        assert_eq!(children.len(), 3);
        let total_size: f64 = children.iter().map(|c| c.sizes[0]).sum();
        assert!((total_size - 1.0).abs() < 1e-9, "total_size = {total_size}");
    }

    #[test]
    fn global_search_improves_on_a_corner_start() {
        let objective = BoreLengthObjectiveFunction;
        let inst = whistle();
        let params = PhysicalParameters::default();
        let tuning = Tuning { name: "t".into(), hole_count: 1, fingerings: vec![tuned_fingering()] };
        let evaluator = CentDeviationEvaluator;
        let bounds = vec![(0.1, 0.6)];
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
        let corner_value = ctx.score(&[0.1]);
        let options = OptimizerOptions { evaluation_budget: 300, ..Default::default() };
        let (_, best_value) = run(&mut ctx, &options);
        assert!(best_value <= corner_value + 1e-9);
    }
}

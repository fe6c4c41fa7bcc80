//! Representative concrete objective functions, one per family named in
//! the specification (spec §4.10). See DESIGN.md's Open Question decision
//! on catalog breadth.

use crate::instrument::{Constraint, ConstraintKind, ConstraintSet, Instrument, MouthpieceKind};
use crate::objective::{ConstraintIntent, ObjectiveFunction};

const MIN_HOLE_DIAMETER: f64 = 0.001;
const MIN_HOLE_SPACING: f64 = 0.002;

fn dimensional_constraint(name: &str, lower: Option<f64>, upper: Option<f64>) -> Constraint {
    Constraint {
        category: "geometry".into(),
        display_name: name.into(),
        kind: ConstraintKind::Dimensional,
        lower,
        upper,
    }
}

/// Cumulative hole spacings: dimension 0 is the distance from the
/// mouthpiece to the first hole, dimension i>0 is the distance from hole
/// i-1 to hole i. Ordering is automatic since spacings are positive.
pub struct HolePositionObjectiveFunction {
    pub hole_count: usize,
}

impl HolePositionObjectiveFunction {
    pub fn for_instrument(instrument: &Instrument) -> Self {
        Self { hole_count: instrument.holes.len() }
    }
}

impl ObjectiveFunction for HolePositionObjectiveFunction {
    fn name(&self) -> &str {
        "hole_position"
    }

    fn dimension(&self) -> usize {
        self.hole_count
    }

    fn encode(&self, instrument: &Instrument) -> Vec<f64> {
        let mut prev = instrument.mouthpiece.position;
        instrument
            .holes
            .iter()
            .map(|h| {
                let spacing = h.position - prev;
                prev = h.position;
                spacing
            })
            .collect()
    }

    fn decode(&self, x: &[f64], template: &Instrument) -> Instrument {
        let mut instrument = template.clone();
        let mut position = instrument.mouthpiece.position;
        for (hole, &spacing) in instrument.holes.iter_mut().zip(x.iter()) {
            position += spacing.max(MIN_HOLE_SPACING);
            hole.position = position;
        }
        instrument
    }

    fn constraints(&self, intent: ConstraintIntent, template: &Instrument) -> ConstraintSet {
        let bore_length = template.bore.last().unwrap().position - template.bore.first().unwrap().position;
        let constraints = template
            .holes
            .iter()
            .enumerate()
            .map(|(i, _)| match intent {
                ConstraintIntent::Blank => dimensional_constraint(&format!("hole {i} spacing"), None, None),
                ConstraintIntent::Default => {
                    dimensional_constraint(&format!("hole {i} spacing"), Some(MIN_HOLE_SPACING), Some(bore_length))
                }
                ConstraintIntent::Optimization => {
                    let current = self.encode(template)[i];
                    dimensional_constraint(
                        &format!("hole {i} spacing"),
                        Some((current * 0.5).max(MIN_HOLE_SPACING)),
                        Some(current * 1.5),
                    )
                }
            })
            .collect();
        ConstraintSet { objective_name: self.name().into(), unit_tag: "m".into(), constraints }
    }
}

/// Hole diameters directly, one dimension per hole.
pub struct HoleSizeObjectiveFunction {
    pub hole_count: usize,
}

impl HoleSizeObjectiveFunction {
    pub fn for_instrument(instrument: &Instrument) -> Self {
        Self { hole_count: instrument.holes.len() }
    }
}

impl ObjectiveFunction for HoleSizeObjectiveFunction {
    fn name(&self) -> &str {
        "hole_size"
    }

    fn dimension(&self) -> usize {
        self.hole_count
    }

    fn encode(&self, instrument: &Instrument) -> Vec<f64> {
        instrument.holes.iter().map(|h| h.diameter).collect()
    }

    fn decode(&self, x: &[f64], template: &Instrument) -> Instrument {
        let mut instrument = template.clone();
        for (hole, &diameter) in instrument.holes.iter_mut().zip(x.iter()) {
            hole.diameter = diameter.max(MIN_HOLE_DIAMETER);
        }
        instrument
    }

    fn constraints(&self, intent: ConstraintIntent, template: &Instrument) -> ConstraintSet {
        let constraints = template
            .holes
            .iter()
            .enumerate()
            .map(|(i, hole)| {
                let bore_diameter = template.bore_diameter_at(hole.position);
                match intent {
                    ConstraintIntent::Blank => dimensional_constraint(&format!("hole {i} diameter"), None, None),
                    ConstraintIntent::Default => dimensional_constraint(
                        &format!("hole {i} diameter"),
                        Some(MIN_HOLE_DIAMETER),
                        Some(bore_diameter),
                    ),
                    ConstraintIntent::Optimization => dimensional_constraint(
                        &format!("hole {i} diameter"),
                        Some((hole.diameter * 0.7).max(MIN_HOLE_DIAMETER)),
                        Some((hole.diameter * 1.3).min(bore_diameter)),
                    ),
                }
            })
            .collect();
        ConstraintSet { objective_name: self.name().into(), unit_tag: "m".into(), constraints }
    }
}

/// One spacing per group of holes: each dimension shifts an entire group
/// of holes together while preserving their internal relative spacing,
/// for instruments whose holes are mechanically linked (e.g. paired
/// fingers).
pub struct GroupedHolePositionObjectiveFunction {
    /// Hole indices per group, each sorted ascending by position; groups
    /// themselves are ordered by position along the bore.
    pub groups: Vec<Vec<usize>>,
}

impl ObjectiveFunction for GroupedHolePositionObjectiveFunction {
    fn name(&self) -> &str {
        "grouped_hole_position"
    }

    fn dimension(&self) -> usize {
        self.groups.len()
    }

    fn encode(&self, instrument: &Instrument) -> Vec<f64> {
        let mut prev_anchor = instrument.mouthpiece.position;
        self.groups
            .iter()
            .map(|group| {
                let first = instrument.holes[group[0]].position;
                let spacing = first - prev_anchor;
                prev_anchor = first;
                spacing
            })
            .collect()
    }

    fn decode(&self, x: &[f64], template: &Instrument) -> Instrument {
        let mut instrument = template.clone();
        let mut anchor = instrument.mouthpiece.position;
        for (group, &spacing) in self.groups.iter().zip(x.iter()) {
            let old_first = template.holes[group[0]].position;
            let new_first = anchor + spacing.max(MIN_HOLE_SPACING);
            let delta = new_first - old_first;
            for &idx in group {
                instrument.holes[idx].position = template.holes[idx].position + delta;
            }
            anchor = new_first;
        }
        instrument
    }

    fn constraints(&self, intent: ConstraintIntent, template: &Instrument) -> ConstraintSet {
        let bore_length = template.bore.last().unwrap().position - template.bore.first().unwrap().position;
        let constraints = self
            .groups
            .iter()
            .enumerate()
            .map(|(i, _)| match intent {
                ConstraintIntent::Blank => dimensional_constraint(&format!("group {i} spacing"), None, None),
                ConstraintIntent::Default => {
                    dimensional_constraint(&format!("group {i} spacing"), Some(MIN_HOLE_SPACING), Some(bore_length))
                }
                ConstraintIntent::Optimization => {
                    let current = self.encode(template)[i];
                    dimensional_constraint(
                        &format!("group {i} spacing"),
                        Some((current * 0.5).max(MIN_HOLE_SPACING)),
                        Some(current * 1.5),
                    )
                }
            })
            .collect();
        ConstraintSet { objective_name: self.name().into(), unit_tag: "m".into(), constraints }
    }
}

/// Overall bore length; holes are rescaled proportionally so their
/// relative spacing along the bore is preserved.
pub struct BoreLengthObjectiveFunction;

impl ObjectiveFunction for BoreLengthObjectiveFunction {
    fn name(&self) -> &str {
        "bore_length"
    }

    fn dimension(&self) -> usize {
        1
    }

    fn encode(&self, instrument: &Instrument) -> Vec<f64> {
        let length = instrument.bore.last().unwrap().position - instrument.bore.first().unwrap().position;
        vec![length]
    }

    fn decode(&self, x: &[f64], template: &Instrument) -> Instrument {
        let mut instrument = template.clone();
        let start = template.bore.first().unwrap().position;
        let old_length = template.bore.last().unwrap().position - start;
        let new_length = x[0].max(MIN_HOLE_SPACING);
        let scale = if old_length.abs() > 1e-12 { new_length / old_length } else { 1.0 };

        for bp in instrument.bore.iter_mut() {
            bp.position = start + (bp.position - start) * scale;
        }
        for hole in instrument.holes.iter_mut() {
            hole.position = start + (hole.position - start) * scale;
        }
        instrument
    }

    fn constraints(&self, intent: ConstraintIntent, template: &Instrument) -> ConstraintSet {
        let length = self.encode(template)[0];
        let constraint = match intent {
            ConstraintIntent::Blank => dimensional_constraint("bore length", None, None),
            ConstraintIntent::Default => dimensional_constraint("bore length", Some(length * 0.5), Some(length * 2.0)),
            ConstraintIntent::Optimization => dimensional_constraint("bore length", Some(length * 0.9), Some(length * 1.1)),
        };
        ConstraintSet { objective_name: self.name().into(), unit_tag: "m".into(), constraints: vec![constraint] }
    }
}

/// One conical taper: the ratio of end diameter to start diameter and the
/// taper's length, applied to a two-point bore profile.
pub struct SingleTaperObjectiveFunction;

impl ObjectiveFunction for SingleTaperObjectiveFunction {
    fn name(&self) -> &str {
        "single_taper"
    }

    fn dimension(&self) -> usize {
        2
    }

    fn encode(&self, instrument: &Instrument) -> Vec<f64> {
        let first = instrument.bore.first().unwrap();
        let last = instrument.bore.last().unwrap();
        let ratio = last.diameter / first.diameter;
        let length = last.position - first.position;
        vec![ratio, length]
    }

    fn decode(&self, x: &[f64], template: &Instrument) -> Instrument {
        let mut instrument = template.clone();
        let ratio = x[0].max(1e-3);
        let length = x[1].max(MIN_HOLE_SPACING);
        let first = *instrument.bore.first().unwrap();
        let last_index = instrument.bore.len() - 1;
        instrument.bore[last_index].position = first.position + length;
        instrument.bore[last_index].diameter = first.diameter * ratio;
        instrument
    }

    fn constraints(&self, intent: ConstraintIntent, template: &Instrument) -> ConstraintSet {
        let x = self.encode(template);
        let constraints = match intent {
            ConstraintIntent::Blank => vec![
                Constraint {
                    category: "bore".into(),
                    display_name: "taper ratio".into(),
                    kind: ConstraintKind::Dimensionless,
                    lower: None,
                    upper: None,
                },
                dimensional_constraint("taper length", None, None),
            ],
            ConstraintIntent::Default => vec![
                Constraint {
                    category: "bore".into(),
                    display_name: "taper ratio".into(),
                    kind: ConstraintKind::Dimensionless,
                    lower: Some(0.3),
                    upper: Some(3.0),
                },
                dimensional_constraint("taper length", Some(x[1] * 0.5), Some(x[1] * 2.0)),
            ],
            ConstraintIntent::Optimization => vec![
                Constraint {
                    category: "bore".into(),
                    display_name: "taper ratio".into(),
                    kind: ConstraintKind::Dimensionless,
                    lower: Some(x[0] * 0.8),
                    upper: Some(x[0] * 1.2),
                },
                dimensional_constraint("taper length", Some(x[1] * 0.9), Some(x[1] * 1.1)),
            ],
        };
        ConstraintSet { objective_name: self.name().into(), unit_tag: "m".into(), constraints }
    }
}

/// Fipple mouthpiece parameters: fipple factor, windway height, and window
/// length (the nearest field this data model has to the source's "beta"
/// airstream parameter).
pub struct MouthpieceObjectiveFunction;

impl ObjectiveFunction for MouthpieceObjectiveFunction {
    fn name(&self) -> &str {
        "mouthpiece"
    }

    fn dimension(&self) -> usize {
        3
    }

    fn encode(&self, instrument: &Instrument) -> Vec<f64> {
        match instrument.mouthpiece.kind {
            MouthpieceKind::Fipple { fipple_factor, windway_height, window_length, .. } => {
                vec![fipple_factor, windway_height, window_length]
            }
            _ => vec![1.0, 0.0007874, 0.010],
        }
    }

    fn decode(&self, x: &[f64], template: &Instrument) -> Instrument {
        let mut instrument = template.clone();
        if let MouthpieceKind::Fipple { window_width, .. } = instrument.mouthpiece.kind {
            instrument.mouthpiece.kind = MouthpieceKind::Fipple {
                fipple_factor: x[0],
                windway_height: x[1].max(1e-5),
                window_length: x[2].max(1e-4),
                window_width,
            };
        }
        instrument
    }

    fn constraints(&self, intent: ConstraintIntent, _template: &Instrument) -> ConstraintSet {
        let constraints = match intent {
            ConstraintIntent::Blank => vec![
                Constraint { category: "mouthpiece".into(), display_name: "fipple factor".into(), kind: ConstraintKind::Dimensionless, lower: None, upper: None },
                dimensional_constraint("windway height", None, None),
                dimensional_constraint("window length", None, None),
            ],
            ConstraintIntent::Default | ConstraintIntent::Optimization => vec![
                Constraint {
                    category: "mouthpiece".into(),
                    display_name: "fipple factor".into(),
                    kind: ConstraintKind::Dimensionless,
                    lower: Some(0.2),
                    upper: Some(5.0),
                },
                dimensional_constraint("windway height", Some(0.0005), Some(0.005)),
                dimensional_constraint("window length", Some(0.004), Some(0.020)),
            ],
        };
        ConstraintSet { objective_name: self.name().into(), unit_tag: "m".into(), constraints }
    }
}

/// Composite of hole position and bore length, demonstrating the
/// fixed-offset concatenation rule against two independently useful
/// sub-objectives.
pub fn hole_and_bore_objective_function(template: &Instrument) -> crate::objective::CompositeObjectiveFunction {
    crate::objective::CompositeObjectiveFunction {
        name: "hole_and_bore".into(),
        parts: vec![
            Box::new(HolePositionObjectiveFunction::for_instrument(template)),
            Box::new(BoreLengthObjectiveFunction),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{BorePoint, Hole, Mouthpiece, MouthpieceKind, Termination};

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
            holes: vec![
                Hole { position: 0.150, diameter: 0.008, height: 0.003, key: None },
                Hole { position: 0.200, diameter: 0.008, height: 0.003, key: None },
            ],
            termination: Termination { flange_diameter: 0.0 },
        }
    }

    fn assert_round_trips(objective: &dyn ObjectiveFunction, instrument: &Instrument) {
        let x = objective.encode(instrument);
        let decoded = objective.decode(&x, instrument);
        let x2 = objective.encode(&decoded);
        for (a, b) in x.iter().zip(x2.iter()) {
            assert!((a - b).abs() < 1e-9, "{a} != {b}");
        }
    }

    #[test]
    fn hole_position_round_trips() {
        let inst = whistle();
        assert_round_trips(&HolePositionObjectiveFunction::for_instrument(&inst), &inst);
    }

    #[test]
    fn hole_size_round_trips() {
        let inst = whistle();
        assert_round_trips(&HoleSizeObjectiveFunction::for_instrument(&inst), &inst);
    }

    #[test]
    fn bore_length_round_trips() {
        assert_round_trips(&BoreLengthObjectiveFunction, &whistle());
    }

    #[test]
    fn single_taper_round_trips() {
        assert_round_trips(&SingleTaperObjectiveFunction, &whistle());
    }

    #[test]
    fn mouthpiece_round_trips() {
        assert_round_trips(&MouthpieceObjectiveFunction, &whistle());
    }

    #[test]
    fn grouped_hole_position_round_trips() {
        let objective = GroupedHolePositionObjectiveFunction { groups: vec![vec![0], vec![1]] };
        assert_round_trips(&objective, &whistle());
    }

    #[test]
    fn hole_and_bore_composite_dimension_is_sum_of_parts() {
        let inst = whistle();
        let composite = hole_and_bore_objective_function(&inst);
        assert_eq!(composite.dimension(), 2 + 1);
    }

    #[test]
    fn hole_and_bore_composite_round_trips() {
        let inst = whistle();
        let composite = hole_and_bore_objective_function(&inst);
        assert_round_trips(&composite, &inst);
    }

    #[test]
    fn bore_length_decode_preserves_hole_ordering() {
        let objective = BoreLengthObjectiveFunction;
        let decoded = objective.decode(&[0.600], &whistle());
        assert!(decoded.holes[0].position < decoded.holes[1].position);
        assert!(decoded.holes[1].position < decoded.bore.last().unwrap().position);
    }
}

//! Maps fingerings to predicted playing frequencies and cent deviations
//! from their targets (spec §4.9).

use crate::calculator::InstrumentCalculator;
use crate::instrument::{Fingering, Tuning};
use crate::playing_range::PlayingRange;

/// `1200 * log2(f2 / f1)`.
pub fn cents(f1: f64, f2: f64) -> f64 {
    1200.0 * (f2 / f1).log2()
}

/// Predicted frequency and cent deviation for one fingering. `predicted`
/// is `None` when the reactance root-finder could not locate a playing
/// range near the fingering's target frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingeringResult {
    pub predicted_hz: Option<f64>,
    pub cents_deviation: Option<f64>,
}

/// Aggregate tuning-error statistics across a set of fingering results.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TuningStatistics {
    pub count: usize,
    pub mean_cents: f64,
    pub stddev_cents: f64,
    pub max_abs_cents: f64,
    pub rms_cents: f64,
}

/// Borrows an [`InstrumentCalculator`] and a [`Tuning`] and evaluates
/// predicted frequencies and tuning error across the tuning's fingerings.
pub struct Tuner<'a, 'b> {
    calc: &'a InstrumentCalculator<'a>,
    tuning: &'b Tuning,
}

impl<'a, 'b> Tuner<'a, 'b> {
    pub fn new(calc: &'a InstrumentCalculator<'a>, tuning: &'b Tuning) -> Self {
        Self { calc, tuning }
    }

    /// Predicted frequency and cent deviation for one fingering. Returns
    /// `(None, None)` if the fingering has no target note, or if the
    /// frequency root-finder could not bracket a playing range.
    pub fn evaluate_fingering(&self, fingering: &Fingering) -> FingeringResult {
        let Some(note) = fingering.note else {
            return FingeringResult { predicted_hz: None, cents_deviation: None };
        };
        let range = PlayingRange::new(self.calc, fingering);
        match range.find_resonance(note.target_frequency) {
            Ok(predicted) => FingeringResult {
                predicted_hz: Some(predicted),
                cents_deviation: Some(cents(note.target_frequency, predicted)),
            },
            Err(_) => FingeringResult { predicted_hz: None, cents_deviation: None },
        }
    }

    pub fn evaluate_all(&self) -> Vec<FingeringResult> {
        self.tuning.fingerings.iter().map(|f| self.evaluate_fingering(f)).collect()
    }

    /// Aggregate statistics over all fingerings with a defined cent
    /// deviation (missing predictions are excluded, not counted as zero).
    pub fn statistics(&self) -> TuningStatistics {
        let deviations: Vec<f64> = self
            .evaluate_all()
            .into_iter()
            .filter_map(|r| r.cents_deviation)
            .collect();
        statistics_of(&deviations)
    }
}

fn statistics_of(deviations: &[f64]) -> TuningStatistics {
    let count = deviations.len();
    if count == 0 {
        return TuningStatistics::default();
    }
    let mean = deviations.iter().sum::<f64>() / count as f64;
    let variance = deviations.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / count as f64;
    let stddev = variance.sqrt();
    let max_abs = deviations.iter().fold(0.0_f64, |acc, d| acc.max(d.abs()));
    let rms = (deviations.iter().map(|d| d * d).sum::<f64>() / count as f64).sqrt();
    TuningStatistics { count, mean_cents: mean, stddev_cents: stddev, max_abs_cents: max_abs, rms_cents: rms }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{
        BorePoint, CalculatorKind, Hole, Instrument, Mouthpiece, MouthpieceKind, NoteTarget, Termination,
    };
    use crate::physics::PhysicalParameters;

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
    fn cents_of_octave_is_1200() {
        assert!((cents(440.0, 880.0) - 1200.0).abs() < 1e-5);
    }

    #[test]
    fn cents_of_equal_frequencies_is_zero() {
        assert!(cents(440.0, 440.0).abs() < 1e-10);
    }

    #[test]
    fn evaluates_fingering_with_finite_cent_deviation() {
        let inst = whistle();
        let calc = InstrumentCalculator::new(&inst, &PhysicalParameters::default(), CalculatorKind::Auto).unwrap();
        let tuning = Tuning {
            name: "t".into(),
            hole_count: 1,
            fingerings: vec![Fingering {
                name: "all closed".into(),
                note: Some(NoteTarget { target_frequency: 300.0, min_frequency: None, max_frequency: None }),
                open: vec![false],
                ..Default::default()
            }],
        };
        let tuner = Tuner::new(&calc, &tuning);
        let result = tuner.evaluate_fingering(&tuning.fingerings[0]);
        assert!(result.cents_deviation.unwrap().is_finite());
    }

    #[test]
    fn fingering_without_note_target_produces_no_prediction() {
        let inst = whistle();
        let calc = InstrumentCalculator::new(&inst, &PhysicalParameters::default(), CalculatorKind::Auto).unwrap();
        let tuning = Tuning {
            name: "t".into(),
            hole_count: 1,
            fingerings: vec![Fingering { name: "untargeted".into(), open: vec![false], ..Default::default() }],
        };
        let tuner = Tuner::new(&calc, &tuning);
        let result = tuner.evaluate_fingering(&tuning.fingerings[0]);
        assert!(result.predicted_hz.is_none());
    }

    #[test]
    fn statistics_on_empty_set_are_zeroed() {
        assert_eq!(statistics_of(&[]), TuningStatistics::default());
    }

    #[test]
    fn statistics_rms_matches_manual_computation() {
        let stats = statistics_of(&[3.0, -3.0]);
        assert!((stats.rms_cents - 3.0).abs() < 1e-9);
        assert!((stats.mean_cents - 0.0).abs() < 1e-9);
    }
}

//! Parameter-vector encode/decode and scalar error functionals for the
//! optimizer (spec §4.10).
//!
//! The ~50-entry catalog in the distilled source material differs only in
//! which geometric subset each member exposes; [`catalog`] implements one
//! fully-worked representative per family plus the fixed-offset
//! composition operator, rather than all fifty. See DESIGN.md.

pub mod catalog;

use crate::calculator::InstrumentCalculator;
use crate::instrument::{CalculatorKind, ConstraintSet, Instrument, Tuning};
use crate::physics::PhysicalParameters;
use crate::tuner::Tuner;

/// Large finite penalty substituted for a fingering whose predicted
/// frequency could not be found, so the optimizer always receives a
/// finite, well-ordered value (spec §4.10, §7).
pub const PENALTY_CENTS: f64 = 200.0;

/// Which physically reasonable bound profile a [`ObjectiveFunction::constraints`]
/// call should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintIntent {
    /// No bounds.
    Blank,
    /// Physically reasonable bounds independent of the current instrument.
    Default,
    /// Tighter bounds derived from the current instrument, for local
    /// polishing.
    Optimization,
}

/// Scalar error computed from a calculator and tuning. Kept as a trait
/// object so [`ObjectiveFunction::evaluate`] stays decoupled from the
/// concrete scoring rule (cent deviation is the default; reactance and
/// reflection are alternatives).
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, calc: &InstrumentCalculator, tuning: &Tuning) -> f64;
}

/// Weighted RMS cent deviation across all fingerings with a target note;
/// missing predictions are penalized rather than excluded.
#[derive(Debug, Clone, Copy, Default)]
pub struct CentDeviationEvaluator;

impl Evaluator for CentDeviationEvaluator {
    fn evaluate(&self, calc: &InstrumentCalculator, tuning: &Tuning) -> f64 {
        let tuner = Tuner::new(calc, tuning);
        let mut weighted_sum_sq = 0.0;
        let mut weight_total = 0.0;
        for fingering in &tuning.fingerings {
            if fingering.note.is_none() {
                continue;
            }
            let result = tuner.evaluate_fingering(fingering);
            let deviation = result.cents_deviation.unwrap_or(PENALTY_CENTS);
            weighted_sum_sq += fingering.weight * deviation * deviation;
            weight_total += fingering.weight;
        }
        if weight_total <= 0.0 {
            return 0.0;
        }
        (weighted_sum_sq / weight_total).sqrt()
    }
}

/// RMS reactance (imaginary impedance) at each fingering's target
/// frequency, without root-finding; a cheaper alternative to cent
/// deviation for coarse search phases.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReactanceEvaluator;

impl Evaluator for ReactanceEvaluator {
    fn evaluate(&self, calc: &InstrumentCalculator, tuning: &Tuning) -> f64 {
        weighted_rms(tuning, |fingering, target| calc.reactance(target, fingering).abs())
    }
}

/// RMS reflection-coefficient magnitude at each fingering's target
/// frequency.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReflectionEvaluator;

impl Evaluator for ReflectionEvaluator {
    fn evaluate(&self, calc: &InstrumentCalculator, tuning: &Tuning) -> f64 {
        weighted_rms(tuning, |fingering, target| {
            calc.calc_reflection_coefficient(target, fingering).norm()
        })
    }
}

fn weighted_rms(tuning: &Tuning, shape: impl Fn(&crate::instrument::Fingering, f64) -> f64) -> f64 {
    let mut weighted_sum_sq = 0.0;
    let mut weight_total = 0.0;
    for fingering in &tuning.fingerings {
        let Some(note) = fingering.note else { continue };
        let value = shape(fingering, note.target_frequency);
        let value = if value.is_finite() { value } else { PENALTY_CENTS };
        weighted_sum_sq += fingering.weight * value * value;
        weight_total += fingering.weight;
    }
    if weight_total <= 0.0 {
        return 0.0;
    }
    (weighted_sum_sq / weight_total).sqrt()
}

/// Encodes/decodes a parameter vector against an instrument's geometry and
/// defines the scalar error the optimizer minimizes.
pub trait ObjectiveFunction: Send + Sync {
    fn name(&self) -> &str;
    fn dimension(&self) -> usize;

    /// Extracts the current parameter vector from `instrument`.
    fn encode(&self, instrument: &Instrument) -> Vec<f64>;

    /// Writes `x` back into a working copy of `template`, enforcing any
    /// internal ordering/positivity constraint (e.g. hole positions are
    /// encoded as cumulative spacings so ordering is automatic).
    fn decode(&self, x: &[f64], template: &Instrument) -> Instrument;

    /// Suggested bounds and metadata for each dimension, for the given
    /// intent.
    fn constraints(&self, intent: ConstraintIntent, template: &Instrument) -> ConstraintSet;

    /// Decodes `x`, recomputes predicted frequencies for every fingering
    /// via the Tuner, and scores the result with `evaluator`. Returns
    /// `f64::NAN` (not an error) if the decoded instrument or physical
    /// parameters are invalid; the optimizer treats NaN as `+infinity`.
    fn evaluate(
        &self,
        x: &[f64],
        template: &Instrument,
        params: &PhysicalParameters,
        calculator_kind: CalculatorKind,
        tuning: &Tuning,
        evaluator: &dyn Evaluator,
    ) -> f64 {
        let instrument = self.decode(x, template);
        match InstrumentCalculator::new(&instrument, params, calculator_kind) {
            Ok(calc) => evaluator.evaluate(&calc, tuning),
            Err(_) => f64::NAN,
        }
    }
}

/// Concatenates sub-objectives' parameter vectors with fixed offsets in a
/// stable order, so a composite objective is just an ordered list of
/// independent sub-objectives (spec §4.10, §9).
pub struct CompositeObjectiveFunction {
    pub name: String,
    pub parts: Vec<Box<dyn ObjectiveFunction>>,
}

impl CompositeObjectiveFunction {
    fn offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.parts.len());
        let mut acc = 0;
        for part in &self.parts {
            offsets.push(acc);
            acc += part.dimension();
        }
        offsets
    }
}

impl ObjectiveFunction for CompositeObjectiveFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.parts.iter().map(|p| p.dimension()).sum()
    }

    fn encode(&self, instrument: &Instrument) -> Vec<f64> {
        self.parts.iter().flat_map(|p| p.encode(instrument)).collect()
    }

    fn decode(&self, x: &[f64], template: &Instrument) -> Instrument {
        let offsets = self.offsets();
        let mut instrument = template.clone();
        for (part, &offset) in self.parts.iter().zip(offsets.iter()) {
            let slice = &x[offset..offset + part.dimension()];
            instrument = part.decode(slice, &instrument);
        }
        instrument
    }

    fn constraints(&self, intent: ConstraintIntent, template: &Instrument) -> ConstraintSet {
        let mut constraints = Vec::new();
        for part in &self.parts {
            constraints.extend(part.constraints(intent, template).constraints);
        }
        ConstraintSet {
            objective_name: self.name.clone(),
            unit_tag: "m".into(),
            constraints,
        }
    }
}

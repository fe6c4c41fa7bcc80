//! Assembles the input acoustic impedance of an instrument under a
//! fingering by composing element transfer matrices in geometric order
//! (spec §4.7).

use num_complex::Complex64;

use crate::elements::{
    AcousticElement, ConeSegment, CylinderSegment, HoleElement, HoleState, MouthpieceElement,
    TerminationElement,
};
use crate::error::CoreResult;
use crate::instrument::{CalculatorKind, Fingering, Instrument, MouthpieceKind, PhysicsModel};
use crate::physics::{AirProperties, FullAirModel, PhysicalParameters, SimpleAirModel};
use crate::transfer_matrix::StateVector;

/// Relative radius difference below which two bore points are treated as
/// the same radius (a cylindrical, not conical, segment between them).
const CYLINDER_TOLERANCE: f64 = 1e-6;

/// Borrows an [`Instrument`] and [`PhysicalParameters`] and computes its
/// input impedance under arbitrary fingerings. Air properties are cached
/// at construction since they depend only on the physical parameters, not
/// on frequency or fingering.
pub struct InstrumentCalculator<'a> {
    instrument: &'a Instrument,
    air: AirProperties,
}

impl<'a> InstrumentCalculator<'a> {
    pub fn new(
        instrument: &'a Instrument,
        params: &PhysicalParameters,
        calculator_kind: CalculatorKind,
    ) -> CoreResult<Self> {
        instrument.validate()?;
        let physics_model = calculator_kind.resolve(&instrument.mouthpiece.kind);
        let air = match physics_model {
            PhysicsModel::Full => FullAirModel.compute(params)?,
            PhysicsModel::Simple => SimpleAirModel.compute(params)?,
        };
        Ok(Self { instrument, air })
    }

    pub fn air_properties(&self) -> &AirProperties {
        &self.air
    }

    /// Resolves a fingering's effective acoustic end. `None` defaults to
    /// using the true termination only when no hole in the fingering is
    /// open; otherwise the lowest positioned open hole is the effective
    /// end. A forced `Some(false)` with no open holes present falls back
    /// to the termination.
    fn resolve_open_end(&self, fingering: &Fingering) -> bool {
        let any_open = fingering.open.iter().any(|&o| o);
        match fingering.open_end {
            Some(false) if !any_open => {
                log::warn!(
                    "fingering '{}' forces open_end=false with no open holes; falling back to the termination",
                    fingering.name
                );
                true
            }
            Some(v) => v,
            None => !any_open,
        }
    }

    fn lowest_open_hole_index(&self, fingering: &Fingering) -> Option<usize> {
        fingering
            .open
            .iter()
            .enumerate()
            .filter(|(_, &open)| open)
            .map(|(i, _)| i)
            .min_by(|&a, &b| {
                self.instrument.holes[a]
                    .position
                    .partial_cmp(&self.instrument.holes[b].position)
                    .unwrap()
            })
    }

    fn bore_segment(&self, left_position: f64, right_position: f64) -> Box<dyn AcousticElement> {
        let length = (right_position - left_position).abs();
        let r_left = self.instrument.bore_diameter_at(left_position) / 2.0;
        let r_right = self.instrument.bore_diameter_at(right_position) / 2.0;
        if (r_right - r_left).abs() < CYLINDER_TOLERANCE * r_left.max(r_right).max(1e-9) {
            Box::new(CylinderSegment { radius: 0.5 * (r_left + r_right), length })
        } else {
            Box::new(ConeSegment { radius_left: r_left, radius_right: r_right, length })
        }
    }

    fn hole_element(&self, index: usize, fingering: &Fingering) -> HoleElement {
        let hole = &self.instrument.holes[index];
        let state = if fingering.open[index] {
            HoleState::Open
        } else {
            HoleState::Closed
        };
        HoleElement {
            diameter: hole.diameter,
            height: hole.height,
            bore_diameter: self.instrument.bore_diameter_at(hole.position),
            state,
            keyed: hole.key.is_some(),
            size_multiplier: 1.0,
        }
    }

    /// Input impedance at the mouthpiece for `frequency` under `fingering`.
    pub fn calc_z(&self, frequency: f64, fingering: &Fingering) -> Complex64 {
        let open_end = self.resolve_open_end(fingering);
        let termination = TerminationElement {
            flange_diameter: self.instrument.termination.flange_diameter,
            bore_diameter_at_end: self
                .instrument
                .bore_diameter_at(self.instrument.bore.last().unwrap().position),
        };

        let (mut position, mut state) = if open_end {
            (
                self.instrument.bore.last().unwrap().position,
                termination.state_vector(frequency, &self.air, true),
            )
        } else {
            match self.lowest_open_hole_index(fingering) {
                Some(idx) => (self.instrument.holes[idx].position, StateVector::closed_end()),
                None => (
                    self.instrument.bore.last().unwrap().position,
                    termination.state_vector(frequency, &self.air, true),
                ),
            }
        };

        // Holes strictly between the mouthpiece and the starting point,
        // walked from the starting point up toward the mouthpiece
        // (decreasing position).
        let mut hole_indices: Vec<usize> = (0..self.instrument.holes.len())
            .filter(|&i| self.instrument.holes[i].position < position)
            .collect();
        hole_indices.sort_by(|&a, &b| {
            self.instrument.holes[b]
                .position
                .partial_cmp(&self.instrument.holes[a].position)
                .unwrap()
        });

        for idx in hole_indices {
            let hole_position = self.instrument.holes[idx].position;
            let bore = self.bore_segment(position, hole_position);
            state = bore.transfer_matrix(frequency, &self.air).apply(&state);
            let hole = self.hole_element(idx, fingering);
            state = hole.transfer_matrix(frequency, &self.air).apply(&state);
            position = hole_position;
        }

        let mouthpiece_position = self.instrument.mouthpiece.position;
        let bore = self.bore_segment(position, mouthpiece_position);
        state = bore.transfer_matrix(frequency, &self.air).apply(&state);

        let mouthpiece = MouthpieceElement {
            kind: self.instrument.mouthpiece.kind,
            headspace_volume: self.instrument.headspace_volume(),
        };
        state = mouthpiece.transfer_matrix(frequency, &self.air).apply(&state);

        state.impedance()
    }

    /// Imaginary part of `calc_z`; the shape the playing-range solver
    /// roots.
    pub fn reactance(&self, frequency: f64, fingering: &Fingering) -> f64 {
        self.calc_z(frequency, fingering).im
    }

    /// Reflection coefficient `(Z - Z0) / (Z + Z0)` at the mouthpiece port.
    pub fn calc_reflection_coefficient(&self, frequency: f64, fingering: &Fingering) -> Complex64 {
        let z = self.calc_z(frequency, fingering);
        let radius = self.instrument.bore_diameter_at(self.instrument.mouthpiece.position) / 2.0;
        let z0 = Complex64::new(crate::physics::characteristic_impedance(&self.air, radius), 0.0);
        (z - z0) / (z + z0)
    }

    /// Empirical mouthpiece gain scaled by impedance magnitude. `None` for
    /// reed mouthpieces, which define no gain factor in this data model.
    pub fn calc_gain(&self, frequency: f64, fingering: &Fingering) -> Option<f64> {
        let gain_factor = match self.instrument.mouthpiece.kind {
            MouthpieceKind::Fipple { fipple_factor, .. } => Some(fipple_factor),
            MouthpieceKind::Embouchure { airstream_length, airstream_height, .. } => {
                Some(airstream_length / airstream_height.max(1e-9))
            }
            MouthpieceKind::SingleReed { .. }
            | MouthpieceKind::DoubleReed { .. }
            | MouthpieceKind::LipReed { .. } => None,
        }?;
        Some(gain_factor * self.calc_z(frequency, fingering).norm())
    }
}

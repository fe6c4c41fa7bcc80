//! Tone-hole transfer matrix: a T-network of two series sub-matrices
//! around a shunt admittance (spec §4.4).

use num_complex::Complex64;

use crate::elements::AcousticElement;
use crate::physics::{characteristic_impedance, complex_wave_number, AirProperties};
use crate::transfer_matrix::TransferMatrix;

/// Low-`ka` radiation-reactance coefficient shared with the unflanged
/// termination (spec §4.6); a tone hole's mouth radiates into the bore
/// wall much like a small flanged opening.
const HOLE_RADIATION_COEFF: f64 = 0.6133;

/// Bore-radius interaction coefficient scaling how strongly a wide hole's
/// end correction is reduced by its proximity to the bore wall.
const BORE_INTERACTION_COEFF: f64 = 0.3;

/// Empirical soft-finger volume correction subtracted from a closed hole's
/// effective length. The source material documents the constant's
/// existence without deriving it; kept as-is rather than re-derived.
const DEFAULT_FINGER_ADJ: f64 = 0.0002;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoleState {
    Open,
    Closed,
    Plugged,
}

/// A tone hole's transfer matrix at a given open/closed/plugged state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoleElement {
    /// Hole bore diameter, m (before `size_multiplier`).
    pub diameter: f64,
    /// Chimney (wall) height, m.
    pub height: f64,
    /// Main bore diameter directly beneath the hole, m.
    pub bore_diameter: f64,
    pub state: HoleState,
    /// `true` for a keyed hole (pad-closed); finger adjustment is zero for
    /// keyed holes since there is no soft-finger volume intrusion.
    pub keyed: bool,
    /// Scales `diameter` before computing the effective length; used to
    /// probe the sensitivity of a fingering's frequency to hole size
    /// without constructing a new [`crate::instrument::Hole`].
    pub size_multiplier: f64,
}

impl HoleElement {
    fn hole_radius(&self) -> f64 {
        0.5 * self.diameter * self.size_multiplier
    }

    fn end_correction(&self, bore_radius: f64) -> f64 {
        let r_h = self.hole_radius();
        let ratio = r_h / bore_radius;
        HOLE_RADIATION_COEFF * r_h * (1.0 - BORE_INTERACTION_COEFF * ratio * ratio)
    }

    fn effective_open_length(&self, bore_radius: f64) -> f64 {
        self.height + self.end_correction(bore_radius)
    }

    fn effective_closed_length(&self, bore_radius: f64) -> f64 {
        let finger_adj = if self.keyed { 0.0 } else { DEFAULT_FINGER_ADJ };
        (self.height + self.end_correction(bore_radius) - finger_adj).max(0.0)
    }
}

impl AcousticElement for HoleElement {
    fn transfer_matrix(&self, frequency: f64, air: &AirProperties) -> TransferMatrix {
        if matches!(self.state, HoleState::Plugged) {
            return TransferMatrix::identity();
        }

        let bore_radius = self.bore_diameter / 2.0;
        let r_h = self.hole_radius();
        let z0_hole = Complex64::new(characteristic_impedance(air, r_h), 0.0);
        let k_star = complex_wave_number(frequency, r_h, air);
        let j = Complex64::new(0.0, 1.0);

        let y_h = match self.state {
            HoleState::Open => {
                let t_e = self.effective_open_length(bore_radius);
                1.0 / (j * z0_hole * (k_star * t_e).tan())
            }
            HoleState::Closed => {
                let t_c = self.effective_closed_length(bore_radius);
                (k_star * t_c).tan() / (j * z0_hole)
            }
            HoleState::Plugged => unreachable!(),
        };

        // Series sub-matrices represent the local bore-diameter bulge
        // beneath the hole; absent a quantified correction they reduce to
        // identity and the shunt admittance carries the full effect.
        TransferMatrix::identity()
            .chain(&TransferMatrix::shunt_admittance(y_h))
            .chain(&TransferMatrix::identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{FullAirModel, PhysicalParameters};

    fn air() -> AirProperties {
        FullAirModel.compute(&PhysicalParameters::default()).unwrap()
    }

    fn hole(state: HoleState) -> HoleElement {
        HoleElement {
            diameter: 0.008,
            height: 0.003,
            bore_diameter: 0.016,
            state,
            keyed: false,
            size_multiplier: 1.0,
        }
    }

    #[test]
    fn plugged_hole_is_identity() {
        let air = air();
        let m = hole(HoleState::Plugged).transfer_matrix(440.0, &air);
        assert!(m.approx_eq(&TransferMatrix::identity(), 1e-12));
    }

    #[test]
    fn open_hole_shunt_exceeds_closed_hole_shunt() {
        let air = air();
        let open = hole(HoleState::Open).transfer_matrix(440.0, &air);
        let closed = hole(HoleState::Closed).transfer_matrix(440.0, &air);
        assert!(open.up.norm() > closed.up.norm());
    }

    #[test]
    fn closed_hole_shunt_exceeds_plugged_hole_shunt() {
        let air = air();
        let closed = hole(HoleState::Closed).transfer_matrix(440.0, &air);
        assert!(closed.up.norm() > 0.0);
    }

    #[test]
    fn shunt_magnitude_decreases_with_smaller_diameter() {
        let air = air();
        let mut small = hole(HoleState::Open);
        small.size_multiplier = 0.5;
        let big = hole(HoleState::Open).transfer_matrix(440.0, &air);
        let small = small.transfer_matrix(440.0, &air);
        assert!(small.up.norm() < big.up.norm());
    }

    #[test]
    fn keyed_hole_has_no_finger_adjustment() {
        let mut keyed = hole(HoleState::Closed);
        keyed.keyed = true;
        let unkeyed = hole(HoleState::Closed);
        assert!(keyed.effective_closed_length(0.008) >= unkeyed.effective_closed_length(0.008));
    }
}

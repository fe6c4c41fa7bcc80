//! Radiation impedance at the open end of the bore (spec §4.6).

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::physics::{characteristic_impedance, wave_number, AirProperties};
use crate::transfer_matrix::StateVector;

/// Low-`ka` Levine-Schwinger real-part coefficient and end-correction
/// factor for an unflanged pipe end.
const UNFLANGED_REAL_COEFF: f64 = 0.25;
const UNFLANGED_DELTA_COEFF: f64 = 0.6133;

/// Same coefficients for a flanged (infinite baffle) pipe end: larger
/// radiation resistance and end correction than unflanged.
const FLANGED_REAL_COEFF: f64 = 0.5;
const FLANGED_DELTA_COEFF: f64 = 0.8216;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminationElement {
    pub flange_diameter: f64,
    pub bore_diameter_at_end: f64,
}

impl TerminationElement {
    pub fn is_flanged(&self) -> bool {
        self.flange_diameter > self.bore_diameter_at_end
    }

    /// Radiation impedance at the mouth, in the low-`ka` Levine-Schwinger
    /// regime: `Z_rad = Z0 * (real_coeff * (ka)^2 + j*k*delta)`.
    pub fn radiation_impedance(&self, frequency: f64, air: &AirProperties) -> Complex64 {
        let radius = self.bore_diameter_at_end / 2.0;
        let z0 = characteristic_impedance(air, radius);
        let k = wave_number(frequency, air.speed_of_sound);
        let ka = k * radius;

        let (real_coeff, delta_coeff) = if self.is_flanged() {
            (FLANGED_REAL_COEFF, FLANGED_DELTA_COEFF)
        } else {
            (UNFLANGED_REAL_COEFF, UNFLANGED_DELTA_COEFF)
        };

        let delta = delta_coeff * radius;
        Complex64::new(real_coeff * ka * ka, k * delta) * z0
    }

    /// The boundary state vector this termination presents to the bore:
    /// the closed-end vector `(1, 0)` if the fingering forces the end
    /// closed, otherwise the radiation-impedance state vector.
    pub fn state_vector(&self, frequency: f64, air: &AirProperties, open_end: bool) -> StateVector {
        if !open_end {
            return StateVector::closed_end();
        }
        StateVector::from_impedance(self.radiation_impedance(frequency, air))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{FullAirModel, PhysicalParameters};

    fn air() -> AirProperties {
        FullAirModel.compute(&PhysicalParameters::default()).unwrap()
    }

    #[test]
    fn flanged_is_selected_when_flange_exceeds_bore() {
        let t = TerminationElement { flange_diameter: 0.064, bore_diameter_at_end: 0.016 };
        assert!(t.is_flanged());
    }

    #[test]
    fn unflanged_is_selected_when_flange_does_not_exceed_bore() {
        let t = TerminationElement { flange_diameter: 0.0, bore_diameter_at_end: 0.016 };
        assert!(!t.is_flanged());
    }

    #[test]
    fn flanged_radiation_exceeds_unflanged_at_equal_radius_and_frequency() {
        let air = air();
        let unflanged = TerminationElement { flange_diameter: 0.0, bore_diameter_at_end: 0.016 };
        let flanged = TerminationElement { flange_diameter: 0.064, bore_diameter_at_end: 0.016 };
        let z_unflanged = unflanged.radiation_impedance(1000.0, &air).norm();
        let z_flanged = flanged.radiation_impedance(1000.0, &air).norm();
        assert!(z_flanged >= z_unflanged);
    }

    #[test]
    fn closed_end_state_vector_has_zero_velocity() {
        let t = TerminationElement { flange_diameter: 0.0, bore_diameter_at_end: 0.016 };
        let sv = t.state_vector(440.0, &air(), false);
        assert_eq!(sv.u, Complex64::new(0.0, 0.0));
    }

    #[test]
    fn open_end_state_vector_impedance_matches_radiation_impedance() {
        let air = air();
        let t = TerminationElement { flange_diameter: 0.0, bore_diameter_at_end: 0.016 };
        let sv = t.state_vector(440.0, &air, true);
        let z_direct = t.radiation_impedance(440.0, &air);
        assert!((sv.impedance() - z_direct).norm() < 1e-9);
    }

    #[test]
    fn increasing_flange_diameter_strictly_increases_radiation_resistance_at_1khz() {
        let air = air();
        let small_flange = TerminationElement { flange_diameter: 0.0, bore_diameter_at_end: 0.016 };
        let large_flange = TerminationElement { flange_diameter: 0.064, bore_diameter_at_end: 0.016 };
        let r_small = small_flange.radiation_impedance(1000.0, &air).re;
        let r_large = large_flange.radiation_impedance(1000.0, &air).re;
        assert!(r_large > r_small);
    }
}

//! Mouthpiece transfer matrices: flow nodes (fipple/embouchure) and
//! pressure nodes (reeds) (spec §4.5).

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::elements::AcousticElement;
use crate::instrument::MouthpieceKind;
use crate::physics::{characteristic_impedance, AirProperties};
use crate::transfer_matrix::TransferMatrix;

/// Hard-coded windway-height reference the fipple factor's cube-root
/// scaling is normalized against. Open question in the source material:
/// whether this should vary with temperature. Kept fixed.
const DEFAULT_WINDWAY_HEIGHT: f64 = 0.00078740;

/// Low-`ka` radiation coefficient reused for the window/embouchure mouth,
/// same low-ka regime as the unflanged termination.
const WINDOW_RADIATION_COEFF: f64 = 0.6133;

/// A mouthpiece's transfer matrix at the splitting edge or reed seat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouthpieceElement {
    pub kind: MouthpieceKind,
    /// Bore volume upstream of the splitting edge (spec §4.5,
    /// [`crate::instrument::Instrument::headspace_volume`]). Combined with
    /// the window admittance as a shunt compliance for flow-node
    /// mouthpieces; ignored by [`Self::reed_matrix`], which has no
    /// splitting edge to enclose a headspace behind.
    pub headspace_volume: f64,
}

impl MouthpieceElement {
    /// Series window impedance toward the exterior, with the headspace's
    /// compliance `Y = j*omega*V/(rho*c^2)` shunting the internal node in
    /// parallel with it, so the enclosed volume above the splitting edge
    /// actually loads the effective mouthpiece state vector.
    fn flow_node_matrix(&self, frequency: f64, air: &AirProperties, z_window: Complex64) -> TransferMatrix {
        let omega = 2.0 * PI * frequency;
        let j = Complex64::new(0.0, 1.0);
        let y_headspace =
            j * omega * self.headspace_volume / (air.density * air.speed_of_sound * air.speed_of_sound);
        TransferMatrix::shunt_admittance(y_headspace).chain(&TransferMatrix::series_impedance(z_window))
    }

    fn reed_matrix(&self, frequency: f64, air: &AirProperties, alpha: f64, crow_frequency: Option<f64>) -> TransferMatrix {
        let radius = (alpha.abs().max(1e-6) / PI).sqrt();
        let z0 = Complex64::new(characteristic_impedance(air, radius), 0.0);
        let omega = 2.0 * PI * frequency;
        let j = Complex64::new(0.0, 1.0);

        // Placeholder closed-end matrix per spec, composed with an
        // alpha-dependent shunt admittance standing in for reed dynamics.
        // Double reeds get a simple resonant boost near the crow
        // frequency; single/lip reeds use a flat admittance.
        let y_reed = match crow_frequency {
            Some(f_crow) if f_crow > 0.0 => {
                let ratio = frequency / f_crow;
                alpha * j * omega / (1.0 - ratio * ratio).max(1e-3)
            }
            _ => alpha * j * omega,
        };

        let placeholder = TransferMatrix {
            pp: Complex64::new(0.0, 0.0),
            pu: z0,
            up: Complex64::new(1.0, 0.0),
            uu: Complex64::new(0.0, 0.0),
        };
        placeholder.chain(&TransferMatrix::shunt_admittance(y_reed))
    }
}

impl AcousticElement for MouthpieceElement {
    fn transfer_matrix(&self, frequency: f64, air: &AirProperties) -> TransferMatrix {
        match self.kind {
            MouthpieceKind::Fipple {
                window_length,
                window_width,
                windway_height,
                fipple_factor,
            } => {
                let area = window_length * window_width;
                let equiv_radius = (area / PI).sqrt();
                let z_window = window_impedance(
                    frequency,
                    air,
                    equiv_radius,
                    area,
                    window_length,
                    fipple_factor,
                    windway_height,
                );
                self.flow_node_matrix(frequency, air, z_window)
            }
            MouthpieceKind::Embouchure {
                length,
                width,
                height: _,
                airstream_length,
                airstream_height,
            } => {
                let area = length * width;
                let equiv_radius = (area / PI).sqrt();
                let z_window = window_impedance(
                    frequency,
                    air,
                    equiv_radius,
                    area,
                    airstream_length,
                    1.0,
                    airstream_height,
                );
                self.flow_node_matrix(frequency, air, z_window)
            }
            MouthpieceKind::SingleReed { alpha } => self.reed_matrix(frequency, air, alpha, None),
            MouthpieceKind::DoubleReed { alpha, crow_frequency } => {
                self.reed_matrix(frequency, air, alpha, Some(crow_frequency))
            }
            MouthpieceKind::LipReed { alpha } => self.reed_matrix(frequency, air, alpha, None),
        }
    }
}

/// `Z_window`: a radiation term (low-`ka` reactance of the window mouth)
/// plus an inertial term scaled by `gain_factor` and a cube-root
/// correction against [`DEFAULT_WINDWAY_HEIGHT`].
#[allow(clippy::too_many_arguments)]
fn window_impedance(
    frequency: f64,
    air: &AirProperties,
    equiv_radius: f64,
    area: f64,
    effective_length: f64,
    gain_factor: f64,
    windway_height: f64,
) -> Complex64 {
    let omega = 2.0 * PI * frequency;
    let k = omega / air.speed_of_sound;
    let j = Complex64::new(0.0, 1.0);

    let radiation = j * k * WINDOW_RADIATION_COEFF * equiv_radius;
    let cube_root_correction = (windway_height.max(1e-9) / DEFAULT_WINDWAY_HEIGHT).cbrt();
    let inertial = j * omega * air.density * effective_length / area * gain_factor * cube_root_correction;

    radiation + inertial
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{FullAirModel, PhysicalParameters};

    fn air() -> AirProperties {
        FullAirModel.compute(&PhysicalParameters::default()).unwrap()
    }

    #[test]
    fn fipple_mouthpiece_has_unit_diagonal_at_zero_headspace() {
        let mp = MouthpieceElement {
            kind: MouthpieceKind::Fipple {
                window_length: 0.010,
                window_width: 0.008,
                windway_height: 0.003,
                fipple_factor: 1.0,
            },
            headspace_volume: 0.0,
        };
        let m = mp.transfer_matrix(800.0, &air());
        assert_eq!(m.pp, Complex64::new(1.0, 0.0));
        assert_eq!(m.uu, Complex64::new(1.0, 0.0));
        assert_eq!(m.up, Complex64::new(0.0, 0.0));
    }

    #[test]
    fn nonzero_headspace_introduces_a_shunt_admittance() {
        let kind = MouthpieceKind::Fipple {
            window_length: 0.010,
            window_width: 0.008,
            windway_height: 0.003,
            fipple_factor: 1.0,
        };
        let with_headspace = MouthpieceElement { kind, headspace_volume: 2.0e-6 };
        let m = with_headspace.transfer_matrix(800.0, &air());
        assert!(m.up.norm() > 0.0, "headspace compliance should appear as a nonzero shunt term");
        assert!((m.uu - Complex64::new(1.0, 0.0)).norm() > 1e-9);
    }

    #[test]
    fn larger_headspace_volume_increases_shunt_admittance_magnitude() {
        let kind = MouthpieceKind::Fipple {
            window_length: 0.010,
            window_width: 0.008,
            windway_height: 0.003,
            fipple_factor: 1.0,
        };
        let small = MouthpieceElement { kind, headspace_volume: 1.0e-6 }.transfer_matrix(800.0, &air());
        let large = MouthpieceElement { kind, headspace_volume: 5.0e-6 }.transfer_matrix(800.0, &air());
        assert!(large.up.norm() > small.up.norm());
    }

    #[test]
    fn fipple_window_impedance_grows_with_frequency() {
        let mp = MouthpieceElement {
            kind: MouthpieceKind::Fipple {
                window_length: 0.010,
                window_width: 0.008,
                windway_height: 0.003,
                fipple_factor: 1.0,
            },
            headspace_volume: 0.0,
        };
        let low = mp.transfer_matrix(200.0, &air()).pu.norm();
        let high = mp.transfer_matrix(2000.0, &air()).pu.norm();
        assert!(high > low);
    }

    #[test]
    fn single_reed_matrix_matches_placeholder_shape_at_zero_alpha() {
        let mp = MouthpieceElement {
            kind: MouthpieceKind::SingleReed { alpha: 0.0 },
            headspace_volume: 0.0,
        };
        let m = mp.transfer_matrix(440.0, &air());
        assert_eq!(m.pp, Complex64::new(0.0, 0.0));
        assert_eq!(m.uu, Complex64::new(0.0, 0.0));
    }

    #[test]
    fn double_reed_admittance_is_finite_away_from_crow_frequency() {
        let mp = MouthpieceElement {
            kind: MouthpieceKind::DoubleReed { alpha: 0.1, crow_frequency: 900.0 },
            headspace_volume: 0.0,
        };
        let m = mp.transfer_matrix(440.0, &air());
        assert!(m.pp.norm().is_finite());
        assert!(m.up.norm().is_finite());
    }
}

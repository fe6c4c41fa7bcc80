//! Cylindrical and conical bore-segment transfer matrices (spec §4.3).

use num_complex::Complex64;

use crate::elements::AcousticElement;
use crate::physics::{characteristic_impedance, complex_wave_number};
use crate::physics::AirProperties;
use crate::transfer_matrix::TransferMatrix;

/// Segment length below which a bore element is treated as acoustically
/// transparent (identity matrix) rather than risking division by a
/// near-zero quantity.
const MIN_SEGMENT_LENGTH: f64 = 1e-9;

/// Relative radius difference below which a conical segment is treated as
/// cylindrical to avoid the `1/(r_R - r_L)` singularity in the virtual
/// apex construction.
const CONE_CYLINDER_TOLERANCE: f64 = 1e-6;

/// A straight cylindrical bore segment of constant radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylinderSegment {
    pub radius: f64,
    pub length: f64,
}

impl AcousticElement for CylinderSegment {
    fn transfer_matrix(&self, frequency: f64, air: &AirProperties) -> TransferMatrix {
        cylinder_matrix(self.radius, self.length, frequency, air)
    }
}

fn cylinder_matrix(radius: f64, length: f64, frequency: f64, air: &AirProperties) -> TransferMatrix {
    if length < MIN_SEGMENT_LENGTH {
        return TransferMatrix::identity();
    }
    let k_star = complex_wave_number(frequency, radius, air);
    let z0 = Complex64::new(characteristic_impedance(air, radius), 0.0);
    let gamma_l = Complex64::new(0.0, 1.0) * k_star * length;
    let (cosh, sinh) = (gamma_l.cosh(), gamma_l.sinh());
    TransferMatrix {
        pp: cosh,
        pu: z0 * sinh,
        up: sinh / z0,
        uu: cosh,
    }
}

/// A conical frustum bore segment: left radius `radius_left`, right radius
/// `radius_right`, axial length `length`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeSegment {
    pub radius_left: f64,
    pub radius_right: f64,
    pub length: f64,
}

impl AcousticElement for ConeSegment {
    fn transfer_matrix(&self, frequency: f64, air: &AirProperties) -> TransferMatrix {
        if self.length < MIN_SEGMENT_LENGTH {
            return TransferMatrix::identity();
        }
        let radius_span = self.radius_right - self.radius_left;
        if radius_span.abs() < CONE_CYLINDER_TOLERANCE * self.radius_left.max(self.radius_right) {
            return cylinder_matrix(
                0.5 * (self.radius_left + self.radius_right),
                self.length,
                frequency,
                air,
            );
        }

        // Virtual apex distances (Benade conical-horn construction): the
        // cone's generating line meets the axis at a point `x1` before the
        // left end; `x2 = x1 + length` is the corresponding distance to
        // the right end.
        let x1 = self.radius_left * self.length / radius_span;
        let x2 = x1 + self.length;

        let k_star = complex_wave_number(frequency, self.radius_left, air);
        let z1 = Complex64::new(characteristic_impedance(air, self.radius_left), 0.0);

        let theta = k_star * self.length;
        let (cos_t, sin_t) = (theta.cos(), theta.sin());
        let j = Complex64::new(0.0, 1.0);
        let k_x1 = k_star * x1;
        let k_x2 = k_star * x2;

        let pp = (x2 / x1) * cos_t - sin_t / k_x1;
        let pu = j * z1 * (x2 / x1) * sin_t;
        let up = j / z1
            * ((Complex64::new(1.0, 0.0) + Complex64::new(1.0, 0.0) / (k_x1 * k_x2)) * sin_t
                + (Complex64::new(1.0, 0.0) / k_x1 - Complex64::new(1.0, 0.0) / k_x2) * cos_t);
        let uu = (x1 / x2) * cos_t + sin_t / k_x2;

        TransferMatrix { pp, pu, up, uu }
    }
}

//! 2x2 complex transfer matrix and acoustic state vector.
//!
//! ```text
//! [P_out]   [pp  pu] [P_in]
//! [U_out] = [up  uu] [U_in]
//! ```
//!
//! `chain` composes matrices as plain left-multiplication (`self * other`);
//! by convention the right operand corresponds to the element placed
//! further from the mouthpiece (see [`crate::calculator`]).

use num_complex::Complex64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferMatrix {
    pub pp: Complex64,
    pub pu: Complex64,
    pub up: Complex64,
    pub uu: Complex64,
}

impl TransferMatrix {
    pub fn new(pp: Complex64, pu: Complex64, up: Complex64, uu: Complex64) -> Self {
        Self { pp, pu, up, uu }
    }

    pub fn identity() -> Self {
        Self {
            pp: Complex64::new(1.0, 0.0),
            pu: Complex64::new(0.0, 0.0),
            up: Complex64::new(0.0, 0.0),
            uu: Complex64::new(1.0, 0.0),
        }
    }

    /// A pure series impedance `z` inserted into the chain: `[[1, z], [0, 1]]`.
    pub fn series_impedance(z: Complex64) -> Self {
        Self {
            pp: Complex64::new(1.0, 0.0),
            pu: z,
            up: Complex64::new(0.0, 0.0),
            uu: Complex64::new(1.0, 0.0),
        }
    }

    /// A pure shunt admittance `y` inserted into the chain: `[[1, 0], [y, 1]]`.
    pub fn shunt_admittance(y: Complex64) -> Self {
        Self {
            pp: Complex64::new(1.0, 0.0),
            pu: Complex64::new(0.0, 0.0),
            up: y,
            uu: Complex64::new(1.0, 0.0),
        }
    }

    /// `self * other`. Allocates nothing beyond the returned struct (both
    /// operands are `Copy`); see [`Self::compose_into`] for the explicit
    /// scratch-buffer variant used on the optimizer's hot path.
    pub fn chain(&self, other: &TransferMatrix) -> TransferMatrix {
        TransferMatrix {
            pp: self.pp * other.pp + self.pu * other.up,
            pu: self.pp * other.pu + self.pu * other.uu,
            up: self.up * other.pp + self.uu * other.up,
            uu: self.up * other.pu + self.uu * other.uu,
        }
    }

    /// Writes `left * right` into `*self` without constructing an
    /// intermediate `TransferMatrix`. Functionally identical to
    /// `*self = left.chain(right)`; kept as an explicit API so the
    /// optimizer's inner evaluation loop has a named zero-allocation
    /// entry point per the hot-path requirement in spec §4.2.
    pub fn compose_into(&mut self, left: &TransferMatrix, right: &TransferMatrix) {
        let pp = left.pp * right.pp + left.pu * right.up;
        let pu = left.pp * right.pu + left.pu * right.uu;
        let up = left.up * right.pp + left.uu * right.up;
        let uu = left.up * right.pu + left.uu * right.uu;
        self.pp = pp;
        self.pu = pu;
        self.up = up;
        self.uu = uu;
    }

    pub fn apply(&self, state: &StateVector) -> StateVector {
        StateVector {
            p: self.pp * state.p + self.pu * state.u,
            u: self.up * state.p + self.uu * state.u,
        }
    }

    pub fn determinant(&self) -> Complex64 {
        self.pp * self.uu - self.pu * self.up
    }

    pub fn inverse(&self) -> Option<TransferMatrix> {
        let det = self.determinant();
        if det.norm() < 1e-300 {
            return None;
        }
        Some(TransferMatrix {
            pp: self.uu / det,
            pu: -self.pu / det,
            up: -self.up / det,
            uu: self.pp / det,
        })
    }

    pub fn approx_eq(&self, other: &TransferMatrix, tol: f64) -> bool {
        (self.pp - other.pp).norm() < tol
            && (self.pu - other.pu).norm() < tol
            && (self.up - other.up).norm() < tol
            && (self.uu - other.uu).norm() < tol
    }
}

/// Acoustic state at a point in the bore: pressure `p` and volume velocity `u`.
/// Input impedance at that point is `p / u`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub p: Complex64,
    pub u: Complex64,
}

impl StateVector {
    pub fn new(p: Complex64, u: Complex64) -> Self {
        Self { p, u }
    }

    /// Input impedance `Z = P / U` at this point.
    pub fn impedance(&self) -> Complex64 {
        self.p / self.u
    }

    /// State vector for a rigid closed end: no volume velocity.
    pub fn closed_end() -> Self {
        Self {
            p: Complex64::new(1.0, 0.0),
            u: Complex64::new(0.0, 0.0),
        }
    }

    /// State vector corresponding to a given (possibly complex) terminal
    /// impedance: fixes `U = 1` and lets `P = Z` (valid since only the
    /// ratio `P/U` matters after composing with the rest of the chain).
    pub fn from_impedance(z: Complex64) -> Self {
        Self {
            p: z,
            u: Complex64::new(1.0, 0.0),
        }
    }
}

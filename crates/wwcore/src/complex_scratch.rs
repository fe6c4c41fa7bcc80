//! Mutable scratch complex value for hot per-frequency, per-fingering loops.
//!
//! `num_complex::Complex64` is the immutable value type used everywhere
//! outside the hot path. Inside [`crate::optimizer`]'s inner evaluation
//! loop the same handful of complex multiplications run millions of
//! times (one `calc_z` per Brent iteration, per fingering, per objective
//! evaluation); `ComplexScratch` lets that inner loop mutate in place
//! instead of constructing a fresh `Complex64` per operation.

use num_complex::Complex64;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComplexScratch {
    pub re: f64,
    pub im: f64,
}

impl ComplexScratch {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub fn from_complex(z: Complex64) -> Self {
        Self { re: z.re, im: z.im }
    }

    pub fn to_complex(self) -> Complex64 {
        Complex64::new(self.re, self.im)
    }

    pub fn set(&mut self, re: f64, im: f64) {
        self.re = re;
        self.im = im;
    }

    /// `self = a * b`.
    pub fn multiply_into(&mut self, a: &ComplexScratch, b: &ComplexScratch) {
        let re = a.re * b.re - a.im * b.im;
        let im = a.re * b.im + a.im * b.re;
        self.re = re;
        self.im = im;
    }

    /// `self = a + b`.
    pub fn add_into(&mut self, a: &ComplexScratch, b: &ComplexScratch) {
        self.re = a.re + b.re;
        self.im = a.im + b.im;
    }

    /// `self = a / b`.
    pub fn divide_into(&mut self, a: &ComplexScratch, b: &ComplexScratch) {
        let denom = b.re * b.re + b.im * b.im;
        self.re = (a.re * b.re + a.im * b.im) / denom;
        self.im = (a.im * b.re - a.re * b.im) / denom;
    }

    pub fn norm(&self) -> f64 {
        (self.re * self.re + self.im * self.im).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiply_into_matches_complex64() {
        let a = ComplexScratch::new(3.0, 4.0);
        let b = ComplexScratch::new(1.0, -2.0);
        let mut out = ComplexScratch::default();
        out.multiply_into(&a, &b);
        let expected = a.to_complex() * b.to_complex();
        assert!((out.re - expected.re).abs() < 1e-12);
        assert!((out.im - expected.im).abs() < 1e-12);
    }

    #[test]
    fn divide_into_matches_complex64() {
        let a = ComplexScratch::new(3.0, 4.0);
        let b = ComplexScratch::new(1.0, -2.0);
        let mut out = ComplexScratch::default();
        out.divide_into(&a, &b);
        let expected = a.to_complex() / b.to_complex();
        assert!((out.re - expected.re).abs() < 1e-10);
        assert!((out.im - expected.im).abs() < 1e-10);
    }

    #[test]
    fn add_into_matches_complex64() {
        let a = ComplexScratch::new(1.0, 2.0);
        let b = ComplexScratch::new(3.0, -1.0);
        let mut out = ComplexScratch::default();
        out.add_into(&a, &b);
        assert_eq!(out.re, 4.0);
        assert_eq!(out.im, 1.0);
    }

    // The immutable `Complex64` (from `num_complex`) is the value type used
    // everywhere outside the hot loop; these pin down the handful of
    // identities spec §8's scenario 1 names directly against it.
    #[test]
    fn complex64_modulus_of_three_four_five_triangle() {
        let z = Complex64::new(3.0, 4.0);
        assert!((z.norm() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn complex64_multiply_matches_expected_product() {
        let a = Complex64::new(1.0, 2.0);
        let b = Complex64::new(3.0, 4.0);
        assert_eq!(a * b, Complex64::new(-5.0, 10.0));
    }

    #[test]
    fn complex64_sqrt_of_i_is_on_the_unit_circle_at_45_degrees() {
        let i = Complex64::new(0.0, 1.0);
        let root = i.sqrt();
        let expected = 1.0 / std::f64::consts::SQRT_2;
        assert!((root.re - expected).abs() < 1e-10);
        assert!((root.im - expected).abs() < 1e-10);
    }

    #[test]
    fn complex64_euler_identity() {
        let j_pi = Complex64::new(0.0, std::f64::consts::PI);
        let result = j_pi.exp();
        assert!((result - Complex64::new(-1.0, 0.0)).norm() < 1e-10);
    }
}

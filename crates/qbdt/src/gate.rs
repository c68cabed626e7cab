//! Single-qubit gate matrices.

use num_complex::Complex64;
use std::f64::consts::PI;

/// Default tolerance for structural predicates on matrices.
pub const GATE_EPSILON: f64 = 1e-10;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// A 2x2 complex matrix in row-major order: `[[m0, m1], [m2, m3]]`.
///
/// Applied to a qubit, row 0 produces the new `|0⟩` amplitude and row 1
/// the new `|1⟩` amplitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mtrx2 {
    /// Row-major elements.
    pub data: [Complex64; 4],
}

impl Mtrx2 {
    /// Create a new 2x2 matrix.
    pub const fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self { data: [a, b, c, d] }
    }

    /// Diagonal matrix `diag(top_left, bottom_right)`.
    pub const fn phase(top_left: Complex64, bottom_right: Complex64) -> Self {
        Self::new(top_left, ZERO, ZERO, bottom_right)
    }

    /// Anti-diagonal matrix `[[0, top_right], [bottom_left, 0]]`.
    pub const fn invert(top_right: Complex64, bottom_left: Complex64) -> Self {
        Self::new(ZERO, top_right, bottom_left, ZERO)
    }

    /// The identity matrix.
    pub const fn identity() -> Self {
        Self::phase(ONE, ONE)
    }

    /// Hadamard.
    pub fn h() -> Self {
        let s = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
        Self::new(s, s, s, -s)
    }

    /// Pauli-X.
    pub const fn x() -> Self {
        Self::invert(ONE, ONE)
    }

    /// Pauli-Y.
    pub const fn y() -> Self {
        Self::invert(Complex64::new(0.0, -1.0), Complex64::new(0.0, 1.0))
    }

    /// Pauli-Z.
    pub const fn z() -> Self {
        Self::phase(ONE, Complex64::new(-1.0, 0.0))
    }

    /// S = sqrt(Z).
    pub const fn s() -> Self {
        Self::phase(ONE, Complex64::new(0.0, 1.0))
    }

    /// S-dagger.
    pub const fn sdg() -> Self {
        Self::phase(ONE, Complex64::new(0.0, -1.0))
    }

    /// T = fourth root of Z.
    pub fn t() -> Self {
        Self::p(PI / 4.0)
    }

    /// T-dagger.
    pub fn tdg() -> Self {
        Self::p(-PI / 4.0)
    }

    /// SX = sqrt(X).
    pub fn sx() -> Self {
        let half = Complex64::new(0.5, 0.0);
        let half_i = Complex64::new(0.0, 0.5);
        Self::new(half + half_i, half - half_i, half - half_i, half + half_i)
    }

    /// SX-dagger.
    pub fn sxdg() -> Self {
        Self::sx().dagger()
    }

    /// X rotation.
    pub fn rx(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(0.0, -s),
            Complex64::new(0.0, -s),
            Complex64::new(c, 0.0),
        )
    }

    /// Y rotation.
    pub fn ry(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(-s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(c, 0.0),
        )
    }

    /// Z rotation.
    pub fn rz(theta: f64) -> Self {
        Self::phase(
            Complex64::from_polar(1.0, -theta / 2.0),
            Complex64::from_polar(1.0, theta / 2.0),
        )
    }

    /// Phase gate P(lambda).
    pub fn p(lambda: f64) -> Self {
        Self::phase(ONE, Complex64::from_polar(1.0, lambda))
    }

    /// U(theta, phi, lambda).
    pub fn u(theta: f64, phi: f64, lambda: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        )
    }

    /// Matrix product `self * other` (apply `other` first).
    #[allow(clippy::many_single_char_names)]
    pub fn mul(&self, other: &Self) -> Self {
        let [a, b, c, d] = self.data;
        let [e, f, g, h] = other.data;
        Self::new(a * e + b * g, a * f + b * h, c * e + d * g, c * f + d * h)
    }

    /// Conjugate transpose.
    pub fn dagger(&self) -> Self {
        Self::new(
            self.data[0].conj(),
            self.data[2].conj(),
            self.data[1].conj(),
            self.data[3].conj(),
        )
    }

    /// Matrix inverse. Returns `None` for a singular matrix.
    pub fn inverse(&self) -> Option<Self> {
        let [a, b, c, d] = self.data;
        let det = a * d - b * c;
        if det.norm_sqr() <= GATE_EPSILON * GATE_EPSILON {
            return None;
        }
        Some(Self::new(d / det, -b / det, -c / det, a / det))
    }

    /// Off-diagonal entries vanish within `eps` (squared magnitude).
    pub fn is_phase(&self, eps: f64) -> bool {
        self.data[1].norm_sqr() <= eps && self.data[2].norm_sqr() <= eps
    }

    /// Diagonal entries vanish within `eps` (squared magnitude).
    pub fn is_invert(&self, eps: f64) -> bool {
        self.data[0].norm_sqr() <= eps && self.data[3].norm_sqr() <= eps
    }

    /// Identity up to a global phase.
    pub fn is_identity(&self, eps: f64) -> bool {
        self.is_phase(eps) && (self.data[0] - self.data[3]).norm_sqr() <= eps
    }

    /// Apply to an amplitude pair.
    #[inline]
    pub fn apply(&self, a0: Complex64, a1: Complex64) -> (Complex64, Complex64) {
        (
            self.data[0] * a0 + self.data[1] * a1,
            self.data[2] * a0 + self.data[3] * a1,
        )
    }
}

impl Default for Mtrx2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Mtrx2 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Mtrx2::mul(&self, &rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &Mtrx2, b: &Mtrx2) -> bool {
        a.data
            .iter()
            .zip(b.data.iter())
            .all(|(x, y)| (x - y).norm() < 1e-10)
    }

    #[test]
    fn test_hh_is_identity() {
        assert!(approx_eq(&(Mtrx2::h() * Mtrx2::h()), &Mtrx2::identity()));
    }

    #[test]
    fn test_s_squared_is_z() {
        assert!(approx_eq(&(Mtrx2::s() * Mtrx2::s()), &Mtrx2::z()));
        assert!(approx_eq(&(Mtrx2::t() * Mtrx2::t()), &Mtrx2::s()));
    }

    #[test]
    fn test_sx_squared_is_x() {
        assert!(approx_eq(&(Mtrx2::sx() * Mtrx2::sx()), &Mtrx2::x()));
        assert!(approx_eq(&(Mtrx2::sx() * Mtrx2::sxdg()), &Mtrx2::identity()));
    }

    #[test]
    fn test_inverse_matches_dagger_for_unitary() {
        let u = Mtrx2::u(0.3, 1.1, -0.7);
        let inv = u.inverse().unwrap();
        assert!(approx_eq(&inv, &u.dagger()));
        assert!(approx_eq(&(u * inv), &Mtrx2::identity()));
    }

    #[test]
    fn test_singular_has_no_inverse() {
        let m = Mtrx2::new(ONE, ONE, ONE, ONE);
        assert!(m.inverse().is_none());
    }

    #[test]
    fn test_predicates() {
        assert!(Mtrx2::z().is_phase(GATE_EPSILON));
        assert!(!Mtrx2::z().is_invert(GATE_EPSILON));
        assert!(Mtrx2::y().is_invert(GATE_EPSILON));
        assert!(!Mtrx2::h().is_phase(GATE_EPSILON));
        assert!(Mtrx2::rz(0.0).is_identity(GATE_EPSILON));
        assert!(!Mtrx2::s().is_identity(GATE_EPSILON));
    }
}

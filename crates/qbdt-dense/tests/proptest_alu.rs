//! Property-based tests for the reference engine's arithmetic operators.
//!
//! Each operator is checked against its inverse on random basis states and
//! on random superpositions.

use num_complex::Complex64;
use proptest::prelude::*;
use qbdt_dense::{DenseAlu, DenseEngine, StateVectorEngine};

const QUBITS: usize = 6;

fn engine_with(state: &[Complex64]) -> StateVectorEngine {
    let mut sv = StateVectorEngine::with_seed(QUBITS, QUBITS, 0).unwrap();
    sv.set_quantum_state(state).unwrap();
    sv
}

/// A random normalized state on `QUBITS` qubits.
fn arb_state() -> impl Strategy<Value = Vec<Complex64>> {
    prop::collection::vec((-1.0f64..1.0, -1.0f64..1.0), 1 << QUBITS).prop_filter_map(
        "non-zero norm",
        |pairs| {
            let state: Vec<Complex64> = pairs.into_iter().map(|(r, i)| Complex64::new(r, i)).collect();
            let norm: f64 = state.iter().map(Complex64::norm_sqr).sum::<f64>().sqrt();
            (norm > 1e-6).then(|| state.into_iter().map(|a| a / norm).collect())
        },
    )
}

fn assert_close(a: &[Complex64], b: &[Complex64]) {
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).norm() < 1e-9, "{x} != {y}");
    }
}

proptest! {
    #[test]
    fn inc_then_complement_is_identity(state in arb_state(), start in 0usize..3, length in 1usize..4, to_add in 0usize..64) {
        let mut sv = engine_with(&state);
        let modulus = 1usize << length;
        sv.inc(to_add, start, length).unwrap();
        sv.inc(modulus - (to_add % modulus), start, length).unwrap();
        assert_close(sv.amplitudes(), &state);
    }

    #[test]
    fn inc_preserves_norm(state in arb_state(), to_add in 0usize..64) {
        let mut sv = engine_with(&state);
        sv.inc(to_add, 1, 4).unwrap();
        prop_assert!((sv.norm_sqr() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mul_div_inverse_on_basis(value in 0usize..8, to_mul in 1usize..8) {
        let mut sv = StateVectorEngine::with_seed(QUBITS, QUBITS, 0).unwrap();
        sv.set_amplitude(0, Complex64::new(0.0, 0.0)).unwrap();
        sv.set_amplitude(value, Complex64::new(1.0, 0.0)).unwrap();
        sv.mul(to_mul, 0, 3, 3).unwrap();
        let product = value * to_mul;
        prop_assert!((sv.amplitudes()[product].re - 1.0).abs() < 1e-12);
        sv.div(to_mul, 0, 3, 3).unwrap();
        prop_assert!((sv.amplitudes()[value].re - 1.0).abs() < 1e-12);
    }

    #[test]
    fn incdecc_round_trip(state in arb_state(), to_add in 0usize..16) {
        let mut sv = engine_with(&state);
        sv.incdecc(to_add, 0, 3, 5).unwrap();
        sv.incdecc(16 - to_add, 0, 3, 5).unwrap();
        assert_close(sv.amplitudes(), &state);
    }

    #[test]
    fn incdecsc_preserves_norm(state in arb_state(), to_add in 0usize..16, flagged in any::<bool>()) {
        let mut sv = engine_with(&state);
        let overflow = flagged.then_some(4);
        sv.incdecsc(to_add, 0, 3, overflow, 5).unwrap();
        prop_assert!((sv.norm_sqr() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn incbcd_then_complement_is_identity(state in arb_state(), to_add in 0usize..40) {
        let mut sv = engine_with(&state);
        sv.incbcd(to_add, 1, 4).unwrap();
        sv.incbcd(10 - to_add % 10, 1, 4).unwrap();
        assert_close(sv.amplitudes(), &state);
    }

    #[test]
    fn cmul_cdiv_inverse_on_superpositions(state in arb_state(), to_mul in 1usize..4) {
        // Only states with a zero carry register survive multiplication.
        let mut sv = engine_with(&state);
        let kept: Vec<Complex64> = state
            .iter()
            .enumerate()
            .map(|(i, a)| if i & 0b001100 != 0 && i & 0b100000 != 0 { Complex64::new(0.0, 0.0) } else { *a })
            .collect();
        sv.cmul(to_mul, 0, 2, 2, &[5]).unwrap();
        sv.cdiv(to_mul, 0, 2, 2, &[5]).unwrap();
        assert_close(sv.amplitudes(), &kept);
    }
}

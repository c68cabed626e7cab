//! Tests for register construction, gate dispatch and state access.

use std::sync::{Arc, Mutex};

use num_complex::Complex64;
use qbdt::{Mtrx2, Qbdt, QbdtConfig, QbdtError};

const TOL: f64 = 1e-10;

fn reg(qubits: usize, perm: u128) -> Qbdt {
    Qbdt::with_config(qubits, perm, QbdtConfig::default().with_seed(5)).unwrap()
}

fn close(a: Complex64, b: Complex64) -> bool {
    (a - b).norm() < TOL
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn basis_state_amplitudes() {
    let mut r = reg(4, 0b1010);
    assert!(close(r.get_amplitude(0b1010).unwrap(), Complex64::new(1.0, 0.0)));
    assert!(close(r.get_amplitude(0b0000).unwrap(), Complex64::new(0.0, 0.0)));
    assert_eq!(r.max_power(), 16);
}

#[test]
fn invalid_config_rejected() {
    let config = QbdtConfig {
        normalize_threshold: -1.0,
        ..QbdtConfig::default()
    };
    assert!(matches!(
        Qbdt::with_config(2, 0, config),
        Err(QbdtError::Config(_))
    ));
}

#[test]
fn wide_register_is_cheap() {
    // 100 qubits in a product state stay one node per level.
    let mut r = reg(100, 0);
    for q in 0..100 {
        r.h(q).unwrap();
    }
    assert_eq!(r.count_branches(), 101);
    assert!(matches!(
        r.get_quantum_state(),
        Err(QbdtError::TooManyQubits { requested: 100, .. })
    ));
}

#[test]
fn registers_share_a_worker_pool() {
    let config = QbdtConfig::default().with_seed(5);
    let pool = Qbdt::build_pool(&config).unwrap();
    let mut a = Qbdt::with_pool(2, 0b01, config.clone(), Arc::clone(&pool)).unwrap();
    let b = Qbdt::with_pool(1, 0b1, config, Arc::clone(&pool)).unwrap();
    assert!(Arc::ptr_eq(&a.pool(), &b.pool()));
    a.compose_end(&b).unwrap();
    assert!(Arc::ptr_eq(&a.pool(), &pool));
    assert!(close(a.get_amplitude(0b101).unwrap(), Complex64::new(1.0, 0.0)));
}

#[test]
fn set_permutation_with_phase() {
    let mut r = reg(3, 0);
    r.h(1).unwrap();
    let phase = Complex64::new(0.0, 1.0);
    r.set_permutation(0b101, phase).unwrap();
    assert!(close(r.get_amplitude(0b101).unwrap(), phase));
    assert!(matches!(
        r.set_permutation(8, phase),
        Err(QbdtError::PermutationOutOfRange { perm: 8, .. })
    ));
}

// ---------------------------------------------------------------------------
// Gates
// ---------------------------------------------------------------------------

#[test]
fn ghz_state() {
    let mut r = reg(5, 0);
    r.h(0).unwrap();
    for q in 0..4 {
        r.cnot(q, q + 1).unwrap();
    }
    let s = std::f64::consts::FRAC_1_SQRT_2;
    assert!(close(r.get_amplitude(0).unwrap(), Complex64::new(s, 0.0)));
    assert!(close(r.get_amplitude(0b11111).unwrap(), Complex64::new(s, 0.0)));
    let probs = r.get_probs().unwrap();
    assert!((probs.iter().sum::<f64>() - 1.0).abs() < TOL);
}

#[test]
fn control_below_target() {
    // Control on the last qubit, target on the first.
    let mut r = reg(3, 0b100);
    r.cnot(2, 0).unwrap();
    assert!(close(r.get_amplitude(0b101).unwrap(), Complex64::new(1.0, 0.0)));
}

#[test]
fn anti_controlled_gate() {
    let mut r = reg(2, 0);
    r.anti_cnot(0, 1).unwrap();
    assert!(close(r.get_amplitude(0b10).unwrap(), Complex64::new(1.0, 0.0)));
    r.x(0).unwrap();
    r.anti_cnot(0, 1).unwrap();
    assert!(close(r.get_amplitude(0b11).unwrap(), Complex64::new(1.0, 0.0)));
}

#[test]
fn mc_phase_only_on_all_ones() {
    let mut r = reg(3, 0);
    for q in 0..3 {
        r.h(q).unwrap();
    }
    let minus = Complex64::new(-1.0, 0.0);
    r.mc_phase(&[0, 1], Complex64::new(1.0, 0.0), minus, 2).unwrap();
    let a = 1.0 / 8f64.sqrt();
    assert!(close(r.get_amplitude(0b111).unwrap(), Complex64::new(-a, 0.0)));
    assert!(close(r.get_amplitude(0b011).unwrap(), Complex64::new(a, 0.0)));
}

#[test]
fn toffoli() {
    let mut r = reg(3, 0b011);
    r.ccnot(0, 1, 2).unwrap();
    assert!(close(r.get_amplitude(0b111).unwrap(), Complex64::new(1.0, 0.0)));
}

#[test]
fn rotation_composition_matches_single_rotation() {
    let mut a = reg(1, 0);
    a.ry(0.3, 0).unwrap();
    a.ry(0.4, 0).unwrap();
    let mut b = reg(1, 0);
    b.ry(0.7, 0).unwrap();
    assert!(a.sum_sqr_diff(&mut b).unwrap() < TOL);
}

#[test]
fn general_matrix_on_middle_qubit() {
    let m = Mtrx2::u(0.9, 0.2, -0.4);
    let mut r = reg(3, 0b101);
    r.mtrx(&m, 1).unwrap();
    assert!(close(r.get_amplitude(0b101).unwrap(), m.data[0]));
    assert!(close(r.get_amplitude(0b111).unwrap(), m.data[2]));
}

// ---------------------------------------------------------------------------
// Bulk state access
// ---------------------------------------------------------------------------

#[test]
fn set_and_get_quantum_state() {
    let mut r = reg(2, 0);
    let state = [
        Complex64::new(0.5, 0.0),
        Complex64::new(0.0, 0.5),
        Complex64::new(-0.5, 0.0),
        Complex64::new(0.0, -0.5),
    ];
    r.set_quantum_state(&state).unwrap();
    let read = r.get_quantum_state().unwrap();
    for (x, y) in read.iter().zip(&state) {
        assert!(close(*x, *y));
    }
}

#[test]
fn normalize_state_rescales() {
    let mut r = reg(1, 0);
    r.set_quantum_state(&[Complex64::new(3.0, 0.0), Complex64::new(0.0, 4.0)])
        .unwrap();
    assert!((r.norm_sqr() - 25.0).abs() < 1e-9);
    r.normalize_state().unwrap();
    assert!((r.norm_sqr() - 1.0).abs() < TOL);
    assert!(close(r.get_amplitude(1).unwrap(), Complex64::new(0.0, 0.8)));
}

#[test]
fn clones_are_independent() {
    let mut a = reg(2, 0);
    a.h(0).unwrap();
    let mut b = a.clone();
    b.x(1).unwrap();
    assert!(close(a.get_amplitude(0b10).unwrap(), Complex64::new(0.0, 0.0)));
    assert!(!close(b.get_amplitude(0b10).unwrap(), Complex64::new(0.0, 0.0)));
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

#[test]
fn traversal_sees_flushed_gates() {
    let mut r = reg(2, 0);
    // Still buffered when the traversal starts.
    r.h(0).unwrap();
    r.mtrx(&Mtrx2::t(), 0).unwrap();
    let seen = Mutex::new(vec![None; 4]);
    r.get_traversal(|i, amp| seen.lock().unwrap()[i] = Some(amp))
        .unwrap();
    let seen = seen.into_inner().unwrap();

    let s = std::f64::consts::FRAC_1_SQRT_2;
    assert!(seen.iter().all(Option::is_some));
    assert!(close(seen[0].unwrap(), Complex64::new(s, 0.0)));
    assert!(close(
        seen[1].unwrap(),
        Complex64::from_polar(s, std::f64::consts::FRAC_PI_4)
    ));
    assert!(close(seen[2].unwrap(), Complex64::new(0.0, 0.0)));

    let probs = r.get_probs().unwrap();
    assert!((probs[0] - 0.5).abs() < TOL);
    assert!((probs[1] - 0.5).abs() < TOL);
}

#[test]
fn traversal_refuses_wide_register() {
    let mut r = reg(70, 0);
    assert!(matches!(
        r.get_traversal(|_, _| {}),
        Err(QbdtError::TooManyQubits { requested: 70, .. })
    ));
}

//! Tests for probabilities, measurement and compression diagnostics.

use qbdt::{Mtrx2, Qbdt, QbdtConfig, QbdtError};

const TOL: f64 = 1e-10;

fn reg(qubits: usize, perm: u128, seed: u64) -> Qbdt {
    Qbdt::with_config(qubits, perm, QbdtConfig::default().with_seed(seed)).unwrap()
}

// ---------------------------------------------------------------------------
// Probabilities
// ---------------------------------------------------------------------------

#[test]
fn hadamard_gives_even_odds() {
    let mut r = reg(2, 0, 1);
    r.h(0).unwrap();
    assert!((r.prob(0).unwrap() - 0.5).abs() < TOL);
    assert!(r.prob(1).unwrap().abs() < TOL);
    assert!((r.prob_all(0b00).unwrap() - 0.5).abs() < TOL);
    assert!((r.prob_all(0b01).unwrap() - 0.5).abs() < TOL);
}

#[test]
fn prune_shares_identical_branches() {
    let config = QbdtConfig {
        auto_prune: false,
        ..QbdtConfig::default().with_seed(2)
    };
    let mut r = Qbdt::with_config(2, 0, config).unwrap();
    r.h(0).unwrap();
    let unpruned = r.count_branches();
    r.prune();
    // Root, one shared child for both values of qubit 0, one leaf.
    assert_eq!(r.count_branches(), 3);
    assert!(unpruned >= 3);
    assert!((r.prob(0).unwrap() - 0.5).abs() < TOL);
}

#[test]
fn prob_all_snaps_certain_state() {
    let mut r = reg(2, 0, 3);
    r.h(1).unwrap();
    r.h(1).unwrap();
    assert!((r.prob_all(0).unwrap() - 1.0).abs() < TOL);
    assert_eq!(r.count_branches(), 3);
}

#[test]
fn phase_shard_does_not_change_probability() {
    let mut r = reg(1, 0, 4);
    r.h(0).unwrap();
    r.mtrx(&Mtrx2::t(), 0).unwrap();
    assert!((r.prob(0).unwrap() - 0.5).abs() < TOL);
}

// ---------------------------------------------------------------------------
// Measurement
// ---------------------------------------------------------------------------

#[test]
fn forced_measurement_collapses() {
    let mut r = reg(3, 0, 5);
    r.h(1).unwrap();
    r.cnot(1, 2).unwrap();
    assert!(r.force_m(1, true, true, true).unwrap());
    assert!((r.prob(1).unwrap() - 1.0).abs() < TOL);
    assert!((r.prob(2).unwrap() - 1.0).abs() < TOL);
    assert!((r.norm_sqr() - 1.0).abs() < TOL);
}

#[test]
fn forced_impossible_outcome_errors() {
    let mut r = reg(2, 0b01, 6);
    assert!(matches!(
        r.force_m(1, true, true, true),
        Err(QbdtError::ImpossibleOutcome { qubit: 1 })
    ));
    assert!((r.prob(0).unwrap() - 1.0).abs() < TOL);
}

#[test]
fn force_without_apply_leaves_state() {
    let mut r = reg(1, 0, 7);
    r.h(0).unwrap();
    assert!(!r.force_m(0, false, true, false).unwrap());
    assert!((r.prob(0).unwrap() - 0.5).abs() < TOL);
}

#[test]
fn bell_measurements_agree() {
    for seed in 0..20 {
        let mut r = reg(2, 0, seed);
        r.h(0).unwrap();
        r.cnot(0, 1).unwrap();
        let first = r.m(0).unwrap();
        let second = r.m(1).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn m_all_collapses_to_sample() {
    let mut r = reg(3, 0, 8);
    for q in 0..3 {
        r.h(q).unwrap();
    }
    let outcome = r.m_all().unwrap();
    assert!((r.prob_all(outcome).unwrap() - 1.0).abs() < TOL);
}

#[test]
fn sampling_without_collapse_keeps_state() {
    let mut r = reg(2, 0, 9);
    r.h(0).unwrap();
    r.cnot(0, 1).unwrap();
    let mut seen = [false; 4];
    for _ in 0..64 {
        let s = r.m_all_optional_collapse(false).unwrap();
        seen[s as usize] = true;
    }
    assert!(seen[0] && seen[3]);
    assert!(!seen[1] && !seen[2]);
}

#[test]
fn sample_clone_maps_qubit_powers() {
    let mut r = reg(3, 0b101, 10);
    // Output bit 0 reports qubit 2, output bit 1 reports qubit 1.
    assert_eq!(r.sample_clone(&[0b100, 0b010]).unwrap(), 0b01);
}

#[test]
fn force_m_reg_and_set_reg() {
    let mut r = reg(4, 0, 11);
    r.set_reg(1, 3, 0b101).unwrap();
    assert_eq!(r.force_m_reg(0, 4, 0, false).unwrap(), 0b1010);
}

// ---------------------------------------------------------------------------
// Parity
// ---------------------------------------------------------------------------

#[test]
fn parity_of_bell_pair() {
    let mut r = reg(2, 0, 12);
    r.h(0).unwrap();
    r.cnot(0, 1).unwrap();
    assert!(r.prob_parity(0b11).unwrap().abs() < TOL);
    r.x(0).unwrap();
    assert!((r.prob_parity(0b11).unwrap() - 1.0).abs() < TOL);
}

#[test]
fn forced_parity_measurement() {
    let mut r = reg(2, 0, 13);
    r.h(0).unwrap();
    r.h(1).unwrap();
    assert!(r.force_m_parity(0b11, true, true).unwrap());
    assert!((r.prob_parity(0b11).unwrap() - 1.0).abs() < TOL);
    assert!((r.prob_all(0b01).unwrap() - 0.5).abs() < TOL);
    assert!((r.prob_all(0b10).unwrap() - 0.5).abs() < TOL);
}

//! Parity operators for [`StateVectorEngine`].

use num_complex::Complex64;
use rand::Rng;
use tracing::debug;

use crate::engine::DenseParity;
use crate::error::{DenseError, DenseResult};
use crate::statevector::StateVectorEngine;

fn is_odd(perm: usize, mask: usize) -> bool {
    (perm & mask).count_ones() & 1 == 1
}

impl DenseParity for StateVectorEngine {
    fn prob_parity(&self, mask: usize) -> f64 {
        if mask == 0 {
            return 0.0;
        }
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| is_odd(*i, mask))
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    fn force_m_parity(&mut self, mask: usize, result: bool, do_force: bool) -> DenseResult<bool> {
        if mask == 0 {
            return Ok(false);
        }
        let p_odd = self.prob_parity(mask);
        let outcome = if do_force {
            result
        } else {
            self.rng.r#gen::<f64>() < p_odd
        };
        let kept = if outcome { p_odd } else { 1.0 - p_odd };
        if kept <= f64::EPSILON {
            return Err(DenseError::InvalidArgument(format!(
                "parity outcome {outcome} has zero probability"
            )));
        }
        let scale = 1.0 / kept.sqrt();
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if is_odd(i, mask) == outcome {
                *amp *= scale;
            } else {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
        debug!(mask, outcome, "parity measured");
        Ok(outcome)
    }

    fn uniform_parity_rz(&mut self, mask: usize, angle: f64) {
        self.c_uniform_parity_rz(&[], mask, angle);
    }

    fn c_uniform_parity_rz(&mut self, controls: &[usize], mask: usize, angle: f64) {
        let ctrl_mask = controls
            .iter()
            .filter(|&&c| c < self.num_qubits)
            .fold(0usize, |m, &c| m | (1 << c));
        let odd = Complex64::from_polar(1.0, angle);
        let even = odd.conj();
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & ctrl_mask != ctrl_mask {
                continue;
            }
            *amp *= if is_odd(i, mask) { odd } else { even };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plus_plus() -> StateVectorEngine {
        let mut sv = StateVectorEngine::with_seed(2, 28, 3).unwrap();
        let s = Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
        let h = [s, s, s, -s];
        sv.apply_mtrx(&h, 0).unwrap();
        sv.apply_mtrx(&h, 1).unwrap();
        sv
    }

    #[test]
    fn test_prob_parity_uniform() {
        let sv = plus_plus();
        assert!((sv.prob_parity(0b11) - 0.5).abs() < 1e-12);
        assert_eq!(sv.prob_parity(0), 0.0);
    }

    #[test]
    fn test_forced_parity_collapses() {
        let mut sv = plus_plus();
        assert!(sv.force_m_parity(0b11, true, true).unwrap());
        assert!(sv.amplitudes()[0].norm() < 1e-12);
        assert!(sv.amplitudes()[3].norm() < 1e-12);
        assert!((sv.amplitudes()[1].norm_sqr() - 0.5).abs() < 1e-12);
        assert!((sv.norm_sqr() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_forced_impossible_parity() {
        let mut sv = StateVectorEngine::with_seed(2, 28, 0).unwrap();
        assert!(sv.force_m_parity(0b11, true, true).is_err());
    }

    #[test]
    fn test_uniform_parity_rz_phases() {
        let mut sv = plus_plus();
        sv.uniform_parity_rz(0b01, 0.3);
        let a = sv.amplitudes();
        let even = Complex64::from_polar(0.5, -0.3);
        let odd = Complex64::from_polar(0.5, 0.3);
        assert!((a[0] - even).norm() < 1e-12);
        assert!((a[1] - odd).norm() < 1e-12);
        assert!((a[2] - even).norm() < 1e-12);
        assert!((a[3] - odd).norm() < 1e-12);
    }

    #[test]
    fn test_controlled_parity_rz_skips_unset_control() {
        let mut sv = plus_plus();
        sv.c_uniform_parity_rz(&[1], 0b01, 0.3);
        let a = sv.amplitudes();
        assert!((a[0] - Complex64::new(0.5, 0.0)).norm() < 1e-12);
        assert!((a[3] - Complex64::from_polar(0.5, 0.3)).norm() < 1e-12);
    }
}

//! Reference dense state-vector engine.

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::{Capabilities, DenseAlu, DenseEngine, DenseParity};
use crate::error::{DenseError, DenseResult};

/// Default width limit for engines built without a factory.
const DEFAULT_MAX_QUBITS: usize = 28;

/// A statevector holding all `2^n` amplitudes.
pub struct StateVectorEngine {
    /// The state amplitudes (2^n complex numbers).
    pub(crate) amplitudes: Vec<Complex64>,
    /// Number of qubits.
    pub(crate) num_qubits: usize,
    /// Measurement randomness.
    pub(crate) rng: StdRng,
    capabilities: Capabilities,
}

impl StateVectorEngine {
    /// Create a statevector initialized to |0...0⟩ with an entropy-seeded RNG.
    pub fn new(num_qubits: usize) -> DenseResult<Self> {
        let seed = rand::thread_rng().r#gen();
        Self::with_seed(num_qubits, DEFAULT_MAX_QUBITS, seed)
    }

    /// Create a statevector initialized to |0...0⟩, refusing widths above `max_qubits`.
    pub fn with_seed(num_qubits: usize, max_qubits: usize, seed: u64) -> DenseResult<Self> {
        if num_qubits > max_qubits || num_qubits >= usize::BITS as usize {
            return Err(DenseError::TooManyQubits {
                requested: num_qubits,
                max: max_qubits,
            });
        }
        let size = 1usize << num_qubits;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Ok(Self {
            amplitudes,
            num_qubits,
            rng: StdRng::seed_from_u64(seed),
            capabilities: Capabilities::all(),
        })
    }

    /// Restrict which capability handles this engine hands out.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Borrow the amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Total probability.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    /// Probability that `qubit` reads 1.
    pub fn prob(&self, qubit: usize) -> DenseResult<f64> {
        self.check_qubit(qubit)?;
        let mask = 1 << qubit;
        Ok(self
            .amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum())
    }

    // =========================================================================
    // Gate kernels
    // =========================================================================

    /// Apply a row-major 2x2 matrix to `target`.
    pub fn apply_mtrx(&mut self, mtrx: &[Complex64; 4], target: usize) -> DenseResult<()> {
        self.apply_controlled_mtrx(mtrx, &[], false, target)
    }

    /// Apply a row-major 2x2 matrix to `target` on the subspace where every
    /// control reads 1 (or 0 when `anti`).
    pub fn apply_controlled_mtrx(
        &mut self,
        mtrx: &[Complex64; 4],
        controls: &[usize],
        anti: bool,
        target: usize,
    ) -> DenseResult<()> {
        self.check_qubit(target)?;
        let ctrl_mask = self.control_mask(controls)?;
        let ctrl_val = if anti { 0 } else { ctrl_mask };
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if i & tgt_mask == 0 && i & ctrl_mask == ctrl_val {
                let j = i | tgt_mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = mtrx[0] * a + mtrx[1] * b;
                self.amplitudes[j] = mtrx[2] * a + mtrx[3] * b;
            }
        }
        Ok(())
    }

    /// Exchange two qubits.
    pub fn apply_swap(&mut self, q1: usize, q2: usize) -> DenseResult<()> {
        self.check_qubit(q1)?;
        self.check_qubit(q2)?;
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..self.amplitudes.len() {
            let b1 = (i & mask1) != 0;
            let b2 = (i & mask2) != 0;
            if b1 && !b2 {
                let j = (i & !mask1) | mask2;
                self.amplitudes.swap(i, j);
            }
        }
        Ok(())
    }

    /// Sample a measurement outcome without collapsing.
    pub fn sample(&mut self) -> usize {
        let r: f64 = self.rng.r#gen();

        let mut cumulative = 0.0;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            cumulative += amp.norm_sqr();
            if r < cumulative {
                return i;
            }
        }

        // Rounding can leave the cumulative sum just below 1.
        self.amplitudes.len() - 1
    }

    // =========================================================================
    // Shared helpers for the operator sets
    // =========================================================================

    pub(crate) fn check_qubit(&self, qubit: usize) -> DenseResult<()> {
        if qubit >= self.num_qubits {
            return Err(DenseError::QubitOutOfRange {
                qubit,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    pub(crate) fn check_range(&self, start: usize, length: usize) -> DenseResult<()> {
        if length == 0 || start + length > self.num_qubits {
            return Err(DenseError::QubitOutOfRange {
                qubit: start + length,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    pub(crate) fn control_mask(&self, controls: &[usize]) -> DenseResult<usize> {
        let mut mask = 0;
        for &c in controls {
            self.check_qubit(c)?;
            mask |= 1 << c;
        }
        Ok(mask)
    }

    /// Move every amplitude `i` to `f(i)`; states mapped to `None` are
    /// dropped. `f` must be injective on the states it keeps.
    pub(crate) fn permute<F>(&mut self, f: F)
    where
        F: Fn(usize) -> Option<usize>,
    {
        let mut out = vec![Complex64::new(0.0, 0.0); self.amplitudes.len()];
        for (i, amp) in self.amplitudes.iter().enumerate() {
            if let Some(j) = f(i) {
                out[j] += *amp;
            }
        }
        self.amplitudes = out;
    }

    /// Pull every amplitude `i` from `f(i)`; states mapped to `None` become zero.
    pub(crate) fn gather<F>(&mut self, f: F)
    where
        F: Fn(usize) -> Option<usize>,
    {
        let out = (0..self.amplitudes.len())
            .map(|i| f(i).map_or(Complex64::new(0.0, 0.0), |j| self.amplitudes[j]))
            .collect();
        self.amplitudes = out;
    }
}

/// Mask covering `length` bits starting at `start`.
pub(crate) fn reg_mask(start: usize, length: usize) -> usize {
    ((1usize << length) - 1) << start
}

/// Integer held by the register `(start, length)` of basis state `perm`.
pub(crate) fn get_reg(perm: usize, start: usize, length: usize) -> usize {
    (perm >> start) & ((1usize << length) - 1)
}

impl DenseEngine for StateVectorEngine {
    fn qubit_count(&self) -> usize {
        self.num_qubits
    }

    fn get_amplitude(&self, perm: usize) -> DenseResult<Complex64> {
        self.amplitudes
            .get(perm)
            .copied()
            .ok_or_else(|| DenseError::InvalidArgument(format!("permutation {perm} out of range")))
    }

    fn set_amplitude(&mut self, perm: usize, amp: Complex64) -> DenseResult<()> {
        let slot = self
            .amplitudes
            .get_mut(perm)
            .ok_or_else(|| DenseError::InvalidArgument(format!("permutation {perm} out of range")))?;
        *slot = amp;
        Ok(())
    }

    fn get_quantum_state(&self) -> Vec<Complex64> {
        self.amplitudes.clone()
    }

    fn set_quantum_state(&mut self, state: &[Complex64]) -> DenseResult<()> {
        if state.len() != self.amplitudes.len() {
            return Err(DenseError::LengthMismatch {
                expected: self.amplitudes.len(),
                got: state.len(),
            });
        }
        self.amplitudes.copy_from_slice(state);
        Ok(())
    }

    fn as_alu(&mut self) -> Option<&mut dyn DenseAlu> {
        if self.capabilities.alu {
            Some(self)
        } else {
            None
        }
    }

    fn as_parity(&mut self) -> Option<&mut dyn DenseParity> {
        if self.capabilities.parity {
            Some(self)
        } else {
            None
        }
    }
}

//! Dense engine traits and capability discovery.
//!
//! A dense engine stores all `2^n` amplitudes explicitly. The tree
//! simulator hands work to one whenever an operation has no native tree
//! algorithm. Optional operator sets (arithmetic, parity) are exposed as
//! capability handles rather than discovered by downcasting: a factory
//! reports its [`Capabilities`] up front and every engine it builds hands
//! out `Some(..)` from [`DenseEngine::as_alu`] / [`DenseEngine::as_parity`]
//! exactly when the matching flag is set.

use std::fmt;

use num_complex::Complex64;

use crate::error::DenseResult;
use crate::statevector::StateVectorEngine;

/// An optional operator set a dense engine may provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Arithmetic/logic operators on qubit ranges.
    Alu,
    /// Multi-qubit parity operators.
    Parity,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alu => write!(f, "ALU"),
            Self::Parity => write!(f, "parity"),
        }
    }
}

/// The capability set of the engines a factory builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Engines implement [`DenseAlu`].
    pub alu: bool,
    /// Engines implement [`DenseParity`].
    pub parity: bool,
}

impl Capabilities {
    /// Every optional operator set.
    pub const fn all() -> Self {
        Self {
            alu: true,
            parity: true,
        }
    }

    /// Amplitude access only.
    pub const fn basic() -> Self {
        Self {
            alu: false,
            parity: false,
        }
    }

    /// Whether `capability` is present.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Alu => self.alu,
            Capability::Parity => self.parity,
        }
    }
}

/// Amplitude-level access to a dense quantum register.
///
/// Qubit `q` is bit `q` of a basis-state index.
pub trait DenseEngine: Send {
    /// Number of qubits.
    fn qubit_count(&self) -> usize;

    /// Read one amplitude.
    fn get_amplitude(&self, perm: usize) -> DenseResult<Complex64>;

    /// Overwrite one amplitude. The caller is responsible for norm.
    fn set_amplitude(&mut self, perm: usize, amp: Complex64) -> DenseResult<()>;

    /// Copy out every amplitude, indexed by basis state.
    fn get_quantum_state(&self) -> Vec<Complex64>;

    /// Overwrite every amplitude.
    fn set_quantum_state(&mut self, state: &[Complex64]) -> DenseResult<()>;

    /// Arithmetic operators, when supported.
    fn as_alu(&mut self) -> Option<&mut dyn DenseAlu> {
        None
    }

    /// Parity operators, when supported.
    fn as_parity(&mut self) -> Option<&mut dyn DenseParity> {
        None
    }
}

/// Arithmetic operators over contiguous qubit ranges.
///
/// A "register" `(start, length)` holds an unsigned integer with bit `k`
/// on qubit `start + k`. Operators that write an output register assume
/// that register starts at zero; basis states violating that
/// precondition are dropped, as with any out-of-place arithmetic.
pub trait DenseAlu {
    /// Add `to_add` modulo `2^length`.
    fn inc(&mut self, to_add: usize, start: usize, length: usize) -> DenseResult<()>;

    /// Add `to_add` modulo `2^length` where every control qubit is set.
    fn cinc(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        controls: &[usize],
    ) -> DenseResult<()>;

    /// Add `to_add` to the register extended by `carry_index` as its top bit.
    fn incdecc(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> DenseResult<()>;

    /// Two's-complement add; flips phase on states that overflow while
    /// the `overflow_index` qubit is set.
    fn incs(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        overflow_index: usize,
    ) -> DenseResult<()>;

    /// Two's-complement add on the carry-extended register. Phase flips on
    /// signed overflow, restricted to states with `overflow_index` set
    /// when one is given.
    fn incdecsc(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        overflow_index: Option<usize>,
        carry_index: usize,
    ) -> DenseResult<()>;

    /// Add a decimal integer to a binary-coded-decimal register, modulo
    /// `10^(length / 4)`. States holding a nibble above 9 are left alone.
    fn incbcd(&mut self, to_add: usize, start: usize, length: usize) -> DenseResult<()>;

    /// [`DenseAlu::incbcd`] with `carry_index` as a decimal carry digit.
    fn incdecbcdc(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> DenseResult<()>;

    /// Multiply in place, spilling the high half into the carry register.
    fn mul(
        &mut self,
        to_mul: usize,
        in_out_start: usize,
        carry_start: usize,
        length: usize,
    ) -> DenseResult<()>;

    /// Inverse of [`DenseAlu::mul`].
    fn div(
        &mut self,
        to_div: usize,
        in_out_start: usize,
        carry_start: usize,
        length: usize,
    ) -> DenseResult<()>;

    /// [`DenseAlu::mul`] where every control qubit is set.
    fn cmul(
        &mut self,
        to_mul: usize,
        in_out_start: usize,
        carry_start: usize,
        length: usize,
        controls: &[usize],
    ) -> DenseResult<()>;

    /// [`DenseAlu::div`] where every control qubit is set.
    fn cdiv(
        &mut self,
        to_div: usize,
        in_out_start: usize,
        carry_start: usize,
        length: usize,
        controls: &[usize],
    ) -> DenseResult<()>;

    /// `out ^= (in * to_mul) mod mod_n` for a zeroed output register.
    fn mul_mod_n_out(
        &mut self,
        to_mul: usize,
        mod_n: usize,
        in_start: usize,
        out_start: usize,
        length: usize,
    ) -> DenseResult<()>;

    /// Inverse of [`DenseAlu::mul_mod_n_out`].
    fn imul_mod_n_out(
        &mut self,
        to_mul: usize,
        mod_n: usize,
        in_start: usize,
        out_start: usize,
        length: usize,
    ) -> DenseResult<()>;

    /// `out ^= base^in mod mod_n` for a zeroed output register.
    fn pow_mod_n_out(
        &mut self,
        base: usize,
        mod_n: usize,
        in_start: usize,
        out_start: usize,
        length: usize,
    ) -> DenseResult<()>;

    /// Controlled [`DenseAlu::mul_mod_n_out`].
    fn cmul_mod_n_out(
        &mut self,
        to_mul: usize,
        mod_n: usize,
        in_start: usize,
        out_start: usize,
        length: usize,
        controls: &[usize],
    ) -> DenseResult<()>;

    /// Controlled [`DenseAlu::imul_mod_n_out`].
    fn cimul_mod_n_out(
        &mut self,
        to_mul: usize,
        mod_n: usize,
        in_start: usize,
        out_start: usize,
        length: usize,
        controls: &[usize],
    ) -> DenseResult<()>;

    /// Controlled [`DenseAlu::pow_mod_n_out`].
    fn cpow_mod_n_out(
        &mut self,
        base: usize,
        mod_n: usize,
        in_start: usize,
        out_start: usize,
        length: usize,
        controls: &[usize],
    ) -> DenseResult<()>;

    /// Negate states whose register value is below `greater_perm`.
    fn phase_flip_if_less(
        &mut self,
        greater_perm: usize,
        start: usize,
        length: usize,
    ) -> DenseResult<()>;

    /// [`DenseAlu::phase_flip_if_less`] restricted to states with `flag_index` set.
    fn cphase_flip_if_less(
        &mut self,
        greater_perm: usize,
        start: usize,
        length: usize,
        flag_index: usize,
    ) -> DenseResult<()>;

    /// XOR a classical table entry, selected by the index register, into
    /// the value register. Returns the expectation value of the value
    /// register afterwards.
    fn indexed_lda(
        &mut self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        values: &[u8],
    ) -> DenseResult<f64>;

    /// Add the table entry selected by the index register, plus carry,
    /// to the value register. The carry qubit is measured first and holds
    /// the carry out afterwards. Returns the value register's expectation.
    fn indexed_adc(
        &mut self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        carry_index: usize,
        values: &[u8],
    ) -> DenseResult<f64>;

    /// Subtract the selected table entry with borrow. A set carry qubit
    /// means "no borrow", on entry and on exit.
    fn indexed_sbc(
        &mut self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        carry_index: usize,
        values: &[u8],
    ) -> DenseResult<f64>;

    /// Replace the register value `v` by `values[v]`; `values` must be a
    /// permutation of `0..2^length`.
    fn hash(&mut self, start: usize, length: usize, values: &[u8]) -> DenseResult<()>;
}

/// Operators on the parity of a masked set of qubits.
pub trait DenseParity {
    /// Probability that the masked qubits have odd parity.
    fn prob_parity(&self, mask: usize) -> f64;

    /// Measure (or, with `do_force`, impose) the parity of the masked
    /// qubits. Returns the outcome.
    fn force_m_parity(&mut self, mask: usize, result: bool, do_force: bool) -> DenseResult<bool>;

    /// Phase `e^{+i angle}` on odd-parity states and `e^{-i angle}` on even ones.
    fn uniform_parity_rz(&mut self, mask: usize, angle: f64);

    /// [`DenseParity::uniform_parity_rz`] where every control qubit is set.
    fn c_uniform_parity_rz(&mut self, controls: &[usize], mask: usize, angle: f64);
}

/// Builds dense engines for the tree's fallback path.
pub trait DenseEngineFactory: Send + Sync + fmt::Debug {
    /// Capabilities of every engine this factory creates.
    fn capabilities(&self) -> Capabilities;

    /// Largest register this factory can build.
    fn max_qubits(&self) -> usize;

    /// Build an engine of `qubit_count` qubits in `|0…0⟩`, with its RNG
    /// seeded from `seed`.
    fn create(&self, qubit_count: usize, seed: u64) -> DenseResult<Box<dyn DenseEngine>>;
}

/// Factory for [`StateVectorEngine`].
#[derive(Debug, Clone)]
pub struct StateVectorFactory {
    max_qubits: usize,
    capabilities: Capabilities,
}

impl StateVectorFactory {
    /// Create a factory with the default width limit and every capability.
    pub fn new() -> Self {
        Self {
            max_qubits: 28,
            capabilities: Capabilities::all(),
        }
    }

    /// Create a factory with a custom width limit.
    pub fn with_max_qubits(max_qubits: usize) -> Self {
        Self {
            max_qubits,
            ..Self::new()
        }
    }

    /// Advertise a reduced capability set (engines still implement
    /// everything, but hide what is not advertised).
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl Default for StateVectorFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DenseEngineFactory for StateVectorFactory {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn max_qubits(&self) -> usize {
        self.max_qubits
    }

    fn create(&self, qubit_count: usize, seed: u64) -> DenseResult<Box<dyn DenseEngine>> {
        let engine = StateVectorEngine::with_seed(qubit_count, self.max_qubits, seed)?
            .with_capabilities(self.capabilities);
        Ok(Box::new(engine))
    }
}

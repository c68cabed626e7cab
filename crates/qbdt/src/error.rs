//! Error types for the QBDT crate.

use qbdt_dense::{Capability, DenseError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur in register operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QbdtError {
    /// A qubit index lies outside the register.
    #[error("Qubit {qubit} out of range for a {qubit_count}-qubit register")]
    QubitOutOfRange {
        /// The offending index.
        qubit: usize,
        /// Register width.
        qubit_count: usize,
    },

    /// A qubit range `[start, start + length)` does not fit the register.
    #[error("Qubit range {start}+{length} out of bounds for a {qubit_count}-qubit register")]
    RangeOutOfBounds {
        /// First qubit of the range.
        start: usize,
        /// Range length.
        length: usize,
        /// Register width.
        qubit_count: usize,
    },

    /// The same qubit appears twice in one gate's controls and target.
    #[error("Qubit {0} used more than once in a single gate")]
    DuplicateQubit(usize),

    /// A basis-state index lies outside `[0, 2^n)`.
    #[error("Permutation {perm} out of range for a {qubit_count}-qubit register")]
    PermutationOutOfRange {
        /// The offending index.
        perm: u128,
        /// Register width.
        qubit_count: usize,
    },

    /// A bulk state write had the wrong length.
    #[error("Expected {expected} amplitudes, got {got}")]
    StateLengthMismatch {
        /// `2^n`.
        expected: usize,
        /// Supplied length.
        got: usize,
    },

    /// The supplied or resulting state has zero norm.
    #[error("State has zero norm")]
    ZeroNorm,

    /// A forced measurement outcome has zero probability.
    #[error("Forced outcome on qubit {qubit} has zero probability")]
    ImpossibleOutcome {
        /// The measured qubit (lowest qubit of a register measurement).
        qubit: usize,
    },

    /// The requested qubits are entangled with the rest of the register.
    #[error("Qubit range {start}+{length} is not separable from the register")]
    NotSeparable {
        /// First removed qubit.
        start: usize,
        /// Number of removed qubits.
        length: usize,
    },

    /// The dense fallback engine lacks an operator set.
    #[error("Dense engine does not provide the {0} capability")]
    MissingCapability(Capability),

    /// The register is too wide to materialize densely.
    #[error("{requested} qubits exceed the dense limit of {max}")]
    TooManyQubits {
        /// Register width.
        requested: usize,
        /// Configured limit.
        max: usize,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Dense engine error.
    #[error("Dense engine error: {0}")]
    Dense(#[from] DenseError),

    /// Worker pool construction failed.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for register operations.
pub type QbdtResult<T> = Result<T, QbdtError>;

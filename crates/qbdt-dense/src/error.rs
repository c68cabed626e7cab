//! Error types for the dense engine crate.

use thiserror::Error;

/// Errors produced by dense state-vector engines.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DenseError {
    /// The requested register does not fit a dense amplitude array.
    #[error("Dense engine supports at most {max} qubits, {requested} requested")]
    TooManyQubits {
        /// Qubits requested.
        requested: usize,
        /// Largest supported width.
        max: usize,
    },

    /// A bulk state write had the wrong number of amplitudes.
    #[error("Expected {expected} amplitudes, got {got}")]
    LengthMismatch {
        /// Expected length (2^n).
        expected: usize,
        /// Supplied length.
        got: usize,
    },

    /// A qubit or qubit range falls outside the register.
    #[error("Qubit {qubit} is out of range for a {num_qubits}-qubit engine")]
    QubitOutOfRange {
        /// The offending qubit index (or range end).
        qubit: usize,
        /// Engine width.
        num_qubits: usize,
    },

    /// An argument is outside the operation's domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested operation is not a bijection on basis states.
    #[error("Operation is not invertible: {0}")]
    NonInvertible(String),
}

/// Result type for dense engine operations.
pub type DenseResult<T> = Result<T, DenseError>;

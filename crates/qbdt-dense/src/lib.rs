//! `qbdt-dense` — dense state-vector engines for the QBDT simulator.
//!
//! The tree simulator keeps states compressed, but some operators
//! (integer arithmetic, multi-qubit parity) have no efficient tree
//! algorithm. For those it materializes the state into a dense engine,
//! runs the operator there and reads the result back.
//!
//! This crate defines the engine contract and a reference implementation:
//!
//! - [`DenseEngine`]: amplitude access, plus optional capability handles
//! - [`DenseAlu`] / [`DenseParity`]: the optional operator sets
//! - [`DenseEngineFactory`]: builds engines and reports [`Capabilities`]
//! - [`StateVectorEngine`] / [`StateVectorFactory`]: the in-memory reference
//!
//! # Example
//!
//! ```rust
//! use qbdt_dense::{DenseEngineFactory, StateVectorFactory};
//!
//! let factory = StateVectorFactory::new();
//! let mut engine = factory.create(3, 42).unwrap();
//! engine.as_alu().unwrap().inc(5, 0, 3).unwrap();
//! assert!((engine.get_amplitude(5).unwrap().re - 1.0).abs() < 1e-12);
//! ```

mod alu;
pub mod engine;
pub mod error;
mod parity;
pub mod statevector;

pub use engine::{
    Capabilities, Capability, DenseAlu, DenseEngine, DenseEngineFactory, DenseParity,
    StateVectorFactory,
};
pub use error::{DenseError, DenseResult};
pub use statevector::StateVectorEngine;

//! `qbdt` — quantum register simulation on a compressed binary decision tree.
//!
//! The register state is a tree whose level `q` decides qubit `q`. Each node
//! carries a complex scale, and the amplitude of a basis state is the
//! product of the scales along its path. Identical subtrees are shared, so
//! states with structure (product states, GHZ-like states, sparse
//! superpositions) stay far smaller than their `2^n` dense form.
//!
//! - [`Qbdt`]: the register: gates, measurement, compose/decompose
//! - [`BdtTree`] / [`NodeArena`]: the tree itself and its node storage
//! - [`ShardBuffer`]: deferred single-qubit gates
//! - [`QbdtConfig`]: thresholds, worker pool, seeding
//!
//! Operators with no tree algorithm (integer arithmetic, multi-qubit
//! parity) run on a dense engine from [`qbdt_dense`] and are read back.
//!
//! # Quick start
//!
//! ```rust
//! use qbdt::{Qbdt, QbdtConfig};
//!
//! let config = QbdtConfig::default().with_seed(7);
//! let mut reg = Qbdt::with_config(3, 0, config).unwrap();
//! reg.h(0).unwrap();
//! reg.cnot(0, 1).unwrap();
//! reg.cnot(1, 2).unwrap();
//!
//! assert!((reg.prob(2).unwrap() - 0.5).abs() < 1e-12);
//! let outcome = reg.m_all().unwrap();
//! assert!(outcome == 0b000 || outcome == 0b111);
//! ```

mod bridge;
pub mod config;
pub mod error;
pub mod gate;
mod gates;
mod lifecycle;
mod measure;
pub mod node;
pub mod perm;
pub mod register;
pub mod shard;
mod traversal;
pub mod tree;

pub use config::{ConfigError, QbdtConfig};
pub use error::{QbdtError, QbdtResult};
pub use gate::Mtrx2;
pub use node::{Node, NodeArena, NodeId};
pub use perm::{BitCapInt, MAX_QUBITS};
pub use register::Qbdt;
pub use shard::{GateShard, ShardBuffer, flush};
pub use tree::{BdtTree, Control, DEFAULT_SEPARABILITY_THRESHOLD};

pub use qbdt_dense::{Capabilities, Capability, DenseEngine, DenseEngineFactory, StateVectorFactory};

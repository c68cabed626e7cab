//! Deferred single-qubit gates.
//!
//! Each qubit holds at most one pending [`GateShard`]. Consecutive
//! single-qubit gates on a qubit are multiplied into its shard; the shard
//! reaches the tree only when [`flush`] is called for it.

use num_complex::Complex64;

use crate::gate::Mtrx2;
use crate::tree::BdtTree;

/// A buffered single-qubit gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateShard {
    /// The accumulated matrix.
    pub gate: Mtrx2,
}

impl GateShard {
    /// Wrap a matrix.
    pub fn new(gate: Mtrx2) -> Self {
        Self { gate }
    }

    /// Left-multiply `next` onto the pending gate (`next` acts after it).
    ///
    /// Results that are diagonal or anti-diagonal within `eps` are snapped
    /// to exact form, with the surviving entries rescaled to unit modulus.
    pub fn compose(&mut self, next: &Mtrx2, eps: f64) {
        let mut gate = next.mul(&self.gate);
        if gate.is_phase(eps) {
            gate = Mtrx2::phase(unit(gate.data[0]), unit(gate.data[3]));
        } else if gate.is_invert(eps) {
            gate = Mtrx2::invert(unit(gate.data[1]), unit(gate.data[2]));
        }
        self.gate = gate;
    }

    /// Diagonal (commutes with control use of its qubit).
    pub fn is_phase(&self, eps: f64) -> bool {
        self.gate.is_phase(eps)
    }

    /// Anti-diagonal.
    pub fn is_invert(&self, eps: f64) -> bool {
        self.gate.is_invert(eps)
    }

    /// Identity up to global phase.
    pub fn is_identity(&self, eps: f64) -> bool {
        self.gate.is_identity(eps)
    }

    /// Exactly the identity, global phase included.
    fn is_noop(&self, eps: f64) -> bool {
        self.is_identity(eps) && (self.gate.data[0] - Complex64::new(1.0, 0.0)).norm_sqr() <= eps
    }
}

fn unit(z: Complex64) -> Complex64 {
    let n = z.norm();
    if n > 0.0 { z / n } else { z }
}

/// One optional pending gate per qubit.
#[derive(Debug, Clone, Default)]
pub struct ShardBuffer {
    slots: Vec<Option<GateShard>>,
}

impl ShardBuffer {
    /// Empty buffer for `qubit_count` qubits.
    pub fn new(qubit_count: usize) -> Self {
        Self {
            slots: vec![None; qubit_count],
        }
    }

    /// Number of qubit slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the buffer has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Pending shard on `qubit`.
    pub fn get(&self, qubit: usize) -> Option<&GateShard> {
        self.slots[qubit].as_ref()
    }

    /// Whether any qubit has a pending shard.
    pub fn any_pending(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    /// Buffer `gate` on `qubit`, composing with a pending shard. A result
    /// that reduces to the identity clears the slot.
    pub fn buffer(&mut self, qubit: usize, gate: &Mtrx2, eps: f64) {
        let slot = &mut self.slots[qubit];
        match slot {
            Some(shard) => shard.compose(gate, eps),
            None => *slot = Some(GateShard::new(*gate)),
        }
        if slot.as_ref().is_some_and(|s| s.is_noop(eps)) {
            *slot = None;
        }
    }

    /// Remove and return the shard on `qubit`.
    pub fn take(&mut self, qubit: usize) -> Option<GateShard> {
        self.slots[qubit].take()
    }

    /// Discard every pending shard.
    pub fn dump(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }

    /// Insert the slots of `other` at `start`.
    pub fn insert(&mut self, start: usize, other: ShardBuffer) {
        self.slots.splice(start..start, other.slots);
    }

    /// Remove the slots `[start, start + length)` and return them.
    pub fn split_out(&mut self, start: usize, length: usize) -> ShardBuffer {
        ShardBuffer {
            slots: self.slots.drain(start..start + length).collect(),
        }
    }
}

/// Apply `shard` to `target` of `tree`, returning the updated tree.
pub fn flush(mut tree: BdtTree, target: usize, shard: &GateShard) -> BdtTree {
    tree.apply(&shard.gate, &[], target);
    tree.prune_if_bloated();
    tree
}

//! Parallel whole-register traversals.
//!
//! Both directions iterate the dense index space `[0, 2^n)` on the
//! current rayon pool, so callers run them inside `ThreadPool::install`
//! to pick the register's worker count.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use num_complex::Complex64;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::node::{Node, NodeArena, NodeId, ONE};
use crate::tree::BdtTree;

/// A node of the fully branched scratch tree built by [`BdtTree::set_traversal`].
#[derive(Default)]
struct StagedNode {
    /// Index of the first of this node's two children.
    children: OnceLock<usize>,
    /// Leaf amplitude.
    amp: OnceLock<Complex64>,
}

/// Scratch tree with lock-free branch creation.
struct Staging {
    slots: Vec<StagedNode>,
    next: AtomicUsize,
}

impl Staging {
    fn new(qubit_count: usize) -> Self {
        let capacity = (1usize << (qubit_count + 1)) - 1;
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, StagedNode::default);
        Self {
            slots,
            next: AtomicUsize::new(1),
        }
    }

    /// Child pair of `slot`, created on first use. Exactly one racing
    /// worker allocates; the rest wait and see its result.
    fn branch(&self, slot: usize) -> usize {
        *self.slots[slot]
            .children
            .get_or_init(|| self.next.fetch_add(2, Ordering::Relaxed))
    }

    fn store(&self, perm: usize, qubit_count: usize, amp: Complex64) {
        let mut slot = 0;
        for q in 0..qubit_count {
            slot = self.branch(slot) + ((perm >> q) & 1);
        }
        // Each index owns its leaf, so the cell is always empty here.
        let _ = self.slots[slot].amp.set(amp);
    }

    fn build(&self, arena: &mut NodeArena, slot: usize, depth: usize, qubit_count: usize) -> NodeId {
        if depth == qubit_count {
            return match self.slots[slot].amp.get() {
                Some(&amp) => arena.alloc(Node::leaf(amp)),
                None => NodeId::ZERO,
            };
        }
        let Some(&base) = self.slots[slot].children.get() else {
            return NodeId::ZERO;
        };
        let c0 = self.build(arena, base, depth + 1, qubit_count);
        let c1 = self.build(arena, base + 1, depth + 1, qubit_count);
        if c0 == NodeId::ZERO && c1 == NodeId::ZERO {
            return NodeId::ZERO;
        }
        arena.alloc(Node {
            scale: ONE,
            branches: Some([c0, c1]),
        })
    }
}

/// Gather a parallel `(index, value)` traversal over `[0, size)` into a
/// vector; indices never delivered read as the default value.
pub(crate) fn collect_traversal<T, W>(size: usize, walk: W) -> Vec<T>
where
    T: Default + Send + Sync,
    W: FnOnce(&(dyn Fn(usize, T) + Sync + Send)),
{
    let slots: Vec<OnceLock<T>> = (0..size).map(|_| OnceLock::new()).collect();
    walk(&|i, value| {
        let _ = slots[i].set(value);
    });
    slots
        .into_iter()
        .map(|slot| slot.into_inner().unwrap_or_default())
        .collect()
}

impl BdtTree {
    /// Visit every basis-state amplitude in parallel.
    ///
    /// Each index in `[0, 2^n)` is delivered to `sink` exactly once, in no
    /// particular order. Paths that reach a zero node stop early.
    pub fn get_traversal<F>(&self, sink: F)
    where
        F: Fn(usize, Complex64) + Sync + Send,
    {
        let size = 1usize << self.qubit_count;
        (0..size)
            .into_par_iter()
            .for_each(|i| sink(i, self.amplitude(i as u128)));
    }

    /// Every amplitude, indexed by basis state.
    pub fn get_quantum_state(&self) -> Vec<Complex64> {
        collect_traversal(1usize << self.qubit_count, |sink| self.get_traversal(sink))
    }

    /// Build a tree from a dense amplitude source.
    ///
    /// Workers branch a scratch tree on demand and store each non-zero
    /// amplitude at its leaf; the scratch tree is then converted into arena
    /// nodes, popped into canonical form and pruned.
    #[instrument(skip(source))]
    pub fn set_traversal<F>(qubit_count: usize, eps: f64, source: F) -> Self
    where
        F: Fn(usize) -> Complex64 + Sync + Send,
    {
        let size = 1usize << qubit_count;
        let staging = Staging::new(qubit_count);
        (0..size).into_par_iter().for_each(|i| {
            let amp = source(i);
            if amp.norm_sqr() > 0.0 {
                staging.store(i, qubit_count, amp);
            }
        });

        let mut arena = NodeArena::new(eps);
        let root = staging.build(&mut arena, 0, 0, qubit_count);
        let mut tree = BdtTree::from_parts(arena, root, qubit_count);
        tree.pop_state_vector();
        tree.prune();
        debug!(nodes = tree.count_branches(), "tree rebuilt from state vector");
        tree
    }
}

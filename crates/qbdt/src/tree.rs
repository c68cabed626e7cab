//! The binary decision tree over qubit amplitudes.
//!
//! Qubit `q` is decided at depth `q`: the root's branches select the value
//! of qubit 0 and the leaves sit at depth `qubit_count`. The amplitude of a
//! basis state is the product of the scales met on its root-to-leaf path.
//!
//! Every mutation leaves each non-zero internal node in the canonical form
//! produced by [`NodeArena::pop_node`], so the register's norm and global
//! phase live entirely in the root scale.

use num_complex::Complex64;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::gate::Mtrx2;
use crate::node::{Node, NodeArena, NodeId, ONE, ZERO};
use crate::perm::{BitCapInt, select_bit};

/// Default separability threshold used by [`BdtTree::default`].
pub const DEFAULT_SEPARABILITY_THRESHOLD: f64 = 1e-12;

/// A control qubit and the bit value it requires.
pub type Control = (usize, bool);

/// An arena-backed decision tree of fixed depth.
#[derive(Debug, Clone)]
pub struct BdtTree {
    pub(crate) arena: NodeArena,
    pub(crate) root: NodeId,
    pub(crate) qubit_count: usize,
    /// Arena size right after the last compaction.
    live_after_compact: usize,
}

impl Default for BdtTree {
    fn default() -> Self {
        Self::basis(0, 0, ONE, DEFAULT_SEPARABILITY_THRESHOLD)
    }
}

impl BdtTree {
    /// Tree for the basis state `perm` with amplitude `phase`.
    pub fn basis(qubit_count: usize, perm: BitCapInt, phase: Complex64, eps: f64) -> Self {
        let mut arena = NodeArena::new(eps);
        let leaf_scale = if qubit_count == 0 { phase } else { ONE };
        let mut child = arena.alloc(Node::leaf(leaf_scale));
        for q in (0..qubit_count).rev() {
            let branches = if select_bit(perm, q) {
                [NodeId::ZERO, child]
            } else {
                [child, NodeId::ZERO]
            };
            let scale = if q == 0 { phase } else { ONE };
            child = arena.alloc(Node {
                scale,
                branches: Some(branches),
            });
        }
        let live_after_compact = arena.len();
        Self {
            arena,
            root: child,
            qubit_count,
            live_after_compact,
        }
    }

    pub(crate) fn from_parts(arena: NodeArena, root: NodeId, qubit_count: usize) -> Self {
        let live_after_compact = arena.len();
        Self {
            arena,
            root,
            qubit_count,
            live_after_compact,
        }
    }

    /// Tree depth.
    pub fn qubit_count(&self) -> usize {
        self.qubit_count
    }

    /// Separability threshold.
    pub fn eps(&self) -> f64 {
        self.arena.eps()
    }

    /// Root node id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow the node storage.
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// Amplitude of basis state `perm`, by walking its path.
    pub fn amplitude(&self, perm: BitCapInt) -> Complex64 {
        let mut id = self.root;
        if self.arena.is_zero(id) {
            return ZERO;
        }
        let mut amp = self.arena.get(id).scale;
        for q in 0..self.qubit_count {
            let Some(branches) = self.arena.get(id).branches else {
                return ZERO;
            };
            id = branches[usize::from(select_bit(perm, q))];
            if self.arena.is_zero(id) {
                return ZERO;
            }
            amp *= self.arena.get(id).scale;
        }
        amp
    }

    /// Distinct non-zero nodes reachable from the root.
    pub fn count_branches(&self) -> usize {
        self.arena.count_reachable(self.root)
    }

    /// Total probability, `sum |amp|^2`.
    pub fn norm_sqr(&self) -> f64 {
        let weights = self.subtree_weights();
        self.arena.scale(self.root).norm_sqr() * weight_of(&weights, self.root)
    }

    /// Squared norm of every reachable subtree, excluding each node's own
    /// scale. Leaves weigh 1, zero nodes 0.
    pub(crate) fn subtree_weights(&self) -> FxHashMap<NodeId, f64> {
        let mut weights = FxHashMap::default();
        self.weigh(self.root, &mut weights);
        weights
    }

    fn weigh(&self, id: NodeId, weights: &mut FxHashMap<NodeId, f64>) -> f64 {
        if self.arena.is_zero(id) {
            return 0.0;
        }
        if let Some(&w) = weights.get(&id) {
            return w;
        }
        let w = match self.arena.get(id).branches {
            None => 1.0,
            Some([b0, b1]) => {
                self.arena.scale(b0).norm_sqr() * self.weigh(b0, weights)
                    + self.arena.scale(b1).norm_sqr() * self.weigh(b1, weights)
            }
        };
        weights.insert(id, w);
        w
    }

    // =========================================================================
    // Structural maintenance
    // =========================================================================

    /// Merge equal subtrees and drop unreachable entries.
    ///
    /// Only the internal structure changes; every amplitude is preserved
    /// within the separability threshold.
    pub fn prune(&mut self) {
        let before = self.arena.len();
        let (arena, root) = self.arena.compact(self.root);
        self.arena = arena;
        self.root = root;
        self.live_after_compact = self.arena.len();
        trace!(before, after = self.live_after_compact, "tree pruned");
    }

    /// Compact only once dead entries clearly dominate the arena.
    pub fn prune_if_bloated(&mut self) {
        if self.arena.len() > 8 * self.live_after_compact.max(64) {
            self.prune();
        }
    }

    /// Re-derive every node scale bottom-up from the leaf values, turning a
    /// freshly built tree (internal scales 1, leaves holding raw amplitudes)
    /// into canonical form.
    pub fn pop_state_vector(&mut self) {
        let mut memo = FxHashMap::default();
        self.root = self.pop_rec(self.root, &mut memo);
    }

    fn pop_rec(&mut self, id: NodeId, memo: &mut FxHashMap<NodeId, NodeId>) -> NodeId {
        if self.arena.is_zero(id) {
            return NodeId::ZERO;
        }
        if let Some(&done) = memo.get(&id) {
            return done;
        }
        let node = *self.arena.get(id);
        let popped = match node.branches {
            None => id,
            Some([b0, b1]) => {
                let c0 = self.pop_rec(b0, memo);
                let c1 = self.pop_rec(b1, memo);
                self.arena.pop_node(node.scale, [c0, c1])
            }
        };
        memo.insert(id, popped);
        popped
    }

    /// Rescale so the total probability is 1.
    ///
    /// Nodes whose children already sum to 1 within `threshold` are left
    /// untouched; the remaining correction is applied at the root.
    pub fn normalize(&mut self, threshold: f64) {
        let mut memo = FxHashMap::default();
        self.root = self.normalize_rec(self.root, threshold, &mut memo);
        if self.arena.is_zero(self.root) {
            return;
        }
        let scale = self.arena.get(self.root).scale;
        self.root = self.arena.with_scale(self.root, scale / scale.norm());
    }

    fn normalize_rec(
        &mut self,
        id: NodeId,
        threshold: f64,
        memo: &mut FxHashMap<NodeId, NodeId>,
    ) -> NodeId {
        if self.arena.is_zero(id) {
            return NodeId::ZERO;
        }
        if let Some(&done) = memo.get(&id) {
            return done;
        }
        let node = *self.arena.get(id);
        let result = match node.branches {
            None => id,
            Some([b0, b1]) => {
                let c0 = self.normalize_rec(b0, threshold, memo);
                let c1 = self.normalize_rec(b1, threshold, memo);
                let nrm = self.arena.scale(c0).norm_sqr() + self.arena.scale(c1).norm_sqr();
                if (nrm - 1.0).abs() > threshold {
                    self.arena.pop_node(node.scale, [c0, c1])
                } else if c0 == b0 && c1 == b1 {
                    id
                } else {
                    self.arena.alloc(Node {
                        scale: node.scale,
                        branches: Some([c0, c1]),
                    })
                }
            }
        };
        memo.insert(id, result);
        result
    }

    // =========================================================================
    // Gate application
    // =========================================================================

    /// Apply `m` to `target` on the subspace selected by `controls`.
    ///
    /// Controls above the target restrict the descent to the selected
    /// branch; controls below it restrict the pairwise mix of the target's
    /// two subtrees. `controls` must be sorted by qubit and exclude `target`.
    pub fn apply(&mut self, m: &Mtrx2, controls: &[Control], target: usize) {
        debug_assert!(target < self.qubit_count);
        let split = controls.partition_point(|&(q, _)| q < target);
        let (upper, lower) = controls.split_at(split);
        let mut memo = FxHashMap::default();
        self.root = self.apply_rec(m, upper, lower, target, self.root, 0, &mut memo);
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_rec(
        &mut self,
        m: &Mtrx2,
        upper: &[Control],
        lower: &[Control],
        target: usize,
        id: NodeId,
        depth: usize,
        memo: &mut FxHashMap<NodeId, NodeId>,
    ) -> NodeId {
        if self.arena.is_zero(id) {
            return NodeId::ZERO;
        }
        if let Some(&done) = memo.get(&id) {
            return done;
        }
        let node = *self.arena.get(id);
        let Some([b0, b1]) = node.branches else {
            return id;
        };
        let result = if depth == target {
            let [y0, y1] = self.push(m, b0, b1, depth + 1, lower);
            self.arena.pop_node(node.scale, [y0, y1])
        } else {
            let branches = match upper.iter().find(|&&(q, _)| q == depth) {
                Some(&(_, true)) => [b0, self.apply_rec(m, upper, lower, target, b1, depth + 1, memo)],
                Some(&(_, false)) => [self.apply_rec(m, upper, lower, target, b0, depth + 1, memo), b1],
                None => [
                    self.apply_rec(m, upper, lower, target, b0, depth + 1, memo),
                    self.apply_rec(m, upper, lower, target, b1, depth + 1, memo),
                ],
            };
            if branches == [b0, b1] {
                id
            } else {
                self.arena.pop_node(node.scale, branches)
            }
        };
        memo.insert(id, result);
        result
    }

    /// Mix two sibling subtrees `a` (bit 0) and `b` (bit 1) at `depth`:
    /// `a' = m0 a + m1 b`, `b' = m2 a + m3 b`, restricted by `controls`.
    fn push(
        &mut self,
        m: &Mtrx2,
        a: NodeId,
        b: NodeId,
        depth: usize,
        controls: &[Control],
    ) -> [NodeId; 2] {
        let a_zero = self.arena.is_zero(a);
        let b_zero = self.arena.is_zero(b);
        if a_zero && b_zero {
            return [NodeId::ZERO; 2];
        }
        if controls.is_empty() && (a_zero || b_zero || self.arena.equal_under(a, b)) {
            // Both operands share one shape, so only the scales mix.
            let shape = if a_zero { b } else { a };
            let (y0, y1) = m.apply(self.arena.scale(a), self.arena.scale(b));
            return [
                self.arena.with_scale(shape, y0),
                self.arena.with_scale(shape, y1),
            ];
        }
        if depth >= self.qubit_count {
            // Controls always lie strictly inside the tree.
            return [a, b];
        }

        let [a0, a1] = self.arena.expand(a);
        let [b0, b1] = self.arena.expand(b);
        let ([na0, na1], [nb0, nb1]) = match controls.first() {
            Some(&(q, value)) if q == depth => {
                let rest = &controls[1..];
                if value {
                    let [y0, y1] = self.push(m, a1, b1, depth + 1, rest);
                    ([a0, y0], [b0, y1])
                } else {
                    let [y0, y1] = self.push(m, a0, b0, depth + 1, rest);
                    ([y0, a1], [y1, b1])
                }
            }
            _ => {
                let [y00, y01] = self.push(m, a0, b0, depth + 1, controls);
                let [y10, y11] = self.push(m, a1, b1, depth + 1, controls);
                ([y00, y10], [y01, y11])
            }
        };
        [
            self.arena.pop_node(ONE, [na0, na1]),
            self.arena.pop_node(ONE, [nb0, nb1]),
        ]
    }
}

/// Weight lookup defaulting to zero.
pub(crate) fn weight_of(weights: &FxHashMap<NodeId, f64>, id: NodeId) -> f64 {
    weights.get(&id).copied().unwrap_or(0.0)
}

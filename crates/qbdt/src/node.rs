//! Arena-allocated tree nodes.
//!
//! Nodes are immutable once they are reachable from a root: every
//! mutation allocates replacement nodes and rewires the path above them,
//! so subtrees can be shared freely between branches (and between
//! snapshots of the same tree). Dead entries are reclaimed by
//! [`NodeArena::compact`], which is also where duplicate subtrees are
//! merged.

use num_complex::Complex64;
use rustc_hash::{FxHashMap, FxHashSet};

pub(crate) const ZERO: Complex64 = Complex64::new(0.0, 0.0);
pub(crate) const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Index of a node inside a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The shared zero node, present in every arena.
    pub const ZERO: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One tree node.
///
/// `branches[b]` is the subtree for bit value `b` of the qubit at this
/// node's depth. A node without branches is either a leaf (at full depth)
/// or the zero node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Amplitude factor relative to the parent.
    pub scale: Complex64,
    /// Children, absent for leaves and zero nodes.
    pub branches: Option<[NodeId; 2]>,
}

impl Node {
    /// A childless node.
    pub const fn leaf(scale: Complex64) -> Self {
        Self {
            scale,
            branches: None,
        }
    }
}

/// Backing storage for the nodes of one tree.
#[derive(Debug, Clone)]
pub struct NodeArena {
    nodes: Vec<Node>,
    eps: f64,
}

impl NodeArena {
    /// Empty arena holding only the zero node. `eps` is the squared
    /// magnitude below which a scale counts as zero.
    pub fn new(eps: f64) -> Self {
        Self {
            nodes: vec![Node::leaf(ZERO)],
            eps,
        }
    }

    /// Separability threshold.
    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Total entries, live or dead.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the zero node is stored.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Store a node.
    ///
    /// # Panics
    ///
    /// Panics if the arena outgrows `u32` addressing.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = u32::try_from(self.nodes.len()).expect("node arena exceeds u32 addressing");
        self.nodes.push(node);
        NodeId(id)
    }

    /// Look up a node.
    #[inline]
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Scale of a node, zero for zero nodes.
    #[inline]
    pub fn scale(&self, id: NodeId) -> Complex64 {
        if self.is_zero(id) {
            ZERO
        } else {
            self.get(id).scale
        }
    }

    /// Whether `id` contributes no amplitude.
    #[inline]
    pub fn is_zero(&self, id: NodeId) -> bool {
        id == NodeId::ZERO || self.get(id).scale.norm_sqr() <= self.eps
    }

    /// Whether `z` counts as zero.
    #[inline]
    pub fn is_zero_scalar(&self, z: Complex64) -> bool {
        z.norm_sqr() <= self.eps
    }

    /// `id` with its scale replaced, reusing the entry when unchanged.
    pub fn with_scale(&mut self, id: NodeId, scale: Complex64) -> NodeId {
        if self.is_zero_scalar(scale) {
            return NodeId::ZERO;
        }
        let node = *self.get(id);
        if node.scale == scale {
            return id;
        }
        self.alloc(Node {
            scale,
            branches: node.branches,
        })
    }

    /// Children of `id` with the parent scale folded in.
    pub fn expand(&mut self, id: NodeId) -> [NodeId; 2] {
        if self.is_zero(id) {
            return [NodeId::ZERO; 2];
        }
        let node = *self.get(id);
        let Some([b0, b1]) = node.branches else {
            return [NodeId::ZERO; 2];
        };
        let s0 = node.scale * self.scale(b0);
        let s1 = node.scale * self.scale(b1);
        [self.with_scale(b0, s0), self.with_scale(b1, s1)]
    }

    /// Build an internal node in canonical form.
    ///
    /// The children's squared scales are rescaled to sum to one and the
    /// first non-zero child scale is rotated onto the positive real axis;
    /// the removed magnitude and phase move into the returned node's scale.
    pub fn pop_node(&mut self, scale: Complex64, [b0, b1]: [NodeId; 2]) -> NodeId {
        let s0 = self.scale(b0);
        let s1 = self.scale(b1);
        let nrm_sqr = s0.norm_sqr() + s1.norm_sqr();
        if nrm_sqr <= self.eps {
            return NodeId::ZERO;
        }
        let lead = if self.is_zero_scalar(s0) { s1 } else { s0 };
        let factor = Complex64::from_polar(nrm_sqr.sqrt(), lead.arg());
        let scale = scale * factor;
        if self.is_zero_scalar(scale) {
            return NodeId::ZERO;
        }
        let c0 = if self.is_zero_scalar(s0) {
            NodeId::ZERO
        } else {
            self.with_scale(b0, s0 / factor)
        };
        let c1 = if self.is_zero_scalar(s1) {
            NodeId::ZERO
        } else {
            self.with_scale(b1, s1 / factor)
        };
        self.alloc(Node {
            scale,
            branches: Some([c0, c1]),
        })
    }

    /// Equal scales and equal structure below.
    pub fn equal(&self, a: NodeId, b: NodeId) -> bool {
        let mut proven = FxHashSet::default();
        self.equal_memo(a, b, &mut proven)
    }

    /// Equal structure below, ignoring the two nodes' own scales.
    pub fn equal_under(&self, a: NodeId, b: NodeId) -> bool {
        let mut proven = FxHashSet::default();
        self.equal_under_memo(a, b, &mut proven)
    }

    fn equal_memo(
        &self,
        a: NodeId,
        b: NodeId,
        proven: &mut FxHashSet<(NodeId, NodeId)>,
    ) -> bool {
        match (self.is_zero(a), self.is_zero(b)) {
            (true, true) => true,
            (false, false) => {
                self.is_zero_scalar(self.get(a).scale - self.get(b).scale)
                    && self.equal_under_memo(a, b, proven)
            }
            _ => false,
        }
    }

    fn equal_under_memo(
        &self,
        a: NodeId,
        b: NodeId,
        proven: &mut FxHashSet<(NodeId, NodeId)>,
    ) -> bool {
        if a == b || proven.contains(&(a, b)) {
            return true;
        }
        let equal = match (self.get(a).branches, self.get(b).branches) {
            (None, None) => true,
            (Some([a0, a1]), Some([b0, b1])) => {
                self.equal_memo(a0, b0, proven) && self.equal_memo(a1, b1, proven)
            }
            _ => false,
        };
        if equal {
            proven.insert((a, b));
        }
        equal
    }

    /// Copy the subtree under `root` into a fresh arena, merging subtrees
    /// that are equal within the threshold. Returns the new arena and the
    /// new root id.
    ///
    /// Scales are bucketed on a grid of width `sqrt(eps)` before the exact
    /// comparison, so two equal scales that straddle a bucket boundary
    /// stay unmerged. Nothing unequal is ever merged.
    pub fn compact(&self, root: NodeId) -> (NodeArena, NodeId) {
        let mut out = NodeArena::new(self.eps);
        let mut ctx = Compactor {
            cell: self.eps.sqrt().max(f64::EPSILON),
            remap: FxHashMap::default(),
            unique: FxHashMap::default(),
        };
        let new_root = ctx.copy(self, &mut out, root);
        (out, new_root)
    }

    /// Number of distinct non-zero nodes reachable from `root`.
    pub fn count_reachable(&self, root: NodeId) -> usize {
        let mut seen = FxHashSet::default();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.is_zero(id) || !seen.insert(id) {
                continue;
            }
            if let Some(branches) = self.get(id).branches {
                stack.extend(branches);
            }
        }
        seen.len()
    }

    /// Copy the subtree under `id` of `other` into this arena.
    pub fn import(
        &mut self,
        other: &NodeArena,
        id: NodeId,
        remap: &mut FxHashMap<NodeId, NodeId>,
    ) -> NodeId {
        if other.is_zero(id) {
            return NodeId::ZERO;
        }
        if let Some(&mapped) = remap.get(&id) {
            return mapped;
        }
        let node = *other.get(id);
        let branches = node
            .branches
            .map(|[b0, b1]| [self.import(other, b0, remap), self.import(other, b1, remap)]);
        let new_id = self.alloc(Node {
            scale: node.scale,
            branches,
        });
        remap.insert(id, new_id);
        new_id
    }
}

type BucketKey = (Option<[NodeId; 2]>, i64, i64);

struct Compactor {
    cell: f64,
    remap: FxHashMap<NodeId, NodeId>,
    unique: FxHashMap<BucketKey, Vec<NodeId>>,
}

impl Compactor {
    fn copy(&mut self, src: &NodeArena, out: &mut NodeArena, id: NodeId) -> NodeId {
        if src.is_zero(id) {
            return NodeId::ZERO;
        }
        if let Some(&mapped) = self.remap.get(&id) {
            return mapped;
        }
        let node = *src.get(id);
        let branches = match node.branches {
            Some([b0, b1]) => {
                let c0 = self.copy(src, out, b0);
                let c1 = self.copy(src, out, b1);
                if c0 == NodeId::ZERO && c1 == NodeId::ZERO {
                    self.remap.insert(id, NodeId::ZERO);
                    return NodeId::ZERO;
                }
                Some([c0, c1])
            }
            None => None,
        };
        #[allow(clippy::cast_possible_truncation)]
        let key = (
            branches,
            (node.scale.re / self.cell).round() as i64,
            (node.scale.im / self.cell).round() as i64,
        );
        let bucket = self.unique.entry(key).or_default();
        let found = bucket
            .iter()
            .copied()
            .find(|&c| out.is_zero_scalar(out.get(c).scale - node.scale));
        let new_id = match found {
            Some(existing) => existing,
            None => {
                let fresh = out.alloc(Node {
                    scale: node.scale,
                    branches,
                });
                bucket.push(fresh);
                fresh
            }
        };
        self.remap.insert(id, new_id);
        new_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn approx(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    #[test]
    fn test_pop_node_canonical() {
        let mut arena = NodeArena::new(EPS);
        let a = arena.alloc(Node::leaf(Complex64::new(0.0, 3.0)));
        let b = arena.alloc(Node::leaf(Complex64::new(4.0, 0.0)));
        let n = arena.pop_node(ONE, [a, b]);
        let node = *arena.get(n);
        assert!(approx(node.scale, Complex64::new(0.0, 5.0)));
        let [c0, c1] = node.branches.unwrap();
        assert!(approx(arena.scale(c0), Complex64::new(0.6, 0.0)));
        assert!(approx(arena.scale(c1), Complex64::new(0.0, -0.8)));
    }

    #[test]
    fn test_pop_node_all_zero() {
        let mut arena = NodeArena::new(EPS);
        assert_eq!(arena.pop_node(ONE, [NodeId::ZERO, NodeId::ZERO]), NodeId::ZERO);
    }

    #[test]
    fn test_equal_within_threshold() {
        let mut arena = NodeArena::new(EPS);
        let a = arena.alloc(Node::leaf(Complex64::new(0.5, 0.0)));
        let b = arena.alloc(Node::leaf(Complex64::new(0.5 + 1e-9, 0.0)));
        let c = arena.alloc(Node::leaf(Complex64::new(0.6, 0.0)));
        assert!(arena.equal(a, b));
        assert!(!arena.equal(a, c));
        assert!(arena.equal_under(a, c));
    }

    #[test]
    fn test_compact_merges_duplicates() {
        let mut arena = NodeArena::new(EPS);
        let l0 = arena.alloc(Node::leaf(ONE));
        let l1 = arena.alloc(Node::leaf(ONE));
        let n0 = arena.alloc(Node {
            scale: Complex64::new(0.5, 0.0),
            branches: Some([l0, NodeId::ZERO]),
        });
        let n1 = arena.alloc(Node {
            scale: Complex64::new(0.5, 0.0),
            branches: Some([l1, NodeId::ZERO]),
        });
        let root = arena.alloc(Node {
            scale: ONE,
            branches: Some([n0, n1]),
        });
        assert_eq!(arena.count_reachable(root), 5);

        let (out, new_root) = arena.compact(root);
        assert_eq!(out.count_reachable(new_root), 3);
        let [c0, c1] = out.get(new_root).branches.unwrap();
        assert_eq!(c0, c1);
    }

    #[test]
    fn test_compact_drops_zero_subtrees() {
        let mut arena = NodeArena::new(EPS);
        let tiny = arena.alloc(Node::leaf(Complex64::new(1e-8, 0.0)));
        let root = arena.alloc(Node {
            scale: ONE,
            branches: Some([tiny, tiny]),
        });
        let (_, new_root) = arena.compact(root);
        assert_eq!(new_root, NodeId::ZERO);
    }
}

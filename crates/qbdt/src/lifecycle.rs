//! Register growth and shrinkage: compose, decompose, dispose, allocate.
//!
//! Qubits `[start, start + length)` of a tree live on levels `start` to
//! `start + length - 1`. The nodes on level `start` are the "hosts" of the
//! range: inserting a register grafts a copy of it under every host, and
//! removing a range replaces every host's range part with what sits below
//! it.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, instrument};

use crate::error::{QbdtError, QbdtResult};
use crate::node::{Node, NodeArena, NodeId, ONE};
use crate::perm::{BitCapInt, MAX_QUBITS, check_perm, select_bit};
use crate::register::Qbdt;
use crate::shard::ShardBuffer;
use crate::tree::BdtTree;

impl BdtTree {
    /// Distinct non-zero nodes on level `depth`.
    fn hosts(&self, depth: usize) -> Vec<NodeId> {
        let mut level = vec![self.root];
        for _ in 0..depth {
            let mut seen = FxHashSet::default();
            level = level
                .into_iter()
                .filter_map(|id| self.arena.get(id).branches)
                .flatten()
                .filter(|&b| !self.arena.is_zero(b) && seen.insert(b))
                .collect();
        }
        level.retain(|&id| !self.arena.is_zero(id));
        level
    }

    /// Rebuild the levels above `depth`, substituting hosts from `swap`.
    fn replace_hosts(
        &mut self,
        id: NodeId,
        depth: usize,
        target: usize,
        swap: &FxHashMap<NodeId, NodeId>,
        memo: &mut FxHashMap<NodeId, NodeId>,
    ) -> NodeId {
        if self.arena.is_zero(id) {
            return NodeId::ZERO;
        }
        if depth == target {
            return swap.get(&id).copied().unwrap_or(id);
        }
        if let Some(&done) = memo.get(&id) {
            return done;
        }
        let node = *self.arena.get(id);
        let Some([b0, b1]) = node.branches else {
            return id;
        };
        let c0 = self.replace_hosts(b0, depth + 1, target, swap, memo);
        let c1 = self.replace_hosts(b1, depth + 1, target, swap, memo);
        let rebuilt = self.arena.pop_node(node.scale, [c0, c1]);
        memo.insert(id, rebuilt);
        rebuilt
    }

    /// Tensor `other` into this tree so its qubits start at `start`.
    pub fn insert_at_depth(&mut self, other: &BdtTree, start: usize) {
        let mut remap = FxHashMap::default();
        let inserted = self.arena.import(&other.arena, other.root, &mut remap);
        if self.arena.is_zero(inserted) || self.arena.is_zero(self.root) {
            self.root = NodeId::ZERO;
            self.qubit_count += other.qubit_count;
            return;
        }
        let inserted_node = *self.arena.get(inserted);
        let Some([x0, x1]) = inserted_node.branches else {
            // A zero-qubit register only carries a phase.
            let scale = self.arena.get(self.root).scale * inserted_node.scale;
            self.root = self.arena.with_scale(self.root, scale);
            return;
        };

        let mut swap = FxHashMap::default();
        for host in self.hosts(start) {
            let host_node = *self.arena.get(host);
            let mut memo = FxHashMap::default();
            let c0 = self.copy_with_tail(x0, 1, other.qubit_count, host_node.branches, &mut memo);
            let c1 = self.copy_with_tail(x1, 1, other.qubit_count, host_node.branches, &mut memo);
            let grafted = self.arena.alloc(Node {
                scale: host_node.scale * inserted_node.scale,
                branches: Some([c0, c1]),
            });
            swap.insert(host, grafted);
        }
        let mut memo = FxHashMap::default();
        self.root = self.replace_hosts(self.root, 0, start, &swap, &mut memo);
        self.qubit_count += other.qubit_count;
    }

    /// Copy an inserted subtree, giving its leaves the branches `tail`.
    fn copy_with_tail(
        &mut self,
        id: NodeId,
        depth: usize,
        length: usize,
        tail: Option<[NodeId; 2]>,
        memo: &mut FxHashMap<NodeId, NodeId>,
    ) -> NodeId {
        if self.arena.is_zero(id) {
            return NodeId::ZERO;
        }
        if let Some(&done) = memo.get(&id) {
            return done;
        }
        let node = *self.arena.get(id);
        let branches = if depth == length {
            tail
        } else {
            node.branches.map(|[b0, b1]| {
                [
                    self.copy_with_tail(b0, depth + 1, length, tail, memo),
                    self.copy_with_tail(b1, depth + 1, length, tail, memo),
                ]
            })
        };
        let copied = self.arena.alloc(Node {
            scale: node.scale,
            branches,
        });
        memo.insert(id, copied);
        copied
    }

    /// Split off qubits `[start, start + length)` as their own tree.
    ///
    /// Returns `None`, leaving this tree untouched, when the range is not
    /// separable within threshold.
    pub fn remove_range(&mut self, start: usize, length: usize) -> Option<BdtTree> {
        let eps = self.eps();
        if length == 0 {
            return Some(BdtTree::basis(0, 0, ONE, eps));
        }
        let end = start + length;
        let mut part_arena = NodeArena::new(eps);
        let mut part_root: Option<NodeId> = None;
        let mut swap = FxHashMap::default();

        for host in self.hosts(start) {
            let mut tail = None;
            let mut memo = FxHashMap::default();
            let extracted = self.extract(host, start, start, end, &mut part_arena, &mut tail, &mut memo)?;
            match part_root {
                None => part_root = Some(extracted),
                Some(existing) => {
                    if !part_arena.equal(existing, extracted) {
                        return None;
                    }
                }
            }
            let tail_branches = tail.and_then(|t: NodeId| self.arena.get(t).branches);
            let host_scale = self.arena.get(host).scale;
            let replacement = self.arena.alloc(Node {
                scale: host_scale,
                branches: tail_branches,
            });
            swap.insert(host, replacement);
        }

        let Some(part_root) = part_root else {
            // All-zero state: any split is as good as another.
            self.qubit_count -= length;
            return Some(BdtTree::basis(length, 0, ONE, eps));
        };
        let mut memo = FxHashMap::default();
        self.root = self.replace_hosts(self.root, 0, start, &swap, &mut memo);
        self.qubit_count -= length;
        Some(BdtTree::from_parts(part_arena, part_root, length))
    }

    /// Copy levels `[start, end)` under `id` into `part`. Every non-zero
    /// node reached on level `end` must have the same structure as the
    /// first one, which is recorded in `tail`.
    #[allow(clippy::too_many_arguments)]
    fn extract(
        &self,
        id: NodeId,
        depth: usize,
        start: usize,
        end: usize,
        part: &mut NodeArena,
        tail: &mut Option<NodeId>,
        memo: &mut FxHashMap<NodeId, NodeId>,
    ) -> Option<NodeId> {
        if self.arena.is_zero(id) {
            return Some(NodeId::ZERO);
        }
        if let Some(&done) = memo.get(&id) {
            return Some(done);
        }
        let node = *self.arena.get(id);
        let copied = if depth == end {
            match *tail {
                None => *tail = Some(id),
                Some(first) => {
                    if !self.arena.equal_under(first, id) {
                        return None;
                    }
                }
            }
            part.alloc(Node::leaf(node.scale))
        } else {
            let [b0, b1] = node.branches?;
            let c0 = self.extract(b0, depth + 1, start, end, part, tail, memo)?;
            let c1 = self.extract(b1, depth + 1, start, end, part, tail, memo)?;
            let scale = if depth == start { ONE } else { node.scale };
            part.alloc(Node {
                scale,
                branches: Some([c0, c1]),
            })
        };
        memo.insert(id, copied);
        Some(copied)
    }

    /// Drop qubits `[start, start + length)` after projecting them onto
    /// the basis value `perm`. Returns `false`, leaving the tree untouched,
    /// when that value has zero amplitude.
    pub fn remove_basis_range(&mut self, start: usize, length: usize, perm: BitCapInt) -> bool {
        let mut swap = FxHashMap::default();
        for host in self.hosts(start) {
            let host_node = *self.arena.get(host);
            let mut id = host;
            let mut amp = ONE;
            for k in 0..length {
                let Some(branches) = self.arena.get(id).branches else {
                    id = NodeId::ZERO;
                    break;
                };
                id = branches[usize::from(select_bit(perm, k))];
                if self.arena.is_zero(id) {
                    break;
                }
                amp *= self.arena.get(id).scale;
            }
            let replacement = if self.arena.is_zero(id) {
                NodeId::ZERO
            } else {
                self.arena.alloc(Node {
                    scale: host_node.scale * amp,
                    branches: self.arena.get(id).branches,
                })
            };
            swap.insert(host, replacement);
        }
        let mut memo = FxHashMap::default();
        let root = self.replace_hosts(self.root, 0, start, &swap, &mut memo);
        if self.arena.is_zero(root) {
            return false;
        }
        self.root = root;
        self.qubit_count -= length;
        true
    }
}

impl Qbdt {
    /// Tensor `other` into this register so its qubits start at `start`.
    /// Returns `start`.
    #[instrument(skip(self, other), fields(qubits = self.qubit_count(), inserted = other.qubit_count()))]
    pub fn compose(&mut self, other: &Qbdt, start: usize) -> QbdtResult<usize> {
        if start > self.qubit_count() {
            return Err(QbdtError::QubitOutOfRange {
                qubit: start,
                qubit_count: self.qubit_count(),
            });
        }
        let total = self.qubit_count() + other.qubit_count();
        if total > MAX_QUBITS {
            return Err(QbdtError::TooManyQubits {
                requested: total,
                max: MAX_QUBITS,
            });
        }
        self.tree.insert_at_depth(&other.tree, start);
        self.shards.insert(start, other.shards.clone());
        self.after_mutation();
        Ok(start)
    }

    /// Append `other` after the last qubit. Returns where it starts.
    pub fn compose_end(&mut self, other: &Qbdt) -> QbdtResult<usize> {
        let start = self.qubit_count();
        self.compose(other, start)
    }

    /// Move qubits `[start, start + dest.qubit_count())` into `dest`,
    /// replacing its state.
    #[instrument(skip(self, dest), fields(qubits = self.qubit_count(), length = dest.qubit_count()))]
    pub fn decompose_into(&mut self, start: usize, dest: &mut Qbdt) -> QbdtResult<()> {
        let length = dest.qubit_count();
        self.check_range(start, length)?;
        let part = self
            .tree
            .remove_range(start, length)
            .ok_or(QbdtError::NotSeparable { start, length })?;
        dest.tree = part;
        dest.shards = self.shards.split_out(start, length);
        self.after_mutation();
        dest.after_mutation();
        debug!(start, length, "qubits decomposed");
        Ok(())
    }

    /// Split qubits `[start, start + length)` off into a new register.
    pub fn decompose(&mut self, start: usize, length: usize) -> QbdtResult<Qbdt> {
        self.check_range(start, length)?;
        let mut dest = self.sibling(length);
        self.decompose_into(start, &mut dest)?;
        Ok(dest)
    }

    /// Discard qubits `[start, start + length)`, which must be separable.
    pub fn dispose(&mut self, start: usize, length: usize) -> QbdtResult<()> {
        self.check_range(start, length)?;
        self.tree
            .remove_range(start, length)
            .ok_or(QbdtError::NotSeparable { start, length })?;
        self.shards.split_out(start, length);
        self.after_mutation();
        Ok(())
    }

    /// Discard qubits `[start, start + length)` after forcing them to
    /// `perm`. Fails only when that value has zero probability.
    pub fn dispose_perm(&mut self, start: usize, length: usize, perm: BitCapInt) -> QbdtResult<()> {
        self.check_range(start, length)?;
        check_perm(perm, length)?;
        for q in start..start + length {
            self.flush_qubit(q);
        }
        if !self.tree.remove_basis_range(start, length, perm) {
            return Err(QbdtError::ImpossibleOutcome { qubit: start });
        }
        self.shards.split_out(start, length);
        self.tree.normalize(self.config.normalize_threshold);
        self.after_mutation();
        Ok(())
    }

    /// Insert `length` fresh qubits in `|0>` at `start`. Returns `start`.
    pub fn allocate(&mut self, start: usize, length: usize) -> QbdtResult<usize> {
        if start > self.qubit_count() {
            return Err(QbdtError::QubitOutOfRange {
                qubit: start,
                qubit_count: self.qubit_count(),
            });
        }
        if length == 0 {
            return Ok(start);
        }
        let fresh = BdtTree::basis(length, 0, ONE, self.eps());
        self.tree.insert_at_depth(&fresh, start);
        self.shards.insert(start, ShardBuffer::new(length));
        self.after_mutation();
        Ok(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Mtrx2;
    use num_complex::Complex64;

    const EPS: f64 = 1e-12;

    fn state(tree: &BdtTree) -> Vec<Complex64> {
        (0..1u128 << tree.qubit_count())
            .map(|i| tree.amplitude(i))
            .collect()
    }

    fn close(a: &[Complex64], b: &[Complex64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).norm() < 1e-10)
    }

    #[test]
    fn test_insert_in_middle() {
        // |1> on qubit 0, |1> on qubit 1 → insert |+> between them.
        let mut host = BdtTree::basis(2, 0b11, ONE, EPS);
        let mut plus = BdtTree::basis(1, 0, ONE, EPS);
        plus.apply(&Mtrx2::h(), &[], 0);
        host.insert_at_depth(&plus, 1);
        assert_eq!(host.qubit_count(), 3);
        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert!((host.amplitude(0b101).re - s).abs() < 1e-12);
        assert!((host.amplitude(0b111).re - s).abs() < 1e-12);
        assert!((host.norm_sqr() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_remove_inserted_range_round_trip() {
        let mut host = BdtTree::basis(2, 0, ONE, EPS);
        host.apply(&Mtrx2::h(), &[], 0);
        host.apply(&Mtrx2::x(), &[(0, true)], 1);
        let before = state(&host);

        let mut other = BdtTree::basis(2, 0, ONE, EPS);
        other.apply(&Mtrx2::ry(0.7), &[], 0);
        other.apply(&Mtrx2::x(), &[(0, true)], 1);
        let other_state = state(&other);

        host.insert_at_depth(&other, 1);
        host.prune();
        let part = host.remove_range(1, 2).unwrap();
        assert!(close(&state(&host), &before));
        assert!(close(&state(&part), &other_state));
    }

    #[test]
    fn test_entangled_range_not_separable() {
        let mut tree = BdtTree::basis(2, 0, ONE, EPS);
        tree.apply(&Mtrx2::h(), &[], 0);
        tree.apply(&Mtrx2::x(), &[(0, true)], 1);
        let before = state(&tree);
        assert!(tree.remove_range(1, 1).is_none());
        assert!(close(&state(&tree), &before));
        assert_eq!(tree.qubit_count(), 2);
    }

    #[test]
    fn test_remove_basis_range_projects() {
        let mut tree = BdtTree::basis(2, 0, ONE, EPS);
        tree.apply(&Mtrx2::h(), &[], 0);
        tree.apply(&Mtrx2::x(), &[(0, true)], 1);
        assert!(tree.remove_basis_range(1, 1, 1));
        tree.normalize(1e-10);
        assert_eq!(tree.qubit_count(), 1);
        assert!((tree.amplitude(1).norm() - 1.0).abs() < 1e-12);
    }
}

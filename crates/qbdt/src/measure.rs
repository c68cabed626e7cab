//! Probabilities, sampling and collapse.

use num_complex::Complex64;
use qbdt_dense::Capability;
use rand::Rng;
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use crate::error::{QbdtError, QbdtResult};
use crate::node::NodeId;
use crate::perm::{BitCapInt, check_perm, log2, pow2, select_bit, to_native};
use crate::register::Qbdt;
use crate::tree::{BdtTree, weight_of};

impl BdtTree {
    /// Probability that `qubit` reads 1.
    ///
    /// Accumulates the probability mass reaching each distinct node on the
    /// target level, so shared subtrees are visited once.
    pub fn prob(&self, qubit: usize) -> f64 {
        if self.arena.is_zero(self.root) {
            return 0.0;
        }
        let weights = self.subtree_weights();
        let mut level: FxHashMap<NodeId, f64> = FxHashMap::default();
        level.insert(self.root, self.arena.get(self.root).scale.norm_sqr());
        for _ in 0..qubit {
            let mut next: FxHashMap<NodeId, f64> = FxHashMap::default();
            for (&id, &w) in &level {
                let Some(branches) = self.arena.get(id).branches else {
                    continue;
                };
                for b in branches {
                    if !self.arena.is_zero(b) {
                        *next.entry(b).or_default() += w * self.arena.get(b).scale.norm_sqr();
                    }
                }
            }
            level = next;
        }

        let (mut p0, mut p1) = (0.0, 0.0);
        for (&id, &w) in &level {
            let Some([b0, b1]) = self.arena.get(id).branches else {
                continue;
            };
            p0 += w * self.arena.scale(b0).norm_sqr() * weight_of(&weights, b0);
            p1 += w * self.arena.scale(b1).norm_sqr() * weight_of(&weights, b1);
        }
        let total = p0 + p1;
        if total <= 0.0 { 0.0 } else { (p1 / total).clamp(0.0, 1.0) }
    }

    /// Draw one basis state from the amplitude distribution.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BitCapInt {
        let weights = self.subtree_weights();
        let mut perm: BitCapInt = 0;
        let mut id = self.root;
        for q in 0..self.qubit_count {
            if self.arena.is_zero(id) {
                break;
            }
            let Some([b0, b1]) = self.arena.get(id).branches else {
                break;
            };
            let w0 = self.arena.scale(b0).norm_sqr() * weight_of(&weights, b0);
            let w1 = self.arena.scale(b1).norm_sqr() * weight_of(&weights, b1);
            let total = w0 + w1;
            if total <= 0.0 {
                break;
            }
            if rng.r#gen::<f64>() * total < w1 {
                perm |= 1 << q;
                id = b1;
            } else {
                id = b0;
            }
        }
        perm
    }

    /// Zero every amplitude whose `qubit` disagrees with `result`, then
    /// restore unit norm. Returns `false`, leaving the tree untouched, when
    /// nothing survives.
    pub fn project(&mut self, qubit: usize, result: bool) -> bool {
        let mut memo = FxHashMap::default();
        let root = self.project_rec(self.root, 0, qubit, result, &mut memo);
        if self.arena.is_zero(root) {
            return false;
        }
        let scale = self.arena.get(root).scale;
        self.root = self.arena.with_scale(root, scale / scale.norm());
        true
    }

    fn project_rec(
        &mut self,
        id: NodeId,
        depth: usize,
        qubit: usize,
        result: bool,
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
        let branches = if depth == qubit {
            if result {
                [NodeId::ZERO, b1]
            } else {
                [b0, NodeId::ZERO]
            }
        } else {
            [
                self.project_rec(b0, depth + 1, qubit, result, memo),
                self.project_rec(b1, depth + 1, qubit, result, memo),
            ]
        };
        let projected = self.arena.pop_node(node.scale, branches);
        memo.insert(id, projected);
        projected
    }
}

impl Qbdt {
    /// Probability that `qubit` reads 1.
    pub fn prob(&mut self, qubit: usize) -> QbdtResult<f64> {
        self.check_qubit(qubit)?;
        self.flush_if_non_phase(qubit);
        Ok(self.tree.prob(qubit))
    }

    /// Probability of one basis state. A state holding all the probability
    /// within threshold snaps the register onto it exactly.
    pub fn prob_all(&mut self, perm: BitCapInt) -> QbdtResult<f64> {
        check_perm(perm, self.qubit_count())?;
        self.flush_all();
        let amp = self.tree.amplitude(perm);
        let p = amp.norm_sqr();
        if p >= 1.0 - self.eps() {
            self.set_permutation(perm, amp / amp.norm())?;
            return Ok(1.0);
        }
        Ok(p)
    }

    /// Measure `qubit`.
    pub fn m(&mut self, qubit: usize) -> QbdtResult<bool> {
        self.force_m(qubit, false, false, true)
    }

    /// Measure `qubit`, or impose `result` when `do_force`. With
    /// `do_apply` false the state is left untouched.
    pub fn force_m(
        &mut self,
        qubit: usize,
        result: bool,
        do_force: bool,
        do_apply: bool,
    ) -> QbdtResult<bool> {
        self.check_qubit(qubit)?;
        self.flush_if_non_phase(qubit);
        let p1 = self.tree.prob(qubit);
        let mut outcome = if do_force {
            result
        } else {
            self.rng.r#gen::<f64>() < p1
        };
        let p = if outcome { p1 } else { 1.0 - p1 };
        if p <= self.eps() {
            if do_force {
                return Err(QbdtError::ImpossibleOutcome { qubit });
            }
            outcome = !outcome;
        }
        if !do_apply {
            return Ok(outcome);
        }

        // A diagonal shard only contributes a global phase once collapsed.
        self.shards.take(qubit);
        if !self.tree.project(qubit, outcome) {
            return Err(QbdtError::ImpossibleOutcome { qubit });
        }
        self.after_mutation();
        debug!(qubit, outcome, "qubit collapsed");
        Ok(outcome)
    }

    /// Measure (or impose) a whole range. Returns the register value.
    pub fn force_m_reg(
        &mut self,
        start: usize,
        length: usize,
        result: BitCapInt,
        do_force: bool,
    ) -> QbdtResult<BitCapInt> {
        self.check_range(start, length)?;
        let mut value = 0;
        for k in 0..length {
            if self.force_m(start + k, select_bit(result, k), do_force, true)? {
                value |= pow2(k);
            }
        }
        Ok(value)
    }

    /// Collapse the range `[start, start + length)` and flip it to `value`.
    pub fn set_reg(&mut self, start: usize, length: usize, value: BitCapInt) -> QbdtResult<()> {
        let measured = self.force_m_reg(start, length, 0, false)?;
        for k in 0..length {
            if select_bit(measured, k) != select_bit(value, k) {
                self.x(start + k)?;
            }
        }
        Ok(())
    }

    /// Measure every qubit.
    pub fn m_all(&mut self) -> QbdtResult<BitCapInt> {
        self.m_all_optional_collapse(true)
    }

    /// Sample a full basis state. When `collapse` is false the register is
    /// left unchanged, so repeated calls sample independently.
    #[instrument(skip(self), fields(qubits = self.qubit_count()))]
    pub fn m_all_optional_collapse(&mut self, collapse: bool) -> QbdtResult<BitCapInt> {
        self.flush_all();
        if self.tree.norm_sqr() <= self.eps() {
            return Err(QbdtError::ZeroNorm);
        }
        let perm = self.tree.sample(&mut self.rng);
        if collapse {
            let amp = self.tree.amplitude(perm);
            let phase = if amp.norm() > 0.0 {
                amp / amp.norm()
            } else {
                Complex64::new(1.0, 0.0)
            };
            self.set_permutation(perm, phase)?;
        }
        Ok(perm)
    }

    /// Sample without collapse, mapping qubit `qubit_powers[i]` onto output
    /// bit `i`.
    pub fn sample_clone(&mut self, qubit_powers: &[BitCapInt]) -> QbdtResult<BitCapInt> {
        let perm = self.m_all_optional_collapse(false)?;
        Ok(qubit_powers
            .iter()
            .enumerate()
            .filter(|&(_, &power)| perm & power != 0)
            .fold(0, |acc, (i, _)| acc | pow2(i)))
    }

    /// Probability that the qubits in `mask` have odd parity.
    pub fn prob_parity(&mut self, mask: BitCapInt) -> QbdtResult<f64> {
        if mask == 0 {
            return Ok(0.0);
        }
        self.check_qubit(log2(mask))?;
        if mask.is_power_of_two() {
            return self.prob(log2(mask));
        }
        let native = to_native(mask, self.qubit_count())?;
        self.inspect_as_state_vector(&[Capability::Parity], |engine| {
            let parity = engine
                .as_parity()
                .ok_or(QbdtError::MissingCapability(Capability::Parity))?;
            Ok(parity.prob_parity(native))
        })
    }

    /// Measure (or impose) the parity of the qubits in `mask`.
    pub fn force_m_parity(
        &mut self,
        mask: BitCapInt,
        result: bool,
        do_force: bool,
    ) -> QbdtResult<bool> {
        if mask == 0 {
            return Ok(false);
        }
        self.check_qubit(log2(mask))?;
        if mask.is_power_of_two() {
            return self.force_m(log2(mask), result, do_force, true);
        }
        let native = to_native(mask, self.qubit_count())?;
        self.execute_as_state_vector(&[Capability::Parity], |engine| {
            let parity = engine
                .as_parity()
                .ok_or(QbdtError::MissingCapability(Capability::Parity))?;
            Ok(parity.force_m_parity(native, result, do_force)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Mtrx2;
    use crate::node::ONE;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_prob_after_hadamard() {
        let mut tree = BdtTree::basis(3, 0b100, ONE, EPS);
        tree.apply(&Mtrx2::h(), &[], 1);
        assert!((tree.prob(1) - 0.5).abs() < 1e-12);
        assert!(tree.prob(0).abs() < 1e-12);
        assert!((tree.prob(2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_project_collapses() {
        let mut tree = BdtTree::basis(2, 0, ONE, EPS);
        tree.apply(&Mtrx2::h(), &[], 0);
        tree.apply(&Mtrx2::x(), &[(0, true)], 1);
        assert!(tree.project(1, true));
        assert!((tree.amplitude(0b11).norm() - 1.0).abs() < 1e-12);
        assert!((tree.norm_sqr() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_project_impossible_leaves_tree() {
        let mut tree = BdtTree::basis(2, 0, ONE, EPS);
        assert!(!tree.project(0, true));
        assert!((tree.amplitude(0) - ONE).norm() < 1e-12);
    }

    #[test]
    fn test_sample_basis_state() {
        let tree = BdtTree::basis(4, 0b1010, ONE, EPS);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..10 {
            assert_eq!(tree.sample(&mut rng), 0b1010);
        }
    }

    #[test]
    fn test_sample_bell_correlated() {
        let mut tree = BdtTree::basis(2, 0, ONE, EPS);
        tree.apply(&Mtrx2::h(), &[], 0);
        tree.apply(&Mtrx2::x(), &[(0, true)], 1);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let s = tree.sample(&mut rng);
            assert!(s == 0b00 || s == 0b11);
        }
    }
}

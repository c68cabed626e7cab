//! Dense-engine fallback.
//!
//! Operators without a tree algorithm (integer arithmetic, multi-qubit
//! parity, single-amplitude writes) run on a dense engine built by the
//! register's factory: the tree is expanded into it, the operator runs,
//! and the result is traversed back into a fresh tree. Every call costs
//! `O(2^n)` time and memory.

use num_complex::Complex64;
use qbdt_dense::{Capability, DenseAlu, DenseEngine, DenseError, DenseParity, DenseResult};
use rand::Rng;
use tracing::{debug, instrument};

use crate::error::{QbdtError, QbdtResult};
use crate::gate::Mtrx2;
use crate::perm::{BitCapInt, check_perm, log2, pow2_mask, to_native};
use crate::register::Qbdt;
use crate::tree::BdtTree;

impl Qbdt {
    /// Fail with [`QbdtError::MissingCapability`] unless the dense factory
    /// provides every capability in `required`.
    pub fn require_capabilities(&self, required: &[Capability]) -> QbdtResult<()> {
        let available = self.dense.capabilities();
        match required.iter().find(|&&c| !available.supports(c)) {
            Some(&missing) => Err(QbdtError::MissingCapability(missing)),
            None => Ok(()),
        }
    }

    /// Run `op` against a dense copy of the state and write the result
    /// back into the tree.
    ///
    /// Capabilities are checked before anything is touched. If `op` fails
    /// the tree keeps its previous state.
    #[instrument(skip(self, op), fields(qubits = self.qubit_count()))]
    pub fn execute_as_state_vector<R>(
        &mut self,
        required: &[Capability],
        op: impl FnOnce(&mut dyn DenseEngine) -> QbdtResult<R>,
    ) -> QbdtResult<R> {
        let mut engine = self.materialize(required)?;
        let result = op(engine.as_mut())?;

        let state = engine.get_quantum_state();
        if state.iter().all(|a| a.norm_sqr() <= self.eps()) {
            return Err(QbdtError::ZeroNorm);
        }
        let (qubit_count, eps) = (self.qubit_count(), self.eps());
        self.tree = self
            .pool
            .install(|| BdtTree::set_traversal(qubit_count, eps, |i| state[i]));
        self.after_mutation();
        debug!(nodes = self.tree.count_branches(), "dense result written back");
        Ok(result)
    }

    /// Run a read-only `op` against a dense copy of the state.
    pub fn inspect_as_state_vector<R>(
        &mut self,
        required: &[Capability],
        op: impl FnOnce(&mut dyn DenseEngine) -> QbdtResult<R>,
    ) -> QbdtResult<R> {
        let mut engine = self.materialize(required)?;
        op(engine.as_mut())
    }

    fn materialize(&mut self, required: &[Capability]) -> QbdtResult<Box<dyn DenseEngine>> {
        self.require_capabilities(required)?;
        self.check_dense_width()?;
        self.flush_all();
        let seed = self.rng.r#gen();
        let mut engine = self.dense.create(self.qubit_count(), seed)?;
        let tree = &self.tree;
        let state = self.pool.install(|| tree.get_quantum_state());
        engine.set_quantum_state(&state)?;
        Ok(engine)
    }

    fn with_alu<R>(
        &mut self,
        op: impl FnOnce(&mut dyn DenseAlu) -> DenseResult<R>,
    ) -> QbdtResult<R> {
        self.execute_as_state_vector(&[Capability::Alu], |engine| {
            let alu = engine
                .as_alu()
                .ok_or(QbdtError::MissingCapability(Capability::Alu))?;
            Ok(op(alu)?)
        })
    }

    fn with_parity<R>(
        &mut self,
        op: impl FnOnce(&mut dyn DenseParity) -> DenseResult<R>,
    ) -> QbdtResult<R> {
        self.execute_as_state_vector(&[Capability::Parity], |engine| {
            let parity = engine
                .as_parity()
                .ok_or(QbdtError::MissingCapability(Capability::Parity))?;
            Ok(op(parity)?)
        })
    }

    /// Overwrite one amplitude. The caller is responsible for the norm.
    pub fn set_amplitude(&mut self, perm: BitCapInt, amp: Complex64) -> QbdtResult<()> {
        check_perm(perm, self.qubit_count())?;
        let native = to_native(perm, self.qubit_count())?;
        self.execute_as_state_vector(&[], |engine| Ok(engine.set_amplitude(native, amp)?))
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    /// Validate an arithmetic register; `false` means it is empty and the
    /// operator has nothing to do.
    fn arith_range(&self, start: usize, length: usize) -> QbdtResult<bool> {
        self.check_range(start, length)?;
        Ok(length > 0)
    }

    /// Everything that can reject a carry operator, checked before the
    /// carry qubit is measured.
    fn check_carry_op(&self, start: usize, length: usize, carry_index: usize) -> QbdtResult<()> {
        self.require_capabilities(&[Capability::Alu])?;
        self.check_dense_width()?;
        self.check_range(start, length)?;
        self.check_qubit(carry_index)?;
        if (start..start + length).contains(&carry_index) {
            return Err(QbdtError::DuplicateQubit(carry_index));
        }
        Ok(())
    }

    /// Measure the carry qubit and clear it. Returns whether it was set.
    fn take_carry(&mut self, carry_index: usize) -> QbdtResult<bool> {
        let carry = self.m(carry_index)?;
        if carry {
            self.x(carry_index)?;
        }
        Ok(carry)
    }

    /// Add `to_add` to the register `(start, length)`, modulo `2^length`.
    pub fn inc(&mut self, to_add: BitCapInt, start: usize, length: usize) -> QbdtResult<()> {
        if !self.arith_range(start, length)? {
            return Ok(());
        }
        let to_add = to_native(to_add & pow2_mask(length), length)?;
        self.with_alu(|alu| alu.inc(to_add, start, length))
    }

    /// Subtract `to_sub` from the register, modulo `2^length`.
    pub fn dec(&mut self, to_sub: BitCapInt, start: usize, length: usize) -> QbdtResult<()> {
        self.inc(to_sub.wrapping_neg(), start, length)
    }

    /// [`Qbdt::inc`] where every control qubit is set.
    pub fn cinc(
        &mut self,
        to_add: BitCapInt,
        start: usize,
        length: usize,
        controls: &[usize],
    ) -> QbdtResult<()> {
        if controls.is_empty() {
            return self.inc(to_add, start, length);
        }
        if !self.arith_range(start, length)? {
            return Ok(());
        }
        let to_add = to_native(to_add & pow2_mask(length), length)?;
        self.with_alu(|alu| alu.cinc(to_add, start, length, controls))
    }

    /// [`Qbdt::dec`] where every control qubit is set.
    pub fn cdec(
        &mut self,
        to_sub: BitCapInt,
        start: usize,
        length: usize,
        controls: &[usize],
    ) -> QbdtResult<()> {
        self.cinc(to_sub.wrapping_neg(), start, length, controls)
    }

    /// Add with carry. The carry qubit is measured first and folded into
    /// the addend; afterwards it holds the carry out.
    pub fn incc(
        &mut self,
        to_add: BitCapInt,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> QbdtResult<()> {
        self.check_carry_op(start, length, carry_index)?;
        if length == 0 {
            return Ok(());
        }
        let mut to_add = to_add & pow2_mask(length);
        if self.take_carry(carry_index)? {
            to_add += 1;
        }
        self.incdecc(to_add, start, length, carry_index)
    }

    /// Subtract with borrow. A set carry qubit means "no borrow" on entry
    /// and on exit.
    pub fn decc(
        &mut self,
        to_sub: BitCapInt,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> QbdtResult<()> {
        self.check_carry_op(start, length, carry_index)?;
        if length == 0 {
            return Ok(());
        }
        let mut to_sub = to_sub & pow2_mask(length);
        if !self.take_carry(carry_index)? {
            to_sub += 1;
        }
        let inverse = pow2_mask(length).wrapping_sub(to_sub).wrapping_add(1);
        self.incdecc(inverse, start, length, carry_index)
    }

    /// Add `to_add` to the register extended by `carry_index` as its top
    /// bit, without measuring anything.
    pub fn incdecc(
        &mut self,
        to_add: BitCapInt,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> QbdtResult<()> {
        if !self.arith_range(start, length)? {
            return Ok(());
        }
        let to_add = to_native(to_add & pow2_mask(length + 1), length + 1)?;
        self.with_alu(|alu| alu.incdecc(to_add, start, length, carry_index))
    }

    /// Signed add; states that overflow pick up a phase flip when the
    /// `overflow_index` qubit is set.
    pub fn incs(
        &mut self,
        to_add: BitCapInt,
        start: usize,
        length: usize,
        overflow_index: usize,
    ) -> QbdtResult<()> {
        if !self.arith_range(start, length)? {
            return Ok(());
        }
        let to_add = to_native(to_add & pow2_mask(length), length)?;
        self.with_alu(|alu| alu.incs(to_add, start, length, overflow_index))
    }

    /// Signed subtract, with the overflow phase rule of [`Qbdt::incs`].
    pub fn decs(
        &mut self,
        to_sub: BitCapInt,
        start: usize,
        length: usize,
        overflow_index: usize,
    ) -> QbdtResult<()> {
        self.incs(to_sub.wrapping_neg(), start, length, overflow_index)
    }

    /// Signed add on the carry-extended register, without measuring the
    /// carry. Overflowing states flip phase, only where `overflow_index`
    /// is set when one is given.
    pub fn incdecsc(
        &mut self,
        to_add: BitCapInt,
        start: usize,
        length: usize,
        overflow_index: Option<usize>,
        carry_index: usize,
    ) -> QbdtResult<()> {
        if !self.arith_range(start, length)? {
            return Ok(());
        }
        let to_add = to_native(to_add & pow2_mask(length + 1), length + 1)?;
        self.with_alu(|alu| alu.incdecsc(to_add, start, length, overflow_index, carry_index))
    }

    /// Signed add with carry. The carry qubit is measured and folded into
    /// the addend, as in [`Qbdt::incc`].
    pub fn incsc(
        &mut self,
        to_add: BitCapInt,
        start: usize,
        length: usize,
        overflow_index: Option<usize>,
        carry_index: usize,
    ) -> QbdtResult<()> {
        self.check_carry_op(start, length, carry_index)?;
        if let Some(o) = overflow_index {
            self.check_qubit(o)?;
        }
        if length == 0 {
            return Ok(());
        }
        let mut to_add = to_add & pow2_mask(length);
        if self.take_carry(carry_index)? {
            to_add += 1;
        }
        self.incdecsc(to_add, start, length, overflow_index, carry_index)
    }

    /// Signed subtract with borrow, using the carry convention of [`Qbdt::decc`].
    pub fn decsc(
        &mut self,
        to_sub: BitCapInt,
        start: usize,
        length: usize,
        overflow_index: Option<usize>,
        carry_index: usize,
    ) -> QbdtResult<()> {
        self.check_carry_op(start, length, carry_index)?;
        if let Some(o) = overflow_index {
            self.check_qubit(o)?;
        }
        if length == 0 {
            return Ok(());
        }
        let mut to_sub = to_sub & pow2_mask(length);
        if !self.take_carry(carry_index)? {
            to_sub += 1;
        }
        let inverse = pow2_mask(length).wrapping_sub(to_sub).wrapping_add(1);
        self.incdecsc(inverse, start, length, overflow_index, carry_index)
    }

    /// Add a decimal integer to a binary-coded-decimal register of
    /// `length / 4` digits. States holding a nibble above 9 are left alone.
    pub fn incbcd(&mut self, to_add: BitCapInt, start: usize, length: usize) -> QbdtResult<()> {
        if !self.arith_range(start, length)? {
            return Ok(());
        }
        let to_add = to_native(to_add % bcd_modulus(length), length)?;
        self.with_alu(|alu| alu.incbcd(to_add, start, length))
    }

    /// Subtract a decimal integer from a BCD register.
    pub fn decbcd(&mut self, to_sub: BitCapInt, start: usize, length: usize) -> QbdtResult<()> {
        self.check_range(start, length)?;
        let modulus = bcd_modulus(length);
        self.incbcd(modulus - to_sub % modulus, start, length)
    }

    /// BCD add on the register extended by a decimal carry digit, without
    /// measuring the carry.
    pub fn incdecbcdc(
        &mut self,
        to_add: BitCapInt,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> QbdtResult<()> {
        if !self.arith_range(start, length)? {
            return Ok(());
        }
        let to_add = to_native(to_add % (2 * bcd_modulus(length)), length + 1)?;
        self.with_alu(|alu| alu.incdecbcdc(to_add, start, length, carry_index))
    }

    /// BCD add with carry.
    pub fn incbcdc(
        &mut self,
        to_add: BitCapInt,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> QbdtResult<()> {
        self.check_carry_op(start, length, carry_index)?;
        if length == 0 {
            return Ok(());
        }
        let mut to_add = to_add % bcd_modulus(length);
        if self.take_carry(carry_index)? {
            to_add += 1;
        }
        self.incdecbcdc(to_add, start, length, carry_index)
    }

    /// BCD subtract with borrow. A set carry qubit means "no borrow".
    pub fn decbcdc(
        &mut self,
        to_sub: BitCapInt,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> QbdtResult<()> {
        self.check_carry_op(start, length, carry_index)?;
        if length == 0 {
            return Ok(());
        }
        let modulus = bcd_modulus(length);
        let mut to_sub = to_sub % modulus;
        if !self.take_carry(carry_index)? {
            to_sub += 1;
        }
        self.incdecbcdc(modulus - to_sub % modulus, start, length, carry_index)
    }

    /// Multiply in place, carrying the high half into `carry_start`.
    pub fn mul(
        &mut self,
        to_mul: BitCapInt,
        in_out_start: usize,
        carry_start: usize,
        length: usize,
    ) -> QbdtResult<()> {
        self.cmul(to_mul, in_out_start, carry_start, length, &[])
    }

    /// Inverse of [`Qbdt::mul`].
    pub fn div(
        &mut self,
        to_div: BitCapInt,
        in_out_start: usize,
        carry_start: usize,
        length: usize,
    ) -> QbdtResult<()> {
        self.cdiv(to_div, in_out_start, carry_start, length, &[])
    }

    /// [`Qbdt::mul`] where every control qubit is set.
    pub fn cmul(
        &mut self,
        to_mul: BitCapInt,
        in_out_start: usize,
        carry_start: usize,
        length: usize,
        controls: &[usize],
    ) -> QbdtResult<()> {
        if !self.arith_range(in_out_start, length)? {
            return Ok(());
        }
        let to_mul = to_native(to_mul, length)?;
        if controls.is_empty() {
            return self.with_alu(|alu| alu.mul(to_mul, in_out_start, carry_start, length));
        }
        self.with_alu(|alu| alu.cmul(to_mul, in_out_start, carry_start, length, controls))
    }

    /// [`Qbdt::div`] where every control qubit is set.
    pub fn cdiv(
        &mut self,
        to_div: BitCapInt,
        in_out_start: usize,
        carry_start: usize,
        length: usize,
        controls: &[usize],
    ) -> QbdtResult<()> {
        if !self.arith_range(in_out_start, length)? {
            return Ok(());
        }
        let to_div = to_native(to_div, length)?;
        if controls.is_empty() {
            return self.with_alu(|alu| alu.div(to_div, in_out_start, carry_start, length));
        }
        self.with_alu(|alu| alu.cdiv(to_div, in_out_start, carry_start, length, controls))
    }

    /// `out ^= (in * to_mul) mod mod_n`.
    pub fn mul_mod_n_out(
        &mut self,
        to_mul: BitCapInt,
        mod_n: BitCapInt,
        in_start: usize,
        out_start: usize,
        length: usize,
    ) -> QbdtResult<()> {
        if !self.arith_range(in_start, length)? {
            return Ok(());
        }
        let (to_mul, mod_n) = (to_native(to_mul, length)?, to_native(mod_n, length)?);
        self.with_alu(|alu| alu.mul_mod_n_out(to_mul, mod_n, in_start, out_start, length))
    }

    /// Inverse of [`Qbdt::mul_mod_n_out`].
    pub fn imul_mod_n_out(
        &mut self,
        to_mul: BitCapInt,
        mod_n: BitCapInt,
        in_start: usize,
        out_start: usize,
        length: usize,
    ) -> QbdtResult<()> {
        if !self.arith_range(in_start, length)? {
            return Ok(());
        }
        let (to_mul, mod_n) = (to_native(to_mul, length)?, to_native(mod_n, length)?);
        self.with_alu(|alu| alu.imul_mod_n_out(to_mul, mod_n, in_start, out_start, length))
    }

    /// `out ^= base^in mod mod_n`.
    pub fn pow_mod_n_out(
        &mut self,
        base: BitCapInt,
        mod_n: BitCapInt,
        in_start: usize,
        out_start: usize,
        length: usize,
    ) -> QbdtResult<()> {
        if !self.arith_range(in_start, length)? {
            return Ok(());
        }
        let (base, mod_n) = (to_native(base, length)?, to_native(mod_n, length)?);
        self.with_alu(|alu| alu.pow_mod_n_out(base, mod_n, in_start, out_start, length))
    }

    /// [`Qbdt::mul_mod_n_out`] where every control qubit is set.
    pub fn cmul_mod_n_out(
        &mut self,
        to_mul: BitCapInt,
        mod_n: BitCapInt,
        in_start: usize,
        out_start: usize,
        length: usize,
        controls: &[usize],
    ) -> QbdtResult<()> {
        if !self.arith_range(in_start, length)? {
            return Ok(());
        }
        let (to_mul, mod_n) = (to_native(to_mul, length)?, to_native(mod_n, length)?);
        self.with_alu(|alu| {
            alu.cmul_mod_n_out(to_mul, mod_n, in_start, out_start, length, controls)
        })
    }

    /// [`Qbdt::imul_mod_n_out`] where every control qubit is set.
    pub fn cimul_mod_n_out(
        &mut self,
        to_mul: BitCapInt,
        mod_n: BitCapInt,
        in_start: usize,
        out_start: usize,
        length: usize,
        controls: &[usize],
    ) -> QbdtResult<()> {
        if !self.arith_range(in_start, length)? {
            return Ok(());
        }
        let (to_mul, mod_n) = (to_native(to_mul, length)?, to_native(mod_n, length)?);
        self.with_alu(|alu| {
            alu.cimul_mod_n_out(to_mul, mod_n, in_start, out_start, length, controls)
        })
    }

    /// [`Qbdt::pow_mod_n_out`] where every control qubit is set.
    pub fn cpow_mod_n_out(
        &mut self,
        base: BitCapInt,
        mod_n: BitCapInt,
        in_start: usize,
        out_start: usize,
        length: usize,
        controls: &[usize],
    ) -> QbdtResult<()> {
        if !self.arith_range(in_start, length)? {
            return Ok(());
        }
        let (base, mod_n) = (to_native(base, length)?, to_native(mod_n, length)?);
        self.with_alu(|alu| alu.cpow_mod_n_out(base, mod_n, in_start, out_start, length, controls))
    }

    /// Negate every state whose register value is below `greater_perm`.
    pub fn phase_flip_if_less(
        &mut self,
        greater_perm: BitCapInt,
        start: usize,
        length: usize,
    ) -> QbdtResult<()> {
        self.check_range(start, length)?;
        let greater_perm = to_native(greater_perm, length)?;
        self.with_alu(|alu| alu.phase_flip_if_less(greater_perm, start, length))
    }

    /// [`Qbdt::phase_flip_if_less`] on states with `flag_index` set.
    pub fn cphase_flip_if_less(
        &mut self,
        greater_perm: BitCapInt,
        start: usize,
        length: usize,
        flag_index: usize,
    ) -> QbdtResult<()> {
        self.check_range(start, length)?;
        let greater_perm = to_native(greater_perm, length)?;
        self.with_alu(|alu| alu.cphase_flip_if_less(greater_perm, start, length, flag_index))
    }

    /// XOR `values[index]` into the value register and return the value
    /// register's expectation. With `reset_value` the value register is
    /// first collapsed and cleared.
    pub fn indexed_lda(
        &mut self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        values: &[u8],
        reset_value: bool,
    ) -> QbdtResult<f64> {
        self.check_indexed(index_start, index_length, value_start, value_length, values)?;
        if reset_value {
            self.set_reg(value_start, value_length, 0)?;
        }
        self.with_alu(|alu| {
            alu.indexed_lda(index_start, index_length, value_start, value_length, values)
        })
    }

    /// Add `values[index]` plus the measured carry into the value
    /// register; the carry qubit receives the carry out. Returns the value
    /// register's expectation.
    pub fn indexed_adc(
        &mut self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        carry_index: usize,
        values: &[u8],
    ) -> QbdtResult<f64> {
        self.check_indexed(index_start, index_length, value_start, value_length, values)?;
        self.with_alu(|alu| {
            alu.indexed_adc(index_start, index_length, value_start, value_length, carry_index, values)
        })
    }

    /// Subtract `values[index]` with borrow. A set carry qubit means "no
    /// borrow", on entry and on exit.
    pub fn indexed_sbc(
        &mut self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        carry_index: usize,
        values: &[u8],
    ) -> QbdtResult<f64> {
        self.check_indexed(index_start, index_length, value_start, value_length, values)?;
        self.with_alu(|alu| {
            alu.indexed_sbc(index_start, index_length, value_start, value_length, carry_index, values)
        })
    }

    /// Checks shared by the table-lookup operators, run before any of them
    /// collapses a register.
    fn check_indexed(
        &self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        values: &[u8],
    ) -> QbdtResult<()> {
        self.require_capabilities(&[Capability::Alu])?;
        self.check_dense_width()?;
        self.check_range(index_start, index_length)?;
        self.check_range(value_start, value_length)?;
        let overlap = index_start.max(value_start);
        if overlap < (index_start + index_length).min(value_start + value_length) {
            return Err(QbdtError::DuplicateQubit(overlap));
        }
        let needed = (1usize << index_length) * value_length.div_ceil(8);
        if values.len() < needed {
            return Err(DenseError::InvalidArgument(format!(
                "lookup table needs {needed} bytes, got {}",
                values.len()
            ))
            .into());
        }
        Ok(())
    }

    /// Replace register value `v` with `values[v]`.
    pub fn hash(&mut self, start: usize, length: usize, values: &[u8]) -> QbdtResult<()> {
        if !self.arith_range(start, length)? {
            return Ok(());
        }
        self.with_alu(|alu| alu.hash(start, length, values))
    }

    // =========================================================================
    // Parity rotations
    // =========================================================================

    /// Phase `e^{i angle}` on states where the masked qubits have odd
    /// parity and `e^{-i angle}` where they have even parity. An empty
    /// mask does nothing.
    pub fn uniform_parity_rz(&mut self, mask: BitCapInt, angle: f64) -> QbdtResult<()> {
        if mask == 0 {
            return Ok(());
        }
        self.check_qubit(log2(mask))?;
        if mask.is_power_of_two() {
            return self.mtrx(&parity_phase(angle), log2(mask));
        }
        let native = to_native(mask, self.qubit_count())?;
        self.with_parity(|parity| {
            parity.uniform_parity_rz(native, angle);
            Ok(())
        })
    }

    /// [`Qbdt::uniform_parity_rz`] where every control qubit is set.
    pub fn c_uniform_parity_rz(
        &mut self,
        controls: &[usize],
        mask: BitCapInt,
        angle: f64,
    ) -> QbdtResult<()> {
        if controls.is_empty() {
            return self.uniform_parity_rz(mask, angle);
        }
        if mask == 0 {
            return Ok(());
        }
        self.check_qubit(log2(mask))?;
        if mask.is_power_of_two() {
            let m = parity_phase(angle);
            return self.mc_phase(controls, m.data[0], m.data[3], log2(mask));
        }
        for &c in controls {
            self.check_qubit(c)?;
        }
        let native = to_native(mask, self.qubit_count())?;
        self.with_parity(|parity| {
            parity.c_uniform_parity_rz(controls, native, angle);
            Ok(())
        })
    }
}

/// `10^(length / 4)`: the number of values a BCD register can hold.
fn bcd_modulus(length: usize) -> BitCapInt {
    10u128.pow((length / 4) as u32)
}

fn parity_phase(angle: f64) -> Mtrx2 {
    Mtrx2::phase(
        Complex64::from_polar(1.0, -angle),
        Complex64::from_polar(1.0, angle),
    )
}

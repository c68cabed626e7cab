//! Arithmetic operators for [`StateVectorEngine`].
//!
//! Every operator is a permutation of basis states (optionally with a
//! sign), so each one is expressed as an index map fed to
//! `permute`/`gather`.

use num_complex::Complex64;

use crate::engine::{DenseAlu, DenseParity};
use crate::error::{DenseError, DenseResult};
use crate::statevector::{StateVectorEngine, get_reg, reg_mask};

impl StateVectorEngine {
    fn check_disjoint(&self, ranges: &[(usize, usize)]) -> DenseResult<()> {
        let mut seen = 0usize;
        for &(start, length) in ranges {
            self.check_range(start, length)?;
            let mask = reg_mask(start, length);
            if seen & mask != 0 {
                return Err(DenseError::InvalidArgument(format!(
                    "qubit range {start}..{} overlaps another operand",
                    start + length
                )));
            }
            seen |= mask;
        }
        Ok(())
    }

    /// Mask of `controls`, none of which may fall inside `operands`.
    fn operand_controls(&self, controls: &[usize], operands: usize) -> DenseResult<usize> {
        let ctrl_mask = self.control_mask(controls)?;
        if ctrl_mask & operands != 0 {
            return Err(DenseError::InvalidArgument(
                "control qubit inside an operand register".into(),
            ));
        }
        Ok(ctrl_mask)
    }

    fn check_bcd(&self, start: usize, length: usize) -> DenseResult<usize> {
        self.check_range(start, length)?;
        if length % 4 != 0 {
            return Err(DenseError::InvalidArgument(format!(
                "BCD register length {length} is not a multiple of 4"
            )));
        }
        Ok(length / 4)
    }

    /// Expected integer value of the register `(start, length)`.
    fn register_expectation(&self, start: usize, length: usize) -> f64 {
        self.amplitudes
            .iter()
            .enumerate()
            .map(|(i, a)| a.norm_sqr() * get_reg(i, start, length) as f64)
            .sum()
    }

    /// Shared body of [`DenseAlu::indexed_adc`] and [`DenseAlu::indexed_sbc`].
    #[allow(clippy::too_many_arguments)]
    fn indexed_carry(
        &mut self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        carry_index: usize,
        values: &[u8],
        subtract: bool,
    ) -> DenseResult<f64> {
        self.check_disjoint(&[
            (index_start, index_length),
            (value_start, value_length),
            (carry_index, 1),
        ])?;
        let bytes = value_length.div_ceil(8);
        check_table(values, 1 << index_length, bytes)?;

        let carry = 1usize << carry_index;
        let carry_in = self.force_m_parity(carry, false, false)?;
        if carry_in {
            self.permute(|i| Some(i ^ carry));
        }

        let span = 1usize << value_length;
        let value_mask = span - 1;
        let value_bits = reg_mask(value_start, value_length);
        self.permute(|i| {
            if i & carry != 0 {
                return None;
            }
            let v = get_reg(i, value_start, value_length);
            let entry = table_entry(values, get_reg(i, index_start, index_length), bytes) & value_mask;
            let (out, carry_out) = if subtract {
                let sub = entry + usize::from(!carry_in);
                if v >= sub {
                    (v - sub, true)
                } else {
                    (v + span - sub, false)
                }
            } else {
                let sum = v + entry + usize::from(carry_in);
                (sum & value_mask, sum >= span)
            };
            let carry_bit = if carry_out { carry } else { 0 };
            Some((i & !value_bits) | (out << value_start) | carry_bit)
        });
        Ok(self.register_expectation(value_start, value_length))
    }

    fn mod_n_controls(
        &self,
        controls: &[usize],
        in_start: usize,
        out_start: usize,
        length: usize,
    ) -> DenseResult<usize> {
        self.check_disjoint(&[(in_start, length), (out_start, length)])?;
        self.operand_controls(controls, reg_mask(in_start, length) | reg_mask(out_start, length))
    }

    fn check_modulus(mod_n: usize, length: usize) -> DenseResult<()> {
        if mod_n == 0 || mod_n > (1usize << length) {
            return Err(DenseError::InvalidArgument(format!(
                "modulus {mod_n} does not fit a {length}-qubit output register"
            )));
        }
        Ok(())
    }

    /// Shared body of the out-of-place modular operators: `value(in)` is
    /// XORed into a zeroed output register.
    fn mod_n_out<F>(
        &mut self,
        in_start: usize,
        out_start: usize,
        length: usize,
        ctrl_mask: usize,
        inverse: bool,
        value: F,
    ) -> DenseResult<()>
    where
        F: Fn(usize) -> usize,
    {
        self.check_disjoint(&[(in_start, length), (out_start, length)])?;
        let out_mask = reg_mask(out_start, length);
        let map = |i: usize| {
            if i & ctrl_mask != ctrl_mask {
                return Some(i);
            }
            if i & out_mask != 0 {
                return None;
            }
            Some(i | (value(get_reg(i, in_start, length)) << out_start))
        };
        if inverse {
            self.gather(map);
        } else {
            self.permute(map);
        }
        Ok(())
    }

    fn mul_div(
        &mut self,
        to_mul: usize,
        in_out_start: usize,
        carry_start: usize,
        length: usize,
        controls: &[usize],
        inverse: bool,
    ) -> DenseResult<()> {
        self.check_disjoint(&[(in_out_start, length), (carry_start, length)])?;
        if to_mul == 0 {
            return Err(DenseError::InvalidArgument(
                "multiplication by zero is not invertible".into(),
            ));
        }
        let in_out_mask = reg_mask(in_out_start, length);
        let carry_mask = reg_mask(carry_start, length);
        let ctrl_mask = self.operand_controls(controls, in_out_mask | carry_mask)?;
        let low_mask = (1u128 << length) - 1;
        let map = |i: usize| {
            if i & ctrl_mask != ctrl_mask {
                return Some(i);
            }
            if i & carry_mask != 0 {
                return None;
            }
            let product = get_reg(i, in_out_start, length) as u128 * to_mul as u128;
            let low = (product & low_mask) as usize;
            let high = ((product >> length) & low_mask) as usize;
            Some((i & !(in_out_mask | carry_mask)) | (low << in_out_start) | (high << carry_start))
        };
        if inverse {
            self.gather(map);
        } else {
            self.permute(map);
        }
        Ok(())
    }
}

fn mul_mod(a: usize, b: usize, n: usize) -> usize {
    ((a as u128 * b as u128) % n as u128) as usize
}

fn pow_mod(base: usize, mut exp: usize, n: usize) -> usize {
    let mut result = 1 % n;
    let mut b = base % n;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, b, n);
        }
        b = mul_mod(b, b, n);
        exp >>= 1;
    }
    result
}

/// Two's-complement overflow of `a + b = sum` at sign bit `sign`.
fn signed_overflow(a: usize, b: usize, sum: usize, sign: usize) -> bool {
    (!(a ^ b) & (a ^ sum) & sign) != 0
}

/// Decimal value of a BCD register, or `None` when a nibble exceeds 9.
fn bcd_decode(raw: usize, digits: usize) -> Option<usize> {
    (0..digits).rev().try_fold(0usize, |acc, d| {
        let nibble = (raw >> (4 * d)) & 0xF;
        (nibble <= 9).then_some(acc * 10 + nibble)
    })
}

fn bcd_encode(mut value: usize, digits: usize) -> usize {
    let mut raw = 0;
    for d in 0..digits {
        raw |= (value % 10) << (4 * d);
        value /= 10;
    }
    raw
}

/// Little-endian table entry `index` of width `bytes`.
fn table_entry(values: &[u8], index: usize, bytes: usize) -> usize {
    values[index * bytes..(index + 1) * bytes]
        .iter()
        .rev()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize)
}

fn check_table(values: &[u8], entries: usize, bytes: usize) -> DenseResult<()> {
    if values.len() < entries * bytes {
        return Err(DenseError::InvalidArgument(format!(
            "lookup table needs {} bytes, got {}",
            entries * bytes,
            values.len()
        )));
    }
    Ok(())
}

impl DenseAlu for StateVectorEngine {
    fn inc(&mut self, to_add: usize, start: usize, length: usize) -> DenseResult<()> {
        self.cinc(to_add, start, length, &[])
    }

    fn cinc(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        controls: &[usize],
    ) -> DenseResult<()> {
        self.check_range(start, length)?;
        let mask = reg_mask(start, length);
        let ctrl_mask = self.operand_controls(controls, mask)?;
        let len_mask = (1usize << length) - 1;
        self.permute(|i| {
            if i & ctrl_mask != ctrl_mask {
                return Some(i);
            }
            let sum = get_reg(i, start, length).wrapping_add(to_add) & len_mask;
            Some((i & !mask) | (sum << start))
        });
        Ok(())
    }

    fn incdecc(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> DenseResult<()> {
        self.check_disjoint(&[(start, length), (carry_index, 1)])?;
        let mask = reg_mask(start, length);
        let carry = 1usize << carry_index;
        let wide_mask = (1usize << (length + 1)) - 1;
        let len_mask = (1usize << length) - 1;
        self.permute(|i| {
            let carry_in = usize::from(i & carry != 0);
            let wide = get_reg(i, start, length) | (carry_in << length);
            let sum = wide.wrapping_add(to_add) & wide_mask;
            let carry_out = (sum >> length) & 1;
            Some((i & !(mask | carry)) | ((sum & len_mask) << start) | (carry_out << carry_index))
        });
        Ok(())
    }

    fn incs(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        overflow_index: usize,
    ) -> DenseResult<()> {
        self.check_disjoint(&[(start, length), (overflow_index, 1)])?;
        let mask = reg_mask(start, length);
        let overflow = 1usize << overflow_index;
        let len_mask = (1usize << length) - 1;
        let sign = 1usize << (length - 1);
        let addend = to_add & len_mask;
        let mut out = vec![Complex64::new(0.0, 0.0); self.amplitudes.len()];
        for (i, amp) in self.amplitudes.iter().enumerate() {
            let value = get_reg(i, start, length);
            let sum = (value + addend) & len_mask;
            let overflowed = signed_overflow(value, addend, sum, sign);
            let j = (i & !mask) | (sum << start);
            out[j] = if overflowed && i & overflow != 0 {
                -*amp
            } else {
                *amp
            };
        }
        self.amplitudes = out;
        Ok(())
    }

    fn incdecsc(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        overflow_index: Option<usize>,
        carry_index: usize,
    ) -> DenseResult<()> {
        match overflow_index {
            Some(o) => self.check_disjoint(&[(start, length), (carry_index, 1), (o, 1)])?,
            None => self.check_disjoint(&[(start, length), (carry_index, 1)])?,
        }
        let mask = reg_mask(start, length);
        let carry = 1usize << carry_index;
        let flag = overflow_index.map_or(0, |o| 1usize << o);
        let wide_mask = (1usize << (length + 1)) - 1;
        let len_mask = (1usize << length) - 1;
        let sign = 1usize << (length - 1);
        let addend = to_add & len_mask;
        let mut out = vec![Complex64::new(0.0, 0.0); self.amplitudes.len()];
        for (i, amp) in self.amplitudes.iter().enumerate() {
            let value = get_reg(i, start, length);
            let wide = value | (usize::from(i & carry != 0) << length);
            let sum = wide.wrapping_add(to_add) & wide_mask;
            let low = sum & len_mask;
            let j = (i & !(mask | carry)) | (low << start) | (((sum >> length) & 1) << carry_index);
            out[j] = if signed_overflow(value, addend, low, sign) && i & flag == flag {
                -*amp
            } else {
                *amp
            };
        }
        self.amplitudes = out;
        Ok(())
    }

    fn incbcd(&mut self, to_add: usize, start: usize, length: usize) -> DenseResult<()> {
        let digits = self.check_bcd(start, length)?;
        let modulus = 10usize.pow(digits as u32);
        let to_add = to_add % modulus;
        let mask = reg_mask(start, length);
        self.permute(|i| match bcd_decode(get_reg(i, start, length), digits) {
            Some(v) => Some((i & !mask) | (bcd_encode((v + to_add) % modulus, digits) << start)),
            None => Some(i),
        });
        Ok(())
    }

    fn incdecbcdc(
        &mut self,
        to_add: usize,
        start: usize,
        length: usize,
        carry_index: usize,
    ) -> DenseResult<()> {
        let digits = self.check_bcd(start, length)?;
        self.check_disjoint(&[(start, length), (carry_index, 1)])?;
        let modulus = 10usize.pow(digits as u32);
        let span = 2 * modulus;
        let to_add = to_add % span;
        let mask = reg_mask(start, length);
        let carry = 1usize << carry_index;
        self.permute(|i| {
            let Some(v) = bcd_decode(get_reg(i, start, length), digits) else {
                return Some(i);
            };
            let wide = v + if i & carry != 0 { modulus } else { 0 };
            let sum = (wide + to_add) % span;
            let carry_bit = if sum >= modulus { carry } else { 0 };
            Some((i & !(mask | carry)) | (bcd_encode(sum % modulus, digits) << start) | carry_bit)
        });
        Ok(())
    }

    fn mul(
        &mut self,
        to_mul: usize,
        in_out_start: usize,
        carry_start: usize,
        length: usize,
    ) -> DenseResult<()> {
        self.mul_div(to_mul, in_out_start, carry_start, length, &[], false)
    }

    fn div(
        &mut self,
        to_div: usize,
        in_out_start: usize,
        carry_start: usize,
        length: usize,
    ) -> DenseResult<()> {
        self.mul_div(to_div, in_out_start, carry_start, length, &[], true)
    }

    fn cmul(
        &mut self,
        to_mul: usize,
        in_out_start: usize,
        carry_start: usize,
        length: usize,
        controls: &[usize],
    ) -> DenseResult<()> {
        self.mul_div(to_mul, in_out_start, carry_start, length, controls, false)
    }

    fn cdiv(
        &mut self,
        to_div: usize,
        in_out_start: usize,
        carry_start: usize,
        length: usize,
        controls: &[usize],
    ) -> DenseResult<()> {
        self.mul_div(to_div, in_out_start, carry_start, length, controls, true)
    }

    fn mul_mod_n_out(
        &mut self,
        to_mul: usize,
        mod_n: usize,
        in_start: usize,
        out_start: usize,
        length: usize,
    ) -> DenseResult<()> {
        Self::check_modulus(mod_n, length)?;
        self.mod_n_out(in_start, out_start, length, 0, false, |v| {
            mul_mod(v, to_mul, mod_n)
        })
    }

    fn imul_mod_n_out(
        &mut self,
        to_mul: usize,
        mod_n: usize,
        in_start: usize,
        out_start: usize,
        length: usize,
    ) -> DenseResult<()> {
        Self::check_modulus(mod_n, length)?;
        self.mod_n_out(in_start, out_start, length, 0, true, |v| {
            mul_mod(v, to_mul, mod_n)
        })
    }

    fn pow_mod_n_out(
        &mut self,
        base: usize,
        mod_n: usize,
        in_start: usize,
        out_start: usize,
        length: usize,
    ) -> DenseResult<()> {
        Self::check_modulus(mod_n, length)?;
        self.mod_n_out(in_start, out_start, length, 0, false, |v| {
            pow_mod(base, v, mod_n)
        })
    }

    fn cmul_mod_n_out(
        &mut self,
        to_mul: usize,
        mod_n: usize,
        in_start: usize,
        out_start: usize,
        length: usize,
        controls: &[usize],
    ) -> DenseResult<()> {
        Self::check_modulus(mod_n, length)?;
        let ctrl_mask = self.mod_n_controls(controls, in_start, out_start, length)?;
        self.mod_n_out(in_start, out_start, length, ctrl_mask, false, |v| {
            mul_mod(v, to_mul, mod_n)
        })
    }

    fn cimul_mod_n_out(
        &mut self,
        to_mul: usize,
        mod_n: usize,
        in_start: usize,
        out_start: usize,
        length: usize,
        controls: &[usize],
    ) -> DenseResult<()> {
        Self::check_modulus(mod_n, length)?;
        let ctrl_mask = self.mod_n_controls(controls, in_start, out_start, length)?;
        self.mod_n_out(in_start, out_start, length, ctrl_mask, true, |v| {
            mul_mod(v, to_mul, mod_n)
        })
    }

    fn cpow_mod_n_out(
        &mut self,
        base: usize,
        mod_n: usize,
        in_start: usize,
        out_start: usize,
        length: usize,
        controls: &[usize],
    ) -> DenseResult<()> {
        Self::check_modulus(mod_n, length)?;
        let ctrl_mask = self.mod_n_controls(controls, in_start, out_start, length)?;
        self.mod_n_out(in_start, out_start, length, ctrl_mask, false, |v| {
            pow_mod(base, v, mod_n)
        })
    }

    fn phase_flip_if_less(
        &mut self,
        greater_perm: usize,
        start: usize,
        length: usize,
    ) -> DenseResult<()> {
        self.check_range(start, length)?;
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if get_reg(i, start, length) < greater_perm {
                *amp = -*amp;
            }
        }
        Ok(())
    }

    fn cphase_flip_if_less(
        &mut self,
        greater_perm: usize,
        start: usize,
        length: usize,
        flag_index: usize,
    ) -> DenseResult<()> {
        self.check_disjoint(&[(start, length), (flag_index, 1)])?;
        let flag = 1usize << flag_index;
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if i & flag != 0 && get_reg(i, start, length) < greater_perm {
                *amp = -*amp;
            }
        }
        Ok(())
    }

    fn indexed_lda(
        &mut self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        values: &[u8],
    ) -> DenseResult<f64> {
        self.check_disjoint(&[(index_start, index_length), (value_start, value_length)])?;
        let bytes = value_length.div_ceil(8);
        check_table(values, 1 << index_length, bytes)?;
        let value_mask = (1usize << value_length) - 1;
        self.permute(|i| {
            let entry = table_entry(values, get_reg(i, index_start, index_length), bytes);
            Some(i ^ ((entry & value_mask) << value_start))
        });
        Ok(self.register_expectation(value_start, value_length))
    }

    fn indexed_adc(
        &mut self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        carry_index: usize,
        values: &[u8],
    ) -> DenseResult<f64> {
        self.indexed_carry(
            index_start,
            index_length,
            value_start,
            value_length,
            carry_index,
            values,
            false,
        )
    }

    fn indexed_sbc(
        &mut self,
        index_start: usize,
        index_length: usize,
        value_start: usize,
        value_length: usize,
        carry_index: usize,
        values: &[u8],
    ) -> DenseResult<f64> {
        self.indexed_carry(
            index_start,
            index_length,
            value_start,
            value_length,
            carry_index,
            values,
            true,
        )
    }

    fn hash(&mut self, start: usize, length: usize, values: &[u8]) -> DenseResult<()> {
        self.check_range(start, length)?;
        let bytes = length.div_ceil(8);
        let entries = 1usize << length;
        check_table(values, entries, bytes)?;
        let table: Vec<usize> = (0..entries)
            .map(|v| table_entry(values, v, bytes))
            .collect();
        let mut hit = vec![false; entries];
        for &t in &table {
            if t >= entries || hit[t] {
                return Err(DenseError::NonInvertible(
                    "hash table is not a permutation of the register values".into(),
                ));
            }
            hit[t] = true;
        }
        let mask = reg_mask(start, length);
        self.permute(|i| Some((i & !mask) | (table[get_reg(i, start, length)] << start)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DenseEngine;

    fn basis(num_qubits: usize, perm: usize) -> StateVectorEngine {
        let mut sv = StateVectorEngine::with_seed(num_qubits, 28, 0).unwrap();
        sv.set_amplitude(0, Complex64::new(0.0, 0.0)).unwrap();
        sv.set_amplitude(perm, Complex64::new(1.0, 0.0)).unwrap();
        sv
    }

    fn occupied(sv: &StateVectorEngine) -> usize {
        sv.amplitudes()
            .iter()
            .position(|a| a.norm_sqr() > 0.5)
            .unwrap()
    }

    #[test]
    fn test_inc_wraps() {
        let mut sv = basis(3, 0b110);
        sv.inc(3, 0, 3).unwrap();
        assert_eq!(occupied(&sv), 0b001);
    }

    #[test]
    fn test_cinc_respects_control() {
        let mut sv = basis(3, 0b001);
        sv.cinc(1, 0, 2, &[2]).unwrap();
        assert_eq!(occupied(&sv), 0b001);

        let mut sv = basis(3, 0b101);
        sv.cinc(1, 0, 2, &[2]).unwrap();
        assert_eq!(occupied(&sv), 0b110);
    }

    #[test]
    fn test_incdecc_sets_carry() {
        let mut sv = basis(3, 0b011);
        sv.incdecc(1, 0, 2, 2).unwrap();
        assert_eq!(occupied(&sv), 0b100);
    }

    #[test]
    fn test_incs_flags_overflow_phase() {
        // 2-bit signed: 01 (+1) + 01 (+1) = 10 (-2) overflows.
        let mut sv = basis(3, 0b101);
        sv.incs(1, 0, 2, 2).unwrap();
        assert_eq!(occupied(&sv), 0b110);
        assert!((sv.amplitudes()[0b110] + Complex64::new(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_mul_then_div() {
        let mut sv = basis(4, 0b0011);
        sv.mul(3, 0, 2, 2).unwrap();
        // 3 * 3 = 9 = 0b1001: low 01, high 10.
        assert_eq!(occupied(&sv), 0b1001);
        sv.div(3, 0, 2, 2).unwrap();
        assert_eq!(occupied(&sv), 0b0011);
    }

    #[test]
    fn test_mul_by_zero_rejected() {
        let mut sv = basis(4, 0);
        assert!(matches!(
            sv.mul(0, 0, 2, 2),
            Err(DenseError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_mul_mod_n_out_and_inverse() {
        let mut sv = basis(6, 0b000_101);
        sv.mul_mod_n_out(4, 7, 0, 3, 3).unwrap();
        // 5 * 4 mod 7 = 6
        assert_eq!(occupied(&sv), 0b110_101);
        sv.imul_mod_n_out(4, 7, 0, 3, 3).unwrap();
        assert_eq!(occupied(&sv), 0b000_101);
    }

    #[test]
    fn test_pow_mod_n_out() {
        let mut sv = basis(6, 0b000_011);
        sv.pow_mod_n_out(2, 5, 0, 3, 3).unwrap();
        // 2^3 mod 5 = 3
        assert_eq!(occupied(&sv), 0b011_011);
    }

    #[test]
    fn test_phase_flip_if_less() {
        let mut sv = basis(2, 0b01);
        sv.phase_flip_if_less(2, 0, 2).unwrap();
        assert!((sv.amplitudes()[1] + Complex64::new(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_indexed_lda_loads_table() {
        let mut sv = basis(4, 0b0010);
        let table = [3u8, 1, 2, 0];
        let expectation = sv.indexed_lda(0, 2, 2, 2, &table).unwrap();
        assert_eq!(occupied(&sv), 0b1010);
        assert!((expectation - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_incdecsc_carry_and_overflow_phase() {
        // 2-bit signed 01 + 01 overflows into 10; carry stays clear.
        let mut sv = basis(4, 0b1001);
        sv.incdecsc(1, 0, 2, Some(3), 2).unwrap();
        assert_eq!(occupied(&sv), 0b1010);
        assert!((sv.amplitudes()[0b1010] + Complex64::new(1.0, 0.0)).norm() < 1e-12);

        // Without an overflow qubit every overflow flips phase.
        let mut sv = basis(3, 0b001);
        sv.incdecsc(1, 0, 2, None, 2).unwrap();
        assert!((sv.amplitudes()[0b010] + Complex64::new(1.0, 0.0)).norm() < 1e-12);

        // 11 + 01 carries out without signed overflow.
        let mut sv = basis(3, 0b011);
        sv.incdecsc(1, 0, 2, None, 2).unwrap();
        assert!((sv.amplitudes()[0b100] - Complex64::new(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_incbcd_adds_decimal_digits() {
        // 19 + 3 = 22
        let mut sv = basis(8, 0x19);
        sv.incbcd(3, 0, 8).unwrap();
        assert_eq!(occupied(&sv), 0x22);
        // 98 + 5 wraps to 03
        sv.incbcd(81, 0, 8).unwrap();
        assert_eq!(occupied(&sv), 0x03);
    }

    #[test]
    fn test_incbcd_skips_invalid_nibbles() {
        let mut sv = basis(4, 0xB);
        sv.incbcd(1, 0, 4).unwrap();
        assert_eq!(occupied(&sv), 0xB);
        assert!(matches!(
            sv.incbcd(1, 0, 3),
            Err(DenseError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_incdecbcdc_sets_decimal_carry() {
        // 9 + 1 = 10: digit 0, carry set.
        let mut sv = basis(5, 0x9);
        sv.incdecbcdc(1, 0, 4, 4).unwrap();
        assert_eq!(occupied(&sv), 0b1_0000);
    }

    #[test]
    fn test_cmul_cdiv_respect_controls() {
        let mut sv = basis(5, 0b0_0011);
        sv.cmul(3, 0, 2, 2, &[4]).unwrap();
        assert_eq!(occupied(&sv), 0b0_0011);

        let mut sv = basis(5, 0b1_0011);
        sv.cmul(3, 0, 2, 2, &[4]).unwrap();
        assert_eq!(occupied(&sv), 0b1_1001);
        sv.cdiv(3, 0, 2, 2, &[4]).unwrap();
        assert_eq!(occupied(&sv), 0b1_0011);

        assert!(matches!(
            sv.cmul(3, 0, 2, 2, &[1]),
            Err(DenseError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_controlled_mod_n_out() {
        // 2^3 mod 5 = 3 only when the control is set.
        let mut sv = basis(7, 0b0_000_011);
        sv.cpow_mod_n_out(2, 5, 0, 3, 3, &[6]).unwrap();
        assert_eq!(occupied(&sv), 0b0_000_011);

        let mut sv = basis(7, 0b1_000_011);
        sv.cpow_mod_n_out(2, 5, 0, 3, 3, &[6]).unwrap();
        assert_eq!(occupied(&sv), 0b1_011_011);

        let mut sv = basis(7, 0b1_000_101);
        sv.cmul_mod_n_out(4, 7, 0, 3, 3, &[6]).unwrap();
        sv.cimul_mod_n_out(4, 7, 0, 3, 3, &[6]).unwrap();
        assert_eq!(occupied(&sv), 0b1_000_101);
    }

    #[test]
    fn test_indexed_adc_and_sbc() {
        // index 1 -> entry 3; value 2 + 3 = 5, no carry.
        let table = [0u8, 3, 1, 2];
        let mut sv = basis(7, 0b0_010_01);
        let expectation = sv.indexed_adc(0, 2, 2, 3, 5, &table).unwrap();
        assert_eq!(occupied(&sv), 0b0_101_01);
        assert!((expectation - 5.0).abs() < 1e-12);

        // Carry in adds one more: 6 + 3 + 1 = 10 = 2 carry 1.
        let mut sv = basis(7, 0b1_110_01);
        sv.indexed_adc(0, 2, 2, 3, 5, &table).unwrap();
        assert_eq!(occupied(&sv), 0b1_010_01);

        // Carry set means no borrow: 5 - 3 = 2, carry stays set.
        let mut sv = basis(7, 0b1_101_01);
        sv.indexed_sbc(0, 2, 2, 3, 5, &table).unwrap();
        assert_eq!(occupied(&sv), 0b1_010_01);

        // Borrow in: 2 - 3 - 1 wraps to 6 and clears the carry.
        let mut sv = basis(7, 0b0_010_01);
        sv.indexed_sbc(0, 2, 2, 3, 5, &table).unwrap();
        assert_eq!(occupied(&sv), 0b0_110_01);
    }

    #[test]
    fn test_hash_requires_permutation() {
        let mut sv = basis(2, 0);
        assert!(matches!(
            sv.hash(0, 2, &[0, 0, 1, 2]),
            Err(DenseError::NonInvertible(_))
        ));
        sv.hash(0, 2, &[2, 3, 0, 1]).unwrap();
        assert_eq!(occupied(&sv), 2);
    }
}

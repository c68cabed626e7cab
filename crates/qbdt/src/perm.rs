//! Basis-state (permutation) indices.
//!
//! A permutation index addresses one basis state; bit `q` is the value of
//! qubit `q`. Registers are limited to 128 qubits of addressable width,
//! which is far beyond anything that can be materialized densely.

use crate::error::{QbdtError, QbdtResult};

/// Index of a basis state.
pub type BitCapInt = u128;

/// Number of qubits a [`BitCapInt`] can address.
pub const MAX_QUBITS: usize = BitCapInt::BITS as usize;

/// `2^exp`.
#[inline]
pub fn pow2(exp: usize) -> BitCapInt {
    1 << exp
}

/// `2^exp - 1`, valid for `exp == MAX_QUBITS`.
#[inline]
pub fn pow2_mask(exp: usize) -> BitCapInt {
    if exp >= MAX_QUBITS {
        BitCapInt::MAX
    } else {
        pow2(exp) - 1
    }
}

/// Whether bit `qubit` of `perm` is set.
#[inline]
pub fn select_bit(perm: BitCapInt, qubit: usize) -> bool {
    (perm >> qubit) & 1 == 1
}

/// Integer held by `length` bits of `perm` starting at `start`.
#[inline]
pub fn get_reg(perm: BitCapInt, start: usize, length: usize) -> BitCapInt {
    (perm >> start) & pow2_mask(length)
}

/// Floor of `log2(perm)`; zero for zero.
#[inline]
pub fn log2(perm: BitCapInt) -> usize {
    if perm == 0 {
        0
    } else {
        (MAX_QUBITS - 1) - perm.leading_zeros() as usize
    }
}

/// Narrow to a machine word for dense addressing.
pub fn to_native(perm: BitCapInt, qubit_count: usize) -> QbdtResult<usize> {
    usize::try_from(perm).map_err(|_| QbdtError::PermutationOutOfRange { perm, qubit_count })
}

/// Check `perm < 2^qubit_count`.
pub fn check_perm(perm: BitCapInt, qubit_count: usize) -> QbdtResult<()> {
    if qubit_count < MAX_QUBITS && perm >= pow2(qubit_count) {
        return Err(QbdtError::PermutationOutOfRange { perm, qubit_count });
    }
    Ok(())
}

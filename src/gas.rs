//! Gas accounting helpers (C2 + §4.4).
//!
//! The teacher inlines every gas deduction directly on `state.gas_left -=
//! cost; if state.gas_left < 0 { return Err(...) }` (see
//! `instructions/memory.rs`, `instructions/arithmetic.rs::exp`). This module
//! factors the handful of formulas that recur (memory expansion, copy cost,
//! EXP dynamic cost) into
//! named functions so they have one definition instead of being re-derived
//! at each call site, but keeps the teacher's "subtract, then check sign"
//! idiom as the deduction primitive (`GasMeter::deduct`).

use crate::common::ExecutionStatus;

/// Cold/warm access pricing (Berlin+, EIP-2929), per §4.4.
pub const COLD_ACCOUNT_ACCESS_COST: i64 = 2600;
pub const WARM_STORAGE_READ_COST: i64 = 100;
pub const ADDITIONAL_COLD_ACCOUNT_ACCESS_COST: i64 =
    COLD_ACCOUNT_ACCESS_COST - WARM_STORAGE_READ_COST;
pub const COLD_SLOAD_COST: i64 = 2100;
pub const ADDITIONAL_COLD_SLOAD_COST: i64 = COLD_SLOAD_COST - WARM_STORAGE_READ_COST;

/// A monotonically-decreasing gas budget (C2). Deductions that would drive
/// it negative fail with `OutOfGas` and never apply (§3's gas invariant).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasMeter {
    left: i64,
}

impl GasMeter {
    pub fn new(budget: i64) -> Self {
        Self { left: budget }
    }

    pub fn left(&self) -> i64 {
        self.left
    }

    /// Deduct `amount`. On underflow, `left` is left unmodified below zero
    /// is never observed by the caller: the meter still ends up negative
    /// internally only for the instant of the check, mirroring the
    /// teacher's `state.gas_left -= cost; if state.gas_left < 0 { .. }`.
    pub fn deduct(&mut self, amount: i64) -> Result<(), ExecutionStatus> {
        self.left -= amount;
        if self.left < 0 {
            return Err(ExecutionStatus::OutOfGas);
        }
        Ok(())
    }

    /// Credit gas back, used for the value-transfer call stipend (§4.6) and
    /// for subtracting a nested call's unused gas (a negative `deduct`).
    pub fn add(&mut self, amount: i64) {
        self.left += amount;
    }
}

/// Number of 32-byte words needed to hold `size_in_bytes`, rounded up.
#[inline]
pub fn num_words(size_in_bytes: usize) -> i64 {
    ((size_in_bytes as i64) + 31) / 32
}

/// Total (not incremental) memory cost for `w` words, per §4.4:
/// `w^2 / 512 + 3*w`.
#[inline]
pub fn memory_cost(words: i64) -> i64 {
    words * words / 512 + 3 * words
}

/// Incremental cost of growing memory from `current_words` to `new_words`.
#[inline]
pub fn memory_expansion_cost(current_words: i64, new_words: i64) -> i64 {
    memory_cost(new_words) - memory_cost(current_words)
}

/// `3 * ceil(size / 32)`, the copy surcharge for *COPY opcodes (§4.4).
#[inline]
pub fn copy_cost(size_in_bytes: usize) -> i64 {
    3 * num_words(size_in_bytes)
}

/// Length in bytes of `exponent`'s big-endian representation with leading
/// zero bytes stripped (0 for a zero exponent).
fn exponent_byte_length(exponent: &ethereum_types::U256) -> u32 {
    let mut buf = [0u8; 32];
    exponent.to_big_endian(&mut buf);
    buf.iter().skip_while(|&&b| b == 0).count() as u32
}

/// `EXP` dynamic cost: `10 + 50*N`, N = byte length of the exponent
/// (post-EIP-160, unconditionally in scope per §4.3/§4.4).
pub fn exp_dynamic_cost(exponent: &ethereum_types::U256) -> i64 {
    if exponent.is_zero() {
        return 0;
    }
    10 + 50 * exponent_byte_length(exponent) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::U256;

    #[test]
    fn deduct_below_zero_fails_and_reports_out_of_gas() {
        let mut gas = GasMeter::new(5);
        assert_eq!(gas.deduct(10), Err(ExecutionStatus::OutOfGas));
    }

    #[test]
    fn deduct_exact_leaves_zero() {
        let mut gas = GasMeter::new(5);
        assert!(gas.deduct(5).is_ok());
        assert_eq!(gas.left(), 0);
    }

    #[test]
    fn memory_expansion_to_64_bytes_costs_6() {
        // Two words, starting from empty memory: 2 + 2*2/512*... == 6.
        assert_eq!(memory_expansion_cost(0, 2), 6);
    }

    #[test]
    fn exp_cost_matches_spec_example() {
        // PUSH1 0x02, PUSH2 0x0200, EXP: exponent 0x0200 is 2 bytes long.
        let exponent = U256::from(0x0200u32);
        assert_eq!(exp_dynamic_cost(&exponent), 10 + 50 * 2);
    }

    #[test]
    fn exp_cost_zero_exponent_is_free() {
        assert_eq!(exp_dynamic_cost(&U256::zero()), 0);
    }
}

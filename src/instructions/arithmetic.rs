//! Arithmetic instruction family (C7). Grounded on the teacher's
//! `instructions/arithmetic.rs`, with signed operations rewired from `i256`
//! onto [`Word256Ext`] and `exp`'s revision-conditional multiplier collapsed
//! to its post-Spurious value (every revision in scope is >= Spurious).

use ethereum_types::U256;

use crate::{
    common::ExecutionStatus,
    gas::exp_dynamic_cost,
    state::Stack,
    word::{addmod as addmod_wide, mulmod as mulmod_wide, Word256Ext},
};

pub(crate) fn add(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    stack.push(a.overflowing_add(b).0);
}

pub(crate) fn mul(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    stack.push(a.overflowing_mul(b).0);
}

pub(crate) fn sub(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    stack.push(a.overflowing_sub(b).0);
}

pub(crate) fn div(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    stack.push(if b.is_zero() { U256::zero() } else { a / b });
}

pub(crate) fn sdiv(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    stack.push(a.to_signed_div(&b));
}

pub(crate) fn modulo(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    stack.push(if b.is_zero() { U256::zero() } else { a % b });
}

pub(crate) fn smod(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    stack.push(a.to_signed_mod(&b));
}

pub(crate) fn addmod(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    let n = stack.pop();
    stack.push(addmod_wide(a, b, n));
}

pub(crate) fn mulmod(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    let n = stack.pop();
    stack.push(mulmod_wide(a, b, n));
}

/// `EXP`: pops base and exponent, charges the dynamic cost (§4.4) on top of
/// the static gas already deducted by the dispatch loop, then computes
/// `base ^ exponent` by square-and-multiply with wrapping arithmetic.
pub(crate) fn exp(stack: &mut Stack, gas_left: &mut i64) -> Result<(), ExecutionStatus> {
    let mut base = stack.pop();
    let mut power = stack.pop();

    *gas_left -= exp_dynamic_cost(&power);
    if *gas_left < 0 {
        return Err(ExecutionStatus::OutOfGas);
    }

    let mut result = U256::one();
    while !power.is_zero() {
        if !(power & U256::one()).is_zero() {
            result = result.overflowing_mul(base).0;
        }
        power >>= 1;
        base = base.overflowing_mul(base).0;
    }

    stack.push(result);
    Ok(())
}

pub(crate) fn signextend(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    stack.push(b.sign_extend(&a));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(f: impl FnOnce(&mut Stack)) -> U256 {
        let mut stack = Stack::default();
        f(&mut stack);
        stack.pop()
    }

    #[test]
    fn add_wraps() {
        let result = run(|s| {
            s.push(U256::one());
            s.push(U256::max_value());
            add(s);
        });
        assert_eq!(result, U256::zero());
    }

    #[test]
    fn div_by_zero_is_zero() {
        let result = run(|s| {
            s.push(U256::zero());
            s.push(U256::from(5));
            div(s);
        });
        assert_eq!(result, U256::zero());
    }

    #[test]
    fn sdiv_min_by_minus_one_does_not_overflow() {
        let min = crate::word::signed_min();
        let result = run(|s| {
            s.push(U256::max_value());
            s.push(min);
            sdiv(s);
        });
        assert_eq!(result, min);
    }

    #[test]
    fn exp_charges_dynamic_cost_and_out_of_gas_on_insufficient_budget() {
        let mut stack = Stack::default();
        stack.push(U256::from(0x0200u32));
        stack.push(U256::from(2));
        let mut gas = 5i64;
        assert_eq!(exp(&mut stack, &mut gas), Err(ExecutionStatus::OutOfGas));
    }

    #[test]
    fn signextend_past_31_is_noop() {
        let result = run(|s| {
            s.push(U256::from(0xABu64));
            s.push(U256::from(99));
            signextend(s);
        });
        assert_eq!(result, U256::from(0xABu64));
    }
}

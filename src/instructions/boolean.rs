//! Comparison and logical instruction family (C7). Grounded on the teacher's
//! `instructions/boolean.rs`, with `SLT`/`SGT` rewired onto
//! [`Word256Ext::signed_cmp`] instead of `i256::I256`.

use core::cmp::Ordering;
use ethereum_types::U256;

use crate::{state::Stack, word::Word256Ext};

fn push_bool(stack: &mut Stack, value: bool) {
    stack.push(if value { U256::one() } else { U256::zero() });
}

pub(crate) fn lt(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    push_bool(stack, a < b);
}

pub(crate) fn gt(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    push_bool(stack, a > b);
}

pub(crate) fn slt(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    push_bool(stack, a.signed_cmp(&b) == Ordering::Less);
}

pub(crate) fn sgt(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    push_bool(stack, a.signed_cmp(&b) == Ordering::Greater);
}

pub(crate) fn eq(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    push_bool(stack, a == b);
}

pub(crate) fn iszero(stack: &mut Stack) {
    let a = stack.pop();
    push_bool(stack, a.is_zero());
}

pub(crate) fn and(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    stack.push(a & b);
}

pub(crate) fn or(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    stack.push(a | b);
}

pub(crate) fn xor(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    stack.push(a ^ b);
}

pub(crate) fn not(stack: &mut Stack) {
    let a = stack.pop();
    stack.push(!a);
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
    fn slt_treats_negative_as_smaller() {
        let minus_one = U256::max_value();
        let result = run(|s| {
            s.push(U256::one());
            s.push(minus_one);
            slt(s);
        });
        assert_eq!(result, U256::one());
    }

    #[test]
    fn iszero_of_zero_is_one() {
        let result = run(|s| {
            s.push(U256::zero());
            iszero(s);
        });
        assert_eq!(result, U256::one());
    }

    #[test]
    fn not_complements_all_bits() {
        let result = run(|s| {
            s.push(U256::zero());
            not(s);
        });
        assert_eq!(result, U256::max_value());
    }
}

//! Bitwise instruction family (C7). Grounded on the teacher's
//! `instructions/bitwise.rs`, with `SAR`'s signed shift rewired onto
//! [`Word256Ext::sar`] instead of `i256::{Sign, I256}`.

use ethereum_types::U256;

use crate::{state::Stack, word::Word256Ext};

pub(crate) fn byte(stack: &mut Stack) {
    let index = stack.pop();
    let value = stack.pop();
    stack.push(value.byte_at(&index));
}

pub(crate) fn shl(stack: &mut Stack) {
    let shift = stack.pop();
    let value = stack.pop();
    let result = if value.is_zero() || shift >= U256::from(256) {
        U256::zero()
    } else {
        value << shift.as_usize()
    };
    stack.push(result);
}

pub(crate) fn shr(stack: &mut Stack) {
    let shift = stack.pop();
    let value = stack.pop();
    let result = if value.is_zero() || shift >= U256::from(256) {
        U256::zero()
    } else {
        value >> shift.as_usize()
    };
    stack.push(result);
}

pub(crate) fn sar(stack: &mut Stack) {
    let shift = stack.pop();
    let value = stack.pop();
    stack.push(value.sar(&shift));
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
    fn byte_extracts_most_significant_first() {
        let result = run(|s| {
            s.push(U256::from(0x0102_0304u64));
            s.push(U256::from(28));
            byte(s);
        });
        assert_eq!(result, U256::from(0x01));
    }

    #[test]
    fn shl_by_256_or_more_is_zero() {
        let result = run(|s| {
            s.push(U256::one());
            s.push(U256::from(256));
            shl(s);
        });
        assert_eq!(result, U256::zero());
    }

    #[test]
    fn sar_negative_one_stays_negative_one() {
        let result = run(|s| {
            s.push(U256::max_value());
            s.push(U256::from(4));
            sar(s);
        });
        assert_eq!(result, U256::max_value());
    }
}

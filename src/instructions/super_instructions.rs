//! Super-instruction handlers (C7): the nine fused peephole windows the
//! converter (C6) may collapse into a single dispatch slot (§4.1 step 5,
//! §9). The converter retags only the window's *first* stream slot; the
//! rest stay in the stream untouched (so `byte_offset_to_stream_index`
//! keeps working for interior jump targets) and these handlers read ahead
//! into them directly rather than re-dispatching each one individually.
//! The teacher has no super-instruction pass at all; this module is new,
//! grounded in §4.1/§9's fusion design and written in the teacher's
//! plain-function style used throughout `instructions/*.rs`.

use ethereum_types::U256;

use crate::{
    common::ExecutionStatus,
    converter::{tag, ConvertedCode, Instruction},
    instructions::control,
    state::Stack,
};

/// Outcome of a fused handler that may end in a jump: either fall through
/// to the slot just past the window (`Continue`) or land on a resolved
/// stream index (`Jump`).
pub(crate) enum SuperOutcome {
    Continue,
    Jump(u32),
}

/// Number of *extra* stream slots (beyond the fused instruction's own slot)
/// the dispatch loop must skip after running a fused handler, since the
/// window's remaining slots are left in the stream unexecuted. `None` for a
/// tag this module doesn't recognize.
pub(crate) fn trailing_slots(tag: u16) -> Option<usize> {
    Some(match tag {
        self::tag::PUSH1_ADD => 1,
        self::tag::PUSH1_SHL => 1,
        self::tag::POP_JUMP => 1,
        self::tag::AND_SWAP1_POP_SWAP2_SWAP1 => 4,
        self::tag::PUSH1_PUSH1_PUSH1_SHL_SUB => 4,
        self::tag::SWAP2_SWAP1_POP_JUMP => 3,
        self::tag::PUSH1_PUSH4_DUP3 => 3,
        self::tag::SWAP1_POP_SWAP2_SWAP1 => 3,
        self::tag::ISZERO_PUSH2_JUMPI => 2,
        _ => return None,
    })
}

/// Static gas cost of a fused window: the sum of its components' static
/// costs, none of which vary across Istanbul/Berlin/London, so fusion can
/// never change what a call is charged (§9's equivalence requirement).
/// Panics on a tag this module doesn't recognize — callers only reach this
/// after `trailing_slots` has already confirmed the tag is one of ours.
pub(crate) fn gas_cost(tag: u16) -> i64 {
    match tag {
        self::tag::PUSH1_ADD => 3 + 3,
        self::tag::PUSH1_SHL => 3 + 3,
        self::tag::POP_JUMP => 2 + 8,
        self::tag::AND_SWAP1_POP_SWAP2_SWAP1 => 3 + 3 + 2 + 3 + 3,
        self::tag::PUSH1_PUSH1_PUSH1_SHL_SUB => 3 + 3 + 3 + 3 + 3,
        self::tag::SWAP2_SWAP1_POP_JUMP => 3 + 3 + 2 + 8,
        self::tag::PUSH1_PUSH4_DUP3 => 3 + 3 + 3,
        self::tag::SWAP1_POP_SWAP2_SWAP1 => 3 + 2 + 3 + 3,
        self::tag::ISZERO_PUSH2_JUMPI => 3 + 3 + 10,
        _ => unreachable!("gas_cost called with a non-super-instruction tag"),
    }
}

/// Minimum stack depth the *original*, unfused window requires before it
/// runs, traced instruction-by-instruction through the window (the
/// dispatch loop's stack-underflow pre-check, since these never reach
/// `get_baseline_instruction_table`). Panics on an unrecognized tag, same
/// contract as [`gas_cost`].
pub(crate) fn stack_height_required(tag: u16) -> u8 {
    match tag {
        self::tag::PUSH1_ADD => 1,
        self::tag::PUSH1_SHL => 1,
        self::tag::POP_JUMP => 2,
        self::tag::AND_SWAP1_POP_SWAP2_SWAP1 => 5,
        self::tag::PUSH1_PUSH1_PUSH1_SHL_SUB => 0,
        self::tag::SWAP2_SWAP1_POP_JUMP => 3,
        self::tag::PUSH1_PUSH4_DUP3 => 1,
        self::tag::SWAP1_POP_SWAP2_SWAP1 => 4,
        self::tag::ISZERO_PUSH2_JUMPI => 1,
        _ => unreachable!("stack_height_required called with a non-super-instruction tag"),
    }
}

/// Net stack height change of the whole window, for the dispatch loop's
/// stack-overflow pre-check (only `PUSH1_PUSH4_DUP3` can ever overflow;
/// the rest are zero or negative).
pub(crate) fn net_stack_change(tag: u16) -> i8 {
    match tag {
        self::tag::PUSH1_ADD => 0,
        self::tag::PUSH1_SHL => 0,
        self::tag::POP_JUMP => -2,
        self::tag::AND_SWAP1_POP_SWAP2_SWAP1 => -2,
        self::tag::PUSH1_PUSH1_PUSH1_SHL_SUB => 1,
        self::tag::SWAP2_SWAP1_POP_JUMP => -2,
        self::tag::PUSH1_PUSH4_DUP3 => 3,
        self::tag::SWAP1_POP_SWAP2_SWAP1 => -2,
        self::tag::ISZERO_PUSH2_JUMPI => -1,
        _ => unreachable!("net_stack_change called with a non-super-instruction tag"),
    }
}

/// `PUSH1 lit; ADD` -> push `lit + top`.
pub(crate) fn push1_add(stack: &mut Stack, lit: u16) {
    let top = stack.pop();
    stack.push(U256::from(lit).overflowing_add(top).0);
}

/// `PUSH1 lit; SHL` -> push `top << lit`.
pub(crate) fn push1_shl(stack: &mut Stack, lit: u16) {
    let top = stack.pop();
    let shift = U256::from(lit);
    let result = if top.is_zero() || shift >= U256::from(256) {
        U256::zero()
    } else {
        top << lit as usize
    };
    stack.push(result);
}

/// `POP; JUMP` -> discard the top, then jump to the next element.
pub(crate) fn pop_jump(stack: &mut Stack, converted: &ConvertedCode) -> Result<SuperOutcome, ExecutionStatus> {
    stack.pop();
    let target = stack.pop();
    Ok(SuperOutcome::Jump(control::resolve_dynamic_target(converted, target)?))
}

/// `AND; SWAP1; POP; SWAP2; SWAP1`, run as plain stack ops back to back.
pub(crate) fn and_swap1_pop_swap2_swap1(stack: &mut Stack) {
    let a = stack.pop();
    let b = stack.pop();
    stack.push(a & b);
    stack.swap(1);
    stack.pop();
    stack.swap(2);
    stack.swap(1);
}

/// `PUSH1 a; PUSH1 b; PUSH1 c; SHL; SUB` -> push `(b << c) - a`, the
/// three literals never touching anything already on the stack.
pub(crate) fn push1_push1_push1_shl_sub(stack: &mut Stack, a: u16, b: u16, c: u16) {
    let b = U256::from(b);
    let c = U256::from(c);
    let shifted = if b.is_zero() || c >= U256::from(256) { U256::zero() } else { b << c.as_usize() };
    stack.push(shifted.overflowing_sub(U256::from(a)).0);
}

/// `SWAP2; SWAP1; POP; JUMP`.
pub(crate) fn swap2_swap1_pop_jump(stack: &mut Stack, converted: &ConvertedCode) -> Result<SuperOutcome, ExecutionStatus> {
    stack.swap(2);
    stack.swap(1);
    stack.pop();
    let target = stack.pop();
    Ok(SuperOutcome::Jump(control::resolve_dynamic_target(converted, target)?))
}

/// `PUSH1 a; PUSH4 b; DUP3` -> push `a`, push `b`, push a copy of whatever
/// was on top before this sequence ran.
pub(crate) fn push1_push4_dup3(stack: &mut Stack, a: u16, b: U256) {
    let existing_top = stack.peek(0);
    stack.push(U256::from(a));
    stack.push(b);
    stack.push(existing_top);
}

/// `SWAP1; POP; SWAP2; SWAP1`.
pub(crate) fn swap1_pop_swap2_swap1(stack: &mut Stack) {
    stack.swap(1);
    stack.pop();
    stack.swap(2);
    stack.swap(1);
}

/// `ISZERO; PUSH2 target; JUMPI` -> jump to `target` iff the popped value
/// was zero.
pub(crate) fn iszero_push2_jumpi(
    stack: &mut Stack,
    converted: &ConvertedCode,
    target_literal: u16,
) -> Result<SuperOutcome, ExecutionStatus> {
    let value = stack.pop();
    if value.is_zero() {
        let idx = control::resolve_dynamic_target(converted, U256::from(target_literal))?;
        Ok(SuperOutcome::Jump(idx))
    } else {
        Ok(SuperOutcome::Continue)
    }
}

/// Reconstruct the literal of the instruction stream's slot at `pc`,
/// which may be a multi-slot `PUSHn` head followed by `DATA` slots.
pub(crate) fn reconstruct_push_literal(instructions: &[Instruction], pc: usize, extra_data_slots: usize) -> U256 {
    let mut value = U256::from(instructions[pc].arg16);
    for i in 1..=extra_data_slots {
        value = (value << 16) | U256::from(instructions[pc + i].arg16);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::convert;

    #[test]
    fn push1_add_adds_literal_to_existing_top() {
        let mut stack = Stack::default();
        stack.push(U256::from(10));
        push1_add(&mut stack, 5);
        assert_eq!(stack.pop(), U256::from(15));
    }

    #[test]
    fn push1_push1_push1_shl_sub_matches_unfused_sequence() {
        let mut stack = Stack::default();
        push1_push1_push1_shl_sub(&mut stack, 1, 2, 3);
        // (2 << 3) - 1 == 15
        assert_eq!(stack.pop(), U256::from(15));
    }

    #[test]
    fn push1_push4_dup3_preserves_prior_top_underneath() {
        let mut stack = Stack::default();
        stack.push(U256::from(0xAAu64));
        push1_push4_dup3(&mut stack, 1, U256::from(2));
        assert_eq!(stack.pop(), U256::from(0xAAu64));
        assert_eq!(stack.pop(), U256::from(2));
        assert_eq!(stack.pop(), U256::from(1));
    }

    #[test]
    fn pop_jump_resolves_against_converted_code() {
        // STOP, JUMPDEST
        let code = [0x00, 0x5b];
        let converted = convert(&code, false).unwrap();
        let mut stack = Stack::default();
        stack.push(U256::zero()); // discarded by POP
        stack.push(U256::from(1)); // jump target
        match pop_jump(&mut stack, &converted).unwrap() {
            SuperOutcome::Jump(idx) => assert_eq!(idx, 1),
            SuperOutcome::Continue => panic!("expected a jump"),
        }
    }

    #[test]
    fn iszero_push2_jumpi_only_jumps_when_value_is_zero() {
        let code = [0x00, 0x5b];
        let converted = convert(&code, false).unwrap();
        let mut stack = Stack::default();
        stack.push(U256::one());
        assert!(matches!(iszero_push2_jumpi(&mut stack, &converted, 1).unwrap(), SuperOutcome::Continue));
    }
}

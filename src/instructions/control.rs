//! Control-flow instruction family (C7): `JUMP`/`JUMPI` target resolution,
//! `RETURN`/`REVERT`, and the calldata accessors. Grounded on the teacher's
//! `instructions/control.rs`.
//!
//! Static jump targets are already resolved into stream indices by the
//! converter (§4.1 step 4); [`resolve_dynamic_target`] only runs for the
//! `JUMP`/`JUMPI` opcodes the converter left unresolved (computed targets).
//! The teacher's `JumpdestMap`/`op_jump` (and its stray debug `println!`) has
//! no counterpart here — jump validity is answered by
//! [`crate::converter::ConvertedCode::resolve_dynamic_target`] instead of a
//! standalone bitmap.

use ethereum_types::U256;

use crate::{common::ExecutionStatus, converter::ConvertedCode, state::ExecutionContext};

pub(crate) fn ret(ctx: &mut ExecutionContext) -> Result<(), ExecutionStatus> {
    let offset = ctx.stack.pop();
    let size = ctx.stack.pop();
    if let Some(region) = ctx.memory.ensure_capacity(&mut ctx.gas, offset, size)? {
        ctx.output_data = ctx.memory.region(region).to_vec().into();
    }
    Ok(())
}

/// Resolve a dynamic JUMP/JUMPI target popped from the stack to a stream
/// index, failing with `Error` (§7's "bad JUMP" case) if it does not land on
/// a JUMPDEST.
pub(crate) fn resolve_dynamic_target(
    converted: &ConvertedCode,
    target: U256,
) -> Result<u32, ExecutionStatus> {
    if target > U256::from(u32::MAX) {
        return Err(ExecutionStatus::Error);
    }
    converted
        .resolve_dynamic_target(target.as_usize())
        .ok_or(ExecutionStatus::Error)
}

pub(crate) fn calldataload(ctx: &mut ExecutionContext) {
    let index = ctx.stack.pop();
    let input = &ctx.message.input_data;
    let input_len = input.len();

    let value = if index > U256::from(input_len) {
        U256::zero()
    } else {
        let start = index.as_usize();
        let end = core::cmp::min(start + 32, input_len);
        let mut bytes = [0u8; 32];
        bytes[..end - start].copy_from_slice(&input[start..end]);
        U256::from_big_endian(&bytes)
    };

    ctx.stack.push(value);
}

pub(crate) fn calldatasize(ctx: &mut ExecutionContext) {
    ctx.stack.push(U256::from(ctx.message.input_data.len()));
}

pub(crate) fn pc(ctx: &mut ExecutionContext, pc_as_byte_offset: usize) {
    ctx.stack.push(U256::from(pc_as_byte_offset));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::convert;

    #[test]
    fn dynamic_target_landing_on_jumpdest_resolves() {
        // STOP, JUMPDEST
        let code = [0x00, 0x5b];
        let converted = convert(&code, false).unwrap();
        assert_eq!(resolve_dynamic_target(&converted, U256::from(1)), Ok(1));
    }

    #[test]
    fn dynamic_target_off_jumpdest_is_invalid() {
        let code = [0x00, 0x5b];
        let converted = convert(&code, false).unwrap();
        assert_eq!(
            resolve_dynamic_target(&converted, U256::from(0)),
            Err(ExecutionStatus::Error)
        );
    }

    #[test]
    fn dynamic_target_beyond_u32_is_invalid() {
        let code = [0x00];
        let converted = convert(&code, false).unwrap();
        assert_eq!(
            resolve_dynamic_target(&converted, U256::from(u64::MAX)),
            Err(ExecutionStatus::Error)
        );
    }
}

//! Memory instruction family (C7): `MLOAD`/`MSTORE`/`MSTORE8`/`MSIZE`,
//! `*COPY` opcodes, and `KECCAK256`. Grounded on the teacher's
//! `instructions/memory.rs`, with memory-expansion gas accounting delegated
//! to [`crate::state::Memory::ensure_capacity`] (C4) and `KECCAK256` rewired
//! through the [`HashCache`] (C5) instead of hashing every call.

use ethereum_types::U256;

use crate::{
    cache::HashCache,
    common::ExecutionStatus,
    gas::copy_cost,
    state::ExecutionContext,
};

pub(crate) fn mload(ctx: &mut ExecutionContext) -> Result<(), ExecutionStatus> {
    let offset = ctx.stack.pop();
    let region = ctx
        .memory
        .ensure_capacity(&mut ctx.gas, offset, U256::from(32))?
        .expect("a 32-byte request is never zero-sized");
    let value = U256::from_big_endian(ctx.memory.region(region));
    ctx.stack.push(value);
    Ok(())
}

pub(crate) fn mstore(ctx: &mut ExecutionContext) -> Result<(), ExecutionStatus> {
    let offset = ctx.stack.pop();
    let value = ctx.stack.pop();
    let region = ctx
        .memory
        .ensure_capacity(&mut ctx.gas, offset, U256::from(32))?
        .expect("a 32-byte request is never zero-sized");
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    ctx.memory.region_mut(region).copy_from_slice(&bytes);
    Ok(())
}

pub(crate) fn mstore8(ctx: &mut ExecutionContext) -> Result<(), ExecutionStatus> {
    let offset = ctx.stack.pop();
    let value = ctx.stack.pop();
    let region = ctx
        .memory
        .ensure_capacity(&mut ctx.gas, offset, U256::one())?
        .expect("a 1-byte request is never zero-sized");
    ctx.memory.region_mut(region)[0] = value.low_u32() as u8;
    Ok(())
}

pub(crate) fn msize(ctx: &mut ExecutionContext) {
    ctx.stack.push(U256::from(ctx.memory.len()));
}

pub(crate) fn calldatacopy(ctx: &mut ExecutionContext) -> Result<(), ExecutionStatus> {
    let mem_offset = ctx.stack.pop();
    let input_offset = ctx.stack.pop();
    let size = ctx.stack.pop();

    let region = ctx.memory.ensure_capacity(&mut ctx.gas, mem_offset, size)?;

    if let Some(region) = region {
        ctx.gas.deduct(copy_cost(region.size))?;

        let input = &ctx.message.input_data;
        let src = core::cmp::min(input.len(), input_offset.as_usize().min(input.len()));
        let copy_size = core::cmp::min(size.as_usize(), input.len().saturating_sub(src));

        let dst = ctx.memory.region_mut(region);
        if copy_size > 0 {
            dst[..copy_size].copy_from_slice(&input[src..src + copy_size]);
        }
        dst[copy_size..].fill(0);
    }

    Ok(())
}

pub(crate) fn codesize(ctx: &mut ExecutionContext, code: &[u8]) {
    ctx.stack.push(U256::from(code.len()));
}

pub(crate) fn codecopy(ctx: &mut ExecutionContext, code: &[u8]) -> Result<(), ExecutionStatus> {
    let mem_offset = ctx.stack.pop();
    let code_offset = ctx.stack.pop();
    let size = ctx.stack.pop();

    let region = ctx.memory.ensure_capacity(&mut ctx.gas, mem_offset, size)?;

    if let Some(region) = region {
        ctx.gas.deduct(copy_cost(region.size))?;

        let src = core::cmp::min(code.len(), code_offset.as_usize().min(code.len()));
        let copy_size = core::cmp::min(region.size, code.len().saturating_sub(src));

        let dst = ctx.memory.region_mut(region);
        if copy_size > 0 {
            dst[..copy_size].copy_from_slice(&code[src..src + copy_size]);
        }
        dst[copy_size..].fill(0);
    }

    Ok(())
}

pub(crate) fn keccak256(ctx: &mut ExecutionContext, hash_cache: &HashCache) -> Result<(), ExecutionStatus> {
    let offset = ctx.stack.pop();
    let size = ctx.stack.pop();

    let region = ctx.memory.ensure_capacity(&mut ctx.gas, offset, size)?;

    let digest = if let Some(region) = region {
        let words = crate::gas::num_words(region.size);
        ctx.gas.deduct(words * 6)?;
        hash_cache.keccak256(ctx.memory.region(region))
    } else {
        hash_cache.keccak256(&[])
    };

    ctx.stack.push(U256::from_big_endian(&digest));
    Ok(())
}

pub(crate) fn returndatasize(ctx: &mut ExecutionContext) {
    ctx.stack.push(U256::from(ctx.return_data.len()));
}

pub(crate) fn returndatacopy(ctx: &mut ExecutionContext) -> Result<(), ExecutionStatus> {
    let mem_offset = ctx.stack.pop();
    let input_offset = ctx.stack.pop();
    let size = ctx.stack.pop();

    let region = ctx.memory.ensure_capacity(&mut ctx.gas, mem_offset, size)?;

    if input_offset > U256::from(ctx.return_data.len()) {
        return Err(ExecutionStatus::SegmentationFault);
    }
    let src = input_offset.as_usize();
    let requested_size = region.map(|r| r.size).unwrap_or(0);
    if src + requested_size > ctx.return_data.len() {
        return Err(ExecutionStatus::SegmentationFault);
    }

    if let Some(region) = region {
        ctx.gas.deduct(copy_cost(region.size))?;
        let data = ctx.return_data[src..src + region.size].to_vec();
        ctx.memory.region_mut(region).copy_from_slice(&data);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Message;
    use ethereum_types::Address;

    fn ctx() -> ExecutionContext {
        let msg = Message {
            kind: crate::common::CallKind::Call,
            is_static: false,
            depth: 0,
            gas: 1_000_000,
            destination: Address::zero(),
            sender: Address::zero(),
            input_data: bytes::Bytes::new(),
            value: U256::zero(),
        };
        ExecutionContext::new(msg, crate::common::Revision::London, false)
    }

    #[test]
    fn mstore_then_mload_round_trips() {
        let mut ctx = ctx();
        ctx.stack.push(U256::from(0xdeadbeefu64));
        ctx.stack.push(U256::zero());
        mstore(&mut ctx).unwrap();
        ctx.stack.push(U256::zero());
        mload(&mut ctx).unwrap();
        assert_eq!(ctx.stack.pop(), U256::from(0xdeadbeefu64));
    }

    #[test]
    fn msize_rounds_up_to_32() {
        let mut ctx = ctx();
        ctx.stack.push(U256::from(8));
        ctx.stack.push(U256::zero());
        mstore8(&mut ctx).unwrap();
        msize(&mut ctx);
        assert_eq!(ctx.stack.pop(), U256::from(32));
    }

    #[test]
    fn keccak256_of_empty_region_matches_known_digest() {
        let mut ctx = ctx();
        let cache = HashCache::default();
        ctx.stack.push(U256::zero());
        ctx.stack.push(U256::zero());
        keccak256(&mut ctx, &cache).unwrap();
        let expected =
            hex::decode("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470").unwrap();
        let mut got = [0u8; 32];
        ctx.stack.pop().to_big_endian(&mut got);
        assert_eq!(&got[..], &expected[..]);
    }
}

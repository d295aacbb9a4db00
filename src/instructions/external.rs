//! External-state instruction family (C7): account/tx/block accessors,
//! `BALANCE`/`EXTCODE*`, storage load/store, `LOGn`, `SELFDESTRUCT`.
//! Grounded on the teacher's `instructions/external.rs`, with every
//! `yield_`-based macro rewritten as a plain synchronous function taking
//! `&mut dyn Host` (§5 REDESIGN FLAG) and `SSTORE`'s gas/refund table
//! widened from the teacher's five-way match to the nine-way EIP-2200
//! classification (§4.6).

use arrayvec::ArrayVec;
use ethereum_types::{H256, U256};

use crate::{
    common::{address_to_u256, u256_to_address, ExecutionStatus, Revision},
    gas::{ADDITIONAL_COLD_ACCOUNT_ACCESS_COST, ADDITIONAL_COLD_SLOAD_COST, COLD_SLOAD_COST, WARM_STORAGE_READ_COST},
    host::{AccessStatus, Host, StorageStatus, TxContext},
    instructions::{HandlerError, HandlerResult},
    state::ExecutionContext,
};

pub(crate) fn address(ctx: &mut ExecutionContext) {
    ctx.stack.push(address_to_u256(ctx.message.destination));
}

pub(crate) fn caller(ctx: &mut ExecutionContext) {
    ctx.stack.push(address_to_u256(ctx.message.sender));
}

pub(crate) fn callvalue(ctx: &mut ExecutionContext) {
    ctx.stack.push(ctx.message.value);
}

fn charge_cold_surcharge(ctx: &mut ExecutionContext, status: AccessStatus) -> HandlerResult<()> {
    if status == AccessStatus::Cold {
        ctx.gas.deduct(ADDITIONAL_COLD_ACCOUNT_ACCESS_COST)?;
    }
    Ok(())
}

pub(crate) fn balance(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    let address = u256_to_address(ctx.stack.pop());
    if ctx.revision >= Revision::Berlin {
        let status = host.access_account(address)?;
        charge_cold_surcharge(ctx, status)?;
    }
    let balance = host.get_balance(address)?;
    ctx.stack.push(balance);
    Ok(())
}

pub(crate) fn extcodesize(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    let address = u256_to_address(ctx.stack.pop());
    if ctx.revision >= Revision::Berlin {
        let status = host.access_account(address)?;
        charge_cold_surcharge(ctx, status)?;
    }
    let size = host.get_code_size(address)?;
    ctx.stack.push(size);
    Ok(())
}

pub(crate) fn extcodehash(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    let address = u256_to_address(ctx.stack.pop());
    if ctx.revision >= Revision::Berlin {
        let status = host.access_account(address)?;
        charge_cold_surcharge(ctx, status)?;
    }
    let hash = host.get_code_hash(address)?;
    ctx.stack.push(U256::from_big_endian(hash.as_bytes()));
    Ok(())
}

pub(crate) fn extcodecopy(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    let address = u256_to_address(ctx.stack.pop());
    let mem_offset = ctx.stack.pop();
    let code_offset = ctx.stack.pop();
    let size = ctx.stack.pop();

    let region = ctx
        .memory
        .ensure_capacity(&mut ctx.gas, mem_offset, size)
        .map_err(HandlerError::from)?;

    if let Some(region) = &region {
        ctx.gas.deduct(crate::gas::copy_cost(region.size))?;
    }

    if ctx.revision >= Revision::Berlin {
        let status = host.access_account(address)?;
        charge_cold_surcharge(ctx, status)?;
    }

    if let Some(region) = region {
        let offset = code_offset.min(U256::from(u32::MAX)).as_usize();
        let dst = ctx.memory.region_mut(region);
        let written = host.copy_code(address, offset, &mut *dst)?;
        dst[written..].fill(0);
    }

    Ok(())
}

fn tx_context_push(ctx: &mut ExecutionContext, host: &mut dyn Host, accessor: impl Fn(&TxContext) -> U256) -> HandlerResult<()> {
    let tx_context = host.get_tx_context()?;
    ctx.stack.push(accessor(&tx_context));
    Ok(())
}

pub(crate) fn origin(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    tx_context_push(ctx, host, |t| address_to_u256(t.tx_origin))
}

pub(crate) fn gasprice(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    tx_context_push(ctx, host, |t| t.tx_gas_price)
}

pub(crate) fn coinbase(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    tx_context_push(ctx, host, |t| address_to_u256(t.block_coinbase))
}

pub(crate) fn timestamp(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    tx_context_push(ctx, host, |t| U256::from(t.block_timestamp))
}

pub(crate) fn number(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    tx_context_push(ctx, host, |t| U256::from(t.block_number))
}

pub(crate) fn gaslimit(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    tx_context_push(ctx, host, |t| U256::from(t.block_gas_limit))
}

pub(crate) fn difficulty(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    tx_context_push(ctx, host, |t| t.block_difficulty)
}

pub(crate) fn chainid(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    tx_context_push(ctx, host, |t| t.chain_id)
}

pub(crate) fn basefee(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    tx_context_push(ctx, host, |t| t.block_base_fee)
}

pub(crate) fn selfbalance(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    let balance = host.get_balance(ctx.message.destination)?;
    ctx.stack.push(balance);
    Ok(())
}

pub(crate) fn blockhash(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    let number = ctx.stack.pop();
    let upper_bound = host.get_tx_context()?.block_number;
    let lower_bound = upper_bound.saturating_sub(256);

    let mut hash = H256::zero();
    if number <= U256::from(u64::MAX) {
        let n = number.as_u64();
        if (lower_bound..upper_bound).contains(&n) {
            hash = host.get_block_hash(n)?;
        }
    }

    ctx.stack.push(U256::from_big_endian(hash.as_bytes()));
    Ok(())
}

pub(crate) fn log(ctx: &mut ExecutionContext, host: &mut dyn Host, num_topics: usize) -> HandlerResult<()> {
    if ctx.message.is_static {
        return Err(HandlerError::from(ExecutionStatus::Error));
    }

    let offset = ctx.stack.pop();
    let size = ctx.stack.pop();
    let region = ctx
        .memory
        .ensure_capacity(&mut ctx.gas, offset, size)
        .map_err(HandlerError::from)?;

    if let Some(region) = &region {
        ctx.gas.deduct(region.size as i64 * 8).map_err(HandlerError::from)?;
    }

    let mut topics = ArrayVec::<H256, 4>::new();
    for _ in 0..num_topics {
        topics.push(H256(ctx.stack.pop().into()));
    }

    let data = region.map(|r| ctx.memory.region(r).to_vec()).unwrap_or_default();
    host.emit_log(ctx.message.destination, &data, &topics)?;
    Ok(())
}

/// Maps a storage transition to its EIP-2200/EIP-2929/EIP-3529 gas cost
/// (excluding any cold-access surcharge, charged separately) and refund
/// delta. See DESIGN.md for the Open Question this resolves.
fn sstore_costs(revision: Revision, status: StorageStatus) -> (i64, i64) {
    let clears_refund = if revision >= Revision::London { 4800 } else { 15000 };
    let sload_gas = if revision >= Revision::Berlin { WARM_STORAGE_READ_COST } else { 800 };
    let sstore_reset_gas = 5000i64;
    let sstore_set_gas = 20000i64;
    let reset_cost = if revision >= Revision::Berlin {
        sstore_reset_gas - COLD_SLOAD_COST
    } else {
        sstore_reset_gas
    };

    match status {
        StorageStatus::Assigned => (sload_gas, 0),
        StorageStatus::Modified => (reset_cost, 0),
        StorageStatus::Deleted => (reset_cost, clears_refund),
        StorageStatus::Added => (sstore_set_gas, 0),
        StorageStatus::DeletedAdded => (sload_gas, -clears_refund),
        StorageStatus::ModifiedDeleted => (sload_gas, clears_refund),
        StorageStatus::DeletedRestored | StorageStatus::ModifiedRestored => {
            (sload_gas, sstore_reset_gas - sload_gas)
        }
        StorageStatus::AddedDeleted => (sload_gas, sstore_set_gas - sload_gas),
    }
}

pub(crate) fn sload(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    let key = H256(ctx.stack.pop().into());

    if ctx.revision >= Revision::Berlin {
        let status = host.access_storage(ctx.message.destination, key)?;
        if status == AccessStatus::Cold {
            ctx.gas.deduct(ADDITIONAL_COLD_SLOAD_COST)?;
        }
    }

    let value = host.get_storage(ctx.message.destination, key)?;
    ctx.stack.push(U256::from_big_endian(value.as_bytes()));
    Ok(())
}

pub(crate) fn sstore(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    if ctx.message.is_static {
        return Err(HandlerError::from(ExecutionStatus::Error));
    }
    // EIP-2200 "stipend" rule: SSTORE fails whenever gas left is at or below
    // the call stipend, regardless of the actual write's cost.
    if ctx.gas.left() <= 2300 {
        return Err(HandlerError::from(ExecutionStatus::OutOfGas));
    }

    let key = H256(ctx.stack.pop().into());
    let value = H256(ctx.stack.pop().into());

    let mut cold_surcharge = 0i64;
    if ctx.revision >= Revision::Berlin {
        let status = host.access_storage(ctx.message.destination, key)?;
        if status == AccessStatus::Cold {
            cold_surcharge = COLD_SLOAD_COST;
        }
    }

    let status = host.set_storage(ctx.message.destination, key, value)?;
    let (cost, refund_delta) = sstore_costs(ctx.revision, status);

    ctx.gas.deduct(cold_surcharge + cost)?;
    ctx.gas_refund += refund_delta;
    Ok(())
}

pub(crate) fn selfdestruct(ctx: &mut ExecutionContext, host: &mut dyn Host) -> HandlerResult<()> {
    if ctx.message.is_static {
        return Err(HandlerError::from(ExecutionStatus::Error));
    }

    let beneficiary = u256_to_address(ctx.stack.pop());

    if ctx.revision >= Revision::Berlin {
        let status = host.access_account(beneficiary)?;
        if status == AccessStatus::Cold {
            ctx.gas.deduct(crate::gas::COLD_ACCOUNT_ACCESS_COST)?;
        }
    }

    let balance_nonzero = !host.get_balance(ctx.message.destination)?.is_zero();
    if balance_nonzero && !host.account_exists(beneficiary)? {
        ctx.gas.deduct(25000)?;
    }

    host.selfdestruct(ctx.message.destination, beneficiary)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sstore_added_costs_20000_and_no_refund() {
        assert_eq!(sstore_costs(Revision::London, StorageStatus::Added), (20000, 0));
    }

    #[test]
    fn sstore_deleted_grants_post_london_refund() {
        assert_eq!(sstore_costs(Revision::London, StorageStatus::Deleted), (5000 - COLD_SLOAD_COST, 4800));
    }

    #[test]
    fn sstore_deleted_grants_pre_london_refund() {
        assert_eq!(sstore_costs(Revision::Istanbul, StorageStatus::Deleted), (5000, 15000));
    }

    #[test]
    fn sstore_assigned_is_cheap_in_berlin() {
        assert_eq!(sstore_costs(Revision::Berlin, StorageStatus::Assigned), (WARM_STORAGE_READ_COST, 0));
    }
}

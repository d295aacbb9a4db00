//! Host abstraction (C9): everything the interpreter needs from the
//! surrounding chain/state implementation that it cannot decide on its own
//! (balances, storage, other accounts' code, logs, nested calls).
//!
//! The teacher's `Host` trait is `#[async_trait]` and returns
//! `anyhow::Result<T>`, built to support a remote/IPC-backed implementation
//! driven through the `genawaiter` continuation in `interpreter.rs`. This
//! core runs one call to completion on the calling thread with no
//! suspension points (§5, and the dropped-continuation REDESIGN FLAG in
//! SPEC_FULL.md), so `Host` here is a plain synchronous trait. `anyhow` is
//! replaced by a concrete [`HostError`] (`thiserror`) since a library this
//! low-level should let callers match on failure kinds rather than only
//! inspect a formatted message.

use crate::common::{Message, RunOutput};
use ethereum_types::{Address, H256, U256};
use thiserror::Error;

/// State access status (EIP-2929), returned by `access_account`/
/// `access_storage` as the status *before* the access (so the interpreter
/// knows whether to charge the cold or warm price).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AccessStatus {
    #[default]
    Cold,
    Warm,
}

/// The nine-way storage transition classification from EIP-2200, used to
/// look up the exact SSTORE gas/refund entry (§4.3's SSTORE table). Wider
/// than the teacher's five-way `StorageStatus`, which predates EIP-2200's
/// "restored to original" cases (`DeletedAdded`, `AddedDeleted`, and the two
/// `*Restored` variants).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageStatus {
    /// `current == new`: no-op write.
    Assigned,
    /// `original == current`, `new` differs from both and is non-zero,
    /// `current` non-zero: plain overwrite.
    Modified,
    /// `original == current` non-zero, `new == 0`: first deletion.
    Deleted,
    /// `original == current == 0`, `new` non-zero: first assignment.
    Added,
    /// Slot was zero at `original`, has since been deleted down to zero by a
    /// prior write in this transaction, and is now being set non-zero again.
    DeletedAdded,
    /// Slot was non-zero and already modified away from `original` in this
    /// transaction, and is now being deleted.
    ModifiedDeleted,
    /// Slot was deleted earlier in this transaction and is now being set
    /// back to its original (non-zero) value.
    DeletedRestored,
    /// Slot was added (from zero) earlier in this transaction and is now
    /// being deleted back to zero.
    AddedDeleted,
    /// Slot was modified earlier in this transaction and is now being set
    /// back to its original (non-zero) value.
    ModifiedRestored,
}

/// Transaction- and block-scoped context, constant for the lifetime of a
/// single `run()` call. Mirrors the teacher's `TxContext` with `BASEFEE`
/// (`block_base_fee`) already present rather than conditionally compiled,
/// since London is always in scope here.
#[derive(Clone, Debug)]
pub struct TxContext {
    pub tx_gas_price: U256,
    pub tx_origin: Address,
    pub block_coinbase: Address,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub block_gas_limit: u64,
    pub block_difficulty: U256,
    pub chain_id: U256,
    pub block_base_fee: U256,
}

/// Failure reaching or querying the host. Distinct from [`ExecutionStatus`]
/// (`crate::common`): an `ExecutionStatus` is a well-defined EVM-level
/// outcome, a `HostError` is the environment failing to answer at all.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host operation unsupported: {0}")]
    Unsupported(&'static str),
    #[error("host backend error: {0}")]
    Backend(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Everything the interpreter asks of its embedding environment (§5, C9).
pub trait Host {
    /// Whether `address` is a known account (EOA or has code/non-zero
    /// balance/nonce).
    fn account_exists(&self, address: Address) -> HostResult<bool>;
    /// Value of a storage slot. Zero if the slot or account doesn't exist.
    fn get_storage(&self, address: Address, key: H256) -> HostResult<H256>;
    /// Set a storage slot, returning its EIP-2200 transition classification.
    fn set_storage(&mut self, address: Address, key: H256, value: H256) -> HostResult<StorageStatus>;
    /// Transient storage (EIP-1153, Cancun+). No opcode in Istanbul, Berlin
    /// or London ever reaches these — stubbed per §4.6 rather than omitted,
    /// so a Cancun-aware embedder can override them without the trait
    /// growing a new method later.
    fn get_transient_storage(&self, _address: Address, _key: H256) -> HostResult<H256> {
        Ok(H256::zero())
    }
    fn set_transient_storage(&mut self, _address: Address, _key: H256, _value: H256) -> HostResult<()> {
        Ok(())
    }
    /// Balance of an account, zero if it doesn't exist.
    fn get_balance(&self, address: Address) -> HostResult<U256>;
    /// Code size of an account, zero if it doesn't exist.
    fn get_code_size(&self, address: Address) -> HostResult<U256>;
    /// keccak256 of an account's code, zero if it doesn't exist or has no
    /// code.
    fn get_code_hash(&self, address: Address) -> HostResult<H256>;
    /// Copy up to `buffer.len()` bytes of `address`'s code starting at
    /// `offset` into `buffer`, returning the number of bytes written.
    fn copy_code(&self, address: Address, offset: usize, buffer: &mut [u8]) -> HostResult<usize>;
    /// Register a self-destruct, transferring the remaining balance to
    /// `beneficiary`.
    fn selfdestruct(&mut self, address: Address, beneficiary: Address) -> HostResult<()>;
    /// Perform a nested call/create described by `msg`, running it to
    /// completion before returning (§5's synchronous call model).
    fn call(&mut self, msg: &Message) -> HostResult<RunOutput>;
    /// The constant transaction/block context for this execution.
    fn get_tx_context(&self) -> HostResult<TxContext>;
    /// Hash of a recent block, zero if out of the last 256 or unknown.
    fn get_block_hash(&self, block_number: u64) -> HostResult<H256>;
    /// Record a LOGn.
    fn emit_log(&mut self, address: Address, data: &[u8], topics: &[H256]) -> HostResult<()>;
    /// Mark an account warm (EIP-2929), returning its status *before* this
    /// access.
    fn access_account(&mut self, address: Address) -> HostResult<AccessStatus>;
    /// Mark a storage slot warm (EIP-2929), returning its status *before*
    /// this access.
    fn access_storage(&mut self, address: Address, key: H256) -> HostResult<AccessStatus>;
}

/// A `Host` that rejects every call. Useful as a placeholder when only
/// pure, state-free bytecode is being exercised.
pub struct DummyHost;

impl Host for DummyHost {
    fn account_exists(&self, _: Address) -> HostResult<bool> {
        Err(HostError::Unsupported("account_exists"))
    }

    fn get_storage(&self, _: Address, _: H256) -> HostResult<H256> {
        Err(HostError::Unsupported("get_storage"))
    }

    fn set_storage(&mut self, _: Address, _: H256, _: H256) -> HostResult<StorageStatus> {
        Err(HostError::Unsupported("set_storage"))
    }

    fn get_balance(&self, _: Address) -> HostResult<U256> {
        Err(HostError::Unsupported("get_balance"))
    }

    fn get_code_size(&self, _: Address) -> HostResult<U256> {
        Err(HostError::Unsupported("get_code_size"))
    }

    fn get_code_hash(&self, _: Address) -> HostResult<H256> {
        Err(HostError::Unsupported("get_code_hash"))
    }

    fn copy_code(&self, _: Address, _: usize, _: &mut [u8]) -> HostResult<usize> {
        Err(HostError::Unsupported("copy_code"))
    }

    fn selfdestruct(&mut self, _: Address, _: Address) -> HostResult<()> {
        Err(HostError::Unsupported("selfdestruct"))
    }

    fn call(&mut self, _: &Message) -> HostResult<RunOutput> {
        Err(HostError::Unsupported("call"))
    }

    fn get_tx_context(&self) -> HostResult<TxContext> {
        Err(HostError::Unsupported("get_tx_context"))
    }

    fn get_block_hash(&self, _: u64) -> HostResult<H256> {
        Err(HostError::Unsupported("get_block_hash"))
    }

    fn emit_log(&mut self, _: Address, _: &[u8], _: &[H256]) -> HostResult<()> {
        Err(HostError::Unsupported("emit_log"))
    }

    fn access_account(&mut self, _: Address) -> HostResult<AccessStatus> {
        Err(HostError::Unsupported("access_account"))
    }

    fn access_storage(&mut self, _: Address, _: H256) -> HostResult<AccessStatus> {
        Err(HostError::Unsupported("access_storage"))
    }
}

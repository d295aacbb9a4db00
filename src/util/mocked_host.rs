//! In-memory [`Host`] stub for tests (`util` feature), grounded on the
//! teacher's `util::tester`-driven test suite — which expects a
//! `host.accounts`/`host.recorded`/`host.call_result` shaped stand-in — and
//! on the EVMC reference implementation's `MockedHost`, the usual shape for
//! this kind of stub. The teacher's version is async (its `Host` is
//! `#[async_trait]`); this one is plain synchronous, matching
//! [`crate::host::Host`].

use std::collections::{HashMap, HashSet};

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use parking_lot::Mutex;
use sha3::{Digest, Keccak256};

use crate::{
    common::{CallKind, ExecutionStatus, Message, RunOutput},
    host::{AccessStatus, Host, HostResult, StorageStatus, TxContext},
};

/// A single storage slot's history within the mocked call: `original` is the
/// value at the start of the call, `current` the value now, `dirty` whether
/// it has been written at least once (needed to reproduce EIP-2200's
/// "already modified this transaction" branch even when a slot is written
/// back to a value that happens to equal its original).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StorageValue {
    pub original: H256,
    pub current: H256,
    pub dirty: bool,
}

impl StorageValue {
    pub fn value(&self) -> H256 {
        self.current
    }
}

#[derive(Clone, Debug, Default)]
pub struct Account {
    pub nonce: u64,
    pub balance: U256,
    pub code: Bytes,
    pub storage: HashMap<H256, StorageValue>,
}

/// The scripted result `MockedHost::call` returns for every nested call,
/// until a test overwrites it.
#[derive(Clone, Debug)]
pub struct CallResult {
    pub status_code: ExecutionStatus,
    pub gas_left: i64,
    pub gas_refund: i64,
    pub output_data: Bytes,
    pub create_address: Option<Address>,
}

impl Default for CallResult {
    fn default() -> Self {
        Self {
            status_code: ExecutionStatus::Returned,
            gas_left: 0,
            gas_refund: 0,
            output_data: Bytes::new(),
            create_address: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub address: Address,
    pub data: Bytes,
    pub topics: Vec<H256>,
}

/// Everything the mock records so tests can assert on what the interpreter
/// asked of its host.
#[derive(Clone, Debug, Default)]
pub struct Recorded {
    pub calls: Vec<Message>,
    pub logs: Vec<LogEntry>,
    pub selfdestructs: Vec<(Address, Address)>,
    pub account_accesses: Vec<Address>,
}

/// A scriptable, in-memory [`Host`] for exercising the interpreter without a
/// real chain backend.
#[derive(Debug)]
pub struct MockedHost {
    pub accounts: HashMap<Address, Account>,
    pub tx_context: TxContext,
    pub call_result: CallResult,
    pub block_hash: H256,
    pub recorded: Mutex<Recorded>,
    warm_accounts: HashSet<Address>,
    warm_storage: HashSet<(Address, H256)>,
}

impl Default for MockedHost {
    fn default() -> Self {
        Self {
            accounts: HashMap::new(),
            tx_context: TxContext {
                tx_gas_price: U256::zero(),
                tx_origin: Address::zero(),
                block_coinbase: Address::zero(),
                block_number: 0,
                block_timestamp: 0,
                block_gas_limit: 0,
                block_difficulty: U256::zero(),
                chain_id: U256::zero(),
                block_base_fee: U256::zero(),
            },
            call_result: CallResult::default(),
            block_hash: H256::zero(),
            recorded: Mutex::new(Recorded::default()),
            warm_accounts: HashSet::new(),
            warm_storage: HashSet::new(),
        }
    }
}

/// EIP-2200's nine-way classification of a single `SSTORE`. Simplified from
/// the spec pseudocode into one function; `dirty` stands in for "has this
/// slot already been written in the current call" since a slot written back
/// to its original value mid-call is still the "already modified" branch
/// even though `original == current` by value at that point.
fn classify(original: H256, current: H256, new: H256, dirty: bool) -> StorageStatus {
    if current == new {
        return StorageStatus::Assigned;
    }
    if !dirty {
        return if original.is_zero() {
            StorageStatus::Added
        } else if new.is_zero() {
            StorageStatus::Deleted
        } else {
            StorageStatus::Modified
        };
    }
    if new == original {
        return if original.is_zero() {
            StorageStatus::AddedDeleted
        } else if current.is_zero() {
            StorageStatus::DeletedRestored
        } else {
            StorageStatus::ModifiedRestored
        };
    }
    if original.is_zero() {
        StorageStatus::DeletedAdded
    } else if new.is_zero() {
        StorageStatus::ModifiedDeleted
    } else {
        StorageStatus::Modified
    }
}

impl Host for MockedHost {
    fn account_exists(&self, address: Address) -> HostResult<bool> {
        Ok(self.accounts.contains_key(&address))
    }

    fn get_storage(&self, address: Address, key: H256) -> HostResult<H256> {
        Ok(self
            .accounts
            .get(&address)
            .and_then(|a| a.storage.get(&key))
            .map(StorageValue::value)
            .unwrap_or_default())
    }

    fn set_storage(&mut self, address: Address, key: H256, value: H256) -> HostResult<StorageStatus> {
        let slot = self
            .accounts
            .entry(address)
            .or_default()
            .storage
            .entry(key)
            .or_insert_with(|| StorageValue {
                original: H256::zero(),
                current: H256::zero(),
                dirty: false,
            });
        let status = classify(slot.original, slot.current, value, slot.dirty);
        slot.current = value;
        slot.dirty = true;
        Ok(status)
    }

    fn get_balance(&self, address: Address) -> HostResult<U256> {
        Ok(self.accounts.get(&address).map(|a| a.balance).unwrap_or_default())
    }

    fn get_code_size(&self, address: Address) -> HostResult<U256> {
        Ok(self
            .accounts
            .get(&address)
            .map(|a| U256::from(a.code.len()))
            .unwrap_or_default())
    }

    fn get_code_hash(&self, address: Address) -> HostResult<H256> {
        Ok(self
            .accounts
            .get(&address)
            .map(|a| H256::from_slice(Keccak256::digest(&a.code).as_slice()))
            .unwrap_or_default())
    }

    fn copy_code(&self, address: Address, offset: usize, buffer: &mut [u8]) -> HostResult<usize> {
        let code = self.accounts.get(&address).map(|a| a.code.as_ref()).unwrap_or(&[]);
        if offset >= code.len() {
            return Ok(0);
        }
        let n = buffer.len().min(code.len() - offset);
        buffer[..n].copy_from_slice(&code[offset..offset + n]);
        Ok(n)
    }

    fn selfdestruct(&mut self, address: Address, beneficiary: Address) -> HostResult<()> {
        self.recorded.lock().selfdestructs.push((address, beneficiary));
        Ok(())
    }

    fn call(&mut self, msg: &Message) -> HostResult<RunOutput> {
        self.recorded.lock().calls.push(msg.clone());
        self.recorded.lock().account_accesses.push(msg.destination);
        let r = &self.call_result;
        Ok(RunOutput {
            status: r.status_code,
            success: r.status_code.is_success(),
            gas_left: r.gas_left,
            gas_refund: r.gas_refund,
            output_data: r.output_data.clone(),
            create_address: if matches!(msg.kind, CallKind::Create | CallKind::Create2 { .. }) {
                r.create_address
            } else {
                None
            },
        })
    }

    fn get_tx_context(&self) -> HostResult<TxContext> {
        Ok(self.tx_context.clone())
    }

    fn get_block_hash(&self, _block_number: u64) -> HostResult<H256> {
        Ok(self.block_hash)
    }

    fn emit_log(&mut self, address: Address, data: &[u8], topics: &[H256]) -> HostResult<()> {
        self.recorded.lock().logs.push(LogEntry {
            address,
            data: Bytes::copy_from_slice(data),
            topics: topics.to_vec(),
        });
        Ok(())
    }

    fn access_account(&mut self, address: Address) -> HostResult<AccessStatus> {
        self.recorded.lock().account_accesses.push(address);
        Ok(if self.warm_accounts.insert(address) {
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        })
    }

    fn access_storage(&mut self, address: Address, key: H256) -> HostResult<AccessStatus> {
        Ok(if self.warm_storage.insert((address, key)) {
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_write_to_zero_slot_is_added() {
        let mut host = MockedHost::default();
        let status = host.set_storage(Address::zero(), H256::zero(), H256::from_low_u64_be(1)).unwrap();
        assert_eq!(status, StorageStatus::Added);
    }

    #[test]
    fn rewriting_to_same_value_is_unchanged() {
        let mut host = MockedHost::default();
        let key = H256::zero();
        host.set_storage(Address::zero(), key, H256::from_low_u64_be(1)).unwrap();
        let status = host.set_storage(Address::zero(), key, H256::from_low_u64_be(1)).unwrap();
        assert_eq!(status, StorageStatus::Assigned);
    }

    #[test]
    fn access_account_is_cold_then_warm() {
        let mut host = MockedHost::default();
        assert_eq!(host.access_account(Address::zero()).unwrap(), AccessStatus::Cold);
        assert_eq!(host.access_account(Address::zero()).unwrap(), AccessStatus::Warm);
    }

    #[test]
    fn call_is_recorded() {
        let mut host = MockedHost::default();
        host.call_result.output_data = Bytes::from_static(&[1, 2, 3]);
        let msg = Message {
            kind: CallKind::Call,
            is_static: false,
            depth: 1,
            gas: 100,
            destination: Address::zero(),
            sender: Address::zero(),
            input_data: Bytes::new(),
            value: U256::zero(),
        };
        let out = host.call(&msg).unwrap();
        assert_eq!(out.output_data, Bytes::from_static(&[1, 2, 3]));
        assert_eq!(host.recorded.lock().calls.len(), 1);
    }
}

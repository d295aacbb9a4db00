//! Stack (C3) and Memory (C4), plus the per-call `ExecutionContext` that
//! glues them to gas, pc and status. Grounded on the teacher's `state.rs`
//! (`Stack(ArrayVec<U256, 1024>)`, `type Memory = Vec<u8>`,
//! `ExecutionState`), renamed to `ExecutionContext` to match §3's
//! terminology and extended with the fields §3 calls out that the teacher's
//! `ExecutionState` didn't carry (status, read-only flag).

use crate::{
    common::{ExecutionStatus, Message, Revision},
    gas::{memory_expansion_cost, num_words, GasMeter},
    word::Word256,
};
use arrayvec::ArrayVec;
use bytes::Bytes;
use ethereum_types::U256;

const STACK_LIMIT: usize = 1024;

/// Bounded LIFO of `Word256`, capacity 1024 (§3). `peek`/`swap`/`dup` index
/// from the top (`0` = top), matching the teacher's `Stack::get`/`swap_top`
/// convention (`get_pos(pos) = len - 1 - pos`).
#[derive(Clone, Debug, Default)]
pub struct Stack(ArrayVec<Word256, STACK_LIMIT>);

impl Stack {
    pub const fn limit() -> usize {
        STACK_LIMIT
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn index_from_top(&self, depth: usize) -> usize {
        self.0.len() - 1 - depth
    }

    /// The dispatch loop's pre-check (§4.2 rule 4) guarantees `len() <
    /// limit()` before any handler that pushes runs, so this can use the
    /// unchecked push the teacher relies on.
    pub fn push(&mut self, value: Word256) {
        debug_assert!(self.0.len() < STACK_LIMIT, "push on a full stack");
        unsafe { self.0.push_unchecked(value) }
    }

    pub fn pop(&mut self) -> Word256 {
        self.0.pop().expect("pop on an empty stack")
    }

    /// `peek(i)`: `0` is the top.
    pub fn peek(&self, depth: usize) -> Word256 {
        self.0[self.index_from_top(depth)]
    }

    pub fn peek_mut(&mut self, depth: usize) -> &mut Word256 {
        let idx = self.index_from_top(depth);
        &mut self.0[idx]
    }

    /// `dup(i)`, `i` in `1..=16`: push a copy of the element at depth `i-1`.
    pub fn dup(&mut self, i: usize) {
        self.push(self.peek(i - 1));
    }

    /// `swap(i)`, `i` in `1..=16`: exchange the top with the element at
    /// depth `i`.
    pub fn swap(&mut self, i: usize) {
        let top = self.0.len() - 1;
        let other = self.index_from_top(i);
        self.0.swap(top, other);
    }
}

/// Byte-addressable, word-rounded memory (§3). Logical length is always a
/// multiple of 32.
#[derive(Clone, Debug, Default)]
pub struct Memory(Vec<u8>);

pub(crate) const MAX_BUFFER_SIZE: u64 = u32::MAX as u64;

/// A validated, already-gas-charged memory window.
#[derive(Clone, Copy, Debug)]
pub struct MemoryRegion {
    pub offset: usize,
    pub size: usize,
}

impl Memory {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Charge and perform expansion so that bytes `[offset, offset+size)`
    /// are addressable. A zero-length access costs and reads nothing
    /// regardless of offset (§3). Returns `None` for a zero-size access,
    /// `Err` on out-of-gas or an offset beyond the representable buffer
    /// size.
    pub fn ensure_capacity(
        &mut self,
        gas: &mut GasMeter,
        offset: U256,
        size: U256,
    ) -> Result<Option<MemoryRegion>, ExecutionStatus> {
        if size.is_zero() {
            return Ok(None);
        }
        if offset > U256::from(MAX_BUFFER_SIZE) || size > U256::from(MAX_BUFFER_SIZE) {
            return Err(ExecutionStatus::OutOfGas);
        }

        let offset = offset.as_usize();
        let size = size.as_usize();
        let new_size = offset + size;
        let current_size = self.0.len();

        if new_size > current_size {
            let new_words = num_words(new_size);
            let current_words = (current_size / 32) as i64;
            gas.deduct(memory_expansion_cost(current_words, new_words))?;
            self.0.resize((new_words * 32) as usize, 0);
        }

        Ok(Some(MemoryRegion { offset, size }))
    }

    pub fn region(&self, region: MemoryRegion) -> &[u8] {
        &self.0[region.offset..region.offset + region.size]
    }

    pub fn region_mut(&mut self, region: MemoryRegion) -> &mut [u8] {
        &mut self.0[region.offset..region.offset + region.size]
    }
}

/// Per-call mutable execution state (§3's "Execution context").
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    pub status: ExecutionStatus,
    pub pc: usize,
    pub gas: GasMeter,
    /// Accumulated SSTORE gas refund (EIP-2200/EIP-3529), reported back in
    /// `RunOutput::gas_refund` (§7).
    pub gas_refund: i64,
    pub stack: Stack,
    pub memory: Memory,
    pub message: Message,
    pub revision: Revision,
    pub read_only: bool,
    pub return_data: Bytes,
    pub output_data: Bytes,
}

impl ExecutionContext {
    pub fn new(message: Message, revision: Revision, read_only: bool) -> Self {
        let gas = GasMeter::new(message.gas);
        Self {
            status: ExecutionStatus::Running,
            pc: 0,
            gas,
            gas_refund: 0,
            stack: Stack::default(),
            memory: Memory::default(),
            message,
            revision,
            read_only,
            return_data: Bytes::new(),
            output_data: Bytes::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_push_pop_peek() {
        let mut stack = Stack::default();
        for (i, v) in [0xdeu64, 0xad, 0xbe, 0xef].into_iter().enumerate() {
            stack.push(v.into());
            assert_eq!(stack.len(), i + 1);
        }
        assert_eq!(stack.peek(2), 0xad.into());
        assert_eq!(stack.pop(), 0xef.into());
        assert_eq!(stack.peek(2), 0xde.into());
    }

    #[test]
    fn stack_dup_and_swap() {
        let mut stack = Stack::default();
        stack.push(1.into());
        stack.push(2.into());
        stack.push(3.into());
        stack.dup(3); // duplicate depth 2 (value 1)
        assert_eq!(stack.peek(0), 1.into());
        stack.swap(1); // swap top (1) with depth 1 (3)
        assert_eq!(stack.peek(0), 3.into());
        assert_eq!(stack.peek(1), 1.into());
    }

    #[test]
    fn memory_expansion_rounds_to_32() {
        let mut mem = Memory::default();
        let mut gas = GasMeter::new(1000);
        mem.ensure_capacity(&mut gas, 1.into(), 1.into()).unwrap();
        assert_eq!(mem.len(), 32);
    }

    #[test]
    fn memory_zero_size_access_is_free_and_reads_nothing() {
        let mut mem = Memory::default();
        let mut gas = GasMeter::new(1000);
        let region = mem.ensure_capacity(&mut gas, 9999.into(), 0.into()).unwrap();
        assert!(region.is_none());
        assert_eq!(gas.left(), 1000);
        assert_eq!(mem.len(), 0);
    }
}

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use strum_macros::Display;

/// EVM protocol revision. Narrower than the teacher's ten-way history: the
/// core only ever needs to pick between these three active tables (§6).
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Revision {
    #[strum(serialize = "Istanbul")]
    Istanbul,
    #[strum(serialize = "Berlin")]
    Berlin,
    #[strum(serialize = "London")]
    London,
}

impl Revision {
    pub const fn latest() -> Self {
        Self::London
    }

    pub fn iter() -> impl Iterator<Item = Self> {
        [Self::Istanbul, Self::Berlin, Self::London].into_iter()
    }
}

/// Terminal (and running) status of an execution, per the error taxonomy in
/// §7. `Running` has no analogue in the teacher's `StatusCode` (which models
/// only terminal states); it exists here so `ExecutionContext::status`
/// doubles as the dispatch loop's continue condition (§4.2 rule 1).
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum ExecutionStatus {
    #[strum(serialize = "running")]
    Running,
    #[strum(serialize = "stopped")]
    Stopped,
    #[strum(serialize = "returned")]
    Returned,
    #[strum(serialize = "reverted")]
    Reverted,
    #[strum(serialize = "suicided")]
    Suicided,
    #[strum(serialize = "invalid instruction")]
    InvalidInstruction,
    #[strum(serialize = "out of gas")]
    OutOfGas,
    #[strum(serialize = "segmentation fault")]
    SegmentationFault,
    #[strum(serialize = "error")]
    Error,
}

impl ExecutionStatus {
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// `success` per the `run()` contract in §6: only `Stopped`, `Returned`
    /// and `Suicided` count. `Reverted` is a well-formed non-error outcome
    /// but `success = false` (§7).
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Stopped | Self::Returned | Self::Suicided)
    }
}

/// The kind of call-like instruction, mirrors the teacher's `CallKind`
/// (`common.rs`) with `Create2`'s salt carried inline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    Call,
    DelegateCall,
    CallCode,
    Create,
    Create2 { salt: H256 },
}

/// Describes an EVM call, including the zero-depth call from a transaction
/// origin. Grounded on the teacher's `common.rs::Message`.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub kind: CallKind,
    pub is_static: bool,
    pub depth: i32,
    pub gas: i64,
    pub destination: Address,
    pub sender: Address,
    pub input_data: Bytes,
    pub value: U256,
}

/// Result of `AnalyzedCode::execute`/`run`, matching §6's entry point and §7's
/// success rule.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOutput {
    pub status: ExecutionStatus,
    pub success: bool,
    pub gas_left: i64,
    pub gas_refund: i64,
    pub output_data: Bytes,
    pub create_address: Option<Address>,
}

#[inline]
pub(crate) fn u256_to_address(v: U256) -> Address {
    H256(v.into()).into()
}

#[inline]
pub(crate) fn address_to_u256(v: Address) -> U256 {
    U256::from_big_endian(&v.0)
}

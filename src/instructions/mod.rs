//! Instruction handlers (C7), one module per opcode family, grounded on the
//! teacher's `instructions/*.rs` layout. The teacher's handlers are
//! `genawaiter`-continuation macros that `yield_` an interrupt to the host
//! and resume with its answer (§5 REDESIGN FLAG); here every handler is a
//! plain function taking `&mut dyn Host` and returning synchronously.

pub(crate) mod arithmetic;
pub(crate) mod bitwise;
pub(crate) mod boolean;
pub(crate) mod call;
pub(crate) mod control;
pub(crate) mod external;
pub mod instruction_table;
pub(crate) mod memory;
pub(crate) mod properties;
pub(crate) mod stack_manip;
pub(crate) mod super_instructions;

pub use properties::PROPERTIES;

use crate::{common::ExecutionStatus, host::HostError};

/// The two ways an instruction handler can fail: a well-defined EVM-level
/// outcome (`ExecutionStatus`, folded into the final `RunOutput`) or the
/// host failing to answer at all (`HostError`, which `run()` propagates as
/// `Err` rather than as a status, per §7).
#[derive(Debug)]
pub(crate) enum HandlerError {
    Status(ExecutionStatus),
    Host(HostError),
}

impl From<ExecutionStatus> for HandlerError {
    fn from(status: ExecutionStatus) -> Self {
        Self::Status(status)
    }
}

impl From<HostError> for HandlerError {
    fn from(err: HostError) -> Self {
        Self::Host(err)
    }
}

pub(crate) type HandlerResult<T> = Result<T, HandlerError>;

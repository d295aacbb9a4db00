#![doc = include_str!("../README.md")]

pub use cache::{ConversionCache, HashCache};
pub use common::{CallKind, ExecutionStatus, Message, Revision, RunOutput};
pub use config::Config;
pub use host::Host;
pub use interpreter::Interpreter;
pub use opcode::OpCode;
pub use state::{ExecutionContext, Stack};
pub use word::Word256;

/// Maximum allowed EVM bytecode size.
pub const MAX_CODE_SIZE: usize = 0x6000;

mod cache;
mod common;
mod config;
mod converter;
mod gas;
pub mod host;
#[doc(hidden)]
pub mod instructions;
mod interpreter;
pub mod opcode;
mod state;
pub mod tracing;
mod word;

#[cfg(feature = "util")]
pub mod util;

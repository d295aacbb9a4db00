//! Test-tooling helpers (`util` feature): a fluent bytecode builder, an
//! in-memory [`Host`](crate::host::Host) stub, and a builder-style test
//! harness over the two. Grounded on the teacher's `util` module, minus the
//! `async` plumbing its synchronous [`Host`](crate::host::Host) no longer
//! needs.

pub mod bytecode;
pub mod mocked_host;
pub mod tester;

pub use bytecode::{Bytecode, CallInstruction};
pub use mocked_host::MockedHost;
pub use tester::EvmTester;

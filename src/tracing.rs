//! Diagnostics hook for the dispatch loop (C8), grounded on the teacher's
//! `tracing::Tracer` trait (`notify_execution_start`/`notify_instruction_start`,
//! a `DUMMY: bool` const the `genawaiter` loop checks to skip notification
//! entirely when tracing is disabled). The teacher backs it with a bespoke
//! `StdoutTracer`; this crate backs it with the `tracing` crate instead,
//! since that's what `developeruche-hybrid` (this pack's other reference
//! repo) reaches for, and because an embedder already running `tracing`
//! elsewhere gets this crate's events for free.

/// Callback fired at each instruction boundary. `DUMMY` lets the dispatch
/// loop skip the call's argument setup entirely for [`NullTracer`], the same
/// zero-cost-when-unused guarantee the teacher's const gives its dummy
/// tracer.
pub trait Tracer {
    const DUMMY: bool = false;

    /// `pc` is the converted stream index (not the original bytecode byte
    /// offset — see `PC`'s own opcode for that), `tag` is the instruction's
    /// raw opcode or pseudo-tag (`crate::converter::tag`).
    fn before_instruction(&self, pc: usize, tag: u16, gas_left: i64);
}

/// No-op tracer, the default for [`crate::interpreter::Interpreter::run`].
pub struct NullTracer;

impl Tracer for NullTracer {
    const DUMMY: bool = true;

    #[inline]
    fn before_instruction(&self, _pc: usize, _tag: u16, _gas_left: i64) {}
}

/// Emits a `tracing::trace!` span per instruction, for the `stats`/`dbg`
/// factory variants (§6) or any embedder that wants a live instruction feed.
#[derive(Default)]
pub struct EventTracer;

impl Tracer for EventTracer {
    fn before_instruction(&self, pc: usize, tag: u16, gas_left: i64) {
        tracing::trace!(pc, tag, gas_left, "dispatch");
    }
}

/// Runtime choice between the two tracers above. An associated-const trait
/// like [`Tracer`] cannot be made into a trait object (there would be no
/// concrete type left to read `DUMMY` off of), so the dispatch loop picks
/// between implementations with this small enum instead of `dyn Tracer`.
pub(crate) enum AnyTracer {
    Null,
    Event(EventTracer),
}

impl AnyTracer {
    #[inline]
    pub(crate) fn before_instruction(&self, pc: usize, tag: u16, gas_left: i64) {
        match self {
            Self::Null => {}
            Self::Event(t) => t.before_instruction(pc, tag, gas_left),
        }
    }
}

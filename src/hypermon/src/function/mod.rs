//! Functions from traces to sets of traces used inside HNL formulas.
//!
//! A formula may apply a function to a quantified trace, e.g. `id(t)` or
//! `samples(t)`. A function is evaluated incrementally alongside the
//! monitor: its outputs accumulate in per-input [`SharedTraceSet`]s that
//! sub-monitors consume through views.

mod id;
mod samples;

pub use id::IdFunction;
pub use samples::{inputs_are_prefixes, SamplesFunction};

use std::sync::Arc;

use crate::error::Result;
use crate::trace::Trace;
use crate::traces::SharedTraceSet;

/// A function from traces to sets of traces, evaluated incrementally.
pub trait TraceFunction {
    /// The output trace set for `input`, created lazily on first request.
    fn trace_set(&mut self, input: &Arc<Trace>) -> Result<&mut SharedTraceSet>;

    /// Advance the computation of all requested outputs as far as the
    /// available inputs allow.
    fn step(&mut self) -> Result<()>;

    /// True when no output set will receive further traces or events.
    fn no_future_updates(&self) -> bool;
}

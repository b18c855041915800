use std::sync::Arc;

use crate::error::Result;
use crate::event::Event;
use crate::trace::{Trace, TraceId};

/// Consumer side of a trace collection: the new-trace handoff channel and
/// the finished signal.
///
/// Implemented by [`TraceSet`](crate::TraceSet) and
/// [`TraceSetView`](crate::TraceSetView); HNL monitors are generic over it
/// so the same step loop runs against an owned set or a view.
pub trait TraceSource: Send + Sync + 'static {
    /// Pop one trace from the new-trace channel, moving it to the accepted
    /// traces. Every created (or announced) trace is returned exactly once
    /// across all calls.
    fn get_new_trace(&self) -> Option<Arc<Trace>>;

    /// True when no future traces or events will arrive and the new-trace
    /// channel has been drained.
    fn finished(&self) -> bool;

    /// Whether a trace with this id exists, new or accepted.
    fn has_trace(&self, trace_id: TraceId) -> bool;

    /// Number of traces, new and accepted.
    fn size(&self) -> usize;
}

/// Producer side of a trace collection.
///
/// Contracts: `new_trace(id)` precedes any other call for that id, ids are
/// unique and non-zero, and `extend_trace` never arrives after
/// `trace_finished`.
pub trait TraceSink {
    /// Create a fresh trace. Fails if the id already exists.
    fn new_trace(&self, trace_id: TraceId) -> Result<Arc<Trace>>;

    /// Append an event to the trace with this id.
    fn extend_trace(&self, trace_id: TraceId, ev: Event) -> Result<()>;

    /// Mark the trace with this id finished. Idempotent.
    fn trace_finished(&self, trace_id: TraceId) -> Result<()>;

    /// Announce that no future traces or events will arrive. Idempotent.
    fn no_future_updates(&self);
}

//! The monitor lifecycle contract and the monitor implementations.

mod atom;
mod hna;
mod hnl;
mod slice_tree;

pub use atom::AtomMonitor;
pub use hna::{HnaMonitor, HnaStats};
pub use hnl::{HnlMonitor, HnlStats, InstanceId};
pub use slice_tree::{SliceTree, SliceTreeNode};

use crate::error::Result;
use crate::trace::TraceId;
use crate::verdict::Verdict;

/// The uniform lifecycle interface implemented by every monitor kind.
///
/// The producer thread drives `new_trace`, `extend_trace`, `trace_finished`
/// and `no_future_updates`; the consumer thread calls `step` in a loop
/// until it returns a definite verdict.
///
/// Contracts: `new_trace(id)` must precede any other call for that id, ids
/// are unique and non-zero, and `extend_trace` never arrives after
/// `trace_finished`.
pub trait Monitor {
    /// Event type consumed by `extend_trace`.
    type Event;

    /// Add a new trace with the given id to the monitor.
    fn new_trace(&self, trace_id: TraceId) -> Result<()>;

    /// Extend the trace with the given id by one event.
    fn extend_trace(&self, trace_id: TraceId, ev: Self::Event) -> Result<()>;

    /// Notify the end of the trace. Idempotent.
    fn trace_finished(&self, trace_id: TraceId) -> Result<()>;

    /// Notify that no new trace nor event can come in the future.
    /// Idempotent.
    fn no_future_updates(&self);

    /// Whether the monitor has a trace with the given id.
    fn has_trace(&self, trace_id: TraceId) -> bool;

    /// Advance the evaluation by one round.
    ///
    /// Returns [`Verdict::Unknown`] when no progress towards a verdict is
    /// possible yet; the caller re-enters. Once a definite verdict has been
    /// produced, every subsequent call returns the same verdict.
    fn step(&self) -> Verdict;
}

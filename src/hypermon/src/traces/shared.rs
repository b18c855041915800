use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MonitorError, Result};
use crate::event::Event;
use crate::trace::{Trace, TraceId};
use crate::traces::view::TraceSetView;

/// A trace collection with multiple read-only views.
///
/// Unlike [`TraceSet`](crate::TraceSet) this collection is used under
/// single-threaded discipline -- it is never modified and read in parallel,
/// so no handoff channel or locking is needed on the set itself. Trace
/// functions produce their output traces into shared sets, and monitors
/// consume them through attached [`TraceSetView`]s.
pub struct SharedTraceSet {
    traces: BTreeMap<TraceId, Arc<Trace>>,
    views: Vec<Arc<TraceSetView>>,
    traces_finished: Arc<AtomicBool>,
}

impl SharedTraceSet {
    /// Create an empty shared trace set.
    pub fn new() -> Self {
        SharedTraceSet {
            traces: BTreeMap::new(),
            views: Vec::new(),
            traces_finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a fresh trace, announcing it to all attached views.
    /// Fails if the id already exists.
    pub fn new_trace(&mut self, trace_id: TraceId) -> Result<Arc<Trace>> {
        if trace_id == 0 {
            return Err(MonitorError::ZeroTraceId);
        }
        if self.traces.contains_key(&trace_id) {
            return Err(MonitorError::DuplicateTrace(trace_id));
        }
        let trace = Arc::new(Trace::new(trace_id));
        self.traces.insert(trace_id, Arc::clone(&trace));
        for view in &self.views {
            view.new_trace(trace_id, Arc::clone(&trace));
        }
        Ok(trace)
    }

    /// Append an event to the trace with this id.
    pub fn extend_trace(&self, trace_id: TraceId, ev: Event) -> Result<()> {
        self.get(trace_id)
            .ok_or(MonitorError::UnknownTrace(trace_id))?
            .append(ev)
    }

    /// Mark the trace with this id finished. Idempotent.
    pub fn trace_finished(&self, trace_id: TraceId) -> Result<()> {
        self.get(trace_id)
            .ok_or(MonitorError::UnknownTrace(trace_id))?
            .set_finished();
        Ok(())
    }

    /// Announce that no future traces or events will arrive. Idempotent.
    pub fn no_future_updates(&self) {
        self.traces_finished.store(true, Ordering::Release);
    }

    /// Whether `no_future_updates` was called.
    pub fn finished(&self) -> bool {
        self.traces_finished.load(Ordering::Acquire)
    }

    /// The trace with this id, if any.
    pub fn get(&self, trace_id: TraceId) -> Option<&Arc<Trace>> {
        self.traces.get(&trace_id)
    }

    /// Whether a trace with this id exists.
    pub fn has_trace(&self, trace_id: TraceId) -> bool {
        self.traces.contains_key(&trace_id)
    }

    /// Whether the finished flag is set on every trace.
    pub fn all_traces_finished(&self) -> bool {
        self.traces.values().all(|t| t.finished())
    }

    /// Number of traces.
    pub fn size(&self) -> usize {
        self.traces.len()
    }

    /// Iterate over the traces in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Trace>> {
        self.traces.values()
    }

    /// Register a view to be notified about new traces. Existing traces are
    /// replayed into the view first. Views are attached in a non-concurrent
    /// phase only.
    pub fn attach_view(&mut self, view: &Arc<TraceSetView>) {
        for trace in self.traces.values() {
            view.new_trace(trace.id(), Arc::clone(trace));
        }
        self.views.push(Arc::clone(view));
    }

    pub(crate) fn finished_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.traces_finished)
    }
}

impl Default for SharedTraceSet {
    fn default() -> Self {
        Self::new()
    }
}

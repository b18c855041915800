use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{MonitorError, Result};
use crate::event::Event;
use crate::trace::{Trace, TraceId};
use crate::traces::store::{TraceSink, TraceSource};
use crate::traces::view::TraceSetView;

struct Inner {
    // traces handed out by get_new_trace
    traces: HashMap<TraceId, Arc<Trace>>,
    // traces created but not yet picked up by the consumer
    new_traces: BTreeMap<TraceId, Arc<Trace>>,
    // views that should be updated about new traces
    views: Vec<Arc<TraceSetView>>,
}

impl Inner {
    fn get(&self, trace_id: TraceId) -> Option<&Arc<Trace>> {
        self.traces
            .get(&trace_id)
            .or_else(|| self.new_traces.get(&trace_id))
    }
}

/// The concurrent owner of observation traces.
///
/// A single mutex protects both the accepted and the new-trace map; the
/// traces' own locks are acquired outside of it. A trace id appears in
/// exactly one of the two maps, and [`TraceSource::get_new_trace`] moves it
/// from new to accepted so every created trace is handed to the consumer
/// exactly once.
pub struct TraceSet {
    inner: Mutex<Inner>,
    traces_finished: Arc<AtomicBool>,
}

impl TraceSet {
    /// Create an empty trace set.
    pub fn new() -> Self {
        TraceSet {
            inner: Mutex::new(Inner {
                traces: HashMap::new(),
                new_traces: BTreeMap::new(),
                views: Vec::new(),
            }),
            traces_finished: Arc::new(AtomicBool::new(false)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a view to be notified about new traces. Existing traces are
    /// replayed into the view first.
    pub fn attach_view(&self, view: &Arc<TraceSetView>) {
        let mut inner = self.lock();
        for trace in inner.traces.values().chain(inner.new_traces.values()) {
            view.new_trace(trace.id(), Arc::clone(trace));
        }
        inner.views.push(Arc::clone(view));
    }

    pub(crate) fn finished_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.traces_finished)
    }
}

impl Default for TraceSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceSink for TraceSet {
    fn new_trace(&self, trace_id: TraceId) -> Result<Arc<Trace>> {
        if trace_id == 0 {
            return Err(MonitorError::ZeroTraceId);
        }

        let mut inner = self.lock();
        if inner.get(trace_id).is_some() {
            return Err(MonitorError::DuplicateTrace(trace_id));
        }
        let trace = Arc::new(Trace::new(trace_id));
        inner.new_traces.insert(trace_id, Arc::clone(&trace));
        // views are updated under the set lock so they observe traces in
        // creation order
        for view in &inner.views {
            view.new_trace(trace_id, Arc::clone(&trace));
        }
        Ok(trace)
    }

    fn extend_trace(&self, trace_id: TraceId, ev: Event) -> Result<()> {
        let trace = {
            let inner = self.lock();
            inner
                .get(trace_id)
                .cloned()
                .ok_or(MonitorError::UnknownTrace(trace_id))?
        };
        // append outside the set lock, the trace owns its own lock
        trace.append(ev)
    }

    fn trace_finished(&self, trace_id: TraceId) -> Result<()> {
        let trace = {
            let inner = self.lock();
            inner
                .get(trace_id)
                .cloned()
                .ok_or(MonitorError::UnknownTrace(trace_id))?
        };
        trace.set_finished();
        Ok(())
    }

    fn no_future_updates(&self) {
        self.traces_finished.store(true, Ordering::Release);
    }
}

impl TraceSource for TraceSet {
    fn get_new_trace(&self) -> Option<Arc<Trace>> {
        let mut inner = self.lock();
        let (id, trace) = inner.new_traces.pop_first()?;
        inner.traces.insert(id, Arc::clone(&trace));
        Some(trace)
    }

    fn finished(&self) -> bool {
        self.traces_finished.load(Ordering::Acquire) && self.lock().new_traces.is_empty()
    }

    fn has_trace(&self, trace_id: TraceId) -> bool {
        self.lock().get(trace_id).is_some()
    }

    fn size(&self) -> usize {
        let inner = self.lock();
        inner.traces.len() + inner.new_traces.len()
    }
}

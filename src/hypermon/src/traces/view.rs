use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::trace::{Trace, TraceId};
use crate::traces::set::TraceSet;
use crate::traces::shared::SharedTraceSet;
use crate::traces::store::TraceSource;

struct Inner {
    traces: HashMap<TraceId, Arc<Trace>>,
    new_traces: BTreeMap<TraceId, Arc<Trace>>,
}

enum FinishedSource {
    // the base set's traces_finished flag
    Flag(Arc<AtomicBool>),
    // a view of a single trace only
    Single(Arc<Trace>),
}

/// A read-only view of traces announced from some base set.
///
/// The view mirrors the new/accepted handoff channel restricted to the
/// traces announced via [`new_trace`](TraceSetView::new_trace), so a
/// consumer of a subset sees each relevant trace exactly once. Views hold
/// shared ownership of the traces they reference; outliving the base set is
/// therefore harmless.
pub struct TraceSetView {
    inner: Mutex<Inner>,
    source: FinishedSource,
}

impl TraceSetView {
    fn with_source(source: FinishedSource) -> Arc<Self> {
        Arc::new(TraceSetView {
            inner: Mutex::new(Inner {
                traces: HashMap::new(),
                new_traces: BTreeMap::new(),
            }),
            source,
        })
    }

    /// A view of all traces of a [`TraceSet`], present and future.
    pub fn of_set(set: &TraceSet) -> Arc<Self> {
        let view = Self::with_source(FinishedSource::Flag(set.finished_flag()));
        set.attach_view(&view);
        view
    }

    /// A view of all traces of a [`SharedTraceSet`], present and future.
    pub fn of_shared(set: &mut SharedTraceSet) -> Arc<Self> {
        let view = Self::with_source(FinishedSource::Flag(set.finished_flag()));
        set.attach_view(&view);
        view
    }

    /// A view of a single trace.
    pub fn of_trace(trace: Arc<Trace>) -> Arc<Self> {
        let view = Self::with_source(FinishedSource::Single(Arc::clone(&trace)));
        view.new_trace(trace.id(), trace);
        view
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Announce a trace to this view. Called by the base set for every new
    /// trace; announcing the same id twice is a no-op.
    pub fn new_trace(&self, trace_id: TraceId, trace: Arc<Trace>) {
        let mut inner = self.lock();
        if inner.traces.contains_key(&trace_id) {
            return;
        }
        inner.new_traces.entry(trace_id).or_insert(trace);
    }

    /// Whether the finished flag is set on every announced trace.
    pub fn all_traces_finished(&self) -> bool {
        let inner = self.lock();
        inner.new_traces.is_empty() && inner.traces.values().all(|t| t.finished())
    }
}

impl TraceSource for TraceSetView {
    fn get_new_trace(&self) -> Option<Arc<Trace>> {
        let mut inner = self.lock();
        let (id, trace) = inner.new_traces.pop_first()?;
        inner.traces.insert(id, Arc::clone(&trace));
        Some(trace)
    }

    fn finished(&self) -> bool {
        if !self.lock().new_traces.is_empty() {
            return false;
        }
        match &self.source {
            FinishedSource::Flag(flag) => flag.load(Ordering::Acquire),
            FinishedSource::Single(trace) => trace.finished(),
        }
    }

    fn has_trace(&self, trace_id: TraceId) -> bool {
        let inner = self.lock();
        inner.traces.contains_key(&trace_id) || inner.new_traces.contains_key(&trace_id)
    }

    fn size(&self) -> usize {
        let inner = self.lock();
        inner.traces.len() + inner.new_traces.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traces::store::TraceSink;

    #[test]
    fn test_view_of_set_sees_each_trace_once() {
        let set = TraceSet::new();
        set.new_trace(1).unwrap();

        let view = TraceSetView::of_set(&set);
        // replayed existing trace
        assert!(view.has_trace(1));

        set.new_trace(2).unwrap();
        assert_eq!(view.size(), 2);

        let mut seen = Vec::new();
        while let Some(t) = view.get_new_trace() {
            seen.push(t.id());
        }
        assert_eq!(seen, vec![1, 2]);
        assert!(view.get_new_trace().is_none());
    }

    #[test]
    fn test_view_finished_tracks_base_flag() {
        let set = TraceSet::new();
        let view = TraceSetView::of_set(&set);
        assert!(!view.finished());

        set.new_trace(1).unwrap();
        set.no_future_updates();
        // the announcement is still queued
        assert!(!view.finished());

        view.get_new_trace().unwrap();
        assert!(view.finished());
    }

    #[test]
    fn test_view_of_shared_set() {
        let mut set = SharedTraceSet::new();
        set.new_trace(7).unwrap();

        let view = TraceSetView::of_shared(&mut set);
        set.new_trace(8).unwrap();

        assert_eq!(view.get_new_trace().unwrap().id(), 7);
        assert_eq!(view.get_new_trace().unwrap().id(), 8);
        assert!(!view.finished());
        set.no_future_updates();
        assert!(view.finished());
    }

    #[test]
    fn test_single_trace_view() {
        let trace = Arc::new(Trace::new(4));
        let view = TraceSetView::of_trace(Arc::clone(&trace));

        assert_eq!(view.get_new_trace().unwrap().id(), 4);
        assert!(!view.finished());
        trace.set_finished();
        assert!(view.finished());
        assert!(view.all_traces_finished());
    }

    #[test]
    fn test_duplicate_announcement_ignored() {
        let trace = Arc::new(Trace::new(4));
        let view = TraceSetView::of_trace(Arc::clone(&trace));
        view.new_trace(4, Arc::clone(&trace));

        assert!(view.get_new_trace().is_some());
        assert!(view.get_new_trace().is_none());

        // announcing an already accepted id is ignored as well
        view.new_trace(4, trace);
        assert!(view.get_new_trace().is_none());
    }
}

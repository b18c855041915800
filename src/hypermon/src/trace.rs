use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::error::{MonitorError, Result};
use crate::event::Event;

/// Identifier of an observation trace.
///
/// Ids are assigned by the producer and must be unique and non-zero.
pub type TraceId = u32;

/// Result of an indexed read from a [`Trace`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceQuery {
    /// The event at the requested index.
    Available(Event),
    /// The index is past the current end but the trace may still grow.
    Waiting,
    /// The trace is finished and the index is past its end.
    End,
}

/// An append-only, finishable sequence of events from one execution of the
/// observed system.
///
/// One producer appends while many consumers read by index. The trace is
/// being read and extended at the same time, so appends and indexed reads
/// go through a lock -- until the trace is finished. Traces vastly outlive
/// their append phase: `set_finished` moves the events into an immutable
/// snapshot that all subsequent reads access without locking.
pub struct Trace {
    id: TraceId,
    live: Mutex<Vec<Event>>,
    frozen: OnceLock<Box<[Event]>>,
}

impl Trace {
    /// Create an empty, unfinished trace.
    ///
    /// # Panics
    ///
    /// Panics if `id` is zero.
    pub fn new(id: TraceId) -> Self {
        assert!(id > 0, "trace ids must be non-zero");
        Trace {
            id,
            live: Mutex::new(Vec::new()),
            frozen: OnceLock::new(),
        }
    }

    /// The id of this trace.
    pub fn id(&self) -> TraceId {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Event>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_at(events: &[Event], idx: usize) -> TraceQuery {
        match events.get(idx) {
            Some(ev) => TraceQuery::Available(*ev),
            None => TraceQuery::End,
        }
    }

    /// Append an event. Returns an error if the trace is already finished.
    pub fn append(&self, ev: Event) -> Result<()> {
        let mut events = self.lock();
        if self.frozen.get().is_some() {
            return Err(MonitorError::TraceFinished(self.id));
        }
        events.push(ev);
        Ok(())
    }

    /// Read the event at `idx`.
    ///
    /// Returns [`TraceQuery::Waiting`] when the index is past the end of an
    /// unfinished trace; step loops treat that as "try again next tick".
    pub fn get(&self, idx: usize) -> TraceQuery {
        if let Some(events) = self.frozen.get() {
            return Self::read_at(events, idx);
        }

        let events = self.lock();
        // set_finished moves the events away under this same lock, re-check
        if let Some(events) = self.frozen.get() {
            return Self::read_at(events, idx);
        }
        match events.get(idx) {
            Some(ev) => TraceQuery::Available(*ev),
            None => TraceQuery::Waiting,
        }
    }

    /// Current number of events. Non-decreasing over time.
    pub fn size(&self) -> usize {
        if let Some(events) = self.frozen.get() {
            return events.len();
        }

        let events = self.lock();
        if let Some(events) = self.frozen.get() {
            return events.len();
        }
        events.len()
    }

    /// Mark the trace finished: no further events will be appended.
    /// Idempotent and safe to call concurrently with readers.
    pub fn set_finished(&self) {
        let mut events = self.lock();
        if self.frozen.get().is_some() {
            return;
        }
        let snapshot = std::mem::take(&mut *events).into_boxed_slice();
        // cannot race: the live lock is held
        let _ = self.frozen.set(snapshot);
    }

    /// Whether the trace is finished. Once true it never becomes false.
    pub fn finished(&self) -> bool {
        self.frozen.get().is_some()
    }

    /// Duplicate this trace's events and finished flag into `other`.
    ///
    /// `other` must be a distinct, empty, unfinished trace.
    pub fn copy_to(&self, other: &Trace) -> Result<()> {
        assert!(
            !std::ptr::eq(self, other),
            "cannot copy a trace into itself"
        );

        let events: Vec<Event> = match self.frozen.get() {
            Some(frozen) => frozen.to_vec(),
            None => self.lock().clone(),
        };
        {
            let mut target = other.lock();
            if other.frozen.get().is_some() {
                return Err(MonitorError::TraceFinished(other.id));
            }
            *target = events;
        }
        if self.finished() {
            other.set_finished();
        }
        Ok(())
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, instrument, warn, Level};

use crate::error::{MonitorError, Result};
use crate::event::{ActionEvent, ActionKind};
use crate::formula::HnaFormula;
use crate::metrics::{METRIC_VERDICTS, METRIC_VERDICT_LABEL};
use crate::monitor::slice_tree::{SliceTree, SliceTreeNode};
use crate::monitor::Monitor;
use crate::trace::TraceId;
use crate::verdict::{Verdict, VerdictCell};

/// Statistics of an HNA monitor.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct HnaStats {
    /// Number of HNL sub-monitors, the root included.
    pub num_hnl_monitors: u64,
}

/// Front-end monitor for a hypernode automaton.
///
/// Each trace starts at the slice-tree root. A plain event is forwarded to
/// the sub-monitor of the trace's current slice; an action event moves the
/// trace along (or creates) the corresponding slice-tree edge. An action
/// with no valid transition makes the automaton reject, which is cached
/// and returned by the next `step`.
pub struct HnaMonitor<H: HnaFormula> {
    tree: SliceTree<H>,
    // which slice each active trace is currently in
    trace_to_slice: Mutex<HashMap<TraceId, Arc<SliceTreeNode<H>>>>,
    traces_finished: AtomicBool,
    result: VerdictCell,
}

impl<H: HnaFormula> HnaMonitor<H> {
    /// Create a monitor whose slice tree holds only the root.
    pub fn new() -> Self {
        HnaMonitor {
            tree: SliceTree::new(),
            trace_to_slice: Mutex::new(HashMap::new()),
            traces_finished: AtomicBool::new(false),
            result: VerdictCell::new(),
        }
    }

    fn slices(&self) -> MutexGuard<'_, HashMap<TraceId, Arc<SliceTreeNode<H>>>> {
        self.trace_to_slice
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The slice tree of this monitor.
    pub fn slice_tree(&self) -> &SliceTree<H> {
        &self.tree
    }

    /// Snapshot of the statistics.
    pub fn stats(&self) -> HnaStats {
        HnaStats {
            num_hnl_monitors: self.tree.num_nodes() as u64,
        }
    }

    fn current_slice(&self, trace_id: TraceId) -> Result<Arc<SliceTreeNode<H>>> {
        self.slices()
            .get(&trace_id)
            .cloned()
            .ok_or(MonitorError::UnknownTrace(trace_id))
    }

    fn decide(&self, verdict: Verdict) -> Verdict {
        let won = self.result.decide(verdict);
        metrics::counter!(METRIC_VERDICTS, METRIC_VERDICT_LABEL => won.as_str()).increment(1);
        won
    }

    /// Route a trace along an action edge, creating the successor slice on
    /// first use. An invalid edge rejects the whole automaton; the trace
    /// stays in its current slice.
    fn take_action(&self, trace_id: TraceId, action: ActionKind) -> Result<()> {
        let node = self.current_slice(trace_id)?;

        let successor = match self.tree.successor(&node, action) {
            Some(existing) => existing,
            None => match self.tree.add_slice(&node, action) {
                Some(created) => created,
                None => {
                    warn!(trace = trace_id, %action, "no transition for action, automaton rejects");
                    self.decide(Verdict::False);
                    return Ok(());
                }
            },
        };

        // the slice observed a complete segment of the trace
        node.trace_finished(trace_id)?;
        successor.new_trace(trace_id)?;
        self.slices().insert(trace_id, successor);
        Ok(())
    }
}

impl<H: HnaFormula> Default for HnaMonitor<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: HnaFormula> Monitor for HnaMonitor<H> {
    type Event = ActionEvent;

    #[instrument(skip(self), level = Level::TRACE)]
    fn new_trace(&self, trace_id: TraceId) -> Result<()> {
        let mut slices = self.slices();
        if slices.contains_key(&trace_id) {
            return Err(MonitorError::DuplicateTrace(trace_id));
        }
        self.tree.root().new_trace(trace_id)?;
        slices.insert(trace_id, Arc::clone(self.tree.root()));
        Ok(())
    }

    fn extend_trace(&self, trace_id: TraceId, ev: ActionEvent) -> Result<()> {
        match ev {
            ActionEvent::Event(event) => self.current_slice(trace_id)?.extend_trace(trace_id, event),
            ActionEvent::Action(action) => self.take_action(trace_id, action),
        }
    }

    #[instrument(skip(self), level = Level::TRACE)]
    fn trace_finished(&self, trace_id: TraceId) -> Result<()> {
        let node = self.current_slice(trace_id)?;
        node.trace_finished(trace_id)?;
        self.slices().remove(&trace_id);
        Ok(())
    }

    fn no_future_updates(&self) {
        self.traces_finished.store(true, Ordering::Release);
    }

    fn has_trace(&self, trace_id: TraceId) -> bool {
        self.slices().contains_key(&trace_id)
    }

    fn step(&self) -> Verdict {
        let current = self.result.load();
        if current.is_definite() {
            return current;
        }

        self.tree.ensure_nodes();

        for node in self.tree.nodes() {
            let verdict = node.step();
            if verdict.is_definite() {
                debug!(node = node.id(), verdict = %verdict, "sub-monitor decided");
                return self.decide(verdict);
            }
        }

        if self.traces_finished.load(Ordering::Acquire) {
            // best-effort propagation; the sub-monitors finalize on
            // subsequent calls
            for node in self.tree.nodes() {
                node.no_future_updates();
            }
        }

        Verdict::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::testutil::{TwoPhaseHna, PHASE_ACTION};

    fn run_to_verdict(monitor: &HnaMonitor<TwoPhaseHna>) -> Verdict {
        for _ in 0..256 {
            let v = monitor.step();
            if v.is_definite() {
                return v;
            }
        }
        Verdict::Unknown
    }

    fn ev(n: u64) -> ActionEvent {
        ActionEvent::Event(Event::new(n, n))
    }

    #[test]
    fn test_traces_route_through_slices() {
        let monitor = HnaMonitor::<TwoPhaseHna>::new();

        for id in [1, 2] {
            monitor.new_trace(id).unwrap();
            monitor.extend_trace(id, ev(1)).unwrap();
            // first action from the root creates the first non-root slice
            monitor.extend_trace(id, ActionEvent::Action(PHASE_ACTION)).unwrap();
        }
        assert_eq!(monitor.stats().num_hnl_monitors, 2);

        monitor.extend_trace(1, ev(2)).unwrap();
        monitor.extend_trace(2, ev(2)).unwrap();
        monitor.extend_trace(2, ev(3)).unwrap();
        for id in [1, 2] {
            monitor.trace_finished(id).unwrap();
            assert!(!monitor.has_trace(id));
        }
        monitor.no_future_updates();

        // the root slices are equal and the phase slices prefix-related
        assert_eq!(run_to_verdict(&monitor), Verdict::True);
        assert_eq!(monitor.step(), Verdict::True);
    }

    #[test]
    fn test_invalid_action_rejects() {
        let monitor = HnaMonitor::<TwoPhaseHna>::new();
        monitor.new_trace(1).unwrap();
        monitor.extend_trace(1, ev(1)).unwrap();
        monitor
            .extend_trace(1, ActionEvent::Action(ActionKind(9)))
            .unwrap();

        assert_eq!(monitor.step(), Verdict::False);
        assert_eq!(monitor.step(), Verdict::False);
    }

    #[test]
    fn test_empty_universe_accepts() {
        let monitor = HnaMonitor::<TwoPhaseHna>::new();
        assert_eq!(monitor.step(), Verdict::Unknown);
        monitor.no_future_updates();
        // the first step after the signal propagates it, the next one
        // collects the root's verdict
        assert_eq!(monitor.step(), Verdict::Unknown);
        assert_eq!(monitor.step(), Verdict::True);
        assert_eq!(monitor.stats().num_hnl_monitors, 1);
    }

    #[test]
    fn test_duplicate_new_trace_fails() {
        let monitor = HnaMonitor::<TwoPhaseHna>::new();
        monitor.new_trace(1).unwrap();
        assert!(matches!(
            monitor.new_trace(1),
            Err(MonitorError::DuplicateTrace(1))
        ));
    }

    #[test]
    fn test_trace_to_slice_points_at_holding_node() {
        let monitor = HnaMonitor::<TwoPhaseHna>::new();
        monitor.new_trace(1).unwrap();
        assert!(monitor.tree.root().has_trace(1));

        monitor
            .extend_trace(1, ActionEvent::Action(PHASE_ACTION))
            .unwrap();
        let slice = monitor.current_slice(1).unwrap();
        assert!(slice.has_trace(1));
    }
}

use std::sync::Arc;

use tracing::trace;

use crate::formula::{AtomState, DecisionState, Formula, SuccessorBuf};
use crate::monitor::hnl::InstanceId;
use crate::trace::{Trace, TraceQuery};
use crate::verdict::Verdict;

/// One configuration of an atom's evaluation automaton: the automaton is in
/// `state` after consuming `p1` events of the first and `p2` events of the
/// second trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct EvaluationState {
    state: AtomState,
    p1: u32,
    p2: u32,
    priority: u16,
}

/// The set of active configurations.
///
/// New configurations are staged into a separate buffer and become live
/// only on an explicit rotate, because successors are produced while the
/// live set is being iterated.
struct EvaluationStateSet {
    cfgs: Vec<EvaluationState>,
    new_cfgs: Vec<EvaluationState>,
}

impl EvaluationStateSet {
    fn new() -> Self {
        EvaluationStateSet {
            cfgs: Vec::new(),
            new_cfgs: Vec::new(),
        }
    }

    /// Stage a configuration. Of duplicates of the same `(state, p1, p2)`
    /// the higher priority wins.
    fn push_new(&mut self, cfg: EvaluationState) {
        if let Some(existing) = self
            .new_cfgs
            .iter_mut()
            .find(|c| c.state == cfg.state && c.p1 == cfg.p1 && c.p2 == cfg.p2)
        {
            if cfg.priority > existing.priority {
                existing.priority = cfg.priority;
            }
            return;
        }
        self.new_cfgs.push(cfg);
    }

    fn rotate(&mut self) {
        self.cfgs.clear();
        self.cfgs.append(&mut self.new_cfgs);
    }

    fn is_empty(&self) -> bool {
        self.cfgs.is_empty() && self.new_cfgs.is_empty()
    }
}

/// Evaluates one atom -- a binary predicate -- over an ordered pair of
/// traces.
///
/// The monitor runs a small NFA whose configurations track positions in
/// both traces. [`step`](AtomMonitor::step) advances every configuration
/// that has events (or trace ends) to look at and leaves waiting
/// configurations untouched, so the monitor never blocks on a lagging
/// producer.
pub struct AtomMonitor {
    #[cfg_attr(not(test), allow(dead_code))]
    id: u64,
    kind: DecisionState,
    t1: Arc<Trace>,
    t2: Arc<Trace>,
    cfgs: EvaluationStateSet,
    used_by: Vec<InstanceId>,
    result: Verdict,
}

impl AtomMonitor {
    pub(crate) fn new<F: Formula>(id: u64, kind: DecisionState, t1: Arc<Trace>, t2: Arc<Trace>) -> Self {
        let mut cfgs = EvaluationStateSet::new();
        cfgs.push_new(EvaluationState {
            state: F::atom_initial_state(kind),
            p1: 0,
            p2: 0,
            priority: 0,
        });
        cfgs.rotate();
        AtomMonitor {
            id,
            kind,
            t1,
            t2,
            cfgs,
            used_by: Vec::new(),
            result: Verdict::Unknown,
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Which atom this monitor evaluates.
    pub fn kind(&self) -> DecisionState {
        self.kind
    }

    /// The verdict reached so far. Once definite, the monitor is retired.
    pub fn verdict(&self) -> Verdict {
        self.result
    }

    pub(crate) fn set_used_by(&mut self, instance: InstanceId) {
        debug_assert!(
            !self.used_by.contains(&instance),
            "instance registered twice on the same atom monitor"
        );
        self.used_by.push(instance);
    }

    pub(crate) fn used_by(&self) -> &[InstanceId] {
        &self.used_by
    }

    /// Advance every configuration by at most one transition.
    pub(crate) fn step<F: Formula>(&mut self, step_num: u64) -> Verdict {
        if self.result.is_definite() {
            return self.result;
        }

        let mut successors = SuccessorBuf::new();
        let mut accepted = false;
        let live = std::mem::take(&mut self.cfgs.cfgs);

        for cfg in &live {
            let q1 = self.t1.get(cfg.p1 as usize);
            let q2 = self.t2.get(cfg.p2 as usize);
            if q1 == TraceQuery::Waiting || q2 == TraceQuery::Waiting {
                // no event to look at yet, keep the configuration
                self.cfgs.push_new(*cfg);
                continue;
            }

            let ev1 = match q1 {
                TraceQuery::Available(ev) => Some(ev),
                _ => None,
            };
            let ev2 = match q2 {
                TraceQuery::Available(ev) => Some(ev),
                _ => None,
            };

            if ev1.is_none() && ev2.is_none() && F::atom_accepting(self.kind, cfg.state) {
                accepted = true;
                break;
            }

            successors.clear();
            F::atom_successors(self.kind, cfg.state, ev1.as_ref(), ev2.as_ref(), &mut successors);
            for succ in successors.items() {
                debug_assert!(
                    (ev1.is_some() || !succ.advance1) && (ev2.is_some() || !succ.advance2),
                    "successor advances past the end of a trace"
                );
                self.cfgs.push_new(EvaluationState {
                    state: succ.state,
                    p1: cfg.p1 + u32::from(succ.advance1),
                    p2: cfg.p2 + u32::from(succ.advance2),
                    priority: succ.priority,
                });
            }
        }

        self.cfgs.rotate();

        self.result = if accepted {
            Verdict::True
        } else if self.cfgs.is_empty() && self.t1.finished() && self.t2.finished() {
            // no configuration left and no future input can revive one
            Verdict::False
        } else {
            Verdict::Unknown
        };

        if self.result.is_definite() {
            trace!(
                atom = self.kind,
                t1 = self.t1.id(),
                t2 = self.t2.id(),
                step_num,
                verdict = %self.result,
                "atom monitor decided"
            );
        }
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::testutil::{EqFormula, PrefixFormula};

    fn trace_of(id: u32, events: &[u64]) -> Arc<Trace> {
        let t = Arc::new(Trace::new(id));
        for &n in events {
            t.append(Event::new(n, n)).unwrap();
        }
        t
    }

    fn run_to_verdict<F: Formula>(atom: &mut AtomMonitor) -> Verdict {
        for step in 0..64 {
            let v = atom.step::<F>(step);
            if v.is_definite() {
                return v;
            }
        }
        Verdict::Unknown
    }

    #[test]
    fn test_equal_traces_accept() {
        let t1 = trace_of(1, &[1, 2, 3]);
        let t2 = trace_of(2, &[1, 2, 3]);
        t1.set_finished();
        t2.set_finished();

        let mut atom = AtomMonitor::new::<EqFormula>(0, 1, t1, t2);
        assert_eq!(run_to_verdict::<EqFormula>(&mut atom), Verdict::True);
        // a retired monitor keeps its verdict
        assert_eq!(atom.step::<EqFormula>(99), Verdict::True);
    }

    #[test]
    fn test_mismatch_rejects() {
        let t1 = trace_of(1, &[1, 2]);
        let t2 = trace_of(2, &[1, 9]);
        t1.set_finished();
        t2.set_finished();

        let mut atom = AtomMonitor::new::<EqFormula>(0, 1, t1, t2);
        assert_eq!(run_to_verdict::<EqFormula>(&mut atom), Verdict::False);
    }

    #[test]
    fn test_waits_for_lagging_trace() {
        let t1 = trace_of(1, &[1, 2]);
        let t2 = trace_of(2, &[1]);
        t1.set_finished();

        let mut atom = AtomMonitor::new::<EqFormula>(0, 1, Arc::clone(&t1), Arc::clone(&t2));
        assert_eq!(atom.step::<EqFormula>(1), Verdict::Unknown);
        assert_eq!(atom.step::<EqFormula>(2), Verdict::Unknown);

        t2.append(Event::new(2, 2)).unwrap();
        t2.set_finished();
        assert_eq!(run_to_verdict::<EqFormula>(&mut atom), Verdict::True);
    }

    #[test]
    fn test_empty_finished_traces_accept() {
        let t1 = trace_of(1, &[]);
        let t2 = trace_of(2, &[]);
        t1.set_finished();
        t2.set_finished();

        // only END reads are exercised here
        let mut atom = AtomMonitor::new::<EqFormula>(0, 1, t1, t2);
        assert_eq!(atom.step::<EqFormula>(1), Verdict::True);
    }

    #[test]
    fn test_prefix_consumes_longer_trace() {
        let t1 = trace_of(1, &[1, 2]);
        let t2 = trace_of(2, &[1, 2, 3, 4]);
        t1.set_finished();
        t2.set_finished();

        let mut atom = AtomMonitor::new::<PrefixFormula>(0, 1, t1, t2);
        assert_eq!(run_to_verdict::<PrefixFormula>(&mut atom), Verdict::True);
    }

    #[test]
    fn test_prefix_rejects_longer_first_trace() {
        let t1 = trace_of(1, &[1, 2, 3]);
        let t2 = trace_of(2, &[1, 2]);
        t1.set_finished();
        t2.set_finished();

        let mut atom = AtomMonitor::new::<PrefixFormula>(0, 1, t1, t2);
        assert_eq!(run_to_verdict::<PrefixFormula>(&mut atom), Verdict::False);
    }

    #[test]
    fn test_staged_duplicates_keep_higher_priority() {
        let mut set = EvaluationStateSet::new();
        set.push_new(EvaluationState {
            state: 0,
            p1: 1,
            p2: 1,
            priority: 1,
        });
        set.push_new(EvaluationState {
            state: 0,
            p1: 1,
            p2: 1,
            priority: 5,
        });
        set.push_new(EvaluationState {
            state: 0,
            p1: 1,
            p2: 1,
            priority: 3,
        });
        set.rotate();
        assert_eq!(set.cfgs.len(), 1);
        assert_eq!(set.cfgs[0].priority, 5);
    }
}

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, instrument, trace, Level};

use crate::error::Result;
use crate::event::Event;
use crate::formula::{BddAction, DecisionState, Formula};
use crate::metrics::{
    METRIC_ACTIVE_HNL_INSTANCES, METRIC_TOTAL_ATOM_MONITORS, METRIC_TOTAL_HNL_INSTANCES,
    METRIC_TOTAL_HNL_MONITORS, METRIC_VERDICTS, METRIC_VERDICT_LABEL,
};
use crate::monitor::atom::AtomMonitor;
use crate::monitor::Monitor;
use crate::trace::{Trace, TraceId};
use crate::traces::{TraceSet, TraceSink, TraceSource};
use crate::verdict::{Verdict, VerdictCell};

/// Stable handle of an HNL instance.
///
/// Instances are kept in a map keyed by these handles so that the back
/// references held by atom monitors survive instance removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

/// A configuration binding a pair of traces to the formula's current
/// decision-table state.
///
/// At any time an instance waits for exactly one live atom monitor, and it
/// is listed in that monitor's user list.
struct HnlInstance {
    t1: Arc<Trace>,
    t2: Arc<Trace>,
    state: DecisionState,
    // id of the atom monitor currently evaluating this instance's subgoal
    atom: u64,
}

/// Lifetime statistics of an HNL monitor.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct HnlStats {
    /// Total number of formula instances created.
    pub num_instances: u64,
    /// Total number of atom monitors created.
    pub num_atoms: u64,
}

struct Counters {
    instances: AtomicU64,
    atoms: AtomicU64,
}

struct Engine<F: Formula> {
    // traces accepted from the source, in arrival order
    known: Vec<Arc<Trace>>,
    instances: HashMap<InstanceId, HnlInstance>,
    atoms: Vec<AtomMonitor>,
    next_instance: u64,
    next_atom: u64,
    step_num: u64,
    _formula: PhantomData<F>,
}

impl<F: Formula> Engine<F> {
    fn new() -> Self {
        Engine {
            known: Vec::new(),
            instances: HashMap::new(),
            atoms: Vec::new(),
            next_instance: 0,
            next_atom: 0,
            step_num: 0,
            _formula: PhantomData,
        }
    }

    /// Accept every trace waiting in the handoff channel and create the
    /// instances the formula pairs it into.
    fn ingest<S: TraceSource>(&mut self, traces: &S, counters: &Counters) {
        while let Some(trace) = traces.get_new_trace() {
            self.known.push(Arc::clone(&trace));
            for (t1, t2) in F::instances_for_new_trace(&trace, &self.known) {
                self.create_instance(t1, t2, counters);
            }
        }
    }

    fn create_instance(&mut self, t1: Arc<Trace>, t2: Arc<Trace>, counters: &Counters) {
        let id = InstanceId(self.next_instance);
        self.next_instance += 1;

        let state = F::INITIAL_STATE;
        let atom = self.create_atom(state, id, Arc::clone(&t1), Arc::clone(&t2), counters);
        trace!(instance = id.0, t1 = t1.id(), t2 = t2.id(), "created instance");
        self.instances.insert(id, HnlInstance { t1, t2, state, atom });

        counters.instances.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(METRIC_TOTAL_HNL_INSTANCES).increment(1);
        metrics::gauge!(METRIC_ACTIVE_HNL_INSTANCES).increment(1);
    }

    /// Construct the atom monitor evaluating `kind` for `user` and append
    /// it to the atom list.
    fn create_atom(
        &mut self,
        kind: DecisionState,
        user: InstanceId,
        t1: Arc<Trace>,
        t2: Arc<Trace>,
        counters: &Counters,
    ) -> u64 {
        let id = self.next_atom;
        self.next_atom += 1;

        let mut atom = AtomMonitor::new::<F>(id, kind, t1, t2);
        atom.set_used_by(user);
        self.atoms.push(atom);

        counters.atoms.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(METRIC_TOTAL_ATOM_MONITORS).increment(1);
        id
    }

    fn remove_instance(&mut self, id: InstanceId) {
        if self.instances.remove(&id).is_some() {
            trace!(instance = id.0, "instance satisfied, retired");
            metrics::gauge!(METRIC_ACTIVE_HNL_INSTANCES).decrement(1);
        }
    }
}

/// Monitor for one HNL formula.
///
/// The monitor accepts traces from its [`TraceSource`], pairs them into
/// instances according to the formula, schedules an atom monitor per
/// instance subgoal and walks the decision table on every atom verdict.
/// The producer-facing operations only touch the (thread-safe) trace
/// source; all evaluation state is owned by the consumer thread calling
/// [`step`](HnlMonitor::step).
pub struct HnlMonitor<F: Formula, S: TraceSource = TraceSet> {
    traces: Arc<S>,
    engine: Mutex<Engine<F>>,
    counters: Counters,
    result: VerdictCell,
}

impl<F: Formula> HnlMonitor<F, TraceSet> {
    /// Create a monitor owning its own trace set.
    pub fn new() -> Self {
        Self::with_source(Arc::new(TraceSet::new()))
    }
}

impl<F: Formula> Default for HnlMonitor<F, TraceSet> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Formula, S: TraceSource> HnlMonitor<F, S> {
    /// Create a monitor consuming traces from an existing source, e.g. a
    /// [`TraceSetView`](crate::TraceSetView) of another set's traces.
    pub fn with_source(traces: Arc<S>) -> Self {
        metrics::counter!(METRIC_TOTAL_HNL_MONITORS).increment(1);
        HnlMonitor {
            traces,
            engine: Mutex::new(Engine::new()),
            counters: Counters {
                instances: AtomicU64::new(0),
                atoms: AtomicU64::new(0),
            },
            result: VerdictCell::new(),
        }
    }

    /// The trace source backing this monitor.
    pub fn traces(&self) -> &Arc<S> {
        &self.traces
    }

    /// Snapshot of the lifetime statistics.
    pub fn stats(&self) -> HnlStats {
        HnlStats {
            num_instances: self.counters.instances.load(Ordering::Relaxed),
            num_atoms: self.counters.atoms.load(Ordering::Relaxed),
        }
    }

    fn decide(&self, verdict: Verdict) -> Verdict {
        let won = self.result.decide(verdict);
        metrics::counter!(METRIC_VERDICTS, METRIC_VERDICT_LABEL => won.as_str()).increment(1);
        won
    }

    /// Advance the evaluation by one round; see [`Monitor::step`].
    ///
    /// One round ingests newly arrived traces, steps every atom monitor,
    /// applies the decision table to each definite atom verdict, ingests
    /// again (verdict processing may have unblocked the channel) and
    /// finally checks the termination rule: no instances left and a
    /// finished trace source means the formula holds.
    pub fn step(&self) -> Verdict {
        let current = self.result.load();
        if current.is_definite() {
            return current;
        }

        let mut engine = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        let engine = &mut *engine;
        engine.step_num += 1;
        let step_num = engine.step_num;

        engine.ingest(self.traces.as_ref(), &self.counters);

        let mut i = 0;
        while i < engine.atoms.len() {
            let verdict = engine.atoms[i].step::<F>(step_num);
            if !verdict.is_definite() {
                i += 1;
                continue;
            }

            let users: Vec<InstanceId> = engine.atoms[i].used_by().to_vec();
            for user in users {
                let Some((state, t1, t2)) = engine
                    .instances
                    .get(&user)
                    .map(|inst| (inst.state, Arc::clone(&inst.t1), Arc::clone(&inst.t2)))
                else {
                    debug_assert!(false, "atom monitor references a removed instance");
                    continue;
                };

                match F::bdd(state, verdict == Verdict::True) {
                    BddAction::ResultFalse => {
                        debug!(
                            t1 = t1.id(),
                            t2 = t2.id(),
                            state,
                            "formula is FALSE on an instance"
                        );
                        return self.decide(Verdict::False);
                    }
                    BddAction::ResultTrue => {
                        engine.remove_instance(user);
                    }
                    BddAction::Goto(next) => {
                        let atom = engine.create_atom(next, user, t1, t2, &self.counters);
                        if let Some(inst) = engine.instances.get_mut(&user) {
                            inst.state = next;
                            inst.atom = atom;
                        }
                    }
                }
            }

            // retire the decided atom monitor; the swapped-in one has not
            // been stepped yet
            engine.atoms.swap_remove(i);
        }

        engine.ingest(self.traces.as_ref(), &self.counters);

        if engine.instances.is_empty() && self.traces.finished() {
            debug_assert!(engine.atoms.is_empty());
            return self.decide(Verdict::True);
        }

        Verdict::Unknown
    }

    /// Checks that every atom monitor's user list matches the instances
    /// currently waiting on it.
    #[cfg(test)]
    pub(crate) fn used_by_invariant_holds(&self) -> bool {
        let engine = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        engine.atoms.iter().all(|atom| {
            let users: std::collections::HashSet<_> = atom.used_by().iter().copied().collect();
            let waiting: std::collections::HashSet<_> = engine
                .instances
                .iter()
                .filter(|(_, inst)| inst.atom == atom.id())
                .map(|(id, _)| *id)
                .collect();
            users == waiting
        })
    }

    #[cfg(test)]
    pub(crate) fn num_live_instances(&self) -> usize {
        self.engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .instances
            .len()
    }
}

impl<F: Formula, S: TraceSource + TraceSink> Monitor for HnlMonitor<F, S> {
    type Event = Event;

    #[instrument(skip(self), level = Level::TRACE)]
    fn new_trace(&self, trace_id: TraceId) -> Result<()> {
        self.traces.new_trace(trace_id).map(|_| ())
    }

    fn extend_trace(&self, trace_id: TraceId, ev: Event) -> Result<()> {
        self.traces.extend_trace(trace_id, ev)
    }

    #[instrument(skip(self), level = Level::TRACE)]
    fn trace_finished(&self, trace_id: TraceId) -> Result<()> {
        self.traces.trace_finished(trace_id)
    }

    fn no_future_updates(&self) {
        self.traces.no_future_updates();
    }

    fn has_trace(&self, trace_id: TraceId) -> bool {
        self.traces.has_trace(trace_id)
    }

    fn step(&self) -> Verdict {
        HnlMonitor::step(self)
    }
}

//! Hand-written formula tables playing the role of generated code in tests.

use std::sync::Arc;

use crate::error::Result;
use crate::event::{ActionKind, Event};
use crate::formula::{
    AtomState, BddAction, DecisionState, Formula, HnaFormula, HnaNodeType, SuccessorBuf,
};
use crate::monitor::{HnlMonitor, Monitor};
use crate::trace::{Trace, TraceId};
use crate::verdict::Verdict;

fn pair_with_earlier(new: &Arc<Trace>, known: &[Arc<Trace>]) -> Vec<(Arc<Trace>, Arc<Trace>)> {
    known
        .iter()
        .filter(|t| t.id() != new.id())
        .map(|t| (Arc::clone(t), Arc::clone(new)))
        .collect()
}

fn eq_successors(state: AtomState, ev1: Option<&Event>, ev2: Option<&Event>, out: &mut SuccessorBuf) {
    if let (Some(a), Some(b)) = (ev1, ev2) {
        if a == b {
            out.push(state, true, true, 0);
        }
    }
}

fn prefix_successors(
    state: AtomState,
    ev1: Option<&Event>,
    ev2: Option<&Event>,
    out: &mut SuccessorBuf,
) {
    match (ev1, ev2) {
        (Some(a), Some(b)) if a == b => out.push(state, true, true, 0),
        // the first trace ended, consume the remainder of the second
        (None, Some(_)) => out.push(state, false, true, 0),
        _ => {}
    }
}

/// `forall t1 t2: t1 = t2` -- all traces are event-wise equal.
pub(crate) struct EqFormula;

impl Formula for EqFormula {
    const INITIAL_STATE: DecisionState = 1;

    fn bdd(state: DecisionState, atom_holds: bool) -> BddAction {
        debug_assert_eq!(state, 1);
        if atom_holds {
            BddAction::ResultTrue
        } else {
            BddAction::ResultFalse
        }
    }

    fn instances_for_new_trace(
        new: &Arc<Trace>,
        known: &[Arc<Trace>],
    ) -> Vec<(Arc<Trace>, Arc<Trace>)> {
        pair_with_earlier(new, known)
    }

    fn atom_initial_state(_atom: DecisionState) -> AtomState {
        0
    }

    fn atom_successors(
        _atom: DecisionState,
        state: AtomState,
        ev1: Option<&Event>,
        ev2: Option<&Event>,
        out: &mut SuccessorBuf,
    ) {
        eq_successors(state, ev1, ev2, out);
    }

    fn atom_accepting(_atom: DecisionState, _state: AtomState) -> bool {
        true
    }
}

/// `forall t1 t2: t1 <= t2` -- every trace is a prefix of every other.
pub(crate) struct PrefixFormula;

impl Formula for PrefixFormula {
    const INITIAL_STATE: DecisionState = 1;

    fn bdd(state: DecisionState, atom_holds: bool) -> BddAction {
        debug_assert_eq!(state, 1);
        if atom_holds {
            BddAction::ResultTrue
        } else {
            BddAction::ResultFalse
        }
    }

    fn instances_for_new_trace(
        new: &Arc<Trace>,
        known: &[Arc<Trace>],
    ) -> Vec<(Arc<Trace>, Arc<Trace>)> {
        pair_with_earlier(new, known)
    }

    fn atom_initial_state(_atom: DecisionState) -> AtomState {
        0
    }

    fn atom_successors(
        _atom: DecisionState,
        state: AtomState,
        ev1: Option<&Event>,
        ev2: Option<&Event>,
        out: &mut SuccessorBuf,
    ) {
        prefix_successors(state, ev1, ev2, out);
    }

    fn atom_accepting(_atom: DecisionState, _state: AtomState) -> bool {
        true
    }
}

/// `forall t1 t2: t1 = t2 or t1 <= t2`, expressed as a two-state decision
/// table: the FALSE branch of the equality atom switches to a prefix atom.
pub(crate) struct EqOrPrefixFormula;

impl Formula for EqOrPrefixFormula {
    const INITIAL_STATE: DecisionState = 1;

    fn bdd(state: DecisionState, atom_holds: bool) -> BddAction {
        match (state, atom_holds) {
            (1, true) => BddAction::ResultTrue,
            (1, false) => BddAction::Goto(2),
            (2, true) => BddAction::ResultTrue,
            (2, false) => BddAction::ResultFalse,
            _ => {
                debug_assert!(false, "state {state} is not in the decision table");
                BddAction::ResultFalse
            }
        }
    }

    fn instances_for_new_trace(
        new: &Arc<Trace>,
        known: &[Arc<Trace>],
    ) -> Vec<(Arc<Trace>, Arc<Trace>)> {
        pair_with_earlier(new, known)
    }

    fn atom_initial_state(_atom: DecisionState) -> AtomState {
        0
    }

    fn atom_successors(
        atom: DecisionState,
        state: AtomState,
        ev1: Option<&Event>,
        ev2: Option<&Event>,
        out: &mut SuccessorBuf,
    ) {
        match atom {
            1 => eq_successors(state, ev1, ev2, out),
            2 => prefix_successors(state, ev1, ev2, out),
            _ => debug_assert!(false, "atom {atom} is not part of the formula"),
        }
    }

    fn atom_accepting(_atom: DecisionState, _state: AtomState) -> bool {
        true
    }
}

/// The action advancing a trace from the root slice into the second phase.
pub(crate) const PHASE_ACTION: ActionKind = ActionKind(1);

/// Tagged sum of the sub-monitor variants of [`TwoPhaseHna`].
pub(crate) enum TwoPhaseSub {
    Root(HnlMonitor<EqFormula>),
    Phase(HnlMonitor<PrefixFormula>),
}

impl Monitor for TwoPhaseSub {
    type Event = Event;

    fn new_trace(&self, trace_id: TraceId) -> Result<()> {
        match self {
            TwoPhaseSub::Root(m) => m.new_trace(trace_id),
            TwoPhaseSub::Phase(m) => m.new_trace(trace_id),
        }
    }

    fn extend_trace(&self, trace_id: TraceId, ev: Event) -> Result<()> {
        match self {
            TwoPhaseSub::Root(m) => m.extend_trace(trace_id, ev),
            TwoPhaseSub::Phase(m) => m.extend_trace(trace_id, ev),
        }
    }

    fn trace_finished(&self, trace_id: TraceId) -> Result<()> {
        match self {
            TwoPhaseSub::Root(m) => m.trace_finished(trace_id),
            TwoPhaseSub::Phase(m) => m.trace_finished(trace_id),
        }
    }

    fn no_future_updates(&self) {
        match self {
            TwoPhaseSub::Root(m) => m.no_future_updates(),
            TwoPhaseSub::Phase(m) => m.no_future_updates(),
        }
    }

    fn has_trace(&self, trace_id: TraceId) -> bool {
        match self {
            TwoPhaseSub::Root(m) => m.has_trace(trace_id),
            TwoPhaseSub::Phase(m) => m.has_trace(trace_id),
        }
    }

    fn step(&self) -> Verdict {
        match self {
            TwoPhaseSub::Root(m) => m.step(),
            TwoPhaseSub::Phase(m) => m.step(),
        }
    }
}

/// A two-node HNA: the root slice requires equal traces, the slice after
/// [`PHASE_ACTION`] requires the prefix relation. Any other action is
/// invalid.
pub(crate) struct TwoPhaseHna;

impl HnaFormula for TwoPhaseHna {
    type Sub = TwoPhaseSub;

    const ROOT: HnaNodeType = HnaNodeType(0);

    fn next_node(node: HnaNodeType, action: ActionKind) -> Option<HnaNodeType> {
        match (node, action) {
            (HnaNodeType(0), PHASE_ACTION) => Some(HnaNodeType(1)),
            _ => None,
        }
    }

    fn create_monitor(node: HnaNodeType) -> TwoPhaseSub {
        match node {
            HnaNodeType(1) => TwoPhaseSub::Phase(HnlMonitor::new()),
            _ => TwoPhaseSub::Root(HnlMonitor::new()),
        }
    }
}

//! Formula tables of the compiled-in properties.
//!
//! In a generated monitor this module is emitted by the code generator from
//! the HNL/HNA formula. These binaries ship two fixed properties:
//! observational determinism for the plain HNL monitor, and a two-phase
//! automaton for the HNA monitor whose phases are separated by the `@1`
//! action.

use std::sync::Arc;

use hypermon::formula::{
    AtomState, BddAction, DecisionState, Formula, HnaFormula, HnaNodeType, SuccessorBuf,
};
use hypermon::{
    ActionKind, Event, HnlMonitor, Monitor, Result, Trace, TraceId, Verdict,
};

// atom automaton states shared by the properties below
const COMPARING: AtomState = 0;
const PREMISE_FAILED: AtomState = 1;

fn one_instance_per_pair(
    new: &Arc<Trace>,
    known: &[Arc<Trace>],
) -> Vec<(Arc<Trace>, Arc<Trace>)> {
    known
        .iter()
        .filter(|t| t.id() != new.id())
        .map(|t| (Arc::clone(t), Arc::clone(new)))
        .collect()
}

/// `forall t1 t2: in(t1) = in(t2) -> out(t1) = out(t2)`.
///
/// The atom advances through both traces in lockstep while they agree. A
/// difference in the input words discharges the premise (the atom accepts
/// whatever follows); a difference in the output words under equal inputs
/// kills the configuration, and with it the atom.
pub struct ObsDeterminism;

impl ObsDeterminism {
    fn successors(
        state: AtomState,
        ev1: Option<&Event>,
        ev2: Option<&Event>,
        out: &mut SuccessorBuf,
    ) {
        match state {
            COMPARING => match (ev1, ev2) {
                (Some(a), Some(b)) if a.in_bits != b.in_bits => {
                    out.push(PREMISE_FAILED, true, true, 0);
                }
                (Some(a), Some(b)) if a.out_bits == b.out_bits => {
                    out.push(COMPARING, true, true, 0);
                }
                // equal inputs, differing outputs: no successor
                (Some(_), Some(_)) => {}
                // one trace has more inputs than the other, the premise
                // cannot hold
                (Some(_), None) => out.push(PREMISE_FAILED, true, false, 0),
                (None, Some(_)) => out.push(PREMISE_FAILED, false, true, 0),
                (None, None) => {}
            },
            _ => match (ev1, ev2) {
                (Some(_), Some(_)) => out.push(PREMISE_FAILED, true, true, 0),
                (Some(_), None) => out.push(PREMISE_FAILED, true, false, 0),
                (None, Some(_)) => out.push(PREMISE_FAILED, false, true, 0),
                (None, None) => {}
            },
        }
    }
}

impl Formula for ObsDeterminism {
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
        // the atom is symmetric, one ordering per pair suffices
        one_instance_per_pair(new, known)
    }

    fn atom_initial_state(_atom: DecisionState) -> AtomState {
        COMPARING
    }

    fn atom_successors(
        _atom: DecisionState,
        state: AtomState,
        ev1: Option<&Event>,
        ev2: Option<&Event>,
        out: &mut SuccessorBuf,
    ) {
        Self::successors(state, ev1, ev2, out);
    }

    fn atom_accepting(_atom: DecisionState, _state: AtomState) -> bool {
        true
    }
}

/// `forall t1 t2: t1 = t2` -- traces must agree event-wise.
pub struct Lockstep;

impl Formula for Lockstep {
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
        one_instance_per_pair(new, known)
    }

    fn atom_initial_state(_atom: DecisionState) -> AtomState {
        COMPARING
    }

    fn atom_successors(
        _atom: DecisionState,
        state: AtomState,
        ev1: Option<&Event>,
        ev2: Option<&Event>,
        out: &mut SuccessorBuf,
    ) {
        if let (Some(a), Some(b)) = (ev1, ev2) {
            if a == b {
                out.push(state, true, true, 0);
            }
        }
    }

    fn atom_accepting(_atom: DecisionState, _state: AtomState) -> bool {
        true
    }
}

/// The action separating the two phases of [`TwoPhase`].
pub const PHASE_ACTION: ActionKind = ActionKind(1);

/// Tagged sum of the sub-monitor variants of [`TwoPhase`].
pub enum TwoPhaseSub {
    /// The first phase monitors observational determinism.
    Observe(HnlMonitor<ObsDeterminism>),
    /// The second phase requires the traces to agree exactly.
    Agree(HnlMonitor<Lockstep>),
}

impl Monitor for TwoPhaseSub {
    type Event = Event;

    fn new_trace(&self, trace_id: TraceId) -> Result<()> {
        match self {
            TwoPhaseSub::Observe(m) => m.new_trace(trace_id),
            TwoPhaseSub::Agree(m) => m.new_trace(trace_id),
        }
    }

    fn extend_trace(&self, trace_id: TraceId, ev: Event) -> Result<()> {
        match self {
            TwoPhaseSub::Observe(m) => m.extend_trace(trace_id, ev),
            TwoPhaseSub::Agree(m) => m.extend_trace(trace_id, ev),
        }
    }

    fn trace_finished(&self, trace_id: TraceId) -> Result<()> {
        match self {
            TwoPhaseSub::Observe(m) => m.trace_finished(trace_id),
            TwoPhaseSub::Agree(m) => m.trace_finished(trace_id),
        }
    }

    fn no_future_updates(&self) {
        match self {
            TwoPhaseSub::Observe(m) => m.no_future_updates(),
            TwoPhaseSub::Agree(m) => m.no_future_updates(),
        }
    }

    fn has_trace(&self, trace_id: TraceId) -> bool {
        match self {
            TwoPhaseSub::Observe(m) => m.has_trace(trace_id),
            TwoPhaseSub::Agree(m) => m.has_trace(trace_id),
        }
    }

    fn step(&self) -> Verdict {
        match self {
            TwoPhaseSub::Observe(m) => m.step(),
            TwoPhaseSub::Agree(m) => m.step(),
        }
    }
}

/// A two-node hypernode automaton: the root slice monitors observational
/// determinism; the [`PHASE_ACTION`] moves a trace into the second slice,
/// which requires exact agreement. Any other action is invalid and rejects.
pub struct TwoPhase;

impl HnaFormula for TwoPhase {
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
            HnaNodeType(1) => TwoPhaseSub::Agree(HnlMonitor::new()),
            _ => TwoPhaseSub::Observe(HnlMonitor::new()),
        }
    }
}

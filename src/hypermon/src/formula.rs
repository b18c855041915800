//! Compile-time formula dispatch.
//!
//! The offline code generator emits, per formula, the atom transition
//! functions, the decision table ("BDD"), the instance-pairing pattern and
//! -- for hypernode automata -- the slice-tree transition table and the
//! sub-monitor factory. The runtime treats these as pure compile-time
//! inputs: monitors are generic over the [`Formula`] and [`HnaFormula`]
//! traits and are monomorphized against the generated implementations.

use std::sync::Arc;

use crate::event::{ActionKind, Event};
use crate::monitor::Monitor;
use crate::trace::Trace;

/// State index into a formula's decision table.
pub type DecisionState = u32;

/// State of an atom's evaluation automaton.
pub type AtomState = u32;

/// One entry of the decision table.
///
/// The table maps `(state, branch)` to an action, where the branch is
/// selected by the last atom verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BddAction {
    /// The whole formula is FALSE for the instance's traces, and with it the
    /// monitored property.
    ResultFalse,
    /// The formula is satisfied for the instance's traces; the instance is
    /// retired.
    ResultTrue,
    /// Transition the instance to this state and evaluate its atom next.
    Goto(DecisionState),
}

/// A successor produced by an atom transition function.
#[derive(Clone, Copy, Debug)]
pub struct AtomSuccessor {
    /// Successor automaton state.
    pub state: AtomState,
    /// Whether the position in the first trace advances.
    pub advance1: bool,
    /// Whether the position in the second trace advances.
    pub advance2: bool,
    /// Tie-break priority: of successors reaching the same configuration,
    /// the one with the higher priority wins.
    pub priority: u16,
}

/// Staged successor buffer handed to [`Formula::atom_successors`].
pub struct SuccessorBuf {
    items: Vec<AtomSuccessor>,
}

impl SuccessorBuf {
    pub(crate) fn new() -> Self {
        SuccessorBuf { items: Vec::new() }
    }

    /// Stage one successor configuration.
    pub fn push(&mut self, state: AtomState, advance1: bool, advance2: bool, priority: u16) {
        self.items.push(AtomSuccessor {
            state,
            advance1,
            advance2,
            priority,
        });
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    pub(crate) fn items(&self) -> &[AtomSuccessor] {
        &self.items
    }
}

/// Formula-specific tables and routines for an HNL monitor.
///
/// Implementations are generated per formula; the runtime makes no
/// decisions of its own about pairing symmetry or atom semantics.
pub trait Formula: Send + Sync + 'static {
    /// Decision-table state fresh instances start in.
    const INITIAL_STATE: DecisionState;

    /// Decision-table lookup for the given state, branching on whether the
    /// last atom verdict was TRUE.
    fn bdd(state: DecisionState, atom_holds: bool) -> BddAction;

    /// The instance-pairing pattern applied when a new trace is accepted.
    ///
    /// `known` holds every trace accepted so far including `new`. Whether
    /// one or both orderings of a pair (or the reflexive pair) are
    /// instantiated is the generator's choice.
    fn instances_for_new_trace(
        new: &Arc<Trace>,
        known: &[Arc<Trace>],
    ) -> Vec<(Arc<Trace>, Arc<Trace>)>;

    /// Initial automaton state of the atom evaluated in decision state
    /// `atom`.
    fn atom_initial_state(atom: DecisionState) -> AtomState;

    /// The atom transition function.
    ///
    /// Receives the events at the current positions of both traces, `None`
    /// standing for the end of the respective trace, and stages zero or
    /// more successors into `out`. A successor must not advance past the
    /// end of a trace.
    fn atom_successors(
        atom: DecisionState,
        state: AtomState,
        ev1: Option<&Event>,
        ev2: Option<&Event>,
        out: &mut SuccessorBuf,
    );

    /// Accepting predicate of the atom's automaton. A configuration in an
    /// accepting state yields TRUE once both traces have been consumed to
    /// their end.
    fn atom_accepting(atom: DecisionState, state: AtomState) -> bool;
}

/// Node type of an HNA slice tree.
///
/// Concrete values are assigned by the code generator; they select which
/// HNL sub-monitor variant a slice-tree node runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HnaNodeType(pub u16);

/// Automaton-specific tables for an HNA monitor.
pub trait HnaFormula: Send + Sync + 'static {
    /// Tagged sum of the HNL monitor variants appearing as slice-tree
    /// nodes. The generated type dispatches the monitor operations to the
    /// variant's concrete monitor.
    type Sub: Monitor<Event = Event> + Send + Sync + 'static;

    /// Node type of the slice-tree root.
    const ROOT: HnaNodeType;

    /// The slice-tree transition table. `None` marks an invalid transition:
    /// the HNA rejects every trace that takes it.
    fn next_node(node: HnaNodeType, action: ActionKind) -> Option<HnaNodeType>;

    /// Construct the sub-monitor for a node of the given type.
    fn create_monitor(node: HnaNodeType) -> Self::Sub;
}

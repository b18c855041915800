//! This crate provides the runtime engine for monitoring hyperproperties.
//!
//! A hyperproperty relates multiple execution traces of an observed system.
//! The engine ingests streams of events (one stream per trace), evaluates
//! binary predicates ("atoms") over pairs of traces, and combines the atom
//! verdicts through a pre-compiled decision table until a single global
//! [`Verdict`] is reached.
//!
//! Two monitor front-ends are provided: [`HnlMonitor`] for plain hypernode
//! logic formulas, and [`HnaMonitor`] for hypernode automata, which route
//! traces through a tree of HNL sub-monitors keyed by action events.
//!
//! Formula-specific dispatch (the atom transition functions, the decision
//! table, the slice-tree transition table) is produced by an offline code
//! generator and bound at build time through the [`formula::Formula`] and
//! [`formula::HnaFormula`] traits.
#![deny(dead_code, missing_docs, unused_mut)]
#![cfg_attr(not(any(test, debug_assertions)), warn(clippy::panic))]
#![cfg_attr(not(any(test, debug_assertions)), warn(clippy::expect_used))]
#![cfg_attr(not(any(test, debug_assertions)), warn(clippy::unwrap_used))]

mod error;
mod event;
mod metrics;
mod trace;
mod verdict;

/// Compile-time formula dispatch bound through traits.
pub mod formula;
/// Functions from traces to sets of traces used inside HNL formulas.
pub mod function;
/// The monitor lifecycle contract and the monitor implementations.
pub mod monitor;
/// Collections of traces and the new-trace handoff channel.
pub mod traces;

#[cfg(test)]
pub(crate) mod testutil;

/// The error type for monitor and trace-store operations.
pub use error::MonitorError;
/// The result type used throughout this crate.
pub use error::Result;
/// An event carrying an action driving slice-tree transitions, or a plain event.
pub use event::ActionEvent;
/// The type of an action event.
pub use event::ActionKind;
/// A fixed-width observation record.
pub use event::Event;
/// Front-end monitor for a hypernode automaton.
pub use monitor::HnaMonitor;
/// Statistics reported by an [`HnaMonitor`].
pub use monitor::HnaStats;
/// Monitor for one hypernode logic formula.
pub use monitor::HnlMonitor;
/// Statistics reported by an [`HnlMonitor`].
pub use monitor::HnlStats;
/// The uniform monitor lifecycle interface.
pub use monitor::Monitor;
/// An append-only, finishable sequence of events from one execution.
pub use trace::Trace;
/// Identifier of an observation trace.
pub use trace::TraceId;
/// Result of an indexed read from a [`Trace`].
pub use trace::TraceQuery;
/// Sequential trace collection shared between views.
pub use traces::SharedTraceSet;
/// Concurrent owner of traces with the new-trace handoff channel.
pub use traces::TraceSet;
/// Read-only view over traces announced from a base set.
pub use traces::TraceSetView;
/// Producer side of a trace collection.
pub use traces::TraceSink;
/// Consumer side of a trace collection.
pub use traces::TraceSource;
/// The three-valued monitoring verdict.
pub use verdict::Verdict;

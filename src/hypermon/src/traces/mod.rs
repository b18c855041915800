//! Collections of traces and the new-trace handoff channel.
//!
//! [`TraceSet`] is the concurrent owner used between the producer thread and
//! a monitor. [`SharedTraceSet`] holds traces under single-threaded
//! discipline, typically as the output of a trace function, and
//! [`TraceSetView`] is a read-only mirror of the handoff channel for a
//! subset of some base set's traces.

mod set;
mod shared;
mod store;
mod view;

pub use set::TraceSet;
pub use shared::SharedTraceSet;
pub use store::{TraceSink, TraceSource};
pub use view::TraceSetView;

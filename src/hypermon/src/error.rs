use crate::trace::TraceId;

/// The error type for monitor and trace-store operations.
///
/// All variants are contract violations of the trace-producer interface;
/// they are never recovered from, the caller reports them and stops.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MonitorError {
    /// A trace with this id was already created.
    #[error("trace {0} already exists")]
    DuplicateTrace(TraceId),
    /// No trace with this id was announced via `new_trace`.
    #[error("unknown trace {0}")]
    UnknownTrace(TraceId),
    /// The trace was already finished when an update arrived.
    #[error("trace {0} is finished and cannot be extended")]
    TraceFinished(TraceId),
    /// Trace ids must be non-zero.
    #[error("trace id 0 is reserved")]
    ZeroTraceId,
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, MonitorError>;

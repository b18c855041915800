use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// The three-valued monitoring verdict.
///
/// The discriminants double as process exit codes: a run that ends with a
/// definite verdict exits with `TRUE = 0` or `FALSE = 1`; `UNKNOWN = 2` is
/// only possible when the engine is forced to exit without an answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Verdict {
    /// The property holds.
    True = 0,
    /// The property is violated.
    False = 1,
    /// Not yet determined.
    Unknown = 2,
}

impl Verdict {
    /// Whether this verdict is `True` or `False`.
    pub fn is_definite(self) -> bool {
        self != Verdict::Unknown
    }

    /// The numeric exit code of this verdict.
    pub fn exit_code(self) -> u8 {
        self as u8
    }

    /// Lower-case name, used as a metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::True => "true",
            Verdict::False => "false",
            Verdict::Unknown => "unknown",
        }
    }

    fn from_u8(raw: u8) -> Verdict {
        match raw {
            0 => Verdict::True,
            1 => Verdict::False,
            _ => Verdict::Unknown,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verdict::True => "TRUE",
            Verdict::False => "FALSE",
            Verdict::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A verdict slot shared between the producer and consumer threads.
///
/// The first definite verdict stored wins; later stores are ignored so that
/// repeated `step()` calls keep returning the verdict that was reached first.
pub(crate) struct VerdictCell(AtomicU8);

impl VerdictCell {
    pub(crate) fn new() -> Self {
        VerdictCell(AtomicU8::new(Verdict::Unknown as u8))
    }

    pub(crate) fn load(&self) -> Verdict {
        Verdict::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Store `verdict` unless a definite verdict was already reached.
    /// Returns the verdict that is now in effect.
    pub(crate) fn decide(&self, verdict: Verdict) -> Verdict {
        match self.0.compare_exchange(
            Verdict::Unknown as u8,
            verdict as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => verdict,
            Err(existing) => Verdict::from_u8(existing),
        }
    }
}

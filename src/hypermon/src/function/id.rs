use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::Result;
use crate::function::TraceFunction;
use crate::trace::{Trace, TraceId, TraceQuery};
use crate::traces::SharedTraceSet;

/// The identity function: `id(t)` is a trace equal to `t`.
///
/// Each requested output set holds a single trace that is an incremental
/// copy of the input; the copy finishes (and its set stops updating) when
/// the input ends.
#[derive(Default)]
pub struct IdFunction {
    sets: HashMap<TraceId, SharedTraceSet>,
    // inputs still being copied into their outputs
    inout: BTreeMap<TraceId, (Arc<Trace>, Arc<Trace>)>,
}

impl IdFunction {
    /// Create the function with no outputs requested yet.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraceFunction for IdFunction {
    fn trace_set(&mut self, input: &Arc<Trace>) -> Result<&mut SharedTraceSet> {
        let id = input.id();
        let set = self.sets.entry(id).or_default();
        if !set.has_trace(id) {
            let output = set.new_trace(id)?;
            self.inout.insert(id, (Arc::clone(input), output));
        }
        Ok(set)
    }

    fn step(&mut self) -> Result<()> {
        let mut copied = Vec::new();
        for (&id, (input, output)) in &self.inout {
            let mut pos = output.size();
            loop {
                match input.get(pos) {
                    TraceQuery::Available(ev) => {
                        output.append(ev)?;
                        pos += 1;
                    }
                    TraceQuery::Waiting => break,
                    TraceQuery::End => {
                        if let Some(set) = self.sets.get(&id) {
                            set.trace_finished(id)?;
                            set.no_future_updates();
                        }
                        copied.push(id);
                        break;
                    }
                }
            }
        }
        for id in copied {
            self.inout.remove(&id);
        }
        Ok(())
    }

    fn no_future_updates(&self) -> bool {
        self.inout.is_empty()
    }
}

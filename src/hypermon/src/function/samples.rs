use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::function::TraceFunction;
use crate::trace::{Trace, TraceId, TraceQuery};
use crate::traces::{SharedTraceSet, TraceSet, TraceSource};

/// True iff the inputs of `t1` are a prefix of the inputs of `t2`.
///
/// Both traces must be finished; only the input words are compared.
pub fn inputs_are_prefixes(t1: &Trace, t2: &Trace) -> bool {
    debug_assert!(t1.finished() && t2.finished());

    let n = t1.size();
    if n > t2.size() {
        return false;
    }
    for i in 0..n {
        match (t1.get(i), t2.get(i)) {
            (TraceQuery::Available(a), TraceQuery::Available(b)) => {
                if a.in_bits != b.in_bits {
                    return false;
                }
            }
            _ => return false,
        }
    }
    true
}

/// The `samples` function: partitions the trace universe by the
/// input-prefix relation.
///
/// Once an input trace finishes, every universe trace whose input-prefix of
/// the input's length matches is copied into the input's output set. The
/// input itself always matches and is part of its own partition.
pub struct SamplesFunction {
    universe: Vec<Arc<Trace>>,
    inputs: HashMap<TraceId, Arc<Trace>>,
    sets: HashMap<TraceId, SharedTraceSet>,
    partitioned: HashSet<TraceId>,
}

impl SamplesFunction {
    /// Build the function over the traces of `universe`, draining its
    /// new-trace channel.
    pub fn new(universe: &TraceSet) -> Self {
        let mut traces = Vec::new();
        while let Some(trace) = universe.get_new_trace() {
            traces.push(trace);
        }
        SamplesFunction {
            universe: traces,
            inputs: HashMap::new(),
            sets: HashMap::new(),
            partitioned: HashSet::new(),
        }
    }
}

impl TraceFunction for SamplesFunction {
    fn trace_set(&mut self, input: &Arc<Trace>) -> Result<&mut SharedTraceSet> {
        self.inputs
            .entry(input.id())
            .or_insert_with(|| Arc::clone(input));
        Ok(self.sets.entry(input.id()).or_default())
    }

    fn step(&mut self) -> Result<()> {
        for (&id, set) in &mut self.sets {
            let Some(input) = self.inputs.get(&id) else {
                continue;
            };
            if !input.finished() {
                continue;
            }
            if !self.partitioned.insert(id) {
                continue;
            }

            // divide the universe by the inputs
            for trace in &self.universe {
                if inputs_are_prefixes(input, trace) {
                    let output = set.new_trace(trace.id())?;
                    trace.copy_to(&output)?;
                    debug_assert!(output.finished());
                }
            }
            set.no_future_updates();
            debug!(input = id, matched = set.size(), "partitioned trace universe");
        }
        Ok(())
    }

    fn no_future_updates(&self) -> bool {
        self.partitioned.len() == self.universe.len()
    }
}

//! CSV trace reader: one file per trace, one event per line.
//!
//! A line has the form `in_bits ; out_bits` where each side is a comma or
//! whitespace separated list of decimal bit indices (smaller than 64); the
//! reader builds a 64-bit word per side by setting those bits. A line of
//! the form `@kind` is an action event. Blank lines are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Context, Result};
use hypermon::{ActionEvent, ActionKind, Event, Monitor, TraceId};
use tracing::{debug, trace};

use crate::cmd::Cli;

/// One parsed line of a trace file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsvRecord {
    /// A plain event.
    Event(Event),
    /// An action event.
    Action(ActionKind),
}

impl CsvRecord {
    /// Convert into the event type of a plain HNL monitor. Fails on action
    /// events, which only hypernode automata consume.
    pub fn into_event(self) -> Result<Event> {
        match self {
            CsvRecord::Event(ev) => Ok(ev),
            CsvRecord::Action(kind) => {
                bail!("action event {kind} is not supported by this monitor")
            }
        }
    }

    /// Convert into the event type of an HNA monitor.
    pub fn into_action_event(self) -> Result<ActionEvent> {
        Ok(match self {
            CsvRecord::Event(ev) => ActionEvent::Event(ev),
            CsvRecord::Action(kind) => ActionEvent::Action(kind),
        })
    }
}

fn parse_bits(side: &str, ignore_unknown: bool) -> Result<u64> {
    let mut word = 0u64;
    for token in side
        .split([',', ' ', '\t'])
        .filter(|token| !token.is_empty())
    {
        match token.parse::<u32>() {
            Ok(bit) if bit < 64 => word |= 1u64 << bit,
            Ok(bit) => bail!("bit index {bit} out of range, variables are at most 64-bit"),
            Err(_) if ignore_unknown => trace!(token, "ignoring unknown symbol"),
            Err(_) => bail!("unknown symbol {token:?} in input"),
        }
    }
    Ok(word)
}

/// Parse one logical line. Returns `None` for blank lines.
pub fn parse_line(line: &str, ignore_unknown: bool) -> Result<Option<CsvRecord>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if let Some(kind) = line.strip_prefix('@') {
        let kind: u16 = kind
            .trim()
            .parse()
            .with_context(|| format!("invalid action kind in line {line:?}"))?;
        return Ok(Some(CsvRecord::Action(ActionKind(kind))));
    }

    let Some((in_side, out_side)) = line.split_once(';') else {
        bail!("line {line:?} has no semicolon");
    };
    Ok(Some(CsvRecord::Event(Event::new(
        parse_bits(in_side, ignore_unknown)?,
        parse_bits(out_side, ignore_unknown)?,
    ))))
}

/// An open trace file feeding one trace of a monitor.
pub struct CsvEventsStream {
    trace_id: TraceId,
    path: PathBuf,
    reader: BufReader<File>,
    finished: bool,
    events_read: u64,
}

impl CsvEventsStream {
    /// Open a trace file.
    pub fn open(path: &Path, trace_id: TraceId) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed opening file '{}'", path.display()))?;
        Ok(CsvEventsStream {
            trace_id,
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            finished: false,
            events_read: 0,
        })
    }

    /// Whether the file has been fully read.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Read at most `limit` events into `monitor`, notifying it when the
    /// file ends.
    fn pump<M, C>(&mut self, monitor: &M, limit: u64, ignore_unknown: bool, convert: &C) -> Result<()>
    where
        M: Monitor,
        C: Fn(CsvRecord) -> Result<M::Event>,
    {
        let mut line = String::new();
        let mut read = 0u64;
        while read < limit && !self.finished {
            line.clear();
            let n = self
                .reader
                .read_line(&mut line)
                .with_context(|| format!("reading '{}'", self.path.display()))?;
            if n == 0 {
                self.finished = true;
                monitor.trace_finished(self.trace_id)?;
                debug!(
                    trace = self.trace_id,
                    events = self.events_read,
                    "trace finished"
                );
                break;
            }

            let Some(record) = parse_line(&line, ignore_unknown)
                .with_context(|| format!("in '{}'", self.path.display()))?
            else {
                continue;
            };
            trace!(trace = self.trace_id, ?record, "IN");
            monitor.extend_trace(self.trace_id, convert(record)?)?;
            self.events_read += 1;
            read += 1;
        }
        Ok(())
    }
}

/// Drive all input files into `monitor` until every file is exhausted or
/// `running` is cleared.
///
/// At most `--open-files-limit` files are open at once; each gets one trace
/// with ids assigned in argument order starting at 1. When the last stream
/// ends the monitor is told that no future updates will arrive.
pub fn read_csv<M, C>(cli: &Cli, monitor: &M, running: &AtomicBool, convert: C) -> Result<()>
where
    M: Monitor,
    C: Fn(CsvRecord) -> Result<M::Event>,
{
    debug!(inputs = cli.inputs.len(), "reading CSV events");

    let ignore_unknown = !cli.no_ignore_unknown;
    let read_limit = cli.read_limit.unwrap_or(u64::MAX);
    let mut streams: Vec<CsvEventsStream> = Vec::new();
    let mut next_input = 0usize;

    while running.load(Ordering::Acquire) {
        // check if we have new files to open
        if next_input < cli.inputs.len() && streams.len() < cli.open_files_limit {
            let trace_id = (next_input + 1) as TraceId;
            let stream = CsvEventsStream::open(&cli.inputs[next_input], trace_id)?;
            monitor.new_trace(trace_id)?;
            streams.push(stream);
            next_input += 1;
        }

        for stream in &mut streams {
            stream.pump(monitor, read_limit, ignore_unknown, &convert)?;
        }
        streams.retain(|stream| !stream.finished());

        if streams.is_empty() && next_input == cli.inputs.len() {
            monitor.no_future_updates();
            break;
        }
    }
    Ok(())
}

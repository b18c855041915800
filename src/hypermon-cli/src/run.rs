//! The producer/consumer harness shared by the monitor binaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Result};
use hypermon::{Monitor, Verdict};
use tracing_subscriber::EnvFilter;

use crate::cmd::Cli;
use crate::csv::{read_csv, CsvRecord};

/// Install the fmt subscriber, filtered by `RUST_LOG`, writing to stderr so
/// the verdict report stays alone on stdout.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Feed the input files into `monitor` from a producer thread and step the
/// monitor on this thread until it reaches a definite verdict.
///
/// Input errors are fatal to the producer: it reports a single diagnostic
/// and aborts the process, mid-stream traces included.
pub fn run_monitor<M, C>(cli: &Cli, monitor: &Arc<M>, convert: C) -> Result<Verdict>
where
    M: Monitor + Send + Sync + 'static,
    C: Fn(CsvRecord) -> Result<M::Event> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(true));

    let producer = thread::spawn({
        let monitor = Arc::clone(monitor);
        let running = Arc::clone(&running);
        let cli = cli.clone();
        move || {
            if let Err(err) = read_csv(&cli, monitor.as_ref(), &running, convert) {
                eprintln!("error: {err:#}");
                std::process::exit(3);
            }
        }
    });

    let verdict = loop {
        let v = monitor.step();
        if v.is_definite() {
            break v;
        }
        thread::yield_now();
    };

    // stop the producer if events are still coming
    running.store(false, Ordering::Release);
    if producer.join().is_err() {
        bail!("input thread panicked");
    }

    Ok(verdict)
}

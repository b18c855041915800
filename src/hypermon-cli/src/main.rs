//! Monitor binary for the pairwise observational-determinism property.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use hypermon::{HnlMonitor, HnlStats, Verdict};
use hypermon_cli::cmd::Cli;
use hypermon_cli::formula::ObsDeterminism;
use hypermon_cli::run::{init_tracing, run_monitor};

fn report(cli: &Cli, verdict: Verdict, stats: HnlStats) {
    if cli.stats_json {
        println!(
            "{}",
            serde_json::json!({ "verdict": verdict.to_string(), "stats": stats })
        );
        return;
    }
    println!(" -- verdict --");
    println!("Formula is {verdict}");
    println!(" -- stats --");
    println!("  Total formula instances: {}", stats.num_instances);
    println!("  Total atom monitors: {}", stats.num_atoms);
}

fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    cli.validate()?;

    let monitor = Arc::new(HnlMonitor::<ObsDeterminism>::new());
    let verdict = run_monitor(&cli, &monitor, hypermon_cli::csv::CsvRecord::into_event)?;

    report(&cli, verdict, monitor.stats());
    Ok(ExitCode::from(verdict.exit_code()))
}

//! Monitor binary for the two-phase hypernode automaton.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use hypermon::{HnaMonitor, HnaStats, Verdict};
use hypermon_cli::cmd::Cli;
use hypermon_cli::formula::TwoPhase;
use hypermon_cli::run::{init_tracing, run_monitor};

fn report(cli: &Cli, verdict: Verdict, stats: HnaStats) {
    if cli.stats_json {
        println!(
            "{}",
            serde_json::json!({ "verdict": verdict.to_string(), "stats": stats })
        );
        return;
    }
    println!(" -- verdict --");
    if verdict == Verdict::True {
        println!("HNA accepts");
    } else if verdict == Verdict::False {
        println!("HNA rejects");
    }
    println!(" -- stats --");
    println!("  Number of HNL monitors: {}", stats.num_hnl_monitors);
}

fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    cli.validate()?;

    let monitor = Arc::new(HnaMonitor::<TwoPhase>::new());
    let verdict = run_monitor(&cli, &monitor, hypermon_cli::csv::CsvRecord::into_action_event)?;

    report(&cli, verdict, monitor.stats());
    Ok(ExitCode::from(verdict.exit_code()))
}

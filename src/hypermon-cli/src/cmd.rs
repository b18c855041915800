//! Command-line surface of the monitor binaries.

use std::path::PathBuf;

use anyhow::{bail, Result};

/// Monitor a hyperproperty over a set of observation traces.
///
/// Every input file holds one trace; each line of a file is one event of
/// the form `in_bits ; out_bits`, where both sides list the decimal indices
/// of the bits set in the corresponding 64-bit word. The process exit code
/// is the numeric verdict (TRUE = 0, FALSE = 1).
#[derive(Clone, Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Read inputs as CSV files. This is the default when the monitor was
    /// generated without a fixed input channel, as this one was.
    #[arg(long)]
    pub csv: bool,

    /// Lines specify changes in the state (signal semantics).
    #[arg(long)]
    pub signal: bool,

    /// Lines in the input files represent sets of atomic propositions
    /// instead of variable assignments.
    #[arg(long)]
    pub aps: bool,

    /// Do not ignore unknown variables and constants in the input.
    #[arg(long = "no-ignore-unknown")]
    pub no_ignore_unknown: bool,

    /// Print the verdict and statistics as a JSON object instead of text.
    #[arg(long)]
    pub stats_json: bool,

    /// Maximum number of simultaneously open trace files.
    #[arg(long, default_value_t = 64)]
    pub open_files_limit: usize,

    /// Maximum number of events read from one stream per iteration.
    #[arg(long)]
    pub read_limit: Option<u64>,

    /// Input trace files, one file per trace.
    pub inputs: Vec<PathBuf>,
}

impl Cli {
    /// Reject option combinations this monitor generation does not support.
    pub fn validate(&self) -> Result<()> {
        if self.aps && self.signal {
            bail!("--aps and --signal are mutually exclusive");
        }
        if self.aps {
            bail!("--aps traces are not supported by this monitor");
        }
        if self.signal {
            bail!("--signal traces are not supported by this monitor");
        }
        if self.open_files_limit == 0 {
            bail!("--open-files-limit must be at least 1");
        }
        if self.read_limit == Some(0) {
            bail!("--read-limit must be at least 1");
        }
        Ok(())
    }
}

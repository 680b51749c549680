//! qecc - compile QEC check schedules into Stim circuits
//!
//! ```bash
//! # Compile a job file to Stim text
//! qecc compile job.json -o circuit.stim
//!
//! # Summarise an existing Stim file
//! qecc check circuit.stim
//! ```

use clap::Parser;
use qec_compiler::api::{init_logging, run, Cli};
use tracing::error;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = run(cli) {
        error!(error = %e, "qecc failed");
        eprintln!("Error: {}", e);
        std::process::exit(if e.is_structural() { 2 } else { 1 });
    }
}

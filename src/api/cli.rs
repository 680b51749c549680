//! Command-line interface for the schedule compiler

use crate::circuit::Program;
use crate::config::CompileJob;
use crate::{Result, VERSION};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable overriding the log filter
pub const LOG_ENV: &str = "QECC_LOG";

/// Compile stabilizer-check schedules into Stim circuits
#[derive(Debug, Parser)]
#[command(name = "qecc")]
#[command(version = VERSION)]
#[command(about = "Compile QEC check schedules into tick-scheduled Stim circuits")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); QECC_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile a JSON job file
    Compile {
        /// Job description
        job: PathBuf,

        /// Write the program here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit the program as JSON instead of Stim text
        #[arg(long)]
        json: bool,

        /// Print the compilation report to stderr
        #[arg(long)]
        report: bool,
    },

    /// Parse a Stim file and print a summary
    Check {
        /// Stim circuit file
        file: PathBuf,
    },
}

/// Install the global tracing subscriber
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

/// Execute a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Compile {
            job,
            output,
            json,
            report,
        } => compile(&job, output.as_deref(), json, report),
        Command::Check { file } => {
            println!("{}", check(&file)?);
            Ok(())
        }
    }
}

fn compile(job: &Path, output: Option<&Path>, json: bool, report: bool) -> Result<()> {
    let job = CompileJob::from_file(job)?;
    job.validate()?;
    let compiled = job.run()?;

    let rendered = if json {
        compiled.program.to_json()?
    } else {
        compiled.program.to_stim()
    };
    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            info!(path = %path.display(), "program written");
        }
        None => print!("{}", rendered),
    }
    if report {
        eprintln!("{}", serde_json::to_string_pretty(&compiled.report)?);
    }
    Ok(())
}

/// Summarise a Stim file
pub fn check(file: &Path) -> Result<String> {
    let text = std::fs::read_to_string(file)?;
    let program = Program::from_stim(&text)?;
    Ok(summary(&program))
}

fn summary(program: &Program) -> String {
    format!(
        "ticks: {}\nmeasurements: {}\ndetectors: {}\nobservables: {}",
        program.tick_count(),
        program.measurement_count(),
        program.detector_count(),
        program.observable_count()
    )
}

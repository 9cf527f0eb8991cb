//! cprf-audit CLI - CPRF data-quality audit
//!
//! Command-line interface over the audit pipeline.

use std::{path::PathBuf, process::ExitCode};

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod audit;
mod basic;

/// cprf-audit - Data-quality audit of CPRF delivery extracts
#[derive(Parser)]
#[command(name = "cprf-audit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit an extract and export the flagged records
    Run {
        /// Path to the extract (.csv, .tsv, .xlsx, .xls, .xlsm, .ods)
        input: PathBuf,
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the target program subtype
        #[arg(long)]
        subtype: Option<String>,
        /// Directory for the exported files
        #[arg(short, long, default_value = "cprf_issues")]
        output_dir: PathBuf,
        /// Directory holding the run counter (defaults to the user data dir)
        #[arg(long)]
        counter_dir: Option<PathBuf>,
        /// Print the summary only, without exporting
        #[arg(long)]
        no_export: bool,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// List the available checks
    Checks {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Show the columns an extract must and should provide
    Columns {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Initialise the tracing subscriber on stderr.
///
/// `RUST_LOG` applies unless `-v` is given; the default level is `warn`.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Run the cprf-audit CLI.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            input,
            config,
            subtype,
            output_dir,
            counter_dir,
            no_export,
            format,
        } => audit::cmd_run(&audit::RunArgs {
            input,
            config,
            subtype,
            output_dir,
            counter_dir,
            no_export,
            format,
        }),
        Commands::Checks { format } => basic::cmd_checks(&format),
        Commands::Columns { config } => basic::cmd_columns(config.as_ref()),
        Commands::Config { config } => basic::cmd_config(config.as_ref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

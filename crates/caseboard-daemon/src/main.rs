//! Caseboard CLI
//!
//! Runs a case through board review and the validator pass from the
//! terminal:
//! - `run` submits a case, waits for the job and prints it
//! - `validate` prints the validation report for a case
//! - `audit-tail` prints the most recent audit events

use caseboard_daemon::{init_tracing, Caseboard, CaseboardConfig, DaemonError, DaemonResult};
use caseboard_types::Case;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Caseboard CLI
#[derive(Parser)]
#[command(name = "caseboard")]
#[command(about = "Caseboard - evidence-routed specialist board review", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CASEBOARD_CONFIG", global = true)]
    config: Option<String>,

    /// Log level (overrides the configured level)
    #[arg(long, env = "CASEBOARD_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "CASEBOARD_LOG_JSON", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a case, wait for the job and print it as JSON
    Run {
        /// Case file (JSON object)
        case: PathBuf,

        /// Seconds to wait for the job
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },

    /// Run the validator pass and print the report
    Validate {
        /// Case file (JSON object)
        case: PathBuf,
    },

    /// Print recent audit events
    AuditTail {
        /// Number of events
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    let mut config = CaseboardConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }
    init_tracing(&config.logging.level, config.logging.json)?;

    let caseboard = Caseboard::from_config(&config).await?;

    match cli.command {
        Commands::Run { case, timeout_secs } => {
            let case = read_case(&case)?;
            let job = caseboard
                .run_case(case, Duration::from_secs(timeout_secs))
                .await?;
            print_json(&job)
        }
        Commands::Validate { case } => {
            let case = read_case(&case)?;
            let report = caseboard.validate(&case).await?;
            print_json(&report)
        }
        Commands::AuditTail { limit } => {
            for event in caseboard.audit_tail(limit).await? {
                println!("{}", serde_json::to_string(&event)?);
            }
            Ok(())
        }
    }
}

fn read_case(path: &Path) -> DaemonResult<Case> {
    let raw = std::fs::read_to_string(path).map_err(|source| DaemonError::Input {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Case::new(serde_json::from_str(&raw)?))
}

fn print_json<T: Serialize>(value: &T) -> DaemonResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

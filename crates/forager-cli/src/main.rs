//! Forager CLI - deterministic run orchestration
//!
//! Usage:
//!   forager init                     Write default config to .forager/
//!   forager run --request <file>     Execute a run request (null adapter)
//!   forager plan --request <file>    Print the canonical step order
//!   forager verify-ledger <file>     Re-verify an exported event chain
//!   forager invariance --request <file>  Certify hash reproducibility

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use forager_core::{ForagerConfig, RunRequest};
use forager_kernel::{InMemoryPolicyRegistry, InvarianceHarness, Kernel, NullAdapter};
use forager_ledger::{validate_chain, Ledger, LedgerEvent};
use forager_planning::build_plan;

#[derive(Parser)]
#[command(name = "forager")]
#[command(version, about = "Deterministic run orchestration")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .forager/config.toml
    Init {
        /// Repository path (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Execute a run request with the null adapter
    Run {
        /// Run request file (JSON)
        #[arg(long, value_name = "FILE")]
        request: PathBuf,

        /// Export the ledger events after the run
        #[arg(long, value_name = "FILE")]
        ledger_out: Option<PathBuf>,
    },

    /// Print the canonical step order for a request
    Plan {
        /// Run request file (JSON)
        #[arg(long, value_name = "FILE")]
        request: PathBuf,
    },

    /// Re-verify an exported ledger event chain
    VerifyLedger {
        /// Ledger export file (JSON array of events)
        file: PathBuf,
    },

    /// Run the invariance harness against a fixed request
    Invariance {
        /// Run request file (JSON)
        #[arg(long, value_name = "FILE")]
        request: PathBuf,

        /// Number of runs (defaults from .forager/config.toml)
        #[arg(short = 'n', long)]
        runs: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => cmd_init(&path),
        Commands::Run {
            request,
            ledger_out,
        } => cmd_run(&request, ledger_out),
        Commands::Plan { request } => cmd_plan(&request),
        Commands::VerifyLedger { file } => cmd_verify_ledger(&file),
        Commands::Invariance { request, runs } => cmd_invariance(&request, runs),
    }
}

fn cmd_init(path: &Path) -> Result<()> {
    ForagerConfig::write_default(path)?;
    info!("wrote {}", path.join(".forager/config.toml").display());
    Ok(())
}

fn cmd_run(request_path: &Path, ledger_out: Option<PathBuf>) -> Result<()> {
    let request = load_request(request_path)?;
    let config = ForagerConfig::load_or_default(Path::new("."))?;

    let ledger = Arc::new(Ledger::new());
    let kernel = Kernel::new(
        Box::new(NullAdapter),
        Box::new(InMemoryPolicyRegistry::new()),
        Arc::clone(&ledger),
    );
    let outcome = kernel.run(&request)?;

    println!("{}", serde_json::to_string_pretty(&outcome.run_result)?);

    if let Some(path) = ledger_out.or(config.ledger_export) {
        let events = ledger.read_all();
        std::fs::write(&path, serde_json::to_string_pretty(&events)?)
            .with_context(|| format!("writing ledger export {}", path.display()))?;
        info!("exported {} ledger event(s) to {}", events.len(), path.display());
    }
    Ok(())
}

fn cmd_plan(request_path: &Path) -> Result<()> {
    let request = load_request(request_path)?;
    match build_plan(&request.steps) {
        Ok(plan) => {
            for step_id in &plan.ordered_step_ids {
                println!("{}", step_id);
            }
            Ok(())
        }
        Err(plan_error) => bail!("planning failed: {}", plan_error),
    }
}

fn cmd_verify_ledger(file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("reading ledger export {}", file.display()))?;
    let events: Vec<LedgerEvent> = serde_json::from_str(&content)
        .with_context(|| format!("parsing ledger export {}", file.display()))?;

    if validate_chain(&events) {
        println!("ledger chain intact ({} events)", events.len());
        Ok(())
    } else {
        bail!("ledger chain BROKEN ({} events)", events.len())
    }
}

fn cmd_invariance(request_path: &Path, runs: Option<usize>) -> Result<()> {
    let request = load_request(request_path)?;
    let config = ForagerConfig::load_or_default(Path::new("."))?;
    let runs_required = runs.unwrap_or(config.runs_required);

    let harness = InvarianceHarness::new(runs_required);
    let report = harness.certify(
        || {
            Kernel::new(
                Box::new(NullAdapter),
                Box::new(InMemoryPolicyRegistry::new()),
                Arc::new(Ledger::new()),
            )
        },
        &request,
    )?;

    print!("{}", report);
    if !report.passed() {
        bail!("invariance certification failed");
    }
    Ok(())
}

fn load_request(path: &Path) -> Result<RunRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading request file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing run request {}", path.display()))
}

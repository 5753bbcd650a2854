//! Encounter CLI - Command-line driver for the clinical reasoning engine
//!
//! This CLI gives developers and clinical-content reviewers a terminal
//! interface to:
//! - Replay a transcript file segment by segment through one encounter session
//! - Inspect the evidence extracted from a piece of text
//! - List the condition catalog of a knowledge base
//! - Validate an alternate knowledge file before it ships

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use clinical_reasoning::{ClinicalReasoner, KnowledgeBase, ReasonerConfig};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;

use commands::{catalog, extract, run, validate};
pub use error::{CliError, CliResult};
pub use output::OutputFormat;

/// Encounter CLI application
#[derive(Parser, Debug)]
#[command(name = "encounter")]
#[command(about = "Encounter - incremental clinical reasoning over transcripts", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (table, json, yaml)
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Knowledge file to use instead of the built-in one
    #[arg(short, long, global = true, env = "ENCOUNTER_KNOWLEDGE")]
    knowledge: Option<PathBuf>,

    /// Reasoner configuration file (TOML)
    #[arg(short, long, global = true, env = "ENCOUNTER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a transcript file segment by segment
    Run(run::RunArgs),

    /// Show the evidence extracted from one text
    Extract(extract::ExtractArgs),

    /// List the conditions in the knowledge base
    Catalog,

    /// Validate a knowledge file
    Validate(validate::ValidateArgs),
}

/// Run using the current process arguments.
pub fn run() -> CliResult<()> {
    run_with_args(std::env::args_os())
}

/// Run using the provided argument iterator.
pub fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    // Initialize tracing; stdout is reserved for command output
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    dispatch(&cli)
}

/// Execute the parsed subcommand.
fn dispatch(cli: &Cli) -> CliResult<()> {
    match cli.command {
        Commands::Run(ref args) => run::execute(args, build_reasoner(cli)?, cli.output),
        Commands::Extract(ref args) => {
            let reasoner = build_reasoner(cli)?;
            extract::execute(args, &reasoner, cli.output)
        }
        Commands::Catalog => {
            let reasoner = build_reasoner(cli)?;
            catalog::execute(reasoner.knowledge(), cli.output)
        }
        Commands::Validate(ref args) => validate::execute(args, cli.config.as_deref(), cli.output),
    }
}

/// Build the reasoner from the global `--knowledge` and `--config` options.
fn build_reasoner(cli: &Cli) -> CliResult<Arc<ClinicalReasoner>> {
    let knowledge = match &cli.knowledge {
        Some(path) => KnowledgeBase::load(path)?,
        None => KnowledgeBase::builtin()?,
    };
    let config = match &cli.config {
        Some(path) => ReasonerConfig::load(path)?,
        None => ReasonerConfig::default(),
    };
    debug!(
        knowledge = knowledge.version(),
        conditions = knowledge.catalog().len(),
        "Building reasoner"
    );
    Ok(Arc::new(ClinicalReasoner::new(Arc::new(knowledge), config)?))
}

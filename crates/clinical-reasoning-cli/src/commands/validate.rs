//! Knowledge file validation

use std::path::{Path, PathBuf};

use clap::Args;
use clinical_reasoning::{KnowledgeBase, ReasonerConfig};
use serde::Serialize;

use crate::error::CliResult;
use crate::output::{self, OutputFormat};

/// Arguments for `encounter validate`
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Knowledge file to validate (TOML)
    pub path: PathBuf,
}

/// Summary of a knowledge file that passed validation.
#[derive(Debug, Serialize)]
struct ValidationReport {
    path: String,
    version: String,
    conditions: usize,
    medications: usize,
    medical_terms: usize,
    /// Configuration file checked alongside, if any
    config: Option<String>,
}

/// Execute `encounter validate`
///
/// A failed parse or validation surfaces as an error and a non-zero exit.
pub fn execute(args: &ValidateArgs, config: Option<&Path>, format: OutputFormat) -> CliResult<()> {
    let knowledge = KnowledgeBase::load(&args.path)?;
    if let Some(path) = config {
        ReasonerConfig::load(path)?;
    }

    let report = ValidationReport {
        path: args.path.display().to_string(),
        version: knowledge.version().to_string(),
        conditions: knowledge.catalog().len(),
        medications: knowledge.vocabulary().medications.len(),
        medical_terms: knowledge.medical_terms().len(),
        config: config.map(|p| p.display().to_string()),
    };

    match format {
        OutputFormat::Table => {
            output::print_success(&format!(
                "{} is valid (version {})",
                report.path, report.version
            ));
            println!("  Conditions:    {}", report.conditions);
            println!("  Medications:   {}", report.medications);
            println!("  Medical terms: {}", report.medical_terms);
            if let Some(config) = &report.config {
                println!("  Config:        {config} is valid");
            }
            Ok(())
        }
        OutputFormat::Json | OutputFormat::Yaml => output::print_structured(&report, format),
    }
}

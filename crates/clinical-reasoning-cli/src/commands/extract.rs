//! Evidence extraction for a single text

use std::fs;
use std::path::PathBuf;

use clap::Args;
use clinical_reasoning::{ClinicalReasoner, EvidenceItem};
use serde::Serialize;
use tabled::Tabled;

use crate::error::{CliError, CliResult};
use crate::output::{self, OutputFormat};

/// Arguments for `encounter extract`
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Text to analyze
    #[arg(conflicts_with = "file")]
    pub text: Option<String>,

    /// Read the text from a file instead
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

/// Table row for evidence display
#[derive(Debug, Serialize, Tabled)]
struct EvidenceRow {
    category: String,
    finding: String,
    strength: String,
    confidence: String,
    significance: String,
}

impl From<&EvidenceItem> for EvidenceRow {
    fn from(item: &EvidenceItem) -> Self {
        Self {
            category: item.category.to_string(),
            finding: item.finding.clone(),
            strength: item.strength.to_string(),
            confidence: format!("{:.2}", item.confidence),
            significance: format!("{:.2}", item.clinical_significance),
        }
    }
}

/// Execute `encounter extract`
pub fn execute(
    args: &ExtractArgs,
    reasoner: &ClinicalReasoner,
    format: OutputFormat,
) -> CliResult<()> {
    let text = match (&args.text, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => fs::read_to_string(path)?,
        (None, None) => {
            return Err(CliError::InvalidArgument(
                "provide the text to analyze or --file <path>".to_string(),
            ))
        }
    };

    let evidence = reasoner.extract(&text);
    match format {
        OutputFormat::Table => {
            output::print_rows(evidence.iter().map(EvidenceRow::from).collect(), format)
        }
        OutputFormat::Json | OutputFormat::Yaml => output::print_structured(&evidence, format),
    }
}

//! Transcript replay

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use clinical_reasoning::{
    ClinicalReasoner, ReasoningSnapshot, SessionId, SessionRegistry, Urgency,
};
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;
use tracing::debug;

use crate::error::{CliError, CliResult};
use crate::output::{self, percent, OutputFormat};

/// Arguments for `encounter run`
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Transcript file (UTF-8 text)
    pub transcript: PathBuf,

    /// Treat every non-empty line as a segment instead of blank-line separated paragraphs
    #[arg(long)]
    pub lines: bool,

    /// Session identifier (generated if omitted)
    #[arg(long)]
    pub session: Option<String>,

    /// Print only the snapshot after the last segment
    #[arg(long = "final")]
    pub final_only: bool,

    /// Number of hypotheses shown per segment in table output
    #[arg(long, default_value = "5")]
    pub top: usize,
}

/// Table row for hypothesis display
#[derive(Debug, Serialize, Tabled)]
struct HypothesisRow {
    /// Rank, most probable first
    #[tabled(rename = "#")]
    rank: usize,
    condition: String,
    probability: String,
    urgency: String,
    score: String,
    /// Supporting / contradicting evidence counts
    evidence: String,
}

/// Output of a whole replay.
#[derive(Debug, Serialize)]
struct Replay<'a> {
    session: &'a SessionId,
    segments: usize,
    snapshots: Vec<&'a ReasoningSnapshot>,
}

/// Split a transcript into segments.
///
/// Paragraph mode joins the lines of each blank-line separated block with a
/// space; line mode yields every non-empty line.
pub fn split_segments(text: &str, lines: bool) -> Vec<String> {
    if lines {
        return text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
    }

    let mut segments = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                segments.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        segments.push(current.join(" "));
    }
    segments
}

/// Execute `encounter run`
pub fn execute(
    args: &RunArgs,
    reasoner: Arc<ClinicalReasoner>,
    format: OutputFormat,
) -> CliResult<()> {
    let text = fs::read_to_string(&args.transcript)?;
    let segments = split_segments(&text, args.lines);
    if segments.is_empty() {
        return Err(CliError::InvalidArgument(format!(
            "{} contains no transcript segments",
            args.transcript.display()
        )));
    }

    let registry = SessionRegistry::new(reasoner);
    let session = match &args.session {
        Some(name) => {
            let id = SessionId::new(name.clone());
            registry.open_with_id(id.clone())?;
            id
        }
        None => registry.open()?,
    };
    debug!(session = %session, segments = segments.len(), "Replaying transcript");

    let mut snapshots = Vec::with_capacity(segments.len());
    for segment in &segments {
        snapshots.push(registry.ingest(&session, segment)?);
    }
    registry.close(&session)?;

    let shown: Vec<&ReasoningSnapshot> = if args.final_only {
        snapshots.last().map(Arc::as_ref).into_iter().collect()
    } else {
        snapshots.iter().map(Arc::as_ref).collect()
    };

    match format {
        OutputFormat::Table => {
            output::print_header(&format!("Encounter {session}"));
            for snapshot in &shown {
                print_snapshot(snapshot, args.top)?;
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let replay = Replay {
                session: &session,
                segments: segments.len(),
                snapshots: shown,
            };
            output::print_structured(&replay, format)?;
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &ReasoningSnapshot, top: usize) -> CliResult<()> {
    println!();
    println!(
        "{} {}  evidence: {}  quality: {}",
        "Segment".bold(),
        snapshot.segment_index.to_string().bold().yellow(),
        snapshot.evidence.len(),
        percent(snapshot.quality_score)
    );

    let rows: Vec<HypothesisRow> = snapshot
        .hypotheses
        .iter()
        .take(top)
        .enumerate()
        .map(|(i, h)| HypothesisRow {
            rank: i + 1,
            condition: h.condition.clone(),
            probability: percent(h.probability),
            urgency: h.urgency().to_string(),
            score: format!("{:.2}", h.clinical_score),
            evidence: format!(
                "{}/{}",
                h.supporting_evidence.len(),
                h.contradicting_evidence.len()
            ),
        })
        .collect();
    output::print_rows(rows, OutputFormat::Table)?;

    for alert in &snapshot.alerts {
        let tag = format!("[{}]", alert.urgency.to_string().to_uppercase());
        let tag = match alert.urgency {
            Urgency::Immediate => tag.red().bold(),
            Urgency::Urgent => tag.yellow().bold(),
            _ => tag.normal(),
        };
        println!(
            "  {} {} {} ({}s, {})",
            "⚠".red(),
            tag,
            alert.condition.bold(),
            alert.time_to_action_secs,
            alert.triggering_rule.dimmed()
        );
        for action in &alert.recommended_actions {
            println!("      → {action}");
        }
    }

    for item in &snapshot.guidance {
        println!(
            "  {} [{}] {}: {}",
            "•".blue(),
            item.priority,
            item.title.bold(),
            item.suggestion.dimmed()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_are_joined() {
        let text = "Patient reports chest pain\nradiating to the left arm.\n\n\n  HR 110, BP 150/90.  \n";
        assert_eq!(
            split_segments(text, false),
            vec![
                "Patient reports chest pain radiating to the left arm.".to_string(),
                "HR 110, BP 150/90.".to_string(),
            ]
        );
    }

    #[test]
    fn line_mode_skips_blank_lines() {
        let text = "first\n\n  second  \n\nthird";
        assert_eq!(split_segments(text, true), vec!["first", "second", "third"]);
    }

    #[test]
    fn empty_transcript_has_no_segments() {
        assert!(split_segments("  \n\n \n", false).is_empty());
        assert!(split_segments("", true).is_empty());
    }
}

//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::error::CliResult;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Print rows as a table, or the serialized rows for json/yaml.
pub fn print_rows<T: Serialize + Tabled>(rows: Vec<T>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "No results".dimmed());
            } else {
                println!("{}", Table::new(rows));
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => print_structured(&rows, format)?,
    }
    Ok(())
}

/// Print a serializable value as json or yaml. Table format falls back to json.
pub fn print_structured<T: Serialize + ?Sized>(data: &T, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(data)?),
        OutputFormat::Table | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?)
        }
    }
    Ok(())
}

/// Section header for table output.
pub fn print_header(title: &str) {
    println!("{}", title.bold().cyan());
    println!("{}", "=".repeat(title.chars().count().max(40)));
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Probability as a one-decimal percentage.
pub fn percent(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}

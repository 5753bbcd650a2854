//! Condition catalog listing

use clinical_reasoning::{ConditionEntry, KnowledgeBase};
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliResult;
use crate::output::{self, percent, OutputFormat};

/// Table row for condition display
#[derive(Debug, Serialize, Tabled)]
struct ConditionRow {
    id: String,
    name: String,
    prior: String,
    urgency: String,
    /// Decision-time budget in seconds
    decision: String,
    code: String,
    scoring: String,
    billing: String,
}

impl From<&ConditionEntry> for ConditionRow {
    fn from(entry: &ConditionEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            prior: percent(entry.base_prior_probability),
            urgency: entry.urgency().to_string(),
            decision: format!("{}s", entry.time_to_decision_seconds),
            code: entry.diagnostic_code.clone().unwrap_or_else(|| "-".into()),
            scoring: entry.scoring.to_string(),
            billing: entry.billing_complexity.to_string(),
        }
    }
}

/// Catalog as emitted in json/yaml.
#[derive(Debug, Serialize)]
struct CatalogView<'a> {
    version: &'a str,
    conditions: &'a [ConditionEntry],
}

/// Execute `encounter catalog`
pub fn execute(knowledge: &KnowledgeBase, format: OutputFormat) -> CliResult<()> {
    let catalog = knowledge.catalog();
    match format {
        OutputFormat::Table => {
            output::print_header(&format!(
                "Condition catalog {} ({} conditions)",
                knowledge.version(),
                catalog.len()
            ));
            output::print_rows(catalog.entries().iter().map(ConditionRow::from).collect(), format)
        }
        OutputFormat::Json | OutputFormat::Yaml => output::print_structured(
            &CatalogView {
                version: knowledge.version(),
                conditions: catalog.entries(),
            },
            format,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_cover_every_condition() {
        let knowledge = KnowledgeBase::builtin().unwrap();
        let rows: Vec<ConditionRow> = knowledge
            .catalog()
            .entries()
            .iter()
            .map(ConditionRow::from)
            .collect();
        assert_eq!(rows.len(), knowledge.catalog().len());

        let mi = rows
            .iter()
            .find(|row| row.name == "Acute Myocardial Infarction")
            .unwrap();
        assert_eq!(mi.urgency, "immediate");
        assert_eq!(mi.decision, "180s");
        assert_eq!(mi.scoring, "heart");
    }
}

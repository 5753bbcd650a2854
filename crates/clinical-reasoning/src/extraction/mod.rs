//! Evidence extraction from transcript segments.
//!
//! The extractor is a pure function of its compiled pattern tables and the
//! input text. It holds no mutable state and is safe to share across threads.
//!
//! Processing order for one segment:
//!
//! 1. Lowercase and expand whole-word abbreviations (`sob`, `htn`, `bp`, ...).
//! 2. Locate negation scopes (`denies ...`, `no ...` up to a comma or a
//!    terminator). Section clauses are cut at the first cue.
//! 3. Emit items in a fixed order: chief complaint, symptoms, vital signs,
//!    history terms, age, medications, then record sections.
//!
//! Each pattern fires at most once per call. Unmatched text yields no items.

mod patterns;

use chrono::Utc;
use regex::Regex;
use tracing::debug;

use crate::catalog::KnowledgeBase;
use crate::error::ReasoningResult;
use crate::types::{EvidenceCategory, EvidenceItem, EvidenceStrength};

use patterns::{
    AbbreviationTable, MedicationPattern, NegationDetector, NegationScope, SectionPattern,
    TermPattern, VitalPattern,
};

/// A symptom term with its significance tier.
#[derive(Clone, Debug)]
struct SymptomPattern {
    pattern: TermPattern,
    significance: f64,
}

/// Turns raw transcript text into typed evidence items.
#[derive(Clone, Debug)]
pub struct EvidenceExtractor {
    abbreviations: AbbreviationTable,
    negation: NegationDetector,
    chief_complaint: Option<SectionPattern>,
    symptoms: Vec<SymptomPattern>,
    vitals: Vec<VitalPattern>,
    history: Vec<TermPattern>,
    age: Regex,
    medications: Vec<MedicationPattern>,
    sections: Vec<SectionPattern>,
}

impl EvidenceExtractor {
    /// Compile the pattern tables for a knowledge base.
    pub fn new(knowledge: &KnowledgeBase) -> ReasoningResult<Self> {
        let vocabulary = knowledge.vocabulary();

        let symptoms = patterns::term_patterns(vocabulary.symptom_terms())?
            .into_iter()
            .map(|pattern| SymptomPattern {
                significance: vocabulary.symptom_significance(&pattern.term),
                pattern,
            })
            .collect();

        Ok(Self {
            abbreviations: AbbreviationTable::new(&vocabulary.abbreviations)?,
            negation: NegationDetector::new(vocabulary)?,
            chief_complaint: SectionPattern::new(
                EvidenceCategory::ChiefComplaint,
                &vocabulary.chief_complaint_phrases,
            )?,
            symptoms,
            vitals: patterns::vital_patterns()?,
            history: patterns::term_patterns(&vocabulary.history_terms)?,
            age: patterns::age_pattern()?,
            medications: patterns::medication_patterns(vocabulary)?,
            sections: patterns::section_patterns(&vocabulary.section_markers)?,
        })
    }

    /// Lowercased text with abbreviations expanded.
    pub fn normalize(&self, text: &str) -> String {
        self.abbreviations.expand(&text.to_lowercase())
    }

    /// Extract evidence items from one transcript segment.
    pub fn extract(&self, text: &str) -> Vec<EvidenceItem> {
        let text = self.normalize(text);
        if text.trim().is_empty() {
            return Vec::new();
        }

        let timestamp = Utc::now();
        let scopes = self.negation.scopes(&text);
        let mut items = Vec::new();

        if let Some(pattern) = &self.chief_complaint {
            // A complaint clause that is denied outright yields no item; the
            // symptom pass records the negated terms.
            if let Some(hit) = pattern
                .find(&text, &scopes)
                .filter(|hit| !(hit.negated && hit.clause.is_empty()))
            {
                let finding = if hit.clause.is_empty() {
                    hit.marker
                } else {
                    hit.clause
                };
                items.push(
                    EvidenceItem::new(
                        finding,
                        EvidenceCategory::ChiefComplaint,
                        EvidenceStrength::HighlySuggestive,
                    )
                    .with_confidence(0.9)
                    .with_significance(0.9),
                );
            }
        }

        for symptom in &self.symptoms {
            if let Some(offset) = symptom.pattern.first(&text) {
                items.push(
                    term_item(
                        &symptom.pattern.term,
                        offset,
                        &scopes,
                        EvidenceCategory::Symptoms,
                    )
                    .with_confidence(0.8)
                    .with_significance(symptom.significance),
                );
            }
        }

        for vital in &self.vitals {
            if let Some(reading) = vital.read(&text) {
                let significance = if reading.abnormal { 0.8 } else { 0.5 };
                items.push(
                    EvidenceItem::new(
                        reading.finding,
                        EvidenceCategory::VitalSigns,
                        EvidenceStrength::Supportive,
                    )
                    .with_confidence(0.9)
                    .with_significance(significance),
                );
            }
        }

        for term in &self.history {
            if let Some(offset) = term.first(&text) {
                items.push(
                    term_item(&term.term, offset, &scopes, EvidenceCategory::History)
                        .with_confidence(0.8)
                        .with_significance(0.6),
                );
            }
        }

        if let Some(age) = patterns::read_age(&self.age, &text) {
            items.push(
                EvidenceItem::new(
                    format!("age {age}"),
                    EvidenceCategory::History,
                    EvidenceStrength::WeaklySuggestive,
                )
                .with_confidence(0.9)
                .with_significance(0.4),
            );
        }

        for medication in &self.medications {
            if medication.regex.is_match(&text) {
                items.push(
                    EvidenceItem::new(
                        medication.generic.clone(),
                        EvidenceCategory::Medications,
                        EvidenceStrength::Supportive,
                    )
                    .with_confidence(0.9)
                    .with_significance(0.6),
                );
            }
        }

        for section in &self.sections {
            if let Some(hit) = section.find(&text, &scopes) {
                let finding = if hit.clause.is_empty() {
                    hit.marker
                } else {
                    hit.clause
                };
                items.push(
                    EvidenceItem::new(finding, section.category, EvidenceStrength::Supportive)
                        .with_confidence(0.8)
                        .with_significance(0.5),
                );
            }
        }

        for item in items.iter_mut() {
            item.timestamp = timestamp;
        }

        debug!(
            items = items.len(),
            negated = items.iter().filter(|i| i.is_contradictory()).count(),
            "Extracted evidence"
        );

        items
    }
}

/// An item for a vocabulary term, negated when it falls inside a scope.
fn term_item(
    term: &str,
    offset: usize,
    scopes: &[NegationScope],
    category: EvidenceCategory,
) -> EvidenceItem {
    match patterns::negation_at(scopes, offset) {
        Some(form) => EvidenceItem::new(form.apply(term), category, EvidenceStrength::Contradictory),
        None => EvidenceItem::new(term, category, EvidenceStrength::Supportive),
    }
}

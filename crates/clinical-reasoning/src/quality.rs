//! Documentation quality score.
//!
//! A weighted sum of four sub-scores, each in [0, 1]: category coverage,
//! mean hypothesis probability, medical-term density and a structural
//! heuristic over the raw text.

use std::sync::Arc;

use crate::catalog::KnowledgeBase;
use crate::config::QualityWeights;
use crate::types::{EvidenceCategory, MedicalHypothesis, SharedEvidence};

/// Record sections counted toward coverage.
const CORE_SECTIONS: [EvidenceCategory; 4] = [
    EvidenceCategory::ChiefComplaint,
    EvidenceCategory::History,
    EvidenceCategory::PhysicalExam,
    EvidenceCategory::Assessment,
];

/// Per-component breakdown of a quality score.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QualityBreakdown {
    pub coverage: f64,
    pub probability: f64,
    pub term_density: f64,
    pub structure: f64,
    pub total: f64,
}

/// Stateless quality scorer.
#[derive(Clone, Debug)]
pub struct QualityScorer {
    knowledge: Arc<KnowledgeBase>,
    weights: QualityWeights,
}

impl QualityScorer {
    pub fn new(knowledge: Arc<KnowledgeBase>, weights: QualityWeights) -> Self {
        Self { knowledge, weights }
    }

    /// Quality score in [0, 1].
    pub fn score(
        &self,
        evidence: &[SharedEvidence],
        hypotheses: &[MedicalHypothesis],
        raw_text: &str,
    ) -> f64 {
        self.breakdown(evidence, hypotheses, raw_text).total
    }

    pub fn breakdown(
        &self,
        evidence: &[SharedEvidence],
        hypotheses: &[MedicalHypothesis],
        raw_text: &str,
    ) -> QualityBreakdown {
        let coverage = coverage(evidence);
        let probability = mean_probability(hypotheses);
        let term_density = self.term_density(raw_text);
        let structure = structure(raw_text);

        let w = &self.weights;
        let total = (coverage * w.coverage
            + probability * w.probability
            + term_density * w.term_density
            + structure * w.structure)
            .clamp(0.0, 1.0);

        QualityBreakdown {
            coverage,
            probability,
            term_density,
            structure,
            total,
        }
    }

    /// Vocabulary term occurrences per word, scaled by 10 and capped at 1.
    fn term_density(&self, raw_text: &str) -> f64 {
        let words = raw_text.split_whitespace().count();
        if words == 0 {
            return 0.0;
        }

        let hits = self.knowledge.count_medical_terms(raw_text);

        (hits as f64 / words as f64 * 10.0).min(1.0)
    }
}

fn coverage(evidence: &[SharedEvidence]) -> f64 {
    let present = CORE_SECTIONS
        .iter()
        .filter(|section| evidence.iter().any(|e| e.category == **section))
        .count();
    present as f64 / CORE_SECTIONS.len() as f64
}

fn mean_probability(hypotheses: &[MedicalHypothesis]) -> f64 {
    if hypotheses.is_empty() {
        return 0.0;
    }
    let sum: f64 = hypotheses.iter().map(|h| h.probability).sum();
    (sum / hypotheses.len() as f64).clamp(0.0, 1.0)
}

fn structure(raw_text: &str) -> f64 {
    let mut score = 0.0;
    if raw_text.contains([':', '•', '-']) {
        score += 0.5;
    }
    if (50..=3000).contains(&raw_text.chars().count()) {
        score += 0.5;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EvidenceItem, EvidenceStrength};

    fn scorer() -> QualityScorer {
        QualityScorer::new(
            Arc::new(KnowledgeBase::builtin().unwrap()),
            QualityWeights::default(),
        )
    }

    fn item(category: EvidenceCategory) -> SharedEvidence {
        Arc::new(EvidenceItem::new("x", category, EvidenceStrength::Supportive))
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(scorer().score(&[], &[], ""), 0.0);
    }

    #[test]
    fn coverage_counts_core_sections() {
        let evidence = vec![
            item(EvidenceCategory::ChiefComplaint),
            item(EvidenceCategory::History),
            item(EvidenceCategory::Medications),
        ];
        let breakdown = scorer().breakdown(&evidence, &[], "");
        assert_eq!(breakdown.coverage, 0.5);
        assert!((breakdown.total - 0.15).abs() < 1e-12);
    }

    #[test]
    fn structure_heuristic() {
        assert_eq!(structure("short"), 0.0);
        assert_eq!(structure("HPI: short"), 0.5);
        assert_eq!(structure(&"a".repeat(50)), 0.5);
        assert_eq!(structure(&format!("HPI: {}", "a".repeat(60))), 1.0);
        assert_eq!(structure(&"a".repeat(3001)), 0.0);
    }

    #[test]
    fn term_density_is_capped() {
        let scorer = scorer();
        let dense = scorer.breakdown(&[], &[], "chest pain nausea");
        assert_eq!(dense.term_density, 1.0);

        let sparse = scorer.breakdown(
            &[],
            &[],
            "we talked about the weekend and the weather and then briefly about a cough at night \
             before moving on to other topics entirely for a long while",
        );
        assert!(sparse.term_density > 0.0 && sparse.term_density < 1.0);
    }

    #[test]
    fn term_density_ignores_terms_inside_words() {
        let breakdown = scorer().breakdown(&[], &[], "dinner at the restaurant, then admitted");
        assert_eq!(breakdown.term_density, 0.0);
    }

    #[test]
    fn score_stays_in_unit_interval() {
        let scorer = scorer();
        let evidence: Vec<_> = CORE_SECTIONS.iter().map(|c| item(*c)).collect();
        let text = format!("Assessment: {}", "chest pain ".repeat(40));
        let score = scorer.score(&evidence, &[], &text);
        assert!((0.0..=1.0).contains(&score));
    }
}

//! Condition-specific clinical scores.
//!
//! Scorers are pure functions over the evidence of one segment, normalized to
//! [0, 1]. Negated findings never count toward a score.

use crate::catalog::ScoringRule;
use crate::types::SharedEvidence;

/// A clinical risk score computed from evidence findings.
pub trait ClinicalScorer: Send + Sync {
    /// The catalog scoring rule this scorer implements.
    fn rule(&self) -> ScoringRule;

    /// Score the evidence, in [0, 1].
    fn score(&self, evidence: &[SharedEvidence]) -> f64;
}

/// Findings that may contribute to a score.
fn positive_findings(evidence: &[SharedEvidence]) -> impl Iterator<Item = &str> {
    evidence
        .iter()
        .filter(|item| !item.is_contradictory())
        .map(|item| item.finding.as_str())
}

fn any_finding_contains(evidence: &[SharedEvidence], needle: &str) -> bool {
    positive_findings(evidence).any(|finding| finding.contains(needle))
}

fn has_word(finding: &str, word: &str) -> bool {
    finding
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

// ── HEART-like Score ────────────────────────────────────────────────────

/// Cardiac risk score modeled on the HEART score.
///
/// - History: +1 for a chest-pain complaint, +2 when described as typical.
/// - Age: +1 when any age reference is present.
/// - Risk factors: +0.5 per distinct factor, at most +2.
///
/// The sum is clamped to 10 and divided by 10.
#[derive(Clone, Debug)]
pub struct HeartScorer {
    pub history_terms: Vec<String>,
    pub risk_factors: Vec<String>,
}

impl Default for HeartScorer {
    fn default() -> Self {
        Self {
            history_terms: vec![
                "chest pain".into(),
                "chest pressure".into(),
                "chest tightness".into(),
            ],
            risk_factors: vec![
                "diabetes".into(),
                "hypertension".into(),
                "smoking".into(),
                "family history".into(),
            ],
        }
    }
}

impl ClinicalScorer for HeartScorer {
    fn rule(&self) -> ScoringRule {
        ScoringRule::Heart
    }

    fn score(&self, evidence: &[SharedEvidence]) -> f64 {
        let mut total = 0.0;

        if self
            .history_terms
            .iter()
            .any(|term| any_finding_contains(evidence, term))
        {
            let typical = positive_findings(evidence).any(|f| has_word(f, "typical"));
            total += if typical { 2.0 } else { 1.0 };
        }

        if positive_findings(evidence).any(|f| f.starts_with("age ") || f.contains("year old")) {
            total += 1.0;
        }

        let risk_hits = self
            .risk_factors
            .iter()
            .filter(|factor| any_finding_contains(evidence, factor))
            .count();
        total += (risk_hits as f64 * 0.5).min(2.0);

        total.min(10.0) / 10.0
    }
}

// ── Wells-like Score ────────────────────────────────────────────────────

/// Embolism risk score modeled on the Wells criteria.
///
/// Each criterion counts once, whichever of its keywords matched. The sum is
/// clamped to 12.5 and divided by 12.5.
#[derive(Clone, Debug)]
pub struct WellsScorer {
    pub criteria: Vec<(Vec<String>, f64)>,
}

impl Default for WellsScorer {
    fn default() -> Self {
        let criterion = |keywords: &[&str], points: f64| {
            (keywords.iter().map(|k| k.to_string()).collect(), points)
        };
        Self {
            criteria: vec![
                criterion(&["leg swelling"], 3.0),
                criterion(&["immobilization", "surgery"], 1.5),
                criterion(&["tachycardia"], 1.5),
                criterion(&["hemoptysis"], 1.0),
                criterion(&["cancer"], 1.0),
            ],
        }
    }
}

impl ClinicalScorer for WellsScorer {
    fn rule(&self) -> ScoringRule {
        ScoringRule::Wells
    }

    fn score(&self, evidence: &[SharedEvidence]) -> f64 {
        let total: f64 = self
            .criteria
            .iter()
            .filter(|(keywords, _)| keywords.iter().any(|k| any_finding_contains(evidence, k)))
            .map(|(_, points)| points)
            .sum();

        total.min(12.5) / 12.5
    }
}

// ── Scorer Registry ─────────────────────────────────────────────────────

/// Scorers keyed by catalog scoring rule.
pub struct ScorerRegistry {
    scorers: Vec<Box<dyn ClinicalScorer>>,
    default_score: f64,
}

impl ScorerRegistry {
    /// HEART and Wells scorers, with a fixed score for everything else.
    pub fn new(default_score: f64) -> Self {
        Self::with_scorers(
            vec![Box::new(HeartScorer::default()), Box::new(WellsScorer::default())],
            default_score,
        )
    }

    pub fn with_scorers(scorers: Vec<Box<dyn ClinicalScorer>>, default_score: f64) -> Self {
        Self {
            scorers,
            default_score: default_score.clamp(0.0, 1.0),
        }
    }

    /// Score evidence under a rule; rules without a scorer get the default.
    pub fn score(&self, rule: ScoringRule, evidence: &[SharedEvidence]) -> f64 {
        self.scorers
            .iter()
            .find(|s| s.rule() == rule)
            .map_or(self.default_score, |s| s.score(evidence).clamp(0.0, 1.0))
    }
}

impl std::fmt::Debug for ScorerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScorerRegistry")
            .field("scorers", &self.scorers.iter().map(|s| s.rule()).collect::<Vec<_>>())
            .field("default_score", &self.default_score)
            .finish()
    }
}

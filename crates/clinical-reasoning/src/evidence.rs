//! Likelihood model and Bayesian odds update.
//!
//! Every evidence item is scored against every catalog condition with a
//! likelihood ratio, and the ratios are folded into the condition's
//! probability one item at a time:
//!
//! ```text
//! odds      = p / (1 - p)
//! odds'     = odds * LR
//! posterior = odds' / (1 + odds')
//! ```
//!
//! The fold is sequential. Near the ceiling, order matters.

use crate::catalog::ConditionEntry;
use crate::types::EvidenceItem;

/// Smallest probability the updater will produce.
pub const MIN_PROBABILITY: f64 = f64::EPSILON;

// ── Confidence Update ───────────────────────────────────────────────────

/// Direction of a probability update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateDirection {
    Strengthened,
    Weakened,
    Unchanged,
}

/// Result of a single odds update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConfidenceUpdate {
    pub prior: f64,
    pub posterior: f64,
    pub likelihood_ratio: f64,
    pub direction: UpdateDirection,
}

// ── Bayesian Updater ────────────────────────────────────────────────────

/// Odds-form Bayesian updater with an upper probability ceiling.
#[derive(Clone, Copy, Debug)]
pub struct BayesianUpdater {
    ceiling: f64,
}

impl Default for BayesianUpdater {
    fn default() -> Self {
        Self { ceiling: 0.99 }
    }
}

impl BayesianUpdater {
    /// Create an updater that never returns more than `ceiling`.
    pub fn new(ceiling: f64) -> Self {
        Self {
            ceiling: ceiling.clamp(MIN_PROBABILITY, 1.0 - f64::EPSILON),
        }
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Apply one likelihood ratio to a prior probability.
    ///
    /// A ratio of exactly 1.0 returns the prior untouched. Any other ratio
    /// yields a posterior in `[MIN_PROBABILITY, ceiling]`.
    pub fn update(&self, prior: f64, likelihood_ratio: f64) -> f64 {
        if likelihood_ratio == 1.0 {
            return prior;
        }

        let prior = prior.clamp(MIN_PROBABILITY, self.ceiling);
        let odds = prior / (1.0 - prior);
        let posterior_odds = odds * likelihood_ratio.max(0.0);
        let posterior = posterior_odds / (1.0 + posterior_odds);

        posterior.clamp(MIN_PROBABILITY, self.ceiling)
    }

    /// Apply one ratio and report the direction of change.
    pub fn update_detailed(&self, prior: f64, likelihood_ratio: f64) -> ConfidenceUpdate {
        let posterior = self.update(prior, likelihood_ratio);
        let direction = if posterior > prior {
            UpdateDirection::Strengthened
        } else if posterior < prior {
            UpdateDirection::Weakened
        } else {
            UpdateDirection::Unchanged
        };

        ConfidenceUpdate {
            prior,
            posterior,
            likelihood_ratio,
            direction,
        }
    }

    /// Fold a sequence of likelihood ratios into a prior, in order.
    pub fn evaluate_sequence<I>(&self, prior: f64, ratios: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        ratios
            .into_iter()
            .fold(prior, |probability, ratio| self.update(probability, ratio))
    }
}

// ── Likelihood Model ────────────────────────────────────────────────────

/// How one evidence item relates to one condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvidenceMatch {
    /// The finding mentions a symptom keyword of the condition.
    Supporting,
    /// The finding is a negated mention of a symptom keyword.
    Negated,
    /// The finding says nothing about the condition.
    Neutral,
}

/// Maps (evidence, condition) pairs to likelihood ratios.
#[derive(Clone, Copy, Debug)]
pub struct LikelihoodModel {
    /// Ratio before the strength weight is added on a keyword hit.
    pub base_ratio: f64,
    /// Ratio for a negated keyword mention.
    pub negated_ratio: f64,
}

impl Default for LikelihoodModel {
    fn default() -> Self {
        Self {
            base_ratio: 2.0,
            negated_ratio: 0.3,
        }
    }
}

impl LikelihoodModel {
    /// Classify an evidence item against a condition.
    ///
    /// Negation is tested first: "denies chest pain" contains "chest pain"
    /// and would otherwise count as a keyword hit.
    pub fn classify(&self, item: &EvidenceItem, condition: &ConditionEntry) -> EvidenceMatch {
        let finding = item.finding.as_str();
        let negated = condition.symptom_keywords.iter().any(|keyword| {
            finding.contains(&format!("no {keyword}"))
                || finding.contains(&format!("denies {keyword}"))
        });
        if negated {
            return EvidenceMatch::Negated;
        }

        if condition
            .symptom_keywords
            .iter()
            .any(|keyword| finding.contains(keyword.as_str()))
        {
            EvidenceMatch::Supporting
        } else {
            EvidenceMatch::Neutral
        }
    }

    /// Likelihood ratio of an evidence item under a condition.
    pub fn ratio(&self, item: &EvidenceItem, condition: &ConditionEntry) -> f64 {
        self.ratio_for(self.classify(item, condition), item)
    }

    /// Likelihood ratio for an already classified item.
    pub fn ratio_for(&self, kind: EvidenceMatch, item: &EvidenceItem) -> f64 {
        match kind {
            EvidenceMatch::Supporting => self.base_ratio + item.strength.weight(),
            EvidenceMatch::Negated => self.negated_ratio,
            EvidenceMatch::Neutral => 1.0,
        }
    }
}

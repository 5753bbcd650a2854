//! Belief updater: folds new evidence into the hypothesis set.
//!
//! For every catalog condition the updater seeds a probability (the prior
//! hypothesis if present, else the base prior), applies one likelihood ratio
//! per evidence item in arrival order, clamps to the ceiling, and keeps the
//! condition only if it clears the visibility floor.
//!
//! Supporting evidence is every item that matches a condition keyword;
//! contradicting evidence is the complement within the same batch. The
//! complement means an unrelated finding shows up as contradicting for many
//! conditions at once.

use std::sync::Arc;

use tracing::debug;

use crate::catalog::KnowledgeBase;
use crate::config::ReasonerConfig;
use crate::evidence::{BayesianUpdater, EvidenceMatch, LikelihoodModel};
use crate::scoring::ScorerRegistry;
use crate::types::{MedicalHypothesis, SharedEvidence};

/// Computes updated hypotheses from new evidence and the prior hypothesis set.
#[derive(Debug)]
pub struct BeliefUpdater {
    knowledge: Arc<KnowledgeBase>,
    bayes: BayesianUpdater,
    likelihood: LikelihoodModel,
    scorers: ScorerRegistry,
    visibility_floor: f64,
}

impl BeliefUpdater {
    pub fn new(knowledge: Arc<KnowledgeBase>, config: &ReasonerConfig) -> Self {
        Self {
            knowledge,
            bayes: BayesianUpdater::new(config.probability_ceiling),
            likelihood: LikelihoodModel::default(),
            scorers: ScorerRegistry::new(config.default_clinical_score),
            visibility_floor: config.visibility_floor,
        }
    }

    /// Replace the scorer registry.
    pub fn with_scorers(mut self, scorers: ScorerRegistry) -> Self {
        self.scorers = scorers;
        self
    }

    /// Recompute the hypothesis list for one segment.
    ///
    /// Deterministic in its two inputs. The result is sorted by probability,
    /// highest first; ties keep catalog order.
    pub fn update(
        &self,
        evidence: &[SharedEvidence],
        prior: &[MedicalHypothesis],
    ) -> Vec<MedicalHypothesis> {
        let catalog = self.knowledge.catalog();

        let mut seeds: Vec<Option<f64>> = vec![None; catalog.len()];
        for hypothesis in prior {
            match catalog
                .resolve(hypothesis.condition_id, &hypothesis.condition)
                .and_then(|_| seeds.get_mut(hypothesis.condition_id.0))
            {
                Some(slot) => *slot = Some(hypothesis.probability),
                None => debug!(
                    condition = %hypothesis.condition,
                    "Ignoring prior hypothesis not in catalog"
                ),
            }
        }

        let mut hypotheses = Vec::new();
        for (id, entry) in catalog.iter() {
            let seed = seeds[id.0].unwrap_or(entry.base_prior_probability);

            let mut matches = Vec::with_capacity(evidence.len());
            let mut probability = seed;
            for item in evidence {
                let kind = self.likelihood.classify(item, entry);
                probability = self
                    .bayes
                    .update(probability, self.likelihood.ratio_for(kind, item));
                matches.push(kind);
            }
            let probability = probability.min(self.bayes.ceiling());

            if probability <= self.visibility_floor {
                continue;
            }

            let (supporting, contradicting): (Vec<_>, Vec<_>) = evidence
                .iter()
                .zip(&matches)
                .partition(|(_, kind)| **kind == EvidenceMatch::Supporting);

            hypotheses.push(MedicalHypothesis {
                condition_id: id,
                condition: entry.name.clone(),
                probability,
                supporting_evidence: supporting.into_iter().map(|(e, _)| Arc::clone(e)).collect(),
                contradicting_evidence: contradicting
                    .into_iter()
                    .map(|(e, _)| Arc::clone(e))
                    .collect(),
                clinical_score: self.scorers.score(entry.scoring, evidence),
                required_workup: entry.workup.clone(),
                time_to_decision_secs: entry.time_to_decision_seconds,
                diagnostic_code: entry.diagnostic_code.clone(),
            });
        }

        hypotheses.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        debug!(
            evidence = evidence.len(),
            hypotheses = hypotheses.len(),
            top = hypotheses.first().map(|h| h.condition.as_str()).unwrap_or("none"),
            "Updated beliefs"
        );

        hypotheses
    }
}

//! Central clinical reasoning engine.
//!
//! The `ClinicalReasoner` runs the per-segment pipeline:
//! text → evidence extraction → belief update → decision rules, guidance and
//! quality scoring over the same snapshot.
//!
//! The reasoner itself is immutable and shareable. Per-encounter state lives in
//! an [`EncounterSession`], which holds exactly one current snapshot and
//! replaces it wholesale after every segment.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::belief::BeliefUpdater;
use crate::catalog::KnowledgeBase;
use crate::config::ReasonerConfig;
use crate::error::ReasoningResult;
use crate::extraction::EvidenceExtractor;
use crate::guidance::GuidanceGenerator;
use crate::quality::QualityScorer;
use crate::rules::DecisionRules;
use crate::types::{
    EvidenceItem, MedicalHypothesis, ReasoningSnapshot, SessionId, SharedEvidence,
};

// ── Clinical Reasoner ───────────────────────────────────────────────────

/// Stateless segment-processing pipeline over one knowledge base.
#[derive(Debug)]
pub struct ClinicalReasoner {
    knowledge: Arc<KnowledgeBase>,
    config: ReasonerConfig,
    extractor: EvidenceExtractor,
    beliefs: BeliefUpdater,
    rules: DecisionRules,
    guidance: GuidanceGenerator,
    quality: QualityScorer,
}

impl ClinicalReasoner {
    /// Build a reasoner. Fails if the configuration is out of range or a
    /// vocabulary pattern does not compile.
    pub fn new(knowledge: Arc<KnowledgeBase>, config: ReasonerConfig) -> ReasoningResult<Self> {
        config.validate()?;
        let extractor = EvidenceExtractor::new(&knowledge)?;

        Ok(Self {
            beliefs: BeliefUpdater::new(Arc::clone(&knowledge), &config),
            rules: DecisionRules::new(config.alert_probability_threshold),
            guidance: GuidanceGenerator::new(
                Arc::clone(&knowledge),
                config.diagnosis_guidance_threshold,
            ),
            quality: QualityScorer::new(Arc::clone(&knowledge), config.quality_weights.clone()),
            extractor,
            knowledge,
            config,
        })
    }

    /// Reasoner over the built-in knowledge base with default configuration.
    pub fn with_builtin_knowledge() -> ReasoningResult<Self> {
        Self::new(Arc::new(KnowledgeBase::builtin()?), ReasonerConfig::default())
    }

    /// Replace the decision rules.
    pub fn with_rules(mut self, rules: DecisionRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    /// Extract evidence without updating any beliefs.
    pub fn extract(&self, text: &str) -> Vec<EvidenceItem> {
        self.extractor.extract(text)
    }

    /// Run the belief updater alone.
    pub fn update_beliefs(
        &self,
        evidence: &[SharedEvidence],
        prior: &[MedicalHypothesis],
    ) -> Vec<MedicalHypothesis> {
        self.beliefs.update(evidence, prior)
    }

    /// Process one transcript segment against the prior hypotheses.
    ///
    /// Total over its input: empty or unrecognized text yields an empty
    /// evidence list and leaves the prior probabilities untouched.
    pub fn reason(
        &self,
        text: &str,
        prior: &[MedicalHypothesis],
        segment_index: u64,
    ) -> ReasoningSnapshot {
        let evidence: Vec<SharedEvidence> = self
            .extractor
            .extract(text)
            .into_iter()
            .map(Arc::new)
            .collect();

        let hypotheses = self.beliefs.update(&evidence, prior);
        let alerts = self.rules.check_critical(&evidence, &hypotheses);
        let guidance = self.guidance.guide(&evidence, &hypotheses);
        let quality_score = self.quality.score(&evidence, &hypotheses, text);

        debug!(
            segment = segment_index,
            evidence = evidence.len(),
            hypotheses = hypotheses.len(),
            alerts = alerts.len(),
            guidance = guidance.len(),
            quality = quality_score,
            "Processed segment"
        );

        ReasoningSnapshot {
            segment_index,
            evidence,
            hypotheses,
            alerts,
            guidance,
            quality_score,
            knowledge_version: self.knowledge.version().to_string(),
            produced_at: Utc::now(),
        }
    }
}

// ── Encounter Session ───────────────────────────────────────────────────

/// State of one clinical encounter.
///
/// Holds a single current snapshot. [`EncounterSession::ingest`] computes the
/// next snapshot from the current hypotheses and swaps it in once complete.
#[derive(Clone, Debug)]
pub struct EncounterSession {
    id: SessionId,
    reasoner: Arc<ClinicalReasoner>,
    current: Arc<ReasoningSnapshot>,
}

impl EncounterSession {
    pub fn new(id: SessionId, reasoner: Arc<ClinicalReasoner>) -> Self {
        let current = Arc::new(ReasoningSnapshot::empty(reasoner.knowledge().version()));
        Self {
            id,
            reasoner,
            current,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Process the next transcript segment and return the new snapshot.
    pub fn ingest(&mut self, text: &str) -> Arc<ReasoningSnapshot> {
        let next = self.current.segment_index + 1;
        let snapshot = self
            .reasoner
            .reason(text, &self.current.hypotheses, next);
        self.current = Arc::new(snapshot);
        debug!(session = %self.id, segment = next, "Replaced session snapshot");
        Arc::clone(&self.current)
    }

    /// The latest complete snapshot.
    pub fn snapshot(&self) -> Arc<ReasoningSnapshot> {
        Arc::clone(&self.current)
    }

    pub fn hypotheses(&self) -> &[MedicalHypothesis] {
        &self.current.hypotheses
    }

    pub fn segments_processed(&self) -> u64 {
        self.current.segment_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GuidanceType, Urgency};

    fn reasoner() -> Arc<ClinicalReasoner> {
        Arc::new(ClinicalReasoner::with_builtin_knowledge().unwrap())
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ReasonerConfig {
            probability_ceiling: 1.5,
            ..ReasonerConfig::default()
        };
        let knowledge = Arc::new(KnowledgeBase::builtin().unwrap());
        assert!(ClinicalReasoner::new(knowledge, config).is_err());
    }

    #[test]
    fn empty_segment_is_total() {
        let reasoner = reasoner();
        let snapshot = reasoner.reason("", &[], 1);
        assert!(snapshot.evidence.is_empty());
        assert!(snapshot.alerts.is_empty());
        // Only the mean prior probability contributes: (0.10 + 0.08 + 0.06) / 3 * 0.25.
        assert!((snapshot.quality_score - 0.02).abs() < 1e-12);
        let missing = snapshot
            .guidance
            .iter()
            .filter(|g| g.guidance_type == GuidanceType::MissingElement)
            .count();
        assert_eq!(missing, 2);
        assert_eq!(snapshot.knowledge_version, reasoner.knowledge().version());
    }

    #[test]
    fn session_replaces_snapshot_wholesale() {
        let mut session = EncounterSession::new(SessionId::generate(), reasoner());
        assert_eq!(session.segments_processed(), 0);
        assert!(session.hypotheses().is_empty());

        let first = session.ingest("Crushing chest pain radiating to the jaw with diaphoresis.");
        assert_eq!(first.segment_index, 1);
        assert!(!first.alerts.is_empty());

        let second = session.ingest("She is comfortable and talking with family.");
        assert_eq!(second.segment_index, 2);
        assert!(second.alerts.iter().all(|a| a.triggering_rule != "stemi_pattern"));
        assert!(first.alerts.iter().any(|a| a.triggering_rule == "stemi_pattern"));
        assert!(Arc::ptr_eq(&second, &session.snapshot()));
    }

    #[test]
    fn session_carries_probabilities_forward() {
        let mut session = EncounterSession::new(SessionId::generate(), reasoner());
        let first = session.ingest("chest pain and diaphoresis");
        let second = session.ingest("still has chest pain");
        let mi = |s: &ReasoningSnapshot| {
            s.hypothesis("Acute Myocardial Infarction")
                .map(|h| h.probability)
                .unwrap_or(0.0)
        };
        assert!(mi(&second) > mi(&first));
        assert_eq!(
            second.top_hypothesis().map(|h| h.urgency()),
            Some(Urgency::Immediate)
        );
    }
}

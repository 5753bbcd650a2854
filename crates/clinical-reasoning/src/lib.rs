//! # clinical-reasoning
//!
//! Incremental clinical-hypothesis reasoning over a transcribed encounter.
//!
//! Each transcript segment is turned into typed evidence, folded into a
//! running probability for every condition in a fixed catalog, and checked
//! against time-critical decision rules. Documentation guidance and a quality
//! score are derived from the same snapshot.
//!
//! ## Architecture
//!
//! ```text
//!              ┌─────────────────────┐
//!              │  Transcript segment │  ← plain UTF-8 text
//!              └──────────┬──────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │  Evidence           │  ← abbreviations, negation, vitals,
//!              │  Extractor          │    symptoms, medications, sections
//!              └──────────┬──────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │  Belief Updater     │  ← sequential odds update per condition
//!              │  (+ clinical scores)│    prior hypotheses in, ranked list out
//!              └──────────┬──────────┘
//!                         │
//!        ┌────────────────┼────────────────┐
//!        ▼                ▼                ▼
//!  ┌───────────┐   ┌─────────────┐   ┌───────────┐
//!  │ Decision  │   │  Guidance   │   │  Quality  │
//!  │ Rules     │   │  Generator  │   │  Scorer   │
//!  └─────┬─────┘   └──────┬──────┘   └─────┬─────┘
//!        └────────────────┼────────────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │  ReasoningSnapshot  │  → replaced wholesale per segment,
//!              └─────────────────────┘    published to a SnapshotSink
//! ```
//!
//! ## Key Principles
//!
//! - **Catalog as data**: conditions and vocabularies are loaded from a
//!   versioned TOML resource and validated once at startup.
//! - **Total per-segment pipeline**: unmatched text contributes nothing; only
//!   initialization and session lookups can fail.
//! - **Sequential Bayesian fold**: evidence is applied item by item in arrival
//!   order, never averaged.
//! - **Isolated sessions**: per-encounter state lives in an
//!   [`EncounterSession`]; the reasoner and knowledge base are shared.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use clinical_reasoning::{ClinicalReasoner, EncounterSession, SessionId};
//!
//! let reasoner = Arc::new(ClinicalReasoner::with_builtin_knowledge()?);
//! let mut session = EncounterSession::new(SessionId::generate(), reasoner);
//! let snapshot = session.ingest("Crushing chest pain radiating to the left arm.");
//! for alert in &snapshot.alerts {
//!     println!("{} ({})", alert.condition, alert.urgency);
//! }
//! # Ok::<(), clinical_reasoning::ReasoningError>(())
//! ```

#![deny(unsafe_code)]

pub mod belief;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod extraction;
pub mod guidance;
pub mod quality;
pub mod registry;
pub mod rules;
pub mod scoring;
pub mod sink;
pub mod types;

// ── Re-exports ──────────────────────────────────────────────────────────

pub use belief::BeliefUpdater;
pub use catalog::{
    BillingComplexity, ConditionCatalog, ConditionEntry, ConditionId, KnowledgeBase, ScoringRule,
    SectionMarkers, Vocabulary, BUILTIN_KNOWLEDGE,
};
pub use config::{QualityWeights, ReasonerConfig};
pub use engine::{ClinicalReasoner, EncounterSession};
pub use error::{ReasoningError, ReasoningResult};
pub use evidence::{
    BayesianUpdater, ConfidenceUpdate, EvidenceMatch, LikelihoodModel, UpdateDirection,
};
pub use extraction::EvidenceExtractor;
pub use guidance::GuidanceGenerator;
pub use quality::{QualityBreakdown, QualityScorer};
pub use registry::SessionRegistry;
pub use rules::{
    CriticalRule, DecisionRules, StemiPatternRule, StrokePatternRule, TimeCriticalHypothesisRule,
};
pub use scoring::{ClinicalScorer, HeartScorer, ScorerRegistry, WellsScorer};
pub use sink::{SnapshotSink, SnapshotUpdate, WatchSink};
pub use types::{
    ClinicalAlert, DiagnosticAction, DocumentationGuidance, EvidenceCategory, EvidenceItem,
    EvidenceStrength, GuidancePriority, GuidanceType, MedicalHypothesis, ReasoningSnapshot,
    SessionId, SharedEvidence, Urgency,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const MI: &str = "Acute Myocardial Infarction";

    fn session() -> EncounterSession {
        let reasoner = Arc::new(ClinicalReasoner::with_builtin_knowledge().unwrap());
        EncounterSession::new(SessionId::generate(), reasoner)
    }

    #[test]
    fn integration_radiating_chest_pain() {
        let mut session = session();
        let snapshot = session.ingest(
            "Patient reports crushing chest pain radiating to left arm, diaphoresis, \
             history of diabetes and smoking.",
        );

        let symptom = |finding: &str| {
            snapshot
                .evidence
                .iter()
                .any(|e| e.finding == finding && e.category == EvidenceCategory::Symptoms)
        };
        assert!(symptom("chest pain"));
        assert!(symptom("diaphoresis"));

        let top = snapshot.top_hypothesis().unwrap();
        assert_eq!(top.condition, MI);
        assert!(top.probability > 0.02);
        assert!((top.clinical_score - 0.2).abs() < 1e-12);

        assert!(snapshot
            .alerts
            .iter()
            .any(|a| a.urgency == Urgency::Immediate && a.condition == MI));
        assert!(snapshot
            .alerts
            .iter()
            .any(|a| a.triggering_rule == "stemi_pattern"));
    }

    #[test]
    fn integration_denied_symptoms() {
        let mut session = session();
        let snapshot = session.ingest("Patient denies chest pain, denies shortness of breath.");

        assert!(snapshot.evidence.iter().all(|e| e.is_contradictory()));
        for name in [MI, "Pulmonary Embolism", "Aortic Dissection"] {
            assert!(snapshot.hypothesis(name).is_none(), "{name} should be hidden");
        }
        assert!(snapshot.alerts.is_empty());
    }

    #[test]
    fn integration_denied_item_leaves_rest_of_list_positive() {
        let mut session = session();
        let snapshot = session.ingest("No fever, crushing chest pain radiating to left arm.");

        assert!(snapshot.hypothesis(MI).is_some());
        assert!(snapshot
            .alerts
            .iter()
            .any(|a| a.triggering_rule == "stemi_pattern"));
    }

    #[test]
    fn integration_denied_complaint_raises_no_pattern_alert() {
        let mut session = session();
        let snapshot = session.ingest("Presents with dizziness, denies chest pain radiating to the arm.");

        assert!(snapshot
            .alerts
            .iter()
            .all(|a| a.triggering_rule != "stemi_pattern"));
        assert!(snapshot.alerts.is_empty());
    }

    #[test]
    fn integration_repeated_evidence_saturates() {
        let mut session = session();
        let mut last = 0.0;
        for _ in 0..25 {
            let snapshot = session.ingest("crushing chest pain");
            let p = snapshot.hypothesis(MI).map_or(0.0, |h| h.probability);
            assert!(p >= last, "probability must not decrease: {p} < {last}");
            assert!(p <= 0.99);
            last = p;
        }
        assert!(last > 0.98);
    }

    #[test]
    fn integration_empty_input() {
        let mut session = session();
        let first = session.ingest("");
        let second = session.ingest("   ");

        assert!(first.evidence.is_empty());
        assert!(first.alerts.is_empty());
        let probabilities = |s: &ReasoningSnapshot| {
            s.hypotheses
                .iter()
                .map(|h| (h.condition.clone(), h.probability))
                .collect::<Vec<_>>()
        };
        assert_eq!(probabilities(&first), probabilities(&second));

        let missing: Vec<&str> = first
            .guidance
            .iter()
            .filter(|g| g.guidance_type == GuidanceType::MissingElement)
            .map(|g| g.title.as_str())
            .collect();
        assert_eq!(missing, vec!["Missing chief complaint", "Missing history"]);
    }

    #[test]
    fn integration_full_documentation() {
        let mut session = session();
        let snapshot = session.ingest(
            "Chief complaint: chest pressure. 64 year old with HTN and DM, takes Lipitor. \
             Allergic to penicillin. BP 150/95, HR 104. Physical exam: diaphoretic, anxious. \
             Assessment: concern for ACS.",
        );

        let categories: std::collections::HashSet<EvidenceCategory> =
            snapshot.evidence.iter().map(|e| e.category).collect();
        for category in [
            EvidenceCategory::ChiefComplaint,
            EvidenceCategory::History,
            EvidenceCategory::Medications,
            EvidenceCategory::Allergies,
            EvidenceCategory::VitalSigns,
            EvidenceCategory::PhysicalExam,
            EvidenceCategory::Assessment,
        ] {
            assert!(categories.contains(&category), "missing {category}");
        }
        assert!(snapshot
            .guidance
            .iter()
            .all(|g| g.guidance_type != GuidanceType::MissingElement
                && g.guidance_type != GuidanceType::LegalCompliance));
        assert!(snapshot.quality_score > 0.5);
    }

    #[test]
    fn integration_snapshot_serializes() {
        let mut session = session();
        let snapshot = session.ingest("Sudden facial droop and slurred speech, BP 180/100.");
        let json = serde_json::to_value(snapshot.as_ref()).unwrap();
        assert_eq!(json["segment_index"], 1);
        assert!(json["alerts"]
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a["triggering_rule"] == "stroke_pattern"));
    }

    #[test]
    fn integration_all_public_types_accessible() {
        let _config = ReasonerConfig::default();
        let _weights = QualityWeights::default();
        let _updater = BayesianUpdater::default();
        let _model = LikelihoodModel::default();
        let _scorers = ScorerRegistry::new(0.5);
        let _heart = HeartScorer::default();
        let _wells = WellsScorer::default();
        let _rules = DecisionRules::new(0.3);
        let _stemi = StemiPatternRule;
        let _stroke = StrokePatternRule;
        let _time = TimeCriticalHypothesisRule::default();
        let _sink = WatchSink::new();
        let _id = SessionId::generate();
        let _dir = UpdateDirection::Unchanged;
        let _match = EvidenceMatch::Neutral;
        let _rule = ScoringRule::None;
        let _billing = BillingComplexity::Low;
        let knowledge = Arc::new(KnowledgeBase::from_toml_str(BUILTIN_KNOWLEDGE).unwrap());
        let _extractor = EvidenceExtractor::new(&knowledge).unwrap();
        let _beliefs = BeliefUpdater::new(Arc::clone(&knowledge), &ReasonerConfig::default());
        let _guidance = GuidanceGenerator::new(Arc::clone(&knowledge), 0.7);
        let _quality = QualityScorer::new(Arc::clone(&knowledge), QualityWeights::default());
        let reasoner = Arc::new(ClinicalReasoner::new(knowledge, ReasonerConfig::default()).unwrap());
        let _registry = SessionRegistry::new(reasoner);
    }
}

//! Core type definitions for the clinical reasoning engine.
//!
//! These types represent the evidence extracted from an encounter transcript,
//! the hypotheses formed over the condition catalog, and the alerts and
//! documentation guidance derived from them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ConditionId;

// ── Identifier Types ────────────────────────────────────────────────────

/// Identifier of one clinical encounter (one conversation being transcribed).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn generate() -> Self {
        Self(format!("encounter-{}", uuid::Uuid::new_v4()))
    }

    /// Wrap a caller-supplied identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Evidence ────────────────────────────────────────────────────────────

/// Section of the clinical record an evidence item belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    ChiefComplaint,
    History,
    PhysicalExam,
    VitalSigns,
    Symptoms,
    Assessment,
    Medications,
    Allergies,
    SocialHistory,
    FamilyHistory,
}

impl std::fmt::Display for EvidenceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChiefComplaint => write!(f, "chief_complaint"),
            Self::History => write!(f, "history"),
            Self::PhysicalExam => write!(f, "physical_exam"),
            Self::VitalSigns => write!(f, "vital_signs"),
            Self::Symptoms => write!(f, "symptoms"),
            Self::Assessment => write!(f, "assessment"),
            Self::Medications => write!(f, "medications"),
            Self::Allergies => write!(f, "allergies"),
            Self::SocialHistory => write!(f, "social_history"),
            Self::FamilyHistory => write!(f, "family_history"),
        }
    }
}

/// How strongly a finding speaks for (or against) a condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStrength {
    Pathognomonic,
    HighlySuggestive,
    Supportive,
    WeaklySuggestive,
    Contradictory,
}

impl EvidenceStrength {
    /// Fixed numeric weight added to the base likelihood ratio on a keyword hit.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Pathognomonic => 1.0,
            Self::HighlySuggestive => 0.8,
            Self::Supportive => 0.6,
            Self::WeaklySuggestive => 0.3,
            Self::Contradictory => -0.5,
        }
    }
}

impl std::fmt::Display for EvidenceStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pathognomonic => write!(f, "pathognomonic"),
            Self::HighlySuggestive => write!(f, "highly_suggestive"),
            Self::Supportive => write!(f, "supportive"),
            Self::WeaklySuggestive => write!(f, "weakly_suggestive"),
            Self::Contradictory => write!(f, "contradictory"),
        }
    }
}

/// A single normalized fact extracted from a transcript segment.
///
/// Created fresh for every segment and never mutated afterwards. Hypotheses
/// and alerts hold [`SharedEvidence`] handles to the same allocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Normalized (lowercase) finding text.
    pub finding: String,
    /// Record section the finding belongs to.
    pub category: EvidenceCategory,
    /// Strength tag used by the likelihood model.
    pub strength: EvidenceStrength,
    /// Extraction confidence (0.0 to 1.0).
    pub confidence: f64,
    /// Clinical significance (0.0 to 1.0).
    pub clinical_significance: f64,
    /// When the segment carrying this finding was processed.
    pub timestamp: DateTime<Utc>,
}

impl EvidenceItem {
    /// Create an item with neutral confidence and significance.
    pub fn new(
        finding: impl Into<String>,
        category: EvidenceCategory,
        strength: EvidenceStrength,
    ) -> Self {
        Self {
            finding: finding.into(),
            category,
            strength,
            confidence: 0.5,
            clinical_significance: 0.5,
            timestamp: Utc::now(),
        }
    }

    /// Set the extraction confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the clinical significance.
    pub fn with_significance(mut self, significance: f64) -> Self {
        self.clinical_significance = significance.clamp(0.0, 1.0);
        self
    }

    /// Set the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether the finding is a negated mention.
    pub fn is_contradictory(&self) -> bool {
        self.strength == EvidenceStrength::Contradictory
    }

    /// Equality on every field except the timestamp.
    pub fn same_content(&self, other: &EvidenceItem) -> bool {
        self.finding == other.finding
            && self.category == other.category
            && self.strength == other.strength
            && self.confidence == other.confidence
            && self.clinical_significance == other.clinical_significance
    }
}

/// Shared handle to an evidence item owned by a segment's result batch.
pub type SharedEvidence = Arc<EvidenceItem>;

// ── Urgency ─────────────────────────────────────────────────────────────

/// How quickly a hypothesis or alert requires clinical action.
///
/// Variants are ordered from most to least urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Immediate,
    Urgent,
    Priority,
    Routine,
}

impl Urgency {
    /// Classify a decision-time budget.
    ///
    /// Boundaries are exclusive below: 299s is immediate, 300s is urgent.
    pub fn from_time_to_decision(seconds: u32) -> Self {
        match seconds {
            0..=299 => Self::Immediate,
            300..=1799 => Self::Urgent,
            1800..=7199 => Self::Priority,
            _ => Self::Routine,
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate => write!(f, "immediate"),
            Self::Urgent => write!(f, "urgent"),
            Self::Priority => write!(f, "priority"),
            Self::Routine => write!(f, "routine"),
        }
    }
}

/// A workup step statically associated with a condition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticAction {
    pub action: String,
    pub urgency: Urgency,
}

// ── Hypotheses ──────────────────────────────────────────────────────────

/// A candidate condition with its current probability estimate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MedicalHypothesis {
    /// Index of the condition in the catalog.
    pub condition_id: ConditionId,
    /// Display name of the condition.
    pub condition: String,
    /// Current probability, in (0, 0.99].
    pub probability: f64,
    /// Evidence from this segment whose finding matches a condition keyword.
    pub supporting_evidence: Vec<SharedEvidence>,
    /// Every other evidence item from this segment.
    pub contradicting_evidence: Vec<SharedEvidence>,
    /// Condition-specific clinical score (0.0 to 1.0).
    pub clinical_score: f64,
    /// Workup recommended for the condition.
    pub required_workup: Vec<DiagnosticAction>,
    /// Decision-time budget copied from the catalog.
    pub time_to_decision_secs: u32,
    /// Diagnostic code copied from the catalog.
    pub diagnostic_code: Option<String>,
}

impl MedicalHypothesis {
    /// Urgency tier derived from the decision-time budget.
    pub fn urgency(&self) -> Urgency {
        Urgency::from_time_to_decision(self.time_to_decision_secs)
    }
}

// ── Alerts ──────────────────────────────────────────────────────────────

/// A time-critical warning produced by the decision rules.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClinicalAlert {
    pub condition: String,
    pub urgency: Urgency,
    pub time_to_action_secs: u32,
    pub recommended_actions: Vec<String>,
    pub evidence: Vec<SharedEvidence>,
    /// Name of the rule that raised the alert.
    pub triggering_rule: String,
}

// ── Documentation Guidance ──────────────────────────────────────────────

/// Kind of documentation suggestion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceType {
    MissingElement,
    DiagnosisSpecific,
    BillingOptimization,
    QualityImprovement,
    LegalCompliance,
}

impl std::fmt::Display for GuidanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingElement => write!(f, "missing_element"),
            Self::DiagnosisSpecific => write!(f, "diagnosis_specific"),
            Self::BillingOptimization => write!(f, "billing_optimization"),
            Self::QualityImprovement => write!(f, "quality_improvement"),
            Self::LegalCompliance => write!(f, "legal_compliance"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidancePriority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for GuidancePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// A suggestion about content to add to the clinical note.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationGuidance {
    #[serde(rename = "type")]
    pub guidance_type: GuidanceType,
    pub title: String,
    pub description: String,
    pub priority: GuidancePriority,
    pub suggestion: String,
}

// ── Snapshot ────────────────────────────────────────────────────────────

/// Everything the engine derived from one segment.
///
/// A snapshot is replaced wholesale after each segment; consumers never see a
/// partially updated one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReasoningSnapshot {
    /// Number of segments processed when this snapshot was produced.
    pub segment_index: u64,
    /// Evidence extracted from the latest segment.
    pub evidence: Vec<SharedEvidence>,
    /// Ranked hypotheses, most probable first.
    pub hypotheses: Vec<MedicalHypothesis>,
    pub alerts: Vec<ClinicalAlert>,
    pub guidance: Vec<DocumentationGuidance>,
    /// Documentation quality score (0.0 to 1.0).
    pub quality_score: f64,
    /// Version of the knowledge base that produced this snapshot.
    pub knowledge_version: String,
    pub produced_at: DateTime<Utc>,
}

impl ReasoningSnapshot {
    /// The snapshot of a session that has not processed any segment yet.
    pub fn empty(knowledge_version: impl Into<String>) -> Self {
        Self {
            segment_index: 0,
            evidence: Vec::new(),
            hypotheses: Vec::new(),
            alerts: Vec::new(),
            guidance: Vec::new(),
            quality_score: 0.0,
            knowledge_version: knowledge_version.into(),
            produced_at: Utc::now(),
        }
    }

    /// The most probable hypothesis, if any.
    pub fn top_hypothesis(&self) -> Option<&MedicalHypothesis> {
        self.hypotheses.first()
    }

    /// Look up a hypothesis by condition name.
    pub fn hypothesis(&self, condition: &str) -> Option<&MedicalHypothesis> {
        self.hypotheses.iter().find(|h| h.condition == condition)
    }
}

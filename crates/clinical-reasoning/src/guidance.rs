//! Documentation guidance.
//!
//! Guidance looks at which record sections the evidence covers and at the
//! current hypotheses, and suggests what the clinician should add to the note.

use std::sync::Arc;

use tracing::debug;

use crate::catalog::{BillingComplexity, KnowledgeBase};
use crate::types::{
    DocumentationGuidance, EvidenceCategory, GuidancePriority, GuidanceType, MedicalHypothesis,
    SharedEvidence,
};

const BILLING_SUGGESTION: &str = "Document the differential diagnoses considered and the data \
    reviewed to support high-complexity medical decision making.";

/// Produces documentation guidance for one segment.
#[derive(Clone, Debug)]
pub struct GuidanceGenerator {
    knowledge: Arc<KnowledgeBase>,
    diagnosis_threshold: f64,
}

impl GuidanceGenerator {
    pub fn new(knowledge: Arc<KnowledgeBase>, diagnosis_threshold: f64) -> Self {
        Self {
            knowledge,
            diagnosis_threshold,
        }
    }

    /// Guidance items, in a fixed order: missing elements, diagnosis-specific
    /// templates, billing prompts, quality and compliance prompts.
    pub fn guide(
        &self,
        evidence: &[SharedEvidence],
        hypotheses: &[MedicalHypothesis],
    ) -> Vec<DocumentationGuidance> {
        let has = |category: EvidenceCategory| evidence.iter().any(|e| e.category == category);
        let mut guidance = Vec::new();

        if !has(EvidenceCategory::ChiefComplaint) {
            guidance.push(DocumentationGuidance {
                guidance_type: GuidanceType::MissingElement,
                title: "Missing chief complaint".into(),
                description: "No chief complaint has been documented for this encounter.".into(),
                priority: GuidancePriority::High,
                suggestion: "State the primary reason for the visit in the patient's words.".into(),
            });
        }

        if !has(EvidenceCategory::History) {
            guidance.push(DocumentationGuidance {
                guidance_type: GuidanceType::MissingElement,
                title: "Missing history".into(),
                description: "No past medical history or risk factors have been documented.".into(),
                priority: GuidancePriority::High,
                suggestion: "Document relevant past medical history and risk factors.".into(),
            });
        }

        let catalog = self.knowledge.catalog();
        for (hypothesis, suggestion) in hypotheses
            .iter()
            .filter(|h| h.probability > self.diagnosis_threshold)
            .filter_map(|h| self.render_template(h).map(|suggestion| (h, suggestion)))
        {
            guidance.push(DocumentationGuidance {
                guidance_type: GuidanceType::DiagnosisSpecific,
                title: format!("{} documentation", hypothesis.condition),
                description: format!(
                    "{} is the working diagnosis at {:.0}% probability.",
                    hypothesis.condition,
                    hypothesis.probability * 100.0
                ),
                priority: GuidancePriority::High,
                suggestion,
            });
        }

        for hypothesis in hypotheses.iter().filter(|h| {
            catalog
                .resolve(h.condition_id, &h.condition)
                .is_some_and(|entry| entry.billing_complexity == BillingComplexity::High)
        }) {
            guidance.push(DocumentationGuidance {
                guidance_type: GuidanceType::BillingOptimization,
                title: format!("High-complexity decision making: {}", hypothesis.condition),
                description: format!(
                    "{} supports a high-complexity level of service.",
                    hypothesis.condition
                ),
                priority: GuidancePriority::Medium,
                suggestion: BILLING_SUGGESTION.into(),
            });
        }

        if !has(EvidenceCategory::VitalSigns) {
            guidance.push(DocumentationGuidance {
                guidance_type: GuidanceType::QualityImprovement,
                title: "Vital signs not documented".into(),
                description: "No vital signs were captured in this segment.".into(),
                priority: GuidancePriority::Medium,
                suggestion: "Record blood pressure, heart rate, respiratory rate, temperature and oxygen saturation.".into(),
            });
        }

        if has(EvidenceCategory::Medications) && !has(EvidenceCategory::Allergies) {
            guidance.push(DocumentationGuidance {
                guidance_type: GuidanceType::LegalCompliance,
                title: "Allergy status not documented".into(),
                description: "Medications were discussed without a documented allergy status.".into(),
                priority: GuidancePriority::High,
                suggestion: "Document medication allergies or NKDA before prescribing.".into(),
            });
        }

        debug!(guidance = guidance.len(), "Generated documentation guidance");
        guidance
    }

    /// Template text for a hypothesis, or `None` when it names a condition
    /// this knowledge base does not define.
    fn render_template(&self, hypothesis: &MedicalHypothesis) -> Option<String> {
        let entry = self
            .knowledge
            .catalog()
            .resolve(hypothesis.condition_id, &hypothesis.condition)?;
        let risk_factors = if entry.risk_factor_keywords.is_empty() {
            "none listed".to_string()
        } else {
            entry.risk_factor_keywords.join(", ")
        };

        let rendered = self
            .knowledge
            .documentation_template(hypothesis.condition_id)
            .replace("{condition}", &entry.name)
            .replace("{symptoms}", &entry.symptom_keywords.join(", "))
            .replace("{risk_factors}", &risk_factors)
            .replace(
                "{code}",
                entry.diagnostic_code.as_deref().unwrap_or("unspecified"),
            );
        Some(rendered)
    }
}

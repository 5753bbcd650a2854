//! Decision rules for time-critical alerts.
//!
//! Rules are independent of each other and may fire for the same condition
//! in the same segment. Overlapping alerts are left for the presentation
//! layer to merge.

use tracing::debug;

use crate::types::{ClinicalAlert, MedicalHypothesis, SharedEvidence, Urgency};

/// A rule that inspects one segment's evidence and hypotheses.
pub trait CriticalRule: Send + Sync {
    /// Rule identifier recorded on every alert it raises.
    fn name(&self) -> &str;

    fn evaluate(
        &self,
        evidence: &[SharedEvidence],
        hypotheses: &[MedicalHypothesis],
    ) -> Vec<ClinicalAlert>;
}

/// Non-negated evidence items.
fn positive(evidence: &[SharedEvidence]) -> impl Iterator<Item = &SharedEvidence> {
    evidence.iter().filter(|item| !item.is_contradictory())
}

/// Concatenated text of every non-negated finding.
fn pattern_text(evidence: &[SharedEvidence]) -> String {
    positive(evidence)
        .map(|item| item.finding.as_str())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Non-negated items whose finding mentions any of the terms.
fn evidence_mentioning(evidence: &[SharedEvidence], terms: &[&str]) -> Vec<SharedEvidence> {
    positive(evidence)
        .filter(|item| terms.iter().any(|t| item.finding.contains(t)))
        .cloned()
        .collect()
}

// ── Time-Critical Hypothesis ────────────────────────────────────────────

/// Alerts on any immediate-tier hypothesis above a probability threshold.
#[derive(Clone, Debug)]
pub struct TimeCriticalHypothesisRule {
    pub probability_threshold: f64,
}

impl Default for TimeCriticalHypothesisRule {
    fn default() -> Self {
        Self {
            probability_threshold: 0.3,
        }
    }
}

impl CriticalRule for TimeCriticalHypothesisRule {
    fn name(&self) -> &str {
        "time_critical_hypothesis"
    }

    fn evaluate(
        &self,
        _evidence: &[SharedEvidence],
        hypotheses: &[MedicalHypothesis],
    ) -> Vec<ClinicalAlert> {
        hypotheses
            .iter()
            .filter(|h| h.urgency() == Urgency::Immediate && h.probability > self.probability_threshold)
            .map(|h| ClinicalAlert {
                condition: h.condition.clone(),
                urgency: h.urgency(),
                time_to_action_secs: h.time_to_decision_secs,
                recommended_actions: h.required_workup.iter().map(|a| a.action.clone()).collect(),
                evidence: h.supporting_evidence.clone(),
                triggering_rule: self.name().to_string(),
            })
            .collect()
    }
}

// ── Pattern Rules ───────────────────────────────────────────────────────

/// Chest pain with radiation or left-arm involvement.
#[derive(Clone, Debug, Default)]
pub struct StemiPatternRule;

impl StemiPatternRule {
    pub const TIME_TO_ACTION_SECS: u32 = 300;
}

impl CriticalRule for StemiPatternRule {
    fn name(&self) -> &str {
        "stemi_pattern"
    }

    fn evaluate(
        &self,
        evidence: &[SharedEvidence],
        _hypotheses: &[MedicalHypothesis],
    ) -> Vec<ClinicalAlert> {
        let text = pattern_text(evidence);
        if !(text.contains("chest pain") && (text.contains("radiating") || text.contains("left arm"))) {
            return Vec::new();
        }

        vec![ClinicalAlert {
            condition: "Possible STEMI".into(),
            urgency: Urgency::from_time_to_decision(Self::TIME_TO_ACTION_SECS),
            time_to_action_secs: Self::TIME_TO_ACTION_SECS,
            recommended_actions: vec![
                "Obtain 12-lead EKG immediately".into(),
                "Cardiology consult".into(),
                "Prepare for cath lab activation".into(),
            ],
            evidence: evidence_mentioning(evidence, &["chest pain", "radiating", "left arm"]),
            triggering_rule: self.name().to_string(),
        }]
    }
}

/// Focal neurological signs.
#[derive(Clone, Debug, Default)]
pub struct StrokePatternRule;

impl StrokePatternRule {
    pub const TIME_TO_ACTION_SECS: u32 = 180;
    const SIGNS: [&'static str; 3] = ["weakness", "facial droop", "speech"];
}

impl CriticalRule for StrokePatternRule {
    fn name(&self) -> &str {
        "stroke_pattern"
    }

    fn evaluate(
        &self,
        evidence: &[SharedEvidence],
        _hypotheses: &[MedicalHypothesis],
    ) -> Vec<ClinicalAlert> {
        let text = pattern_text(evidence);
        if !Self::SIGNS.iter().any(|sign| text.contains(sign)) {
            return Vec::new();
        }

        vec![ClinicalAlert {
            condition: "Possible Stroke".into(),
            urgency: Urgency::from_time_to_decision(Self::TIME_TO_ACTION_SECS),
            time_to_action_secs: Self::TIME_TO_ACTION_SECS,
            recommended_actions: vec![
                "Activate stroke team".into(),
                "Non-contrast head CT".into(),
                "Establish last known well time".into(),
            ],
            evidence: evidence_mentioning(evidence, &Self::SIGNS),
            triggering_rule: self.name().to_string(),
        }]
    }
}

// ── Decision Rules ──────────────────────────────────────────────────────

/// Runs every registered rule and concatenates their alerts.
pub struct DecisionRules {
    rules: Vec<Box<dyn CriticalRule>>,
}

impl DecisionRules {
    /// The hypothesis-threshold rule plus the STEMI and stroke patterns.
    pub fn new(alert_probability_threshold: f64) -> Self {
        Self::with_rules(vec![
            Box::new(TimeCriticalHypothesisRule {
                probability_threshold: alert_probability_threshold,
            }),
            Box::new(StemiPatternRule),
            Box::new(StrokePatternRule),
        ])
    }

    pub fn with_rules(rules: Vec<Box<dyn CriticalRule>>) -> Self {
        Self { rules }
    }

    /// Alerts raised by all rules, in rule order. No deduplication.
    pub fn check_critical(
        &self,
        evidence: &[SharedEvidence],
        hypotheses: &[MedicalHypothesis],
    ) -> Vec<ClinicalAlert> {
        let alerts: Vec<ClinicalAlert> = self
            .rules
            .iter()
            .flat_map(|rule| rule.evaluate(evidence, hypotheses))
            .collect();

        debug!(alerts = alerts.len(), "Checked decision rules");
        alerts
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl std::fmt::Debug for DecisionRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionRules")
            .field("rules", &self.rule_names())
            .finish()
    }
}

//! Engine configuration.
//!
//! Thresholds live here; clinical content (conditions, vocabularies) lives in
//! the knowledge base. Both are validated once, before any segment is processed.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReasoningError, ReasoningResult};

/// Weights of the four documentation-quality sub-scores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub coverage: f64,
    pub probability: f64,
    pub term_density: f64,
    pub structure: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            coverage: 0.30,
            probability: 0.25,
            term_density: 0.25,
            structure: 0.20,
        }
    }
}

impl QualityWeights {
    fn sum(&self) -> f64 {
        self.coverage + self.probability + self.term_density + self.structure
    }
}

/// Configuration for the reasoning engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    /// Hypotheses at or below this probability are not reported.
    pub visibility_floor: f64,
    /// Upper clamp applied to every probability.
    pub probability_ceiling: f64,
    /// Immediate-tier hypotheses above this probability raise an alert.
    pub alert_probability_threshold: f64,
    /// Hypotheses above this probability get diagnosis-specific guidance.
    pub diagnosis_guidance_threshold: f64,
    /// Clinical score for conditions without a scoring rule.
    pub default_clinical_score: f64,
    /// Documentation-quality sub-score weights.
    pub quality_weights: QualityWeights,
    /// Maximum number of concurrently registered encounter sessions.
    pub max_sessions: usize,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            visibility_floor: 0.05,
            probability_ceiling: 0.99,
            alert_probability_threshold: 0.3,
            diagnosis_guidance_threshold: 0.7,
            default_clinical_score: 0.5,
            quality_weights: QualityWeights::default(),
            max_sessions: 1024,
        }
    }
}

impl ReasonerConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> ReasoningResult<Self> {
        let config: ReasonerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ReasoningResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Check that every threshold is in range.
    pub fn validate(&self) -> ReasoningResult<()> {
        let unit = |name: &str, value: f64| -> ReasoningResult<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ReasoningError::Configuration(format!(
                    "{name} must be within [0, 1], got {value}"
                )))
            }
        };

        if !(self.probability_ceiling > 0.0 && self.probability_ceiling <= 1.0) {
            return Err(ReasoningError::Configuration(format!(
                "probability_ceiling must be within (0, 1], got {}",
                self.probability_ceiling
            )));
        }
        unit("visibility_floor", self.visibility_floor)?;
        unit("alert_probability_threshold", self.alert_probability_threshold)?;
        unit("diagnosis_guidance_threshold", self.diagnosis_guidance_threshold)?;
        unit("default_clinical_score", self.default_clinical_score)?;

        if self.visibility_floor >= self.probability_ceiling {
            return Err(ReasoningError::Configuration(format!(
                "visibility_floor {} must be below probability_ceiling {}",
                self.visibility_floor, self.probability_ceiling
            )));
        }

        let weights = &self.quality_weights;
        for (name, value) in [
            ("quality_weights.coverage", weights.coverage),
            ("quality_weights.probability", weights.probability),
            ("quality_weights.term_density", weights.term_density),
            ("quality_weights.structure", weights.structure),
        ] {
            unit(name, value)?;
        }
        if (weights.sum() - 1.0).abs() > 1e-6 {
            return Err(ReasoningError::Configuration(format!(
                "quality weights must sum to 1, got {}",
                weights.sum()
            )));
        }

        if self.max_sessions == 0 {
            return Err(ReasoningError::Configuration(
                "max_sessions must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let cfg = ReasonerConfig::default();
        assert!((cfg.visibility_floor - 0.05).abs() < f64::EPSILON);
        assert!((cfg.probability_ceiling - 0.99).abs() < f64::EPSILON);
        assert!((cfg.alert_probability_threshold - 0.3).abs() < f64::EPSILON);
        assert!((cfg.diagnosis_guidance_threshold - 0.7).abs() < f64::EPSILON);
        assert!((cfg.default_clinical_score - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.max_sessions, 1024);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = ReasonerConfig::from_toml_str(
            r#"
            alert_probability_threshold = 0.4

            [quality_weights]
            coverage = 0.4
            probability = 0.2
            term_density = 0.2
            structure = 0.2
            "#,
        )
        .unwrap();
        assert!((cfg.alert_probability_threshold - 0.4).abs() < f64::EPSILON);
        assert!((cfg.visibility_floor - 0.05).abs() < f64::EPSILON);
        assert!((cfg.quality_weights.coverage - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_floor_above_ceiling() {
        let cfg = ReasonerConfig {
            visibility_floor: 0.995,
            ..ReasonerConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("visibility_floor"));
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let cfg = ReasonerConfig {
            quality_weights: QualityWeights {
                coverage: 0.5,
                ..QualityWeights::default()
            },
            ..ReasonerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_ceiling() {
        let cfg = ReasonerConfig {
            probability_ceiling: 0.0,
            ..ReasonerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = ReasonerConfig::load("/nonexistent/reasoner.toml").unwrap_err();
        assert!(matches!(err, ReasoningError::Io(_)));
    }
}

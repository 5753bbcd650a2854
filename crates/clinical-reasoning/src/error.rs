//! Error types for the clinical reasoning engine.
//!
//! Segment processing is total; only loading configuration and clinical
//! content, and addressing sessions, can fail.

use thiserror::Error;

/// Errors that can occur while building or driving the reasoning engine.
#[derive(Debug, Error)]
pub enum ReasoningError {
    /// Engine configuration is out of range.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A condition catalog entry failed validation.
    #[error("invalid catalog entry '{condition}': {reason}")]
    CatalogValidation { condition: String, reason: String },

    /// Knowledge base or configuration file could not be parsed.
    #[error("knowledge base parse error: {0}")]
    KnowledgeParse(#[from] toml::de::Error),

    /// Knowledge base or configuration file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A vocabulary pattern could not be compiled.
    #[error("pattern compilation failed: {0}")]
    Pattern(#[from] regex::Error),

    /// Condition name not present in the catalog.
    #[error("unknown condition: {0}")]
    UnknownCondition(String),

    /// Session identifier not registered.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Session identifier already registered.
    #[error("session already exists: {0}")]
    SessionExists(String),

    /// Session registry is at capacity.
    #[error("too many concurrent sessions (limit {0})")]
    TooManySessions(usize),
}

impl ReasoningError {
    /// Whether this error was raised while loading configuration or content.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::CatalogValidation { .. }
                | Self::KnowledgeParse(_)
                | Self::Pattern(_)
        )
    }
}

/// Result type for reasoning engine operations.
pub type ReasoningResult<T> = Result<T, ReasoningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = ReasoningError::Configuration("visibility floor above ceiling".into());
        assert_eq!(
            err.to_string(),
            "configuration error: visibility floor above ceiling"
        );

        let err = ReasoningError::CatalogValidation {
            condition: "sepsis".into(),
            reason: "base prior 1.2 outside (0, 1)".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid catalog entry 'sepsis': base prior 1.2 outside (0, 1)"
        );

        let err = ReasoningError::SessionNotFound("encounter-1".into());
        assert_eq!(err.to_string(), "session not found: encounter-1");

        let err = ReasoningError::TooManySessions(4);
        assert_eq!(err.to_string(), "too many concurrent sessions (limit 4)");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReasoningError>();
    }

    #[test]
    fn parse_errors_convert() {
        let parse: Result<toml::Value, _> = toml::from_str("version = ");
        let err: ReasoningError = parse.unwrap_err().into();
        assert!(err.is_configuration());
        assert!(err.to_string().starts_with("knowledge base parse error"));
    }

    #[test]
    fn session_errors_are_not_configuration() {
        assert!(!ReasoningError::SessionNotFound("x".into()).is_configuration());
        assert!(!ReasoningError::UnknownCondition("x".into()).is_configuration());
        assert!(ReasoningError::Configuration("x".into()).is_configuration());
    }
}

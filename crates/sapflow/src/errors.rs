use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Transient UI failure: {0}")]
    TransientUi(String),

    #[error("Validation rejected: {0}")]
    Validation(String),

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Session error: {0}")]
    Session(String),
}

impl EngineError {
    /// Transient errors are worth retrying; everything else is terminal
    /// at its granularity (field, screen, transaction or batch).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::ElementNotFound(_) | EngineError::TransientUi(_) | EngineError::Session(_)
        )
    }

    /// Stable label recorded in error artifacts and batch summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Configuration(_) => "configuration",
            EngineError::ElementNotFound(_) => "element_not_found",
            EngineError::TransientUi(_) => "transient_ui",
            EngineError::Validation(_) => "validation",
            EngineError::Environment(_) => "environment",
            EngineError::Unsupported(_) => "unsupported",
            EngineError::Cancelled(_) => "cancelled",
            EngineError::Session(_) => "session",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(EngineError::ElementNotFound("x".into()).is_transient());
        assert!(EngineError::TransientUi("busy".into()).is_transient());
        assert!(!EngineError::Validation("rejected".into()).is_transient());
        assert!(!EngineError::Configuration("bad map".into()).is_transient());
    }

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(EngineError::Validation("x".into()).kind(), "validation");
        assert_eq!(EngineError::Cancelled("x".into()).kind(), "cancelled");
    }
}

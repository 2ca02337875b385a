use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Phase `{phase}` is not declared in workflow `{workflow}`")]
    UnknownPhase { workflow: String, phase: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CoreError::UnknownPhase {
            workflow: "epcc".to_string(),
            phase: "deploy".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Phase `deploy` is not declared in workflow `epcc`"
        );
    }
}

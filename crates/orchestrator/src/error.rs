use devflow_core::CoreError;
use plugins::HookError;
use thiserror::Error;
use workflow::WorkflowError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed workflow, unknown workflow or a reference to an undeclared phase.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A gating hook refused the operation; the message is the plugin's own.
    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Review required before moving from `{from}` to `{to}` (perspectives: {perspectives})")]
    ReviewRequired {
        from: String,
        to: String,
        perspectives: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OrchestratorError {
    pub fn conversation_not_found(conversation_id: impl Into<String>) -> Self {
        Self::Core(CoreError::ConversationNotFound(conversation_id.into()))
    }

    /// True when a gating plugin blocked the operation.
    pub fn is_rejected_by_hook(&self) -> bool {
        matches!(self, Self::Hook(HookError::Rejected { .. }))
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid workflow YAML in {source_name}: {source}")]
    Parse {
        source_name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid workflow `{name}`: {reason}")]
    Invalid { name: String, reason: String },

    #[error("Phase `{phase}` is not declared in workflow `{workflow}`")]
    PhaseNotFound { workflow: String, phase: String },

    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl WorkflowError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn phase_not_found(workflow: impl Into<String>, phase: impl Into<String>) -> Self {
        Self::PhaseNotFound {
            workflow: workflow.into(),
            phase: phase.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

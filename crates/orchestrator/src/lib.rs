pub mod composer;
pub mod config;
pub mod error;
pub mod guidance;
pub mod orchestrator;
pub mod plan;
pub mod results;
pub mod store;

pub use composer::{CompositionInput, InstructionComposer, VariableSubstitutions};
pub use config::{
    resolve_task_backend, ProjectConfig, TaskBackend, TaskBackendSetting, TASK_BACKEND_ENV,
};
pub use error::{OrchestratorError, Result};
pub use guidance::{guidance_for, BeadsGuidance, ComposeMode, MarkdownGuidance, TaskGuidance};
pub use orchestrator::ConversationOrchestrator;
pub use plan::PlanManager;
pub use results::{
    ProceedToPhaseRequest, ProceedToPhaseResult, ResetResult, StartDevelopmentRequest,
    StartDevelopmentResult, WhatsNextRequest, WhatsNextResult,
};
pub use store::{FileStateStore, MemoryStateStore, StateStore};

use devflow_core::ConversationState;
use std::path::PathBuf;

/// Read-only snapshot of a conversation handed to hook handlers.
///
/// For `afterPhaseTransition`, `current_phase` is the phase that was left and
/// `target_phase` the one entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginHookContext {
    pub conversation_id: String,
    pub plan_file_path: PathBuf,
    pub current_phase: String,
    pub workflow: String,
    pub project_path: PathBuf,
    pub git_branch: String,
    pub target_phase: Option<String>,
}

impl PluginHookContext {
    pub fn from_state(state: &ConversationState) -> Self {
        Self {
            conversation_id: state.conversation_id.clone(),
            plan_file_path: state.plan_file_path.clone(),
            current_phase: state.current_phase.clone(),
            workflow: state.workflow_name.clone(),
            project_path: state.project_path.clone(),
            git_branch: state.git_branch.clone(),
            target_phase: None,
        }
    }

    pub fn with_target_phase(mut self, phase: impl Into<String>) -> Self {
        self.target_phase = Some(phase.into());
        self
    }
}

//! Conversation Orchestrator
//!
//! Ties the workflow graph, plugin hooks, persistence and instruction composition into the
//! operations exposed to the outer boundary. One orchestrator serves one project checkout
//! and branch; callers serialize operations per conversation.

use devflow_core::{
    conversation_id_for, ConversationState, CoreError, ReviewState, WorkflowDefinition,
};
use plugins::{HookName, Plugin, PluginHookContext, PluginRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use workflow::{TransitionResolver, WorkflowManager, WorkflowSummary};

use crate::composer::{CompositionInput, InstructionComposer, VariableSubstitutions};
use crate::config::{resolve_task_backend, ProjectConfig};
use crate::error::{OrchestratorError, Result};
use crate::guidance::{guidance_for, ComposeMode, TaskGuidance};
use crate::plan::PlanManager;
use crate::results::{
    ProceedToPhaseRequest, ProceedToPhaseResult, ResetResult, StartDevelopmentRequest,
    StartDevelopmentResult, WhatsNextRequest, WhatsNextResult,
};
use crate::store::StateStore;

pub struct ConversationOrchestrator {
    project_path: PathBuf,
    git_branch: String,
    conversation_id: String,
    store: Arc<dyn StateStore>,
    workflows: WorkflowManager,
    plugins: PluginRegistry,
    composer: InstructionComposer,
    plans: PlanManager,
    variables: VariableSubstitutions,
    require_reviews_by_default: bool,
}

/// A loaded conversation together with its workflow graph.
struct Session {
    state: ConversationState,
    resolver: TransitionResolver,
}

impl ConversationOrchestrator {
    pub fn new(
        project_path: impl Into<PathBuf>,
        git_branch: impl Into<String>,
        store: Arc<dyn StateStore>,
        guidance: Arc<dyn TaskGuidance>,
    ) -> Result<Self> {
        let project_path = project_path.into();
        let git_branch = git_branch.into();
        if git_branch.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "git branch must not be empty".to_string(),
            ));
        }

        let variables = VariableSubstitutions::for_project(&project_path, &git_branch)?;
        Ok(Self {
            conversation_id: conversation_id_for(&project_path, &git_branch),
            workflows: WorkflowManager::new(&project_path),
            plans: PlanManager::new(project_path.clone()),
            composer: InstructionComposer::new(guidance),
            plugins: PluginRegistry::new(),
            require_reviews_by_default: false,
            project_path,
            git_branch,
            store,
            variables,
        })
    }

    /// Build from project configuration, resolving the task backend once.
    pub fn from_config(
        project_path: impl Into<PathBuf>,
        git_branch: impl Into<String>,
        store: Arc<dyn StateStore>,
        config: &ProjectConfig,
        beads_available: bool,
    ) -> Result<Self> {
        let backend = resolve_task_backend(config.task_backend, beads_available)?;
        info!(?backend, "Resolved task backend");
        Ok(Self::new(project_path, git_branch, store, guidance_for(backend))?.with_config(config))
    }

    pub fn with_config(mut self, config: &ProjectConfig) -> Self {
        self.workflows = WorkflowManager::new(&self.project_path)
            .with_enabled_workflows(config.enabled_workflows.clone());
        self.require_reviews_by_default = config.require_reviews;
        self
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.register(plugin);
        self
    }

    pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn with_variables(mut self, variables: VariableSubstitutions) -> Self {
        self.variables = variables;
        self
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    pub fn git_branch(&self) -> &str {
        &self.git_branch
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn plugins_mut(&mut self) -> &mut PluginRegistry {
        &mut self.plugins
    }

    pub async fn current_state(&self) -> Result<Option<ConversationState>> {
        self.store.get_state(&self.conversation_id).await
    }

    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        Ok(self.workflows.list_workflows().await?)
    }

    /// Begin a conversation on `request.workflow` at its initial phase.
    ///
    /// Any previous state for this conversation is replaced. The plan file is only
    /// written when it does not exist yet.
    pub async fn start_development(
        &self,
        request: StartDevelopmentRequest,
    ) -> Result<StartDevelopmentResult> {
        let workflow_name = request.workflow.trim();
        if workflow_name.is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "workflow name must not be empty".to_string(),
            ));
        }

        let definition = self.workflows.load(workflow_name).await?;
        let plan_path = self.plans.plan_path(&self.git_branch);
        let require_reviews = request
            .require_reviews
            .unwrap_or(self.require_reviews_by_default);

        let state = ConversationState::new(
            self.conversation_id.clone(),
            self.project_path.clone(),
            self.git_branch.clone(),
            // The load key, which may differ from `definition.name` for project files.
            workflow_name,
            definition.initial_state.clone(),
            plan_path.clone(),
        )
        .with_required_reviews(require_reviews);

        if let Some(previous) = self.store.get_state(&self.conversation_id).await? {
            info!(
                conversation_id = %self.conversation_id,
                previous_workflow = %previous.workflow_name,
                previous_phase = %previous.current_phase,
                "Replacing existing conversation state"
            );
        }

        self.ensure_plan_file(&state, &definition).await?;
        self.store.save_state(&state).await?;

        info!(
            conversation_id = %state.conversation_id,
            workflow = %state.workflow_name,
            phase = %state.current_phase,
            require_reviews,
            "Development started"
        );

        self.plugins
            .execute_hook(
                HookName::AfterStartDevelopment,
                &PluginHookContext::from_state(&state),
            )
            .await?;

        let resolver = TransitionResolver::new(definition);
        let instructions = resolver.resolve_continuation(&state.current_phase)?;
        let instructions = self
            .compose(&state, &instructions, ComposeMode::Continue, None, false)
            .await;

        Ok(StartDevelopmentResult {
            phase: state.current_phase,
            instructions,
            plan_file_path: state.plan_file_path,
        })
    }

    /// Move the conversation to `request.target_phase`.
    ///
    /// Nothing is persisted unless the review gate and every gating plugin accept the move.
    pub async fn proceed_to_phase(
        &self,
        request: ProceedToPhaseRequest,
    ) -> Result<ProceedToPhaseResult> {
        let target = request.target_phase.trim();
        if target.is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "target phase must not be empty".to_string(),
            ));
        }

        let Session { state, resolver } = self.load_session().await?;
        let from = state.current_phase.clone();
        let trigger = request.trigger.as_deref();

        if state.require_reviews_before_phase_transition {
            check_review_gate(resolver.definition(), &from, target, trigger, request.review_state)?;
        }

        let ctx = PluginHookContext::from_state(&state).with_target_phase(target);
        self.plugins
            .execute_hook(HookName::BeforePhaseTransition, &ctx)
            .await?;

        let resolved = resolver.resolve_explicit(&from, target, trigger)?;
        let transition_reason = match request.reason.as_deref().map(str::trim) {
            Some(reason) if !reason.is_empty() => reason.to_string(),
            _ => resolved.transition_reason,
        };

        let mut next = state;
        next.enter_phase(target);

        let instructions = self
            .compose(
                &next,
                &resolved.instructions,
                ComposeMode::Transition,
                Some(&transition_reason),
                resolved.is_modeled,
            )
            .await;

        self.store.save_state(&next).await?;

        info!(
            conversation_id = %next.conversation_id,
            from = %from,
            to = %next.current_phase,
            is_modeled = resolved.is_modeled,
            "Phase transition"
        );

        // Hooks see the phase that was left as current and the entered one as target.
        let mut after_ctx = PluginHookContext::from_state(&next).with_target_phase(target);
        after_ctx.current_phase = from;
        self.plugins
            .execute_hook(HookName::AfterPhaseTransition, &after_ctx)
            .await?;

        Ok(ProceedToPhaseResult {
            phase: next.current_phase,
            instructions,
            plan_file_path: next.plan_file_path,
            transition_reason,
            is_modeled_transition: resolved.is_modeled,
        })
    }

    /// Instructions for the current phase. Never mutates state.
    pub async fn whats_next(&self, request: WhatsNextRequest) -> Result<WhatsNextResult> {
        let Session { state, resolver } = self.load_session().await?;
        debug!(
            conversation_id = %state.conversation_id,
            phase = %state.current_phase,
            has_context = request.context.is_some(),
            has_user_input = request.user_input.is_some(),
            has_summary = request.conversation_summary.is_some(),
            "whats_next"
        );

        let instructions = resolver.resolve_continuation(&state.current_phase)?;
        let instructions = self
            .compose(&state, &instructions, ComposeMode::Continue, None, false)
            .await;

        Ok(WhatsNextResult {
            phase: state.current_phase,
            instructions,
            plan_file_path: state.plan_file_path,
        })
    }

    /// Drop the conversation state and the plan file.
    pub async fn reset_development(
        &self,
        confirm: bool,
        reason: Option<&str>,
    ) -> Result<ResetResult> {
        if !confirm {
            return Err(OrchestratorError::InvalidRequest(
                "reset must be explicitly confirmed".to_string(),
            ));
        }

        let plan_path = match self.store.get_state(&self.conversation_id).await? {
            Some(state) => state.plan_file_path,
            None => self.plans.plan_path(&self.git_branch),
        };

        let mut reset_items = Vec::new();
        if self.store.delete_state(&self.conversation_id).await? {
            reset_items.push("conversation_state".to_string());
        }
        if self.plans.delete(&plan_path).await? {
            reset_items.push("plan_file".to_string());
        }

        let mut message = if reset_items.is_empty() {
            format!("Nothing to reset for conversation {}", self.conversation_id)
        } else {
            format!(
                "Reset conversation {}: removed {}",
                self.conversation_id,
                reset_items.join(", ")
            )
        };
        if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
            message.push_str(&format!(" (reason: {reason})"));
        }

        info!(
            conversation_id = %self.conversation_id,
            items = ?reset_items,
            reason = reason.unwrap_or(""),
            "Development reset"
        );
        Ok(ResetResult {
            reset_items,
            message,
        })
    }

    async fn load_session(&self) -> Result<Session> {
        let state = self
            .store
            .get_state(&self.conversation_id)
            .await?
            .ok_or_else(|| OrchestratorError::conversation_not_found(&self.conversation_id))?;

        let definition = self.workflows.load(&state.workflow_name).await?;
        if !definition.has_phase(&state.current_phase) {
            return Err(CoreError::UnknownPhase {
                workflow: state.workflow_name.clone(),
                phase: state.current_phase.clone(),
            }
            .into());
        }

        Ok(Session {
            state,
            resolver: TransitionResolver::new(definition),
        })
    }

    async fn ensure_plan_file(
        &self,
        state: &ConversationState,
        definition: &WorkflowDefinition,
    ) -> Result<()> {
        let path = &state.plan_file_path;
        if self.plans.exists(path).await {
            debug!(path = %path.display(), "Plan file already exists, leaving it untouched");
            return Ok(());
        }

        let content = self.plans.initial_content(definition, &state.git_branch);
        let content = self
            .plugins
            .execute_transform(
                HookName::AfterPlanFileCreated,
                &PluginHookContext::from_state(state),
                content,
            )
            .await?;
        self.plans.write(path, &content).await
    }

    async fn compose(
        &self,
        state: &ConversationState,
        instructions: &str,
        mode: ComposeMode,
        transition_reason: Option<&str>,
        is_modeled: bool,
    ) -> String {
        let plan_file_exists = self.plans.exists(&state.plan_file_path).await;
        self.composer.compose(
            &CompositionInput {
                instructions,
                phase: &state.current_phase,
                workflow: &state.workflow_name,
                project_path: &state.project_path,
                git_branch: &state.git_branch,
                plan_file_path: &state.plan_file_path,
                plan_file_exists,
                mode,
                transition_reason,
                is_modeled,
            },
            &self.variables,
        )
    }
}

/// Reviews are only demanded for modeled transitions that declare perspectives.
fn check_review_gate(
    definition: &WorkflowDefinition,
    from: &str,
    to: &str,
    trigger: Option<&str>,
    review_state: ReviewState,
) -> Result<()> {
    let Some(transition) = definition.transition(from, to, trigger) else {
        return Ok(());
    };

    if !transition.requires_review() || review_state == ReviewState::Performed {
        return Ok(());
    }

    let perspectives = transition
        .review_perspectives
        .iter()
        .map(|p| p.perspective.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    warn!(
        from,
        to,
        review_state = review_state.as_str(),
        "Transition blocked until reviews are performed"
    );
    Err(OrchestratorError::ReviewRequired {
        from: from.to_string(),
        to: to.to_string(),
        perspectives,
    })
}

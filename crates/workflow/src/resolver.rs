use devflow_core::{TransitionDef, WorkflowDefinition};
use std::sync::Arc;

use crate::error::{Result, WorkflowError};

/// Outcome of resolving an explicit phase change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitTransition {
    pub instructions: String,
    pub transition_reason: String,
    /// Whether the move is declared in the graph or a direct jump.
    pub is_modeled: bool,
}

/// Resolves phase moves against a validated workflow graph.
#[derive(Debug, Clone)]
pub struct TransitionResolver {
    definition: Arc<WorkflowDefinition>,
}

impl TransitionResolver {
    pub fn new(definition: Arc<WorkflowDefinition>) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    /// Resolve a move from `from` to `to`.
    ///
    /// Transitions out of `from` are scanned in declaration order and the first one
    /// targeting `to` (and carrying `trigger`, when one is given) wins. Without a match
    /// the move is still allowed but reported as unmodeled, using the target's defaults.
    pub fn resolve_explicit(
        &self,
        from: &str,
        to: &str,
        trigger: Option<&str>,
    ) -> Result<ExplicitTransition> {
        self.require_phase(from)?;
        let to_state = self.require_phase(to)?;

        match self.definition.transition(from, to, trigger) {
            Some(transition) => Ok(ExplicitTransition {
                instructions: compose(transition, &to_state.default_instructions),
                transition_reason: transition.transition_reason.clone(),
                is_modeled: true,
            }),
            None => Ok(ExplicitTransition {
                instructions: to_state.default_instructions.clone(),
                transition_reason: format!("Direct transition from {from} to {to}"),
                is_modeled: false,
            }),
        }
    }

    /// Instructions for staying in `phase`, honoring a declared self-transition.
    pub fn resolve_continuation(&self, phase: &str) -> Result<String> {
        let state = self.require_phase(phase)?;
        let instructions = state
            .transitions
            .iter()
            .find(|t| t.to == phase)
            .map(|t| compose(t, &state.default_instructions))
            .unwrap_or_else(|| state.default_instructions.clone());
        Ok(instructions)
    }

    /// Declared transitions out of `phase`, in order. Unknown phases yield nothing.
    pub fn possible_transitions(&self, phase: &str) -> Vec<&TransitionDef> {
        self.definition
            .state(phase)
            .map(|s| s.transitions.iter().collect())
            .unwrap_or_default()
    }

    fn require_phase(&self, phase: &str) -> Result<&devflow_core::StateDef> {
        self.definition
            .state(phase)
            .ok_or_else(|| WorkflowError::phase_not_found(&self.definition.name, phase))
    }
}

fn compose(transition: &TransitionDef, default_instructions: &str) -> String {
    let base = transition
        .instructions
        .as_deref()
        .unwrap_or(default_instructions);
    match transition.additional_instructions.as_deref() {
        Some(extra) if !extra.trim().is_empty() => {
            format!("{base}\n\n**Additional Context:**\n{extra}")
        }
        _ => base.to_string(),
    }
}

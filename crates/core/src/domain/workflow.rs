use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};

/// A declarative phase graph that drives a development conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WorkflowDefinition {
    pub name: String,
    pub description: String,
    pub initial_state: String,
    pub states: BTreeMap<String, StateDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<WorkflowMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StateDef {
    pub description: String,
    pub default_instructions: String,
    #[serde(default)]
    pub transitions: Vec<TransitionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TransitionDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    pub to: String,
    /// Why the move is taken; surfaced to the agent when the transition is modeled.
    pub transition_reason: String,
    /// Replaces the target phase's default instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Appended after the base instructions as an "Additional Context" block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub review_perspectives: Vec<ReviewPerspective>,
}

impl TransitionDef {
    /// True when no trigger is requested or the requested one equals this transition's.
    pub fn matches(&self, to: &str, trigger: Option<&str>) -> bool {
        if self.to != to {
            return false;
        }
        match trigger {
            Some(wanted) => self.trigger.as_deref() == Some(wanted),
            None => true,
        }
    }

    pub fn requires_review(&self) -> bool {
        !self.review_perspectives.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReviewPerspective {
    pub perspective: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WorkflowMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub best_for: Vec<String>,
}

impl WorkflowDefinition {
    pub fn state(&self, phase: &str) -> Option<&StateDef> {
        self.states.get(phase)
    }

    pub fn has_phase(&self, phase: &str) -> bool {
        self.states.contains_key(phase)
    }

    /// First declared transition out of `from` that targets `to`, honoring `trigger`.
    pub fn transition(
        &self,
        from: &str,
        to: &str,
        trigger: Option<&str>,
    ) -> Option<&TransitionDef> {
        self.state(from)?
            .transitions
            .iter()
            .find(|t| t.matches(to, trigger))
    }

    /// Phase ids in graph order: breadth-first from the initial state, following
    /// transitions in declaration order, then unreachable phases lexically.
    pub fn phases(&self) -> Vec<&str> {
        let mut ordered = Vec::with_capacity(self.states.len());
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some((id, _)) = self.states.get_key_value(self.initial_state.as_str()) {
            queue.push_back(id.as_str());
            seen.insert(id.as_str());
        }

        while let Some(phase) = queue.pop_front() {
            ordered.push(phase);
            let Some(state) = self.states.get(phase) else {
                continue;
            };
            for transition in &state.transitions {
                if let Some((id, _)) = self.states.get_key_value(transition.to.as_str()) {
                    if seen.insert(id.as_str()) {
                        queue.push_back(id.as_str());
                    }
                }
            }
        }

        for id in self.states.keys() {
            if seen.insert(id.as_str()) {
                ordered.push(id.as_str());
            }
        }

        ordered
    }
}

/// "requirements" -> "Requirements"
pub fn capitalize_phase(phase: &str) -> String {
    let mut chars = phase.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

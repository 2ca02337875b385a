//! Flat result shapes returned to the outer boundary.

use devflow_core::ReviewState;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StartDevelopmentResult {
    pub phase: String,
    pub instructions: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub plan_file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProceedToPhaseResult {
    pub phase: String,
    pub instructions: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub plan_file_path: PathBuf,
    pub transition_reason: String,
    pub is_modeled_transition: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WhatsNextResult {
    pub phase: String,
    pub instructions: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub plan_file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResetResult {
    pub reset_items: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartDevelopmentRequest {
    pub workflow: String,
    /// Falls back to the project config when unset.
    #[serde(default)]
    pub require_reviews: Option<bool>,
}

impl StartDevelopmentRequest {
    pub fn new(workflow: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            require_reviews: None,
        }
    }

    pub fn with_required_reviews(mut self, required: bool) -> Self {
        self.require_reviews = Some(required);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProceedToPhaseRequest {
    pub target_phase: String,
    #[serde(default)]
    pub reason: Option<String>,
    /// Selects among same-target transitions.
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub review_state: ReviewState,
}

impl ProceedToPhaseRequest {
    pub fn new(target_phase: impl Into<String>) -> Self {
        Self {
            target_phase: target_phase.into(),
            ..Default::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    pub fn with_review_state(mut self, review_state: ReviewState) -> Self {
        self.review_state = review_state;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhatsNextRequest {
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub user_input: Option<String>,
    #[serde(default)]
    pub conversation_summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn keys<T: Serialize>(value: &T) -> BTreeSet<String> {
        serde_json::to_value(value)
            .unwrap()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect()
    }

    #[test]
    fn test_proceed_result_keys() {
        let result = ProceedToPhaseResult {
            phase: "plan".to_string(),
            instructions: "Plan it".to_string(),
            plan_file_path: PathBuf::from("plan.md"),
            transition_reason: "ready".to_string(),
            is_modeled_transition: true,
        };
        let expected: BTreeSet<String> = [
            "phase",
            "instructions",
            "plan_file_path",
            "transition_reason",
            "is_modeled_transition",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(keys(&result), expected);
    }

    #[test]
    fn test_whats_next_result_keys() {
        let result = WhatsNextResult {
            phase: "code".to_string(),
            instructions: "Code it".to_string(),
            plan_file_path: PathBuf::from("plan.md"),
        };
        let expected: BTreeSet<String> = ["phase", "instructions", "plan_file_path"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(keys(&result), expected);
    }

    #[test]
    fn test_proceed_request_defaults() {
        let request: ProceedToPhaseRequest =
            serde_json::from_str(r#"{"target_phase":"code"}"#).unwrap();
        assert_eq!(request.review_state, ReviewState::NotRequired);
        assert!(request.reason.is_none());

        let request = ProceedToPhaseRequest::new("code")
            .with_review_state(ReviewState::Performed)
            .with_trigger("plan_approved");
        assert_eq!(request.trigger.as_deref(), Some("plan_approved"));
    }
}

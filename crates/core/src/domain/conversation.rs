use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "kebab-case")]
pub enum ReviewState {
    #[default]
    NotRequired,
    Pending,
    Performed,
}

impl ReviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotRequired => "not-required",
            Self::Pending => "pending",
            Self::Performed => "performed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not-required" => Some(Self::NotRequired),
            "pending" => Some(Self::Pending),
            "performed" => Some(Self::Performed),
            _ => None,
        }
    }
}

/// Persisted progress of one development conversation.
///
/// `current_phase` always names a phase of the workflow in `workflow_name`;
/// the orchestrator only writes phases the resolver accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConversationState {
    pub conversation_id: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub project_path: PathBuf,
    pub git_branch: String,
    pub workflow_name: String,
    pub current_phase: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub plan_file_path: PathBuf,
    #[serde(default)]
    pub require_reviews_before_phase_transition: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(
        conversation_id: impl Into<String>,
        project_path: impl Into<PathBuf>,
        git_branch: impl Into<String>,
        workflow_name: impl Into<String>,
        initial_phase: impl Into<String>,
        plan_file_path: impl Into<PathBuf>,
    ) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: conversation_id.into(),
            project_path: project_path.into(),
            git_branch: git_branch.into(),
            workflow_name: workflow_name.into(),
            current_phase: initial_phase.into(),
            plan_file_path: plan_file_path.into(),
            require_reviews_before_phase_transition: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_required_reviews(mut self, required: bool) -> Self {
        self.require_reviews_before_phase_transition = required;
        self
    }

    pub fn enter_phase(&mut self, phase: impl Into<String>) {
        self.current_phase = phase.into();
        self.updated_at = Utc::now();
    }
}

/// Stable identifier for the conversation tied to a project checkout and branch.
pub fn conversation_id_for(project_path: &Path, git_branch: &str) -> String {
    let project = project_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project");
    slugify(&format!("{project}-{git_branch}"))
}

fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_dash = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

//! Development plan files
//!
//! One markdown plan per branch, kept next to the conversation state:
//! ```text
//! .devflow/
//! └── development-plan-<branch>.md
//! ```

use chrono::Utc;
use devflow_core::{capitalize_phase, WorkflowDefinition};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::config::STUDIO_DIR;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct PlanManager {
    project_path: PathBuf,
}

impl PlanManager {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
        }
    }

    pub fn plan_path(&self, git_branch: &str) -> PathBuf {
        let branch: String = git_branch
            .chars()
            .map(|c| if c == '/' || c == '\\' || c.is_whitespace() { '-' } else { c })
            .collect();
        self.project_path
            .join(STUDIO_DIR)
            .join(format!("development-plan-{branch}.md"))
    }

    pub async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    /// Initial plan text: one section per phase, in graph order.
    pub fn initial_content(&self, definition: &WorkflowDefinition, git_branch: &str) -> String {
        let project = self
            .project_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("project");
        let mut out = format!(
            "# Development Plan: {project} ({git_branch} branch)\n\n\
             *Generated on {date}*\n\
             *Workflow: {workflow}*\n\n\
             ## Goal\n\
             *Define what you're building or fixing. Update this as requirements are gathered.*\n",
            date = Utc::now().format("%Y-%m-%d"),
            workflow = definition.name,
        );

        for (index, phase) in definition.phases().into_iter().enumerate() {
            out.push_str(&format!(
                "\n## {}\n### Tasks\n- [ ] *Tasks will be added as this phase progresses*\n",
                capitalize_phase(phase)
            ));
            if index == 0 {
                out.push_str("\n### Completed\n- [x] Created development plan file\n");
            }
        }

        out.push_str("\n## Key Decisions\n*Important decisions will be documented here*\n");
        out.push_str("\n## Notes\n*Additional context and observations*\n");
        out
    }

    pub async fn write(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await?;
        info!(path = %path.display(), bytes = content.len(), "Wrote plan file");
        Ok(())
    }

    /// Remove the plan file. Returns whether anything was deleted.
    pub async fn delete(&self, path: &Path) -> Result<bool> {
        if !self.exists(path).await {
            debug!(path = %path.display(), "No plan file to delete");
            return Ok(false);
        }
        fs::remove_file(path).await?;
        info!(path = %path.display(), "Deleted plan file");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use workflow::parse_definition;

    const YAML: &str = r#"
name: demo
description: Plan fixture
initial_state: draft
states:
  draft:
    description: Draft
    default_instructions: Draft it
    transitions:
      - to: review
        transition_reason: drafted
  review:
    description: Review
    default_instructions: Review it
"#;

    #[test]
    fn test_plan_path_sanitizes_branch() {
        let manager = PlanManager::new("/work/app");
        assert_eq!(
            manager.plan_path("feature/login"),
            PathBuf::from("/work/app/.devflow/development-plan-feature-login.md")
        );
    }

    #[test]
    fn test_initial_content_lists_phases_in_order() {
        let def = parse_definition("test", YAML).unwrap();
        let content = PlanManager::new("/work/app").initial_content(&def, "main");

        assert!(content.starts_with("# Development Plan: app (main branch)"));
        assert!(content.contains("*Workflow: demo*"));
        let draft = content.find("## Draft").unwrap();
        let review = content.find("## Review").unwrap();
        let decisions = content.find("## Key Decisions").unwrap();
        assert!(draft < review && review < decisions);
    }

    #[tokio::test]
    async fn test_write_exists_delete() {
        let temp_dir = TempDir::new().unwrap();
        let manager = PlanManager::new(temp_dir.path());
        let path = manager.plan_path("main");

        assert!(!manager.exists(&path).await);
        manager.write(&path, "# Plan").await.unwrap();
        assert!(manager.exists(&path).await);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Plan");

        assert!(manager.delete(&path).await.unwrap());
        assert!(!manager.delete(&path).await.unwrap());
    }
}

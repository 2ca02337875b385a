use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{OrchestratorError, Result};

pub(crate) const STUDIO_DIR: &str = ".devflow";
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides [`ProjectConfig::task_backend`].
pub const TASK_BACKEND_ENV: &str = "DEVFLOW_TASK_BACKEND";

/// Requested task tracking backend, before availability is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskBackendSetting {
    Auto,
    #[default]
    Markdown,
    Beads,
}

impl TaskBackendSetting {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "markdown" => Some(Self::Markdown),
            "beads" => Some(Self::Beads),
            _ => None,
        }
    }
}

/// Task tracking backend in effect for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskBackend {
    /// Checklists inside the development plan file.
    Markdown,
    /// The `bd` issue tracker CLI.
    Beads,
}

/// Resolve the requested backend against what is installed.
pub fn resolve_task_backend(
    setting: TaskBackendSetting,
    beads_available: bool,
) -> Result<TaskBackend> {
    match (setting, beads_available) {
        (TaskBackendSetting::Markdown, _) => Ok(TaskBackend::Markdown),
        (TaskBackendSetting::Beads, true) | (TaskBackendSetting::Auto, true) => {
            Ok(TaskBackend::Beads)
        }
        (TaskBackendSetting::Auto, false) => Ok(TaskBackend::Markdown),
        (TaskBackendSetting::Beads, false) => Err(OrchestratorError::InvalidConfig(
            "task backend `beads` requested but the `bd` command is not available".to_string(),
        )),
    }
}

/// Project-level configuration stored in `.devflow/config.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub task_backend: TaskBackendSetting,
    /// Allow-list for workflow listings; `None` lists everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_workflows: Option<Vec<String>>,
    /// Default for `start_development` when the caller does not choose.
    #[serde(default)]
    pub require_reviews: bool,
}

impl ProjectConfig {
    /// Read config from the project directory, falling back to defaults.
    pub async fn read(project_path: &Path) -> Self {
        let config_path = project_path.join(STUDIO_DIR).join(CONFIG_FILE);

        if !fs::try_exists(&config_path).await.unwrap_or(false) {
            debug!(path = %config_path.display(), "Config file does not exist, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&config_path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    debug!(path = %config_path.display(), "Config loaded successfully");
                    config
                }
                Err(e) => {
                    warn!(
                        path = %config_path.display(),
                        error = %e,
                        "Failed to parse config, using defaults"
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!(
                    path = %config_path.display(),
                    error = %e,
                    "Failed to read config file, using defaults"
                );
                Self::default()
            }
        }
    }

    pub async fn write(&self, project_path: &Path) -> Result<()> {
        let config_dir = project_path.join(STUDIO_DIR);
        fs::create_dir_all(&config_dir).await?;

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| OrchestratorError::Serialization(e.to_string()))?;
        let config_path = config_dir.join(CONFIG_FILE);
        fs::write(&config_path, content).await?;
        debug!(path = %config_path.display(), "Config saved successfully");
        Ok(())
    }

    /// Apply an environment override value, if it names a known backend.
    pub fn with_backend_override(mut self, value: Option<&str>) -> Self {
        if let Some(raw) = value {
            match TaskBackendSetting::parse(raw) {
                Some(setting) => self.task_backend = setting,
                None => warn!(value = raw, "Ignoring unknown task backend override"),
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_task_backend() {
        use TaskBackendSetting::{Auto, Beads, Markdown};

        assert_eq!(resolve_task_backend(Markdown, true).unwrap(), TaskBackend::Markdown);
        assert_eq!(resolve_task_backend(Auto, true).unwrap(), TaskBackend::Beads);
        assert_eq!(resolve_task_backend(Auto, false).unwrap(), TaskBackend::Markdown);
        assert_eq!(resolve_task_backend(Beads, true).unwrap(), TaskBackend::Beads);
        assert!(matches!(
            resolve_task_backend(Beads, false),
            Err(OrchestratorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_backend_override() {
        let config = ProjectConfig::default().with_backend_override(Some("AUTO"));
        assert_eq!(config.task_backend, TaskBackendSetting::Auto);

        let config = config.with_backend_override(Some("jira"));
        assert_eq!(config.task_backend, TaskBackendSetting::Auto);

        let config = config.with_backend_override(None);
        assert_eq!(config.task_backend, TaskBackendSetting::Auto);
    }

    #[tokio::test]
    async fn test_config_read_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let config = ProjectConfig::read(temp_dir.path()).await;
        assert_eq!(config, ProjectConfig::default());
    }

    #[tokio::test]
    async fn test_config_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let config = ProjectConfig {
            task_backend: TaskBackendSetting::Beads,
            enabled_workflows: Some(vec!["epcc".to_string()]),
            require_reviews: true,
        };

        config.write(temp_dir.path()).await.unwrap();
        assert_eq!(ProjectConfig::read(temp_dir.path()).await, config);
    }

    #[tokio::test]
    async fn test_config_invalid_json_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(STUDIO_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(CONFIG_FILE), "{ not json").unwrap();

        assert_eq!(
            ProjectConfig::read(temp_dir.path()).await,
            ProjectConfig::default()
        );
    }
}

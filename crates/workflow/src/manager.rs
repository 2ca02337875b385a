//! Workflow Manager
//!
//! Resolves workflow names to validated definitions. Project-local definitions in
//! `.devflow/workflows/` are tried before the packaged ones:
//! ```text
//! <project>/
//! └── .devflow/
//!     └── workflows/
//!         └── <name>.yaml   # overrides or extends the packaged set
//! ```
//! Definitions are cached for the lifetime of the manager.

use devflow_core::WorkflowDefinition;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Result, WorkflowError};
use crate::loader::{load_from_file, parse_definition};

const STUDIO_DIR: &str = ".devflow";
const WORKFLOWS_DIR: &str = "workflows";

const PACKAGED: &[(&str, &str)] = &[
    ("epcc", include_str!("../workflows/epcc.yaml")),
    ("minor", include_str!("../workflows/minor.yaml")),
    ("waterfall", include_str!("../workflows/waterfall.yaml")),
];

/// Where a definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowSource {
    Packaged,
    Project,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary {
    pub name: String,
    pub description: String,
    pub phases: Vec<String>,
    pub source: WorkflowSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
}

impl WorkflowSummary {
    /// `key` is the name the workflow is loaded by, which may differ from `definition.name`.
    fn from_definition(
        key: &str,
        definition: &WorkflowDefinition,
        source: WorkflowSource,
    ) -> Self {
        Self {
            name: key.to_string(),
            description: definition.description.trim().to_string(),
            phases: definition.phases().into_iter().map(str::to_string).collect(),
            source,
            complexity: definition
                .metadata
                .as_ref()
                .and_then(|m| m.complexity.clone()),
        }
    }
}

/// Built-in `(name, yaml)` definitions.
pub type PackagedWorkflows = &'static [(&'static str, &'static str)];

pub struct WorkflowManager {
    project_path: PathBuf,
    packaged: PackagedWorkflows,
    enabled: Option<Vec<String>>,
    cache: RwLock<HashMap<String, Arc<WorkflowDefinition>>>,
}

impl WorkflowManager {
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            packaged: PACKAGED,
            enabled: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the built-in definitions.
    pub fn with_packaged(mut self, packaged: PackagedWorkflows) -> Self {
        self.packaged = packaged;
        self
    }

    /// Restrict `list_workflows` to the given names.
    pub fn with_enabled_workflows(mut self, enabled: Option<Vec<String>>) -> Self {
        self.enabled = enabled;
        self
    }

    fn workflows_dir(&self) -> PathBuf {
        self.project_path.join(STUDIO_DIR).join(WORKFLOWS_DIR)
    }

    async fn project_file(&self, name: &str) -> Option<PathBuf> {
        for ext in ["yaml", "yml"] {
            let path = self.workflows_dir().join(format!("{name}.{ext}"));
            if fs::try_exists(&path).await.unwrap_or(false) {
                return Some(path);
            }
        }
        None
    }

    pub fn packaged_names() -> impl Iterator<Item = &'static str> {
        PACKAGED.iter().map(|(name, _)| *name)
    }

    fn packaged_definition(&self, name: &str) -> Option<Result<WorkflowDefinition>> {
        self.packaged
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(n, yaml)| parse_definition(&format!("packaged:{n}"), yaml))
    }

    /// Load a workflow by name.
    ///
    /// A project-local file wins when it is valid. An invalid project-local file that
    /// shadows a packaged workflow falls back to the packaged one with a warning; with
    /// nothing to fall back to, the error is returned. Invalid packaged definitions are
    /// always an error.
    pub async fn load(&self, name: &str) -> Result<Arc<WorkflowDefinition>> {
        if let Some(cached) = self.cache.read().await.get(name) {
            return Ok(Arc::clone(cached));
        }

        let definition = match self.project_file(name).await {
            Some(path) => match load_from_file(&path).await {
                Ok(definition) => {
                    info!(workflow = name, path = %path.display(), "Loaded project workflow");
                    definition
                }
                Err(e) => match self.packaged_definition(name) {
                    Some(packaged) => {
                        warn!(
                            workflow = name,
                            path = %path.display(),
                            error = %e,
                            "Invalid project workflow, falling back to packaged definition"
                        );
                        packaged?
                    }
                    None => return Err(e),
                },
            },
            None => self.packaged_definition(name)
                .ok_or_else(|| WorkflowError::UnknownWorkflow(name.to_string()))??,
        };

        debug!(
            workflow = name,
            phases = definition.states.len(),
            "Workflow definition cached"
        );
        let definition = Arc::new(definition);
        self.cache
            .write()
            .await
            .insert(name.to_string(), Arc::clone(&definition));
        Ok(definition)
    }

    /// Packaged and project-local workflows, project files shadowing packaged names.
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        let mut summaries = BTreeMap::new();

        for (name, _) in self.packaged {
            match self.packaged_definition(name) {
                Some(Ok(def)) => {
                    summaries.insert(
                        name.to_string(),
                        WorkflowSummary::from_definition(name, &def, WorkflowSource::Packaged),
                    );
                }
                Some(Err(e)) => {
                    warn!(workflow = *name, error = %e, "Skipping invalid packaged workflow");
                }
                None => {}
            }
        }

        let dir = self.workflows_dir();
        if fs::try_exists(&dir).await.unwrap_or(false) {
            let mut entries = fs::read_dir(&dir).await.map_err(|source| WorkflowError::Io {
                path: dir.display().to_string(),
                source,
            })?;
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(
                            path = %dir.display(),
                            error = %e,
                            "Failed to read project workflows directory entry"
                        );
                        break;
                    }
                };
                let path = entry.path();
                let is_yaml = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e == "yaml" || e == "yml");
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if !is_yaml {
                    continue;
                }
                match load_from_file(&path).await {
                    Ok(def) => {
                        summaries.insert(
                            stem.to_string(),
                            WorkflowSummary::from_definition(
                                stem,
                                &def,
                                WorkflowSource::Project,
                            ),
                        );
                    }
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "Skipping invalid project workflow"
                        );
                    }
                }
            }
        }

        Ok(summaries
            .into_iter()
            .filter(|(name, _)| match &self.enabled {
                Some(enabled) => enabled.iter().any(|e| e == name),
                None => true,
            })
            .map(|(_, summary)| summary)
            .collect())
    }
}

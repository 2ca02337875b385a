//! Conversation state persistence
//!
//! The orchestrator only needs get/save/delete by conversation id. Two backends:
//! JSON files under `.devflow/conversations/` and an in-memory map.
//!
//! ```text
//! .devflow/
//! └── conversations/
//!     └── <conversation_id>.json
//! ```

use async_trait::async_trait;
use devflow_core::ConversationState;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::STUDIO_DIR;
use crate::error::{OrchestratorError, Result};

const CONVERSATIONS_DIR: &str = "conversations";

/// Persistence for conversation state.
///
/// Writers are assumed to be serialized per conversation by the caller.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_state(&self, conversation_id: &str) -> Result<Option<ConversationState>>;

    async fn save_state(&self, state: &ConversationState) -> Result<()>;

    /// Returns whether a state existed.
    async fn delete_state(&self, conversation_id: &str) -> Result<bool>;
}

/// Store for conversation state using JSON files
#[derive(Debug, Clone)]
pub struct FileStateStore {
    project_path: PathBuf,
}

impl FileStateStore {
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    fn conversations_dir(&self) -> PathBuf {
        self.project_path.join(STUDIO_DIR).join(CONVERSATIONS_DIR)
    }

    fn state_path(&self, conversation_id: &str) -> PathBuf {
        self.conversations_dir()
            .join(format!("{conversation_id}.json"))
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_state(&self, conversation_id: &str) -> Result<Option<ConversationState>> {
        let path = self.state_path(conversation_id);

        if !fs::try_exists(&path).await.unwrap_or(false) {
            debug!(conversation_id, "No conversation state at {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let state = serde_json::from_str(&content).map_err(|e| {
            error!(conversation_id, "Failed to parse conversation state: {}", e);
            OrchestratorError::Serialization(format!(
                "Failed to parse conversation state {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Some(state))
    }

    async fn save_state(&self, state: &ConversationState) -> Result<()> {
        fs::create_dir_all(self.conversations_dir()).await?;

        let path = self.state_path(&state.conversation_id);
        let content = serde_json::to_string_pretty(state).map_err(|e| {
            OrchestratorError::Serialization(format!("Failed to serialize conversation state: {e}"))
        })?;

        // Readers never observe a partially written state file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;

        debug!(
            conversation_id = %state.conversation_id,
            phase = %state.current_phase,
            "Saved conversation state to {}",
            path.display()
        );
        Ok(())
    }

    async fn delete_state(&self, conversation_id: &str) -> Result<bool> {
        let path = self.state_path(conversation_id);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(false);
        }
        fs::remove_file(&path).await?;
        info!(conversation_id, "Deleted conversation state");
        Ok(true)
    }
}

/// In-process store, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: RwLock<HashMap<String, ConversationState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_state(&self, conversation_id: &str) -> Result<Option<ConversationState>> {
        Ok(self.states.read().await.get(conversation_id).cloned())
    }

    async fn save_state(&self, state: &ConversationState) -> Result<()> {
        self.states
            .write()
            .await
            .insert(state.conversation_id.clone(), state.clone());
        Ok(())
    }

    async fn delete_state(&self, conversation_id: &str) -> Result<bool> {
        Ok(self.states.write().await.remove(conversation_id).is_some())
    }
}

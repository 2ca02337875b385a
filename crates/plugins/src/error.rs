use thiserror::Error;

use crate::hook::{HookName, HookPolicy};

/// Failure reported by a plugin handler. The message reaches callers verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct PluginError {
    message: String,
}

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    /// A gating hook refused the operation.
    #[error("{source}")]
    Rejected {
        plugin: String,
        hook: HookName,
        #[source]
        source: PluginError,
    },

    #[error("hook `{hook}` is a {actual} hook, not a {expected} hook")]
    PolicyMismatch {
        hook: HookName,
        expected: &'static str,
        actual: HookPolicy,
    },
}

pub type Result<T> = std::result::Result<T, HookError>;

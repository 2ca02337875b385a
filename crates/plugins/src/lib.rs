//! Plugin hooks around conversation operations.
//!
//! - [`HookName`] - the fixed set of hook points, each with a declared [`HookPolicy`]
//! - [`PluginHookContext`] - read-only snapshot handed to every handler
//! - [`Plugin`] - trait implemented by side-effect plugins
//! - [`PluginRegistry`] - ordered dispatch with per-policy failure handling

mod context;
mod error;
mod hook;
mod plugin;
mod publisher;
mod registry;

pub use context::PluginHookContext;
pub use error::{HookError, PluginError};
pub use hook::{HookName, HookPolicy};
pub use plugin::Plugin;
pub use publisher::EventPublisherPlugin;
pub use registry::PluginRegistry;

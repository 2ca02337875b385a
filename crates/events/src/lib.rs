//! Lifecycle events for devflow conversations
//!
//! This crate provides the event bus and event types that let observers
//! follow conversations as they start and move between phases.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;

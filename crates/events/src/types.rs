//! Event types for conversation lifecycle notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "type")]
pub enum Event {
    /// A development conversation was (re)started
    #[serde(rename = "conversation.started")]
    ConversationStarted {
        conversation_id: String,
        workflow: String,
        phase: String,
    },

    /// A conversation moved to another phase
    #[serde(rename = "conversation.phase_transitioned")]
    PhaseTransitioned {
        conversation_id: String,
        workflow: String,
        from_phase: String,
        to_phase: String,
    },
}

impl Event {
    pub fn conversation_id(&self) -> &str {
        match self {
            Event::ConversationStarted {
                conversation_id, ..
            } => conversation_id,
            Event::PhaseTransitioned {
                conversation_id, ..
            } => conversation_id,
        }
    }
}

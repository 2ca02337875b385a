mod conversation;
mod workflow;

pub use conversation::{conversation_id_for, ConversationState, ReviewState};
pub use workflow::{
    capitalize_phase, ReviewPerspective, StateDef, TransitionDef, WorkflowDefinition,
    WorkflowMetadata,
};

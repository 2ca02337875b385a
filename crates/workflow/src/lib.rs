pub mod error;
pub mod loader;
pub mod manager;
pub mod resolver;

pub use error::{Result, WorkflowError};
pub use loader::{load_from_file, parse_definition, validate_definition};
pub use manager::{WorkflowManager, WorkflowSource, WorkflowSummary};
pub use resolver::{ExplicitTransition, TransitionResolver};

//! Parsing and validation of workflow definitions.
//!
//! A definition is accepted only when every check passes; there is no
//! partially-valid definition and nothing is patched up silently.

use devflow_core::WorkflowDefinition;
use std::path::Path;
use tokio::fs;

use crate::error::{Result, WorkflowError};

/// Read and validate a definition from a YAML file.
pub async fn load_from_file(path: &Path) -> Result<WorkflowDefinition> {
    let yaml = fs::read_to_string(path)
        .await
        .map_err(|source| WorkflowError::Io {
            path: path.display().to_string(),
            source,
        })?;
    parse_definition(&path.display().to_string(), &yaml)
}

/// Parse YAML into a definition and validate it.
///
/// `source_name` only labels errors (a file path or `packaged:<name>`).
pub fn parse_definition(source_name: &str, yaml: &str) -> Result<WorkflowDefinition> {
    let definition: WorkflowDefinition =
        serde_yaml::from_str(yaml).map_err(|source| WorkflowError::Parse {
            source_name: source_name.to_string(),
            source,
        })?;
    validate_definition(&definition)?;
    Ok(definition)
}

/// Check graph consistency. All problems are reported together.
pub fn validate_definition(definition: &WorkflowDefinition) -> Result<()> {
    let label = if definition.name.trim().is_empty() {
        "<unnamed>"
    } else {
        definition.name.as_str()
    };
    let mut problems = Vec::new();

    if definition.name.trim().is_empty() {
        problems.push("name must not be empty".to_string());
    }
    if definition.states.is_empty() {
        problems.push("at least one state is required".to_string());
    }
    if !definition.has_phase(&definition.initial_state) {
        problems.push(format!(
            "initial_state `{}` is not a declared state",
            definition.initial_state
        ));
    }

    for (phase, state) in &definition.states {
        if state.default_instructions.trim().is_empty() {
            problems.push(format!("state `{phase}` has empty default_instructions"));
        }
        for (index, transition) in state.transitions.iter().enumerate() {
            if !definition.has_phase(&transition.to) {
                problems.push(format!(
                    "transition {index} of `{phase}` targets undeclared state `{}`",
                    transition.to
                ));
            }
            if transition.transition_reason.trim().is_empty() {
                problems.push(format!(
                    "transition {index} of `{phase}` to `{}` has no transition_reason",
                    transition.to
                ));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::invalid(label, problems.join("; ")))
    }
}

//! Instruction composition.
//!
//! Resolver output goes through two fixed steps: placeholder substitution, then
//! structural enhancement. Section order never depends on the guidance strategy:
//!
//! 1. phase header and substituted instructions
//! 2. task-management guidance (from the injected strategy)
//! 3. project context
//! 4. phase transition context (modeled transitions with a reason only)
//! 5. plan-file creation note (only while the plan file does not exist)
//! 6. closing reminders (always)

use devflow_core::capitalize_phase;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::error::{OrchestratorError, Result};
use crate::guidance::{ComposeMode, GuidanceContext, TaskGuidance};

pub const ARCHITECTURE_DOC: &str = "$ARCHITECTURE_DOC";
pub const REQUIREMENTS_DOC: &str = "$REQUIREMENTS_DOC";
pub const DESIGN_DOC: &str = "$DESIGN_DOC";
pub const BRANCH_NAME: &str = "$BRANCH_NAME";

const DOCS_DIR: &str = "docs";

/// Placeholder tokens and their literal replacements.
#[derive(Debug, Clone)]
pub struct VariableSubstitutions {
    /// Alternation of every escaped token; `None` when there are no tokens.
    pattern: Option<Regex>,
    values: HashMap<String, String>,
}

impl VariableSubstitutions {
    /// Tokens are matched literally; values are inserted as-is and never rescanned.
    pub fn new<I, T, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, V)>,
        T: AsRef<str>,
        V: Into<String>,
    {
        let values: HashMap<String, String> = pairs
            .into_iter()
            .map(|(token, value)| (token.as_ref().to_string(), value.into()))
            .collect();

        // Longest first, so a token that prefixes another never shadows it.
        let mut tokens: Vec<&str> = values.keys().map(String::as_str).collect();
        tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let pattern = if tokens.is_empty() {
            None
        } else {
            let alternation = tokens
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            let regex = Regex::new(&alternation).map_err(|e| {
                OrchestratorError::InvalidConfig(format!("invalid placeholder set: {e}"))
            })?;
            Some(regex)
        };
        Ok(Self { pattern, values })
    }

    /// Project document paths under `.devflow/docs/` plus the branch name.
    pub fn for_project(project_path: &Path, git_branch: &str) -> Result<Self> {
        let docs = project_docs_dir(project_path);
        let path = |file: &str| docs.join(file).display().to_string();
        Self::new([
            (ARCHITECTURE_DOC, path("architecture.md")),
            (REQUIREMENTS_DOC, path("requirements.md")),
            (DESIGN_DOC, path("design.md")),
            (BRANCH_NAME, git_branch.to_string()),
        ])
    }

    /// Replace every occurrence of every token in a single pass.
    pub fn apply(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };
        pattern
            .replace_all(text, |caps: &Captures<'_>| {
                let token = &caps[0];
                self.values
                    .get(token)
                    .cloned()
                    .unwrap_or_else(|| token.to_string())
            })
            .into_owned()
    }
}

pub fn project_docs_dir(project_path: &Path) -> PathBuf {
    project_path.join(crate::config::STUDIO_DIR).join(DOCS_DIR)
}

/// Everything the composer needs for one response.
#[derive(Debug, Clone, Copy)]
pub struct CompositionInput<'a> {
    pub instructions: &'a str,
    pub phase: &'a str,
    pub workflow: &'a str,
    pub project_path: &'a Path,
    pub git_branch: &'a str,
    pub plan_file_path: &'a Path,
    pub plan_file_exists: bool,
    pub mode: ComposeMode,
    pub transition_reason: Option<&'a str>,
    pub is_modeled: bool,
}

pub struct InstructionComposer {
    guidance: Arc<dyn TaskGuidance>,
}

impl InstructionComposer {
    pub fn new(guidance: Arc<dyn TaskGuidance>) -> Self {
        Self { guidance }
    }

    pub fn guidance(&self) -> &dyn TaskGuidance {
        self.guidance.as_ref()
    }

    pub fn compose(
        &self,
        input: &CompositionInput<'_>,
        variables: &VariableSubstitutions,
    ) -> String {
        let body = variables.apply(input.instructions);
        let phase_title = capitalize_phase(input.phase);

        let mut sections = vec![format!(
            "You are in the {phase_title} phase.\n{}",
            body.trim_end()
        )];

        sections.push(self.guidance.guidance(
            &GuidanceContext {
                phase: input.phase,
                plan_file_path: input.plan_file_path,
            },
            input.mode,
        ));

        sections.push(format!(
            "**Project Context:**\n- Project: {}\n- Branch: {}\n- Workflow: {}\n\
             - Current Phase: {}",
            input.project_path.display(),
            input.git_branch,
            input.workflow,
            input.phase
        ));

        if input.is_modeled {
            if let Some(reason) = input.transition_reason.filter(|r| !r.trim().is_empty()) {
                sections.push(format!(
                    "**Phase Transition:**\n- Entered {phase_title} phase\n- Reason: {reason}"
                ));
            }
        }

        if !input.plan_file_exists {
            sections.push(format!(
                "**Note:** The plan file `{}` will be created when you first update it.",
                input.plan_file_path.display()
            ));
        }

        sections.push(format!(
            "**IMPORTANT REMINDERS:**\n\
             - Use ONLY {} for task tracking; do not use any other task management tool\n\
             - Call whats_next() after the next user message to maintain the development workflow",
            self.guidance.tracker_name()
        ));

        debug!(
            phase = input.phase,
            mode = ?input.mode,
            sections = sections.len(),
            "Composed instructions"
        );
        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guidance::{BeadsGuidance, MarkdownGuidance};

    fn input<'a>(instructions: &'a str, plan: &'a Path) -> CompositionInput<'a> {
        CompositionInput {
            instructions,
            phase: "design",
            workflow: "waterfall",
            project_path: Path::new("/work/app"),
            git_branch: "main",
            plan_file_path: plan,
            plan_file_exists: true,
            mode: ComposeMode::Continue,
            transition_reason: None,
            is_modeled: false,
        }
    }

    fn vars() -> VariableSubstitutions {
        VariableSubstitutions::for_project(Path::new("/work/app"), "feature/x").unwrap()
    }

    #[test]
    fn test_substitution_replaces_every_occurrence() {
        let text = "See $DESIGN_DOC, then $DESIGN_DOC again, and once more $DESIGN_DOC.";
        let out = vars().apply(text);

        assert!(!out.contains("$DESIGN_DOC"));
        assert_eq!(out.matches("/work/app/.devflow/docs/design.md").count(), 3);
    }

    #[test]
    fn test_substitution_is_literal() {
        let vars = VariableSubstitutions::new([("$A.B", "$1 and ${0}")]).unwrap();
        assert_eq!(vars.apply("x $A.B y $AxB"), "x $1 and ${0} y $AxB");
    }

    #[test]
    fn test_inserted_values_are_not_rescanned() {
        let vars = VariableSubstitutions::new([
            ("$DESIGN_DOC", "/p/$BRANCH_NAME/design.md"),
            ("$BRANCH_NAME", "main"),
        ])
        .unwrap();
        assert_eq!(
            vars.apply("See $DESIGN_DOC on $BRANCH_NAME"),
            "See /p/$BRANCH_NAME/design.md on main"
        );

        let project = VariableSubstitutions::for_project(Path::new("/work/$BRANCH_NAME"), "dev")
            .unwrap();
        assert_eq!(
            project.apply("$DESIGN_DOC"),
            "/work/$BRANCH_NAME/.devflow/docs/design.md"
        );
    }

    #[test]
    fn test_longer_token_wins_over_prefix() {
        let vars = VariableSubstitutions::new([("$DOC", "short"), ("$DOC_DIR", "long")]).unwrap();
        assert_eq!(vars.apply("$DOC_DIR and $DOC"), "long and short");
        assert_eq!(
            VariableSubstitutions::new(Vec::<(&str, &str)>::new()).unwrap().apply("$DOC"),
            "$DOC"
        );
    }

    #[test]
    fn test_substitution_leaves_unknown_tokens() {
        let out = vars().apply("Branch $BRANCH_NAME, $UNKNOWN_DOC");
        assert_eq!(out, "Branch feature/x, $UNKNOWN_DOC");
    }

    #[test]
    fn test_section_order() {
        let plan = Path::new("/work/app/.devflow/development-plan-main.md");
        let composer = InstructionComposer::new(Arc::new(MarkdownGuidance));
        let mut inp = input("Design it in $DESIGN_DOC", plan);
        inp.is_modeled = true;
        inp.transition_reason = Some("requirements done");
        inp.plan_file_exists = false;

        let out = composer.compose(&inp, &vars());
        let positions: Vec<usize> = [
            "You are in the Design phase.",
            "**Plan File Guidance:**",
            "**Project Context:**",
            "**Phase Transition:**",
            "**Note:**",
            "**IMPORTANT REMINDERS:**",
        ]
        .iter()
        .map(|marker| out.find(marker).unwrap_or_else(|| panic!("missing {marker}")))
        .collect();

        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(out.contains("/work/app/.devflow/docs/design.md"));
        assert!(out.contains("Reason: requirements done"));
    }

    #[test]
    fn test_conditional_sections_omitted() {
        let plan = Path::new("plan.md");
        let composer = InstructionComposer::new(Arc::new(MarkdownGuidance));

        let mut inp = input("Work", plan);
        inp.transition_reason = Some("Direct transition from a to b");
        let out = composer.compose(&inp, &vars());
        assert!(!out.contains("**Phase Transition:**"));
        assert!(!out.contains("**Note:**"));

        inp.is_modeled = true;
        inp.transition_reason = Some("  ");
        assert!(!composer.compose(&inp, &vars()).contains("**Phase Transition:**"));
    }

    #[test]
    fn test_reminders_are_unconditional() {
        let plan = Path::new("plan.md");
        for composer in [
            InstructionComposer::new(Arc::new(MarkdownGuidance)),
            InstructionComposer::new(Arc::new(BeadsGuidance)),
        ] {
            for mode in [ComposeMode::Continue, ComposeMode::Transition] {
                let mut inp = input("Work", plan);
                inp.mode = mode;
                let out = composer.compose(&inp, &vars());
                assert!(out.contains("Call whats_next() after the next user message"));
                assert!(out.contains(&format!(
                    "Use ONLY {} for task tracking",
                    composer.guidance().tracker_name()
                )));
            }
        }
    }

    #[test]
    fn test_strategy_changes_only_guidance_block() {
        let plan = Path::new("plan.md");
        let inp = input("Work", plan);
        let markdown = InstructionComposer::new(Arc::new(MarkdownGuidance)).compose(&inp, &vars());
        let beads = InstructionComposer::new(Arc::new(BeadsGuidance)).compose(&inp, &vars());

        assert!(markdown.contains("**Plan File Guidance:**"));
        assert!(beads.contains("**Task Management (bd CLI):**"));
        assert!(markdown.starts_with("You are in the Design phase.\nWork"));
        assert!(beads.starts_with("You are in the Design phase.\nWork"));
    }
}

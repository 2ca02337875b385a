//! Task-management guidance strategies.
//!
//! The strategy is picked once from the resolved [`TaskBackend`] and injected into the
//! composer. It only supplies text; where that text lands is fixed by the composer.

use devflow_core::capitalize_phase;
use std::path::Path;
use std::sync::Arc;

use crate::config::TaskBackend;

/// Which operation asked for instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeMode {
    /// Implicit continuation (`whats_next`, `start_development`): full guidance.
    Continue,
    /// Explicit jump (`proceed_to_phase`): minimal guidance.
    Transition,
}

#[derive(Debug, Clone, Copy)]
pub struct GuidanceContext<'a> {
    pub phase: &'a str,
    pub plan_file_path: &'a Path,
}

pub trait TaskGuidance: Send + Sync {
    fn backend(&self) -> TaskBackend;

    /// The only task-tracking facility the agent may use, as named in reminders.
    fn tracker_name(&self) -> &str;

    fn guidance(&self, ctx: &GuidanceContext<'_>, mode: ComposeMode) -> String;
}

pub fn guidance_for(backend: TaskBackend) -> Arc<dyn TaskGuidance> {
    match backend {
        TaskBackend::Markdown => Arc::new(MarkdownGuidance),
        TaskBackend::Beads => Arc::new(BeadsGuidance),
    }
}

/// Tasks live as checklists in the development plan file.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownGuidance;

impl TaskGuidance for MarkdownGuidance {
    fn backend(&self) -> TaskBackend {
        TaskBackend::Markdown
    }

    fn tracker_name(&self) -> &str {
        "the development plan file"
    }

    fn guidance(&self, ctx: &GuidanceContext<'_>, mode: ComposeMode) -> String {
        let plan = ctx.plan_file_path.display();
        let section = capitalize_phase(ctx.phase);
        match mode {
            ComposeMode::Continue => format!(
                "**Plan File Guidance:**\n\
                 Use the plan file at `{plan}` as your memory for this project.\n\
                 - Mark completed tasks with [x] as you finish them\n\
                 - Add new tasks to the \"{section}\" section as they are identified\n\
                 - Record important decisions in the \"Key Decisions\" section\n\
                 - Keep the \"{section}\" section focused on work for this phase"
            ),
            ComposeMode::Transition => format!(
                "**Plan File Guidance:**\n\
                 Review the \"{section}\" section of `{plan}` and add the tasks for this phase."
            ),
        }
    }
}

/// Tasks live in the beads (`bd`) issue tracker.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeadsGuidance;

impl TaskGuidance for BeadsGuidance {
    fn backend(&self) -> TaskBackend {
        TaskBackend::Beads
    }

    fn tracker_name(&self) -> &str {
        "the bd CLI"
    }

    fn guidance(&self, ctx: &GuidanceContext<'_>, mode: ComposeMode) -> String {
        let plan = ctx.plan_file_path.display();
        let section = capitalize_phase(ctx.phase);
        match mode {
            ComposeMode::Continue => format!(
                "**Task Management (bd CLI):**\n\
                 Track all work for the {section} phase in beads.\n\
                 - `bd list --parent <phase-task-id> --status open` shows outstanding tasks\n\
                 - `bd create \"<title>\" --parent <phase-task-id>` records a new task\n\
                 - `bd close <task-id>` marks a task done\n\
                 Use `{plan}` for goals and key decisions only, not for task lists."
            ),
            ComposeMode::Transition => format!(
                "**Task Management (bd CLI):**\n\
                 Create the {section} phase tasks with `bd create` before starting work."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(plan: &Path) -> GuidanceContext<'_> {
        GuidanceContext {
            phase: "design",
            plan_file_path: plan,
        }
    }

    #[test]
    fn test_markdown_guidance_modes() {
        let plan = Path::new("/p/.devflow/development-plan-main.md");
        let full = MarkdownGuidance.guidance(&ctx(plan), ComposeMode::Continue);
        let minimal = MarkdownGuidance.guidance(&ctx(plan), ComposeMode::Transition);

        assert!(full.contains("Mark completed tasks with [x]"));
        assert!(full.contains("\"Design\" section"));
        assert!(minimal.contains("development-plan-main.md"));
        assert!(minimal.len() < full.len());
    }

    #[test]
    fn test_beads_guidance_modes() {
        let plan = Path::new("plan.md");
        let full = BeadsGuidance.guidance(&ctx(plan), ComposeMode::Continue);
        let minimal = BeadsGuidance.guidance(&ctx(plan), ComposeMode::Transition);

        assert!(full.contains("bd close"));
        assert!(minimal.contains("bd create"));
        assert!(!minimal.contains("bd close"));
    }

    #[test]
    fn test_guidance_for_backend() {
        assert_eq!(
            guidance_for(TaskBackend::Markdown).backend(),
            TaskBackend::Markdown
        );
        assert_eq!(guidance_for(TaskBackend::Beads).tracker_name(), "the bd CLI");
    }
}

use std::fmt;

/// How dispatch treats a failing handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPolicy {
    /// The first error aborts dispatch and is returned to the caller.
    Gating,
    /// Errors are logged and the next plugin still runs.
    SideEffect,
    /// Each plugin rewrites the previous output; a failing plugin is skipped.
    ContentTransform,
}

impl HookPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gating => "gating",
            Self::SideEffect => "side-effect",
            Self::ContentTransform => "content-transform",
        }
    }
}

impl fmt::Display for HookPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    BeforePhaseTransition,
    AfterStartDevelopment,
    AfterPhaseTransition,
    AfterPlanFileCreated,
}

impl HookName {
    pub const ALL: [HookName; 4] = [
        HookName::BeforePhaseTransition,
        HookName::AfterStartDevelopment,
        HookName::AfterPhaseTransition,
        HookName::AfterPlanFileCreated,
    ];

    pub fn policy(&self) -> HookPolicy {
        match self {
            Self::BeforePhaseTransition => HookPolicy::Gating,
            Self::AfterStartDevelopment | Self::AfterPhaseTransition => HookPolicy::SideEffect,
            Self::AfterPlanFileCreated => HookPolicy::ContentTransform,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforePhaseTransition => "beforePhaseTransition",
            Self::AfterStartDevelopment => "afterStartDevelopment",
            Self::AfterPhaseTransition => "afterPhaseTransition",
            Self::AfterPlanFileCreated => "afterPlanFileCreated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.as_str() == s)
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use std::sync::Arc;
use tracing::{debug, warn};

use crate::context::PluginHookContext;
use crate::error::{HookError, Result};
use crate::hook::{HookName, HookPolicy};
use crate::plugin::Plugin;

/// Ordered plugin set with policy-aware hook dispatch.
///
/// Handlers run one at a time in ascending sequence order; there is no fan-out.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin. Duplicate names are not rejected; see [`Self::list_names`].
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        debug!(
            plugin = plugin.name(),
            sequence = plugin.sequence(),
            "Registered plugin"
        );
        self.plugins.push(plugin);
    }

    /// Names in registration order, duplicates included.
    pub fn list_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Currently enabled plugins, ascending by sequence. Ties keep registration order.
    pub fn enabled_plugins(&self) -> Vec<Arc<dyn Plugin>> {
        let mut enabled: Vec<_> = self
            .plugins
            .iter()
            .filter(|p| p.is_enabled())
            .cloned()
            .collect();
        enabled.sort_by_key(|p| p.sequence());
        enabled
    }

    /// Dispatch a gating or side-effect hook.
    ///
    /// Gating: the first failing plugin stops dispatch and its error is returned.
    /// Side-effect: failures are logged and every enabled plugin still runs; this
    /// never returns a plugin error.
    pub async fn execute_hook(&self, hook: HookName, ctx: &PluginHookContext) -> Result<()> {
        let policy = hook.policy();
        if policy == HookPolicy::ContentTransform {
            return Err(HookError::PolicyMismatch {
                hook,
                expected: "gating or side-effect",
                actual: policy,
            });
        }

        for plugin in self.enabled_plugins() {
            if !plugin.implements(hook) {
                continue;
            }
            debug!(
                plugin = plugin.name(),
                hook = %hook,
                conversation_id = %ctx.conversation_id,
                "Invoking plugin hook"
            );
            if let Err(source) = plugin.on_hook(hook, ctx).await {
                match policy {
                    HookPolicy::Gating => {
                        debug!(
                            plugin = plugin.name(),
                            hook = %hook,
                            error = %source,
                            "Gating hook rejected"
                        );
                        return Err(HookError::Rejected {
                            plugin: plugin.name().to_string(),
                            hook,
                            source,
                        });
                    }
                    _ => {
                        warn!(
                            plugin = plugin.name(),
                            hook = %hook,
                            conversation_id = %ctx.conversation_id,
                            phase = %ctx.current_phase,
                            error = %source,
                            "Plugin hook failed, continuing"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Run a content-transform hook as a left-to-right pipeline.
    ///
    /// A plugin that fails is skipped: its input passes through to the next plugin.
    pub async fn execute_transform(
        &self,
        hook: HookName,
        ctx: &PluginHookContext,
        content: String,
    ) -> Result<String> {
        let policy = hook.policy();
        if policy != HookPolicy::ContentTransform {
            return Err(HookError::PolicyMismatch {
                hook,
                expected: "content-transform",
                actual: policy,
            });
        }

        let mut current = content;
        for plugin in self.enabled_plugins() {
            if !plugin.implements(hook) {
                continue;
            }
            match plugin.transform(hook, ctx, current.clone()).await {
                Ok(next) => current = next,
                Err(e) => {
                    warn!(
                        plugin = plugin.name(),
                        hook = %hook,
                        conversation_id = %ctx.conversation_id,
                        error = %e,
                        "Content transform failed, passing input through"
                    );
                }
            }
        }
        Ok(current)
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.list_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PluginError;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    type CallLog = Arc<Mutex<Vec<String>>>;

    struct TestPlugin {
        name: &'static str,
        sequence: i32,
        hooks: Vec<HookName>,
        fail_with: Option<&'static str>,
        enabled: Arc<AtomicBool>,
        log: CallLog,
    }

    impl TestPlugin {
        fn new(name: &'static str, sequence: i32, log: &CallLog) -> Self {
            Self {
                name,
                sequence,
                hooks: HookName::ALL.to_vec(),
                fail_with: None,
                enabled: Arc::new(AtomicBool::new(true)),
                log: Arc::clone(log),
            }
        }

        fn failing(mut self, message: &'static str) -> Self {
            self.fail_with = Some(message);
            self
        }

        fn only(mut self, hooks: &[HookName]) -> Self {
            self.hooks = hooks.to_vec();
            self
        }

        fn toggle(mut self, flag: &Arc<AtomicBool>) -> Self {
            self.enabled = Arc::clone(flag);
            self
        }
    }

    #[async_trait]
    impl Plugin for TestPlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn sequence(&self) -> i32 {
            self.sequence
        }

        fn is_enabled(&self) -> bool {
            self.enabled.load(Ordering::SeqCst)
        }

        fn hooks(&self) -> &[HookName] {
            &self.hooks
        }

        async fn on_hook(
            &self,
            hook: HookName,
            _ctx: &PluginHookContext,
        ) -> std::result::Result<(), PluginError> {
            self.log.lock().unwrap().push(format!("{}:{}", self.name, hook));
            match self.fail_with {
                Some(message) => Err(PluginError::new(message)),
                None => Ok(()),
            }
        }

        async fn transform(
            &self,
            _hook: HookName,
            _ctx: &PluginHookContext,
            content: String,
        ) -> std::result::Result<String, PluginError> {
            self.log.lock().unwrap().push(self.name.to_string());
            match self.fail_with {
                Some(message) => Err(PluginError::new(message)),
                None => Ok(format!("{content}+{}", self.name)),
            }
        }
    }

    fn ctx() -> PluginHookContext {
        PluginHookContext {
            conversation_id: "demo-main".to_string(),
            plan_file_path: PathBuf::from("/tmp/demo/.devflow/development-plan-main.md"),
            current_phase: "explore".to_string(),
            workflow: "epcc".to_string(),
            project_path: PathBuf::from("/tmp/demo"),
            git_branch: "main".to_string(),
            target_phase: Some("plan".to_string()),
        }
    }

    fn calls(log: &CallLog) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_sequence_order_regardless_of_registration() {
        let log = CallLog::default();
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(TestPlugin::new("late", 30, &log)));
        registry.register(Arc::new(TestPlugin::new("early", 10, &log)));
        registry.register(Arc::new(TestPlugin::new("middle", 20, &log)));

        registry
            .execute_hook(HookName::AfterStartDevelopment, &ctx())
            .await
            .unwrap();

        assert_eq!(
            calls(&log),
            vec![
                "early:afterStartDevelopment",
                "middle:afterStartDevelopment",
                "late:afterStartDevelopment"
            ]
        );
    }

    #[tokio::test]
    async fn test_equal_sequences_keep_registration_order() {
        let log = CallLog::default();
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(TestPlugin::new("first", 5, &log)));
        registry.register(Arc::new(TestPlugin::new("second", 5, &log)));

        let names: Vec<_> = registry
            .enabled_plugins()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_side_effect_failure_does_not_stop_dispatch() {
        let log = CallLog::default();
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(TestPlugin::new("p2", 2, &log)));
        registry.register(Arc::new(TestPlugin::new("p1", 1, &log).failing("tracker down")));

        let result = registry
            .execute_hook(HookName::AfterPhaseTransition, &ctx())
            .await;

        assert!(result.is_ok());
        assert_eq!(
            calls(&log),
            vec!["p1:afterPhaseTransition", "p2:afterPhaseTransition"]
        );
    }

    #[tokio::test]
    async fn test_gating_failure_aborts_and_propagates() {
        let log = CallLog::default();
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(TestPlugin::new("v1", 1, &log).failing("quota exceeded")));
        registry.register(Arc::new(TestPlugin::new("v2", 2, &log)));

        let err = registry
            .execute_hook(HookName::BeforePhaseTransition, &ctx())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "quota exceeded");
        assert!(matches!(err, HookError::Rejected { ref plugin, .. } if plugin == "v1"));
        assert_eq!(calls(&log), vec!["v1:beforePhaseTransition"]);
    }

    #[tokio::test]
    async fn test_plugins_without_hook_are_skipped() {
        let log = CallLog::default();
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(
            TestPlugin::new("starter", 1, &log).only(&[HookName::AfterStartDevelopment]),
        ));
        registry.register(Arc::new(
            TestPlugin::new("gate", 2, &log).only(&[HookName::BeforePhaseTransition]),
        ));

        registry
            .execute_hook(HookName::BeforePhaseTransition, &ctx())
            .await
            .unwrap();
        assert_eq!(calls(&log), vec!["gate:beforePhaseTransition"]);
    }

    #[tokio::test]
    async fn test_enablement_checked_on_every_call() {
        let log = CallLog::default();
        let flag = Arc::new(AtomicBool::new(false));
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(TestPlugin::new("toggled", 1, &log).toggle(&flag)));

        registry
            .execute_hook(HookName::AfterStartDevelopment, &ctx())
            .await
            .unwrap();
        assert!(calls(&log).is_empty());

        flag.store(true, Ordering::SeqCst);
        registry
            .execute_hook(HookName::AfterStartDevelopment, &ctx())
            .await
            .unwrap();
        assert_eq!(calls(&log), vec!["toggled:afterStartDevelopment"]);
    }

    #[tokio::test]
    async fn test_disabled_gate_cannot_block() {
        let log = CallLog::default();
        let flag = Arc::new(AtomicBool::new(false));
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(
            TestPlugin::new("gate", 1, &log).failing("blocked").toggle(&flag),
        ));

        assert!(registry
            .execute_hook(HookName::BeforePhaseTransition, &ctx())
            .await
            .is_ok());
        assert!(calls(&log).is_empty());
    }

    #[tokio::test]
    async fn test_transform_pipeline_skips_failures() {
        let log = CallLog::default();
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(TestPlugin::new("c", 3, &log)));
        registry.register(Arc::new(TestPlugin::new("a", 1, &log)));
        registry.register(Arc::new(TestPlugin::new("b", 2, &log).failing("bad template")));

        let out = registry
            .execute_transform(HookName::AfterPlanFileCreated, &ctx(), "plan".to_string())
            .await
            .unwrap();

        assert_eq!(out, "plan+a+c");
        assert_eq!(calls(&log), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_transform_without_plugins_returns_input() {
        let registry = PluginRegistry::new();
        let out = registry
            .execute_transform(HookName::AfterPlanFileCreated, &ctx(), "plan".to_string())
            .await
            .unwrap();
        assert_eq!(out, "plan");
    }

    #[tokio::test]
    async fn test_policy_mismatch() {
        let registry = PluginRegistry::new();
        assert!(matches!(
            registry
                .execute_hook(HookName::AfterPlanFileCreated, &ctx())
                .await,
            Err(HookError::PolicyMismatch { .. })
        ));
        assert!(matches!(
            registry
                .execute_transform(HookName::BeforePhaseTransition, &ctx(), String::new())
                .await,
            Err(HookError::PolicyMismatch { .. })
        ));
    }

    #[test]
    fn test_list_names_exposes_duplicates() {
        let log = CallLog::default();
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(TestPlugin::new("commit", 1, &log)));
        registry.register(Arc::new(TestPlugin::new("commit", 2, &log)));

        assert_eq!(registry.list_names(), vec!["commit", "commit"]);
        assert_eq!(registry.len(), 2);
    }
}

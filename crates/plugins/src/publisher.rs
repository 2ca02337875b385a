use async_trait::async_trait;
use events::{Event, EventBus};
use tracing::debug;

use crate::context::PluginHookContext;
use crate::error::PluginError;
use crate::hook::HookName;
use crate::plugin::Plugin;

const HOOKS: &[HookName] = &[HookName::AfterStartDevelopment, HookName::AfterPhaseTransition];

/// Publishes conversation lifecycle events on an [`EventBus`].
///
/// Enabled only while something is subscribed, so idle buses cost nothing.
#[derive(Debug, Clone)]
pub struct EventPublisherPlugin {
    bus: EventBus,
    sequence: i32,
}

impl EventPublisherPlugin {
    pub const DEFAULT_SEQUENCE: i32 = 100;

    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            sequence: Self::DEFAULT_SEQUENCE,
        }
    }

    pub fn with_sequence(mut self, sequence: i32) -> Self {
        self.sequence = sequence;
        self
    }

    fn event_for(hook: HookName, ctx: &PluginHookContext) -> Result<Event, PluginError> {
        match hook {
            HookName::AfterStartDevelopment => Ok(Event::ConversationStarted {
                conversation_id: ctx.conversation_id.clone(),
                workflow: ctx.workflow.clone(),
                phase: ctx.current_phase.clone(),
            }),
            HookName::AfterPhaseTransition => {
                let to_phase = ctx.target_phase.clone().ok_or_else(|| {
                    PluginError::new("afterPhaseTransition context has no target phase")
                })?;
                Ok(Event::PhaseTransitioned {
                    conversation_id: ctx.conversation_id.clone(),
                    workflow: ctx.workflow.clone(),
                    from_phase: ctx.current_phase.clone(),
                    to_phase,
                })
            }
            other => Err(PluginError::new(format!("unsupported hook {other}"))),
        }
    }
}

#[async_trait]
impl Plugin for EventPublisherPlugin {
    fn name(&self) -> &str {
        "event-publisher"
    }

    fn sequence(&self) -> i32 {
        self.sequence
    }

    fn is_enabled(&self) -> bool {
        self.bus.subscriber_count() > 0
    }

    fn hooks(&self) -> &[HookName] {
        HOOKS
    }

    async fn on_hook(&self, hook: HookName, ctx: &PluginHookContext) -> Result<(), PluginError> {
        let event = Self::event_for(hook, ctx)?;
        let delivered = self.bus.emit(event);
        debug!(hook = %hook, delivered, "Published lifecycle event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PluginRegistry;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn ctx() -> PluginHookContext {
        PluginHookContext {
            conversation_id: "demo-main".to_string(),
            plan_file_path: PathBuf::from("plan.md"),
            current_phase: "plan".to_string(),
            workflow: "epcc".to_string(),
            project_path: PathBuf::from("/tmp/demo"),
            git_branch: "main".to_string(),
            target_phase: None,
        }
    }

    #[tokio::test]
    async fn test_publishes_phase_transition() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(EventPublisherPlugin::new(bus)));

        registry
            .execute_hook(
                HookName::AfterPhaseTransition,
                &ctx().with_target_phase("code"),
            )
            .await
            .unwrap();

        let envelope = rx.recv().await.unwrap();
        assert_eq!(
            envelope.event,
            Event::PhaseTransitioned {
                conversation_id: "demo-main".to_string(),
                workflow: "epcc".to_string(),
                from_phase: "plan".to_string(),
                to_phase: "code".to_string(),
            }
        );
    }

    #[test]
    fn test_disabled_without_subscribers() {
        let bus = EventBus::new();
        let plugin = EventPublisherPlugin::new(bus.clone());
        assert!(!plugin.is_enabled());

        let _rx = bus.subscribe();
        assert!(plugin.is_enabled());
    }

    #[tokio::test]
    async fn test_missing_target_phase_is_plugin_error() {
        let bus = EventBus::new();
        let _rx = bus.subscribe();
        let plugin = EventPublisherPlugin::new(bus.clone());

        let err = plugin
            .on_hook(HookName::AfterPhaseTransition, &ctx())
            .await
            .unwrap_err();
        assert!(err.message().contains("no target phase"));
        assert_eq!(bus.published_count(), 0);
    }
}

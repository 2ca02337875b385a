use async_trait::async_trait;

use crate::context::PluginHookContext;
use crate::error::PluginError;
use crate::hook::HookName;

/// An ordered extension invoked around conversation operations.
///
/// A plugin lists the hooks it implements in [`Plugin::hooks`]; dispatch only calls
/// it for those. Gating and side-effect hooks arrive at [`Plugin::on_hook`],
/// content-transform hooks at [`Plugin::transform`].
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique name. Uniqueness is the caller's responsibility.
    fn name(&self) -> &str;

    /// Lower sequences run first.
    fn sequence(&self) -> i32;

    /// Consulted on every dispatch, never cached.
    fn is_enabled(&self) -> bool {
        true
    }

    fn hooks(&self) -> &[HookName];

    async fn on_hook(&self, hook: HookName, ctx: &PluginHookContext) -> Result<(), PluginError> {
        let _ = (hook, ctx);
        Ok(())
    }

    async fn transform(
        &self,
        hook: HookName,
        ctx: &PluginHookContext,
        content: String,
    ) -> Result<String, PluginError> {
        let _ = (hook, ctx);
        Ok(content)
    }

    fn implements(&self, hook: HookName) -> bool {
        self.hooks().contains(&hook)
    }
}

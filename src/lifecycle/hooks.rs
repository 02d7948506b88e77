use crate::error::Result;
use async_trait::async_trait;

/// Behaviour a concrete adapter plugs into [`ManagedComponent`].
///
/// Hooks do the work and let errors propagate; the managed component turns
/// both `Ok(false)` and `Err(_)` into a recorded failure and a state change.
///
/// [`ManagedComponent`]: super::ManagedComponent
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// Connect or set up. `Ok(false)` marks an expected failure mode.
    async fn do_initialize(&self) -> Result<bool>;

    /// Release resources. Must tolerate running on a component that never
    /// finished initializing, since the default recovery calls it first.
    async fn do_shutdown(&self) -> Result<()>;

    /// Cheap, side-effect-free health check
    async fn check_health(&self) -> Result<bool>;

    /// Best-effort repair
    async fn do_recover(&self) -> Result<bool> {
        self.do_shutdown().await?;
        self.do_initialize().await
    }
}

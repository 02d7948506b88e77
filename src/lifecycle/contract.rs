use super::state::{ComponentState, ComponentStatus};
use crate::error::{CasebotError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Uniform lifecycle interface every supervised component exposes.
///
/// Failures of `initialize`, `is_healthy` and `recover` are contained by the
/// implementation and only surface through `status` and `last_error`.
/// `shutdown` is the exception: a failed teardown is returned to the caller.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Bring the component up. Idempotent once it has succeeded.
    async fn initialize(&self) -> bool;

    /// Release the component's resources. No-op when not initialized.
    async fn shutdown(&self) -> Result<()>;

    /// Check the component. Always `false` before a successful initialize.
    async fn is_healthy(&self) -> bool;

    /// Attempt to bring an unhealthy component back to running
    async fn recover(&self) -> bool;

    /// Derived three-valued status
    async fn status(&self) -> ComponentStatus;

    /// Most recent captured failure
    fn last_error(&self) -> Option<Arc<CasebotError>>;

    fn state(&self) -> ComponentState;

    fn is_initialized(&self) -> bool;
}

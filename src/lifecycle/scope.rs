use super::contract::Lifecycle;
use crate::error::{CasebotError, Result};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{error, warn};

/// Run `body` against an initialized component and shut it down afterwards.
///
/// Shutdown runs on every exit path of the body: success, error and panic.
/// A panic is resumed once shutdown has completed. When both the body and
/// the shutdown fail, the body's error is returned and the shutdown error is
/// logged.
pub async fn run_scoped<'a, C, F, Fut, T>(component: &'a C, body: F) -> Result<T>
where
    C: Lifecycle + ?Sized,
    F: FnOnce(&'a C) -> Fut,
    Fut: Future<Output = Result<T>> + 'a,
{
    if !component.initialize().await {
        return Err(CasebotError::InitializationFailed {
            component: component.name().to_string(),
        });
    }

    let outcome = AssertUnwindSafe(body(component)).catch_unwind().await;
    let shutdown = component.shutdown().await;

    match outcome {
        Ok(Ok(value)) => shutdown.map(|()| value),
        Ok(Err(e)) => {
            if let Err(shutdown_error) = shutdown {
                warn!(
                    "Shutdown of {} failed after scoped body error: {}",
                    component.name(),
                    shutdown_error
                );
            }
            Err(e)
        }
        Err(panic) => {
            if let Err(shutdown_error) = shutdown {
                error!(
                    "Shutdown of {} failed after scoped body panicked: {}",
                    component.name(),
                    shutdown_error
                );
            }
            std::panic::resume_unwind(panic)
        }
    }
}

use super::Supervisor;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{error, info};

impl Supervisor {
    /// Initialize every registered component. Keeps going after a failure
    /// and returns `true` only if all of them came up.
    pub async fn initialize_all(&self) -> bool {
        let mut failed = Vec::new();

        for (name, component, _) in self.snapshot() {
            match AssertUnwindSafe(component.initialize()).catch_unwind().await {
                Ok(true) => {}
                Ok(false) => {
                    error!("Failed to initialize component {}", name);
                    failed.push(name);
                }
                Err(_) => {
                    error!("Error initializing component {}: initialize panicked", name);
                    failed.push(name);
                }
            }
        }

        if failed.is_empty() {
            info!("All {} components initialized", self.len());
            true
        } else {
            error!("Components failed to initialize: {}", failed.join(", "));
            false
        }
    }

    /// Stop monitoring, then shut down every registered component.
    ///
    /// Teardown is exhaustive: individual failures are logged and collected,
    /// never propagated. Returns the names of components whose shutdown
    /// failed.
    pub async fn shutdown(&self) -> Vec<String> {
        info!("Beginning supervised shutdown");
        self.stop_monitoring().await;

        let mut failed = Vec::new();

        for (name, component, _) in self.snapshot() {
            match AssertUnwindSafe(component.shutdown()).catch_unwind().await {
                Ok(Ok(())) => info!("Shutdown component {}", name),
                Ok(Err(e)) => {
                    error!("Error shutting down component {}: {}", name, e);
                    failed.push(name);
                }
                Err(_) => {
                    error!("Error shutting down component {}: shutdown panicked", name);
                    failed.push(name);
                }
            }
        }

        if failed.is_empty() {
            info!("Supervised shutdown completed");
        } else {
            error!(
                "Supervised shutdown completed with {} failed components: {}",
                failed.len(),
                failed.join(", ")
            );
        }
        failed
    }
}

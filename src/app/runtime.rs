use super::{CasebotApp, ShutdownReason};
use crate::error::{CasebotError, Result};
use tracing::{error, info};

impl CasebotApp {
    /// Run until a shutdown signal or request arrives, then tear down.
    /// Returns the process exit code.
    pub async fn run(&mut self) -> Result<i32> {
        info!("Casebot is running");

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| CasebotError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers();

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| CasebotError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await;

        info!("Casebot shutdown complete");
        Ok(exit_code)
    }

    fn setup_signal_handlers(&self) {
        // SIGTERM (systemd stop), Unix only
        #[cfg(unix)]
        {
            let trigger = self.shutdown_trigger();
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};

                match signal(SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        if sigterm.recv().await.is_some() {
                            info!("Received SIGTERM signal");
                            trigger
                                .trigger(ShutdownReason::Signal("SIGTERM".to_string()))
                                .await;
                        }
                    }
                    Err(e) => error!("Failed to register SIGTERM handler: {}", e),
                }
            });
        }

        let trigger = self.shutdown_trigger();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                trigger
                    .trigger(ShutdownReason::Signal("SIGINT".to_string()))
                    .await;
            }
        });
    }
}

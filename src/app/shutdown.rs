use super::CasebotApp;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(10);

impl CasebotApp {
    /// Stop background tasks, then shut down every component through the
    /// supervisor. Returns 1 if anything failed to stop cleanly.
    pub async fn shutdown(&mut self) -> i32 {
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();

        let mut exit_code = 0;

        for (name, handle) in self.background_tasks.drain(..) {
            match timeout(TASK_STOP_TIMEOUT, handle).await {
                Ok(Ok(())) => info!("Stopped {} task", name),
                Ok(Err(e)) => {
                    error!("{} task ended abnormally: {}", name, e);
                    exit_code = 1;
                }
                Err(_) => {
                    warn!("{} task did not stop within {:?}", name, TASK_STOP_TIMEOUT);
                    exit_code = 1;
                }
            }
        }

        let failed = self.supervisor.shutdown().await;
        if !failed.is_empty() {
            exit_code = 1;
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        exit_code
    }
}

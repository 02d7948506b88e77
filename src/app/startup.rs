use super::CasebotApp;
use crate::error::Result;
use crate::supervisor::Supervisor;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

impl CasebotApp {
    /// Initialize every registered component. Components that fail stay
    /// registered so the monitor can bring them up later.
    pub async fn initialize(&self) -> bool {
        info!("Initializing casebot components");

        let all_up = self.supervisor.initialize_all().await;
        if !all_up {
            warn!("Some components failed to initialize, the monitor will attempt recovery");
        }
        all_up
    }

    /// Start monitoring and the background tasks
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting casebot");

        self.supervisor.start_monitoring().await;

        let report = tokio::spawn(report_loop(
            Arc::clone(&self.supervisor),
            self.config.monitor.report_interval(),
            self.cancellation_token.clone(),
        ));
        self.background_tasks.push(("health report", report));

        if self.config.http.enabled {
            self.start_status_server()?;
        }

        info!("Casebot started");
        Ok(())
    }

    #[cfg(feature = "http")]
    fn start_status_server(&mut self) -> Result<()> {
        use crate::status_server::StatusServer;

        let server = StatusServer::new(self.config.http.clone(), Arc::clone(&self.supervisor));
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = server.run(cancel).await {
                error!("Status server failed: {}", e);
            }
        });
        self.background_tasks.push(("status server", handle));
        Ok(())
    }

    #[cfg(not(feature = "http"))]
    fn start_status_server(&mut self) -> Result<()> {
        Err(crate::error::CasebotError::system(
            "HTTP status server requested but casebot was built without the http feature",
        ))
    }
}

async fn report_loop(supervisor: Arc<Supervisor>, interval: Duration, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {
                let not_healthy = supervisor.log_health_report().await;
                if not_healthy > 0 {
                    warn!("{} components not healthy", not_healthy);
                }
            }
        }
    }
}

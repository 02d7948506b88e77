use super::Supervisor;
use crate::lifecycle::ComponentStatus;
use tracing::{error, info, warn};

impl Supervisor {
    /// Log the status of every component and return how many are not
    /// healthy
    pub async fn log_health_report(&self) -> usize {
        let records = self.get_all_statuses().await;
        let mut not_healthy = 0;

        info!("=== Component Health Report ===");

        for record in &records {
            match (record.status, record.healthy) {
                (ComponentStatus::Healthy, true) => {
                    info!("Component {}: healthy", record.name);
                }
                (ComponentStatus::Stopped, _) => {
                    not_healthy += 1;
                    warn!("Component {}: stopped", record.name);
                }
                _ => {
                    not_healthy += 1;
                    error!(
                        "Component {}: unhealthy (last error: {})",
                        record.name,
                        record.last_error.as_deref().unwrap_or("none")
                    );
                }
            }
        }

        info!(
            "=== End Health Report ({}/{} healthy) ===",
            records.len() - not_healthy,
            records.len()
        );

        not_healthy
    }

    /// True when every registered component is healthy
    pub async fn all_healthy(&self) -> bool {
        for (_, component, _) in self.snapshot() {
            if component.status().await != ComponentStatus::Healthy {
                return false;
            }
        }
        true
    }
}

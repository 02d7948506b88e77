mod monitor;
mod registry;
mod report;
mod shutdown;
mod types;


pub use types::{PassSummary, StatusRecord, SupervisorConfig};

use crate::lifecycle::Lifecycle;
use crate::recovery::RecoveryTracker;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One supervised component. The supervisor shares the component, it does
/// not own its lifetime.
pub(crate) struct SupervisorEntry {
    pub(crate) name: String,
    pub(crate) component: Arc<dyn Lifecycle>,
    pub(crate) last_check: DateTime<Utc>,
    pub(crate) recovery: RecoveryTracker,
}

/// Registry in registration order. Locked only for short synchronous
/// sections, never across a hook call, so it may be mutated while a pass
/// is running.
pub(crate) type Registry = Mutex<Vec<SupervisorEntry>>;

struct MonitorTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Polls registered components, recovers the unhealthy ones and exposes
/// their status.
///
/// Owned by the application root; tests build isolated instances.
pub struct Supervisor {
    config: SupervisorConfig,
    registry: Arc<Registry>,
    monitor: tokio::sync::Mutex<Option<MonitorTask>>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            registry: Arc::new(Mutex::new(Vec::new())),
            monitor: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(SupervisorConfig::default())
    }
}

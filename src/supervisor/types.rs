use crate::lifecycle::ComponentStatus;
use crate::recovery::RecoveryPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Supervisor tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Pause between two check passes
    pub check_interval: Duration,
    /// Pacing of recovery attempts for unhealthy components
    pub recovery: RecoveryPolicy,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            recovery: RecoveryPolicy::default(),
        }
    }
}

impl SupervisorConfig {
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    pub fn with_recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }
}

/// Point-in-time view of one registered component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub name: String,
    pub status: ComponentStatus,
    pub healthy: bool,
    pub last_check: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// What happened during one check pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub checked: usize,
    pub healthy: usize,
    pub recovered: usize,
    pub recovery_failed: usize,
    /// Unhealthy components left alone by the recovery policy
    pub deferred: usize,
    /// Components whose check panicked
    pub faulted: usize,
}

impl PassSummary {
    pub fn unhealthy(&self) -> usize {
        self.checked - self.healthy
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal lifecycle state of a managed component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Uninitialized,
    Initializing,
    Running,
    Stopping,
    Stopped,
    Error,
    Recovering,
}

impl ComponentState {
    /// States in which the component performs no background work
    pub fn is_inert(&self) -> bool {
        matches!(self, ComponentState::Stopped | ComponentState::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentState::Uninitialized => "uninitialized",
            ComponentState::Initializing => "initializing",
            ComponentState::Running => "running",
            ComponentState::Stopping => "stopping",
            ComponentState::Stopped => "stopped",
            ComponentState::Error => "error",
            ComponentState::Recovering => "recovering",
        }
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally visible status, always derived from internal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Stopped,
    Healthy,
    Unhealthy,
}

impl ComponentStatus {
    /// Derive the status from the initialized flag, the internal state and
    /// the outcome of a health check
    pub fn derive(initialized: bool, state: ComponentState, healthy: bool) -> Self {
        if !initialized {
            ComponentStatus::Stopped
        } else if state == ComponentState::Error || !healthy {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Healthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Stopped => "stopped",
            ComponentStatus::Healthy => "healthy",
            ComponentStatus::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

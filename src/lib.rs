pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod recovery;
pub mod supervisor;

#[cfg(feature = "http")]
pub mod status_server;

pub use adapters::{ChatClient, MemoryCache, ModelClient, ModelSession, OutboundMessage};
pub use app::{CasebotApp, ShutdownReason, ShutdownTrigger};
pub use config::{CasebotConfig, ModelProvider};
pub use error::{CasebotError, Result};
pub use lifecycle::{
    run_scoped, ComponentState, ComponentStatus, Lifecycle, LifecycleHooks, ManagedComponent,
};
pub use recovery::{Backoff, RecoveryAction, RecoveryPolicy, RecoveryTracker};
pub use supervisor::{PassSummary, StatusRecord, Supervisor, SupervisorConfig};

use super::types::{ShutdownReason, ShutdownTrigger};
use crate::adapters::{ChatClient, MemoryCache, ModelClient};
use crate::config::CasebotConfig;
use crate::error::Result;
use crate::lifecycle::{LifecycleHooks, ManagedComponent};
use crate::supervisor::Supervisor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Application root: owns the supervisor and every managed component
pub struct CasebotApp {
    pub(super) config: CasebotConfig,
    pub(super) supervisor: Arc<Supervisor>,

    // Components
    pub(super) chat: Arc<ManagedComponent<ChatClient>>,
    pub(super) model: Arc<ManagedComponent<ModelClient>>,
    pub(super) cache: Arc<ManagedComponent<MemoryCache>>,

    // Runtime
    pub(super) shutdown_trigger: ShutdownTrigger,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
    pub(super) background_tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl CasebotApp {
    /// Build every component and register it with a new supervisor.
    /// Nothing is initialized yet.
    pub fn new(config: CasebotConfig) -> Result<Self> {
        config.validate()?;

        let hook_timeout = config.monitor.hook_timeout();
        let supervisor = Arc::new(Supervisor::new(config.monitor.supervisor_config()));

        let chat = managed("chat", ChatClient::new(config.chat.clone()), hook_timeout);
        let model = managed("model", ModelClient::new(config.model.clone()), hook_timeout);
        let cache = managed("cache", MemoryCache::new(config.cache.clone()), hook_timeout);

        supervisor.register_component("chat", chat.clone());
        supervisor.register_component("model", model.clone());
        supervisor.register_component("cache", cache.clone());

        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Ok(Self {
            config,
            supervisor,
            chat,
            model,
            cache,
            shutdown_trigger: ShutdownTrigger::new(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
            background_tasks: Vec::new(),
        })
    }

    pub fn config(&self) -> &CasebotConfig {
        &self.config
    }

    pub fn supervisor(&self) -> Arc<Supervisor> {
        Arc::clone(&self.supervisor)
    }

    pub fn chat(&self) -> &ChatClient {
        self.chat.hooks()
    }

    pub fn model(&self) -> &ModelClient {
        self.model.hooks()
    }

    pub fn cache(&self) -> &MemoryCache {
        self.cache.hooks()
    }

    /// Handle that makes `run` return
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.shutdown_trigger.clone()
    }
}

fn managed<H: LifecycleHooks>(
    name: &str,
    hooks: H,
    hook_timeout: Option<Duration>,
) -> Arc<ManagedComponent<H>> {
    let component = ManagedComponent::new(name, hooks);
    let component = match hook_timeout {
        Some(limit) => {
            debug!("Component {} hooks limited to {:?}", name, limit);
            component.with_hook_timeout(limit)
        }
        None => component,
    };
    Arc::new(component)
}

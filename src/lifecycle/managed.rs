use super::contract::Lifecycle;
use super::hooks::LifecycleHooks;
use super::state::{ComponentState, ComponentStatus};
use crate::error::{CasebotError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info};

#[derive(Debug)]
struct LifecycleInner {
    state: ComponentState,
    last_error: Option<Arc<CasebotError>>,
    initialized: bool,
}

/// Lifecycle runtime wrapped around a set of adapter hooks.
///
/// Owns the state machine, error capture and idempotency guarantees so the
/// hooks only have to do the actual work. Every public operation holds this
/// component's transition guard for its whole duration; unrelated
/// components never contend on it.
pub struct ManagedComponent<H> {
    name: String,
    hooks: H,
    inner: RwLock<LifecycleInner>,
    transition: Mutex<()>,
    hook_timeout: Option<Duration>,
}

impl<H: LifecycleHooks> ManagedComponent<H> {
    pub fn new<S: Into<String>>(name: S, hooks: H) -> Self {
        Self {
            name: name.into(),
            hooks,
            inner: RwLock::new(LifecycleInner {
                state: ComponentState::Uninitialized,
                last_error: None,
                initialized: false,
            }),
            transition: Mutex::new(()),
            hook_timeout: None,
        }
    }

    /// Treat any hook running longer than `limit` as failed
    pub fn with_hook_timeout(mut self, limit: Duration) -> Self {
        self.hook_timeout = Some(limit);
        self
    }

    pub fn hook_timeout(&self) -> Option<Duration> {
        self.hook_timeout
    }

    /// Adapter-specific API of the wrapped hooks
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    fn set_state(&self, state: ComponentState) {
        let mut inner = self.inner.write();
        if inner.state != state {
            debug!("Component '{}' state changed: {} -> {}", self.name, inner.state, state);
            inner.state = state;
        }
    }

    fn record_failure(&self, error: CasebotError) -> Arc<CasebotError> {
        let error = Arc::new(error);
        let mut inner = self.inner.write();
        inner.last_error = Some(Arc::clone(&error));
        inner.state = ComponentState::Error;
        error
    }

    /// A successful recover also counts as initialized, so a component that
    /// was repaired without ever passing `initialize` reports its real health
    fn mark_running(&self) {
        let mut inner = self.inner.write();
        inner.initialized = true;
        inner.last_error = None;
        inner.state = ComponentState::Running;
    }

    fn hook_failed(&self, operation: &'static str) -> CasebotError {
        CasebotError::HookFailed {
            component: self.name.clone(),
            operation,
        }
    }

    async fn call_hook<T, F>(&self, operation: &'static str, hook: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.hook_timeout {
            Some(limit) => match timeout(limit, hook).await {
                Ok(result) => result,
                Err(_) => Err(CasebotError::HookTimeout {
                    component: self.name.clone(),
                    operation,
                    timeout: limit,
                }),
            },
            None => hook.await,
        }
    }
}

#[async_trait]
impl<H: LifecycleHooks> Lifecycle for ManagedComponent<H> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> bool {
        let _guard = self.transition.lock().await;

        if self.is_initialized() {
            return true;
        }

        info!("Initializing {}", self.name);
        self.set_state(ComponentState::Initializing);

        match self.call_hook("initialize", self.hooks.do_initialize()).await {
            Ok(true) => {
                self.mark_running();
                info!("{} initialized successfully", self.name);
                true
            }
            Ok(false) => {
                self.record_failure(self.hook_failed("initialize"));
                error!("Failed to initialize {}", self.name);
                false
            }
            Err(e) => {
                error!("Error initializing {}: {}", self.name, e);
                self.record_failure(e);
                false
            }
        }
    }

    async fn shutdown(&self) -> Result<()> {
        let _guard = self.transition.lock().await;

        if !self.is_initialized() {
            return Ok(());
        }

        info!("Shutting down {}", self.name);
        self.set_state(ComponentState::Stopping);

        match self.call_hook("shutdown", self.hooks.do_shutdown()).await {
            Ok(()) => {
                {
                    let mut inner = self.inner.write();
                    inner.initialized = false;
                    inner.state = ComponentState::Stopped;
                }
                info!("{} shut down successfully", self.name);
                Ok(())
            }
            Err(e) => {
                error!("Error shutting down {}: {}", self.name, e);
                let source = self.record_failure(e);
                Err(CasebotError::ShutdownFailed {
                    component: self.name.clone(),
                    source,
                })
            }
        }
    }

    async fn is_healthy(&self) -> bool {
        let _guard = self.transition.lock().await;

        if !self.is_initialized() {
            return false;
        }

        match self.call_hook("health check", self.hooks.check_health()).await {
            Ok(healthy) => healthy,
            Err(e) => {
                error!("{} health check failed: {}", self.name, e);
                self.record_failure(e);
                false
            }
        }
    }

    async fn recover(&self) -> bool {
        let _guard = self.transition.lock().await;

        info!("Attempting to recover {}", self.name);
        self.set_state(ComponentState::Recovering);

        match self.call_hook("recover", self.hooks.do_recover()).await {
            Ok(true) => {
                self.mark_running();
                info!("{} recovered successfully", self.name);
                true
            }
            Ok(false) => {
                self.record_failure(self.hook_failed("recover"));
                error!("Failed to recover {}", self.name);
                false
            }
            Err(e) => {
                error!("Error recovering {}: {}", self.name, e);
                self.record_failure(e);
                false
            }
        }
    }

    async fn status(&self) -> ComponentStatus {
        let (initialized, state) = {
            let inner = self.inner.read();
            (inner.initialized, inner.state)
        };

        if !initialized || state == ComponentState::Error {
            return ComponentStatus::derive(initialized, state, false);
        }

        let healthy = self.is_healthy().await;

        // The check itself may have moved the component into Error
        ComponentStatus::derive(self.is_initialized(), self.state(), healthy)
    }

    fn last_error(&self) -> Option<Arc<CasebotError>> {
        self.inner.read().last_error.clone()
    }

    fn state(&self) -> ComponentState {
        self.inner.read().state
    }

    fn is_initialized(&self) -> bool {
        self.inner.read().initialized
    }
}

impl<H> std::fmt::Debug for ManagedComponent<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ManagedComponent")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("initialized", &inner.initialized)
            .field("last_error", &inner.last_error)
            .finish()
    }
}

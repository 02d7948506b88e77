use crate::config::{ModelConfig, ModelProvider};
use crate::error::{CasebotError, Result};
use crate::lifecycle::LifecycleHooks;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use uuid::Uuid;

impl ModelProvider {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ModelProvider::Claude => "https://api.anthropic.com/v1/messages",
            ModelProvider::OpenAi => "https://api.openai.com/v1/chat/completions",
        }
    }
}

/// An authenticated session with a model provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSession {
    pub id: Uuid,
    pub provider: ModelProvider,
    pub endpoint: &'static str,
    pub opened_at: DateTime<Utc>,
}

/// Language-model client
pub struct ModelClient {
    config: ModelConfig,
    session: RwLock<Option<ModelSession>>,
    revoked: AtomicBool,
}

impl ModelClient {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            session: RwLock::new(None),
            revoked: AtomicBool::new(false),
        }
    }

    pub fn provider(&self) -> ModelProvider {
        self.config.provider
    }

    /// Current session, if one is open and still valid
    pub fn session(&self) -> Result<ModelSession> {
        if self.revoked.load(Ordering::SeqCst) {
            return Err(CasebotError::unavailable("model"));
        }
        self.session
            .read()
            .clone()
            .ok_or_else(|| CasebotError::unavailable("model"))
    }

    /// Mark the session's credentials as revoked by the provider
    pub fn revoke_session(&self) {
        if self.session.read().is_some() {
            warn!("Model session for {:?} revoked", self.config.provider);
            self.revoked.store(true, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl LifecycleHooks for ModelClient {
    async fn do_initialize(&self) -> Result<bool> {
        if self.config.api_key.as_deref().map_or(true, str::is_empty) {
            warn!("No API key configured for {:?}", self.config.provider);
            return Ok(false);
        }

        let session = ModelSession {
            id: Uuid::new_v4(),
            provider: self.config.provider,
            endpoint: self.config.provider.endpoint(),
            opened_at: Utc::now(),
        };
        info!("Opened model session {} at {}", session.id, session.endpoint);

        *self.session.write() = Some(session);
        self.revoked.store(false, Ordering::SeqCst);
        Ok(true)
    }

    async fn do_shutdown(&self) -> Result<()> {
        if let Some(session) = self.session.write().take() {
            info!("Closed model session {}", session.id);
        }
        Ok(())
    }

    async fn check_health(&self) -> Result<bool> {
        Ok(self.session.read().is_some() && !self.revoked.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ComponentStatus, Lifecycle, ManagedComponent};

    fn create_test_config(api_key: Option<&str>) -> ModelConfig {
        ModelConfig {
            provider: ModelProvider::OpenAi,
            api_key: api_key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_initialize() {
        let model = ManagedComponent::new("model", ModelClient::new(create_test_config(Some(""))));

        assert!(!model.initialize().await);
        assert!(model.hooks().session().is_err());
        assert_eq!(model.status().await, ComponentStatus::Stopped);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let model = ManagedComponent::new("model", ModelClient::new(create_test_config(Some("sk"))));
        assert!(model.initialize().await);

        let session = model.hooks().session().unwrap();
        assert_eq!(session.provider, ModelProvider::OpenAi);
        assert_eq!(session.endpoint, ModelProvider::OpenAi.endpoint());
        assert_eq!(model.status().await, ComponentStatus::Healthy);

        model.shutdown().await.unwrap();
        assert!(model.hooks().session().is_err());
    }

    #[tokio::test]
    async fn test_revoked_session_recovers_with_new_session() {
        let model = ManagedComponent::new("model", ModelClient::new(create_test_config(Some("sk"))));
        assert!(model.initialize().await);
        let original = model.hooks().session().unwrap();

        model.hooks().revoke_session();
        assert!(!model.is_healthy().await);
        assert_eq!(model.status().await, ComponentStatus::Unhealthy);
        // A revoked session is not an error, just unhealthy
        assert!(model.last_error().is_none());

        assert!(model.recover().await);
        let renewed = model.hooks().session().unwrap();
        assert_ne!(renewed.id, original.id);
        assert_eq!(model.status().await, ComponentStatus::Healthy);
    }

    #[test]
    fn test_provider_serialization() {
        assert_eq!(serde_json::to_string(&ModelProvider::OpenAi).unwrap(), "\"openai\"");
        assert_eq!(serde_json::to_string(&ModelProvider::Claude).unwrap(), "\"claude\"");
    }
}

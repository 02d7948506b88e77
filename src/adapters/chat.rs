use crate::config::ChatConfig;
use crate::error::{CasebotError, Result};
use crate::lifecycle::LifecycleHooks;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

const COMPONENT: &str = "chat";

/// Message queued for delivery to a chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub id: Uuid,
    pub chat_id: i64,
    pub text: String,
    pub queued_at: DateTime<Utc>,
}

struct Dispatcher {
    sender: mpsc::Sender<OutboundMessage>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Outbound gateway to the chat platform.
///
/// Messages go through a bounded queue drained by a dispatcher task. The
/// gateway counts as healthy for as long as that task is alive.
pub struct ChatClient {
    config: ChatConfig,
    dispatcher: tokio::sync::Mutex<Option<Dispatcher>>,
    delivered: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            config,
            dispatcher: tokio::sync::Mutex::new(None),
            delivered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a message. Waits for queue space when the dispatcher is behind.
    pub async fn send<S: Into<String>>(&self, chat_id: i64, text: S) -> Result<Uuid> {
        let sender = {
            let dispatcher = self.dispatcher.lock().await;
            match dispatcher.as_ref() {
                Some(dispatcher) => dispatcher.sender.clone(),
                None => return Err(CasebotError::unavailable(COMPONENT)),
            }
        };

        let message = OutboundMessage {
            id: Uuid::new_v4(),
            chat_id,
            text: text.into(),
            queued_at: Utc::now(),
        };
        let id = message.id;

        sender
            .send(message)
            .await
            .map_err(|_| CasebotError::unavailable(COMPONENT))?;

        Ok(id)
    }

    /// Messages the dispatcher has handed off, oldest first
    pub fn delivered(&self) -> Vec<OutboundMessage> {
        self.delivered.lock().clone()
    }

    /// Drop the platform connection without going through shutdown, the way
    /// a network failure would. The dispatcher exits and health checks start
    /// failing until the component is recovered.
    pub async fn disconnect(&self) {
        if let Some(dispatcher) = self.dispatcher.lock().await.as_ref() {
            warn!("Chat gateway connection dropped");
            dispatcher.cancel.cancel();
        }
    }

    async fn stop_dispatcher(&self) -> Result<()> {
        let Some(dispatcher) = self.dispatcher.lock().await.take() else {
            return Ok(());
        };

        dispatcher.cancel.cancel();
        dispatcher
            .handle
            .await
            .map_err(|e| CasebotError::component(COMPONENT, format!("dispatcher task failed: {}", e)))
    }
}

#[async_trait]
impl LifecycleHooks for ChatClient {
    async fn do_initialize(&self) -> Result<bool> {
        let token_present = self
            .config
            .token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty());
        if !token_present {
            warn!("Chat token not configured");
            return Ok(false);
        }

        // A dispatcher left over from a failed shutdown is replaced
        self.stop_dispatcher().await?;

        let (sender, receiver) = mpsc::channel(self.config.queue_capacity);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(dispatch_loop(
            receiver,
            cancel.clone(),
            Arc::clone(&self.delivered),
        ));

        *self.dispatcher.lock().await = Some(Dispatcher {
            sender,
            cancel,
            handle,
        });

        info!(
            "Chat dispatcher started (queue capacity: {})",
            self.config.queue_capacity
        );
        Ok(true)
    }

    async fn do_shutdown(&self) -> Result<()> {
        self.stop_dispatcher().await?;
        info!("Chat dispatcher stopped");
        Ok(())
    }

    async fn check_health(&self) -> Result<bool> {
        Ok(self
            .dispatcher
            .lock()
            .await
            .as_ref()
            .is_some_and(|dispatcher| !dispatcher.handle.is_finished()))
    }
}

async fn dispatch_loop(
    mut receiver: mpsc::Receiver<OutboundMessage>,
    cancel: CancellationToken,
    delivered: Arc<Mutex<Vec<OutboundMessage>>>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            message = receiver.recv() => match message {
                Some(message) => deliver(&delivered, message),
                None => break,
            },
        }
    }

    // Hand off whatever was queued before the stop request
    receiver.close();
    while let Ok(message) = receiver.try_recv() {
        deliver(&delivered, message);
    }
    debug!("Chat dispatch loop exited");
}

fn deliver(delivered: &Mutex<Vec<OutboundMessage>>, message: OutboundMessage) {
    debug!("Dispatching message {} to chat {}", message.id, message.chat_id);
    delivered.lock().push(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ComponentStatus, Lifecycle, ManagedComponent};
    use std::time::Duration;

    fn create_test_config(token: Option<&str>) -> ChatConfig {
        ChatConfig {
            token: token.map(str::to_string),
            queue_capacity: 8,
        }
    }

    async fn wait_for_delivery(client: &ChatClient, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while client.delivered().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_missing_token_fails_initialize() {
        let chat = ManagedComponent::new("chat", ChatClient::new(create_test_config(None)));

        assert!(!chat.initialize().await);
        assert_eq!(chat.status().await, ComponentStatus::Stopped);
        assert!(matches!(
            chat.last_error().as_deref(),
            Some(CasebotError::HookFailed { operation: "initialize", .. })
        ));
    }

    #[tokio::test]
    async fn test_send_before_initialize() {
        let client = ChatClient::new(create_test_config(Some("token")));

        let result = client.send(1, "hello").await;
        assert!(matches!(result, Err(CasebotError::ComponentUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_messages_are_dispatched_in_order() {
        let chat = ManagedComponent::new("chat", ChatClient::new(create_test_config(Some("token"))));
        assert!(chat.initialize().await);
        assert_eq!(chat.status().await, ComponentStatus::Healthy);

        let first = chat.hooks().send(10, "first").await.unwrap();
        let second = chat.hooks().send(10, "second").await.unwrap();
        wait_for_delivery(chat.hooks(), 2).await;

        let delivered = chat.hooks().delivered();
        assert_eq!(delivered[0].id, first);
        assert_eq!(delivered[1].id, second);
        assert_eq!(delivered[1].text, "second");

        chat.shutdown().await.unwrap();
        assert_eq!(chat.status().await, ComponentStatus::Stopped);
        assert!(chat.hooks().send(10, "late").await.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_and_recover() {
        let chat = ManagedComponent::new("chat", ChatClient::new(create_test_config(Some("token"))));
        assert!(chat.initialize().await);

        chat.hooks().disconnect().await;
        tokio::time::timeout(Duration::from_secs(2), async {
            while chat.is_healthy().await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(chat.status().await, ComponentStatus::Unhealthy);

        assert!(chat.recover().await);
        assert_eq!(chat.status().await, ComponentStatus::Healthy);

        chat.hooks().send(7, "back online").await.unwrap();
        wait_for_delivery(chat.hooks(), 1).await;
    }
}

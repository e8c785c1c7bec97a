//! Multi-channel broadcast hub.
//!
//! Named channels map client ids to delivery endpoints. Publishing fans out
//! to a snapshot of the channel's subscribers taken under the read lock, so
//! slow deliveries never block subscription changes. A failed delivery is
//! logged and that subscriber is pruned; it never aborts delivery to the
//! rest and never propagates to whoever published.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::events::OutboundMessage;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("delivery failed: {reason}")]
pub struct DeliveryError {
    pub reason: String,
}

impl DeliveryError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Where messages for one subscriber go. The excluded transport layer
/// (websockets in production, buffers in tests) implements this.
#[async_trait]
pub trait DeliveryEndpoint: Send + Sync {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliveryError>;
}

type Subscribers = HashMap<ClientId, Arc<dyn DeliveryEndpoint>>;

#[derive(Default)]
pub struct BroadcastHub {
    channels: RwLock<HashMap<String, Subscribers>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Idempotent upsert: re-subscribing replaces the endpoint.
    pub async fn subscribe(
        &self,
        channel: &str,
        client: ClientId,
        endpoint: Arc<dyn DeliveryEndpoint>,
    ) {
        let mut channels = self.channels.write().await;
        channels
            .entry(channel.to_string())
            .or_default()
            .insert(client.clone(), endpoint);
        debug!(%client, channel, "client subscribed");
    }

    /// Idempotent removal: unsubscribing an absent client is a no-op.
    pub async fn unsubscribe(&self, channel: &str, client: &ClientId) {
        let mut channels = self.channels.write().await;
        if let Some(subscribers) = channels.get_mut(channel) {
            if subscribers.remove(client).is_some() {
                debug!(%client, channel, "client unsubscribed");
            }
        }
    }

    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .await
            .get(channel)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Deliver to every current subscriber of the channel. Returns how many
    /// deliveries succeeded. Failing subscribers are pruned afterwards.
    pub async fn publish(&self, channel: &str, message: &OutboundMessage) -> usize {
        let snapshot: Vec<(ClientId, Arc<dyn DeliveryEndpoint>)> = {
            let channels = self.channels.read().await;
            match channels.get(channel) {
                Some(subscribers) => subscribers
                    .iter()
                    .map(|(id, endpoint)| (id.clone(), Arc::clone(endpoint)))
                    .collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        let mut dead: Vec<ClientId> = Vec::new();

        for (client, endpoint) in snapshot {
            match endpoint.deliver(message).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(%client, channel, error = %e, "dropping unreachable subscriber");
                    dead.push(client);
                }
            }
        }

        if !dead.is_empty() {
            let mut channels = self.channels.write().await;
            if let Some(subscribers) = channels.get_mut(channel) {
                for client in &dead {
                    subscribers.remove(client);
                }
            }
        }

        delivered
    }

    /// Unicast to one subscriber. Same failure rule as publish: a failed
    /// delivery removes the subscriber and is reported as false.
    pub async fn send(&self, channel: &str, client: &ClientId, message: &OutboundMessage) -> bool {
        let endpoint = {
            let channels = self.channels.read().await;
            channels
                .get(channel)
                .and_then(|subscribers| subscribers.get(client))
                .map(Arc::clone)
        };

        let Some(endpoint) = endpoint else {
            return false;
        };

        match endpoint.deliver(message).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%client, channel, error = %e, "dropping unreachable subscriber");
                self.unsubscribe(channel, client).await;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records everything delivered to it.
    #[derive(Default)]
    pub struct RecordingEndpoint {
        pub messages: Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl DeliveryEndpoint for RecordingEndpoint {
        async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
            self.messages.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    pub struct FailingEndpoint;

    #[async_trait]
    impl DeliveryEndpoint for FailingEndpoint {
        async fn deliver(&self, _message: &OutboundMessage) -> Result<(), DeliveryError> {
            Err(DeliveryError::new("connection reset"))
        }
    }

    fn message() -> OutboundMessage {
        OutboundMessage::new("price_update", serde_json::json!({"symbol": "PEPE"}))
    }

    #[tokio::test]
    async fn publish_reaches_all_subscribers() {
        let hub = BroadcastHub::new();
        let a = Arc::new(RecordingEndpoint::default());
        let b = Arc::new(RecordingEndpoint::default());

        hub.subscribe("trades", ClientId::new("a"), a.clone()).await;
        hub.subscribe("trades", ClientId::new("b"), b.clone()).await;

        let delivered = hub.publish("trades", &message()).await;
        assert_eq!(delivered, 2);
        assert_eq!(a.messages.lock().unwrap().len(), 1);
        assert_eq!(b.messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failing_subscriber_is_isolated_and_pruned() {
        let hub = BroadcastHub::new();
        let healthy = Arc::new(RecordingEndpoint::default());

        hub.subscribe("trades", ClientId::new("healthy"), healthy.clone())
            .await;
        hub.subscribe("trades", ClientId::new("broken"), Arc::new(FailingEndpoint))
            .await;

        let delivered = hub.publish("trades", &message()).await;
        assert_eq!(delivered, 1);
        assert_eq!(healthy.messages.lock().unwrap().len(), 1);
        // broken client removed, healthy one still there
        assert_eq!(hub.subscriber_count("trades").await, 1);

        let delivered = hub.publish("trades", &message()).await;
        assert_eq!(delivered, 1);
        assert_eq!(healthy.messages.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn subscribe_is_upsert() {
        let hub = BroadcastHub::new();
        let first = Arc::new(RecordingEndpoint::default());
        let second = Arc::new(RecordingEndpoint::default());
        let client = ClientId::new("a");

        hub.subscribe("risk", client.clone(), first.clone()).await;
        hub.subscribe("risk", client.clone(), second.clone()).await;
        assert_eq!(hub.subscriber_count("risk").await, 1);

        hub.publish("risk", &message()).await;
        assert_eq!(first.messages.lock().unwrap().len(), 0);
        assert_eq!(second.messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unsubscribe_absent_client_is_noop() {
        let hub = BroadcastHub::new();
        hub.unsubscribe("positions", &ClientId::new("ghost")).await;
        hub.unsubscribe("nonexistent_channel", &ClientId::new("ghost"))
            .await;
        assert_eq!(hub.subscriber_count("positions").await, 0);
    }

    #[tokio::test]
    async fn send_unicasts_to_one_client() {
        let hub = BroadcastHub::new();
        let a = Arc::new(RecordingEndpoint::default());
        let b = Arc::new(RecordingEndpoint::default());

        hub.subscribe("positions", ClientId::new("a"), a.clone()).await;
        hub.subscribe("positions", ClientId::new("b"), b.clone()).await;

        assert!(hub.send("positions", &ClientId::new("a"), &message()).await);
        assert_eq!(a.messages.lock().unwrap().len(), 1);
        assert_eq!(b.messages.lock().unwrap().len(), 0);

        // unknown client: quietly false
        assert!(!hub.send("positions", &ClientId::new("c"), &message()).await);
    }

    #[tokio::test]
    async fn send_failure_prunes_subscriber() {
        let hub = BroadcastHub::new();
        hub.subscribe("risk", ClientId::new("broken"), Arc::new(FailingEndpoint))
            .await;

        assert!(!hub.send("risk", &ClientId::new("broken"), &message()).await);
        assert_eq!(hub.subscriber_count("risk").await, 0);
    }

    #[tokio::test]
    async fn publish_to_empty_channel() {
        let hub = BroadcastHub::new();
        assert_eq!(hub.publish("trades", &message()).await, 0);
    }
}

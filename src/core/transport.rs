//! Realtime transport boundary
//!
//! The upstream broker delivers batches of changed entity ids on a topic
//! scoped by dashboard id. The broker itself is an external collaborator;
//! this module defines the subscription trait plus an in-process
//! implementation used by tests and the demo binary.

use async_trait::async_trait;
use log::{debug, warn};
use rt_board_types::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Queue depth per topic subscriber; deliveries beyond it are dropped with a
/// warning (the feed is at-least-once upstream)
const SUBSCRIBER_QUEUE_DEPTH: usize = 256;

/// Batch of changed entity ids as delivered by the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeEvent {
    pub entity_ids: Vec<EntityId>,
}

impl ExchangeEvent {
    pub fn new(entity_ids: Vec<EntityId>) -> Self {
        Self { entity_ids }
    }
}

/// Fixed exchange topic name scoped by dashboard id
pub fn exchange_topic(dashboard_id: &str) -> String {
    format!("drawing_board/exchange/{dashboard_id}")
}

/// An active topic subscription.
///
/// Dropping the subscription unsubscribes from the topic.
pub struct TopicSubscription {
    topic: String,
    receiver: mpsc::Receiver<ExchangeEvent>,
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl TopicSubscription {
    pub fn new(
        topic: impl Into<String>,
        receiver: mpsc::Receiver<ExchangeEvent>,
        unsubscribe: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            topic: topic.into(),
            receiver,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next delivered batch; `None` once the transport shuts down
    pub async fn recv(&mut self) -> Option<ExchangeEvent> {
        self.receiver.recv().await
    }
}

impl Drop for TopicSubscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

/// Consumer-side view of the realtime broker
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    async fn subscribe(&self, topic: &str) -> anyhow::Result<TopicSubscription>;
}

struct TopicSender {
    id: Uuid,
    sender: mpsc::Sender<ExchangeEvent>,
}

struct BusInner {
    topics: RwLock<HashMap<String, Vec<TopicSender>>>,
}

impl BusInner {
    fn remove(&self, topic: &str, id: Uuid) {
        if let Ok(mut topics) = self.topics.write() {
            if let Some(senders) = topics.get_mut(topic) {
                senders.retain(|s| s.id != id);
                if senders.is_empty() {
                    topics.remove(topic);
                }
            }
        }
    }
}

/// In-process transport for tests and the demo binary.
///
/// Topic -> subscriber-list fan out over bounded mpsc channels; publishing
/// never blocks the caller.
#[derive(Clone)]
pub struct InMemoryTransport {
    inner: Arc<BusInner>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                topics: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Deliver an event to every subscriber of a topic.
    ///
    /// Returns the number of subscribers reached; a full subscriber queue
    /// drops the event for that subscriber only.
    pub fn publish(&self, topic: &str, event: ExchangeEvent) -> usize {
        let topics = match self.inner.topics.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(senders) = topics.get(topic) else {
            debug!("no subscribers for topic {}", topic);
            return 0;
        };

        let mut delivered = 0;
        for subscriber in senders {
            if subscriber.sender.try_send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                warn!(
                    "dropped exchange event for saturated subscriber {} on {}",
                    subscriber.id, topic
                );
            }
        }
        delivered
    }

    /// Number of active subscriptions on a topic (diagnostics)
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .topics
            .read()
            .map(|topics| topics.get(topic).map(|s| s.len()).unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeTransport for InMemoryTransport {
    async fn subscribe(&self, topic: &str) -> anyhow::Result<TopicSubscription> {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        let id = Uuid::new_v4();

        {
            let mut topics = match self.inner.topics.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            topics
                .entry(topic.to_string())
                .or_default()
                .push(TopicSender { id, sender });
        }
        debug!("subscribed {} to topic {}", id, topic);

        let inner = Arc::clone(&self.inner);
        let topic_owned = topic.to_string();
        Ok(TopicSubscription::new(topic, receiver, move || {
            inner.remove(&topic_owned, id);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_topic_subscribers_only() {
        let transport = InMemoryTransport::new();
        let mut board_a = transport
            .subscribe(&exchange_topic("board-a"))
            .await
            .unwrap();
        let _board_b = transport
            .subscribe(&exchange_topic("board-b"))
            .await
            .unwrap();

        let event = ExchangeEvent::new(vec![EntityId::from("e-1")]);
        let delivered = transport.publish(&exchange_topic("board-a"), event.clone());
        assert_eq!(delivered, 1);
        assert_eq!(board_a.recv().await, Some(event));
    }

    #[tokio::test]
    async fn test_dropping_subscription_unsubscribes() {
        let transport = InMemoryTransport::new();
        let topic = exchange_topic("board-a");

        let subscription = transport.subscribe(&topic).await.unwrap();
        assert_eq!(transport.subscriber_count(&topic), 1);

        drop(subscription);
        assert_eq!(transport.subscriber_count(&topic), 0);
        assert_eq!(
            transport.publish(&topic, ExchangeEvent::new(vec![EntityId::from("e-1")])),
            0
        );
    }

    #[test]
    fn test_exchange_event_wire_shape() {
        let event = ExchangeEvent::new(vec![EntityId::from("e-1"), EntityId::from("7")]);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"entity_ids\""));

        // Numeric ids on the wire parse into the same id space
        let deserialized: ExchangeEvent =
            serde_json::from_str("{\"entity_ids\": [\"e-1\", 7]}").unwrap();
        assert_eq!(deserialized, event);
    }
}

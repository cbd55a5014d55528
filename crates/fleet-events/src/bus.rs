//! The fleet event bus.
//!
//! A single broadcast channel fans `fleet_types::Event`s out to every
//! subscriber (the `/ws/events` handlers in `fleet-gateway`, plus internal
//! consumers such as the metrics aggregator). Backpressure policy is fixed
//! at drop-oldest: a slow subscriber loses the messages it failed to keep up
//! with rather than stalling publishers, and the loss is counted in
//! [`BusMetrics`](crate::metrics::BusMetrics) rather than hidden.

use fleet_types::Event;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

use crate::metrics::BusMetrics;

/// Default channel capacity. Chosen so a subscriber that stalls for a
/// handful of seconds under normal event volume won't lose anything; past
/// that, drop-oldest takes over.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    metrics: Arc<BusMetrics>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            metrics: Arc::new(BusMetrics::new()),
        }
    }

    /// Publish an event to every current subscriber. A publish with zero
    /// subscribers is not an error — the event is simply dropped, same as
    /// `tokio::sync::broadcast`'s own semantics.
    pub fn publish(&self, event: Event) {
        self.metrics.record_publish();
        let _ = self.sender.send(event);
    }

    /// Subscribe to the event stream. The returned handle applies drop-oldest
    /// backpressure transparently: call [`EventSubscription::recv`] in a loop.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
            metrics: self.metrics.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn metrics(&self) -> &BusMetrics {
        &self.metrics
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EventSubscription {
    receiver: broadcast::Receiver<Event>,
    metrics: Arc<BusMetrics>,
}

impl EventSubscription {
    /// Await the next event, transparently skipping past any gap left by a
    /// drop-oldest eviction rather than surfacing it as an error.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.metrics.record_lag(n);
                    warn!(missed = n, "event bus subscriber lagged, dropping oldest");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_types::{Event, EventSeverity, EventType};

    fn sample_event() -> Event {
        Event::new(EventType::ServerStarted, "model-a started", EventSeverity::Info)
    }

    #[tokio::test]
    async fn publish_then_subscribe_receives_nothing() {
        let bus = EventBus::new();
        bus.publish(sample_event());
        let mut sub = bus.subscribe();
        // Subscription created after the publish: broadcast has no replay.
        let result = tokio::time::timeout(std::time::Duration::from_millis(20), sub.recv()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn subscribe_then_publish_delivers() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        bus.publish(sample_event());
        let event = sub.recv().await.expect("expected one event");
        assert_eq!(event.event_type, EventType::ServerStarted);
        assert_eq!(bus.metrics().published(), 1);
    }

    #[tokio::test]
    async fn lag_drops_oldest_and_recovers() {
        let bus = EventBus::with_capacity(2);
        let mut sub = bus.subscribe();
        for _ in 0..5 {
            bus.publish(sample_event());
        }
        let received = sub.recv().await.expect("subscriber should recover past the lag");
        assert_eq!(received.event_type, EventType::ServerStarted);
        assert!(bus.metrics().lag_events() >= 1);
        assert!(bus.metrics().dropped() > 0);
    }

    #[tokio::test]
    async fn subscriber_count_tracks_active_subscriptions() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        let sub_a = bus.subscribe();
        let sub_b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
        drop(sub_a);
        drop(sub_b);
    }
}

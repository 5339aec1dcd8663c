//! The broadcast hub: subscriber set plus bounded event history.
//!
//! All mutation goes through one lock. Subscribe, publish, relay and
//! unsubscribe each hold it for their whole duration, so a subscriber can
//! never miss an event that was published between its replay and its
//! registration, and concurrent publishes cannot interleave history writes.
//! Sinks must therefore be non-blocking.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use lanwatch_core::Event;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use crate::config::HubConfig;
use crate::sink::{Envelope, EventSink, Outbound};

/// Opaque subscriber identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returned by [`BroadcastHub::subscribe`]; used to unsubscribe or relay.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    id: SubscriberId,
}

impl SubscriberHandle {
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

/// Lifecycle of a subscriber as seen by the hub.
///
/// A handle only exists once the transport handshake is done, so the hub
/// never holds a subscriber that is still connecting. `Disconnected` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Connected,
    Disconnected,
}

/// What happened to one published message.
///
/// Informational only; publishing never fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Subscribers the message was handed to.
    pub delivered: usize,
    /// Subscribers removed because delivery failed.
    pub dropped: usize,
}

struct HubState {
    subscribers: HashMap<SubscriberId, Box<dyn EventSink>>,
    history: VecDeque<Arc<Envelope>>,
}

/// Fans events out to every connected subscriber.
///
/// Clone is cheap (inner Arc); clones share subscribers and history.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<Mutex<HubState>>,
    config: HubConfig,
}

impl BroadcastHub {
    pub fn new(config: HubConfig) -> Self {
        let history = VecDeque::with_capacity(config.history_capacity);
        Self {
            inner: Arc::new(Mutex::new(HubState {
                subscribers: HashMap::new(),
                history,
            })),
            config,
        }
    }

    /// Register `sink` and replay the most recent history to it.
    ///
    /// The replay is skipped when the history is empty. If the sink rejects
    /// the replay it is never registered and the handle is already
    /// disconnected.
    pub fn subscribe(&self, sink: Box<dyn EventSink>) -> SubscriberHandle {
        let handle = SubscriberHandle {
            id: SubscriberId(Uuid::new_v4()),
        };
        let mut state = self.inner.lock();

        let replay = state.replay(self.config.replay_limit);
        if !replay.is_empty() {
            if let Err(e) = sink.deliver(Outbound::History(replay)) {
                tracing::warn!(subscriber = %handle.id, error = %e, "History replay failed, not subscribing");
                return handle;
            }
        }

        state.subscribers.insert(handle.id, sink);
        tracing::debug!(subscriber = %handle.id, total = state.subscribers.len(), "Subscriber added");
        handle
    }

    /// Record `event` in history and deliver it to every subscriber.
    pub fn publish(&self, event: Event) -> PublishReceipt {
        tracing::debug!(kind = event.kind(), "Publishing event");
        self.broadcast(Arc::new(Envelope::Event(event)), None)
    }

    /// Pass a client message through to every other subscriber.
    ///
    /// The payload is recorded in history and otherwise left untouched.
    pub fn relay(&self, from: &SubscriberHandle, payload: Value) -> PublishReceipt {
        self.broadcast(Arc::new(Envelope::Relay(payload)), Some(from.id))
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&self, handle: &SubscriberHandle) -> bool {
        let mut state = self.inner.lock();
        let removed = state.subscribers.remove(&handle.id).is_some();
        if removed {
            tracing::debug!(subscriber = %handle.id, total = state.subscribers.len(), "Subscriber removed");
        }
        removed
    }

    pub fn state(&self, handle: &SubscriberHandle) -> SubscriberState {
        if self.inner.lock().subscribers.contains_key(&handle.id) {
            SubscriberState::Connected
        } else {
            SubscriberState::Disconnected
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// The replay window: what a subscriber joining now would receive.
    pub fn recent(&self) -> Vec<Arc<Envelope>> {
        self.inner.lock().replay(self.config.replay_limit)
    }

    /// The full retained history, oldest first.
    pub fn history(&self) -> Vec<Arc<Envelope>> {
        self.inner.lock().history.iter().cloned().collect()
    }

    fn broadcast(&self, envelope: Arc<Envelope>, skip: Option<SubscriberId>) -> PublishReceipt {
        let mut state = self.inner.lock();

        if self.config.history_capacity > 0 {
            while state.history.len() >= self.config.history_capacity {
                state.history.pop_front();
            }
            state.history.push_back(envelope.clone());
        }

        let mut receipt = PublishReceipt::default();
        let mut failed = Vec::new();
        for (id, sink) in &state.subscribers {
            if Some(*id) == skip {
                continue;
            }
            match sink.deliver(Outbound::Message(envelope.clone())) {
                Ok(()) => receipt.delivered += 1,
                Err(e) => {
                    tracing::warn!(subscriber = %id, error = %e, "Delivery failed, dropping subscriber");
                    failed.push(*id);
                }
            }
        }

        for id in failed {
            state.subscribers.remove(&id);
            receipt.dropped += 1;
        }
        receipt
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl HubState {
    fn replay(&self, limit: usize) -> Vec<Arc<Envelope>> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn event(n: usize) -> Event {
        let mut payload = Map::new();
        payload.insert("n".into(), json!(n));
        Event::new("tick", payload)
    }

    fn seq(envelope: &Envelope) -> u64 {
        match envelope {
            Envelope::Event(e) => e.get("n").and_then(Value::as_u64).unwrap(),
            Envelope::Relay(v) => v["n"].as_u64().unwrap(),
        }
    }

    fn subscriber(hub: &BroadcastHub) -> (SubscriberHandle, UnboundedReceiver<Outbound>) {
        let (tx, rx) = unbounded_channel();
        (hub.subscribe(Box::new(tx)), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<Outbound>) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push(message);
        }
        out
    }

    #[test]
    fn test_history_is_bounded() {
        let hub = BroadcastHub::default();
        for n in 0..150 {
            hub.publish(event(n));
        }

        let history = hub.history();
        assert_eq!(history.len(), 100);
        assert_eq!(seq(&history[0]), 50);
        assert_eq!(seq(&history[99]), 149);
    }

    #[test]
    fn test_late_subscriber_gets_last_ten_in_order() {
        let hub = BroadcastHub::default();
        for n in 0..25 {
            hub.publish(event(n));
        }

        let (_handle, mut rx) = subscriber(&hub);
        let received = drain(&mut rx);
        assert_eq!(received.len(), 1);
        match &received[0] {
            Outbound::History(messages) => {
                let order: Vec<u64> = messages.iter().map(|m| seq(m)).collect();
                assert_eq!(order, (15..25).collect::<Vec<u64>>());
            }
            other => panic!("expected history, got {other:?}"),
        }
    }

    #[test]
    fn test_no_history_message_when_empty() {
        let hub = BroadcastHub::default();
        let (_handle, mut rx) = subscriber(&hub);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_short_history_replays_everything() {
        let hub = BroadcastHub::default();
        for n in 0..3 {
            hub.publish(event(n));
        }
        assert_eq!(hub.recent().len(), 3);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = BroadcastHub::default();
        let receipt = hub.publish(event(1));
        assert_eq!(receipt, PublishReceipt::default());
        assert_eq!(hub.history().len(), 1);
    }

    #[test]
    fn test_broken_subscriber_does_not_affect_others() {
        let hub = BroadcastHub::default();
        let (a, rx_a) = subscriber(&hub);
        let (b, mut rx_b) = subscriber(&hub);
        drop(rx_a);

        let receipt = hub.publish(event(7));

        assert_eq!(receipt.delivered, 1);
        assert_eq!(receipt.dropped, 1);
        assert_eq!(hub.state(&a), SubscriberState::Disconnected);
        assert_eq!(hub.state(&b), SubscriberState::Connected);
        assert_eq!(hub.subscriber_count(), 1);

        let received = drain(&mut rx_b);
        assert_eq!(received.len(), 1);
        assert!(matches!(&received[0], Outbound::Message(m) if seq(m) == 7));
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let hub = BroadcastHub::default();
        let (handle, _rx) = subscriber(&hub);
        assert!(hub.unsubscribe(&handle));
        assert!(!hub.unsubscribe(&handle));
        assert_eq!(hub.state(&handle), SubscriberState::Disconnected);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribed_sink_receives_nothing() {
        let hub = BroadcastHub::default();
        let (handle, mut rx) = subscriber(&hub);
        hub.unsubscribe(&handle);
        hub.publish(event(1));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_relay_skips_sender_and_is_recorded() {
        let hub = BroadcastHub::default();
        let (a, mut rx_a) = subscriber(&hub);
        let (_b, mut rx_b) = subscriber(&hub);

        let payload = json!({"type": "note", "n": 3});
        let receipt = hub.relay(&a, payload.clone());

        assert_eq!(receipt.delivered, 1);
        assert!(drain(&mut rx_a).is_empty());
        let received = drain(&mut rx_b);
        assert_eq!(serde_json::to_value(&received[0]).unwrap(), payload);
        assert_eq!(hub.history().len(), 1);
    }

    #[test]
    fn test_per_subscriber_order_is_publish_order() {
        let hub = BroadcastHub::default();
        let (_handle, mut rx) = subscriber(&hub);
        for n in 0..50 {
            hub.publish(event(n));
        }

        let order: Vec<u64> = drain(&mut rx)
            .iter()
            .map(|m| match m {
                Outbound::Message(e) => seq(e),
                Outbound::History(_) => panic!("unexpected history"),
            })
            .collect();
        assert_eq!(order, (0..50).collect::<Vec<u64>>());
    }

    #[test]
    fn test_failed_replay_never_registers() {
        let hub = BroadcastHub::default();
        hub.publish(event(1));

        let (tx, rx) = unbounded_channel();
        drop(rx);
        let handle = hub.subscribe(Box::new(tx));

        assert_eq!(hub.state(&handle), SubscriberState::Disconnected);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_publishers_lose_nothing() {
        let hub = BroadcastHub::new(HubConfig {
            history_capacity: 1000,
            replay_limit: 10,
        });
        let (_handle, mut rx) = subscriber(&hub);

        let mut tasks = Vec::new();
        for worker in 0..8 {
            let hub = hub.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    hub.publish(event(worker * 100 + i));
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(hub.history().len(), 400);
        assert_eq!(drain(&mut rx).len(), 400);
    }
}

//! Outbound message framing and the subscriber sink seam.

use std::sync::Arc;

use lanwatch_core::Event;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::DeliveryError;

/// One entry of the hub history.
#[derive(Debug, Clone)]
pub enum Envelope {
    /// Published by a server-side producer.
    Event(Event),
    /// Sent by a client and passed through untouched.
    Relay(Value),
}

impl Envelope {
    /// The message's `type` tag, if it has one.
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Event(event) => Some(event.kind()),
            Self::Relay(value) => value.get("type").and_then(Value::as_str),
        }
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Event(event) => event.serialize(serializer),
            Self::Relay(value) => value.serialize(serializer),
        }
    }
}

/// A message handed to one subscriber.
#[derive(Debug, Clone)]
pub enum Outbound {
    Message(Arc<Envelope>),
    /// The join-time replay, framed as `{"type": "history", "messages": [...]}`.
    History(Vec<Arc<Envelope>>),
}

impl Serialize for Outbound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Message(envelope) => envelope.as_ref().serialize(serializer),
            Self::History(messages) => {
                let messages: Vec<&Envelope> = messages.iter().map(Arc::as_ref).collect();
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "history")?;
                map.serialize_entry("messages", &messages)?;
                map.end()
            }
        }
    }
}

/// Where the hub delivers messages for one subscriber.
///
/// `deliver` must not block; the hub calls it while holding its lock.
pub trait EventSink: Send + Sync {
    fn deliver(&self, message: Outbound) -> Result<(), DeliveryError>;
}

impl EventSink for UnboundedSender<Outbound> {
    fn deliver(&self, message: Outbound) -> Result<(), DeliveryError> {
        self.send(message).map_err(|_| DeliveryError::Closed)
    }
}

//! lanwatch-sync: live event fan-out to dashboard clients.
//!
//! [`BroadcastHub`] owns the subscriber set and a bounded event history.
//! Producers publish [`lanwatch_core::Event`]s; each subscriber is an
//! [`EventSink`] that receives every event in publish order, plus a short
//! history replay when it joins. The [`ws`] module attaches WebSocket
//! clients to a hub.

pub mod config;
pub mod error;
pub mod hub;
pub mod sink;
pub mod ws;

pub use config::HubConfig;
pub use error::{DeliveryError, SyncError};
pub use hub::{BroadcastHub, PublishReceipt, SubscriberHandle, SubscriberId, SubscriberState};
pub use sink::{Envelope, EventSink, Outbound};

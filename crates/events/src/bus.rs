//! Event publishing/subscription abstraction (mechanics only).
//!
//! This module provides the **event bus pattern**: a topic-based pub/sub
//! mechanism for distributing events from the order service to any number of
//! listeners.
//!
//! ## Design Philosophy
//!
//! The event bus is intentionally **lightweight** and makes minimal assumptions:
//!
//! - **Transport-agnostic**: Works with in-memory channels, Redis pub/sub, Kafka, etc.
//! - **Fire-and-forget**: `publish` never waits for consumers; it returns a
//!   [`Delivery`] the caller may await or drop
//! - **No ordering guarantees**: Events may arrive out of order
//! - **No persistence**: nothing is stored; a message published to a topic
//!   without subscribers is simply gone (for the in-memory and Redis buses)
//!
//! Consumers must tolerate duplicates: the same product id published twice is
//! two independent messages.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use thiserror::Error;

use crate::{Delivery, IntegrationEvent, Topic};

/// Transport-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Internal lock poisoning (in-memory bus).
    #[error("event bus state poisoned")]
    Poisoned,

    /// The transport refused or failed to carry a message.
    #[error("publish to `{topic}` failed: {reason}")]
    Publish { topic: Topic, reason: String },

    /// A subscription could not be established.
    #[error("subscribe to `{topic}` failed: {reason}")]
    Subscribe { topic: Topic, reason: String },

    /// The transport could not be reached or configured.
    #[error("event bus connection failed: {0}")]
    Connection(String),

    /// The outcome of a publish was lost.
    #[error("delivery closed: {0}")]
    Closed(String),
}

/// A subscription to a single topic.
///
/// Each subscription gets a copy of every message published to its topic
/// after it was created (broadcast semantics).
///
/// ## Usage Pattern
///
/// ```ignore
/// let bus: Arc<dyn EventBus<Vec<u8>>> = ...;
/// let subscription = bus.subscribe(&Topic::ORDER_CREATED)?;
///
/// loop {
///     match subscription.recv_timeout(Duration::from_millis(250)) {
///         Ok(payload) => process(payload)?,
///         Err(RecvTimeoutError::Timeout) => continue,  // Check for shutdown
///         Err(RecvTimeoutError::Disconnected) => break,  // Bus closed
///     }
/// }
/// ```
///
/// ## Thread Safety
///
/// Subscriptions are designed for single-threaded consumption. Each
/// subscription should be owned by one worker.
#[derive(Debug)]
pub struct Subscription<M> {
    topic: Topic,
    receiver: Receiver<M>,
    _alive: Option<Sender<()>>,
}

impl<M> Subscription<M> {
    pub fn new(topic: Topic, receiver: Receiver<M>) -> Self {
        Self {
            topic,
            receiver,
            _alive: None,
        }
    }

    /// Like [`Subscription::new`], plus a receiver that disconnects once the
    /// subscription is dropped.
    ///
    /// Producers that block on their transport poll it with `try_recv` to stop
    /// without waiting for the next message.
    pub fn with_drop_signal(topic: Topic, receiver: Receiver<M>) -> (Self, Receiver<()>) {
        let (alive_tx, alive_rx) = std::sync::mpsc::channel::<()>();
        (
            Self {
                topic,
                receiver,
                _alive: Some(alive_tx),
            },
            alive_rx,
        )
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Topic-based event bus (pub/sub abstraction).
///
/// ```text
/// POST /orders/{id} → OrderPublisher → EventBus (publish "order-created") → Listeners
///                                                                           └─ StockReservationListener
/// ```
///
/// ## Delivery
///
/// `publish` hands the message to the transport and returns a [`Delivery`]
/// immediately. Failures that are known synchronously (poisoned lock, closed
/// producer) resolve the delivery with an error instead of panicking or being
/// swallowed.
///
/// ## Thread Safety
///
/// The trait requires `Send + Sync`; multiple request handlers publish
/// concurrently through one shared bus.
pub trait EventBus<M>: Send + Sync {
    fn publish(&self, topic: &Topic, message: M) -> Delivery;

    fn subscribe(&self, topic: &Topic) -> Result<Subscription<M>, BusError>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    fn publish(&self, topic: &Topic, message: M) -> Delivery {
        (**self).publish(topic, message)
    }

    fn subscribe(&self, topic: &Topic) -> Result<Subscription<M>, BusError> {
        (**self).subscribe(topic)
    }
}

/// Typed publishing on top of a raw byte bus.
pub trait EventPublisher {
    /// Encode `event` and publish it to its topic.
    fn publish_event<Ev: IntegrationEvent>(&self, event: &Ev) -> Delivery;
}

impl<B> EventPublisher for B
where
    B: EventBus<Vec<u8>> + ?Sized,
{
    fn publish_event<Ev: IntegrationEvent>(&self, event: &Ev) -> Delivery {
        let topic = Ev::topic();
        tracing::debug!(topic = %topic, event = ?event, "publishing integration event");
        self.publish(&topic, event.encode())
    }
}

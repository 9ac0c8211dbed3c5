//! Publish outcome as a future.
//!
//! Every `EventBus::publish` returns a [`Delivery`]. The publish itself is
//! already underway (or finished) when the caller gets it back, so a caller
//! that only wants fire-and-forget semantics drops it (or calls
//! [`Delivery::detach`]). A caller that wants to know whether the broker took
//! the message awaits it.
//!
//! A delivery only reports hand-off to the transport. It never reports whether
//! any consumer processed the message.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use serde::Serialize;

use crate::{BusError, Topic};

/// Transport acknowledgement for a single published message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub topic: Topic,

    /// Broker partition (Kafka only).
    pub partition: Option<i32>,

    /// Broker offset (Kafka only).
    pub offset: Option<i64>,

    /// Number of subscribers that received a copy (in-memory and Redis).
    pub subscribers: Option<usize>,
}

impl DeliveryReceipt {
    /// Receipt for a fan-out transport that knows how many subscribers got the message.
    pub fn fanout(topic: Topic, subscribers: usize) -> Self {
        Self {
            topic,
            partition: None,
            offset: None,
            subscribers: Some(subscribers),
        }
    }

    /// Receipt for a log-based broker.
    pub fn broker(topic: Topic, partition: i32, offset: i64) -> Self {
        Self {
            topic,
            partition: Some(partition),
            offset: Some(offset),
            subscribers: None,
        }
    }
}

type DeliveryResult = Result<DeliveryReceipt, BusError>;

#[derive(Debug)]
enum State {
    Ready(Option<DeliveryResult>),
    Pending(oneshot::Receiver<DeliveryResult>),
}

/// Outcome of a publish. Resolves once the transport has accepted (or refused)
/// the message.
#[derive(Debug)]
pub struct Delivery {
    topic: Topic,
    state: State,
}

impl Delivery {
    /// A delivery whose outcome is already known (synchronous transports).
    pub fn ready(topic: Topic, result: DeliveryResult) -> Self {
        Self {
            topic,
            state: State::Ready(Some(result)),
        }
    }

    /// A delivery that failed before reaching the transport.
    pub fn failed(topic: Topic, error: BusError) -> Self {
        Self::ready(topic, Err(error))
    }

    /// A delivery completed later by whoever holds the returned promise.
    pub fn pending(topic: Topic) -> (DeliveryPromise, Self) {
        let (tx, rx) = oneshot::channel();
        (
            DeliveryPromise { tx },
            Self {
                topic,
                state: State::Pending(rx),
            },
        )
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Give up on the outcome. The publish still proceeds.
    pub fn detach(self) {}
}

impl Future for Delivery {
    type Output = DeliveryResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            State::Ready(result) => Poll::Ready(result.take().unwrap_or_else(|| {
                Err(BusError::Closed(format!(
                    "delivery for `{}` polled after completion",
                    this.topic
                )))
            })),
            State::Pending(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(BusError::Closed(format!(
                    "publisher for `{}` went away before reporting",
                    this.topic
                )))),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

/// Completion side of a pending [`Delivery`].
#[derive(Debug)]
pub struct DeliveryPromise {
    tx: oneshot::Sender<DeliveryResult>,
}

impl DeliveryPromise {
    /// Report the outcome. A no-op if the delivery was dropped.
    pub fn complete(self, result: DeliveryResult) {
        let _ = self.tx.send(result);
    }
}

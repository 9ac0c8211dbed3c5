//! In-memory event bus for tests/dev.

use std::collections::HashMap;
use std::sync::{Mutex, mpsc};

use crate::bus::{BusError, EventBus, Subscription};
use crate::{Delivery, DeliveryReceipt, Topic};

/// In-memory pub/sub bus.
///
/// - No IO / no async
/// - Best-effort fan-out per topic
/// - Messages published to a topic with no subscribers are dropped
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<HashMap<Topic, Vec<mpsc::Sender<M>>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live subscribers on `topic` (as of the last publish).
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.subscribers
            .lock()
            .map(|subs| subs.get(topic).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    fn publish(&self, topic: &Topic, message: M) -> Delivery {
        let mut subs = match self.subscribers.lock() {
            Ok(subs) => subs,
            Err(_) => return Delivery::failed(topic.clone(), BusError::Poisoned),
        };

        let delivered = match subs.get_mut(topic) {
            Some(senders) => {
                // Drop any dead subscribers while publishing.
                senders.retain(|tx| tx.send(message.clone()).is_ok());
                senders.len()
            }
            None => 0,
        };

        Delivery::ready(topic.clone(), Ok(DeliveryReceipt::fanout(topic.clone(), delivered)))
    }

    fn subscribe(&self, topic: &Topic) -> Result<Subscription<M>, BusError> {
        let (tx, rx) = mpsc::channel();

        let mut subs = self.subscribers.lock().map_err(|_| BusError::Poisoned)?;
        subs.entry(topic.clone()).or_default().push(tx);

        Ok(Subscription::new(topic.clone(), rx))
    }
}

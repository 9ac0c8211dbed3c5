//! Redis pub/sub-backed event bus (optional).
//!
//! Note: Redis pub/sub is not durable (messages are dropped if no subscriber
//! is connected). Each topic maps to a Redis channel of the same name and the
//! payload is published as-is.

use std::sync::mpsc::{self, TryRecvError};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use redis::Commands;

use raware_events::{
    BusError, Delivery, DeliveryPromise, DeliveryReceipt, EventBus, Subscription, Topic,
};

/// How often an idle subscriber thread checks whether its subscription is gone.
const SUBSCRIBER_POLL: Duration = Duration::from_millis(500);

struct Outgoing {
    topic: Topic,
    payload: Vec<u8>,
    promise: DeliveryPromise,
}

/// Redis pub/sub bus for raw payloads.
///
/// Publishing is handed to a dedicated thread that owns the connection, so a
/// request handler never blocks on Redis. Each subscription gets its own
/// connection and forwarding thread.
#[derive(Debug)]
pub struct RedisPubSubEventBus {
    client: redis::Client,
    outgoing: Mutex<mpsc::Sender<Outgoing>>,
}

impl RedisPubSubEventBus {
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, BusError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| BusError::Connection(e.to_string()))?;

        let (tx, rx) = mpsc::channel::<Outgoing>();
        let publisher_client = client.clone();
        thread::Builder::new()
            .name("redis-publisher".to_string())
            .spawn(move || publisher_loop(publisher_client, rx))
            .map_err(|e| BusError::Connection(format!("failed to spawn publisher: {e}")))?;

        Ok(Self {
            client,
            outgoing: Mutex::new(tx),
        })
    }
}

impl core::fmt::Debug for Outgoing {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Outgoing")
            .field("topic", &self.topic)
            .field("len", &self.payload.len())
            .finish()
    }
}

fn publisher_loop(client: redis::Client, rx: mpsc::Receiver<Outgoing>) {
    let mut conn: Option<redis::Connection> = None;

    // Ends when the bus (the only sender) is dropped.
    while let Ok(out) = rx.recv() {
        let result = publish_once(&client, &mut conn, &out.topic, &out.payload);
        if let Err(err) = &result {
            tracing::warn!(topic = %out.topic, error = %err, "redis publish failed");
        }
        out.promise.complete(result);
    }
}

fn publish_once(
    client: &redis::Client,
    conn: &mut Option<redis::Connection>,
    topic: &Topic,
    payload: &[u8],
) -> Result<DeliveryReceipt, BusError> {
    let publish_err = |reason: String| BusError::Publish {
        topic: topic.clone(),
        reason,
    };

    if conn.is_none() {
        *conn = Some(client.get_connection().map_err(|e| publish_err(e.to_string()))?);
    }
    let Some(c) = conn.as_mut() else {
        return Err(publish_err("no connection".to_string()));
    };

    match c.publish::<_, _, i64>(topic.as_str(), payload) {
        Ok(receivers) => Ok(DeliveryReceipt::fanout(
            topic.clone(),
            usize::try_from(receivers).unwrap_or(0),
        )),
        Err(e) => {
            // Reconnect on the next publish.
            *conn = None;
            Err(publish_err(e.to_string()))
        }
    }
}

impl EventBus<Vec<u8>> for RedisPubSubEventBus {
    fn publish(&self, topic: &Topic, message: Vec<u8>) -> Delivery {
        let (promise, delivery) = Delivery::pending(topic.clone());
        let out = Outgoing {
            topic: topic.clone(),
            payload: message,
            promise,
        };

        let sent = match self.outgoing.lock() {
            Ok(tx) => tx.send(out).map_err(|e| e.0),
            Err(_) => return Delivery::failed(topic.clone(), BusError::Poisoned),
        };

        match sent {
            Ok(()) => delivery,
            Err(out) => {
                out.promise.complete(Err(BusError::Closed("redis publisher stopped".to_string())));
                delivery
            }
        }
    }

    fn subscribe(&self, topic: &Topic) -> Result<Subscription<Vec<u8>>, BusError> {
        let subscribe_err = |reason: String| BusError::Subscribe {
            topic: topic.clone(),
            reason,
        };

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| subscribe_err(e.to_string()))?;

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let (tx, rx) = mpsc::channel();
        let (subscription, alive) = Subscription::with_drop_signal(topic.clone(), rx);
        let channel = topic.clone();

        // Background thread that receives pub/sub messages and forwards them.
        thread::Builder::new()
            .name(format!("redis-sub-{channel}"))
            .spawn(move || {
                let mut pubsub = conn.as_pubsub();
                let ready = pubsub
                    .subscribe(channel.as_str())
                    .and_then(|()| pubsub.set_read_timeout(Some(SUBSCRIBER_POLL)));
                if let Err(e) = ready {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                loop {
                    let msg = match pubsub.get_message() {
                        Ok(m) => m,
                        Err(e) if e.is_timeout() => {
                            if let Err(TryRecvError::Disconnected) = alive.try_recv() {
                                tracing::debug!(topic = %channel, "subscriber dropped; closing redis subscription");
                                return;
                            }
                            continue;
                        }
                        Err(e) => {
                            tracing::warn!(topic = %channel, error = %e, "redis subscription ended");
                            return;
                        }
                    };

                    let payload: Vec<u8> = match msg.get_payload() {
                        Ok(p) => p,
                        Err(e) => {
                            tracing::warn!(topic = %channel, error = %e, "unreadable redis payload");
                            continue;
                        }
                    };

                    if tx.send(payload).is_err() {
                        return;
                    }
                }
            })
            .map_err(|e| subscribe_err(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(subscription),
            Ok(Err(reason)) => Err(subscribe_err(reason)),
            Err(_) => Err(subscribe_err("subscriber thread exited".to_string())),
        }
    }
}

//! Explicit topic → listener table, built once at startup.
//!
//! ```ignore
//! let workers = Subscriptions::new()
//!     .on::<OrderCreated, _>("stock-reservation", StockReservationListener::new())
//!     .start(bus.as_ref())?;
//! // ...
//! workers.shutdown();
//! ```

use raware_events::{EventBus, EventListener, IntegrationEvent, Topic};

use crate::workers::{ListenerWorker, WorkerError, WorkerHandle};

type Starter = Box<dyn FnOnce(&dyn EventBus<Vec<u8>>) -> Result<WorkerHandle, WorkerError> + Send>;

struct Entry {
    name: String,
    topic: Topic,
    start: Starter,
}

/// Registration table mapping topics to listeners.
#[derive(Default)]
pub struct Subscriptions {
    entries: Vec<Entry>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `Ev`'s topic. One worker thread per entry.
    pub fn on<Ev, L>(mut self, name: impl Into<String>, listener: L) -> Self
    where
        Ev: IntegrationEvent,
        L: EventListener<Ev>,
    {
        let name = name.into();
        let worker_name = name.clone();
        self.entries.push(Entry {
            name,
            topic: Ev::topic(),
            start: Box::new(move |bus: &dyn EventBus<Vec<u8>>| {
                let sub = bus.subscribe(&Ev::topic())?;
                ListenerWorker::spawn::<Ev, L>(worker_name, sub, listener)
            }),
        });
        self
    }

    /// Registered (name, topic) pairs in registration order.
    pub fn routes(&self) -> Vec<(&str, &Topic)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), &e.topic))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subscribe every entry and spawn its worker.
    ///
    /// On error, workers already started are shut down before returning.
    pub fn start(self, bus: &dyn EventBus<Vec<u8>>) -> Result<Workers, WorkerError> {
        let mut started = Vec::with_capacity(self.entries.len());

        for entry in self.entries {
            match (entry.start)(bus) {
                Ok(handle) => {
                    tracing::info!(worker = %entry.name, topic = %entry.topic, "listener subscribed");
                    started.push(handle);
                }
                Err(err) => {
                    tracing::error!(worker = %entry.name, topic = %entry.topic, error = %err, "listener failed to start");
                    Workers(started).shutdown();
                    return Err(err);
                }
            }
        }

        Ok(Workers(started))
    }
}

impl core::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.routes()).finish()
    }
}

/// Running listener workers.
#[derive(Debug, Default)]
pub struct Workers(Vec<WorkerHandle>);

impl Workers {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(WorkerHandle::name).collect()
    }

    /// Stop and join every worker.
    pub fn shutdown(self) {
        for handle in self.0 {
            let name = handle.name().to_string();
            handle.shutdown();
            tracing::debug!(worker = %name, "listener worker joined");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use raware_events::{
        BusError, Delivery, InMemoryEventBus, OrderCreated, Subscription,
    };

    use super::*;

    #[derive(Clone, Default)]
    struct Count(Arc<Mutex<usize>>);

    impl EventListener<OrderCreated> for Count {
        type Error = std::convert::Infallible;

        fn on_event(&mut self, _event: OrderCreated) -> Result<(), Self::Error> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn table_lists_routes_in_order() {
        let subs = Subscriptions::new()
            .on::<OrderCreated, _>("a", Count::default())
            .on::<OrderCreated, _>("b", Count::default());

        let routes: Vec<_> = subs
            .routes()
            .into_iter()
            .map(|(n, t)| (n.to_string(), t.clone()))
            .collect();
        assert_eq!(
            routes,
            vec![
                ("a".to_string(), Topic::ORDER_CREATED),
                ("b".to_string(), Topic::ORDER_CREATED)
            ]
        );
    }

    #[test]
    fn every_registered_listener_gets_its_own_copy() {
        let bus: Arc<InMemoryEventBus<Vec<u8>>> = Arc::new(InMemoryEventBus::new());
        let (a, b) = (Count::default(), Count::default());

        let workers = Subscriptions::new()
            .on::<OrderCreated, _>("a", a.clone())
            .on::<OrderCreated, _>("b", b.clone())
            .start(bus.as_ref())
            .unwrap();
        assert_eq!(workers.names(), vec!["a", "b"]);

        bus.publish(&Topic::ORDER_CREATED, b"sku-1".to_vec()).detach();

        let deadline = Instant::now() + Duration::from_secs(2);
        while (*a.0.lock().unwrap() < 1 || *b.0.lock().unwrap() < 1) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(*a.0.lock().unwrap(), 1);
        assert_eq!(*b.0.lock().unwrap(), 1);

        workers.shutdown();
    }

    struct NoSubscriptions;

    impl EventBus<Vec<u8>> for NoSubscriptions {
        fn publish(&self, topic: &Topic, _message: Vec<u8>) -> Delivery {
            Delivery::failed(topic.clone(), BusError::Connection("down".into()))
        }

        fn subscribe(&self, topic: &Topic) -> Result<Subscription<Vec<u8>>, BusError> {
            Err(BusError::Subscribe {
                topic: topic.clone(),
                reason: "down".into(),
            })
        }
    }

    #[test]
    fn subscribe_failure_is_reported() {
        let err = Subscriptions::new()
            .on::<OrderCreated, _>("a", Count::default())
            .start(&NoSubscriptions)
            .unwrap_err();
        assert!(matches!(err, WorkerError::Subscribe(BusError::Subscribe { .. })));
    }
}

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use raware_events::{BusError, EventListener, IntegrationEvent, Subscription};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Subscribe(#[from] BusError),

    #[error("failed to spawn worker `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    name: String,
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the worker loop has returned (bus closed or shutdown).
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(thread::JoinHandle::is_finished)
    }

    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            if j.join().is_err() {
                warn!(worker = %self.name, "listener worker panicked");
            }
        }
    }
}

/// Generic listener worker loop.
///
/// - Owns one topic subscription
/// - Decodes each payload into `Ev` and hands it to the listener
/// - Logs and skips payloads that fail to decode and listener errors
/// - Supports graceful shutdown
#[derive(Debug)]
pub struct ListenerWorker;

impl ListenerWorker {
    /// Spawn a worker thread that feeds `listener` from `subscription`.
    pub fn spawn<Ev, L>(
        name: impl Into<String>,
        subscription: Subscription<Vec<u8>>,
        mut listener: L,
    ) -> Result<WorkerHandle, WorkerError>
    where
        Ev: IntegrationEvent,
        L: EventListener<Ev>,
    {
        let name = name.into();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_name = name.clone();
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                worker_loop::<Ev, L>(&thread_name, subscription, shutdown_rx, &mut listener)
            })
            .map_err(|source| WorkerError::Spawn {
                name: name.clone(),
                source,
            })?;

        Ok(WorkerHandle {
            name,
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<Ev, L>(
    name: &str,
    sub: Subscription<Vec<u8>>,
    shutdown_rx: mpsc::Receiver<()>,
    listener: &mut L,
) where
    Ev: IntegrationEvent,
    L: EventListener<Ev>,
{
    let tick = Duration::from_millis(250);
    debug!(worker = name, topic = %sub.topic(), "listener worker started");

    loop {
        // Shutdown check (non-blocking)
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(payload) => {
                let event = match Ev::decode(&payload) {
                    Ok(ev) => ev,
                    Err(err) => {
                        warn!(worker = name, error = %err, "dropping undecodable message");
                        continue;
                    }
                };

                if let Err(err) = listener.on_event(event) {
                    warn!(worker = name, error = ?err, "listener failed");
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker = name, "listener worker stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use raware_events::{EventBus, InMemoryEventBus, OrderCreated, Topic};

    use super::*;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn seen(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl EventListener<OrderCreated> for Recorder {
        type Error = String;

        fn on_event(&mut self, event: OrderCreated) -> Result<(), Self::Error> {
            let id = event.product_id.into_inner();
            let fail = id == "boom";
            self.0.lock().unwrap().push(id);
            if fail { Err("boom".to_string()) } else { Ok(()) }
        }
    }

    fn wait_for(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !cond() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn spawn(bus: &Arc<InMemoryEventBus<Vec<u8>>>, recorder: Recorder) -> WorkerHandle {
        let sub = bus.subscribe(&Topic::ORDER_CREATED).unwrap();
        ListenerWorker::spawn::<OrderCreated, _>("test-listener", sub, recorder).unwrap()
    }

    #[test]
    fn published_payload_is_observed_exactly_once() {
        let bus: Arc<InMemoryEventBus<Vec<u8>>> = Arc::new(InMemoryEventBus::new());
        let recorder = Recorder::default();
        let worker = spawn(&bus, recorder.clone());

        bus.publish(&Topic::ORDER_CREATED, b"sku-1".to_vec()).detach();

        wait_for(|| !recorder.seen().is_empty());
        thread::sleep(Duration::from_millis(20));
        assert_eq!(recorder.seen(), vec!["sku-1".to_string()]);
        worker.shutdown();
    }

    #[test]
    fn bad_payloads_and_listener_errors_do_not_stop_the_loop() {
        let bus: Arc<InMemoryEventBus<Vec<u8>>> = Arc::new(InMemoryEventBus::new());
        let recorder = Recorder::default();
        let worker = spawn(&bus, recorder.clone());

        bus.publish(&Topic::ORDER_CREATED, vec![0xff, 0xfe]).detach();
        bus.publish(&Topic::ORDER_CREATED, b"boom".to_vec()).detach();
        bus.publish(&Topic::ORDER_CREATED, b"sku-2".to_vec()).detach();

        wait_for(|| recorder.seen().len() == 2);
        assert_eq!(recorder.seen(), vec!["boom".to_string(), "sku-2".to_string()]);
        assert!(!worker.is_finished());
        worker.shutdown();
    }

    #[test]
    fn worker_stops_when_bus_goes_away() {
        let bus: Arc<InMemoryEventBus<Vec<u8>>> = Arc::new(InMemoryEventBus::new());
        let worker = spawn(&bus, Recorder::default());

        drop(bus);

        wait_for(|| worker.is_finished());
        assert!(worker.is_finished());
        worker.shutdown();
    }
}

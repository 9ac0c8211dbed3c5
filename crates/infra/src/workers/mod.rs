//! Background consumers.

pub mod listener_worker;

pub use listener_worker::{ListenerWorker, WorkerError, WorkerHandle};

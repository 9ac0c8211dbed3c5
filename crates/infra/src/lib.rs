//! Infrastructure layer: configuration, brokers, background workers.

pub mod config;
pub mod event_bus;
pub mod subscriptions;
pub mod workers;

pub use config::{AppConfig, BusBackend, BusConfig, Components, ConfigError};
pub use event_bus::SharedBus;
pub use subscriptions::{Subscriptions, Workers};

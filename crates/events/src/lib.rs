//! Integration events and the pub/sub mechanics that carry them.
//!
//! - `topic`: named channels (`order-created`)
//! - `event`: typed events and their raw wire form
//! - `bus`: the transport-agnostic `EventBus` contract and subscriptions
//! - `delivery`: the future returned by every publish
//! - `in_memory_bus`: single-process bus for tests/dev
//! - `listener`: consumer-side handler abstraction

pub mod bus;
pub mod delivery;
pub mod event;
pub mod in_memory_bus;
pub mod listener;
pub mod topic;

pub use bus::{BusError, EventBus, EventPublisher, Subscription};
pub use delivery::{Delivery, DeliveryPromise, DeliveryReceipt};
pub use event::{DecodeError, IntegrationEvent, OrderCreated};
pub use in_memory_bus::InMemoryEventBus;
pub use listener::EventListener;
pub use topic::Topic;

//! Order acceptance (publish side).
//!
//! Accepting an order means publishing `OrderCreated` to `order-created` and
//! acknowledging the caller. There is no order state and no validation of the
//! product id.

pub mod publisher;

pub use publisher::{ORDER_CREATED_ACK, OrderAccepted, OrderPublisher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use raware_core::ProductId;

use crate::Topic;

/// An event meant for consumers in other services (carried by a broker).
///
/// Integration events are:
/// - **immutable** (treat them as facts)
/// - bound to exactly one **topic**
/// - encoded to a raw byte payload with no envelope and no headers
pub trait IntegrationEvent: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Topic this event type is published to.
    fn topic() -> Topic;

    /// Encode to the wire payload.
    fn encode(&self) -> Vec<u8>;

    /// Decode from a wire payload.
    fn decode(payload: &[u8]) -> Result<Self, DecodeError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to decode `{topic}` payload: {reason}")]
pub struct DecodeError {
    pub topic: Topic,
    pub reason: String,
}

/// An order was accepted for a product.
///
/// Published once per order request. Carries no identity or dedup key: the
/// same product ordered twice yields two independent events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub product_id: ProductId,
}

impl OrderCreated {
    pub fn new(product_id: impl Into<ProductId>) -> Self {
        Self {
            product_id: product_id.into(),
        }
    }
}

impl IntegrationEvent for OrderCreated {
    fn topic() -> Topic {
        Topic::ORDER_CREATED
    }

    /// Payload is the product id itself, UTF-8, unframed.
    fn encode(&self) -> Vec<u8> {
        self.product_id.as_bytes().to_vec()
    }

    fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let product_id = ProductId::from_utf8(payload).map_err(|e| DecodeError {
            topic: Self::topic(),
            reason: e.to_string(),
        })?;
        Ok(Self { product_id })
    }
}

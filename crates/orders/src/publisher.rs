use raware_core::ProductId;
use raware_events::{Delivery, EventBus, EventPublisher, OrderCreated};

/// Acknowledgement returned for every accepted order.
pub const ORDER_CREATED_ACK: &str = "ORDER_CREATED";

/// Result of accepting an order.
///
/// `ack` is always [`ORDER_CREATED_ACK`]. `delivery` reports whether the bus
/// took the event; callers that only need the acknowledgement drop it.
#[derive(Debug)]
pub struct OrderAccepted {
    pub ack: &'static str,
    pub product_id: ProductId,
    pub delivery: Delivery,
}

/// Publishes one `OrderCreated` per accepted order.
#[derive(Debug, Clone)]
pub struct OrderPublisher<B> {
    bus: B,
}

impl<B> OrderPublisher<B>
where
    B: EventBus<Vec<u8>>,
{
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Accept an order for `product_id`.
    ///
    /// Never blocks on consumers and never fails: a publish failure shows up
    /// only in the returned delivery.
    pub fn create_order(&self, product_id: impl Into<ProductId>) -> OrderAccepted {
        let product_id = product_id.into();
        let event = OrderCreated {
            product_id: product_id.clone(),
        };
        let delivery = self.bus.publish_event(&event);

        tracing::info!(product_id = %product_id, "order accepted");

        OrderAccepted {
            ack: ORDER_CREATED_ACK,
            product_id,
            delivery,
        }
    }
}

use std::convert::Infallible;
use std::sync::Arc;

use chrono::Utc;

use raware_events::{EventListener, OrderCreated};

use crate::{Reservation, ReservationJournal};

/// Reserves stock for every product id seen on `order-created`.
///
/// "Reserving" is a log line plus an optional journal entry. Nothing is
/// acknowledged back to the order flow, and two in-flight messages for the
/// same product are not serialized against each other.
#[derive(Clone, Default)]
pub struct StockReservationListener {
    journal: Option<Arc<dyn ReservationJournal>>,
}

impl StockReservationListener {
    /// Logging-only listener.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Arc<dyn ReservationJournal>) -> Self {
        Self {
            journal: Some(journal),
        }
    }
}

impl core::fmt::Debug for StockReservationListener {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StockReservationListener")
            .field("journal", &self.journal.is_some())
            .finish()
    }
}

impl EventListener<OrderCreated> for StockReservationListener {
    type Error = Infallible;

    fn on_event(&mut self, event: OrderCreated) -> Result<(), Self::Error> {
        tracing::info!(
            product_id = %event.product_id,
            "Reserving stock for product {}",
            event.product_id
        );

        if let Some(journal) = &self.journal {
            journal.record(Reservation {
                product_id: event.product_id,
                received_at: Utc::now(),
            });
        }

        Ok(())
    }
}

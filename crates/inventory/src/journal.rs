use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use raware_core::ProductId;

/// A stock reservation made in response to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub product_id: ProductId,
    pub received_at: DateTime<Utc>,
}

/// Sink for reservations made by the listener.
pub trait ReservationJournal: Send + Sync {
    fn record(&self, reservation: Reservation);
}

impl<J> ReservationJournal for Arc<J>
where
    J: ReservationJournal + ?Sized,
{
    fn record(&self, reservation: Reservation) {
        (**self).record(reservation)
    }
}

/// In-memory journal for tests/dev. Append-only, unbounded.
#[derive(Debug, Default)]
pub struct InMemoryReservationJournal {
    inner: RwLock<Vec<Reservation>>,
}

impl InMemoryReservationJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reservations in arrival order.
    pub fn all(&self) -> Vec<Reservation> {
        match self.inner.read() {
            Ok(v) => v.clone(),
            Err(_) => vec![],
        }
    }

    pub fn count_for(&self, product_id: &ProductId) -> usize {
        match self.inner.read() {
            Ok(v) => v.iter().filter(|r| &r.product_id == product_id).count(),
            Err(_) => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReservationJournal for InMemoryReservationJournal {
    fn record(&self, reservation: Reservation) {
        if let Ok(mut v) = self.inner.write() {
            v.push(reservation);
        }
    }
}

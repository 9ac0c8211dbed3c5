//! Inventory side of order notifications (consume path).
//!
//! The stock reservation listener reacts to `order-created` messages. It keeps
//! no state of its own; reservations are logged and optionally recorded into
//! a journal so they can be observed.

pub mod journal;
pub mod reservation;

pub use journal::{InMemoryReservationJournal, Reservation, ReservationJournal};
pub use reservation::StockReservationListener;

//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: token issuer and order publisher shared by handlers
//! - `routes/`: HTTP routes + handlers (one file per component)
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use raware_events::OrderCreated;
use raware_infra::{AppConfig, ConfigError, SharedBus, Subscriptions};
use raware_inventory::{ReservationJournal, StockReservationListener};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the HTTP router for the components enabled in `config`.
pub fn build_app(config: &AppConfig, bus: SharedBus) -> Result<Router, ConfigError> {
    let services = Arc::new(AppServices::new(config, bus)?);

    Ok(routes::router(config.components)
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http())))
}

/// Listener table for the inventory component.
///
/// With a journal, every reservation is also recorded there.
pub fn inventory_subscriptions(journal: Option<Arc<dyn ReservationJournal>>) -> Subscriptions {
    let listener = match journal {
        Some(journal) => StockReservationListener::with_journal(journal),
        None => StockReservationListener::new(),
    };
    Subscriptions::new().on::<OrderCreated, _>("stock-reservation", listener)
}

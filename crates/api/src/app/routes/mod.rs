use axum::{Router, routing::get};

use raware_infra::Components;

pub mod auth;
pub mod orders;
pub mod system;

/// Route table. Each component's routes are mounted only if it is enabled.
pub fn router(components: Components) -> Router {
    let mut router = Router::new().route("/health", get(system::health));

    if components.auth {
        router = router.nest("/auth", auth::router());
    }
    if components.orders {
        router = router.nest("/orders", orders::router());
    }

    router
}

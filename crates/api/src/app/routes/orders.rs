use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use raware_orders::OrderAccepted;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/:product_id", post(create_order))
}

/// Accept an order and publish `order-created`.
///
/// Responds `ORDER_CREATED` as plain text. Unless delivery awaiting is
/// configured, the response does not wait for the bus; a failed publish is
/// logged from a background task.
pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    let OrderAccepted {
        ack,
        product_id,
        delivery,
    } = services.orders.create_order(product_id);

    if services.await_delivery {
        if let Err(e) = delivery.await {
            tracing::warn!(product_id = %product_id, error = %e, "order event not delivered");
            return errors::bus_error_to_response(e);
        }
    } else {
        tokio::spawn(async move {
            match delivery.await {
                Ok(receipt) => {
                    tracing::debug!(product_id = %product_id, receipt = ?receipt, "order event delivered");
                }
                Err(e) => {
                    tracing::warn!(product_id = %product_id, error = %e, "order event not delivered");
                }
            }
        });
    }

    (StatusCode::OK, ack).into_response()
}

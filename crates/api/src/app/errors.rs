use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use raware_auth::TokenError;
use raware_events::BusError;

pub fn token_error_to_response(err: TokenError) -> axum::response::Response {
    tracing::error!(error = %err, "token issuance failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", err.to_string())
}

pub fn bus_error_to_response(err: BusError) -> axum::response::Response {
    match err {
        BusError::Poisoned => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "bus_error",
            "event bus unavailable",
        ),
        other => json_error(StatusCode::BAD_GATEWAY, "publish_error", other.to_string()),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

use std::sync::Arc;

use axum::{Json, Router, extract::Extension, response::IntoResponse, routing::post};

use crate::app::dto::LoginResponse;
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/login", post(login))
}

/// Mint a token. No credentials are checked and the request body is ignored.
pub async fn login(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.issuer.issue() {
        Ok(credential) => Json(LoginResponse {
            token: credential.into_token(),
        })
        .into_response(),
        Err(e) => errors::token_error_to_response(e),
    }
}

//! Request/response bodies.

use serde::{Deserialize, Serialize};

/// `POST /auth/login` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

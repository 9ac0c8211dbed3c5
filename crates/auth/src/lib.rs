//! `raware-auth`: token issuance and verification.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod claims;
pub mod issuer;
pub mod validator;

pub use claims::{Claims, TokenError, TokenValidationError, validate_claims};
pub use issuer::{Credential, IssuerConfig, TokenIssuer};
pub use validator::{Hs256JwtValidator, JwtValidator};

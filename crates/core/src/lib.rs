//! `raware-core`: shared building blocks for the order notification services.
//!
//! This crate contains **pure** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::ProductId;

//! Service wiring shared by every request handler.

use raware_auth::{IssuerConfig, TokenIssuer};
use raware_infra::{AppConfig, ConfigError, SharedBus};
use raware_orders::OrderPublisher;

/// Everything the HTTP handlers need. Built once at startup.
pub struct AppServices {
    pub issuer: TokenIssuer,
    pub orders: OrderPublisher<SharedBus>,
    /// Await the bus before acknowledging an order.
    pub await_delivery: bool,
}

impl AppServices {
    pub fn new(config: &AppConfig, bus: SharedBus) -> Result<Self, ConfigError> {
        let ttl = chrono::Duration::from_std(config.token_ttl).map_err(|e| ConfigError::Invalid {
            var: "RAWARE_TOKEN_TTL_SECS",
            value: config.token_ttl.as_secs().to_string(),
            reason: e.to_string(),
        })?;

        let issuer = TokenIssuer::new(
            IssuerConfig::new(config.jwt_secret.as_bytes())
                .with_subject(config.token_subject.clone())
                .with_ttl(ttl),
        );

        Ok(Self {
            issuer,
            orders: OrderPublisher::new(bus),
            await_delivery: config.await_delivery,
        })
    }
}

//! Process configuration loaded from environment variables.
//!
//! Every setting has a development default so `cargo run` works with no
//! environment at all. Defaults that are unsafe outside development (the
//! signing secret) are logged at `warn` when used.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEV_JWT_SECRET: &str = "dev-secret";
pub const DEFAULT_TOKEN_SUBJECT: &str = "user";
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
/// Ten years.
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 3600;
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";
pub const DEFAULT_KAFKA_BROKERS: &str = "localhost:9092";
pub const DEFAULT_CONSUMER_GROUP: &str = "inventory-service";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value `{value}`: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var}=`{value}` requires the `{feature}` cargo feature")]
    FeatureDisabled {
        var: &'static str,
        value: String,
        feature: &'static str,
    },
}

/// Transport carrying `order-created`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BusBackend {
    /// Single-process channels. Publisher and listener must share a process.
    Memory,
    Redis,
    Kafka,
}

impl FromStr for BusBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            "kafka" => Ok(Self::Kafka),
            other => Err(format!("unknown bus `{other}` (expected memory, redis or kafka)")),
        }
    }
}

/// Which of the three services this process runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Components {
    pub auth: bool,
    pub orders: bool,
    pub inventory: bool,
}

impl Components {
    pub fn all() -> Self {
        Self {
            auth: true,
            orders: true,
            inventory: true,
        }
    }

    /// True when an HTTP listener is needed.
    pub fn serves_http(&self) -> bool {
        self.auth || self.orders
    }
}

impl FromStr for Components {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = Self {
            auth: false,
            orders: false,
            inventory: false,
        };
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_lowercase().as_str() {
                "auth" => out.auth = true,
                "orders" | "order" => out.orders = true,
                "inventory" => out.inventory = true,
                other => return Err(format!("unknown component `{other}`")),
            }
        }
        if !(out.auth || out.orders || out.inventory) {
            return Err("at least one component is required".to_string());
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    pub backend: BusBackend,
    pub redis_url: String,
    pub kafka_brokers: String,
    pub kafka_consumer_group: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_subject: String,
    pub token_ttl: Duration,
    pub bus: BusConfig,
    pub components: Components,
    /// Wait for the bus to accept an order event before acknowledging.
    pub await_delivery: bool,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("token_subject", &self.token_subject)
            .field("token_ttl", &self.token_ttl)
            .field("bus", &self.bus)
            .field("components", &self.components)
            .field("await_delivery", &self.await_delivery)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_subject: DEFAULT_TOKEN_SUBJECT.to_string(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            bus: BusConfig {
                backend: BusBackend::Memory,
                redis_url: DEFAULT_REDIS_URL.to_string(),
                kafka_brokers: DEFAULT_KAFKA_BROKERS.to_string(),
                kafka_consumer_group: DEFAULT_CONSUMER_GROUP.to_string(),
            },
            components: Components::all(),
            await_delivery: false,
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let bind_addr = parse_or("RAWARE_BIND_ADDR", &lookup, DEFAULT_BIND_ADDR)?;
        let token_subject =
            lookup("RAWARE_TOKEN_SUBJECT").unwrap_or_else(|| DEFAULT_TOKEN_SUBJECT.to_string());

        let ttl_secs: u64 = parse_or("RAWARE_TOKEN_TTL_SECS", &lookup, "3600")?;
        if ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "RAWARE_TOKEN_TTL_SECS",
                value: ttl_secs.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid {
                var: "RAWARE_TOKEN_TTL_SECS",
                value: ttl_secs.to_string(),
                reason: format!("must be at most {MAX_TOKEN_TTL_SECS}"),
            });
        }

        let backend: BusBackend = parse_or("RAWARE_BUS", &lookup, "memory")?;
        ensure_compiled(backend)?;

        let components: Components =
            parse_or("RAWARE_COMPONENTS", &lookup, "auth,orders,inventory")?;
        let await_delivery: bool = parse_or("RAWARE_AWAIT_DELIVERY", &lookup, "false")?;

        Ok(Self {
            bind_addr,
            jwt_secret,
            token_subject,
            token_ttl: Duration::from_secs(ttl_secs),
            bus: BusConfig {
                backend,
                redis_url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
                kafka_brokers: lookup("KAFKA_BROKERS")
                    .unwrap_or_else(|| DEFAULT_KAFKA_BROKERS.to_string()),
                kafka_consumer_group: lookup("KAFKA_CONSUMER_GROUP")
                    .unwrap_or_else(|| DEFAULT_CONSUMER_GROUP.to_string()),
            },
            components,
            await_delivery,
        })
    }
}

fn parse_or<T>(
    var: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    let value = lookup(var).unwrap_or_else(|| default.to_string());
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.clone(),
        reason: e.to_string(),
    })
}

fn ensure_compiled(backend: BusBackend) -> Result<(), ConfigError> {
    let missing = match backend {
        BusBackend::Memory => None,
        BusBackend::Redis if !cfg!(feature = "redis") => Some(("redis", "redis")),
        BusBackend::Kafka if !cfg!(feature = "kafka") => Some(("kafka", "kafka")),
        _ => None,
    };
    match missing {
        Some((value, feature)) => Err(ConfigError::FeatureDisabled {
            var: "RAWARE_BUS",
            value: value.to_string(),
            feature,
        }),
        None => Ok(()),
    }
}

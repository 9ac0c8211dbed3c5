//! Infrastructure event bus implementations.
//!
//! The event bus abstraction lives in `raware-events` as pure mechanics.
//! This module provides broker-backed implementations and picks one from
//! configuration.

use std::sync::Arc;

use raware_events::{BusError, EventBus, InMemoryEventBus};

use crate::config::{BusBackend, BusConfig};

#[cfg(feature = "kafka")]
pub mod kafka;
#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "kafka")]
pub use kafka::{KafkaEventBus, KafkaEventBusBuilder};
#[cfg(feature = "redis")]
pub use redis_pubsub::RedisPubSubEventBus;

/// Shared handle to whichever bus the process was configured with.
pub type SharedBus = Arc<dyn EventBus<Vec<u8>>>;

/// Build the configured bus.
///
/// Broker-backed buses must be built from inside a tokio runtime (the Kafka
/// bus drives its producer and consumers as tasks on it).
pub fn connect(config: &BusConfig) -> Result<SharedBus, BusError> {
    match config.backend {
        BusBackend::Memory => {
            tracing::info!(bus = "memory", "using in-memory event bus");
            Ok(Arc::new(InMemoryEventBus::<Vec<u8>>::new()))
        }
        BusBackend::Redis => connect_redis(config),
        BusBackend::Kafka => connect_kafka(config),
    }
}

#[cfg(feature = "redis")]
fn connect_redis(config: &BusConfig) -> Result<SharedBus, BusError> {
    tracing::info!(bus = "redis", url = %config.redis_url, "using redis pub/sub event bus");
    Ok(Arc::new(RedisPubSubEventBus::new(&config.redis_url)?))
}

#[cfg(not(feature = "redis"))]
fn connect_redis(_config: &BusConfig) -> Result<SharedBus, BusError> {
    Err(BusError::Connection(
        "built without the `redis` feature".to_string(),
    ))
}

#[cfg(feature = "kafka")]
fn connect_kafka(config: &BusConfig) -> Result<SharedBus, BusError> {
    let bus = KafkaEventBus::builder()
        .brokers(config.kafka_brokers.clone())
        .consumer_group(config.kafka_consumer_group.clone())
        .build()?;
    Ok(Arc::new(bus))
}

#[cfg(not(feature = "kafka"))]
fn connect_kafka(_config: &BusConfig) -> Result<SharedBus, BusError> {
    Err(BusError::Connection(
        "built without the `kafka` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use raware_events::Topic;

    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn default_config_connects_to_memory_bus() {
        let bus = connect(&AppConfig::default().bus).unwrap();
        let sub = bus.subscribe(&Topic::ORDER_CREATED).unwrap();

        let receipt = block_on(bus.publish(&Topic::ORDER_CREATED, b"sku-1".to_vec())).unwrap();

        assert_eq!(receipt.subscribers, Some(1));
        assert_eq!(sub.try_recv().unwrap(), b"sku-1".to_vec());
    }
}

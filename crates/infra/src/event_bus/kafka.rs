//! Kafka-backed event bus (optional, via rdkafka).
//!
//! Works with any Kafka-compatible broker (Apache Kafka, Redpanda, MSK).
//! Each topic maps to the Kafka topic of the same name. Messages carry the raw
//! payload with no key and no headers, so there is no ordering guarantee
//! across partitions.
//!
//! Offsets are committed after a message has been handed to the subscriber's
//! channel. A crash between hand-off and commit redelivers the message.

use std::sync::mpsc;
use std::time::Duration;

use futures::StreamExt;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tokio::runtime::Handle;

use raware_events::{BusError, Delivery, DeliveryReceipt, EventBus, Subscription, Topic};

/// Kafka event bus.
///
/// Producer sends and consumer loops run as tasks on the tokio runtime that
/// was current when the bus was built.
pub struct KafkaEventBus {
    producer: FutureProducer,
    runtime: Handle,
    brokers: String,
    timeout: Duration,
    consumer_group: String,
    auto_offset_reset: String,
}

impl KafkaEventBus {
    #[must_use]
    pub fn builder() -> KafkaEventBusBuilder {
        KafkaEventBusBuilder::default()
    }

    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }

    #[must_use]
    pub fn consumer_group(&self) -> &str {
        &self.consumer_group
    }
}

impl core::fmt::Debug for KafkaEventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KafkaEventBus")
            .field("brokers", &self.brokers)
            .field("timeout", &self.timeout)
            .field("consumer_group", &self.consumer_group)
            .field("auto_offset_reset", &self.auto_offset_reset)
            .finish_non_exhaustive()
    }
}

/// Builder for [`KafkaEventBus`].
#[derive(Debug, Default)]
pub struct KafkaEventBusBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    timeout: Option<Duration>,
    consumer_group: Option<String>,
    auto_offset_reset: Option<String>,
}

impl KafkaEventBusBuilder {
    /// Comma-separated bootstrap servers (e.g. "localhost:9092").
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// "0", "1" (default) or "all".
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Producer send timeout. Default: 5 seconds.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Consumer group shared by every subscription made through this bus.
    #[must_use]
    pub fn consumer_group(mut self, consumer_group: impl Into<String>) -> Self {
        self.consumer_group = Some(consumer_group.into());
        self
    }

    /// Where a new consumer group starts: "earliest" or "latest" (default).
    #[must_use]
    pub fn auto_offset_reset(mut self, policy: impl Into<String>) -> Self {
        self.auto_offset_reset = Some(policy.into());
        self
    }

    /// Build the bus. Must be called from inside a tokio runtime.
    pub fn build(self) -> Result<KafkaEventBus, BusError> {
        let brokers = self
            .brokers
            .ok_or_else(|| BusError::Connection("brokers not configured".to_string()))?;

        let runtime = Handle::try_current()
            .map_err(|e| BusError::Connection(format!("no tokio runtime: {e}")))?;

        let acks = self.producer_acks.unwrap_or_else(|| "1".to_string());
        let timeout = self.timeout.unwrap_or(Duration::from_secs(5));

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", timeout.as_millis().to_string())
            .set("acks", &acks)
            .create()
            .map_err(|e| BusError::Connection(format!("failed to create producer: {e}")))?;

        let consumer_group = self
            .consumer_group
            .unwrap_or_else(|| crate::config::DEFAULT_CONSUMER_GROUP.to_string());
        let auto_offset_reset = self.auto_offset_reset.unwrap_or_else(|| "latest".to_string());

        tracing::info!(
            brokers = %brokers,
            acks = %acks,
            consumer_group = %consumer_group,
            auto_offset_reset = %auto_offset_reset,
            "kafka event bus created"
        );

        Ok(KafkaEventBus {
            producer,
            runtime,
            brokers,
            timeout,
            consumer_group,
            auto_offset_reset,
        })
    }
}

impl EventBus<Vec<u8>> for KafkaEventBus {
    fn publish(&self, topic: &Topic, message: Vec<u8>) -> Delivery {
        let (promise, delivery) = Delivery::pending(topic.clone());
        let producer = self.producer.clone();
        let timeout = self.timeout;
        let topic = topic.clone();

        self.runtime.spawn(async move {
            let record = FutureRecord::<(), Vec<u8>>::to(topic.as_str()).payload(&message);

            let result = match producer.send(record, Timeout::After(timeout)).await {
                Ok((partition, offset)) => {
                    tracing::debug!(topic = %topic, partition, offset, "event published");
                    Ok(DeliveryReceipt::broker(topic.clone(), partition, offset))
                }
                Err((kafka_error, _)) => {
                    tracing::error!(topic = %topic, error = %kafka_error, "failed to publish event");
                    Err(BusError::Publish {
                        topic: topic.clone(),
                        reason: kafka_error.to_string(),
                    })
                }
            };

            promise.complete(result);
        });

        delivery
    }

    fn subscribe(&self, topic: &Topic) -> Result<Subscription<Vec<u8>>, BusError> {
        let subscribe_err = |reason: String| BusError::Subscribe {
            topic: topic.clone(),
            reason,
        };

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.consumer_group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &self.auto_offset_reset)
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| subscribe_err(format!("failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[topic.as_str()])
            .map_err(|e| subscribe_err(e.to_string()))?;

        tracing::info!(
            topic = %topic,
            consumer_group = %self.consumer_group,
            "subscribed to kafka topic"
        );

        let (tx, rx) = mpsc::channel();
        let channel = topic.clone();

        self.runtime.spawn(async move {
            let mut stream = consumer.stream();

            while let Some(next) = stream.next().await {
                match next {
                    Ok(message) => {
                        // A null payload is an empty product id.
                        let payload = message.payload().map(<[u8]>::to_vec).unwrap_or_default();

                        if tx.send(payload).is_err() {
                            tracing::debug!(topic = %channel, "subscriber dropped; stopping consumer");
                            break;
                        }

                        if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
                            tracing::warn!(
                                topic = message.topic(),
                                partition = message.partition(),
                                offset = message.offset(),
                                error = %e,
                                "failed to commit offset (message may be redelivered)"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::warn!(topic = %channel, error = %e, "kafka receive failed");
                    }
                }
            }
        });

        Ok(Subscription::new(topic.clone(), rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kafka_bus_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KafkaEventBus>();
    }

    #[test]
    fn build_requires_brokers() {
        let err = KafkaEventBus::builder().build().unwrap_err();
        assert!(matches!(err, BusError::Connection(_)));
    }

    #[test]
    fn build_requires_a_runtime() {
        let err = KafkaEventBus::builder()
            .brokers("localhost:9092")
            .build()
            .unwrap_err();
        assert!(matches!(err, BusError::Connection(msg) if msg.contains("runtime")));
    }
}

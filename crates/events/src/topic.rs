use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use raware_core::DomainError;

/// Name of a pub/sub channel.
///
/// Topics are plain strings on the wire (Kafka topic, Redis channel). The only
/// rule enforced here is that a topic name is not empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(Cow<'static, str>);

impl Topic {
    /// Orders accepted by the order endpoint. Payload: raw product id.
    pub const ORDER_CREATED: Topic = Topic(Cow::Borrowed("order-created"));

    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("topic name must not be empty"));
        }
        Ok(Self(Cow::Owned(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Topic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

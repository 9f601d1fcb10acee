//! Outbound publish capability supplied by the host.
//!
//! The core never manages transport connections. Whatever carries the
//! messages (an MQTT client in the bridge binary, a recording stub in tests)
//! implements [`PublishSink`]; the core treats it as best-effort and neither
//! retries nor suppresses its errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Quality of service level for a publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl Qos {
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

impl From<Qos> for u8 {
    fn from(qos: Qos) -> Self {
        qos.as_u8()
    }
}

/// Errors surfaced by a publish sink.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("not connected")]
    NotConnected,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Abstract `publish(topic, payload, qos, retained)` capability.
#[async_trait]
pub trait PublishSink: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: Qos,
        retain: bool,
    ) -> Result<(), PublishError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qos_levels() {
        assert_eq!(Qos::AtMostOnce.as_u8(), 0);
        assert_eq!(Qos::AtLeastOnce.as_u8(), 1);
        assert_eq!(u8::from(Qos::ExactlyOnce), 2);
    }
}

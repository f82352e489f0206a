use async_trait::async_trait;
use rumqttc::{AsyncClient, QoS};

use crate::error::RelayError;

/// Outbound half of the transport session
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    /// Sends one payload at most once; resolves once the client accepted it.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), RelayError>;
}

/// Publishes through the same rumqttc client the session driver polls
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CommandPublisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), RelayError> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .await
            .map_err(|e| RelayError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}

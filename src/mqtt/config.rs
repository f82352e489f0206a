use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix of the client id; a random suffix is added once per process
    pub client_id_prefix: String,
    pub keep_alive_secs: u64,
    /// Fixed wait between reconnection attempts
    pub reconnect_backoff_ms: u64,
    /// Request queue capacity of the MQTT client
    pub channel_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: String::from("broker.mqttdashboard.com"),
            port: 1883,
            client_id_prefix: String::from("Carrito-"),
            keep_alive_secs: 60,
            reconnect_backoff_ms: 1000,
            channel_capacity: 100,
        }
    }
}

impl BrokerConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    /// Prefix plus eight random hex digits
    pub fn generate_client_id(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}{}", self.client_id_prefix, &suffix[..8])
    }
}

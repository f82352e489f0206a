use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{storage_key, PersistenceRecord, TelemetrySink};
use crate::error::RelayError;
use crate::telemetry::SensorReading;

/// Writes readings through the Realtime Database REST interface.
///
/// Each write is a `PUT <database_url>/<prefix>/<channel>.json`, replacing
/// whatever the key held before.
#[derive(Debug, Clone)]
pub struct FirebaseSink {
    client: reqwest::Client,
    database_url: String,
    prefix: String,
}

impl FirebaseSink {
    pub fn new(
        database_url: &str,
        prefix: &str,
        request_timeout: Duration,
    ) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            database_url: database_url.trim_end_matches('/').to_string(),
            prefix: prefix.to_string(),
        })
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}.json", self.database_url, key)
    }
}

#[async_trait]
impl TelemetrySink for FirebaseSink {
    async fn write(&self, reading: &SensorReading) -> Result<(), RelayError> {
        let key = storage_key(&self.prefix, reading.channel);
        let record = PersistenceRecord::from_reading(reading);

        let response = self
            .client
            .put(self.url_for(&key))
            .json(&record)
            .send()
            .await
            .map_err(|e| RelayError::PersistenceWrite {
                key: key.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::PersistenceWrite {
                key,
                reason: format!("HTTP {}", status),
            });
        }

        debug!("Stored {} = {} at {}", key, record.value, record.timestamp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_rooted_at_database() {
        let sink = FirebaseSink::new(
            "https://rover-default-rtdb.firebaseio.com/",
            "sensors",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            sink.url_for("sensors/distance"),
            "https://rover-default-rtdb.firebaseio.com/sensors/distance.json"
        );
    }

    #[test]
    fn record_serializes_as_value_and_timestamp() {
        let record = PersistenceRecord {
            value: "412".into(),
            timestamp: "2024-11-02T14:05:09.000Z".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"value": "412", "timestamp": "2024-11-02T14:05:09.000Z"})
        );
    }
}

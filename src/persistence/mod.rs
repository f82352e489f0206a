//! # Persistence Module
//!
//! ## Why This Module Exists
//! Every sensor reading that reaches the relay is also written to a realtime
//! keyed store, so the rover's last known state survives the dashboard being
//! closed. The store is an external collaborator: this module only knows how
//! to derive the key, shape the record and hand it over.
//!
//! ## Key Abstractions
//! - **[`TelemetrySink`]**: the single "write value with timestamp under a key"
//!   operation the relay needs from a store
//! - **[`PersistenceRecord`]**: `{ value, timestamp }` as stored
//! - **[`persistence_worker::PersistenceWorker`]**: background task that owns
//!   the sink and drains readings handed over by telemetry ingest
//!
//! ## Error Handling Strategy
//! Writes are fire-and-forget. A rejected write is logged with its key and
//! value and then forgotten: no retry, no propagation, no effect on the
//! display.

pub mod firebase;
pub mod persistence_worker;

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RelayError;
use crate::mqtt::topics::Channel;
use crate::telemetry::SensorReading;

pub const DEFAULT_PATH_PREFIX: &str = "sensors";

/// Stored shape of a single reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceRecord {
    pub value: String,
    /// ISO-8601, UTC, millisecond precision
    pub timestamp: String,
}

impl PersistenceRecord {
    pub fn from_reading(reading: &SensorReading) -> Self {
        Self {
            value: reading.value.clone(),
            timestamp: reading
                .observed_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// `<prefix>/<channel name>`, e.g. `sensors/temperature`
pub fn storage_key(prefix: &str, channel: Channel) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), channel.name())
}

/// A realtime store accepting one record per key
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn write(&self, reading: &SensorReading) -> Result<(), RelayError>;
}

/// Sink used when no database is configured
#[derive(Debug, Default)]
pub struct LogOnlySink {
    prefix: String,
}

impl LogOnlySink {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl TelemetrySink for LogOnlySink {
    async fn write(&self, reading: &SensorReading) -> Result<(), RelayError> {
        let record = PersistenceRecord::from_reading(reading);
        info!(
            "Persistence disabled, would write {} = {} at {}",
            storage_key(&self.prefix, reading.channel),
            record.value,
            record.timestamp
        );
        Ok(())
    }
}

//! Telemetry ingest
//!
//! Turns inbound `(topic, payload)` pairs into typed [`SensorReading`]s and
//! fans them out: one display update, one persistence hand-off. The two legs
//! are independent; a dead display never holds back persistence and a slow
//! or failing store never holds back the display.
//!
//! ```text
//! SessionDriver ──(topic, bytes)──► TelemetryIngest ──► DisplayHandle
//!                                          │
//!                                          └──► PersistenceWorker ──► TelemetrySink
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::mqtt::topics::{Channel, ChannelKind, TopicRegistry};
use crate::ui::state::{DisplayHandle, DisplayUpdate};

/// A single value reported by the rover
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub channel: Channel,
    pub value: String,
    pub observed_at: DateTime<Utc>,
}

/// What ingest did with one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Displayed and handed to persistence
    Sensor(SensorReading),
    /// Displayed only
    ServoStatus(String),
    /// Registered channel that is never inbound, e.g. an echoed command
    Ignored(Channel),
    /// Topic not in the registry, discarded
    Unknown,
}

pub struct TelemetryIngest {
    registry: Arc<TopicRegistry>,
    display: DisplayHandle,
    persistence: mpsc::Sender<SensorReading>,
}

impl TelemetryIngest {
    pub fn new(
        registry: Arc<TopicRegistry>,
        display: DisplayHandle,
        persistence: mpsc::Sender<SensorReading>,
    ) -> Self {
        Self {
            registry,
            display,
            persistence,
        }
    }

    /// Handles one inbound message synchronously, in delivery order.
    pub fn handle_message(&self, topic: &str, payload: &[u8]) -> IngestOutcome {
        let channel = match self.registry.resolve_channel(topic) {
            Ok(channel) => channel,
            Err(e) => {
                warn!("Discarding message: {}", e);
                return IngestOutcome::Unknown;
            }
        };
        let value = String::from_utf8_lossy(payload).into_owned();

        match channel.kind() {
            ChannelKind::Sensor => {
                let reading = SensorReading {
                    channel,
                    value,
                    observed_at: Utc::now(),
                };
                self.display.emit(DisplayUpdate::Sensor {
                    channel,
                    text: self.label_text(channel, &reading.value),
                });
                self.persist(reading.clone());
                IngestOutcome::Sensor(reading)
            }
            ChannelKind::ServoStatus => {
                debug!("Servo status: {}", value);
                self.display.emit(DisplayUpdate::ServoStatus(value.clone()));
                IngestOutcome::ServoStatus(value)
            }
            ChannelKind::Control | ChannelKind::ServoControl => {
                debug!("Ignoring inbound message on command topic {}", topic);
                IngestOutcome::Ignored(channel)
            }
        }
    }

    fn label_text(&self, channel: Channel, value: &str) -> String {
        match self.registry.unit(channel) {
            Some(unit) => format!("{} {}", value, unit),
            None => value.to_string(),
        }
    }

    fn persist(&self, reading: SensorReading) {
        if let Err(e) = self.persistence.try_send(reading) {
            warn!("Persistence queue unavailable, reading dropped: {}", e);
        }
    }
}

//! Error definitions shared by the relay components

use thiserror::Error;

use crate::mqtt::topics::Channel;

/// Failures a relay component can observe at one of its external call sites.
///
/// None of these halt the relay. Each is caught where it happens, logged with
/// the channel/topic/payload involved and folded into a display update.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Broker unreachable or connection dropped
    #[error("Transport connection failed: {0}")]
    TransportConnect(String),

    /// Broker rejected or never received the subscription batch
    #[error("Subscription failed: {0}")]
    Subscribe(String),

    #[error("Publish to '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("Persistence write for '{key}' failed: {reason}")]
    PersistenceWrite { key: String, reason: String },

    /// Inbound topic without a registered channel. Expected, not exceptional.
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// Intent aimed at a channel nothing can be published on
    #[error("Channel {0:?} does not accept commands")]
    InvalidIntent(Channel),

    #[error("Speech engine error: {0}")]
    SpeechEngine(String),

    #[error("Speech recognition is not supported on this platform")]
    SpeechUnsupported,

    #[error("Configuration error: {0}")]
    Config(String),
}

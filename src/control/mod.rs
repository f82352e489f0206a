//! Command side of the relay
//!
//! Three independent sources (buttons, the servo slider, the speech
//! interpreter) produce [`ControlIntent`]s. All of them feed one queue that
//! the [`dispatcher::CommandDispatcher`] drains in order:
//!
//! ```text
//! ButtonSource ──┐
//! SliderSource ──┼──► IntentSender ──(mpsc)──► CommandDispatcher ──► broker
//! Speech ────────┘
//! ```

pub mod dispatcher;
pub mod sources;

use tokio::sync::mpsc;
use tracing::warn;

use crate::mqtt::topics::Channel;

/// Payload of every discrete drive action
pub const DEFAULT_PAYLOAD: &str = "1";

/// Intents waiting for the dispatcher; a full queue drops new intents
pub const INTENT_QUEUE_CAPACITY: usize = 64;

/// A normalized request for one control action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlIntent {
    pub channel: Channel,
    pub payload: String,
}

impl ControlIntent {
    /// Discrete action with the default activation payload
    pub fn activate(channel: Channel) -> Self {
        Self {
            channel,
            payload: DEFAULT_PAYLOAD.to_string(),
        }
    }

    /// Servo angle, passed through as decimal text
    pub fn servo(angle: impl Into<String>) -> Self {
        Self {
            channel: Channel::ServoControl,
            payload: angle.into(),
        }
    }
}

/// Entry point of the intent queue, shared by all sources
#[derive(Clone, Debug)]
pub struct IntentSender {
    tx: mpsc::Sender<ControlIntent>,
}

impl IntentSender {
    pub fn new(tx: mpsc::Sender<ControlIntent>) -> Self {
        Self { tx }
    }

    /// Non-blocking; safe to call from the UI thread.
    pub fn submit(&self, intent: ControlIntent) {
        if let Err(e) = self.tx.try_send(intent) {
            warn!("Intent dropped before dispatch: {}", e);
        }
    }
}

//! Display state fed by the relay components
//!
//! Components never touch widgets. They emit [`DisplayUpdate`]s through a
//! [`DisplayHandle`]; the UI drains them each frame through a [`DisplayFeed`]
//! into a [`DisplayState`] where the last value wins.
//!
//! Sensor and servo updates travel on a bounded queue and may be dropped
//! when the UI stops draining. Connectivity and speech status are also
//! written to `watch` channels, so their latest value survives any overflow
//! and is applied after the queue on every drain.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::mqtt::mqtt_handler::ConnectionState;
use crate::mqtt::topics::Channel;
use crate::speech::SpeechState;

pub const IDLE_STATUS: &str = "Status: idle";
pub const LISTENING_STATUS: &str = "Listening...";
pub const UNSUPPORTED_STATUS: &str = "Speech recognition not supported on this platform";

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayUpdate {
    Connectivity(ConnectionState),
    /// Sensor label text, unit suffix already applied
    Sensor { channel: Channel, text: String },
    ServoStatus(String),
    ServoAngle(String),
    SpeechStatus { state: SpeechState, text: String },
}

/// Capacity of the display event queue
pub const DISPLAY_QUEUE_CAPACITY: usize = 256;

/// Latest speech state and its status text
pub type SpeechStatus = (SpeechState, String);

/// Sending side of the display channels, cloned into every component
#[derive(Clone, Debug)]
pub struct DisplayHandle {
    tx: mpsc::Sender<DisplayUpdate>,
    connection: Arc<watch::Sender<ConnectionState>>,
    speech: Arc<watch::Sender<SpeechStatus>>,
}

impl DisplayHandle {
    pub fn new(tx: mpsc::Sender<DisplayUpdate>) -> Self {
        let (connection, _) = watch::channel(ConnectionState::Disconnected);
        let (speech, _) = watch::channel((SpeechState::Idle, IDLE_STATUS.to_string()));
        Self {
            tx,
            connection: Arc::new(connection),
            speech: Arc::new(speech),
        }
    }

    /// Never blocks. Connectivity and speech status always land in their
    /// watch channel; a full or closed queue only costs a log line.
    pub fn emit(&self, update: DisplayUpdate) {
        let sticky = match &update {
            DisplayUpdate::Connectivity(state) => {
                self.connection.send_replace(*state);
                true
            }
            DisplayUpdate::SpeechStatus { state, text } => {
                self.speech.send_replace((*state, text.clone()));
                true
            }
            _ => false,
        };

        if let Err(e) = self.tx.try_send(update) {
            if sticky {
                debug!("Display event not queued, latest value kept: {}", e);
            } else {
                warn!("Display update dropped: {}", e);
            }
        }
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    pub fn watch_speech(&self) -> watch::Receiver<SpeechStatus> {
        self.speech.subscribe()
    }
}

/// Receiving side of the display channels, owned by the UI
#[derive(Debug)]
pub struct DisplayFeed {
    updates: mpsc::Receiver<DisplayUpdate>,
    connection: watch::Receiver<ConnectionState>,
    speech: watch::Receiver<SpeechStatus>,
}

impl DisplayFeed {
    pub fn new(updates: mpsc::Receiver<DisplayUpdate>, handle: &DisplayHandle) -> Self {
        Self {
            updates,
            connection: handle.watch_connection(),
            speech: handle.watch_speech(),
        }
    }

    /// Applies every queued update, then the latest connectivity and speech
    /// status. Returns the number of queued updates applied.
    pub fn drain(&mut self, state: &mut DisplayState) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.updates.try_recv() {
            state.apply(update);
            applied += 1;
        }

        state.apply(DisplayUpdate::Connectivity(*self.connection.borrow_and_update()));
        let (speech_state, text) = self.speech.borrow_and_update().clone();
        state.apply(DisplayUpdate::SpeechStatus {
            state: speech_state,
            text,
        });
        applied
    }
}

#[derive(Debug, Clone)]
pub struct DisplayState {
    pub connection: ConnectionState,
    sensors: BTreeMap<Channel, String>,
    pub servo_status: String,
    pub servo_angle: String,
    pub speech_state: SpeechState,
    pub speech_status: String,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            sensors: BTreeMap::new(),
            servo_status: String::from("--"),
            servo_angle: String::from("0"),
            speech_state: SpeechState::Idle,
            speech_status: IDLE_STATUS.to_string(),
        }
    }
}

impl DisplayState {
    pub fn apply(&mut self, update: DisplayUpdate) {
        match update {
            DisplayUpdate::Connectivity(state) => self.connection = state,
            DisplayUpdate::Sensor { channel, text } => {
                self.sensors.insert(channel, text);
            }
            DisplayUpdate::ServoStatus(text) => self.servo_status = text,
            DisplayUpdate::ServoAngle(text) => self.servo_angle = text,
            DisplayUpdate::SpeechStatus { state, text } => {
                self.speech_state = state;
                self.speech_status = text;
            }
        }
    }

    pub fn sensor_text(&self, channel: Channel) -> &str {
        self.sensors.get(&channel).map(String::as_str).unwrap_or("--")
    }

    pub fn speech_available(&self) -> bool {
        self.speech_state != SpeechState::Unsupported
    }
}

//! Spoken-command intent source
//!
//! A recognition engine runs single-shot listen cycles. Each cycle yields one
//! final transcript or an error and then ends. The [`interpreter`] turns a
//! transcript into at most one [`ControlIntent`](crate::control::ControlIntent)
//! by ordered keyword matching:
//!
//! ```text
//!  Idle ──activate──► Listening ──transcript──► Recognized | Unrecognized
//!   ▲                     │                              │
//!   │                     └──error──► Error              │
//!   └──────────────── end of cycle ◄─────────────────────┘
//!
//!  Unsupported: entered once at startup when no engine exists, terminal
//! ```

pub mod console;
pub mod interpreter;

use async_trait::async_trait;

use crate::error::RelayError;
use crate::mqtt::topics::Channel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    Unsupported,
    Idle,
    Listening,
    Recognized,
    Unrecognized,
    Error,
}

/// Platform recognizer running one listen cycle per call.
///
/// The returned future completing is the end of the cycle.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    async fn listen(&self) -> Result<String, RelayError>;
}

/// Keyword sets checked top to bottom against the lower-cased transcript;
/// the first set with any keyword contained in it wins.
pub const COMMAND_KEYWORDS: [(&[&str], Channel); 5] = [
    (&["adelante"], Channel::Forward),
    (&["atrás", "reversa"], Channel::Backward),
    (&["derecha"], Channel::Right),
    (&["izquierda"], Channel::Left),
    // "deten" covers both "detener" and "detente"
    (&["alto", "deten"], Channel::Stop),
];

/// Maps a transcript to the channel of its first matching keyword set.
pub fn match_command(transcript: &str) -> Option<Channel> {
    let transcript = transcript.to_lowercase();
    COMMAND_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| transcript.contains(keyword)))
        .map(|(_, channel)| *channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrases_map_to_channels() {
        assert_eq!(match_command("ve hacia adelante"), Some(Channel::Forward));
        assert_eq!(match_command("regresa en reversa"), Some(Channel::Backward));
        assert_eq!(match_command("ve para atrás"), Some(Channel::Backward));
        assert_eq!(match_command("gira a la derecha"), Some(Channel::Right));
        assert_eq!(match_command("a la izquierda"), Some(Channel::Left));
        assert_eq!(match_command("para ya, detente"), Some(Channel::Stop));
        assert_eq!(match_command("alto"), Some(Channel::Stop));
        assert_eq!(match_command("haz un baile"), None);
    }

    #[test]
    fn matching_ignores_case() {
        assert_eq!(match_command("ADELANTE"), Some(Channel::Forward));
        assert_eq!(match_command("Atrás"), Some(Channel::Backward));
    }

    #[test]
    fn earlier_sets_win() {
        // forward is checked before stop
        assert_eq!(match_command("adelante y luego alto"), Some(Channel::Forward));
        // backward is checked before stop
        assert_eq!(match_command("detente y ve en reversa"), Some(Channel::Backward));
    }
}

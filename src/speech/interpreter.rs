use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{match_command, RecognitionEngine, SpeechState};
use crate::control::{ControlIntent, IntentSender};
use crate::error::RelayError;
use crate::ui::state::{
    DisplayHandle, DisplayUpdate, IDLE_STATUS, LISTENING_STATUS, UNSUPPORTED_STATUS,
};

/// Drives listen cycles and turns transcripts into intents.
///
/// Activating while a cycle is already running is ignored; the running cycle
/// finishes on its own and the next activation starts a new one from `Idle`.
pub struct SpeechInterpreter {
    state: SpeechState,
    engine: Option<Arc<dyn RecognitionEngine>>,
    intents: IntentSender,
    display: DisplayHandle,
}

impl SpeechInterpreter {
    /// Without an engine the interpreter is `Unsupported` for good.
    pub fn new(
        engine: Option<Arc<dyn RecognitionEngine>>,
        intents: IntentSender,
        display: DisplayHandle,
    ) -> Self {
        let mut interpreter = Self {
            state: SpeechState::Idle,
            engine,
            intents,
            display,
        };
        if interpreter.engine.is_none() {
            warn!("{}", RelayError::SpeechUnsupported);
            interpreter.report(SpeechState::Unsupported, UNSUPPORTED_STATUS.to_string());
        }
        interpreter
    }

    pub fn state(&self) -> SpeechState {
        self.state
    }

    /// `Idle -> Listening`. Returns whether a new cycle should start.
    pub fn begin_listening(&mut self) -> bool {
        match self.state {
            SpeechState::Idle => {
                self.report(SpeechState::Listening, LISTENING_STATUS.to_string());
                true
            }
            SpeechState::Unsupported => {
                debug!("Activation ignored, speech recognition unsupported");
                false
            }
            other => {
                debug!("Activation ignored while {:?}", other);
                false
            }
        }
    }

    /// Final transcript of the running cycle
    pub fn on_transcript(&mut self, transcript: &str) -> Option<ControlIntent> {
        if self.state != SpeechState::Listening {
            warn!("Transcript outside a listen cycle dropped: {}", transcript);
            return None;
        }

        let transcript = transcript.to_lowercase();
        info!("Recognized command: {}", transcript);
        let recognized = format!("Recognized command: {}", transcript);

        match match_command(&transcript) {
            Some(channel) => {
                let intent = ControlIntent::activate(channel);
                self.report(SpeechState::Recognized, recognized);
                self.intents.submit(intent.clone());
                Some(intent)
            }
            None => {
                warn!("Command not recognized: {}", transcript);
                self.report(
                    SpeechState::Unrecognized,
                    format!("{} - command not recognized", recognized),
                );
                None
            }
        }
    }

    pub fn on_error(&mut self, e: &RelayError) {
        if self.state != SpeechState::Listening {
            return;
        }
        error!("Speech recognition failed: {}", e);
        let message = match e {
            RelayError::SpeechEngine(message) => message.clone(),
            other => other.to_string(),
        };
        self.report(
            SpeechState::Error,
            format!("Speech recognition error: {}", message),
        );
    }

    /// End of the engine's cycle, back to `Idle`
    pub fn on_end(&mut self) {
        match self.state {
            SpeechState::Listening
            | SpeechState::Recognized
            | SpeechState::Unrecognized
            | SpeechState::Error => {
                self.report(SpeechState::Idle, IDLE_STATUS.to_string());
            }
            SpeechState::Idle | SpeechState::Unsupported => {}
        }
    }

    /// Serves activations until shutdown or until the trigger is dropped.
    pub async fn run(mut self, mut activations: mpsc::Receiver<()>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                activation = activations.recv() => {
                    if activation.is_none() {
                        break;
                    }
                }
            }

            if !self.begin_listening() {
                continue;
            }
            let Some(engine) = self.engine.clone() else {
                continue;
            };

            let cycle = engine.listen();
            tokio::pin!(cycle);
            let result = loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => return,
                    result = &mut cycle => break result,
                    Some(()) = activations.recv() => {
                        debug!("Already listening, activation ignored");
                    }
                }
            };

            match result {
                Ok(transcript) => {
                    self.on_transcript(&transcript);
                }
                Err(e) => self.on_error(&e),
            }
            self.on_end();
        }
        info!("Speech interpreter stopped");
    }

    fn report(&mut self, state: SpeechState, text: String) {
        self.state = state;
        self.display.emit(DisplayUpdate::SpeechStatus { state, text });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::topics::Channel;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Hands out scripted cycle results, one per listen call
    struct ScriptedEngine {
        results: Mutex<VecDeque<Result<String, RelayError>>>,
    }

    impl ScriptedEngine {
        fn new(results: Vec<Result<String, RelayError>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
            })
        }
    }

    #[async_trait]
    impl RecognitionEngine for ScriptedEngine {
        async fn listen(&self) -> Result<String, RelayError> {
            let next = self.results.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(RelayError::SpeechEngine("no-speech".into())))
        }
    }

    struct Harness {
        interpreter: SpeechInterpreter,
        intent_rx: mpsc::Receiver<ControlIntent>,
        display_rx: mpsc::Receiver<DisplayUpdate>,
    }

    fn harness(engine: Option<Arc<dyn RecognitionEngine>>) -> Harness {
        let (intent_tx, intent_rx) = mpsc::channel(8);
        let (display_tx, display_rx) = mpsc::channel(32);
        Harness {
            interpreter: SpeechInterpreter::new(
                engine,
                IntentSender::new(intent_tx),
                DisplayHandle::new(display_tx),
            ),
            intent_rx,
            display_rx,
        }
    }

    fn statuses(rx: &mut mpsc::Receiver<DisplayUpdate>) -> Vec<(SpeechState, String)> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            if let DisplayUpdate::SpeechStatus { state, text } = update {
                out.push((state, text));
            }
        }
        out
    }

    #[test]
    fn recognized_transcript_emits_one_intent() {
        let mut h = harness(Some(ScriptedEngine::new(vec![])));
        assert!(h.interpreter.begin_listening());
        let intent = h.interpreter.on_transcript("Gira a la Derecha");
        assert_eq!(intent, Some(ControlIntent::activate(Channel::Right)));
        assert_eq!(h.interpreter.state(), SpeechState::Recognized);
        assert_eq!(
            h.intent_rx.try_recv().unwrap(),
            ControlIntent::activate(Channel::Right)
        );
        assert!(h.intent_rx.try_recv().is_err());

        h.interpreter.on_end();
        assert_eq!(h.interpreter.state(), SpeechState::Idle);
        assert_eq!(
            statuses(&mut h.display_rx),
            vec![
                (SpeechState::Listening, LISTENING_STATUS.to_string()),
                (
                    SpeechState::Recognized,
                    "Recognized command: gira a la derecha".to_string()
                ),
                (SpeechState::Idle, IDLE_STATUS.to_string()),
            ]
        );
    }

    #[test]
    fn unrecognized_transcript_emits_nothing() {
        let mut h = harness(Some(ScriptedEngine::new(vec![])));
        h.interpreter.begin_listening();
        assert_eq!(h.interpreter.on_transcript("haz un baile"), None);
        assert_eq!(h.interpreter.state(), SpeechState::Unrecognized);
        assert!(h.intent_rx.try_recv().is_err());

        let last = statuses(&mut h.display_rx).pop().unwrap();
        assert_eq!(
            last,
            (
                SpeechState::Unrecognized,
                "Recognized command: haz un baile - command not recognized".to_string()
            )
        );
    }

    #[test]
    fn engine_error_is_reported() {
        let mut h = harness(Some(ScriptedEngine::new(vec![])));
        h.interpreter.begin_listening();
        h.interpreter
            .on_error(&RelayError::SpeechEngine("not-allowed".into()));
        assert_eq!(h.interpreter.state(), SpeechState::Error);
        assert!(h.intent_rx.try_recv().is_err());

        let last = statuses(&mut h.display_rx).pop().unwrap();
        assert_eq!(last.1, "Speech recognition error: not-allowed");
    }

    #[test]
    fn activation_while_listening_is_ignored() {
        let mut h = harness(Some(ScriptedEngine::new(vec![])));
        assert!(h.interpreter.begin_listening());
        assert!(!h.interpreter.begin_listening());
        assert_eq!(h.interpreter.state(), SpeechState::Listening);
    }

    #[test]
    fn missing_engine_is_permanently_unsupported() {
        let mut h = harness(None);
        assert_eq!(h.interpreter.state(), SpeechState::Unsupported);
        assert!(!h.interpreter.begin_listening());
        h.interpreter.on_end();
        assert_eq!(h.interpreter.state(), SpeechState::Unsupported);
        assert_eq!(
            statuses(&mut h.display_rx),
            vec![(SpeechState::Unsupported, UNSUPPORTED_STATUS.to_string())]
        );
    }

    #[tokio::test]
    async fn run_serves_one_cycle_per_activation() {
        let engine = ScriptedEngine::new(vec![
            Ok("ve hacia adelante".into()),
            Ok("haz un baile".into()),
            Err(RelayError::SpeechEngine("network".into())),
            Ok("para ya, detente".into()),
        ]);
        let Harness {
            interpreter,
            mut intent_rx,
            mut display_rx,
        } = harness(Some(engine));

        let (trigger, activations) = mpsc::channel(8);
        for _ in 0..4 {
            trigger.send(()).await.unwrap();
        }
        drop(trigger);
        interpreter.run(activations, CancellationToken::new()).await;

        let mut intents = Vec::new();
        while let Ok(intent) = intent_rx.try_recv() {
            intents.push(intent.channel);
        }
        assert_eq!(intents, vec![Channel::Forward, Channel::Stop]);

        let states: Vec<_> = statuses(&mut display_rx)
            .into_iter()
            .map(|(state, _)| state)
            .collect();
        assert_eq!(
            states,
            vec![
                SpeechState::Listening,
                SpeechState::Recognized,
                SpeechState::Idle,
                SpeechState::Listening,
                SpeechState::Unrecognized,
                SpeechState::Idle,
                SpeechState::Listening,
                SpeechState::Error,
                SpeechState::Idle,
                SpeechState::Listening,
                SpeechState::Recognized,
                SpeechState::Idle,
            ]
        );
    }
}

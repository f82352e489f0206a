use std::io::{BufRead, BufReader, Read};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use super::RecognitionEngine;
use crate::error::RelayError;

/// Line-based stand-in for a platform recognizer.
///
/// Each listen cycle takes one line as the final transcript. An empty line
/// behaves like a recognizer hearing nothing. Lines are read on a detached
/// thread, so a pending listen never holds up runtime shutdown.
pub struct ConsoleEngine {
    language: String,
    lines: Mutex<mpsc::Receiver<Result<String, String>>>,
}

impl ConsoleEngine {
    pub fn new(language: impl Into<String>) -> Result<Self, RelayError> {
        Self::from_reader(language, std::io::stdin())
    }

    pub fn from_reader<R>(language: impl Into<String>, reader: R) -> Result<Self, RelayError>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        std::thread::Builder::new()
            .name("console-speech".into())
            .spawn(move || read_lines(BufReader::new(reader), tx))
            .map_err(|e| RelayError::SpeechEngine(format!("reader thread: {}", e)))?;

        Ok(Self {
            language: language.into(),
            lines: Mutex::new(rx),
        })
    }
}

fn read_lines<R: BufRead>(reader: R, tx: mpsc::Sender<Result<String, String>>) {
    for line in reader.lines() {
        let line = line.map_err(|e| e.to_string());
        let failed = line.is_err();
        if tx.blocking_send(line).is_err() || failed {
            break;
        }
    }
    debug!("Console input closed");
}

#[async_trait]
impl RecognitionEngine for ConsoleEngine {
    async fn listen(&self) -> Result<String, RelayError> {
        info!("Listening ({}), type a command and press enter", self.language);
        let line = self.lines.lock().await.recv().await;

        match line {
            None => Err(RelayError::SpeechEngine("audio-capture closed".into())),
            Some(Err(e)) => Err(RelayError::SpeechEngine(e)),
            Some(Ok(line)) => {
                let transcript = line.trim();
                if transcript.is_empty() {
                    Err(RelayError::SpeechEngine("no-speech".into()))
                } else {
                    Ok(transcript.to_string())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc as std_mpsc;
    use std::time::{Duration, Instant};

    /// Blocks on every read until its sender is dropped
    struct StalledInput(std_mpsc::Receiver<()>);

    impl Read for StalledInput {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    #[tokio::test]
    async fn one_line_per_cycle() {
        let input = Cursor::new("  Ve hacia adelante \n\nalto\n");
        let engine = ConsoleEngine::from_reader("es-ES", input).unwrap();

        assert_eq!(engine.listen().await.unwrap(), "Ve hacia adelante");
        assert!(matches!(
            engine.listen().await,
            Err(RelayError::SpeechEngine(e)) if e == "no-speech"
        ));
        assert_eq!(engine.listen().await.unwrap(), "alto");
        assert!(matches!(
            engine.listen().await,
            Err(RelayError::SpeechEngine(e)) if e == "audio-capture closed"
        ));
    }

    #[test]
    fn pending_listen_does_not_hold_runtime_shutdown() {
        let (hold, stalled) = std_mpsc::channel();
        let engine = ConsoleEngine::from_reader("es-ES", StalledInput(stalled)).unwrap();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.spawn(async move { engine.listen().await });
        std::thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        drop(runtime);
        assert!(started.elapsed() < Duration::from_secs(1));
        drop(hold);
    }
}

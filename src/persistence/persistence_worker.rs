use std::sync::Arc;

use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::TelemetrySink;
use crate::telemetry::SensorReading;

/// Background writer owning the telemetry sink.
///
/// Readings arrive over a bounded queue and are written one at a time in
/// arrival order. The worker stops once every sender has been dropped.
pub struct PersistenceWorker {
    rx: Receiver<SensorReading>,
    sink: Arc<dyn TelemetrySink>,
}

impl PersistenceWorker {
    pub fn spawn(
        sink: Arc<dyn TelemetrySink>,
        capacity: usize,
    ) -> (Sender<SensorReading>, JoinHandle<()>) {
        let (tx, rx) = channel::<SensorReading>(capacity);
        let worker = Self { rx, sink };
        let handle = tokio::spawn(worker.run());
        (tx, handle)
    }

    async fn run(mut self) {
        info!("Persistence worker started");
        while let Some(reading) = self.rx.recv().await {
            match self.sink.write(&reading).await {
                Ok(()) => debug!(
                    "Persisted {} = {}",
                    reading.channel.name(),
                    reading.value
                ),
                Err(e) => error!(
                    "Dropping reading {} = {}: {}",
                    reading.channel.name(),
                    reading.value,
                    e
                ),
            }
        }
        info!("Persistence worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::mqtt::topics::Channel;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Rejects every value equal to "bad", records the rest
    #[derive(Default)]
    struct PickySink {
        written: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TelemetrySink for PickySink {
        async fn write(&self, reading: &SensorReading) -> Result<(), RelayError> {
            if reading.value == "bad" {
                return Err(RelayError::PersistenceWrite {
                    key: reading.channel.name().into(),
                    reason: "rejected".into(),
                });
            }
            self.written.lock().unwrap().push(reading.value.clone());
            Ok(())
        }
    }

    fn reading(value: &str) -> SensorReading {
        SensorReading {
            channel: Channel::Distance,
            value: value.into(),
            observed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn rejected_write_does_not_stop_the_worker() {
        let sink = Arc::new(PickySink::default());
        let (tx, handle) = PersistenceWorker::spawn(sink.clone(), 8);

        tx.send(reading("12")).await.unwrap();
        tx.send(reading("bad")).await.unwrap();
        tx.send(reading("14")).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(*sink.written.lock().unwrap(), vec!["12", "14"]);
    }
}

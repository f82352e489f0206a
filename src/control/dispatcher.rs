use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::ControlIntent;
use crate::error::RelayError;
use crate::mqtt::publisher::CommandPublisher;
use crate::mqtt::topics::TopicRegistry;

/// Resolves intents to topics and publishes them.
///
/// Keeps no state between intents, so the same intent can be dispatched any
/// number of times (a held button, a dragged slider).
pub struct CommandDispatcher {
    registry: Arc<TopicRegistry>,
    publisher: Arc<dyn CommandPublisher>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<TopicRegistry>, publisher: Arc<dyn CommandPublisher>) -> Self {
        Self {
            registry,
            publisher,
        }
    }

    pub async fn dispatch(&self, intent: &ControlIntent) -> Result<(), RelayError> {
        if !intent.channel.accepts_commands() {
            return Err(RelayError::InvalidIntent(intent.channel));
        }
        let topic = self.registry.resolve_topic(intent.channel);
        self.publisher.publish(topic, &intent.payload).await?;
        info!("Command sent: \"{}\" with payload \"{}\"", topic, intent.payload);
        Ok(())
    }

    /// Drains the intent queue in order until shutdown or until every
    /// sender is gone. Failures are logged per intent.
    pub async fn run(self, mut intents: mpsc::Receiver<ControlIntent>, shutdown: CancellationToken) {
        loop {
            let intent = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                intent = intents.recv() => match intent {
                    Some(intent) => intent,
                    None => break,
                },
            };

            if let Err(e) = self.dispatch(&intent).await {
                error!(
                    "Dropping command {} ({}): {}",
                    intent.channel.name(),
                    intent.payload,
                    e
                );
            }
        }
        info!("Command dispatcher stopped");
    }
}

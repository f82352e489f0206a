//! Transport session lifecycle
//!
//! The session driver owns the broker connection and walks a two-state
//! statum machine:
//!
//! ```text
//!            ConnAck + subscribe batch
//!  Offline ───────────────────────────► Online
//!     ▲                                    │
//!     └──── connection lost, fixed backoff ┘
//! ```
//!
//! Inbound publishes are handed to [`TelemetryIngest`] inline, inside the
//! poll loop, so they are processed strictly in delivery order. Reconnection
//! reuses the same client options (and therefore the same client id); the
//! subscription batch is re-sent exactly once per acknowledged connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, SubscribeFilter, SubscribeReasonCode,
};
use statum::{machine, state};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::BrokerConfig;
use crate::error::RelayError;
use crate::mqtt::topics::TopicRegistry;
use crate::telemetry::TelemetryIngest;
use crate::ui::state::{DisplayHandle, DisplayUpdate};

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Broker activity, reduced to what the relay cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Message { topic: String, payload: Vec<u8> },
    /// Broker refused this many filters of the last subscription batch
    SubscriptionRejected(usize),
    Other,
}

/// Connection to the broker as seen by the session driver
#[async_trait]
pub trait BrokerLink: Send {
    /// Drives the connection until the next event. After an error the next
    /// call starts a fresh connection attempt.
    async fn poll(&mut self) -> Result<LinkEvent, RelayError>;

    async fn subscribe(&mut self, topics: &[&'static str]) -> Result<(), RelayError>;
}

pub struct RumqttLink {
    client: AsyncClient,
    eventloop: EventLoop,
}

impl RumqttLink {
    /// Builds the link and hands back a client clone for publishing.
    pub fn new(config: &BrokerConfig, client_id: &str) -> (Self, AsyncClient) {
        let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
        options
            .set_keep_alive(config.keep_alive().max(Duration::from_secs(5)))
            .set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(options, config.channel_capacity);
        info!(
            "MQTT client {} targeting {}:{}",
            client_id, config.host, config.port
        );
        (
            Self {
                client: client.clone(),
                eventloop,
            },
            client,
        )
    }
}

#[async_trait]
impl BrokerLink for RumqttLink {
    async fn poll(&mut self) -> Result<LinkEvent, RelayError> {
        match self.eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                debug!("ConnAck: {:?}", ack);
                Ok(LinkEvent::Connected)
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => Ok(LinkEvent::Message {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            }),
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                let rejected = ack
                    .return_codes
                    .iter()
                    .filter(|code| matches!(code, SubscribeReasonCode::Failure))
                    .count();
                if rejected > 0 {
                    Ok(LinkEvent::SubscriptionRejected(rejected))
                } else {
                    Ok(LinkEvent::Other)
                }
            }
            Ok(_) => Ok(LinkEvent::Other),
            Err(e) => Err(RelayError::TransportConnect(e.to_string())),
        }
    }

    async fn subscribe(&mut self, topics: &[&'static str]) -> Result<(), RelayError> {
        let filters = topics
            .iter()
            .map(|topic| SubscribeFilter::new(topic.to_string(), QoS::AtMostOnce));
        self.client
            .subscribe_many(filters)
            .await
            .map_err(|e| RelayError::Subscribe(e.to_string()))
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum SessionPhase {
    Offline, // waiting for the broker to acknowledge a connection
    Online,  // subscribed, routing inbound messages
}

#[machine]
pub struct SessionDriver<S: SessionPhase> {
    link: Box<dyn BrokerLink>,
    registry: Arc<TopicRegistry>,
    ingest: TelemetryIngest,
    display: DisplayHandle,
    backoff: Duration,
    shutdown: CancellationToken,
}

impl<S: SessionPhase> SessionDriver<S> {
    /// Routes everything except connection changes
    fn route(&self, event: LinkEvent) {
        match event {
            LinkEvent::Message { topic, payload } => {
                self.ingest.handle_message(&topic, &payload);
            }
            LinkEvent::SubscriptionRejected(count) => {
                error!(
                    "Broker rejected {} subscription(s), affected sensors stay silent",
                    count
                );
            }
            LinkEvent::Connected => debug!("Duplicate ConnAck ignored"),
            LinkEvent::Other => {}
        }
    }
}

/// Sleeps for the backoff interval; false if shutdown came first.
async fn wait_backoff(shutdown: &CancellationToken, backoff: Duration) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(backoff) => true,
    }
}

impl SessionDriver<Offline> {
    pub fn create(
        link: Box<dyn BrokerLink>,
        registry: Arc<TopicRegistry>,
        ingest: TelemetryIngest,
        display: DisplayHandle,
        backoff: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self::new(link, registry, ingest, display, backoff, shutdown)
    }

    /// Retries until the broker acknowledges, then subscribes in one batch.
    ///
    /// A failed subscription is logged and the session still goes online,
    /// degraded: commands work, sensor updates do not arrive.
    pub async fn connect(mut self) -> Option<SessionDriver<Online>> {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return None,
                event = self.link.poll() => event,
            };

            match event {
                Ok(LinkEvent::Connected) => break,
                Ok(other) => self.route(other),
                Err(e) => {
                    warn!("Broker unreachable, retrying in {:?}: {}", self.backoff, e);
                    if !wait_backoff(&self.shutdown, self.backoff).await {
                        return None;
                    }
                }
            }
        }

        info!("Connected to broker");
        self.display
            .emit(DisplayUpdate::Connectivity(ConnectionState::Connected));

        let topics = self.registry.subscriptions();
        match self.link.subscribe(&topics).await {
            Ok(()) => info!("Subscribed to {} sensor and servo topics", topics.len()),
            Err(e) => error!("Subscription failed, sensor updates will not arrive: {}", e),
        }

        Some(self.transition())
    }
}

impl SessionDriver<Online> {
    /// Routes inbound traffic until the connection drops.
    pub async fn pump(mut self) -> Option<SessionDriver<Offline>> {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return None,
                event = self.link.poll() => event,
            };

            match event {
                Ok(event) => self.route(event),
                Err(e) => {
                    error!("Connection to broker lost: {}", e);
                    self.display
                        .emit(DisplayUpdate::Connectivity(ConnectionState::Disconnected));
                    if !wait_backoff(&self.shutdown, self.backoff).await {
                        return None;
                    }
                    return Some(self.transition());
                }
            }
        }
    }
}

/// Runs the session until shutdown, reconnecting indefinitely.
pub async fn run_session(mut driver: SessionDriver<Offline>) {
    loop {
        let Some(online) = driver.connect().await else {
            break;
        };
        match online.pump().await {
            Some(offline) => driver = offline,
            None => break,
        }
    }
    info!("Transport session stopped");
}

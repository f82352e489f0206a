pub mod config;
pub mod control;
pub mod error;
pub mod mqtt;
pub mod persistence;
pub mod speech;
pub mod telemetry;
pub mod ui;

use crate::config::{RelayConfig, SpeechEngineKind};
use crate::control::dispatcher::CommandDispatcher;
use crate::control::{IntentSender, INTENT_QUEUE_CAPACITY};
use crate::mqtt::mqtt_handler::{run_session, Offline, RumqttLink, SessionDriver};
use crate::mqtt::publisher::MqttPublisher;
use crate::mqtt::topics::TopicRegistry;
use crate::persistence::firebase::FirebaseSink;
use crate::persistence::persistence_worker::PersistenceWorker;
use crate::persistence::{LogOnlySink, TelemetrySink};
use crate::speech::console::ConsoleEngine;
use crate::speech::interpreter::SpeechInterpreter;
use crate::speech::RecognitionEngine;
use crate::telemetry::TelemetryIngest;
use crate::ui::state::{DisplayFeed, DisplayHandle, DISPLAY_QUEUE_CAPACITY};
use crate::ui::RelayUI;
use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = RelayConfig::load_or_create(&RelayConfig::default_path()).await?;
    let registry = Arc::new(TopicRegistry::builtin().map_err(|e| eyre!("{}", e))?);
    let shutdown = CancellationToken::new();

    // Display updates from every component into the UI thread
    let (display_tx, display_rx) = mpsc::channel(DISPLAY_QUEUE_CAPACITY);
    let display = DisplayHandle::new(display_tx);
    let feed = DisplayFeed::new(display_rx, &display);

    let sink = build_sink(&config)?;
    let (persist_tx, _persistence_handle) =
        PersistenceWorker::spawn(sink, config.persistence.queue_capacity);
    let ingest = TelemetryIngest::new(registry.clone(), display.clone(), persist_tx);

    // One client id per process, kept across reconnects
    let client_id = config.broker.generate_client_id();
    info!(
        "Connecting to {}:{} as {}",
        config.broker.host, config.broker.port, client_id
    );
    let (link, client) = RumqttLink::new(&config.broker, &client_id);
    let driver = SessionDriver::<Offline>::create(
        Box::new(link),
        registry.clone(),
        ingest,
        display.clone(),
        config.broker.reconnect_backoff(),
        shutdown.clone(),
    );
    let _session_handle = tokio::spawn(run_session(driver));

    let (intent_tx, intent_rx) = mpsc::channel(INTENT_QUEUE_CAPACITY);
    let intents = IntentSender::new(intent_tx);
    let dispatcher = CommandDispatcher::new(registry.clone(), Arc::new(MqttPublisher::new(client)));
    let _dispatcher_handle = tokio::spawn(dispatcher.run(intent_rx, shutdown.clone()));

    let engine: Option<Arc<dyn RecognitionEngine>> = match config.speech.engine {
        SpeechEngineKind::Console => {
            let engine = ConsoleEngine::new(config.speech.language.clone())
                .map_err(|e| eyre!("{}", e))?;
            Some(Arc::new(engine))
        }
        SpeechEngineKind::None => None,
    };
    let (listen_tx, listen_rx) = mpsc::channel(4);
    let interpreter = SpeechInterpreter::new(engine, intents.clone(), display.clone());
    let _speech_handle = tokio::spawn(interpreter.run(listen_rx, shutdown.clone()));

    info!("Starting UI");
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport =
        egui::ViewportBuilder::default().with_fullscreen(config.ui.fullscreen);

    let servo_range = config.ui.servo_range();
    let repaint = config.ui.repaint_interval();
    let result = eframe::run_native(
        "Rover Relay",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(RelayUI::new(
                cc,
                feed,
                intents,
                display,
                listen_tx,
                registry,
                servo_range,
                repaint,
            )))
        }),
    );

    shutdown.cancel();
    info!("Shutting down");
    result.map_err(|e| eyre!("UI terminated with error: {}", e))
}

fn build_sink(config: &RelayConfig) -> Result<Arc<dyn TelemetrySink>> {
    let prefix = &config.persistence.path_prefix;
    match &config.persistence.database_url {
        Some(url) => {
            info!("Persisting sensor readings to {}", url);
            let sink = FirebaseSink::new(url, prefix, config.persistence.request_timeout())
                .map_err(|e| eyre!("{}", e))?;
            Ok(Arc::new(sink))
        }
        None => {
            warn!("No database configured, sensor readings are only logged");
            Ok(Arc::new(LogOnlySink::new(prefix.clone())))
        }
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

//! # Rover Dashboard
//!
//! The egui surface of the relay. It owns no connection and publishes
//! nothing itself:
//!
//! - **Inbound**: [`state::DisplayUpdate`]s from the session driver, telemetry
//!   ingest, slider and speech interpreter are drained every frame through a
//!   [`state::DisplayFeed`] into a [`state::DisplayState`] and rendered from
//!   there.
//! - **Outbound**: button clicks and slider moves go through the control
//!   sources into the intent queue; the listen button pokes the speech
//!   interpreter's trigger channel.
//!
//! Layout follows the usual three panels: connectivity on top, sensors and
//! controls in the center, speech status at the bottom.

pub mod common;
pub mod state;

use eframe::egui::{self, Button, RichText, Slider, Vec2};
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::control::sources::{ButtonSource, SliderSource};
use crate::control::IntentSender;
use crate::mqtt::topics::{Channel, TopicRegistry};

use self::common::{connection_indicator, create_frame, UiColors};
use self::state::{DisplayFeed, DisplayHandle, DisplayState};

pub const DRIVE_BUTTONS: [(&str, Channel); 5] = [
    ("Forward", Channel::Forward),
    ("Backward", Channel::Backward),
    ("Right", Channel::Right),
    ("Left", Channel::Left),
    ("Stop", Channel::Stop),
];

pub fn sensor_label(channel: Channel) -> &'static str {
    match channel {
        Channel::AmbientHumidity => "Humidity",
        Channel::Temperature => "Temperature",
        Channel::SoilHumidity => "Soil humidity",
        Channel::Gas => "Gas",
        Channel::Distance => "Distance",
        other => other.name(),
    }
}

pub struct RelayUI {
    state: DisplayState,
    feed: DisplayFeed,
    buttons: Vec<(&'static str, ButtonSource)>,
    slider: SliderSource,
    servo_angle: i32,
    servo_range: RangeInclusive<i32>,
    listen: mpsc::Sender<()>,
    registry: std::sync::Arc<TopicRegistry>,
    repaint: Duration,
}

impl RelayUI {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        feed: DisplayFeed,
        intents: IntentSender,
        display: DisplayHandle,
        listen: mpsc::Sender<()>,
        registry: std::sync::Arc<TopicRegistry>,
        servo_range: RangeInclusive<i32>,
        repaint: Duration,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        let buttons = DRIVE_BUTTONS
            .iter()
            .map(|(label, channel)| (*label, ButtonSource::new(*channel, intents.clone())))
            .collect();

        RelayUI {
            state: DisplayState::default(),
            feed,
            buttons,
            slider: SliderSource::new(intents, display),
            servo_angle: *servo_range.start(),
            servo_range,
            listen,
            registry,
            repaint,
        }
    }

    fn render_sensors(&self, ui: &mut egui::Ui) {
        create_frame(UiColors::INNER_BG, UiColors::BORDER).show(ui, |ui| {
            ui.heading("Sensors");
            egui::Grid::new("sensor_grid").striped(true).show(ui, |ui| {
                for channel in Channel::SENSORS {
                    ui.label(sensor_label(channel));
                    ui.label(self.state.sensor_text(channel));
                    ui.end_row();
                }
                ui.label("Servo status");
                ui.label(&self.state.servo_status);
                ui.end_row();
            });
        });
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        create_frame(UiColors::INNER_BG, UiColors::BORDER).show(ui, |ui| {
            ui.heading("Drive");
            let width = (ui.available_width() - 40.0) / self.buttons.len() as f32;
            ui.horizontal(|ui| {
                for (label, button) in &self.buttons {
                    let widget = Button::new(*label).min_size(Vec2 { x: width, y: 40.0 });
                    if ui.add(widget).clicked() {
                        debug!(
                            "Button {} -> {}",
                            label,
                            self.registry.resolve_topic(button.channel())
                        );
                        button.press();
                    }
                }
            });

            ui.separator();
            ui.horizontal(|ui| {
                ui.label("Servo");
                let slider = Slider::new(&mut self.servo_angle, self.servo_range.clone());
                if ui.add(slider).changed() {
                    self.slider.on_change(self.servo_angle);
                }
                ui.label(format!("{}°", self.state.servo_angle));
            });
        });
    }

    fn render_speech(&self, ui: &mut egui::Ui) {
        ui.horizontal_centered(|ui| {
            let listen = Button::new("Listen").min_size(Vec2 { x: 120.0, y: 30.0 });
            if ui
                .add_enabled(self.state.speech_available(), listen)
                .clicked()
            {
                if let Err(e) = self.listen.try_send(()) {
                    warn!("Listen request dropped: {}", e);
                }
            }
            ui.label(&self.state.speech_status);
        });
    }
}

impl eframe::App for RelayUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.feed.drain(&mut self.state);

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(UiColors::MAIN_BG).inner_margin(8))
            .show(ctx, |ui| {
                ui.ctx().request_repaint_after(self.repaint);

                egui::TopBottomPanel::top("top_panel")
                    .show_separator_line(false)
                    .show_inside(ui, |ui| {
                        let (text, color) = connection_indicator(self.state.connection);
                        ui.horizontal_centered(|ui| {
                            ui.label(RichText::new("Rover Relay").strong());
                            ui.colored_label(color, text);
                        });
                    });

                egui::TopBottomPanel::bottom("bottom_panel")
                    .show_separator_line(false)
                    .show_inside(ui, |ui| self.render_speech(ui));

                egui::CentralPanel::default().show_inside(ui, |ui| {
                    self.render_sensors(ui);
                    self.render_controls(ui);
                });
            });
    }
}

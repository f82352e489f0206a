//! Shared styling for the dashboard panels

use eframe::egui::{Color32, Frame, Stroke};

use crate::mqtt::mqtt_handler::ConnectionState;

/// Dark theme palette
pub struct UiColors;

impl UiColors {
    pub const MAIN_BG: Color32 = Color32::from_rgb(30, 30, 30);
    pub const INNER_BG: Color32 = Color32::from_rgb(25, 25, 25);
    pub const BORDER: Color32 = Color32::from_rgb(60, 60, 60);

    /// Connected / recognized
    pub const ACTIVE: Color32 = Color32::from_rgb(50, 200, 20);

    /// Disconnected / error
    pub const INACTIVE: Color32 = Color32::from_rgb(200, 50, 20);
}

pub fn create_frame(bg_color: Color32, border_color: Color32) -> Frame {
    Frame::new()
        .stroke(Stroke::new(1.0, border_color))
        .fill(bg_color)
        .inner_margin(4)
        .outer_margin(2)
}

/// Indicator text and color for the connectivity label
pub fn connection_indicator(state: ConnectionState) -> (&'static str, Color32) {
    match state {
        ConnectionState::Connected => ("Connected", UiColors::ACTIVE),
        ConnectionState::Disconnected => ("Disconnected", UiColors::INACTIVE),
    }
}

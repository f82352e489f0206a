use super::{ControlIntent, IntentSender};
use crate::mqtt::topics::Channel;
use crate::ui::state::{DisplayHandle, DisplayUpdate};

/// One drive button, bound to a single discrete channel
#[derive(Clone, Debug)]
pub struct ButtonSource {
    channel: Channel,
    intents: IntentSender,
}

impl ButtonSource {
    pub fn new(channel: Channel, intents: IntentSender) -> Self {
        Self { channel, intents }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// One intent per click
    pub fn press(&self) {
        self.intents.submit(ControlIntent::activate(self.channel));
    }
}

/// The servo slider. Every change event is published, no debouncing.
#[derive(Clone, Debug)]
pub struct SliderSource {
    intents: IntentSender,
    display: DisplayHandle,
}

impl SliderSource {
    pub fn new(intents: IntentSender, display: DisplayHandle) -> Self {
        Self { intents, display }
    }

    pub fn on_change(&self, angle: i32) {
        let text = angle.to_string();
        self.display.emit(DisplayUpdate::ServoAngle(text.clone()));
        self.intents.submit(ControlIntent::servo(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn button_press_emits_one_activation() {
        let (tx, mut rx) = mpsc::channel(4);
        let button = ButtonSource::new(Channel::Backward, IntentSender::new(tx));
        button.press();
        assert_eq!(
            rx.try_recv().unwrap(),
            ControlIntent {
                channel: Channel::Backward,
                payload: "1".into()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn slider_change_publishes_and_updates_label() {
        let (intent_tx, mut intent_rx) = mpsc::channel(4);
        let (display_tx, mut display_rx) = mpsc::channel(4);
        let slider = SliderSource::new(IntentSender::new(intent_tx), DisplayHandle::new(display_tx));

        slider.on_change(45);

        assert_eq!(intent_rx.try_recv().unwrap(), ControlIntent::servo("45"));
        assert!(intent_rx.try_recv().is_err());
        assert_eq!(
            display_rx.try_recv().unwrap(),
            DisplayUpdate::ServoAngle("45".into())
        );
    }
}

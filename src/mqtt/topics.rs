//! Topic registry for the rover's sensor and control plane
//!
//! Maps every logical [`Channel`] to exactly one broker topic and back. The
//! table is a literal, checked once at startup; everything else in the relay
//! talks in channels and only asks the registry when it touches the wire.

use std::collections::HashMap;

use crate::error::RelayError;

/// Logical identity of one sensor, control action or servo sub-channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    AmbientHumidity,
    Temperature,
    SoilHumidity,
    Gas,
    Distance,
    Forward,
    Backward,
    Right,
    Left,
    Stop,
    ServoControl,
    ServoStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Inbound scalar reading, displayed and persisted
    Sensor,
    /// Outbound discrete drive action
    Control,
    /// Outbound servo angle
    ServoControl,
    /// Inbound servo feedback, display only
    ServoStatus,
}

impl Channel {
    pub const COUNT: usize = 12;

    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::AmbientHumidity,
        Channel::Temperature,
        Channel::SoilHumidity,
        Channel::Gas,
        Channel::Distance,
        Channel::Forward,
        Channel::Backward,
        Channel::Right,
        Channel::Left,
        Channel::Stop,
        Channel::ServoControl,
        Channel::ServoStatus,
    ];

    pub const SENSORS: [Channel; 5] = [
        Channel::AmbientHumidity,
        Channel::Temperature,
        Channel::SoilHumidity,
        Channel::Gas,
        Channel::Distance,
    ];

    pub const CONTROLS: [Channel; 5] = [
        Channel::Forward,
        Channel::Backward,
        Channel::Right,
        Channel::Left,
        Channel::Stop,
    ];

    /// Stable identifier, used for storage keys and logs
    pub fn name(self) -> &'static str {
        match self {
            Channel::AmbientHumidity => "humidity",
            Channel::Temperature => "temperature",
            Channel::SoilHumidity => "soil_humidity",
            Channel::Gas => "gas",
            Channel::Distance => "distance",
            Channel::Forward => "forward",
            Channel::Backward => "backward",
            Channel::Right => "right",
            Channel::Left => "left",
            Channel::Stop => "stop",
            Channel::ServoControl => "servo_control",
            Channel::ServoStatus => "servo_status",
        }
    }

    pub fn kind(self) -> ChannelKind {
        match self {
            Channel::AmbientHumidity
            | Channel::Temperature
            | Channel::SoilHumidity
            | Channel::Gas
            | Channel::Distance => ChannelKind::Sensor,
            Channel::Forward
            | Channel::Backward
            | Channel::Right
            | Channel::Left
            | Channel::Stop => ChannelKind::Control,
            Channel::ServoControl => ChannelKind::ServoControl,
            Channel::ServoStatus => ChannelKind::ServoStatus,
        }
    }

    /// Whether intents may be published on this channel
    pub fn accepts_commands(self) -> bool {
        matches!(
            self.kind(),
            ChannelKind::Control | ChannelKind::ServoControl
        )
    }
}

/// One row of the registry table
#[derive(Debug, Clone, Copy)]
pub struct ChannelSpec {
    pub channel: Channel,
    pub topic: &'static str,
    /// Unit suffix appended to displayed sensor values
    pub unit: Option<&'static str>,
}

const fn spec(channel: Channel, topic: &'static str, unit: Option<&'static str>) -> ChannelSpec {
    ChannelSpec {
        channel,
        topic,
        unit,
    }
}

/// Topics as flashed into the rover firmware
pub const CHANNEL_TABLE: [ChannelSpec; Channel::COUNT] = [
    spec(Channel::AmbientHumidity, "humdanipapi", Some("%")),
    spec(Channel::Temperature, "tempdanipapi", Some("°C")),
    spec(Channel::SoilHumidity, "humtdanipapi", Some("%")),
    spec(Channel::Gas, "mq2danipapi", Some("ppm")),
    spec(Channel::Distance, "disdanipapi", Some("cm")),
    spec(Channel::Forward, "adelantepa", None),
    spec(Channel::Backward, "atraspa", None),
    spec(Channel::Right, "derechapa", None),
    spec(Channel::Left, "izquierdapa", None),
    spec(Channel::Stop, "altopapi", None),
    spec(Channel::ServoControl, "servo/control", None),
    spec(Channel::ServoStatus, "servo/status", None),
];

/// Bidirectional channel/topic lookup, immutable after construction
#[derive(Debug)]
pub struct TopicRegistry {
    // indexed by `Channel as usize`, one entry per channel
    specs: Vec<ChannelSpec>,
    channels: HashMap<&'static str, Channel>,
}

impl TopicRegistry {
    /// Registry over the rover's literal topic table
    pub fn builtin() -> Result<Self, RelayError> {
        Self::from_table(&CHANNEL_TABLE)
    }

    /// Builds a registry, rejecting tables that are not total and injective.
    pub fn from_table(table: &[ChannelSpec]) -> Result<Self, RelayError> {
        let mut channels = HashMap::with_capacity(table.len());
        for row in table {
            if let Some(previous) = channels.insert(row.topic, row.channel) {
                return Err(RelayError::Config(format!(
                    "topic '{}' mapped to both {:?} and {:?}",
                    row.topic, previous, row.channel
                )));
            }
        }

        let mut specs = Vec::with_capacity(Channel::COUNT);
        for channel in Channel::ALL {
            let mut rows = table.iter().filter(|row| row.channel == channel);
            let row = rows.next().ok_or_else(|| {
                RelayError::Config(format!("no topic registered for {:?}", channel))
            })?;
            if rows.next().is_some() {
                return Err(RelayError::Config(format!(
                    "{:?} registered more than once",
                    channel
                )));
            }
            specs.push(*row);
        }

        Ok(Self { specs, channels })
    }

    pub fn resolve_topic(&self, channel: Channel) -> &'static str {
        self.specs[channel as usize].topic
    }

    pub fn resolve_channel(&self, topic: &str) -> Result<Channel, RelayError> {
        self.channels
            .get(topic)
            .copied()
            .ok_or_else(|| RelayError::UnknownTopic(topic.to_string()))
    }

    pub fn unit(&self, channel: Channel) -> Option<&'static str> {
        self.specs[channel as usize].unit
    }

    /// Topics subscribed on every (re)connect: all sensors plus servo status
    pub fn subscriptions(&self) -> Vec<&'static str> {
        Channel::SENSORS
            .iter()
            .chain(std::iter::once(&Channel::ServoStatus))
            .map(|channel| self.resolve_topic(*channel))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_channel_round_trips() {
        let registry = TopicRegistry::builtin().unwrap();
        for channel in Channel::ALL {
            let topic = registry.resolve_topic(channel);
            assert_eq!(registry.resolve_channel(topic).unwrap(), channel);
        }
    }

    #[test]
    fn unknown_topic_is_distinguishable() {
        let registry = TopicRegistry::builtin().unwrap();
        match registry.resolve_channel("luzdanipapi") {
            Err(RelayError::UnknownTopic(topic)) => assert_eq!(topic, "luzdanipapi"),
            other => panic!("expected UnknownTopic, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_topic_is_rejected() {
        let mut table = CHANNEL_TABLE;
        table[1].topic = table[0].topic;
        assert!(matches!(
            TopicRegistry::from_table(&table),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn missing_channel_is_rejected() {
        let table = &CHANNEL_TABLE[..Channel::COUNT - 1];
        assert!(matches!(
            TopicRegistry::from_table(table),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn subscriptions_cover_sensors_and_servo_status() {
        let registry = TopicRegistry::builtin().unwrap();
        let topics = registry.subscriptions();
        assert_eq!(
            topics,
            vec![
                "humdanipapi",
                "tempdanipapi",
                "humtdanipapi",
                "mq2danipapi",
                "disdanipapi",
                "servo/status"
            ]
        );
    }

    #[test]
    fn sensor_units_follow_the_table() {
        let registry = TopicRegistry::builtin().unwrap();
        assert_eq!(registry.unit(Channel::Temperature), Some("°C"));
        assert_eq!(registry.unit(Channel::Gas), Some("ppm"));
        assert_eq!(registry.unit(Channel::ServoStatus), None);
        assert!(Channel::Stop.accepts_commands());
        assert!(!Channel::Distance.accepts_commands());
    }
}

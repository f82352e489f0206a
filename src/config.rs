use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::mqtt::config::BrokerConfig;
use crate::persistence::DEFAULT_PATH_PREFIX;

const CONFIG_DIR: &str = ".config/rover-relay";
const CONFIG_FILE: &str = "relay.toml";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    pub broker: BrokerConfig,
    pub persistence: PersistenceConfig,
    pub speech: SpeechConfig,
    pub ui: UiConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Realtime database root; persistence only logs when unset
    pub database_url: Option<String>,
    pub path_prefix: String,
    pub request_timeout_secs: u64,
    /// Readings waiting for the sink; a full queue drops new readings
    pub queue_capacity: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            request_timeout_secs: 10,
            queue_capacity: 100,
        }
    }
}

impl PersistenceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechEngineKind {
    #[default]
    Console,
    None,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub engine: SpeechEngineKind,
    pub language: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            engine: SpeechEngineKind::Console,
            language: String::from("es-ES"),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub fullscreen: bool,
    pub servo_min: i32,
    pub servo_max: i32,
    pub repaint_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            fullscreen: false,
            servo_min: 0,
            servo_max: 180,
            repaint_ms: 33,
        }
    }
}

impl UiConfig {
    /// Slider range, bounds swapped if configured backwards
    pub fn servo_range(&self) -> std::ops::RangeInclusive<i32> {
        if self.servo_min <= self.servo_max {
            self.servo_min..=self.servo_max
        } else {
            self.servo_max..=self.servo_min
        }
    }

    pub fn repaint_interval(&self) -> Duration {
        Duration::from_millis(self.repaint_ms)
    }
}

impl RelayConfig {
    pub fn default_path() -> PathBuf {
        let mut path = get_home_dir();
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    /// Loads the config file, writing defaults first if none exists.
    ///
    /// A file that does not parse is left untouched and defaults are used.
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            info!("Creating default configuration at {}", path.display());
            let config = Self::default();
            config.save(path).await?;
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file: {}", e))?;

        match Self::parse(&content) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                Ok(Self::default())
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| eyre!("Failed to parse config: {}", e))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file: {}", e))?;
        Ok(())
    }
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = RelayConfig::parse(
            r#"
            [broker]
            host = "localhost"

            [persistence]
            database_url = "https://rover.example.com"

            [speech]
            engine = "none"
            "#,
        )
        .unwrap();

        assert_eq!(config.broker.host, "localhost");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.client_id_prefix, "Carrito-");
        assert_eq!(
            config.persistence.database_url.as_deref(),
            Some("https://rover.example.com")
        );
        assert_eq!(config.persistence.path_prefix, "sensors");
        assert_eq!(config.persistence.queue_capacity, 100);
        assert_eq!(config.speech.engine, SpeechEngineKind::None);
        assert_eq!(config.speech.language, "es-ES");
        assert_eq!(config.ui, UiConfig::default());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(RelayConfig::parse("broker = 5").is_err());
    }

    #[test]
    fn servo_range_is_ordered() {
        let ui = UiConfig {
            servo_min: 180,
            servo_max: 0,
            ..UiConfig::default()
        };
        assert_eq!(ui.servo_range(), 0..=180);
    }

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let mut path = std::env::temp_dir();
        path.push(format!("rover-relay-{}", uuid::Uuid::new_v4().simple()));
        path.push(CONFIG_FILE);

        let created = RelayConfig::load_or_create(&path).await.unwrap();
        assert_eq!(created, RelayConfig::default());
        assert!(path.exists());

        let reloaded = RelayConfig::load_or_create(&path).await.unwrap();
        assert_eq!(reloaded, created);

        if let Some(dir) = path.parent() {
            let _ = tokio::fs::remove_dir_all(dir).await;
        }
    }

    #[tokio::test]
    async fn unparsable_file_falls_back_to_defaults() {
        let mut path = std::env::temp_dir();
        path.push(format!("rover-relay-{}.toml", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&path, "[[[").await.unwrap();

        let config = RelayConfig::load_or_create(&path).await.unwrap();
        assert_eq!(config, RelayConfig::default());

        let _ = tokio::fs::remove_file(&path).await;
    }
}

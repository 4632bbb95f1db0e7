use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::ai::{backend::DEFAULT_ENDPOINT, BackendClient, Responder, SimulatedResponder};
use crate::error::ConfigError;
use crate::gate::{ContentGate, DEFAULT_BLOCKED_MESSAGE, DEFAULT_BLOCKED_TERMS};
use crate::mode::DeliveryMode;
use crate::pipeline::DeliveryPipeline;
use crate::store::ConversationStore;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STREAM_DELAY_MS: u64 = 6;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub mode: Option<String>,
    pub endpoint: Option<String>,
    /// Zero disables the timeout
    pub request_timeout_secs: Option<u64>,
    pub stream_delay_ms: Option<u64>,
    pub blocked_terms: Option<Vec<String>>,
    pub blocked_message: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            mode: Some(DeliveryMode::Simulated.as_str().to_string()),
            ..Self::default()
        }
    }

    /// Load from the default location, then apply `CATCHAT_*` environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        Ok(Self::load_from(&config_path)?.with_env_overrides())
    }

    /// A missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(mode) = std::env::var("CATCHAT_MODE") {
            self.mode = Some(mode);
        }
        if let Ok(endpoint) = std::env::var("CATCHAT_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        self
    }

    pub fn delivery_mode(&self) -> Result<DeliveryMode, ConfigError> {
        match &self.mode {
            None => Ok(DeliveryMode::default()),
            Some(name) => {
                DeliveryMode::from_str(name).ok_or_else(|| ConfigError::UnknownMode(name.clone()))
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn stream_delay(&self) -> Duration {
        Duration::from_millis(self.stream_delay_ms.unwrap_or(DEFAULT_STREAM_DELAY_MS))
    }

    pub fn content_gate(&self) -> Result<ContentGate, ConfigError> {
        let reason = self
            .blocked_message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BLOCKED_MESSAGE.to_string());

        let gate = match &self.blocked_terms {
            Some(terms) => ContentGate::new(terms, reason)?,
            None => ContentGate::new(DEFAULT_BLOCKED_TERMS.iter().copied(), reason)?,
        };
        Ok(gate)
    }

    pub fn responder(&self) -> Result<Arc<dyn Responder>, ConfigError> {
        let responder: Arc<dyn Responder> = match self.delivery_mode()? {
            DeliveryMode::Simulated => Arc::new(SimulatedResponder::with_delay(self.stream_delay())),
            DeliveryMode::Remote => {
                Arc::new(BackendClient::new(self.endpoint(), self.request_timeout())?)
            }
        };
        Ok(responder)
    }

    pub fn build_pipeline(
        &self,
        store: Arc<ConversationStore>,
    ) -> Result<DeliveryPipeline, ConfigError> {
        Ok(DeliveryPipeline::new(store, self.content_gate()?, self.responder()?))
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;

        Ok(config_dir.join("catchat").join("config.json"))
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::DEFAULT_BACKEND_URL;
use crate::error::{Result, TutorError};
use crate::tutor::ReplyTiming;

/// Overrides `backend_url` from the config file
pub const BACKEND_URL_ENV: &str = "TALKBUDDY_BACKEND_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub voice_enabled: bool,
    pub speech_command: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub reply_delay_min_ms: u64,
    pub reply_delay_max_ms: u64,
    pub failure_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            voice_enabled: true,
            speech_command: None,
            request_timeout_secs: None,
            reply_delay_min_ms: 1000,
            reply_delay_max_ms: 2000,
            failure_delay_ms: 1000,
        }
    }

    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                config.backend_url = url;
            }
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn reply_timing(&self) -> ReplyTiming {
        let min = self.reply_delay_min_ms.min(self.reply_delay_max_ms);
        ReplyTiming {
            reply_delay: Duration::from_millis(min)..=Duration::from_millis(self.reply_delay_max_ms.max(min)),
            failure_delay: Duration::from_millis(self.failure_delay_ms),
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| TutorError::Config("Could not determine config directory".to_string()))?;

        Ok(config_dir.join("talkbuddy").join("config.json"))
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::backend::{DEFAULT_BACKEND_URL, PollOptions};

/// Environment variable overriding the data file location
pub const DATA_FILE_ENV: &str = "MEETING_INSIGHTS_DATA";

/// Environment variable overriding the processing backend address
pub const BACKEND_URL_ENV: &str = "MEETING_BACKEND_URL";

const APP_DIR: &str = "meeting-insights";
const DATA_FILE_NAME: &str = "meetings.json";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// JSON data file for the meeting store (defaults to the user data dir)
    #[serde(default)]
    pub data_file: Option<PathBuf>,

    /// Base URL of the transcription/summarization backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Seconds between job status checks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds before job polling gives up
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    PollOptions::default().interval.as_secs()
}

fn default_poll_timeout_secs() -> u64 {
    PollOptions::default().timeout.as_secs()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: None,
            backend_url: default_backend_url(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl Config {
    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DATA_FILE_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Using data file from {}: {}", DATA_FILE_ENV, path);
            self.data_file = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Using backend URL from {}: {}", BACKEND_URL_ENV, url);
            self.backend_url = url;
        }
    }

    /// Resolved data file: explicit path, or `<data dir>/meeting-insights/meetings.json`
    pub fn data_file_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.data_file {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().context("Failed to get data directory")?;
        Ok(data_dir.join(APP_DIR).join(DATA_FILE_NAME))
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            timeout: Duration::from_secs(self.poll_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.poll_options(), PollOptions::default());
        assert!(config.data_file.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (DATA_FILE_ENV, "/tmp/meetings.json"),
            (BACKEND_URL_ENV, "http://backend:9000"),
        ]);
        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.data_file, Some(PathBuf::from("/tmp/meetings.json")));
        assert_eq!(config.backend_url, "http://backend:9000");
        assert_eq!(
            config.data_file_path().unwrap(),
            PathBuf::from("/tmp/meetings.json")
        );
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(|_| Some("  ".to_string()));
        assert!(config.data_file.is_none());
        assert_eq!(config.backend_url, "http://localhost:8000");
    }

    #[test]
    fn test_partial_config_file() {
        let config: Config = serde_json::from_str(r#"{"poll_interval_secs": 5}"#).unwrap();
        assert_eq!(config.poll_options().interval, Duration::from_secs(5));
        assert_eq!(config.backend_url, "http://localhost:8000");
    }
}

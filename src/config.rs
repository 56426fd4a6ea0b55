use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::session::SessionConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/session-recorder";
const ENV_PREFIX: &str = "SESSION_RECORDER";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub recorder: SessionConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
    /// Period of the engine's tick loop in milliseconds
    pub tick_ms: u64,
}

impl ServiceConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "session-recorder".to_string(),
            http: HttpConfig::default(),
            tick_ms: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8420,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub sessions_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sessions_path: PathBuf::from("recordings"),
        }
    }
}

impl Config {
    /// Load from `path` (any format the `config` crate detects by extension)
    /// with `SESSION_RECORDER__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent");
        let cfg = Config::load(path.to_str().unwrap()).unwrap();

        assert_eq!(cfg.recorder.sample_rate, 44100);
        assert_eq!(cfg.recorder.window_size, 1024);
        assert_eq!(cfg.service.tick_ms, 20);
        assert_eq!(cfg.storage.sessions_path, PathBuf::from("recordings"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recorder.toml");
        fs::write(
            &path,
            r#"
[service]
tick_ms = 10

[recorder]
sample_rate = 48000
max_recording_secs = 2.5
record_microphone = false

[storage]
sessions_path = "/tmp/sessions"
"#,
        )
        .unwrap();

        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.recorder.sample_rate, 48000);
        assert_eq!(cfg.recorder.max_recording_secs, 2.5);
        assert!(!cfg.recorder.record_microphone);
        assert_eq!(cfg.recorder.channels, 1);
        assert_eq!(cfg.service.tick_interval(), Duration::from_millis(10));
        assert_eq!(cfg.storage.sessions_path, PathBuf::from("/tmp/sessions"));
    }
}

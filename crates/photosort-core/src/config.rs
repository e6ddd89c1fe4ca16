//! Configuration module for the sync engine.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, and defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for the sync engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub drive: DriveConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Remote drive API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Base URL of the Drive REST API.
    pub api_base: String,
    /// OAuth token endpoint for refresh-token exchange.
    pub token_endpoint: String,
    /// OAuth client id of the application.
    pub client_id: String,
    /// OAuth client secret (confidential web-application client).
    pub client_secret: Option<String>,
}

/// Synchronization tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Default number of folders expanded per `run_sync_batch` call.
    pub folder_budget: usize,
    /// Refresh the access token when it expires within this many seconds.
    pub token_refresh_margin_secs: u64,
    /// Seconds between batches in the background sync loop.
    pub background_delay_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            client_id: String::new(),
            client_secret: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            folder_budget: 25,
            token_refresh_margin_secs: 300,
            background_delay_secs: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Validate tuning values that would otherwise wedge the engine.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sync.folder_budget == 0 {
            anyhow::bail!("sync.folder_budget must be at least 1");
        }
        if self.drive.api_base.is_empty() {
            anyhow::bail!("drive.api_base must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sync.folder_budget, 25);
        assert_eq!(config.sync.token_refresh_margin_secs, 300);
        assert!(config.drive.api_base.contains("googleapis.com"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
drive:
  api_base: "http://localhost:9999/drive/v3"
  token_endpoint: "http://localhost:9999/token"
  client_id: "test-client"
  client_secret: "hunter2"
sync:
  folder_budget: 5
  token_refresh_margin_secs: 60
  background_delay_secs: 1
logging:
  level: "debug"
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.sync.folder_budget, 5);
        assert_eq!(config.drive.client_id, "test-client");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_rejects_zero_budget() {
        let yaml = r#"
drive:
  api_base: "http://localhost"
  token_endpoint: "http://localhost/token"
  client_id: "c"
sync:
  folder_budget: 0
  token_refresh_margin_secs: 60
  background_delay_secs: 1
logging:
  level: "info"
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/photosort.yaml"));
        assert_eq!(config.sync.folder_budget, 25);
    }
}

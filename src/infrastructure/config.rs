//! Configuration infrastructure
//!
//! Contains configuration loading and management for feed harvesting.
//!
//! Configuration is organized into four sections:
//! 1. Crawl bounds and timing
//! 2. Field extraction heuristics
//! 3. CSS selector fallbacks
//! 4. Logging

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::infrastructure::parsing::{ExtractionConfig, FeedSelectors};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Crawl bounds and timing
    pub crawl: CrawlConfig,

    /// Field extraction heuristics
    pub extraction: ExtractionConfig,

    /// Selector fallback lists per role
    pub selectors: FeedSelectors,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Crawl bounds and timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Number of unique records to collect before stopping
    pub target_count: usize,

    /// Consecutive steps without height change before the feed counts as exhausted
    pub stagnation_ceiling: u32,

    /// Wait after each advance for new content to render
    pub settle_delay_ms: u64,

    /// Extra wait after a step that did not change the height
    pub stagnation_backoff_ms: u64,

    /// Upper bound on a single document-tree call
    pub call_timeout_ms: u64,
}

impl CrawlConfig {
    /// Reject settings the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.target_count == 0 {
            bail!("target_count must be at least 1");
        }
        if self.call_timeout_ms == 0 {
            bail!("call_timeout_ms must be at least 1");
        }
        Ok(())
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            target_count: defaults::TARGET_COUNT,
            stagnation_ceiling: defaults::STAGNATION_CEILING,
            settle_delay_ms: defaults::SETTLE_DELAY_MS,
            stagnation_backoff_ms: defaults::STAGNATION_BACKOFF_MS,
            call_timeout_ms: defaults::CALL_TIMEOUT_MS,
        }
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for log files; next to the executable when unset
    pub log_dir: Option<PathBuf>,

    /// Log file name
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: None,
            file_name: defaults::LOG_FILE_NAME.to_string(),
        }
    }
}

/// Configuration manager for loading and saving settings
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Create a configuration manager for the per-user config file
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME);
        Ok(Self { config_path })
    }

    /// Create a configuration manager for an explicit file
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !fs::try_exists(&self.config_path).await.unwrap_or(false) {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                info!("Loaded configuration from: {:?}", self.config_path);
                Ok(config)
            }
            Err(parse_error) => {
                warn!("Configuration file is invalid: {}", parse_error);

                let backup_path = self.config_path.with_extension("json.corrupted");
                if let Err(e) = fs::copy(&self.config_path, &backup_path).await {
                    warn!("Failed to create backup of corrupted config: {}", e);
                } else {
                    info!("Backed up corrupted config to: {:?}", backup_path);
                }

                let default_config = AppConfig::default();
                self.save_config(&default_config)
                    .await
                    .context("Failed to save default configuration")?;

                info!("Reset to default configuration");
                Ok(default_config)
            }
        }
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Update crawl settings in place
    pub async fn update_crawl_config<F>(&self, updater: F) -> Result<AppConfig>
    where
        F: FnOnce(&mut CrawlConfig),
    {
        let mut config = self.load_config().await?;
        updater(&mut config.crawl);
        config.crawl.validate()?;
        self.save_config(&config).await?;
        Ok(config)
    }
}

/// Default configuration values
pub mod defaults {
    /// Directory name under the user config directory
    pub const APP_DIR_NAME: &str = "feed-harvester";

    /// Configuration file name
    pub const CONFIG_FILE_NAME: &str = "feed_harvester_config.json";

    /// Default number of unique records to collect
    pub const TARGET_COUNT: usize = 100;

    /// Default number of stagnant steps before giving up
    pub const STAGNATION_CEILING: u32 = 5;

    /// Default wait after each advance in milliseconds
    pub const SETTLE_DELAY_MS: u64 = 3000;

    /// Default extra wait after a stagnant step in milliseconds
    pub const STAGNATION_BACKOFF_MS: u64 = 2000;

    /// Default bound on one document-tree call in milliseconds
    pub const CALL_TIMEOUT_MS: u64 = 30_000;

    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default log file name
    pub const LOG_FILE_NAME: &str = "feed-harvester.log";
}

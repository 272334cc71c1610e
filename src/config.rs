//! Configuration module for newswire.

use serde::Deserialize;
use std::path::Path;

use crate::{NewswireError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/newswire.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/newswire.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// How articles are written on each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorePolicy {
    /// Merge-upsert every item; stored fields absent from the new payload survive.
    #[default]
    Merge,
    /// Delete every stored article in a prior transaction, then upsert.
    ReplaceArticles,
}

/// Feed store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of records kept after a cycle.
    #[serde(default = "default_retention_cap")]
    pub retention_cap: usize,
    /// Article write policy.
    #[serde(default)]
    pub policy: StorePolicy,
}

fn default_retention_cap() -> usize {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention_cap: default_retention_cap(),
            policy: StorePolicy::default(),
        }
    }
}

/// A single RSS feed and the publisher name its items are attributed to.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedSourceConfig {
    /// Feed URL.
    pub url: String,
    /// Publisher name.
    #[serde(default = "default_source_name")]
    pub source: String,
}

fn default_source_name() -> String {
    "Unknown".to_string()
}

/// RSS article configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticlesConfig {
    /// Configured feeds.
    #[serde(default)]
    pub feeds: Vec<FeedSourceConfig>,
    /// Number of most recent articles kept across all feeds before merge.
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_max_articles() -> usize {
    20
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

impl Default for ArticlesConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            max_articles: default_max_articles(),
            max_feed_size_bytes: default_max_feed_size(),
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

/// Video platform configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VideosConfig {
    /// API key for the video platform.
    #[serde(default)]
    pub api_key: String,
    /// API base URL.
    #[serde(default = "default_video_api_base")]
    pub api_base: String,
    /// Channel identifiers to poll.
    #[serde(default)]
    pub channel_ids: Vec<String>,
    /// Most recent uploads requested per channel.
    #[serde(default = "default_max_results_per_channel")]
    pub max_results_per_channel: u32,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub timeout_secs: u64,
}

fn default_video_api_base() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_max_results_per_channel() -> u32 {
    3
}

impl Default for VideosConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_video_api_base(),
            channel_ids: Vec::new(),
            max_results_per_channel: default_max_results_per_channel(),
            timeout_secs: default_total_timeout(),
        }
    }
}

/// Article image fallback configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    /// Whether to scrape article pages for a thumbnail when the feed has none.
    #[serde(default = "default_images_enabled")]
    pub enabled: bool,
    /// Per-page timeout in seconds.
    #[serde(default = "default_image_timeout")]
    pub timeout_secs: u64,
}

fn default_images_enabled() -> bool {
    true
}

fn default_image_timeout() -> u64 {
    10
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            enabled: default_images_enabled(),
            timeout_secs: default_image_timeout(),
        }
    }
}

/// Push notification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Whether push notifications are sent.
    #[serde(default)]
    pub enabled: bool,
    /// Push project identifier.
    #[serde(default)]
    pub project_id: String,
    /// Bearer access token for the push endpoint.
    #[serde(default)]
    pub access_token: String,
    /// Topic devices subscribe to.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Push endpoint base URL.
    #[serde(default = "default_push_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds.
    #[serde(default = "default_push_timeout")]
    pub timeout_secs: u64,
}

fn default_push_timeout() -> u64 {
    10
}

fn default_topic() -> String {
    "breaking_news".to_string()
}

fn default_push_endpoint() -> String {
    "https://fcm.googleapis.com/v1".to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            project_id: String::new(),
            access_token: String::new(),
            topic: default_topic(),
            endpoint: default_push_endpoint(),
            timeout_secs: default_push_timeout(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Feed store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// RSS article configuration.
    #[serde(default)]
    pub articles: ArticlesConfig,
    /// Video platform configuration.
    #[serde(default)]
    pub videos: VideosConfig,
    /// Image fallback configuration.
    #[serde(default)]
    pub images: ImagesConfig,
    /// Push notification configuration.
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(NewswireError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| NewswireError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `NEWSWIRE_VIDEO_API_KEY`: video platform API key
    /// - `NEWSWIRE_PUSH_TOKEN`: push endpoint access token
    /// - `NEWSWIRE_DATABASE_PATH`: SQLite database path
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = non_empty_env("NEWSWIRE_VIDEO_API_KEY") {
            self.videos.api_key = key;
        }
        if let Some(token) = non_empty_env("NEWSWIRE_PUSH_TOKEN") {
            self.notify.access_token = token;
        }
        if let Some(path) = non_empty_env("NEWSWIRE_DATABASE_PATH") {
            self.database.path = path;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The retention cap is zero
    /// - Channels are configured without an API key
    /// - Notifications are enabled without a project id or access token
    pub fn validate(&self) -> Result<()> {
        if self.store.retention_cap == 0 {
            return Err(NewswireError::Config(
                "store.retention_cap must be at least 1".to_string(),
            ));
        }
        if !self.videos.channel_ids.is_empty() && self.videos.api_key.is_empty() {
            return Err(NewswireError::Config(
                "videos.channel_ids is set but api_key is not. \
                 Set it in config.toml or via NEWSWIRE_VIDEO_API_KEY."
                    .to_string(),
            ));
        }
        if self.notify.enabled
            && (self.notify.project_id.is_empty() || self.notify.access_token.is_empty())
        {
            return Err(NewswireError::Config(
                "notify is enabled but project_id or access_token is not set. \
                 The token can be provided via NEWSWIRE_PUSH_TOKEN."
                    .to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

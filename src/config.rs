//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/bulletin.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:7340"
//!
//! [digest]
//! utc_offset = "+00:00"   # day boundaries for daily summaries
//!
//! [feed]
//! default_limit = 20
//! max_limit = 100
//! ```
//!
//! `[digest]` and `[feed]` are optional.

use anyhow::{Context, Result};
use bulletin_core::window::parse_utc_offset;
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub digest: DigestConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DigestConfig {
    /// Fixed UTC offset used for day boundaries and for "today".
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
        }
    }
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

impl DigestConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    #[serde(default = "default_max_limit")]
    pub max_limit: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> i64 {
    20
}
fn default_max_limit() -> i64 {
    100
}

impl FeedConfig {
    /// Apply the default to a missing limit and cap it at `max_limit`.
    pub fn clamp(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config
        .digest
        .offset()
        .with_context(|| "digest.utc_offset is invalid")?;

    if config.feed.default_limit < 1 {
        anyhow::bail!("feed.default_limit must be >= 1");
    }
    if config.feed.max_limit < config.feed.default_limit {
        anyhow::bail!("feed.max_limit must be >= feed.default_limit");
    }
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    Ok(config)
}

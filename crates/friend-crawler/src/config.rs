//! Application configuration.
//!
//! One YAML file with a section per crate. Every section is optional.
//!
//! ```yaml
//! crawl:
//!   fetch_timeout_ms: 5000
//!   max_nodes: 500
//! layout:
//!   seed: 42
//! viewport:
//!   max_scale: 4
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use friend_graph::CrawlConfig;
use friend_layout::{LayoutConfig, ViewportConfig};

/// Names the config file used when `--config` is absent.
pub const CONFIG_ENV: &str = "FRIEND_CRAWLER_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub crawl: CrawlConfig,
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
}

impl AppConfig {
    /// Load from `path`, or defaults when there is none.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

/// `--config` wins over the environment.
pub fn config_path(flag: Option<PathBuf>) -> Option<PathBuf> {
    flag.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

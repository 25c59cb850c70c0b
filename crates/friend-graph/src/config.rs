//! Crawl configuration.
//!
//! Every field has a default, so an empty YAML document is a valid config.
//!
//! ```yaml
//! rate_limit:
//!   tokens_per_interval: 1
//!   interval_ms: 50
//! fetch_timeout_ms: 8000
//! secondary_depth: 4
//! aliases:
//!   - pattern: '^(.+)\.solid\.community(.*)$'
//!     replacement: '${1}.solidcommunity.net${2}'
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::canonical::AliasRules;
use crate::error::{GraphError, Result};

/// Root configuration for a crawl session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Shared admission control across all concurrent resolutions.
    pub rate_limit: RateLimitConfig,

    /// Upper bound for one profile document fetch.
    pub fetch_timeout_ms: u64,

    /// How many hops of `sameAs`/`seeAlso` documents a profile lookup may chase.
    pub secondary_depth: usize,

    /// Alias rewrite rules, applied in order to a fixpoint.
    pub aliases: Vec<AliasRule>,

    /// Stop scheduling new rounds once this many nodes are known.
    pub max_nodes: Option<usize>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            fetch_timeout_ms: 8000,
            secondary_depth: 4,
            aliases: vec![AliasRule::solid_community()],
            max_nodes: None,
        }
    }
}

impl CrawlConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Outer bound on one whole resolution: one fetch more than the primary
    /// document plus every hop of linked documents can use.
    pub fn resolve_timeout(&self) -> Duration {
        let fetches = u32::try_from(self.secondary_depth)
            .unwrap_or(u32::MAX)
            .saturating_add(2);
        self.fetch_timeout().saturating_mul(fetches)
    }

    /// Compile the alias rules into a canonicalizer.
    pub fn canonicalizer(&self) -> Result<AliasRules> {
        AliasRules::new(&self.aliases)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| GraphError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Token bucket parameters: `tokens_per_interval` permits every `interval_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub tokens_per_interval: u32,
    pub interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            tokens_per_interval: 1,
            interval_ms: 50,
        }
    }
}

impl RateLimitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// One regex rewrite applied during canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRule {
    pub pattern: String,
    pub replacement: String,
}

impl AliasRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }

    pub fn solid_community() -> Self {
        Self::new(r"^(.+)\.solid\.community(.*)$", "${1}.solidcommunity.net${2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::Canonicalize;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(CrawlConfig::from_yaml("").unwrap(), CrawlConfig::default());
        assert_eq!(CrawlConfig::from_yaml("{}").unwrap(), CrawlConfig::default());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
rate_limit:
  tokens_per_interval: 4
  interval_ms: 100
fetch_timeout_ms: 2500
max_nodes: 200
aliases:
  - pattern: '^http://'
    replacement: 'https://'
"#;
        let config = CrawlConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.rate_limit.tokens_per_interval, 4);
        assert_eq!(config.rate_limit.interval(), Duration::from_millis(100));
        assert_eq!(config.fetch_timeout(), Duration::from_millis(2500));
        assert_eq!(config.secondary_depth, 4);
        assert_eq!(config.resolve_timeout(), Duration::from_millis(15_000));
        assert_eq!(config.max_nodes, Some(200));

        let canon = config.canonicalizer().unwrap();
        assert_eq!(canon.canonicalize("http://a.org/#me").as_str(), "https://a.org/#me");
    }

    #[test]
    fn test_partial_rate_limit_keeps_defaults() {
        let config = CrawlConfig::from_yaml("rate_limit:\n  interval_ms: 10\n").unwrap();
        assert_eq!(config.rate_limit.tokens_per_interval, 1);
        assert_eq!(config.rate_limit.interval_ms, 10);
    }

    #[test]
    fn test_missing_file() {
        let err = CrawlConfig::from_file("/nonexistent/friend-crawler.yaml").unwrap_err();
        assert!(matches!(err, GraphError::ConfigIo { .. }));
    }

    #[test]
    fn test_default_resolve_timeout_matches_crawler_default() {
        assert_eq!(CrawlConfig::default().resolve_timeout(), crate::DEFAULT_RESOLVE_TIMEOUT);
    }

    #[test]
    fn test_default_alias_compiles() {
        let canon = CrawlConfig::default().canonicalizer().unwrap();
        assert_eq!(canon.len(), 1);
    }
}

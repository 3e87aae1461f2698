//! Runtime settings loaded from an optional YAML file.
//!
//! Every key is optional; missing keys fall back to the defaults below.
//!
//! ```yaml
//! user_agent: "ContestCrawler (+https://example.com/)"
//! connect_timeout_secs: 5
//! read_timeout_secs: 15
//! max_retries: 2
//! backoff_secs: 1
//! concurrency: 1
//! millis_threshold: 1000000000000
//! limits:
//!   cf: 6
//!   lc: 3
//! ```

use crate::error::ConfigError;
use crate::models::Site;
use crate::utils::DEFAULT_MILLIS_THRESHOLD;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_USER_AGENT: &str = "ContestCrawler (+https://example.com/)";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlerConfig {
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Extra attempts after the first on a retryable status.
    pub max_retries: u32,
    /// Linear backoff unit; attempt `n` waits `n * backoff_secs`.
    pub backoff_secs: u64,
    /// How many sources may be fetched at once.
    pub concurrency: usize,
    pub millis_threshold: i64,
    /// Per-site overrides; sites not listed use [`default_limit`].
    pub limits: BTreeMap<Site, usize>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: 5,
            read_timeout_secs: 15,
            max_retries: 2,
            backoff_secs: 1,
            concurrency: 1,
            millis_threshold: DEFAULT_MILLIS_THRESHOLD,
            limits: BTreeMap::new(),
        }
    }
}

/// Default number of contests kept per site.
pub fn default_limit(site: Site) -> usize {
    match site {
        Site::Codeforces | Site::Nowcoder => 6,
        Site::AtCoder | Site::Luogu => 5,
        Site::LeetCode => 3,
    }
}

impl CrawlerConfig {
    /// Load from `path`, or return defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_string(),
                    source,
                })?;
                let parsed = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
                    path: path.to_string(),
                    source,
                })?;
                info!(path, "Loaded configuration");
                parsed
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.millis_threshold <= 0 {
            return Err(ConfigError::Invalid("millis_threshold must be positive".into()));
        }
        if let Some((site, _)) = self.limits.iter().find(|(_, limit)| **limit == 0) {
            return Err(ConfigError::Invalid(format!(
                "limit for {} must be positive",
                site.id()
            )));
        }
        Ok(())
    }

    pub fn limit(&self, site: Site) -> usize {
        self.limits
            .get(&site)
            .copied()
            .unwrap_or_else(|| default_limit(site))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

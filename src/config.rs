//! Analyzer settings.

use crate::verify::{HttpRangeSource, VerifiedNetworkCache, DEFAULT_RANGES_URL};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Endpoint listing the verified crawler prefixes.
    pub ranges_url: String,
    /// Upper bound for the one-time range fetch.
    pub fetch_timeout_secs: u64,
    /// When false no range fetch happens and no bot is ever verified.
    pub verify_bots: bool,
    /// Worker threads for parsing; CPU count when unset.
    pub threads: Option<usize>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ranges_url: DEFAULT_RANGES_URL.to_string(),
            fetch_timeout_secs: 10,
            verify_bots: true,
            threads: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn thread_count(&self) -> usize {
        self.threads.filter(|n| *n > 0).unwrap_or_else(num_cpus::get)
    }

    /// Range cache matching these settings. Nothing is fetched until first use.
    pub fn range_cache(&self) -> VerifiedNetworkCache {
        if self.verify_bots {
            VerifiedNetworkCache::new(HttpRangeSource::new(self.ranges_url.clone(), self.fetch_timeout()))
        } else {
            VerifiedNetworkCache::disabled()
        }
    }
}

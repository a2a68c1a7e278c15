use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            orchestrator: OrchestratorConfig::default(),
            retention: RetentionConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

/// Worker pool sizing and result throttling, shared by every job kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound on simultaneous item invocations (and thus external calls).
    #[serde(default = "default_max_concurrent_workers")]
    pub max_concurrent_workers: usize,
    /// Pause applied after consuming each item result, in seconds.
    #[serde(default = "default_rate_limit_delay_secs")]
    pub rate_limit_delay_secs: f64,
}

fn default_max_concurrent_workers() -> usize {
    5
}

fn default_rate_limit_delay_secs() -> f64 {
    1.0
}

impl OrchestratorConfig {
    pub fn new(max_concurrent_workers: usize, rate_limit_delay: Duration) -> Self {
        Self {
            max_concurrent_workers,
            rate_limit_delay_secs: rate_limit_delay.as_secs_f64(),
        }
    }

    /// The configured pause; values a `Duration` cannot hold count as zero.
    pub fn rate_limit_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.rate_limit_delay_secs).unwrap_or(Duration::ZERO)
    }

    /// Worker count clamped to at least one.
    pub fn worker_count(&self) -> usize {
        self.max_concurrent_workers.max(1)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workers: default_max_concurrent_workers(),
            rate_limit_delay_secs: default_rate_limit_delay_secs(),
        }
    }
}

/// How long finished jobs stay visible in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
    /// Interval of the background sweeper; `0` disables it.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_max_age_hours() -> u64 {
    24
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

impl RetentionConfig {
    pub fn max_age(&self) -> chrono::Duration {
        i64::try_from(self.max_age_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_hours: default_max_age_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file; falls back to `~/.hireflow/data/hireflow.db` when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path
            .clone()
            .or_else(crate::db::default_database_path)
    }
}

use serde::{Deserialize, Serialize};

/// Output format of the final report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Tab-separated `<owner>\t<bytes>` lines
    #[default]
    Text,
    /// Pretty-printed JSON object
    Json,
}

/// Run configuration, mirroring the optional YAML file.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Worker threads: 1 streams sequentially, 0 lets rayon pick, N > 1 shards across N workers
    pub threads: usize,
    /// Records per shard in parallel mode
    pub shard_size: usize,
    /// Report output format
    pub format: ReportFormat,
    /// Default log filter (e.g. "warn", "info", "debug")
    pub log_level: String,
    /// Check that reported totals add up to the consumed bytes
    pub verify: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            shard_size: 4096,
            format: ReportFormat::Text,
            log_level: "warn".to_string(),
            verify: false,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid shard size: must be greater than zero")]
    InvalidShardSize,
    #[error("Invalid log level: '{0}'")]
    InvalidLogLevel(String),
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.shard_size == 0 {
            return Err(ValidationError::InvalidShardSize);
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ValidationError::InvalidLogLevel(self.log_level.clone()));
        }
        Ok(())
    }

    /// Whether records are sharded across a worker pool
    pub fn is_parallel(&self) -> bool {
        self.threads != 1
    }
}

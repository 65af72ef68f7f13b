//! Reconciler configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! replica_id = "admin-1"
//! sync_interval_secs = 43200
//! standby_interval_secs = 20
//! unique_failure_policy = "skip_object"
//!
//! [prefixes]
//! logic = "bkcc_idx_"
//! unique = "bkcc_unique_"
//!
//! [logging]
//! level = "info"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemata_core::ManagedPrefixes;
use schemata_logging::LogConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CatalogError;

/// Default period between completed cycles (12 hours)
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 12 * 60 * 60;

/// Default period between leadership checks while on standby
pub const DEFAULT_STANDBY_INTERVAL_SECS: u64 = 20;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Invalid index catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// What to do with an object whose unique constraints cannot be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueFailurePolicy {
    /// Reconcile the instance table without unique indexes, leaving existing
    /// unique-prefixed indexes in place
    #[default]
    Degrade,
    /// Leave the instance table untouched until the next cycle
    SkipObject,
}

/// Configuration of the sync scheduler and its components
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Identifies this replica in log lines
    pub replica_id: String,

    /// Seconds to wait after a completed cycle
    pub sync_interval_secs: u64,

    /// Seconds to wait after a tick skipped for lack of leadership
    pub standby_interval_secs: u64,

    /// Create catalog tables that are missing from the store
    pub create_missing_system_tables: bool,

    pub unique_failure_policy: UniqueFailurePolicy,

    /// Names that mark indexes as reconciler-owned
    pub prefixes: ManagedPrefixes,

    /// Subscriber settings for the embedding process
    ///
    /// Not read by the sync task. The process hands it to
    /// `schemata_logging::SubscriberBuilder::with_config` at startup, before
    /// spawning the task, so one TOML file configures both.
    pub logging: LogConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            replica_id: "local".to_string(),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            standby_interval_secs: DEFAULT_STANDBY_INTERVAL_SECS,
            create_missing_system_tables: true,
            unique_failure_policy: UniqueFailurePolicy::default(),
            prefixes: ManagedPrefixes::default(),
            logging: LogConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_interval_secs == 0 {
            return Err(ConfigError::Invalid("sync_interval_secs cannot be 0".to_string()));
        }
        if self.standby_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "standby_interval_secs cannot be 0".to_string(),
            ));
        }
        if self.prefixes.logic.is_empty() || self.prefixes.unique.is_empty() {
            return Err(ConfigError::Invalid(
                "managed index prefixes cannot be empty".to_string(),
            ));
        }
        // One prefix extending the other would make the unique-aware flag meaningless
        if self.prefixes.logic.starts_with(&self.prefixes.unique)
            || self.prefixes.unique.starts_with(&self.prefixes.logic)
        {
            return Err(ConfigError::Invalid(format!(
                "managed index prefixes '{}' and '{}' overlap",
                self.prefixes.logic, self.prefixes.unique
            )));
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn standby_interval(&self) -> Duration {
        Duration::from_secs(self.standby_interval_secs)
    }

    pub fn with_replica_id(mut self, replica_id: impl Into<String>) -> Self {
        self.replica_id = replica_id.into();
        self
    }

    /// Intervals are kept in whole seconds; a fraction rounds up
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval_secs = whole_secs_ceil(interval);
        self
    }

    /// Intervals are kept in whole seconds; a fraction rounds up
    pub fn with_standby_interval(mut self, interval: Duration) -> Self {
        self.standby_interval_secs = whole_secs_ceil(interval);
        self
    }

    pub fn with_create_missing_system_tables(mut self, create: bool) -> Self {
        self.create_missing_system_tables = create;
        self
    }

    pub fn with_unique_failure_policy(mut self, policy: UniqueFailurePolicy) -> Self {
        self.unique_failure_policy = policy;
        self
    }

    pub fn with_prefixes(mut self, prefixes: ManagedPrefixes) -> Self {
        self.prefixes = prefixes;
        self
    }

    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }
}

/// Seconds in `interval`, rounded up so only `Duration::ZERO` maps to 0
fn whole_secs_ceil(interval: Duration) -> u64 {
    interval.as_secs() + u64::from(interval.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.sync_interval(), Duration::from_secs(43_200));
        assert_eq!(config.standby_interval(), Duration::from_secs(20));
        assert!(config.create_missing_system_tables);
        assert_eq!(config.unique_failure_policy, UniqueFailurePolicy::Degrade);
        assert_eq!(config.prefixes.logic, "bkcc_idx_");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SyncConfig::from_toml_str(
            r#"
            replica_id = "admin-2"
            unique_failure_policy = "skip_object"

            [prefixes]
            unique = "cc_unique_"
            "#,
        )
        .unwrap();

        assert_eq!(config.replica_id, "admin-2");
        assert_eq!(config.unique_failure_policy, UniqueFailurePolicy::SkipObject);
        assert_eq!(config.prefixes.logic, "bkcc_idx_");
        assert_eq!(config.prefixes.unique, "cc_unique_");
        assert_eq!(config.standby_interval_secs, DEFAULT_STANDBY_INTERVAL_SECS);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let err = SyncConfig::from_toml_str("sync_interval_secs = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_sub_second_intervals_round_up() {
        let config = SyncConfig::default()
            .with_standby_interval(Duration::from_millis(500))
            .with_sync_interval(Duration::from_millis(1500));

        assert_eq!(config.standby_interval(), Duration::from_secs(1));
        assert_eq!(config.sync_interval(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_builder_fails_validation() {
        let config = SyncConfig::default().with_standby_interval(Duration::ZERO);
        assert_eq!(config.standby_interval_secs, 0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_overlapping_prefixes() {
        let config =
            SyncConfig::default().with_prefixes(ManagedPrefixes::new("bkcc_", "bkcc_unique_"));
        assert!(config.validate().is_err());

        let config = SyncConfig::default().with_prefixes(ManagedPrefixes::new("", "u_"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_policy_is_a_parse_error() {
        let err = SyncConfig::from_toml_str(r#"unique_failure_policy = "panic""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "standby_interval_secs = 5").unwrap();
        writeln!(file, "[logging]").unwrap();
        writeln!(file, "level = \"debug\"").unwrap();

        let config = SyncConfig::from_file(file.path()).unwrap();
        assert_eq!(config.standby_interval(), Duration::from_secs(5));
        assert_eq!(config.logging.level, "debug");

        let err = SyncConfig::from_file(file.path().with_extension("missing")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

//! Configuration types

use crate::{ConfigError, RolodexResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// DEFAULTS
// ============================================================================

/// Days a tombstone stays visible to sync clients before purge.
pub const DEFAULT_TOMBSTONE_RETENTION_DAYS: u64 = 30;

/// Default SQLite busy timeout in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Default interval between purge cycles (1 hour).
pub const DEFAULT_PURGE_INTERVAL_SECS: u64 = 3_600;

/// Default maximum number of tombstones purged per cycle.
pub const DEFAULT_PURGE_BATCH_SIZE: usize = 500;

/// Default maximum number of unstamped contacts repaired per cycle.
pub const DEFAULT_RESTAMP_LIMIT: usize = 100;

const SECS_PER_DAY: u64 = 86_400;

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

// ============================================================================
// STORE CONFIG
// ============================================================================

/// Settings for opening a contact store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// SQLite database file. `None` opens an in-memory database.
    pub database_path: Option<PathBuf>,
    /// How long a writer waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
    /// Tombstone retention in days.
    pub tombstone_retention_days: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            tombstone_retention_days: DEFAULT_TOMBSTONE_RETENTION_DAYS,
        }
    }
}

impl StoreConfig {
    /// In-memory store with default settings.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed store with default settings.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `ROLODEX_DB_PATH`: database file (default: in-memory)
    /// - `ROLODEX_DB_BUSY_TIMEOUT_MS`: busy timeout (default: 5000)
    /// - `ROLODEX_TOMBSTONE_RETENTION_DAYS`: tombstone retention (default: 30)
    pub fn from_env() -> Self {
        Self {
            database_path: std::env::var("ROLODEX_DB_PATH").ok().map(PathBuf::from),
            busy_timeout_ms: env_parse("ROLODEX_DB_BUSY_TIMEOUT_MS")
                .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS),
            tombstone_retention_days: env_parse("ROLODEX_TOMBSTONE_RETENTION_DAYS")
                .unwrap_or(DEFAULT_TOMBSTONE_RETENTION_DAYS),
        }
    }

    /// Load a configuration from a TOML file and validate it.
    pub fn from_toml_path(path: &Path) -> RolodexResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            reason: format!("{}: {}", path.display(), e),
        })?;
        let config: StoreConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Retention as a duration, saturating for absurdly large day counts.
    pub fn tombstone_retention(&self) -> Duration {
        Duration::from_secs(self.tombstone_retention_days.saturating_mul(SECS_PER_DAY))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> RolodexResult<()> {
        if let Some(path) = &self.database_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "database_path".to_string(),
                    value: String::new(),
                    reason: "must not be empty".to_string(),
                }
                .into());
            }
        }
        if self.tombstone_retention_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tombstone_retention_days".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

// ============================================================================
// PURGE CONFIG
// ============================================================================

/// Configuration for the background tombstone purge task.
///
/// The retention window itself belongs to the store
/// ([`StoreConfig::tombstone_retention_days`]).
#[derive(Debug, Clone, PartialEq)]
pub struct PurgeConfig {
    /// How often to run a purge cycle (default: 1 hour)
    pub check_interval: Duration,

    /// Maximum tombstones removed per cycle (default: 500)
    pub batch_size: usize,

    /// Maximum unstamped contacts re-stamped per cycle (default: 100)
    pub restamp_limit: usize,

    /// Whether to report every purge cycle at info level (default: false)
    pub log_purges: bool,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(DEFAULT_PURGE_INTERVAL_SECS),
            batch_size: DEFAULT_PURGE_BATCH_SIZE,
            restamp_limit: DEFAULT_RESTAMP_LIMIT,
            log_purges: false,
        }
    }
}

impl PurgeConfig {
    /// Create PurgeConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `ROLODEX_PURGE_INTERVAL_SECS`: cycle interval (default: 3600)
    /// - `ROLODEX_PURGE_BATCH_SIZE`: tombstones per cycle (default: 500)
    /// - `ROLODEX_RESTAMP_LIMIT`: re-stamps per cycle (default: 100)
    /// - `ROLODEX_PURGE_LOG`: report every cycle at info level (default: false)
    pub fn from_env() -> Self {
        Self {
            check_interval: Duration::from_secs(
                env_parse("ROLODEX_PURGE_INTERVAL_SECS").unwrap_or(DEFAULT_PURGE_INTERVAL_SECS),
            ),
            batch_size: env_parse("ROLODEX_PURGE_BATCH_SIZE").unwrap_or(DEFAULT_PURGE_BATCH_SIZE),
            restamp_limit: env_parse("ROLODEX_RESTAMP_LIMIT").unwrap_or(DEFAULT_RESTAMP_LIMIT),
            log_purges: std::env::var("ROLODEX_PURGE_LOG")
                .map(|s| s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Short intervals for development and tests.
    pub fn development() -> Self {
        Self {
            check_interval: Duration::from_millis(50),
            batch_size: 10,
            restamp_limit: 10,
            log_purges: true,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> RolodexResult<()> {
        if self.check_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "check_interval".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RolodexError;
    use std::io::Write;

    #[test]
    fn test_store_config_default() {
        let config = StoreConfig::default();
        assert!(config.database_path.is_none());
        assert_eq!(config.tombstone_retention_days, 30);
        assert_eq!(config.tombstone_retention(), Duration::from_secs(30 * 86_400));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_store_config_rejects_zero_retention() {
        let config = StoreConfig {
            tombstone_retention_days: 0,
            ..StoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(RolodexError::Config(_))));
    }

    #[test]
    fn test_store_config_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database_path = \"/tmp/contacts.db\"\nbusy_timeout_ms = 250\ntombstone_retention_days = 7"
        )
        .unwrap();
        let config = StoreConfig::from_toml_path(file.path()).unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/contacts.db")));
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert_eq!(config.tombstone_retention_days, 7);
    }

    #[test]
    fn test_store_config_toml_unknown_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "busy_timeout_ms = 1\ntombstone_retention_days = 1\ncolour = 3").unwrap();
        let err = StoreConfig::from_toml_path(file.path()).unwrap_err();
        assert!(matches!(
            err,
            RolodexError::Config(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_huge_retention_saturates() {
        let config = StoreConfig {
            tombstone_retention_days: u64::MAX / 10,
            ..StoreConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.tombstone_retention(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_from_env_reads_overrides() {
        // Only this test touches these variables.
        std::env::set_var("ROLODEX_TOMBSTONE_RETENTION_DAYS", "7");
        std::env::set_var("ROLODEX_PURGE_BATCH_SIZE", "25");
        std::env::set_var("ROLODEX_PURGE_LOG", "TRUE");
        let store = StoreConfig::from_env();
        let purge = PurgeConfig::from_env();
        std::env::remove_var("ROLODEX_TOMBSTONE_RETENTION_DAYS");
        std::env::remove_var("ROLODEX_PURGE_BATCH_SIZE");
        std::env::remove_var("ROLODEX_PURGE_LOG");

        assert_eq!(store.tombstone_retention_days, 7);
        assert_eq!(store.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(purge.batch_size, 25);
        assert_eq!(purge.restamp_limit, DEFAULT_RESTAMP_LIMIT);
        assert!(purge.log_purges);
    }

    #[test]
    fn test_purge_config_default() {
        let config = PurgeConfig::default();
        assert_eq!(config.check_interval, Duration::from_secs(DEFAULT_PURGE_INTERVAL_SECS));
        assert_eq!(config.batch_size, DEFAULT_PURGE_BATCH_SIZE);
        assert!(!config.log_purges);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_purge_config_development() {
        let config = PurgeConfig::development();
        assert_eq!(config.batch_size, 10);
        assert!(config.log_purges);
    }

    #[test]
    fn test_purge_config_rejects_zero_batch() {
        let config = PurgeConfig {
            batch_size: 0,
            ..PurgeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

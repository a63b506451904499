//! Toolbox configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ToolboxError, ToolboxResult};

/// Default deadline for the migration tool.
pub const DEFAULT_MIGRATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Configuration for the external tools the toolbox invokes.
///
/// Can be loaded from TOML:
///
/// ```toml
/// pg_dump_bin = "/usr/lib/postgresql/16/bin/pg_dump"
/// migrate_bin = "migrate"
/// migration_timeout_secs = 120
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ToolboxConfig {
    /// Dump executable (looked up on `PATH` when not a path).
    pub pg_dump_bin: PathBuf,
    /// Migration executable (looked up on `PATH` when not a path).
    pub migrate_bin: PathBuf,
    /// Deadline for a migration run, in seconds.
    #[serde(rename = "migration_timeout_secs", with = "duration_secs")]
    pub migration_timeout: Duration,
    /// Environment variable used to hand the password to the dump tool.
    pub password_env: String,
}

impl Default for ToolboxConfig {
    fn default() -> Self {
        Self {
            pg_dump_bin: PathBuf::from("pg_dump"),
            migrate_bin: PathBuf::from("migrate"),
            migration_timeout: DEFAULT_MIGRATION_TIMEOUT,
            password_env: "PGPASSWORD".to_string(),
        }
    }
}

impl ToolboxConfig {
    /// Create a builder for configuration.
    pub fn builder() -> ToolboxConfigBuilder {
        ToolboxConfigBuilder::new()
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ToolboxResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ToolboxError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ToolboxResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ToolboxError::config(format!("invalid toolbox config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ToolboxResult<()> {
        if self.pg_dump_bin.as_os_str().is_empty() {
            return Err(ToolboxError::config("pg_dump_bin must not be empty"));
        }
        if self.migrate_bin.as_os_str().is_empty() {
            return Err(ToolboxError::config("migrate_bin must not be empty"));
        }
        if self.migration_timeout.is_zero() {
            return Err(ToolboxError::config("migration timeout must be positive"));
        }
        if self.password_env.is_empty() || self.password_env.contains('=') {
            return Err(ToolboxError::config(format!(
                "invalid password environment variable name: {:?}",
                self.password_env
            )));
        }
        Ok(())
    }
}

/// Builder for toolbox configuration.
#[derive(Debug, Default)]
pub struct ToolboxConfigBuilder {
    pg_dump_bin: Option<PathBuf>,
    migrate_bin: Option<PathBuf>,
    migration_timeout: Option<Duration>,
    password_env: Option<String>,
}

impl ToolboxConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dump executable.
    pub fn pg_dump_bin(mut self, bin: impl Into<PathBuf>) -> Self {
        self.pg_dump_bin = Some(bin.into());
        self
    }

    /// Set the migration executable.
    pub fn migrate_bin(mut self, bin: impl Into<PathBuf>) -> Self {
        self.migrate_bin = Some(bin.into());
        self
    }

    /// Set the migration deadline.
    pub fn migration_timeout(mut self, timeout: Duration) -> Self {
        self.migration_timeout = Some(timeout);
        self
    }

    /// Set the environment variable that carries the password.
    pub fn password_env(mut self, name: impl Into<String>) -> Self {
        self.password_env = Some(name.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ToolboxResult<ToolboxConfig> {
        let defaults = ToolboxConfig::default();
        let config = ToolboxConfig {
            pg_dump_bin: self.pg_dump_bin.unwrap_or(defaults.pg_dump_bin),
            migrate_bin: self.migrate_bin.unwrap_or(defaults.migrate_bin),
            migration_timeout: self.migration_timeout.unwrap_or(defaults.migration_timeout),
            password_env: self.password_env.unwrap_or(defaults.password_env),
        };
        config.validate()?;
        Ok(config)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = ToolboxConfig::default();
        assert_eq!(config.pg_dump_bin, PathBuf::from("pg_dump"));
        assert_eq!(config.migrate_bin, PathBuf::from("migrate"));
        assert_eq!(config.migration_timeout, Duration::from_secs(300));
        assert_eq!(config.password_env, "PGPASSWORD");
    }

    #[test]
    fn test_config_from_toml() {
        let config = ToolboxConfig::from_str(
            r#"
            pg_dump_bin = "/opt/pg/bin/pg_dump"
            migration_timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.pg_dump_bin, PathBuf::from("/opt/pg/bin/pg_dump"));
        assert_eq!(config.migrate_bin, PathBuf::from("migrate"));
        assert_eq!(config.migration_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        let result = ToolboxConfig::from_str("pg_restore_bin = \"x\"");
        assert!(matches!(result, Err(ToolboxError::Config(_))));
    }

    #[test]
    fn test_config_rejects_zero_timeout() {
        let result = ToolboxConfig::from_str("migration_timeout_secs = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ToolboxConfig::builder()
            .migrate_bin("/usr/local/bin/migrate")
            .migration_timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        assert_eq!(config.migrate_bin, PathBuf::from("/usr/local/bin/migrate"));
        assert_eq!(config.migration_timeout, Duration::from_secs(10));
        assert_eq!(config.pg_dump_bin, PathBuf::from("pg_dump"));
    }

    #[test]
    fn test_config_builder_rejects_bad_env_name() {
        let result = ToolboxConfig::builder().password_env("PG=PASS").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_from_missing_file() {
        let result = ToolboxConfig::from_file("/nonexistent/psql-toolbox.toml");
        assert!(matches!(result, Err(ToolboxError::Io { .. })));
    }
}

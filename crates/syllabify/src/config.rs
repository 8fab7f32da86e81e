//! Configuration management for syllabify.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "syllabify";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "syllabify.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "SYLLABIFY_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SYLLABIFY_`)
/// 2. TOML config file at `~/.config/syllabify/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Field length limits and listing sizes.
    pub limits: LimitsConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/syllabify/syllabify.db`
    pub database_path: Option<PathBuf>,
}

/// Limits applied to records before they are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum username length in characters.
    pub max_username_length: usize,
    /// Maximum course name length in characters.
    pub max_name_length: usize,
    /// Maximum term length in characters.
    pub max_term_length: usize,
    /// Maximum assignment title (and schedule label) length in characters.
    pub max_title_length: usize,
    /// Default number of rows returned by listings.
    pub list_limit: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_username_length: 64,
            max_name_length: 200,
            max_term_length: 64,
            max_title_length: 300,
            list_limit: 100,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the layered figment without extracting it.
    fn figment(config_file: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("max_username_length", self.limits.max_username_length),
            ("max_name_length", self.limits.max_name_length),
            ("max_term_length", self.limits.max_term_length),
            ("max_title_length", self.limits.max_title_length),
            ("list_limit", self.limits.list_limit),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must be greater than 0"),
                });
            }
        }
        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_limits() {
        let limits = LimitsConfig::default();

        assert_eq!(limits.max_username_length, 64);
        assert_eq!(limits.max_name_length, 200);
        assert_eq!(limits.max_term_length, 64);
        assert_eq!(limits.max_title_length, 300);
        assert_eq!(limits.list_limit, 100);
    }

    #[test]
    fn test_default_storage_config() {
        assert!(StorageConfig::default().database_path.is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_limit() {
        let mut config = Config::default();
        config.limits.max_term_length = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_term_length"));
    }

    #[test]
    fn test_validate_zero_list_limit() {
        let mut config = Config::default();
        config.limits.list_limit = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("syllabify.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("syllabify"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    // Loading reads SYLLABIFY_* variables; keep these inside a figment Jail.

    #[test]
    fn test_load_nonexistent_config() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(PathBuf::from("missing.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                "[storage]\ndatabase_path = \"/tmp/courses.db\"\n\n[limits]\nmax_name_length = 80\n",
            )?;

            let config = Config::load_from(Some(PathBuf::from("config.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.database_path(), PathBuf::from("/tmp/courses.db"));
            assert_eq!(config.limits.max_name_length, 80);
            assert_eq!(config.limits.max_title_length, 300);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                "[limits]\nlist_limit = 20\nmax_name_length = 80\n",
            )?;
            jail.set_env("SYLLABIFY_LIMITS__LIST_LIMIT", "5");
            jail.set_env("SYLLABIFY_STORAGE__DATABASE_PATH", "/tmp/from-env.db");

            let config = Config::load_from(Some(PathBuf::from("config.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.limits.list_limit, 5);
            assert_eq!(config.limits.max_name_length, 80);
            assert_eq!(config.database_path(), PathBuf::from("/tmp/from-env.db"));
            Ok(())
        });
    }

    #[test]
    fn test_env_single_underscore_does_not_nest() {
        Jail::expect_with(|jail| {
            jail.set_env("SYLLABIFY_LIMITS_LIST_LIMIT", "5");

            let config = Config::load_from(Some(PathBuf::from("missing.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.limits.list_limit, 100);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_toml_values() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[limits]\nlist_limit = 0\n")?;

            let err = Config::load_from(Some(PathBuf::from("config.toml"))).unwrap_err();
            assert!(matches!(err, Error::ConfigValidation { .. }));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_env_values() {
        Jail::expect_with(|jail| {
            jail.set_env("SYLLABIFY_LIMITS__MAX_TERM_LENGTH", "0");

            let err = Config::load_from(Some(PathBuf::from("missing.toml"))).unwrap_err();
            assert!(err.to_string().contains("max_term_length"));
            Ok(())
        });
    }

    #[test]
    fn test_limits_config_deserialize() {
        let json = r#"{"max_name_length": 50}"#;
        let limits: LimitsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(limits.max_name_length, 50);
        assert_eq!(limits.list_limit, 100);
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("max_username_length"));
        assert!(json.contains("database_path"));
    }
}

//! # App Configuration
//!
//! Settings for this install of the app (not the shop's own details, which
//! live in the database).
//!
//! ## Load Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Defaults          AppConfig::default()                              │
//! │  2. TOML file         <config dir>/anvil.toml   (if present)            │
//! │  3. Environment       ANVIL_DB_PATH, ANVIL_EXPORT_DIR,                  │
//! │                       ANVIL_BALANCE_POLICY, ANVIL_BIOMETRIC_FAIL_OPEN   │
//! │  4. validate()                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example File
//! ```toml
//! database_path = "/home/shop/anvil/anvil.db"
//! export_dir = "/home/shop/Downloads"
//! balance_policy = "clamp_at_zero"
//! biometric_fail_open = true
//! ```

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use anvil_core::BalancePolicy;

const CONFIG_FILE: &str = "anvil.toml";
const DATABASE_FILE: &str = "anvil.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config directory available on this platform")]
    NoConfigDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Where workbooks and PDFs are written.
    pub export_dir: PathBuf,

    /// What a payment larger than a party's due does to the balance.
    pub balance_policy: BalancePolicy,

    /// Let the user in when the biometric check errors out.
    pub biometric_fail_open: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let dirs = project_dirs();
        let database_path = dirs
            .as_ref()
            .map(|d| d.data_dir().join(DATABASE_FILE))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE));
        let export_dir = directories::UserDirs::new()
            .and_then(|u| u.download_dir().map(|d| d.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        AppConfig {
            database_path,
            export_dir,
            balance_policy: BalancePolicy::default(),
            biometric_fail_open: true,
        }
    }
}

impl AppConfig {
    /// Loads configuration from the given file (or the default location),
    /// then applies environment overrides and validates.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(path)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database_path must not be empty".into()));
        }
        if self.export_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("export_dir must not be empty".into()));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("ANVIL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = PathBuf::from(path);
        }

        if let Ok(dir) = std::env::var("ANVIL_EXPORT_DIR") {
            self.export_dir = PathBuf::from(dir);
        }

        if let Ok(policy) = std::env::var("ANVIL_BALANCE_POLICY") {
            match parse_policy(&policy) {
                Some(parsed) => self.balance_policy = parsed,
                None => warn!(value = %policy, "Ignoring unknown ANVIL_BALANCE_POLICY"),
            }
        }

        if let Ok(flag) = std::env::var("ANVIL_BIOMETRIC_FAIL_OPEN") {
            match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => self.biometric_fail_open = true,
                "0" | "false" | "no" => self.biometric_fail_open = false,
                _ => warn!(value = %flag, "Ignoring unknown ANVIL_BIOMETRIC_FAIL_OPEN"),
            }
        }
    }

    /// `<platform config dir>/anvil.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "anvil", "anvil")
}

fn parse_policy(text: &str) -> Option<BalancePolicy> {
    match text.trim().to_lowercase().replace('-', "_").as_str() {
        "allow_negative" | "negative" => Some(BalancePolicy::AllowNegative),
        "clamp_at_zero" | "clamp" => Some(BalancePolicy::ClampAtZero),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.biometric_fail_open);
        assert_eq!(config.balance_policy, BalancePolicy::AllowNegative);
        assert!(config.database_path.ends_with("anvil.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anvil.toml");

        let config = AppConfig {
            database_path: dir.path().join("shop.db"),
            export_dir: dir.path().to_path_buf(),
            balance_policy: BalancePolicy::ClampAtZero,
            biometric_fail_open: false,
        };
        config.save(Some(path.clone())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("balance_policy = \"clamp_at_zero\""));

        let loaded: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let loaded: AppConfig = toml::from_str("biometric_fail_open = false\n").unwrap();
        assert!(!loaded.biometric_fail_open);
        assert_eq!(loaded.balance_policy, BalancePolicy::AllowNegative);
    }

    #[test]
    fn test_validate_rejects_empty_paths() {
        let config = AppConfig {
            database_path: PathBuf::new(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!(parse_policy("Clamp-At-Zero"), Some(BalancePolicy::ClampAtZero));
        assert_eq!(parse_policy("negative"), Some(BalancePolicy::AllowNegative));
        assert_eq!(parse_policy("sometimes"), None);
    }
}

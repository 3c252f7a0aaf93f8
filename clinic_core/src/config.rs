//! Configuration file support for the clinic system.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/clinic/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub booking: BookingConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Appointment booking configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Required fee in the currency's smallest unit
    #[serde(default = "default_fee")]
    pub fee: u64,

    /// Display symbol for the fee's base unit
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            fee: default_fee(),
            currency: default_currency(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .map(|home| home.join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("clinic")
}

/// One unit of base currency, expressed in 18-decimal smallest units
fn default_fee() -> u64 {
    1_000_000_000_000_000_000
}

fn default_currency() -> String {
    "ETH".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("clinic").join("config.toml")
    }

    /// Reject settings no booking could ever satisfy
    pub fn validate(&self) -> Result<()> {
        if self.booking.fee == 0 {
            return Err(Error::Config("booking fee must be positive".into()));
        }
        Ok(())
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.booking.fee, 1_000_000_000_000_000_000);
        assert_eq!(config.booking.currency, "ETH");
        assert!(config.data.data_dir.ends_with("clinic"));
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[booking]
fee = 250
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.booking.fee, 250);
        assert_eq!(config.booking.currency, "ETH"); // default
    }

    #[test]
    fn test_save_and_load_from_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.booking.fee = 42;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.booking.fee, 42);
    }

    #[test]
    fn test_zero_fee_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[booking]\nfee = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}

//! Application configuration.
//!
//! Read from the JSON file given with `--config`, else from
//! `<config_dir>/souq/config.json` when present, else defaults. Every
//! section and field is optional; command-line flags override what is read.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use souq_core::{CacheConfig, CleaningPolicy, ForecastParams, GeneratorConfig, PromotionParams, ReorderParams};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub generator: GeneratorConfig,
    pub cleaning: CleaningPolicy,
    pub promotion: PromotionParams,
    pub reorder: ReorderParams,
    pub forecast: ForecastParams,
    pub cache: CacheConfig,
}

/// Location of the per-user config file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("souq").join("config.json"))
}

impl AppConfig {
    /// Load configuration from `explicit`, or the per-user file if it exists.
    ///
    /// An explicit path that cannot be read is an error; a missing per-user
    /// file is not.
    pub fn load(explicit: Option<&Path>) -> souq_core::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    fn from_file(path: &Path) -> souq_core::Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            souq_core::Error::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            souq_core::Error::InvalidConfig(format!("{}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"generator": {"seed": 7}, "reorder": {"safety_days": 3}}"#).unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.generator.seed, 7);
        assert_eq!(config.generator.num_sales, GeneratorConfig::default().num_sales);
        assert_eq!(config.reorder.safety_days, 3);
        assert_eq!(config.reorder.cycle_days, ReorderParams::default().cycle_days);
        assert_eq!(config.promotion, PromotionParams::default());
    }

    #[test]
    fn test_bad_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(souq_core::Error::InvalidConfig(_))
        ));
        assert!(AppConfig::load(Some(&dir.path().join("absent.json"))).is_err());
    }
}

//! Configuration file support for drip.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/drip/config.toml`.

use crate::{DrugPreset, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub patient: PatientConfig,

    #[serde(default)]
    pub presets: PresetConfig,
}

/// Patient defaults applied when a calculator starts
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PatientConfig {
    #[serde(default)]
    pub default_weight_kg: Option<f64>,
}

/// Additions and overrides for the built-in preset table
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PresetConfig {
    /// Extra drugs; a name matching a built-in replaces it
    #[serde(default)]
    pub custom: Vec<DrugPreset>,

    /// Warning thresholds (µg/kg/min) keyed by preset name
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
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
    pub fn default_config_path() -> Result<PathBuf> {
        let base = match dirs::config_dir() {
            Some(dir) => dir,
            None => std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .ok_or_else(|| Error::Config("cannot locate a config directory".into()))?,
        };
        Ok(base.join("drip").join("config.toml"))
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

    fn validate(&self) -> Result<()> {
        if let Some(weight) = self.patient.default_weight_kg {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(Error::Config(format!(
                    "default_weight_kg must be greater than zero, got {}",
                    weight
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.patient.default_weight_kg.is_none());
        assert!(config.presets.custom.is_empty());
        assert!(config.presets.thresholds.is_empty());
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[presets.thresholds]
Epinephrine = 0.3

[[presets.custom]]
name = "Heparin"
dose_mg = 25000.0
volume_ml = 250.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.patient.default_weight_kg.is_none());
        assert_eq!(config.presets.thresholds["Epinephrine"], 0.3);
        assert_eq!(config.presets.custom[0].name, "Heparin");
        assert_eq!(config.presets.custom[0].warning_threshold_ug_kg_min, None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.patient.default_weight_kg = Some(72.5);
        config.presets.custom.push(DrugPreset {
            name: "Heparin".into(),
            dose_mg: 25000.0,
            volume_ml: 250.0,
            warning_threshold_ug_kg_min: Some(0.5),
        });
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.patient.default_weight_kg, Some(72.5));
        assert_eq!(loaded.presets.custom, config.presets.custom);
    }

    #[test]
    fn test_rejects_bad_weight() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[patient]\ndefault_weight_kg = -3.0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[patient\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Toml(_))));
    }
}

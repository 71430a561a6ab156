//! Default table of drug presets.
//!
//! Presets are static data: a name, the usual bag preparation, and an optional
//! high-dose hint on rate A. Configuration can add drugs or adjust thresholds.

use crate::config::PresetConfig;
use crate::types::*;
use once_cell::sync::Lazy;

/// Cached default preset table, built once and reused
static DEFAULT_PRESETS: Lazy<PresetTable> = Lazy::new(build_default_presets);

/// Get a reference to the cached default preset table
pub fn default_presets() -> &'static PresetTable {
    &DEFAULT_PRESETS
}

/// Ordered, immutable collection of drug presets
#[derive(Clone, Debug, Default)]
pub struct PresetTable {
    presets: Vec<DrugPreset>,
}

/// Builds the built-in preset table
///
/// **Note**: prefer `default_presets()` which returns a cached reference.
pub fn build_default_presets() -> PresetTable {
    PresetTable::new(vec![
        preset("Levophed", 16.0, 266.0, Some(0.5)),
        preset("Dopamine", 800.0, 270.0, Some(20.0)),
        preset("Epinephrine", 10.0, 260.0, None),
        preset("Midazolam", 90.0, 90.0, None),
        preset("Atracurium", 200.0, 100.0, Some(20.0)),
    ])
}

fn preset(name: &str, dose_mg: f64, volume_ml: f64, threshold: Option<f64>) -> DrugPreset {
    DrugPreset {
        name: name.into(),
        dose_mg,
        volume_ml,
        warning_threshold_ug_kg_min: threshold,
    }
}

impl PresetTable {
    pub fn new(presets: Vec<DrugPreset>) -> Self {
        Self { presets }
    }

    /// Merge configured presets and threshold overrides into a copy of this table
    pub fn with_config(&self, config: &PresetConfig) -> PresetTable {
        let mut presets = self.presets.clone();

        for custom in &config.custom {
            match presets
                .iter_mut()
                .find(|p| p.name.eq_ignore_ascii_case(&custom.name))
            {
                Some(existing) => {
                    tracing::info!("Config replaces preset {}", existing.name);
                    *existing = custom.clone();
                }
                None => presets.push(custom.clone()),
            }
        }

        for (name, threshold) in &config.thresholds {
            match presets.iter_mut().find(|p| p.name.eq_ignore_ascii_case(name)) {
                Some(existing) => existing.warning_threshold_ug_kg_min = Some(*threshold),
                None => tracing::warn!("Threshold configured for unknown preset {}", name),
            }
        }

        PresetTable { presets }
    }

    /// Look up a preset by its exact name
    pub fn get(&self, name: &str) -> Option<&DrugPreset> {
        self.presets.iter().find(|p| p.name == name)
    }

    /// Resolve a name typed by a user; exact match wins over a case-insensitive one
    pub fn resolve(&self, name: &str) -> Option<&DrugPreset> {
        self.get(name)
            .or_else(|| self.presets.iter().find(|p| p.name.eq_ignore_ascii_case(name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrugPreset> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Validate the table and return every problem found
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (idx, p) in self.presets.iter().enumerate() {
            if p.name.trim().is_empty() {
                errors.push(format!("Preset #{} has an empty name", idx + 1));
            }
            if !(p.dose_mg.is_finite() && p.dose_mg > 0.0) {
                errors.push(format!("Preset {} has non-positive dose {}", p.name, p.dose_mg));
            }
            if !(p.volume_ml.is_finite() && p.volume_ml > 0.0) {
                errors.push(format!(
                    "Preset {} has non-positive volume {}",
                    p.name, p.volume_ml
                ));
            }
            if let Some(threshold) = p.warning_threshold_ug_kg_min {
                if !(threshold.is_finite() && threshold >= 0.0) {
                    errors.push(format!(
                        "Preset {} has invalid warning threshold {}",
                        p.name, threshold
                    ));
                }
            }
            if self.presets[..idx]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&p.name))
            {
                errors.push(format!("Preset {} is defined more than once", p.name));
            }
        }

        errors
    }
}

/// Apply a preset's dose and volume, keeping the weight
///
/// Returns `None` when the name is not in the table; callers treat that as a
/// no-op. Callers are responsible for resetting the active field.
pub fn apply_preset(
    table: &PresetTable,
    name: &str,
    params: &InfusionParameters,
) -> Option<InfusionParameters> {
    table.get(name).map(|p| InfusionParameters {
        dose_mg: p.dose_mg,
        volume_ml: p.volume_ml,
        weight_kg: params.weight_kg,
    })
}

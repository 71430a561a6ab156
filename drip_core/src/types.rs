//! Core domain types for the drip rate calculator.
//!
//! This module defines the fundamental types used throughout the system:
//! - Infusion parameters (dose, dilution volume, patient weight)
//! - The three equivalent rate representations
//! - Field identifiers for the editable inputs
//! - Drug presets

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Infusion Parameters
// ============================================================================

/// One patient/drug configuration.
///
/// All three values must be greater than zero for a conversion to take place.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InfusionParameters {
    /// Total drug mass in the bag (mg)
    pub dose_mg: f64,
    /// Total fluid volume of the bag (ml)
    pub volume_ml: f64,
    /// Patient weight (kg)
    pub weight_kg: f64,
}

impl InfusionParameters {
    pub fn new(dose_mg: f64, volume_ml: f64, weight_kg: f64) -> Self {
        Self {
            dose_mg,
            volume_ml,
            weight_kg,
        }
    }

    /// Drug concentration in mg/ml.
    ///
    /// Always derived from the current dose and volume, never cached.
    pub fn concentration_mg_per_ml(&self) -> f64 {
        self.dose_mg / self.volume_ml
    }

    /// True when no parameter has been entered yet (the idle state).
    pub fn is_unset(&self) -> bool {
        self.dose_mg == 0.0 && self.volume_ml == 0.0 && self.weight_kg == 0.0
    }

    /// True when every parameter is a finite number greater than zero.
    pub fn is_valid(&self) -> bool {
        [self.dose_mg, self.volume_ml, self.weight_kg]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

// ============================================================================
// Rates
// ============================================================================

/// The three equivalent representations of one infusion rate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTriple {
    /// Weight-normalized dosing rate (µg/kg/min)
    pub a_ug_kg_min: f64,
    /// Absolute dosing rate (mg/h)
    pub b_mg_hour: f64,
    /// Pump rate (ml/h)
    pub c_ml_hour: f64,
}

impl RateTriple {
    pub const ZERO: RateTriple = RateTriple {
        a_ug_kg_min: 0.0,
        b_mg_hour: 0.0,
        c_ml_hour: 0.0,
    };

    pub fn new(a_ug_kg_min: f64, b_mg_hour: f64, c_ml_hour: f64) -> Self {
        Self {
            a_ug_kg_min,
            b_mg_hour,
            c_ml_hour,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.a_ug_kg_min == 0.0 && self.b_mg_hour == 0.0 && self.c_ml_hour == 0.0
    }

    pub fn get(&self, field: RateField) -> f64 {
        match field {
            RateField::A => self.a_ug_kg_min,
            RateField::B => self.b_mg_hour,
            RateField::C => self.c_ml_hour,
        }
    }

    pub fn set(&mut self, field: RateField, value: f64) {
        match field {
            RateField::A => self.a_ug_kg_min = value,
            RateField::B => self.b_mg_hour = value,
            RateField::C => self.c_ml_hour = value,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.a_ug_kg_min.is_finite() && self.b_mg_hour.is_finite() && self.c_ml_hour.is_finite()
    }
}

/// Successful outcome of a reconciliation
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reconciled {
    /// Nothing to display, no error (idle state)
    Blank,
    /// A consistent set of rates
    Rates(RateTriple),
}

// ============================================================================
// Field Identifiers
// ============================================================================

/// One of the three editable rate fields
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateField {
    A,
    B,
    C,
}

impl RateField {
    pub const ALL: [RateField; 3] = [RateField::A, RateField::B, RateField::C];

    pub fn unit(&self) -> &'static str {
        match self {
            RateField::A => "µg/kg/min",
            RateField::B => "mg/h",
            RateField::C => "ml/h",
        }
    }
}

/// Which rate field, if any, is authoritative for the next reconciliation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActiveField {
    /// Last change was to dose/volume/weight/preset
    #[default]
    None,
    A,
    B,
    C,
}

impl From<RateField> for ActiveField {
    fn from(field: RateField) -> Self {
        match field {
            RateField::A => ActiveField::A,
            RateField::B => ActiveField::B,
            RateField::C => ActiveField::C,
        }
    }
}

/// One of the three infusion parameter fields
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputField {
    Dose,
    Volume,
    Weight,
}

/// Any field a stepper button can target
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Input(InputField),
    Rate(RateField),
}

impl Field {
    /// Parse a field name as typed by a user ("dose", "weight", "a", ...)
    pub fn from_name(name: &str) -> Option<Field> {
        match name.trim().to_lowercase().as_str() {
            "dose" | "dose_mg" => Some(Field::Input(InputField::Dose)),
            "volume" | "vol" | "volume_ml" => Some(Field::Input(InputField::Volume)),
            "weight" | "wt" | "weight_kg" => Some(Field::Input(InputField::Weight)),
            "a" => Some(Field::Rate(RateField::A)),
            "b" => Some(Field::Rate(RateField::B)),
            "c" => Some(Field::Rate(RateField::C)),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Input(InputField::Dose) => "dose",
            Field::Input(InputField::Volume) => "volume",
            Field::Input(InputField::Weight) => "weight",
            Field::Rate(RateField::A) => "A",
            Field::Rate(RateField::B) => "B",
            Field::Rate(RateField::C) => "C",
        };
        f.write_str(name)
    }
}

/// Stepper button direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepDirection {
    Increment,
    Decrement,
}

// ============================================================================
// Presets
// ============================================================================

/// A named drug with its default bag preparation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrugPreset {
    pub name: String,
    pub dose_mg: f64,
    pub volume_ml: f64,
    /// High-dose hint on rate A (µg/kg/min); strictly exceeding it warns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_threshold_ug_kg_min: Option<f64>,
}

impl DrugPreset {
    pub fn concentration_mg_per_ml(&self) -> f64 {
        self.dose_mg / self.volume_ml
    }
}

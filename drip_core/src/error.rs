//! Error types for the drip_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for drip_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Dose, volume, or weight is non-positive while not all are zero
    #[error("dose, dilution volume, and weight must all be greater than zero")]
    Validation,

    /// A conversion could not produce a finite value
    #[error("{0}")]
    Arithmetic(&'static str),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Preset table validation error
    #[error("Preset validation error: {0}")]
    PresetValidation(String),
}

pub const ZERO_CONCENTRATION: &str = "concentration is zero";
pub const OUT_OF_RANGE: &str = "result is out of range";

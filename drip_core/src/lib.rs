#![forbid(unsafe_code)]

//! Core domain model and conversion logic for the drip rate calculator.
//!
//! This crate provides:
//! - Domain types (infusion parameters, rate triple, field identifiers)
//! - Drug preset table
//! - Reconciliation engine for µg/kg/min, mg/h and ml/h
//! - Calculator state with input handlers for front ends
//! - Configuration and logging

pub mod types;
pub mod error;
pub mod presets;
pub mod config;
pub mod logging;
pub mod input;
pub mod engine;
pub mod calculator;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use presets::{apply_preset, build_default_presets, default_presets, PresetTable};
pub use config::Config;
pub use engine::{high_dose_warning, reconcile};
pub use calculator::{Calculator, Rendered};

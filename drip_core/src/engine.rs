//! Reconciliation engine for the three linked infusion rates.
//!
//! Given the infusion parameters, the current rates, and which rate field is
//! authoritative, derive the other two:
//! - A (µg/kg/min) → B = A · weight · 60 / 1000, C = B / concentration
//! - B (mg/h)      → A = B · 1000 / (weight · 60), C = B / concentration
//! - C (ml/h)      → B = C · concentration, A = B · 1000 / (weight · 60)
//!
//! With no authoritative field the rates are passed through untouched.

use crate::error::{OUT_OF_RANGE, ZERO_CONCENTRATION};
use crate::{ActiveField, DrugPreset, Error, InfusionParameters, RateTriple, Reconciled, Result};

const UG_PER_MG: f64 = 1000.0;
const MIN_PER_HOUR: f64 = 60.0;

/// Reconcile the rate triple against the current parameters
///
/// ## Validity gate
///
/// - all of dose, volume, weight exactly zero → `Blank` (idle, no error)
/// - any of them non-positive otherwise → `Error::Validation`
///
/// ## Zero rates
///
/// A zero authoritative value forces the other two to zero. An emptied field
/// and unparseable text both arrive here as zero and behave the same.
///
/// Values are never rounded here; rounding is a display concern.
pub fn reconcile(
    params: &InfusionParameters,
    triple: &RateTriple,
    active: ActiveField,
) -> Result<Reconciled> {
    if !params.is_valid() {
        if params.is_unset() {
            tracing::debug!("No parameters entered yet, result is blank");
            return Ok(Reconciled::Blank);
        }
        tracing::debug!(?params, "Parameters failed validation");
        return Err(Error::Validation);
    }

    let weight = params.weight_kg;
    let concentration = params.concentration_mg_per_ml();

    let result = match active {
        ActiveField::A => {
            let a = triple.a_ug_kg_min;
            if a == 0.0 {
                RateTriple::ZERO
            } else {
                let b = a_to_b(a, weight);
                let c = b / nonzero(concentration)?;
                RateTriple::new(a, b, c)
            }
        }
        ActiveField::B => {
            let b = triple.b_mg_hour;
            if b == 0.0 {
                RateTriple::ZERO
            } else {
                let a = b_to_a(b, weight);
                let c = b / nonzero(concentration)?;
                RateTriple::new(a, b, c)
            }
        }
        ActiveField::C => {
            let c = triple.c_ml_hour;
            if c == 0.0 {
                RateTriple::ZERO
            } else {
                let b = c * nonzero(concentration)?;
                let a = b_to_a(b, weight);
                RateTriple::new(a, b, c)
            }
        }
        ActiveField::None => {
            if triple.is_zero() {
                tracing::debug!("No active field and no rates, result is blank");
                return Ok(Reconciled::Blank);
            }
            // Stale rates are kept as-is rather than recomputed
            *triple
        }
    };

    if !result.is_finite() {
        return Err(Error::Arithmetic(OUT_OF_RANGE));
    }

    tracing::debug!(
        ?active,
        a = result.a_ug_kg_min,
        b = result.b_mg_hour,
        c = result.c_ml_hour,
        "Reconciled rates"
    );
    Ok(Reconciled::Rates(result))
}

/// True iff a preset is selected, defines a threshold, and `a` strictly exceeds it
pub fn high_dose_warning(preset: Option<&DrugPreset>, a_ug_kg_min: f64) -> bool {
    preset
        .and_then(|p| p.warning_threshold_ug_kg_min)
        .map_or(false, |threshold| a_ug_kg_min > threshold)
}

fn a_to_b(a: f64, weight_kg: f64) -> f64 {
    a * weight_kg * MIN_PER_HOUR / UG_PER_MG
}

fn b_to_a(b: f64, weight_kg: f64) -> f64 {
    (b * UG_PER_MG) / (weight_kg * MIN_PER_HOUR)
}

fn nonzero(concentration: f64) -> Result<f64> {
    if concentration == 0.0 {
        tracing::warn!(concentration, "Concentration is zero");
        return Err(Error::Arithmetic(ZERO_CONCENTRATION));
    }
    Ok(concentration)
}

//! Calculator state and input handlers.
//!
//! `Calculator` owns everything a front end needs: the raw text of every
//! field, the unrounded rates, the active field, and the selected preset.
//! Each handler runs one reconciliation and returns what to render.

use crate::engine::{high_dose_warning, reconcile};
use crate::input::{format_input, format_rate, parse_number};
use crate::presets::{apply_preset, PresetTable};
use crate::{
    ActiveField, DrugPreset, Field, InfusionParameters, InputField, RateField, RateTriple,
    Reconciled, StepDirection,
};
use serde::Serialize;

/// What a front end shows after one interaction
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Rendered {
    /// Rate A text, empty when blank
    pub a: String,
    /// Rate B text, empty when blank
    pub b: String,
    /// Rate C text, empty when blank
    pub c: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub high_dose_warning: bool,
}

impl Rendered {
    fn blank() -> Self {
        Self::default()
    }

    fn rates(triple: &RateTriple, high_dose_warning: bool) -> Self {
        Self {
            a: format_rate(triple.a_ug_kg_min),
            b: format_rate(triple.b_mg_hour),
            c: format_rate(triple.c_ml_hour),
            error: None,
            high_dose_warning,
        }
    }

    pub fn text(&self, field: RateField) -> &str {
        match field {
            RateField::A => &self.a,
            RateField::B => &self.b,
            RateField::C => &self.c,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.a.is_empty() && self.b.is_empty() && self.c.is_empty()
    }
}

/// Single-owner calculator session
#[derive(Clone, Debug)]
pub struct Calculator {
    presets: PresetTable,
    dose_text: String,
    volume_text: String,
    weight_text: String,
    rate_texts: [String; 3],
    triple: RateTriple,
    active: ActiveField,
    selected: Option<String>,
}

impl Calculator {
    pub fn new(presets: PresetTable) -> Self {
        Self {
            presets,
            dose_text: String::new(),
            volume_text: String::new(),
            weight_text: String::new(),
            rate_texts: Default::default(),
            triple: RateTriple::ZERO,
            active: ActiveField::None,
            selected: None,
        }
    }

    /// Pre-fill the weight field
    pub fn with_default_weight(mut self, weight_kg: f64) -> Self {
        self.weight_text = format_input(weight_kg);
        self
    }

    pub fn presets(&self) -> &PresetTable {
        &self.presets
    }

    /// Current parameters as parsed from the field texts
    pub fn params(&self) -> InfusionParameters {
        InfusionParameters {
            dose_mg: parse_number(&self.dose_text),
            volume_ml: parse_number(&self.volume_text),
            weight_kg: parse_number(&self.weight_text),
        }
    }

    /// Unrounded rates from the last reconciliation
    pub fn triple(&self) -> RateTriple {
        self.triple
    }

    pub fn active(&self) -> ActiveField {
        self.active
    }

    pub fn selected_preset(&self) -> Option<&DrugPreset> {
        self.selected.as_deref().and_then(|name| self.presets.get(name))
    }

    /// Raw text currently held by a field
    pub fn text(&self, field: Field) -> &str {
        match field {
            Field::Input(InputField::Dose) => &self.dose_text,
            Field::Input(InputField::Volume) => &self.volume_text,
            Field::Input(InputField::Weight) => &self.weight_text,
            Field::Rate(rate) => &self.rate_texts[rate_index(rate)],
        }
    }

    /// Dose, volume, or weight was edited
    pub fn on_field_changed(&mut self, field: InputField, raw: &str) -> Rendered {
        let slot = match field {
            InputField::Dose => &mut self.dose_text,
            InputField::Volume => &mut self.volume_text,
            InputField::Weight => &mut self.weight_text,
        };
        *slot = raw.to_string();
        self.active = ActiveField::None;
        self.update()
    }

    /// A rate field was committed; it becomes authoritative
    pub fn on_rate_field_committed(&mut self, field: RateField, raw: &str) -> Rendered {
        self.rate_texts[rate_index(field)] = raw.to_string();
        self.triple.set(field, parse_number(raw));
        self.active = field.into();
        self.update()
    }

    /// A preset was chosen; unknown names change nothing
    pub fn on_preset_selected(&mut self, name: &str) -> Rendered {
        match apply_preset(&self.presets, name, &self.params()) {
            Some(params) => {
                self.selected = self.presets.get(name).map(|p| p.name.clone());
                self.dose_text = format_input(params.dose_mg);
                self.volume_text = format_input(params.volume_ml);
                self.active = ActiveField::None;
                tracing::info!(preset = ?self.selected, "Preset selected");
            }
            None => tracing::debug!("Ignoring unknown preset {:?}", name),
        }
        self.update()
    }

    /// A +/- button was pressed next to a field
    pub fn on_stepper_clicked(&mut self, field: Field, direction: StepDirection) -> Rendered {
        let current = parse_number(self.text(field));
        let next = match direction {
            StepDirection::Increment => current + 1.0,
            StepDirection::Decrement => (current - 1.0).max(0.0),
        };
        let raw = format_input(next);

        match field {
            Field::Input(input) => self.on_field_changed(input, &raw),
            Field::Rate(rate) => self.on_rate_field_committed(rate, &raw),
        }
    }

    /// Re-run reconciliation without changing any input
    pub fn refresh(&mut self) -> Rendered {
        self.update()
    }

    fn update(&mut self) -> Rendered {
        let rendered = match reconcile(&self.params(), &self.triple, self.active) {
            Ok(Reconciled::Blank) => {
                self.triple = RateTriple::ZERO;
                Rendered::blank()
            }
            Ok(Reconciled::Rates(triple)) => {
                self.triple = triple;
                let warning = high_dose_warning(self.selected_preset(), triple.a_ug_kg_min);
                Rendered::rates(&triple, warning)
            }
            Err(e) => {
                tracing::debug!("Reconciliation failed: {}", e);
                self.triple = RateTriple::ZERO;
                Rendered {
                    error: Some(e.to_string()),
                    ..Rendered::blank()
                }
            }
        };

        for field in RateField::ALL {
            self.rate_texts[rate_index(field)] = rendered.text(field).to_string();
        }
        rendered
    }
}

fn rate_index(field: RateField) -> usize {
    match field {
        RateField::A => 0,
        RateField::B => 1,
        RateField::C => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{build_default_presets, default_presets};

    fn calculator() -> Calculator {
        Calculator::new(default_presets().clone())
    }

    fn levophed_70kg() -> Calculator {
        let mut calc = calculator();
        calc.on_preset_selected("Levophed");
        calc.on_field_changed(InputField::Weight, "70");
        calc
    }

    #[test]
    fn test_initial_state_is_blank() {
        let mut calc = calculator();
        let rendered = calc.refresh();
        assert!(rendered.is_blank());
        assert!(rendered.error.is_none());
        assert!(!rendered.high_dose_warning);
    }

    #[test]
    fn test_levophed_scenario() {
        let mut calc = levophed_70kg();

        let rendered = calc.on_rate_field_committed(RateField::A, "0.5");
        assert_eq!(rendered.a, "0.50");
        assert_eq!(rendered.b, "2.10");
        assert_eq!(rendered.c, "34.91");
        assert!(!rendered.high_dose_warning);

        let rendered = calc.on_rate_field_committed(RateField::A, "0.6");
        assert_eq!(rendered.b, "2.52");
        assert_eq!(rendered.c, "41.90");
        assert!((calc.triple().c_ml_hour - 41.895).abs() < 1e-9);
        assert!(rendered.high_dose_warning);
    }

    #[test]
    fn test_dopamine_scenario() {
        let mut calc = calculator();
        calc.on_preset_selected("Dopamine");
        calc.on_field_changed(InputField::Weight, "80");

        let rendered = calc.on_rate_field_committed(RateField::C, "10");
        assert_eq!(rendered.c, "10.00");
        assert_eq!(rendered.b, "29.63");
        assert_eq!(rendered.a, "6.17");
        assert_eq!(calc.active(), ActiveField::C);
    }

    #[test]
    fn test_emptied_field_zeroes_others() {
        let mut calc = levophed_70kg();
        calc.on_rate_field_committed(RateField::B, "4");

        let rendered = calc.on_rate_field_committed(RateField::B, "");
        assert_eq!((rendered.a.as_str(), rendered.b.as_str(), rendered.c.as_str()), ("0.00", "0.00", "0.00"));

        calc.on_rate_field_committed(RateField::C, "12");
        let rendered = calc.on_rate_field_committed(RateField::C, "abc");
        assert_eq!(rendered.a, "0.00");
        assert_eq!(rendered.b, "0.00");
    }

    #[test]
    fn test_validation_clears_rates() {
        let mut calc = levophed_70kg();
        calc.on_rate_field_committed(RateField::A, "0.6");

        let rendered = calc.on_field_changed(InputField::Volume, "0");
        assert_eq!(
            rendered.error.as_deref(),
            Some("dose, dilution volume, and weight must all be greater than zero")
        );
        assert!(rendered.is_blank());
        assert!(!rendered.high_dose_warning);
        assert!(calc.triple().is_zero());

        // Fixing the input recovers to the idle state
        let rendered = calc.on_field_changed(InputField::Volume, "266");
        assert!(rendered.error.is_none());
        assert!(rendered.is_blank());
    }

    #[test]
    fn test_all_zero_is_blank_not_error() {
        let mut calc = calculator();
        calc.on_field_changed(InputField::Dose, "0");
        calc.on_field_changed(InputField::Volume, "0");
        let rendered = calc.on_field_changed(InputField::Weight, "0");
        assert!(rendered.is_blank());
        assert!(rendered.error.is_none());
    }

    #[test]
    fn test_partial_input_is_error() {
        let mut calc = calculator();
        calc.on_field_changed(InputField::Dose, "10");
        let rendered = calc.on_field_changed(InputField::Weight, "70");
        assert!(rendered.error.is_some());
    }

    #[test]
    fn test_unparseable_parameter_is_error() {
        let mut calc = calculator();
        calc.on_field_changed(InputField::Volume, "266");
        calc.on_field_changed(InputField::Weight, "70");
        let rendered = calc.on_field_changed(InputField::Dose, "abc");

        assert_eq!(calc.params().dose_mg, 0.0);
        assert_eq!(
            rendered.error.as_deref(),
            Some("dose, dilution volume, and weight must all be greater than zero")
        );
        assert!(rendered.is_blank());
    }

    #[test]
    fn test_weight_change_passes_rates_through() {
        let mut calc = levophed_70kg();
        calc.on_rate_field_committed(RateField::A, "0.5");

        let rendered = calc.on_field_changed(InputField::Weight, "90");
        assert_eq!(calc.active(), ActiveField::None);
        assert_eq!(rendered.b, "2.10");
        assert_eq!(rendered.c, "34.91");
    }

    #[test]
    fn test_preset_switch_resets_active_field() {
        let mut calc = levophed_70kg();
        calc.on_rate_field_committed(RateField::A, "0.5");
        assert_eq!(calc.active(), ActiveField::A);

        let rendered = calc.on_preset_selected("Dopamine");
        assert_eq!(calc.active(), ActiveField::None);
        assert_eq!(calc.params(), InfusionParameters::new(800.0, 270.0, 70.0));
        assert_eq!(rendered.a, "0.50");
    }

    #[test]
    fn test_preset_switch_blank_when_rates_zero() {
        let mut calc = levophed_70kg();
        calc.on_rate_field_committed(RateField::A, "");

        let rendered = calc.on_preset_selected("Epinephrine");
        assert!(rendered.is_blank());
        assert!(rendered.error.is_none());
    }

    #[test]
    fn test_preset_name_must_match_exactly() {
        let mut calc = levophed_70kg();
        calc.on_preset_selected("dopamine");
        assert_eq!(calc.selected_preset().unwrap().name, "Levophed");
        assert_eq!(calc.params().dose_mg, 16.0);
    }

    #[test]
    fn test_unknown_preset_is_noop() {
        let mut calc = levophed_70kg();
        calc.on_rate_field_committed(RateField::A, "0.6");

        let rendered = calc.on_preset_selected("Propofol");
        assert_eq!(calc.selected_preset().unwrap().name, "Levophed");
        assert_eq!(calc.active(), ActiveField::A);
        assert_eq!(rendered.a, "0.60");
        assert!(rendered.high_dose_warning);
    }

    #[test]
    fn test_preset_without_threshold_never_warns() {
        let mut calc = calculator();
        calc.on_preset_selected("Midazolam");
        calc.on_field_changed(InputField::Weight, "70");
        let rendered = calc.on_rate_field_committed(RateField::A, "500");
        assert!(!rendered.high_dose_warning);
        assert_eq!(calc.selected_preset().unwrap().name, "Midazolam");
    }

    #[test]
    fn test_no_preset_never_warns() {
        let mut calc = calculator();
        calc.on_field_changed(InputField::Dose, "16");
        calc.on_field_changed(InputField::Volume, "266");
        calc.on_field_changed(InputField::Weight, "70");
        let rendered = calc.on_rate_field_committed(RateField::A, "5");
        assert!(!rendered.high_dose_warning);
        assert_eq!(rendered.b, "21.00");
    }

    #[test]
    fn test_stepper_on_input() {
        let mut calc = levophed_70kg();
        calc.on_stepper_clicked(Field::Input(InputField::Weight), StepDirection::Increment);
        assert_eq!(calc.text(Field::Input(InputField::Weight)), "71");
        assert_eq!(calc.params().weight_kg, 71.0);
    }

    #[test]
    fn test_stepper_decrement_floors_at_zero() {
        let mut calc = calculator();
        calc.on_field_changed(InputField::Dose, "0.5");
        calc.on_stepper_clicked(Field::Input(InputField::Dose), StepDirection::Decrement);
        assert_eq!(calc.text(Field::Input(InputField::Dose)), "0");

        calc.on_field_changed(InputField::Volume, "junk");
        calc.on_stepper_clicked(Field::Input(InputField::Volume), StepDirection::Increment);
        assert_eq!(calc.text(Field::Input(InputField::Volume)), "1");
    }

    #[test]
    fn test_stepper_on_rate_commits_field() {
        let mut calc = levophed_70kg();
        calc.on_rate_field_committed(RateField::A, "0.5");

        let rendered = calc.on_stepper_clicked(Field::Rate(RateField::B), StepDirection::Increment);
        assert_eq!(calc.active(), ActiveField::B);
        assert_eq!(rendered.b, "3.10");
        assert!(rendered.high_dose_warning);
    }

    #[test]
    fn test_rate_text_tracks_display() {
        let mut calc = levophed_70kg();
        calc.on_rate_field_committed(RateField::A, "0.5000");
        assert_eq!(calc.text(Field::Rate(RateField::A)), "0.50");
        assert_eq!(calc.text(Field::Rate(RateField::C)), "34.91");
    }

    #[test]
    fn test_default_weight() {
        let mut calc = Calculator::new(build_default_presets()).with_default_weight(70.0);
        calc.on_preset_selected("Levophed");
        let rendered = calc.on_rate_field_committed(RateField::A, "0.5");
        assert_eq!(rendered.b, "2.10");
    }

    #[test]
    fn test_rendered_json() {
        let rendered = Rendered::rates(&RateTriple::new(0.5, 2.1, 34.9125), false);
        let json = serde_json::to_value(&rendered).unwrap();
        assert_eq!(json["c"], "34.91");
        assert!(json.get("error").is_none());
    }
}

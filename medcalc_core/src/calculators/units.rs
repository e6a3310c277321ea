//! Laboratory unit handling shared by the calculators.
//!
//! Shared lab fields come in pairs: the value and an enumerated unit field
//! (`creatinine` + `creatinineUnit`). Formulas work in conventional units,
//! so these helpers read both and convert.

use super::{CalculatorDef, Category, FieldSpec, InputError, Inputs, Outcome};

pub const SEX_OPTIONS: &[&str] = &["male", "female"];
pub const AGE_UNITS: &[&str] = &["years", "months"];
pub const CREATININE_UNITS: &[&str] = &["mg/dL", "umol/L"];
pub const ALBUMIN_UNITS: &[&str] = &["g/dL", "g/L"];
pub const GLUCOSE_UNITS: &[&str] = &["mg/dL", "mmol/L"];
pub const UREA_UNITS: &[&str] = &["mg/dL", "mmol/L"];
pub const CALCIUM_UNITS: &[&str] = &["mg/dL", "mmol/L"];
pub const PHOSPHATE_UNITS: &[&str] = &["mg/dL", "mmol/L"];

const CREATININE_UMOL_PER_MG_DL: f64 = 88.4;
const GLUCOSE_MG_DL_PER_MMOL: f64 = 18.016;
const BUN_MG_DL_PER_UREA_MMOL: f64 = 2.801;
const CALCIUM_MG_DL_PER_MMOL: f64 = 4.008;
const PHOSPHATE_MG_DL_PER_MMOL: f64 = 3.097;

// Field pairs ---------------------------------------------------------------

pub fn age_fields() -> [FieldSpec; 2] {
    [
        FieldSpec::number("age", "Age", "", 0.0, 130.0),
        FieldSpec::choice("ageUnit", "Age unit", AGE_UNITS, "years"),
    ]
}

pub fn sex_field() -> FieldSpec {
    FieldSpec::choice("sex", "Sex", SEX_OPTIONS, "")
}

pub fn creatinine_fields() -> [FieldSpec; 2] {
    [
        FieldSpec::number("creatinine", "Creatinine", "", 0.01, 3000.0),
        FieldSpec::choice("creatinineUnit", "Creatinine unit", CREATININE_UNITS, "mg/dL"),
    ]
}

pub fn albumin_fields() -> [FieldSpec; 2] {
    [
        FieldSpec::number("albumin", "Albumin", "", 0.1, 80.0),
        FieldSpec::choice("albuminUnit", "Albumin unit", ALBUMIN_UNITS, "g/dL"),
    ]
}

pub fn glucose_fields() -> [FieldSpec; 2] {
    [
        FieldSpec::number("glucose", "Glucose", "", 0.1, 3000.0),
        FieldSpec::choice("glucoseUnit", "Glucose unit", GLUCOSE_UNITS, "mg/dL"),
    ]
}

pub fn urea_fields() -> [FieldSpec; 2] {
    [
        FieldSpec::number("urea", "Urea (BUN)", "", 0.1, 500.0),
        FieldSpec::choice("ureaUnit", "Urea unit", UREA_UNITS, "mg/dL"),
    ]
}

pub fn calcium_fields() -> [FieldSpec; 2] {
    [
        FieldSpec::number("calcium", "Calcium", "", 0.1, 30.0),
        FieldSpec::choice("calciumUnit", "Calcium unit", CALCIUM_UNITS, "mg/dL"),
    ]
}

pub fn phosphate_fields() -> [FieldSpec; 2] {
    [
        FieldSpec::number("phosphate", "Phosphate", "", 0.1, 30.0),
        FieldSpec::choice("phosphateUnit", "Phosphate unit", PHOSPHATE_UNITS, "mg/dL"),
    ]
}

// Readers -------------------------------------------------------------------

pub fn is_female(inputs: &Inputs<'_>) -> Result<bool, InputError> {
    Ok(inputs.choice("sex")? == "female")
}

/// Age in years, whatever unit it was entered in
pub fn age_years(inputs: &Inputs<'_>) -> Result<f64, InputError> {
    let age = inputs.number("age")?;
    Ok(match inputs.choice("ageUnit")? {
        "months" => age / 12.0,
        _ => age,
    })
}

pub fn creatinine_mg_dl(inputs: &Inputs<'_>) -> Result<f64, InputError> {
    let value = inputs.number("creatinine")?;
    Ok(match inputs.choice("creatinineUnit")? {
        "umol/L" => value / CREATININE_UMOL_PER_MG_DL,
        _ => value,
    })
}

pub fn albumin_g_dl(inputs: &Inputs<'_>) -> Result<Option<f64>, InputError> {
    let Some(value) = inputs.optional_number("albumin")? else {
        return Ok(None);
    };
    Ok(Some(match inputs.choice("albuminUnit")? {
        "g/L" => value / 10.0,
        _ => value,
    }))
}

pub fn glucose_mg_dl(inputs: &Inputs<'_>) -> Result<f64, InputError> {
    let value = inputs.number("glucose")?;
    Ok(match inputs.choice("glucoseUnit")? {
        "mmol/L" => value * GLUCOSE_MG_DL_PER_MMOL,
        _ => value,
    })
}

/// Blood urea nitrogen in mg/dL; urea in mmol/L is converted
pub fn bun_mg_dl(inputs: &Inputs<'_>) -> Result<f64, InputError> {
    let value = inputs.number("urea")?;
    Ok(match inputs.choice("ureaUnit")? {
        "mmol/L" => value * BUN_MG_DL_PER_UREA_MMOL,
        _ => value,
    })
}

pub fn calcium_mg_dl(inputs: &Inputs<'_>) -> Result<f64, InputError> {
    let value = inputs.number("calcium")?;
    Ok(match inputs.choice("calciumUnit")? {
        "mmol/L" => value * CALCIUM_MG_DL_PER_MMOL,
        _ => value,
    })
}

pub fn mg_dl_to_calcium_mmol(value: f64) -> f64 {
    value / CALCIUM_MG_DL_PER_MMOL
}

pub fn phosphate_mg_dl(inputs: &Inputs<'_>) -> Result<f64, InputError> {
    let value = inputs.number("phosphate")?;
    Ok(match inputs.choice("phosphateUnit")? {
        "mmol/L" => value * PHOSPHATE_MG_DL_PER_MMOL,
        _ => value,
    })
}

// Glucose converter -----------------------------------------------------------

pub fn glucose_converter() -> CalculatorDef {
    let [glucose, glucose_unit] = glucose_fields();
    CalculatorDef {
        id: "glucose_convert",
        name: "Glucose unit converter",
        category: Category::Conversions,
        description: "Convert blood glucose between mg/dL and mmol/L",
        tags: &["glucose", "units", "diabetes"],
        fields: vec![glucose, glucose_unit],
        compute: convert_glucose,
    }
}

fn convert_glucose(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let value = inputs.number("glucose")?;
    let outcome = match inputs.choice("glucoseUnit")? {
        "mmol/L" => Outcome::new(value * GLUCOSE_MG_DL_PER_MMOL, "mg/dL", 0, "Converted from mmol/L"),
        _ => Outcome::new(value / GLUCOSE_MG_DL_PER_MMOL, "mmol/L", 1, "Converted from mg/dL"),
    };
    Ok(outcome)
}

//! Kidney function: eGFR, creatinine clearance, BUN/creatinine ratio.

use super::units::{
    age_fields, age_years, bun_mg_dl, creatinine_fields, creatinine_mg_dl, is_female, sex_field,
    urea_fields,
};
use super::{CalculatorDef, Category, FieldSpec, InputError, Inputs, Outcome};

pub fn calculators() -> Vec<CalculatorDef> {
    let [creatinine, creatinine_unit] = creatinine_fields();
    let [age, age_unit] = age_fields();
    let [urea, urea_unit] = urea_fields();

    vec![
        CalculatorDef {
            id: "egfr",
            name: "eGFR (CKD-EPI 2021)",
            category: Category::Renal,
            description: "Estimated glomerular filtration rate and CKD stage for kidney function",
            tags: &["egfr", "ckd", "kidney", "creatinine"],
            fields: vec![
                creatinine.clone(),
                creatinine_unit.clone(),
                age.clone(),
                age_unit.clone(),
                sex_field(),
            ],
            compute: egfr,
        },
        CalculatorDef {
            id: "crcl",
            name: "Creatinine clearance (Cockcroft-Gault)",
            category: Category::Renal,
            description: "Creatinine clearance for renal drug dosing; kidney function",
            tags: &["crcl", "cockcroft", "gault", "kidney", "dosing"],
            fields: vec![
                age,
                age_unit,
                FieldSpec::number("weight", "Weight", "kg", 0.5, 500.0),
                sex_field(),
                creatinine.clone(),
                creatinine_unit.clone(),
            ],
            compute: creatinine_clearance,
        },
        CalculatorDef {
            id: "bun_cr",
            name: "BUN/creatinine ratio",
            category: Category::Renal,
            description: "Distinguish prerenal from intrinsic causes of azotaemia",
            tags: &["bun", "urea", "azotemia", "prerenal"],
            fields: vec![urea, urea_unit, creatinine, creatinine_unit],
            compute: bun_creatinine_ratio,
        },
    ]
}

fn adult_age(inputs: &Inputs<'_>) -> Result<f64, InputError> {
    let age = age_years(inputs)?;
    if age < 18.0 {
        return Err(InputError::Inconsistent(
            "formula is validated for adults (18 years and over)".into(),
        ));
    }
    Ok(age)
}

fn egfr(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let scr = creatinine_mg_dl(inputs)?;
    let age = adult_age(inputs)?;
    let female = is_female(inputs)?;

    let (kappa, alpha) = if female { (0.7, -0.241) } else { (0.9, -0.302) };
    let ratio = scr / kappa;
    let mut value = 142.0
        * ratio.min(1.0).powf(alpha)
        * ratio.max(1.0).powf(-1.200)
        * 0.9938f64.powf(age);
    if female {
        value *= 1.012;
    }

    let stage = match value {
        v if v >= 90.0 => "G1: normal or high",
        v if v >= 60.0 => "G2: mildly decreased",
        v if v >= 45.0 => "G3a: mildly to moderately decreased",
        v if v >= 30.0 => "G3b: moderately to severely decreased",
        v if v >= 15.0 => "G4: severely decreased",
        _ => "G5: kidney failure",
    };
    Ok(Outcome::new(value, "mL/min/1.73m²", 0, stage))
}

fn creatinine_clearance(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let age = adult_age(inputs)?;
    let weight = inputs.number("weight")?;
    let scr = creatinine_mg_dl(inputs)?;

    let mut value = (140.0 - age) * weight / (72.0 * scr);
    if is_female(inputs)? {
        value *= 0.85;
    }

    let interpretation = match value {
        v if v >= 90.0 => "Normal clearance",
        v if v >= 60.0 => "Mildly reduced clearance",
        v if v >= 30.0 => "Moderately reduced clearance; review renally cleared drugs",
        v if v >= 15.0 => "Severely reduced clearance; dose adjustment likely",
        _ => "Kidney failure range",
    };
    Ok(Outcome::new(value, "mL/min", 0, interpretation))
}

fn bun_creatinine_ratio(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let bun = bun_mg_dl(inputs)?;
    let scr = creatinine_mg_dl(inputs)?;
    let ratio = bun / scr;

    let interpretation = match ratio {
        r if r > 20.0 => "Suggests prerenal cause or upper GI bleeding",
        r if r >= 10.0 => "Normal range, or postrenal cause",
        _ => "Suggests intrinsic renal cause, liver disease or low protein intake",
    };
    Ok(Outcome::new(ratio, "", 0, interpretation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::get_calculator;
    use crate::FieldValue;

    fn run(id: &str, pairs: &[(&str, &str)]) -> Result<Outcome, InputError> {
        let def = get_calculator(id).unwrap();
        let mut state = def.template();
        for (k, v) in pairs {
            state.insert(k.to_string(), FieldValue::from(*v));
        }
        def.evaluate(&state)
    }

    #[test]
    fn test_egfr_male() {
        let outcome = run(
            "egfr",
            &[("creatinine", "1.0"), ("age", "50"), ("sex", "male")],
        )
        .unwrap();
        assert!((outcome.value - 91.7).abs() < 1.0, "got {}", outcome.value);
        assert!(outcome.interpretation.starts_with("G1"));
    }

    #[test]
    fn test_egfr_accepts_umol() {
        let mg = run("egfr", &[("creatinine", "1.5"), ("age", "70"), ("sex", "female")]).unwrap();
        let umol = run(
            "egfr",
            &[
                ("creatinine", "132.6"),
                ("creatinineUnit", "umol/L"),
                ("age", "70"),
                ("sex", "female"),
            ],
        )
        .unwrap();
        assert!((mg.value - umol.value).abs() < 0.01);
        assert!(mg.interpretation.starts_with("G3b"));
    }

    #[test]
    fn test_egfr_rejects_children() {
        let err = run(
            "egfr",
            &[("creatinine", "0.5"), ("age", "120"), ("ageUnit", "months"), ("sex", "male")],
        )
        .unwrap_err();
        assert!(matches!(err, InputError::Inconsistent(_)));
    }

    #[test]
    fn test_cockcroft_gault() {
        let outcome = run(
            "crcl",
            &[("age", "60"), ("weight", "72"), ("sex", "male"), ("creatinine", "1.0")],
        )
        .unwrap();
        assert_eq!(outcome.value, 80.0);

        let female = run(
            "crcl",
            &[("age", "60"), ("weight", "72"), ("sex", "female"), ("creatinine", "1.0")],
        )
        .unwrap();
        assert!((female.value - 68.0).abs() < 1e-9);
    }

    #[test]
    fn test_bun_creatinine_ratio() {
        let outcome = run("bun_cr", &[("urea", "40"), ("creatinine", "1.0")]).unwrap();
        assert_eq!(outcome.value, 40.0);
        assert!(outcome.interpretation.contains("prerenal"));
    }
}

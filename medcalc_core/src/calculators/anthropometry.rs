//! Body size calculators: BMI, BSA, ideal weight, paediatric estimates.

use super::units::{age_fields, is_female, sex_field};
use super::{CalculatorDef, Category, FieldSpec, InputError, Inputs, Outcome};

const CM_PER_INCH: f64 = 2.54;

fn weight_field() -> FieldSpec {
    FieldSpec::number("weight", "Weight", "kg", 0.5, 500.0)
}

fn height_field() -> FieldSpec {
    FieldSpec::number("height", "Height", "cm", 30.0, 272.0)
}

pub fn calculators() -> Vec<CalculatorDef> {
    let [age, age_unit] = age_fields();
    vec![
        CalculatorDef {
            id: "bmi",
            name: "Body mass index",
            category: Category::Anthropometry,
            description: "Weight relative to height squared, with WHO category",
            tags: &["bmi", "obesity", "weight"],
            fields: vec![weight_field(), height_field()],
            compute: bmi,
        },
        CalculatorDef {
            id: "bsa",
            name: "Body surface area (Mosteller)",
            category: Category::Anthropometry,
            description: "Body surface area for dosing chemotherapy and indexing cardiac output",
            tags: &["bsa", "dosing", "mosteller"],
            fields: vec![weight_field(), height_field()],
            compute: bsa,
        },
        CalculatorDef {
            id: "ibw",
            name: "Ideal body weight (Devine)",
            category: Category::Anthropometry,
            description: "Ideal and adjusted body weight for drug dosing and ventilation",
            tags: &["ibw", "devine", "dosing", "ventilation"],
            fields: vec![height_field(), sex_field(), weight_field().optional()],
            compute: ideal_body_weight,
        },
        CalculatorDef {
            id: "paed_weight",
            name: "Paediatric weight estimate (APLS)",
            category: Category::Anthropometry,
            description: "Estimated weight of a child from age when scales are unavailable",
            tags: &["paediatric", "pediatric", "apls", "weight", "child"],
            fields: vec![age, age_unit],
            compute: paediatric_weight,
        },
        CalculatorDef {
            id: "maintenance_fluids",
            name: "Maintenance fluids (4-2-1 rule)",
            category: Category::Anthropometry,
            description: "Hourly maintenance IV fluid rate by weight (Holliday-Segar)",
            tags: &["fluids", "holliday", "segar", "iv"],
            fields: vec![weight_field()],
            compute: maintenance_fluids,
        },
    ]
}

fn bmi(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let weight = inputs.number("weight")?;
    let height_m = inputs.number("height")? / 100.0;
    let value = weight / (height_m * height_m);

    let category = match value {
        v if v < 18.5 => "Underweight",
        v if v < 25.0 => "Normal weight",
        v if v < 30.0 => "Overweight",
        v if v < 35.0 => "Obesity class I",
        v if v < 40.0 => "Obesity class II",
        _ => "Obesity class III",
    };
    Ok(Outcome::new(value, "kg/m²", 1, category))
}

fn bsa(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let weight = inputs.number("weight")?;
    let height = inputs.number("height")?;
    let value = (weight * height / 3600.0).sqrt();
    Ok(Outcome::new(value, "m²", 2, "Mosteller formula"))
}

fn ideal_body_weight(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let height_in = inputs.number("height")? / CM_PER_INCH;
    let base = if is_female(inputs)? { 45.5 } else { 50.0 };
    let ibw = base + 2.3 * (height_in - 60.0);
    if ibw <= 0.0 {
        return Err(InputError::Inconsistent(
            "Devine formula does not apply at this height".into(),
        ));
    }

    let mut interpretation = String::from("Devine formula");
    if height_in < 60.0 {
        interpretation.push_str("; less reliable below 152 cm");
    }
    let mut outcome = Outcome::new(ibw, "kg", 1, interpretation);

    if let Some(actual) = inputs.optional_number("weight")? {
        let adjusted = ibw + 0.4 * (actual - ibw);
        outcome = outcome
            .with_detail("Adjusted body weight", format!("{:.1} kg", adjusted))
            .with_detail("Actual / ideal", format!("{:.0}%", actual / ibw * 100.0));
    }
    Ok(outcome)
}

fn paediatric_weight(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let age = inputs.number("age")?;
    let months = match inputs.choice("ageUnit")? {
        "months" => age,
        _ => age * 12.0,
    };

    let weight = if months < 12.0 {
        0.5 * months + 4.0
    } else if months < 72.0 {
        2.0 * (months / 12.0).floor() + 8.0
    } else if months < 156.0 {
        3.0 * (months / 12.0).floor() + 7.0
    } else {
        return Err(InputError::Inconsistent(
            "APLS estimates apply to children under 13 years".into(),
        ));
    };
    Ok(Outcome::new(weight, "kg", 0, "APLS age-based estimate"))
}

fn maintenance_fluids(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let weight = inputs.number("weight")?;
    let first = weight.min(10.0);
    let second = (weight - 10.0).clamp(0.0, 10.0);
    let rest = (weight - 20.0).max(0.0);
    let rate = 4.0 * first + 2.0 * second + rest;

    Ok(Outcome::new(rate, "mL/h", 0, "Holliday-Segar 4-2-1 rule")
        .with_detail("Daily volume", format!("{:.0} mL/day", rate * 24.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::get_calculator;
    use crate::{FieldValue, FormState};

    fn run(id: &str, pairs: &[(&str, &str)]) -> Result<Outcome, InputError> {
        let def = get_calculator(id).unwrap();
        let mut state: FormState = def.template();
        for (k, v) in pairs {
            state.insert(k.to_string(), FieldValue::from(*v));
        }
        def.evaluate(&state)
    }

    #[test]
    fn test_bmi_normal() {
        let outcome = run("bmi", &[("weight", "70"), ("height", "175")]).unwrap();
        assert_eq!(outcome.format_value(None), "22.9 kg/m²");
        assert_eq!(outcome.interpretation, "Normal weight");
    }

    #[test]
    fn test_bmi_obesity() {
        let outcome = run("bmi", &[("weight", "110"), ("height", "170")]).unwrap();
        assert_eq!(outcome.interpretation, "Obesity class II");
    }

    #[test]
    fn test_bsa_mosteller() {
        let outcome = run("bsa", &[("weight", "70"), ("height", "175")]).unwrap();
        assert_eq!(outcome.format_value(None), "1.84 m²");
    }

    #[test]
    fn test_ibw_requires_sex() {
        let err = run("ibw", &[("height", "180")]).unwrap_err();
        assert_eq!(err, InputError::Missing("sex".into()));
    }

    #[test]
    fn test_ibw_with_adjusted_weight() {
        let outcome = run("ibw", &[("height", "180"), ("sex", "male"), ("weight", "100")]).unwrap();
        assert!((outcome.value - 75.0).abs() < 0.1);
        assert_eq!(outcome.details.len(), 2);
        assert_eq!(outcome.details[0].1, "85.0 kg");
    }

    #[test]
    fn test_paediatric_weight_by_age() {
        let infant = run("paed_weight", &[("age", "6"), ("ageUnit", "months")]).unwrap();
        assert_eq!(infant.value, 7.0);
        let toddler = run("paed_weight", &[("age", "3")]).unwrap();
        assert_eq!(toddler.value, 14.0);
        let school = run("paed_weight", &[("age", "10")]).unwrap();
        assert_eq!(school.value, 37.0);
        assert!(run("paed_weight", &[("age", "15")]).is_err());
    }

    #[test]
    fn test_maintenance_fluids() {
        let outcome = run("maintenance_fluids", &[("weight", "70")]).unwrap();
        assert_eq!(outcome.value, 110.0);
        let small = run("maintenance_fluids", &[("weight", "8")]).unwrap();
        assert_eq!(small.value, 32.0);
    }
}

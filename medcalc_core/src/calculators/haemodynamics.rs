//! Blood pressure, perfusion and oxygenation indices.

use super::{CalculatorDef, Category, FieldSpec, InputError, Inputs, Outcome};

fn sbp_field() -> FieldSpec {
    FieldSpec::number("sbp", "Systolic BP", "mmHg", 20.0, 300.0)
}

pub fn calculators() -> Vec<CalculatorDef> {
    vec![
        CalculatorDef {
            id: "map",
            name: "Mean arterial pressure",
            category: Category::Haemodynamics,
            description: "Mean arterial pressure from systolic and diastolic blood pressure",
            tags: &["map", "blood pressure", "perfusion"],
            fields: vec![
                sbp_field(),
                FieldSpec::number("dbp", "Diastolic BP", "mmHg", 10.0, 250.0),
            ],
            compute: mean_arterial_pressure,
        },
        CalculatorDef {
            id: "shock_index",
            name: "Shock index",
            category: Category::Haemodynamics,
            description: "Heart rate divided by systolic blood pressure",
            tags: &["shock", "haemorrhage", "trauma", "sepsis"],
            fields: vec![
                FieldSpec::number("heartRate", "Heart rate", "bpm", 20.0, 300.0),
                sbp_field(),
            ],
            compute: shock_index,
        },
        CalculatorDef {
            id: "sf_ratio",
            name: "SpO2/FiO2 ratio",
            category: Category::Haemodynamics,
            description: "Non-invasive surrogate for the PaO2/FiO2 ratio in ARDS screening",
            tags: &["spo2", "fio2", "ards", "oxygenation"],
            fields: vec![
                FieldSpec::number("spo2", "SpO2", "%", 50.0, 100.0),
                FieldSpec::number("fio2", "FiO2", "fraction or %", 0.21, 100.0),
            ],
            compute: sf_ratio,
        },
    ]
}

fn mean_arterial_pressure(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let sbp = inputs.number("sbp")?;
    let dbp = inputs.number("dbp")?;
    if dbp > sbp {
        return Err(InputError::Inconsistent(
            "diastolic pressure cannot exceed systolic pressure".into(),
        ));
    }

    let map = (sbp + 2.0 * dbp) / 3.0;
    let interpretation = match map {
        m if m < 65.0 => "Below 65 mmHg: organ perfusion may be inadequate",
        m if m <= 100.0 => "Normal range",
        _ => "Elevated",
    };
    Ok(Outcome::new(map, "mmHg", 0, interpretation))
}

fn shock_index(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let hr = inputs.number("heartRate")?;
    let sbp = inputs.number("sbp")?;
    let index = hr / sbp;

    let interpretation = match index {
        i if i < 0.7 => "Normal",
        i if i < 1.0 => "Borderline; monitor closely",
        i if i < 1.4 => "Elevated; suggests significant haemodynamic compromise",
        _ => "Severely elevated; high risk of massive transfusion",
    };
    Ok(Outcome::new(index, "", 2, interpretation))
}

fn sf_ratio(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let spo2 = inputs.number("spo2")?;
    let raw_fio2 = inputs.number("fio2")?;
    // Accept either a fraction (0.4) or a percentage (40)
    let fio2 = if raw_fio2 > 1.0 { raw_fio2 / 100.0 } else { raw_fio2 };
    if fio2 < 0.21 {
        return Err(InputError::OutOfRange {
            label: "FiO2".into(),
            min: 0.21,
            max: 1.0,
        });
    }

    let ratio = spo2 / fio2;
    let mut interpretation = match ratio {
        r if r < 235.0 => String::from("Consistent with PaO2/FiO2 below 200"),
        r if r < 315.0 => String::from("Consistent with PaO2/FiO2 below 300"),
        _ => String::from("No significant oxygenation impairment"),
    };
    if spo2 > 97.0 {
        interpretation.push_str("; unreliable when SpO2 is above 97%");
    }
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
    fn test_map() {
        let outcome = run("map", &[("sbp", "120"), ("dbp", "75")]).unwrap();
        assert_eq!(outcome.value, 90.0);
        assert_eq!(outcome.interpretation, "Normal range");
    }

    #[test]
    fn test_map_rejects_inverted_pressures() {
        let err = run("map", &[("sbp", "70"), ("dbp", "90")]).unwrap_err();
        assert!(matches!(err, InputError::Inconsistent(_)));
    }

    #[test]
    fn test_shock_index() {
        let outcome = run("shock_index", &[("heartRate", "120"), ("sbp", "100")]).unwrap();
        assert!((outcome.value - 1.2).abs() < 1e-9);
        assert!(outcome.interpretation.starts_with("Elevated"));
    }

    #[test]
    fn test_sf_ratio_accepts_percent_fio2() {
        let fraction = run("sf_ratio", &[("spo2", "92"), ("fio2", "0.4")]).unwrap();
        let percent = run("sf_ratio", &[("spo2", "92"), ("fio2", "40")]).unwrap();
        assert!((fraction.value - 230.0).abs() < 1e-9);
        assert!((fraction.value - percent.value).abs() < 1e-9);
        assert!(fraction.interpretation.contains("below 200"));
    }
}

//! Bedside clinical scores: GCS, qSOFA, Wells for pulmonary embolism.

use super::{CalculatorDef, Category, FieldSpec, InputError, Inputs, Outcome};

pub fn calculators() -> Vec<CalculatorDef> {
    vec![
        CalculatorDef {
            id: "gcs",
            name: "Glasgow Coma Scale",
            category: Category::Scores,
            description: "Level of consciousness from eye, verbal and motor responses",
            tags: &["gcs", "glasgow", "coma", "neuro", "trauma"],
            fields: vec![
                FieldSpec::choice("eye", "Eye response", &["1", "2", "3", "4"], "4"),
                FieldSpec::choice("verbal", "Verbal response", &["1", "2", "3", "4", "5"], "5"),
                FieldSpec::choice("motor", "Motor response", &["1", "2", "3", "4", "5", "6"], "6"),
            ],
            compute: glasgow_coma_scale,
        },
        CalculatorDef {
            id: "qsofa",
            name: "qSOFA",
            category: Category::Scores,
            description: "Quick sepsis-related organ failure assessment outside the ICU",
            tags: &["qsofa", "sofa", "sepsis"],
            fields: vec![
                FieldSpec::number("respRate", "Respiratory rate", "/min", 1.0, 80.0),
                FieldSpec::number("sbp", "Systolic BP", "mmHg", 20.0, 300.0),
                FieldSpec::flag("alteredMentation", "Altered mentation"),
            ],
            compute: qsofa,
        },
        CalculatorDef {
            id: "wells_pe",
            name: "Wells score for PE",
            category: Category::Scores,
            description: "Pre-test probability of pulmonary embolism",
            tags: &["wells", "pe", "embolism", "dvt"],
            fields: vec![
                FieldSpec::flag("dvtSigns", "Clinical signs of DVT"),
                FieldSpec::flag("peMostLikely", "PE is the most likely diagnosis"),
                FieldSpec::number("heartRate", "Heart rate", "bpm", 20.0, 300.0),
                FieldSpec::flag("immobilisation", "Immobilisation or surgery in past 4 weeks"),
                FieldSpec::flag("previousVte", "Previous DVT or PE"),
                FieldSpec::flag("haemoptysis", "Haemoptysis"),
                FieldSpec::flag("malignancy", "Active malignancy"),
            ],
            compute: wells_pe,
        },
    ]
}

fn glasgow_coma_scale(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let eye = inputs.points("eye")?;
    let verbal = inputs.points("verbal")?;
    let motor = inputs.points("motor")?;
    let total = eye + verbal + motor;

    let severity = match total {
        13..=15 => "Mild brain injury",
        9..=12 => "Moderate brain injury",
        _ => "Severe brain injury; consider airway protection",
    };
    Ok(Outcome::new(f64::from(total), "", 0, severity)
        .with_detail("Components", format!("E{} V{} M{}", eye, verbal, motor)))
}

fn qsofa(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let mut score = 0u32;
    if inputs.number("respRate")? >= 22.0 {
        score += 1;
    }
    if inputs.number("sbp")? <= 100.0 {
        score += 1;
    }
    if inputs.flag("alteredMentation") {
        score += 1;
    }

    let interpretation = if score >= 2 {
        "High risk of poor outcome; assess for organ dysfunction"
    } else {
        "Not high risk by qSOFA; continue to monitor"
    };
    Ok(Outcome::new(f64::from(score), "", 0, interpretation))
}

fn wells_pe(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let criteria = [
        ("dvtSigns", 3.0),
        ("peMostLikely", 3.0),
        ("immobilisation", 1.5),
        ("previousVte", 1.5),
        ("haemoptysis", 1.0),
        ("malignancy", 1.0),
    ];
    let mut score: f64 = criteria
        .iter()
        .filter(|(key, _)| inputs.flag(key))
        .map(|(_, points)| points)
        .sum();
    if inputs.number("heartRate")? > 100.0 {
        score += 1.5;
    }

    let three_tier = if score > 6.0 {
        "High probability"
    } else if score >= 2.0 {
        "Moderate probability"
    } else {
        "Low probability"
    };
    let two_tier = if score > 4.0 {
        "PE likely"
    } else {
        "PE unlikely; consider D-dimer"
    };
    Ok(Outcome::new(score, "", 1, three_tier).with_detail("Two-tier model", two_tier))
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
    fn test_gcs_defaults_to_fifteen() {
        let outcome = run("gcs", &[]).unwrap();
        assert_eq!(outcome.value, 15.0);
        assert_eq!(outcome.details[0].1, "E4 V5 M6");
    }

    #[test]
    fn test_gcs_severe() {
        let outcome = run("gcs", &[("eye", "1"), ("verbal", "2"), ("motor", "4")]).unwrap();
        assert_eq!(outcome.value, 7.0);
        assert!(outcome.interpretation.starts_with("Severe"));
    }

    #[test]
    fn test_gcs_rejects_out_of_scale_item() {
        let err = run("gcs", &[("motor", "7")]).unwrap_err();
        assert_eq!(err, InputError::Invalid("motor response".into()));
    }

    #[test]
    fn test_qsofa() {
        let outcome = run(
            "qsofa",
            &[("respRate", "24"), ("sbp", "95"), ("alteredMentation", "no")],
        )
        .unwrap();
        assert_eq!(outcome.value, 2.0);
        assert!(outcome.interpretation.starts_with("High risk"));
    }

    #[test]
    fn test_wells_pe() {
        let outcome = run(
            "wells_pe",
            &[("dvtSigns", "yes"), ("heartRate", "110"), ("malignancy", "yes")],
        )
        .unwrap();
        assert_eq!(outcome.value, 5.5);
        assert_eq!(outcome.interpretation, "Moderate probability");
        assert_eq!(outcome.details[0].1, "PE likely");
    }
}

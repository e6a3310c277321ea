//! Electrolyte and serum chemistry corrections.

use super::units::{
    albumin_fields, albumin_g_dl, bun_mg_dl, calcium_fields, calcium_mg_dl, glucose_fields,
    glucose_mg_dl, mg_dl_to_calcium_mmol, phosphate_fields, phosphate_mg_dl, urea_fields,
};
use super::{CalculatorDef, Category, FieldSpec, InputError, Inputs, Outcome};

const NORMAL_ALBUMIN_G_DL: f64 = 4.0;

fn sodium_field() -> FieldSpec {
    FieldSpec::number("sodium", "Sodium", "mmol/L", 80.0, 200.0)
}

pub fn calculators() -> Vec<CalculatorDef> {
    let [albumin, albumin_unit] = albumin_fields();
    let [calcium, calcium_unit] = calcium_fields();
    let [glucose, glucose_unit] = glucose_fields();
    let [urea, urea_unit] = urea_fields();
    let [phosphate, phosphate_unit] = phosphate_fields();

    vec![
        CalculatorDef {
            id: "anion_gap",
            name: "Anion gap",
            category: Category::Electrolytes,
            description: "Serum anion gap with optional albumin correction for metabolic acidosis",
            tags: &["anion", "gap", "acidosis", "electrolytes"],
            fields: vec![
                sodium_field(),
                FieldSpec::number("chloride", "Chloride", "mmol/L", 50.0, 160.0),
                FieldSpec::number("bicarb", "Bicarbonate", "mmol/L", 1.0, 60.0),
                FieldSpec::flag("includeK", "Include potassium"),
                FieldSpec::number("potassium", "Potassium", "mmol/L", 1.0, 10.0).optional(),
                albumin.clone().optional(),
                albumin_unit.clone(),
            ],
            compute: anion_gap,
        },
        CalculatorDef {
            id: "corrected_calcium",
            name: "Corrected calcium",
            category: Category::Electrolytes,
            description: "Total calcium corrected for low albumin (Payne)",
            tags: &["calcium", "albumin", "payne"],
            fields: vec![calcium.clone(), calcium_unit.clone(), albumin, albumin_unit],
            compute: corrected_calcium,
        },
        CalculatorDef {
            id: "corrected_sodium",
            name: "Corrected sodium (hyperglycaemia)",
            category: Category::Electrolytes,
            description: "Sodium corrected for hyperglycaemia (Katz or Hillier factor)",
            tags: &["sodium", "glucose", "hyperglycemia", "dka", "hhs"],
            fields: vec![
                sodium_field(),
                glucose.clone(),
                glucose_unit.clone(),
                FieldSpec::choice("correctionFactor", "Correction factor", &["1.6", "2.4"], "1.6"),
            ],
            compute: corrected_sodium,
        },
        CalculatorDef {
            id: "osmolality",
            name: "Serum osmolality",
            category: Category::Electrolytes,
            description: "Calculated serum osmolality and osmolar gap",
            tags: &["osmolality", "osmolar", "gap", "toxic alcohol"],
            fields: vec![
                sodium_field(),
                glucose,
                glucose_unit,
                urea,
                urea_unit,
                FieldSpec::number("measuredOsm", "Measured osmolality", "mOsm/kg", 150.0, 500.0)
                    .optional(),
            ],
            compute: osmolality,
        },
        CalculatorDef {
            id: "ca_phos",
            name: "Calcium-phosphate product",
            category: Category::Electrolytes,
            description: "Calcium × phosphate product for calciphylaxis risk in CKD",
            tags: &["calcium", "phosphate", "ckd", "calciphylaxis"],
            fields: vec![calcium, calcium_unit, phosphate, phosphate_unit],
            compute: calcium_phosphate_product,
        },
    ]
}

fn anion_gap(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let sodium = inputs.number("sodium")?;
    let chloride = inputs.number("chloride")?;
    let bicarb = inputs.number("bicarb")?;

    let include_k = inputs.flag("includeK");
    let potassium = if include_k {
        inputs.number("potassium")?
    } else {
        0.0
    };
    let gap = sodium + potassium - (chloride + bicarb);
    let upper = if include_k { 16.0 } else { 12.0 };

    let mut outcome = match albumin_g_dl(inputs)? {
        Some(albumin) => {
            let corrected = gap + 2.5 * (NORMAL_ALBUMIN_G_DL - albumin);
            Outcome::new(corrected, "mmol/L", 1, classify_gap(corrected, upper))
                .with_detail("Uncorrected gap", format!("{:.1} mmol/L", gap))
        }
        None => Outcome::new(gap, "mmol/L", 1, classify_gap(gap, upper)),
    };
    if include_k {
        outcome = outcome.with_detail("Potassium", "included");
    }
    Ok(outcome)
}

fn classify_gap(gap: f64, upper: f64) -> &'static str {
    if gap > upper {
        "Elevated anion gap: consider lactate, ketones, toxins, uraemia"
    } else if gap < upper - 8.0 {
        "Low anion gap: check albumin and for laboratory error"
    } else {
        "Normal anion gap"
    }
}

fn corrected_calcium(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let calcium = calcium_mg_dl(inputs)?;
    let albumin = albumin_g_dl(inputs)?.ok_or_else(|| InputError::Missing("albumin".into()))?;
    let corrected = calcium + 0.8 * (NORMAL_ALBUMIN_G_DL - albumin);

    let interpretation = match corrected {
        c if c < 8.5 => "Hypocalcaemia",
        c if c <= 10.5 => "Normal calcium",
        _ => "Hypercalcaemia",
    };

    let outcome = match inputs.choice("calciumUnit")? {
        "mmol/L" => Outcome::new(mg_dl_to_calcium_mmol(corrected), "mmol/L", 2, interpretation),
        _ => Outcome::new(corrected, "mg/dL", 1, interpretation),
    };
    Ok(outcome)
}

fn corrected_sodium(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let sodium = inputs.number("sodium")?;
    let glucose = glucose_mg_dl(inputs)?;
    let factor = match inputs.choice("correctionFactor")? {
        "2.4" => 2.4,
        _ => 1.6,
    };

    let corrected = sodium + factor * (glucose - 100.0).max(0.0) / 100.0;
    let interpretation = match corrected {
        c if c < 135.0 => "Hyponatraemia after correction",
        c if c <= 145.0 => "Normal sodium after correction",
        _ => "Hypernatraemia after correction",
    };
    Ok(Outcome::new(corrected, "mmol/L", 1, interpretation))
}

fn osmolality(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let sodium = inputs.number("sodium")?;
    let glucose = glucose_mg_dl(inputs)?;
    let bun = bun_mg_dl(inputs)?;
    let calculated = 2.0 * sodium + glucose / 18.0 + bun / 2.8;

    let interpretation = match calculated {
        c if c < 275.0 => "Low calculated osmolality",
        c if c <= 295.0 => "Normal calculated osmolality",
        _ => "High calculated osmolality",
    };
    let mut outcome = Outcome::new(calculated, "mOsm/kg", 0, interpretation);

    if let Some(measured) = inputs.optional_number("measuredOsm")? {
        let gap = measured - calculated;
        let note = if gap > 10.0 {
            "elevated; consider toxic alcohols"
        } else {
            "normal"
        };
        outcome = outcome.with_detail("Osmolar gap", format!("{:.0} mOsm/kg ({})", gap, note));
    }
    Ok(outcome)
}

fn calcium_phosphate_product(inputs: &Inputs<'_>) -> Result<Outcome, InputError> {
    let product = calcium_mg_dl(inputs)? * phosphate_mg_dl(inputs)?;
    let interpretation = if product > 55.0 {
        "Elevated; increased risk of vascular calcification"
    } else {
        "Within target (55 mg²/dL² or less)"
    };
    Ok(Outcome::new(product, "mg²/dL²", 0, interpretation))
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
    fn test_anion_gap_plain() {
        let outcome = run(
            "anion_gap",
            &[("sodium", "140"), ("chloride", "104"), ("bicarb", "24")],
        )
        .unwrap();
        assert_eq!(outcome.value, 12.0);
        assert_eq!(outcome.interpretation, "Normal anion gap");
    }

    #[test]
    fn test_anion_gap_albumin_corrected() {
        let outcome = run(
            "anion_gap",
            &[
                ("sodium", "140"),
                ("chloride", "104"),
                ("bicarb", "24"),
                ("albumin", "20"),
                ("albuminUnit", "g/L"),
            ],
        )
        .unwrap();
        assert_eq!(outcome.value, 17.0);
        assert!(outcome.interpretation.starts_with("Elevated"));
    }

    #[test]
    fn test_anion_gap_with_potassium_requires_value() {
        let err = run(
            "anion_gap",
            &[("sodium", "140"), ("chloride", "104"), ("bicarb", "24"), ("includeK", "yes")],
        )
        .unwrap_err();
        assert_eq!(err, InputError::Missing("potassium".into()));
    }

    #[test]
    fn test_corrected_calcium() {
        let outcome = run("corrected_calcium", &[("calcium", "8.0"), ("albumin", "2.0")]).unwrap();
        assert!((outcome.value - 9.6).abs() < 1e-9);
        assert_eq!(outcome.interpretation, "Normal calcium");
    }

    #[test]
    fn test_corrected_calcium_in_mmol() {
        let outcome = run(
            "corrected_calcium",
            &[
                ("calcium", "2.0"),
                ("calciumUnit", "mmol/L"),
                ("albumin", "30"),
                ("albuminUnit", "g/L"),
            ],
        )
        .unwrap();
        assert_eq!(outcome.unit, "mmol/L");
        assert!((outcome.value - 2.2).abs() < 0.01);
    }

    #[test]
    fn test_corrected_calcium_needs_albumin() {
        let err = run("corrected_calcium", &[("calcium", "8.0")]).unwrap_err();
        assert_eq!(err, InputError::Missing("albumin".into()));
    }

    #[test]
    fn test_corrected_sodium_factors() {
        let katz = run("corrected_sodium", &[("sodium", "130"), ("glucose", "600")]).unwrap();
        assert!((katz.value - 138.0).abs() < 1e-9);

        let hillier = run(
            "corrected_sodium",
            &[("sodium", "130"), ("glucose", "600"), ("correctionFactor", "2.4")],
        )
        .unwrap();
        assert!((hillier.value - 142.0).abs() < 1e-9);
    }

    #[test]
    fn test_osmolality_with_gap() {
        let outcome = run(
            "osmolality",
            &[
                ("sodium", "140"),
                ("glucose", "90"),
                ("urea", "14"),
                ("measuredOsm", "320"),
            ],
        )
        .unwrap();
        assert!((outcome.value - 290.0).abs() < 1e-9);
        assert!(outcome.details[0].1.starts_with("30 mOsm/kg (elevated"));
    }

    #[test]
    fn test_calcium_phosphate_product() {
        let outcome = run("ca_phos", &[("calcium", "10"), ("phosphate", "6")]).unwrap();
        assert_eq!(outcome.value, 60.0);
        assert!(outcome.interpretation.starts_with("Elevated"));
    }
}

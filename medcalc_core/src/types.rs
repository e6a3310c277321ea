//! Core domain types shared by the profile store, the hook and calculators.
//!
//! This module defines:
//! - The closed set of shared clinical fields
//! - Scalar form values and calculator-local form state
//! - The equality rule used when diffing local values against the profile

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Shared Fields
// ============================================================================

/// A clinical input whose value is mirrored into the session-wide profile
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SharedField {
    Weight,
    Height,
    Age,
    AgeUnit,
    Sex,
    Creatinine,
    CreatinineUnit,
    Albumin,
    AlbuminUnit,
    Glucose,
    GlucoseUnit,
    Sodium,
    Potassium,
    Chloride,
    Bicarb,
    Sbp,
    Dbp,
    Urea,
    UreaUnit,
    Spo2,
    HeartRate,
    Calcium,
    CalciumUnit,
    Phosphate,
    PhosphateUnit,
}

impl SharedField {
    /// Every shared field, in profile order
    pub const ALL: [SharedField; 25] = [
        SharedField::Weight,
        SharedField::Height,
        SharedField::Age,
        SharedField::AgeUnit,
        SharedField::Sex,
        SharedField::Creatinine,
        SharedField::CreatinineUnit,
        SharedField::Albumin,
        SharedField::AlbuminUnit,
        SharedField::Glucose,
        SharedField::GlucoseUnit,
        SharedField::Sodium,
        SharedField::Potassium,
        SharedField::Chloride,
        SharedField::Bicarb,
        SharedField::Sbp,
        SharedField::Dbp,
        SharedField::Urea,
        SharedField::UreaUnit,
        SharedField::Spo2,
        SharedField::HeartRate,
        SharedField::Calcium,
        SharedField::CalciumUnit,
        SharedField::Phosphate,
        SharedField::PhosphateUnit,
    ];

    /// The form key calculators use for this field
    pub fn as_str(self) -> &'static str {
        match self {
            SharedField::Weight => "weight",
            SharedField::Height => "height",
            SharedField::Age => "age",
            SharedField::AgeUnit => "ageUnit",
            SharedField::Sex => "sex",
            SharedField::Creatinine => "creatinine",
            SharedField::CreatinineUnit => "creatinineUnit",
            SharedField::Albumin => "albumin",
            SharedField::AlbuminUnit => "albuminUnit",
            SharedField::Glucose => "glucose",
            SharedField::GlucoseUnit => "glucoseUnit",
            SharedField::Sodium => "sodium",
            SharedField::Potassium => "potassium",
            SharedField::Chloride => "chloride",
            SharedField::Bicarb => "bicarb",
            SharedField::Sbp => "sbp",
            SharedField::Dbp => "dbp",
            SharedField::Urea => "urea",
            SharedField::UreaUnit => "ureaUnit",
            SharedField::Spo2 => "spo2",
            SharedField::HeartRate => "heartRate",
            SharedField::Calcium => "calcium",
            SharedField::CalciumUnit => "calciumUnit",
            SharedField::Phosphate => "phosphate",
            SharedField::PhosphateUnit => "phosphateUnit",
        }
    }

    /// Look up a form key, returning None for calculator-specific keys
    pub fn from_key(key: &str) -> Option<SharedField> {
        SharedField::ALL.iter().copied().find(|f| f.as_str() == key)
    }
}

impl fmt::Display for SharedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SharedField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SharedField::from_key(s).ok_or_else(|| Error::UnknownField(s.to_string()))
    }
}

// ============================================================================
// Field Values
// ============================================================================

/// A scalar form value: numeric-as-text, an enumerated unit string, or a number
///
/// The empty string is the "unset" value.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

// Numbers compare by bit pattern so every value, NaN included, equals itself
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::Number(a), FieldValue::Number(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl FieldValue {
    /// The unset value
    pub fn empty() -> Self {
        FieldValue::Text(String::new())
    }

    /// True only for empty text; a numeric zero is a real value
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Text(t) if t.is_empty())
    }

    /// Numeric reading of the value, if it has one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
            FieldValue::Text(t) => t.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(t) => Some(t),
            FieldValue::Number(_) => None,
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::empty()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(t) => f.write_str(t),
            FieldValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

/// Calculator-local mapping from field name to value
pub type FormState = BTreeMap<String, FieldValue>;

// ============================================================================
// Equality
// ============================================================================

/// How a local value is compared against the profile value
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EqualityMode {
    /// Same variant and same value: `"0"` and `0` differ
    #[default]
    Strict,
    /// Values that both read as numbers compare numerically: `"70"` equals `70.0`
    Numeric,
}

impl EqualityMode {
    pub fn values_equal(self, a: &FieldValue, b: &FieldValue) -> bool {
        match self {
            EqualityMode::Strict => a == b,
            EqualityMode::Numeric => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
        }
    }
}

impl FromStr for EqualityMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(EqualityMode::Strict),
            "numeric" => Ok(EqualityMode::Numeric),
            other => Err(Error::Config(format!("unknown equality mode: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_keys_round_trip_through_from_key() {
        for field in SharedField::ALL {
            assert_eq!(SharedField::from_key(field.as_str()), Some(field));
        }
        assert_eq!(SharedField::from_key("eyeResponse"), None);
    }

    #[test]
    fn test_serde_names_match_form_keys() {
        let json = serde_json::to_string(&SharedField::HeartRate).unwrap();
        assert_eq!(json, "\"heartRate\"");
        let parsed: SharedField = serde_json::from_str("\"creatinineUnit\"").unwrap();
        assert_eq!(parsed, SharedField::CreatinineUnit);
    }

    #[test]
    fn test_unknown_field_is_error() {
        let err = "bloodType".parse::<SharedField>().unwrap_err();
        assert!(matches!(err, Error::UnknownField(ref k) if k == "bloodType"));
    }

    #[test]
    fn test_empty_value() {
        assert!(FieldValue::empty().is_empty());
        assert!(!FieldValue::from("0").is_empty());
        assert!(!FieldValue::Number(0.0).is_empty());
    }

    #[test]
    fn test_strict_equality_keeps_types_apart() {
        let text = FieldValue::from("0");
        let number = FieldValue::Number(0.0);
        assert!(!EqualityMode::Strict.values_equal(&text, &number));
        assert!(EqualityMode::Strict.values_equal(&text, &FieldValue::from("0")));
    }

    #[test]
    fn test_nan_equals_itself_in_both_modes() {
        let nan = FieldValue::Number(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert!(EqualityMode::Strict.values_equal(&nan, &nan.clone()));
        assert!(EqualityMode::Numeric.values_equal(&nan, &nan.clone()));
        assert_eq!(nan.as_number(), None);
    }

    #[test]
    fn test_numeric_equality_normalizes() {
        assert!(EqualityMode::Numeric.values_equal(&FieldValue::from("70"), &FieldValue::Number(70.0)));
        assert!(EqualityMode::Numeric.values_equal(&FieldValue::from("70.0"), &FieldValue::from("70")));
        assert!(!EqualityMode::Numeric.values_equal(&FieldValue::from("mg/dL"), &FieldValue::from("mmol/L")));
    }

    #[test]
    fn test_untagged_json() {
        let v: FieldValue = serde_json::from_str("72.5").unwrap();
        assert_eq!(v, FieldValue::Number(72.5));
        let v: FieldValue = serde_json::from_str("\"male\"").unwrap();
        assert_eq!(v, FieldValue::from("male"));
    }
}

//! Declarative calculator table.
//!
//! Every calculator is a row: its fields (which double as the hook template)
//! and a pure `compute` function over the form state. Input validation lives
//! here, so the store and the hook only ever see opaque values.

use crate::{FieldValue, FormState, SharedField};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

pub mod anthropometry;
pub mod chemistry;
pub mod haemodynamics;
pub mod renal;
pub mod scores;
pub mod units;

// ============================================================================
// Field and Calculator Definitions
// ============================================================================

/// Grouping used by the shell when listing calculators
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Anthropometry,
    Renal,
    Electrolytes,
    Haemodynamics,
    Scores,
    Conversions,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Anthropometry,
        Category::Renal,
        Category::Electrolytes,
        Category::Haemodynamics,
        Category::Scores,
        Category::Conversions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Anthropometry => "anthropometry",
            Category::Renal => "renal",
            Category::Electrolytes => "electrolytes",
            Category::Haemodynamics => "haemodynamics",
            Category::Scores => "scores",
            Category::Conversions => "conversions",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        let s = s.to_lowercase();
        Category::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field is entered and validated
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Free numeric entry with a plausibility range
    Number {
        unit: &'static str,
        min: f64,
        max: f64,
    },
    /// One of a fixed set of strings
    Choice { options: &'static [&'static str] },
    /// Yes/no criterion
    Flag,
}

/// One input of a calculator form
#[derive(Clone, Debug, Serialize)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub default: &'static str,
    pub optional: bool,
}

impl FieldSpec {
    pub fn number(key: &'static str, label: &'static str, unit: &'static str, min: f64, max: f64) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Number { unit, min, max },
            default: "",
            optional: false,
        }
    }

    pub fn choice(
        key: &'static str,
        label: &'static str,
        options: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Choice { options },
            default,
            optional: false,
        }
    }

    pub fn flag(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Flag,
            default: "no",
            optional: false,
        }
    }

    /// Mark the field as not required for a result
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn shared(&self) -> Option<SharedField> {
        SharedField::from_key(self.key)
    }
}

/// Signature of every calculator formula
pub type ComputeFn = fn(&Inputs<'_>) -> Result<Outcome, InputError>;

/// A calculator row in the table
#[derive(Clone, Serialize)]
pub struct CalculatorDef {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub description: &'static str,
    pub tags: &'static [&'static str],
    pub fields: Vec<FieldSpec>,
    #[serde(skip)]
    pub compute: ComputeFn,
}

impl fmt::Debug for CalculatorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculatorDef")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("fields", &self.fields.len())
            .finish()
    }
}

impl CalculatorDef {
    /// Initial form state for the synchronization hook
    pub fn template(&self) -> FormState {
        self.fields
            .iter()
            .map(|f| (f.key.to_string(), FieldValue::from(f.default)))
            .collect()
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Shared fields this calculator declares
    pub fn shared_fields(&self) -> Vec<SharedField> {
        self.fields.iter().filter_map(FieldSpec::shared).collect()
    }

    /// Run the formula over a form state
    pub fn evaluate(&self, state: &FormState) -> Result<Outcome, InputError> {
        let inputs = Inputs::new(self, state);
        (self.compute)(&inputs)
    }

    fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.id.to_lowercase().contains(&q)
            || self.name.to_lowercase().contains(&q)
            || self.description.to_lowercase().contains(&q)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&q))
    }
}

// ============================================================================
// Inputs and Outcomes
// ============================================================================

/// A problem with what the user typed, reported by the calculator itself
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("enter a {0}")]
    Missing(String),

    #[error("enter a valid {0}")]
    Invalid(String),

    #[error("{label} must be between {min} and {max}")]
    OutOfRange { label: String, min: f64, max: f64 },

    #[error("{0}")]
    Inconsistent(String),
}

/// Typed access to a form state, validated against the calculator's fields
pub struct Inputs<'a> {
    def: &'a CalculatorDef,
    state: &'a FormState,
}

impl<'a> Inputs<'a> {
    pub fn new(def: &'a CalculatorDef, state: &'a FormState) -> Self {
        Self { def, state }
    }

    fn label(&self, key: &str) -> String {
        self.def
            .field(key)
            .map(|f| f.label.to_lowercase())
            .unwrap_or_else(|| key.to_string())
    }

    fn raw(&self, key: &str) -> Option<&'a FieldValue> {
        self.state.get(key).filter(|v| !v.is_empty())
    }

    /// Required numeric field
    pub fn number(&self, key: &str) -> Result<f64, InputError> {
        self.optional_number(key)?
            .ok_or_else(|| InputError::Missing(self.label(key)))
    }

    /// Numeric field that may be left blank
    pub fn optional_number(&self, key: &str) -> Result<Option<f64>, InputError> {
        let Some(raw) = self.raw(key) else {
            return Ok(None);
        };
        let value = raw
            .as_number()
            .ok_or_else(|| InputError::Invalid(self.label(key)))?;

        if let Some(FieldSpec {
            kind: FieldKind::Number { min, max, .. },
            ..
        }) = self.def.field(key)
        {
            if value < *min || value > *max {
                return Err(InputError::OutOfRange {
                    label: self.def.field(key).map(|f| f.label).unwrap_or(key).to_string(),
                    min: *min,
                    max: *max,
                });
            }
        }
        Ok(Some(value))
    }

    /// Required choice field; the value must be one of the declared options
    pub fn choice(&self, key: &str) -> Result<&'a str, InputError> {
        let raw = self
            .raw(key)
            .ok_or_else(|| InputError::Missing(self.label(key)))?;
        let text = raw
            .as_text()
            .ok_or_else(|| InputError::Invalid(self.label(key)))?;

        match self.def.field(key).map(|f| &f.kind) {
            Some(FieldKind::Choice { options }) if !options.iter().any(|o| *o == text) => {
                Err(InputError::Invalid(self.label(key)))
            }
            _ => Ok(text),
        }
    }

    /// Choice field parsed as a whole number (score items)
    pub fn points(&self, key: &str) -> Result<u32, InputError> {
        self.choice(key)?
            .parse::<u32>()
            .map_err(|_| InputError::Invalid(self.label(key)))
    }

    /// Yes/no field; blank reads as no
    pub fn flag(&self, key: &str) -> bool {
        match self.raw(key) {
            Some(FieldValue::Text(t)) => {
                matches!(t.to_lowercase().as_str(), "yes" | "y" | "true" | "1")
            }
            Some(FieldValue::Number(n)) => *n != 0.0,
            None => false,
        }
    }
}

/// A calculator result ready for display
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Outcome {
    pub value: f64,
    pub unit: &'static str,
    pub decimals: usize,
    pub interpretation: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<(String, String)>,
}

impl Outcome {
    pub fn new(value: f64, unit: &'static str, decimals: usize, interpretation: impl Into<String>) -> Self {
        Self {
            value,
            unit,
            decimals,
            interpretation: interpretation.into(),
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((label.into(), value.into()));
        self
    }

    /// Value with unit at the given precision, or the calculator's own
    pub fn format_value(&self, decimals: Option<usize>) -> String {
        let decimals = decimals.unwrap_or(self.decimals);
        if self.unit.is_empty() {
            format!("{:.*}", decimals, self.value)
        } else {
            format!("{:.*} {}", decimals, self.value, self.unit)
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// The table of available calculators
#[derive(Clone, Debug)]
pub struct Registry {
    calculators: Vec<CalculatorDef>,
}

/// Cached built-in table, built once and reused
static DEFAULT_REGISTRY: Lazy<Registry> = Lazy::new(build_default_registry);

/// Builds the built-in calculator table
///
/// Prefer `registry()` for lookups; this is kept for validation tests and
/// custom tables.
pub fn build_default_registry() -> Registry {
    let mut calculators = Vec::new();
    calculators.extend(anthropometry::calculators());
    calculators.extend(renal::calculators());
    calculators.extend(chemistry::calculators());
    calculators.extend(haemodynamics::calculators());
    calculators.extend(scores::calculators());
    calculators.push(units::glucose_converter());
    Registry { calculators }
}

pub fn registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

pub fn all_calculators() -> &'static [CalculatorDef] {
    registry().all()
}

pub fn get_calculator(id: &str) -> Option<&'static CalculatorDef> {
    registry().get(id)
}

/// Case-insensitive search over id, name, description and tags
pub fn search(query: &str) -> Vec<&'static CalculatorDef> {
    registry().search(query)
}

impl Registry {
    pub fn new(calculators: Vec<CalculatorDef>) -> Self {
        Self { calculators }
    }

    pub fn all(&self) -> &[CalculatorDef] {
        &self.calculators
    }

    pub fn get(&self, id: &str) -> Option<&CalculatorDef> {
        self.calculators.iter().find(|c| c.id == id)
    }

    pub fn search(&self, query: &str) -> Vec<&CalculatorDef> {
        let query = query.trim();
        if query.is_empty() {
            return self.calculators.iter().collect();
        }
        self.calculators.iter().filter(|c| c.matches(query)).collect()
    }

    pub fn by_category(&self, category: Category) -> Vec<&CalculatorDef> {
        self.calculators
            .iter()
            .filter(|c| c.category == category)
            .collect()
    }

    /// Validate the table for consistency
    ///
    /// Returns a list of validation errors (empty if valid)
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut ids = HashSet::new();

        for calc in &self.calculators {
            if !ids.insert(calc.id) {
                errors.push(format!("Duplicate calculator id '{}'", calc.id));
            }

            let mut keys = HashSet::new();
            for field in &calc.fields {
                if !keys.insert(field.key) {
                    errors.push(format!(
                        "Calculator '{}' declares field '{}' twice",
                        calc.id, field.key
                    ));
                }

                match &field.kind {
                    FieldKind::Choice { options } => {
                        if !field.default.is_empty() && !options.contains(&field.default) {
                            errors.push(format!(
                                "Calculator '{}' field '{}' default '{}' is not an option",
                                calc.id, field.key, field.default
                            ));
                        }
                    }
                    FieldKind::Number { min, max, .. } => {
                        if min >= max {
                            errors.push(format!(
                                "Calculator '{}' field '{}' has an empty range",
                                calc.id, field.key
                            ));
                        }
                    }
                    FieldKind::Flag => {}
                }

                if field.key.ends_with("Unit")
                    && field.shared().is_some()
                    && !matches!(field.kind, FieldKind::Choice { .. })
                {
                    errors.push(format!(
                        "Calculator '{}' unit field '{}' must be a choice",
                        calc.id, field.key
                    ));
                }
            }
        }

        errors
    }
}

//! Suggestion diffing between a calculator's form and the patient profile.

use crate::{EqualityMode, FieldValue, FormState, PatientProfile, SharedField};
use serde::Serialize;
use std::collections::BTreeMap;

/// Shared fields where the profile holds a different, non-empty value
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SuggestionSet {
    entries: BTreeMap<SharedField, FieldValue>,
}

impl SuggestionSet {
    pub fn get(&self, field: SharedField) -> Option<&FieldValue> {
        self.entries.get(&field)
    }

    pub fn contains(&self, field: SharedField) -> bool {
        self.entries.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SharedField, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}

/// Compute the suggestion set for one calculator
///
/// A field is suggested when it is a shared key, the form declares it, the
/// profile value is non-empty, and the two values differ under `mode`.
pub fn compute_suggestions(
    local: &FormState,
    profile: &PatientProfile,
    mode: EqualityMode,
) -> SuggestionSet {
    let entries = local
        .iter()
        .filter_map(|(key, local_value)| {
            let field = SharedField::from_key(key)?;
            let shared = profile.get(field);
            if shared.is_empty() || mode.values_equal(local_value, shared) {
                None
            } else {
                Some((field, shared.clone()))
            }
        })
        .collect();

    SuggestionSet { entries }
}

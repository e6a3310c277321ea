//! Field synchronization hook.
//!
//! A `FieldSync` binds one mounted calculator's form state to the session's
//! profile store:
//! - local state starts from the calculator's template, never from the store
//! - writes to shared keys are mirrored into the store
//! - suggestions are recomputed from local state and the current snapshot
//!
//! `update_field`, `update_fields`, `sync_field` and `sync_all` are
//! side-effecting: any shared key they touch is also written to the store,
//! which notifies every other mounted calculator.

use crate::{
    compute_suggestions, EqualityMode, FieldValue, FormState, ProfileStore, SharedField,
    Subscription, SuggestionSet,
};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Where a calculator instance stands relative to the shared profile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Nothing written since mount or reset, and nothing to suggest
    Blank,
    /// The user has edited fields and nothing is on offer
    Editing,
    /// The profile holds values this form does not yet reflect
    SuggestionAvailable,
    /// The last accepted suggestion left nothing outstanding
    Synced,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Blank,
    Editing,
    Synced,
}

/// Per-calculator form state bound to the shared profile store
pub struct FieldSync {
    store: ProfileStore,
    template: FormState,
    values: FormState,
    equality: EqualityMode,
    phase: Phase,
    suggestions: RefCell<Rc<SuggestionSet>>,
    profile_changed: Rc<Cell<bool>>,
    _subscription: Subscription,
}

impl std::fmt::Debug for FieldSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSync")
            .field("values", &self.values)
            .field("equality", &self.equality)
            .field("phase", &self.phase)
            .finish()
    }
}

impl FieldSync {
    /// Mount a form on the store using strict equality
    pub fn new(store: &ProfileStore, template: FormState) -> Self {
        Self::with_equality(store, template, EqualityMode::default())
    }

    /// Mount a form on the store with an explicit equality rule
    pub fn with_equality(store: &ProfileStore, template: FormState, equality: EqualityMode) -> Self {
        let profile_changed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&profile_changed);
        let subscription = store.subscribe(move |_| flag.set(true));

        let initial = compute_suggestions(&template, &store.get(), equality);

        Self {
            store: store.clone(),
            values: template.clone(),
            template,
            equality,
            phase: Phase::Blank,
            suggestions: RefCell::new(Rc::new(initial)),
            profile_changed,
            _subscription: subscription,
        }
    }

    /// Current local form state
    pub fn values(&self) -> &FormState {
        &self.values
    }

    pub fn value(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    /// The template this form was mounted with
    pub fn template(&self) -> &FormState {
        &self.template
    }

    pub fn equality(&self) -> EqualityMode {
        self.equality
    }

    /// Set one local field, mirroring it into the store if it is shared
    pub fn update_field(&mut self, key: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        self.values.insert(key.to_string(), value.clone());
        self.phase = Phase::Editing;

        if let Some(field) = SharedField::from_key(key) {
            tracing::trace!(field = %field, "Mirroring field into profile");
            self.store.update(field, value);
        }
    }

    /// Set several local fields; shared ones reach the store in one batch
    pub fn update_fields<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut shared = Vec::new();
        let mut touched = false;

        for (key, value) in entries {
            let key = key.into();
            let value = value.into();
            if let Some(field) = SharedField::from_key(&key) {
                shared.push((field, value.clone()));
            }
            self.values.insert(key, value);
            touched = true;
        }

        if touched {
            self.phase = Phase::Editing;
        }
        if !shared.is_empty() {
            self.store.update_many(shared);
        }
    }

    /// Restore the template; the shared store is left alone
    pub fn reset(&mut self) {
        self.values = self.template.clone();
        self.phase = Phase::Blank;
        tracing::debug!("Calculator form reset to template");
    }

    /// Accept the suggestion for `field`, if there is one
    ///
    /// Returns whether a suggestion was applied. Calling again once the
    /// field is in sync is a no-op.
    pub fn sync_field(&mut self, field: SharedField) -> bool {
        let suggestion = match self.suggestions().get(field) {
            Some(value) => value.clone(),
            None => return false,
        };

        tracing::debug!(field = %field, "Accepting profile suggestion");
        self.update_field(field.as_str(), suggestion);
        self.settle_after_sync();
        true
    }

    /// Accept every outstanding suggestion in one batched write
    ///
    /// Returns the fields that were applied.
    pub fn sync_all(&mut self) -> Vec<SharedField> {
        let pending = self.suggestions();
        if pending.is_empty() {
            return Vec::new();
        }

        let fields: Vec<SharedField> = pending.iter().map(|(f, _)| f).collect();
        tracing::debug!(fields = ?fields, "Accepting all profile suggestions");
        self.update_fields(pending.iter().map(|(f, v)| (f.as_str(), v.clone())));
        self.settle_after_sync();
        fields
    }

    /// Suggestions against the current profile snapshot
    ///
    /// Recomputed on every call. The previous `Rc` is handed back whenever
    /// the contents did not change.
    pub fn suggestions(&self) -> Rc<SuggestionSet> {
        let fresh = compute_suggestions(&self.values, &self.store.get(), self.equality);
        let mut cached = self.suggestions.borrow_mut();
        if **cached != fresh {
            *cached = Rc::new(fresh);
        }
        Rc::clone(&cached)
    }

    pub fn status(&self) -> SyncStatus {
        if !self.suggestions().is_empty() {
            return SyncStatus::SuggestionAvailable;
        }
        match self.phase {
            Phase::Blank => SyncStatus::Blank,
            Phase::Editing => SyncStatus::Editing,
            Phase::Synced => SyncStatus::Synced,
        }
    }

    /// Whether the store changed since the last call, clearing the flag
    ///
    /// Writes made through this hook count as changes too.
    pub fn take_profile_changed(&self) -> bool {
        self.profile_changed.replace(false)
    }

    fn settle_after_sync(&mut self) {
        self.phase = if self.suggestions().is_empty() {
            Phase::Synced
        } else {
            Phase::Editing
        };
    }
}

//! Session-wide patient profile store.
//!
//! One `ProfileStore` exists per application session. Every calculator's
//! synchronization hook holds a clone of the handle, writes shared fields
//! into it and reads snapshots back out of it. Each mutation notifies all
//! current subscribers synchronously before the call returns.

use crate::{FieldValue, SharedField};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

/// Default number of change records kept for display
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

static EMPTY_VALUE: FieldValue = FieldValue::Text(String::new());

/// The latest known value of every shared field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    fields: BTreeMap<SharedField, FieldValue>,
}

impl Default for PatientProfile {
    fn default() -> Self {
        Self {
            fields: SharedField::ALL
                .iter()
                .map(|f| (*f, FieldValue::empty()))
                .collect(),
        }
    }
}

impl PatientProfile {
    /// Current value of a field; unset fields read as the empty value
    pub fn get(&self, field: SharedField) -> &FieldValue {
        // A deserialized profile may omit keys
        self.fields.get(&field).unwrap_or(&EMPTY_VALUE)
    }

    /// True when no shared field holds a value
    pub fn is_empty(&self) -> bool {
        self.fields.values().all(FieldValue::is_empty)
    }

    /// Fields that currently hold a value, in profile order
    pub fn iter_set(&self) -> impl Iterator<Item = (SharedField, &FieldValue)> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (*k, v))
    }

    fn set(&mut self, field: SharedField, value: FieldValue) {
        self.fields.insert(field, value);
    }
}

/// What kind of mutation produced a change notification
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Update,
    Reset,
}

/// A single change notification, delivered once per store mutation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProfileChange {
    pub revision: u64,
    pub at: DateTime<Utc>,
    pub kind: ChangeKind,
    pub fields: Vec<SharedField>,
}

type Listener = Rc<dyn Fn(&ProfileChange)>;

struct StoreInner {
    snapshot: Rc<PatientProfile>,
    revision: u64,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
    history: VecDeque<ProfileChange>,
    history_limit: usize,
}

impl StoreInner {
    fn record(&mut self, change: ProfileChange) {
        if self.history_limit == 0 {
            return;
        }
        while self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(change);
    }
}

/// Handle to the session's patient profile
///
/// Cloning the handle shares the same underlying profile. The store is
/// single-threaded: all reads, writes and notifications happen on the
/// caller's thread, and last write wins.
#[derive(Clone)]
pub struct ProfileStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ProfileStore")
            .field("revision", &inner.revision)
            .field("subscribers", &inner.listeners.len())
            .finish()
    }
}

impl ProfileStore {
    /// Create a store with every field empty
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create a store keeping at most `limit` change records
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                snapshot: Rc::new(PatientProfile::default()),
                revision: 0,
                listeners: Vec::new(),
                next_listener_id: 0,
                history: VecDeque::new(),
                history_limit: limit,
            })),
        }
    }

    /// Current profile snapshot
    ///
    /// The returned snapshot is immutable: later writes produce a new
    /// profile and leave snapshots already handed out untouched.
    pub fn get(&self) -> Rc<PatientProfile> {
        Rc::clone(&self.inner.borrow().snapshot)
    }

    /// Number of mutations applied so far
    pub fn revision(&self) -> u64 {
        self.inner.borrow().revision
    }

    /// Set one field. Values are not validated here.
    pub fn update(&self, field: SharedField, value: impl Into<FieldValue>) {
        let value = value.into();
        self.commit(ChangeKind::Update, vec![field], move |profile| {
            profile.set(field, value);
        });
    }

    /// Set several fields with a single change notification
    pub fn update_many<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (SharedField, FieldValue)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        let fields = entries.iter().map(|(f, _)| *f).collect();
        self.commit(ChangeKind::Update, fields, move |profile| {
            for (field, value) in entries {
                profile.set(field, value);
            }
        });
    }

    /// Restore every field to empty with a single change notification
    pub fn reset(&self) {
        self.commit(ChangeKind::Reset, SharedField::ALL.to_vec(), |profile| {
            *profile = PatientProfile::default();
        });
    }

    /// Register a callback run after every mutation
    ///
    /// The callback may read the store. Dropping the returned guard
    /// unsubscribes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ProfileChange) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.push((id, Rc::new(callback)));
        tracing::trace!(subscription = id, "profile subscriber added");
        Subscription {
            id,
            store: Rc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Most recent change records, oldest first
    pub fn history(&self) -> Vec<ProfileChange> {
        self.inner.borrow().history.iter().cloned().collect()
    }

    fn commit<M>(&self, kind: ChangeKind, fields: Vec<SharedField>, mutate: M)
    where
        M: FnOnce(&mut PatientProfile),
    {
        let (change, listeners) = {
            let mut inner = self.inner.borrow_mut();
            mutate(Rc::make_mut(&mut inner.snapshot));
            inner.revision += 1;
            let change = ProfileChange {
                revision: inner.revision,
                at: Utc::now(),
                kind,
                fields,
            };
            inner.record(change.clone());
            let listeners: Vec<Listener> =
                inner.listeners.iter().map(|(_, l)| Rc::clone(l)).collect();
            (change, listeners)
        };

        // Field names only; clinical values stay out of the logs
        tracing::debug!(
            revision = change.revision,
            kind = ?change.kind,
            fields = ?change.fields,
            subscribers = listeners.len(),
            "Patient profile changed"
        );

        for listener in listeners {
            listener(&change);
        }
    }
}

/// Guard for a store subscription; unsubscribes on drop
pub struct Subscription {
    id: u64,
    store: Weak<RefCell<StoreInner>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            if let Ok(mut inner) = store.try_borrow_mut() {
                inner.listeners.retain(|(id, _)| *id != self.id);
                tracing::trace!(subscription = self.id, "profile subscriber removed");
            }
        }
    }
}

#![forbid(unsafe_code)]

//! Core model and synchronization logic for the medcalc calculator suite.
//!
//! This crate provides:
//! - Shared-field vocabulary and form values
//! - The session-wide patient profile store
//! - Suggestion diffing and the per-calculator field synchronization hook
//! - The declarative calculator table and its formulas
//! - Session composition, configuration and logging

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod profile;
pub mod suggestions;
pub mod sync;
pub mod calculators;
pub mod session;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use profile::{PatientProfile, ProfileChange, ProfileStore, Subscription};
pub use suggestions::{compute_suggestions, SuggestionSet};
pub use sync::{FieldSync, SyncStatus};
pub use calculators::{
    all_calculators, get_calculator, search, CalculatorDef, Category, FieldKind, FieldSpec,
    InputError, Inputs, Outcome,
};
pub use session::{MountedCalculator, Session};

//! # recordrules
//!
//! A rule-based validation engine for arbitrarily nested clinical records
//! (patient demographics, observations, medications, immunizations,
//! conditions, allergies). Records are `serde_json::Value` trees; rules are
//! composable, severity-tagged, and scoped to validation contexts
//! (import/export/storage/display/transmission/processing).
//!
//! ## Features
//!
//! - **Field-path resolution**: dotted/indexed paths over nested
//!   maps and sequences, with wildcard rule paths (`allergies.*`)
//! - **Closed rule model**: required, format, range, code-set, cross-field,
//!   temporal, completeness, and custom rules dispatched exhaustively
//! - **Typed domains**: range and temporal rules declare a number/date/
//!   datetime domain; coercion failures are reported, never silently passed
//! - **Pluggable validators**: named format and code-system predicates with
//!   a built-in healthcare set (email, phone, NPI, ICD-10, LOINC, ...)
//!
//! ## Quick Start
//!
//! ```rust
//! use recordrules::*;
//! use serde_json::json;
//!
//! # fn example() -> Result<()> {
//! let mut engine = ValidationEngine::new();
//! engine.register_rule(ValidationRule::required("name-required", "patient.name"))?;
//! engine.register_rule(
//!     ValidationRule::temporal("birth-in-past", "patient.birth_date", TemporalKind::Past),
//! )?;
//!
//! let record = json!({"patient": {"name": "Doe", "birth_date": "1990-05-17"}});
//! let results = engine.validate_object(&record, ValidationContext::Processing);
//! assert!(!has_blocking_failures(&results));
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Validation is synchronous and CPU-bound. Registration takes `&mut self`
//! and validation `&self`, so a configured engine can be shared (e.g. behind
//! an `Arc`) across threads; mutating it concurrently with validation is
//! rejected by the borrow checker rather than guarded by locks.

pub mod error;
pub mod path;
pub mod plugins;
pub mod predicates;
pub mod registry;
pub mod types;
pub mod validation;

pub use error::{RecordRulesError, Result};
pub use plugins::ValidatorRegistry;
pub use registry::RuleRegistry;
pub use types::{
    CrossFieldPredicate, CustomPredicate, PredicateOutcome, RangeBound, RangeDomain, RuleKind,
    Severity, TemporalKind, ValidationContext, ValidationResult, ValidationRule, count_failures,
    has_blocking_failures,
};
pub use validation::ValidationEngine;

//! Validation engine: orchestrates path discovery, rule lookup, dispatch,
//! and the whole-record cross-field and completeness passes.

pub(crate) mod coerce;
mod dispatch;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::path;
use crate::plugins::ValidatorRegistry;
use crate::registry::RuleRegistry;
use crate::types::{RuleKind, Severity, ValidationContext, ValidationResult, ValidationRule};

use dispatch::{RuleApplicationError, RuleEvaluation};

/// Rule-based validation engine over nested records.
///
/// The engine owns a rule registry and the format/code validator plugins.
/// Mutation (`register_*`, `unregister_rule`) takes `&mut self` while
/// validation takes `&self`, so the borrow checker rules out unsynchronized
/// concurrent mutation: configure the engine first, then share it (e.g.
/// behind an `Arc`) for concurrent validation calls.
///
/// Validation never returns an error. Every failure mode during evaluation
/// degrades to either a reported [`ValidationResult`] or a logged skip, so
/// callers always receive a (possibly empty) result list.
pub struct ValidationEngine {
    rules: RuleRegistry,
    validators: ValidatorRegistry,
}

impl ValidationEngine {
    /// Engine with an empty rule registry and the built-in format and code
    /// validators.
    pub fn new() -> Self {
        Self {
            rules: RuleRegistry::new(),
            validators: ValidatorRegistry::new(),
        }
    }

    /// Register a rule. Rejects a duplicate `rule_id`.
    pub fn register_rule(&mut self, rule: ValidationRule) -> Result<()> {
        self.rules.register(rule)
    }

    /// Remove a rule by id. Returns false when the id is unknown.
    pub fn unregister_rule(&mut self, rule_id: &str) -> bool {
        self.rules.unregister(rule_id)
    }

    /// Register (or replace) a named format validator.
    pub fn register_format_validator(
        &mut self,
        name: impl Into<String>,
        validator: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) {
        self.validators.register_format(name, validator);
    }

    /// Register (or replace) a named code-system validator.
    pub fn register_code_validator(
        &mut self,
        name: impl Into<String>,
        validator: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) {
        self.validators.register_code(name, validator);
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.rules
    }

    /// Validate a record in a context, discovering the field-path set from
    /// the record itself.
    ///
    /// Discovery enumerates the paths present in the record, so a per-field
    /// rule anchored at a wholly absent path does not fire here; use an
    /// explicit path list, [`Self::validate_field`], or a completeness rule
    /// to check for missing fields.
    pub fn validate_object(
        &self,
        record: &Value,
        context: ValidationContext,
    ) -> Vec<ValidationResult> {
        let paths: Vec<String> = path::extract_all_field_paths(record).into_iter().collect();
        self.validate(record, context, &paths)
    }

    /// Validate a record in a context against an explicit list of concrete
    /// field paths, skipping path discovery.
    pub fn validate_object_with_paths(
        &self,
        record: &Value,
        context: ValidationContext,
        paths: &[String],
    ) -> Vec<ValidationResult> {
        self.validate(record, context, paths)
    }

    /// Validate a single field: every applicable rule at the path (direct or
    /// wildcard) is dispatched, including cross-field rules anchored there.
    /// Completeness rules are whole-record and are not run here.
    pub fn validate_field(
        &self,
        record: &Value,
        field_path: &str,
        context: ValidationContext,
    ) -> Vec<ValidationResult> {
        let now = Utc::now().naive_utc();
        let value = path::get_field_value(record, field_path);

        self.rules
            .applicable_rules(field_path, context)
            .iter()
            .filter(|rule| !matches!(rule.kind, RuleKind::Completeness { .. }))
            .filter_map(|rule| {
                self.convert(
                    &rule.rule_id,
                    field_path,
                    dispatch::evaluate_rule(rule, field_path, value, record, &self.validators, now),
                )
            })
            .collect()
    }

    fn validate(
        &self,
        record: &Value,
        context: ValidationContext,
        paths: &[String],
    ) -> Vec<ValidationResult> {
        let now = Utc::now().naive_utc();
        let mut results = Vec::new();

        // Per-field pass. Cross-field and completeness rules are
        // whole-record and run exactly once in the passes below.
        for field_path in paths {
            let value = path::get_field_value(record, field_path);
            for rule in self.rules.applicable_rules(field_path, context) {
                if matches!(
                    rule.kind,
                    RuleKind::CrossField { .. } | RuleKind::Completeness { .. }
                ) {
                    continue;
                }
                results.extend(self.convert(
                    &rule.rule_id,
                    field_path,
                    dispatch::evaluate_rule(&rule, field_path, value, record, &self.validators, now),
                ));
            }
        }

        // Cross-field pass over the whole record.
        for rule in self.rules.rules() {
            if !rule.applies_in(context) || !matches!(rule.kind, RuleKind::CrossField { .. }) {
                continue;
            }
            let value = path::get_field_value(record, &rule.field_path);
            results.extend(self.convert(
                &rule.rule_id,
                &rule.field_path,
                dispatch::evaluate_rule(rule, &rule.field_path, value, record, &self.validators, now),
            ));
        }

        // Completeness pass: one result per rule.
        for rule in self.rules.rules() {
            if !rule.applies_in(context) {
                continue;
            }
            if let RuleKind::Completeness { required_fields } = &rule.kind {
                if let RuleEvaluation::Outcome(result) =
                    dispatch::evaluate_completeness(rule, required_fields, record)
                {
                    results.push(result);
                }
            }
        }

        debug!(
            paths = paths.len(),
            results = results.len(),
            ?context,
            "validated record"
        );

        results
    }

    /// Single conversion boundary for rule application errors: an `Err`
    /// becomes an Error-severity failing result and never propagates.
    fn convert(
        &self,
        rule_id: &str,
        field_path: &str,
        evaluation: std::result::Result<RuleEvaluation, RuleApplicationError>,
    ) -> Option<ValidationResult> {
        match evaluation {
            Ok(RuleEvaluation::Outcome(result)) => Some(result),
            Ok(RuleEvaluation::Skip) => None,
            Err(err) => Some(ValidationResult::failed(
                rule_id,
                field_path,
                Severity::Error,
                err.message,
            )),
        }
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rule::Severity;

/// Outcome of evaluating one rule against one field (or, for completeness
/// and cross-field rules, against the whole record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub severity: Severity,
    pub message: String,
    pub field_path: String,
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl ValidationResult {
    pub fn passed(
        rule_id: impl Into<String>,
        field_path: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            is_valid: true,
            severity,
            message: message.into(),
            field_path: field_path.into(),
            rule_id: rule_id.into(),
            metadata: None,
        }
    }

    pub fn failed(
        rule_id: impl Into<String>,
        field_path: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            is_valid: false,
            severity,
            message: message.into(),
            field_path: field_path.into(),
            rule_id: rule_id.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }

    /// An Error-severity failure blocks persistence/transmission downstream.
    /// Warnings are surfaced but non-blocking, Info is advisory only.
    pub fn is_blocking(&self) -> bool {
        !self.is_valid && self.severity == Severity::Error
    }
}

/// Number of failed results at the given severity.
pub fn count_failures(results: &[ValidationResult], severity: Severity) -> usize {
    results
        .iter()
        .filter(|r| !r.is_valid && r.severity == severity)
        .count()
}

/// Whether the result list contains any blocking failure.
pub fn has_blocking_failures(results: &[ValidationResult]) -> bool {
    results.iter().any(ValidationResult::is_blocking)
}

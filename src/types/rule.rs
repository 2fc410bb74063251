use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Blocking impact of a validation failure on downstream use of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Processing stage a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationContext {
    Import,
    Export,
    Storage,
    Display,
    Transmission,
    Processing,
}

/// Value domain a range rule compares in. The domain is fixed at rule
/// construction time; values that cannot be coerced into it fail validation
/// instead of being compared ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeDomain {
    Number,
    Date,
    DateTime,
}

/// A typed boundary for a range rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RangeBound {
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Temporal constraint applied to a date/datetime field.
#[derive(Debug, Clone, PartialEq)]
pub enum TemporalKind {
    /// The value must not be after the evaluation time.
    Past,
    /// The value must not be before the evaluation time.
    Future,
    /// The value is compared against another field of the same record.
    ///
    /// Without `offset_days` the comparison always passes; the variant then
    /// only documents the relationship. Callers that want an enforced bound
    /// must set the offset.
    RelativeToField {
        reference_field: String,
        offset_days: Option<i64>,
    },
}

/// Outcome of a user-supplied predicate. The `Err` branch carries the
/// predicate's failure text and is reported as an Error-severity result
/// instead of escaping the engine.
pub type PredicateOutcome = std::result::Result<bool, String>;

/// Predicate over the rule's own field plus its related fields, keyed by
/// path. Absent fields resolve to `None`.
pub type CrossFieldPredicate =
    Arc<dyn Fn(&HashMap<String, Option<Value>>, &Value) -> PredicateOutcome + Send + Sync>;

/// Predicate over a single resolved value and the whole record.
pub type CustomPredicate =
    Arc<dyn Fn(Option<&Value>, &Value) -> PredicateOutcome + Send + Sync>;

/// The rule-kind-specific part of a validation rule. Closed set: the
/// dispatcher matches exhaustively, so every kind is covered at compile time.
#[derive(Clone)]
pub enum RuleKind {
    Required {
        allow_empty: bool,
        allow_whitespace_only: bool,
    },
    Format {
        pattern: Option<String>,
        format_type: Option<String>,
        case_sensitive: bool,
    },
    Range {
        min_value: Option<RangeBound>,
        max_value: Option<RangeBound>,
        inclusive_min: bool,
        inclusive_max: bool,
        domain: RangeDomain,
    },
    CodeSet {
        code_system: String,
        allowed_codes: Option<Vec<String>>,
        code_system_version: Option<String>,
        validate_display_name: bool,
    },
    CrossField {
        related_fields: Vec<String>,
        predicate: CrossFieldPredicate,
    },
    Temporal {
        kind: TemporalKind,
    },
    Completeness {
        required_fields: Vec<String>,
    },
    Custom {
        predicate: CustomPredicate,
    },
}

impl fmt::Debug for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Required {
                allow_empty,
                allow_whitespace_only,
            } => f
                .debug_struct("Required")
                .field("allow_empty", allow_empty)
                .field("allow_whitespace_only", allow_whitespace_only)
                .finish(),
            RuleKind::Format {
                pattern,
                format_type,
                case_sensitive,
            } => f
                .debug_struct("Format")
                .field("pattern", pattern)
                .field("format_type", format_type)
                .field("case_sensitive", case_sensitive)
                .finish(),
            RuleKind::Range {
                min_value,
                max_value,
                inclusive_min,
                inclusive_max,
                domain,
            } => f
                .debug_struct("Range")
                .field("min_value", min_value)
                .field("max_value", max_value)
                .field("inclusive_min", inclusive_min)
                .field("inclusive_max", inclusive_max)
                .field("domain", domain)
                .finish(),
            RuleKind::CodeSet {
                code_system,
                allowed_codes,
                code_system_version,
                validate_display_name,
            } => f
                .debug_struct("CodeSet")
                .field("code_system", code_system)
                .field("allowed_codes", allowed_codes)
                .field("code_system_version", code_system_version)
                .field("validate_display_name", validate_display_name)
                .finish(),
            RuleKind::CrossField { related_fields, .. } => f
                .debug_struct("CrossField")
                .field("related_fields", related_fields)
                .field("predicate", &"<predicate>")
                .finish(),
            RuleKind::Temporal { kind } => {
                f.debug_struct("Temporal").field("kind", kind).finish()
            }
            RuleKind::Completeness { required_fields } => f
                .debug_struct("Completeness")
                .field("required_fields", required_fields)
                .finish(),
            RuleKind::Custom { .. } => f
                .debug_struct("Custom")
                .field("predicate", &"<predicate>")
                .finish(),
        }
    }
}

/// A single validation rule: common attributes plus the kind-specific payload.
///
/// Rules are constructed once, registered into a [`crate::ValidationEngine`],
/// and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ValidationRule {
    /// Unique rule identifier. Registration rejects duplicates.
    pub rule_id: String,
    /// Dotted field path the rule anchors to. A trailing `.*` makes the rule
    /// apply to every concrete path sharing the dotted prefix.
    pub field_path: String,
    pub description: String,
    pub severity: Severity,
    /// Contexts the rule applies in. Never empty; defaults to `{Processing}`.
    pub contexts: HashSet<ValidationContext>,
    pub active: bool,
    /// Overrides the default failure message when set.
    pub error_message: Option<String>,
    pub dependencies: Vec<String>,
    pub metadata: HashMap<String, Value>,
    pub kind: RuleKind,
}

impl ValidationRule {
    pub fn new(rule_id: impl Into<String>, field_path: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            rule_id: rule_id.into(),
            field_path: field_path.into(),
            description: String::new(),
            severity: Severity::Error,
            contexts: HashSet::from([ValidationContext::Processing]),
            active: true,
            error_message: None,
            dependencies: Vec::new(),
            metadata: HashMap::new(),
            kind,
        }
    }

    /// Required-field rule: rejects absent, null, empty, and whitespace-only
    /// values.
    pub fn required(rule_id: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self::new(
            rule_id,
            field_path,
            RuleKind::Required {
                allow_empty: false,
                allow_whitespace_only: false,
            },
        )
    }

    /// Format rule matching a regex pattern (case-sensitive by default).
    pub fn format_pattern(
        rule_id: impl Into<String>,
        field_path: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self::new(
            rule_id,
            field_path,
            RuleKind::Format {
                pattern: Some(pattern.into()),
                format_type: None,
                case_sensitive: true,
            },
        )
    }

    /// Format rule delegating to a named format validator (see
    /// [`crate::plugins::ValidatorRegistry`]).
    pub fn format_named(
        rule_id: impl Into<String>,
        field_path: impl Into<String>,
        format_type: impl Into<String>,
    ) -> Self {
        Self::new(
            rule_id,
            field_path,
            RuleKind::Format {
                pattern: None,
                format_type: Some(format_type.into()),
                case_sensitive: true,
            },
        )
    }

    /// Range rule with inclusive bounds in the given domain.
    pub fn range(
        rule_id: impl Into<String>,
        field_path: impl Into<String>,
        domain: RangeDomain,
        min_value: Option<RangeBound>,
        max_value: Option<RangeBound>,
    ) -> Self {
        Self::new(
            rule_id,
            field_path,
            RuleKind::Range {
                min_value,
                max_value,
                inclusive_min: true,
                inclusive_max: true,
                domain,
            },
        )
    }

    /// Code-set rule validating against a named code system.
    pub fn code_set(
        rule_id: impl Into<String>,
        field_path: impl Into<String>,
        code_system: impl Into<String>,
    ) -> Self {
        Self::new(
            rule_id,
            field_path,
            RuleKind::CodeSet {
                code_system: code_system.into(),
                allowed_codes: None,
                code_system_version: None,
                validate_display_name: false,
            },
        )
    }

    /// Cross-field rule evaluating a predicate over the anchor field and the
    /// related fields.
    pub fn cross_field(
        rule_id: impl Into<String>,
        field_path: impl Into<String>,
        related_fields: Vec<String>,
        predicate: CrossFieldPredicate,
    ) -> Self {
        Self::new(
            rule_id,
            field_path,
            RuleKind::CrossField {
                related_fields,
                predicate,
            },
        )
    }

    pub fn temporal(
        rule_id: impl Into<String>,
        field_path: impl Into<String>,
        kind: TemporalKind,
    ) -> Self {
        Self::new(rule_id, field_path, RuleKind::Temporal { kind })
    }

    /// Whole-record completeness rule. The anchor path is only used for
    /// reporting; the rule resolves every path in `required_fields`.
    pub fn completeness(
        rule_id: impl Into<String>,
        field_path: impl Into<String>,
        required_fields: Vec<String>,
    ) -> Self {
        Self::new(
            rule_id,
            field_path,
            RuleKind::Completeness { required_fields },
        )
    }

    pub fn custom(
        rule_id: impl Into<String>,
        field_path: impl Into<String>,
        predicate: CustomPredicate,
    ) -> Self {
        Self::new(rule_id, field_path, RuleKind::Custom { predicate })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Replaces the context set. An empty set is ignored and the current
    /// contexts are kept, preserving the never-empty invariant.
    pub fn with_contexts(mut self, contexts: HashSet<ValidationContext>) -> Self {
        if !contexts.is_empty() {
            self.contexts = contexts;
        }
        self
    }

    pub fn with_context(mut self, context: ValidationContext) -> Self {
        self.contexts.insert(context);
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Whether the rule applies in the given context.
    pub fn applies_in(&self, context: ValidationContext) -> bool {
        self.active && self.contexts.contains(&context)
    }

    /// Whether the rule's path is a wildcard (`prefix.*`).
    pub fn is_wildcard(&self) -> bool {
        self.field_path.ends_with(".*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_contexts_are_processing() {
        let rule = ValidationRule::required("r1", "patient.name");
        assert!(rule.contexts.contains(&ValidationContext::Processing));
        assert_eq!(rule.contexts.len(), 1);
        assert!(rule.active);
        assert_eq!(rule.severity, Severity::Error);
    }

    #[test]
    fn empty_context_set_is_ignored() {
        let rule = ValidationRule::required("r1", "patient.name").with_contexts(HashSet::new());
        assert!(!rule.contexts.is_empty());
    }

    #[test]
    fn inactive_rule_applies_nowhere() {
        let rule = ValidationRule::required("r1", "patient.name").with_active(false);
        assert!(!rule.applies_in(ValidationContext::Processing));
    }

    #[test]
    fn wildcard_detection() {
        assert!(ValidationRule::required("r1", "allergies.*").is_wildcard());
        assert!(!ValidationRule::required("r2", "allergies.0.code").is_wildcard());
    }

    #[test]
    fn debug_output_masks_predicates() {
        let rule = ValidationRule::custom(
            "r1",
            "patient.age",
            Arc::new(|_value, _record| Ok(true)),
        );
        let rendered = format!("{:?}", rule.kind);
        assert!(rendered.contains("<predicate>"));
    }
}

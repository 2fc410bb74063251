//! Per-rule-kind evaluation.
//!
//! Every rule kind is matched exhaustively. Evaluation returns
//! `Result<RuleEvaluation, RuleApplicationError>`: the `Ok` side is either a
//! skip or a single [`ValidationResult`], the `Err` side is a rule
//! application failure (coercion failure, predicate error) that the engine
//! converts into an Error-severity result at its single boundary. Nothing
//! here panics or propagates past that boundary.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use regex::RegexBuilder;
use serde_json::{Value, json};
use tracing::warn;

use super::coerce;
use crate::path;
use crate::plugins::ValidatorRegistry;
use crate::types::{
    RangeBound, RangeDomain, RuleKind, TemporalKind, ValidationResult, ValidationRule,
};

/// Outcome of dispatching one rule against one resolved value.
pub(crate) enum RuleEvaluation {
    /// The rule was inapplicable (absent value, misconfigured rule).
    Skip,
    /// The rule was evaluated and produced a result.
    Outcome(ValidationResult),
}

/// Failure while applying a rule, reported as an Error-severity result by
/// the engine.
pub(crate) struct RuleApplicationError {
    pub message: String,
}

type EvalResult = std::result::Result<RuleEvaluation, RuleApplicationError>;

fn fail(rule: &ValidationRule, path: &str, default_message: String) -> RuleEvaluation {
    let message = rule
        .error_message
        .clone()
        .unwrap_or(default_message);
    RuleEvaluation::Outcome(ValidationResult::failed(
        &rule.rule_id,
        path,
        rule.severity,
        message,
    ))
}

fn pass(rule: &ValidationRule, path: &str, message: impl Into<String>) -> RuleEvaluation {
    RuleEvaluation::Outcome(ValidationResult::passed(
        &rule.rule_id,
        path,
        rule.severity,
        message,
    ))
}

/// Evaluate one rule against the value resolved at `path`. `record` is the
/// whole record, needed by cross-field and custom predicates.
pub(crate) fn evaluate_rule(
    rule: &ValidationRule,
    path: &str,
    value: Option<&Value>,
    record: &Value,
    validators: &ValidatorRegistry,
    now: NaiveDateTime,
) -> EvalResult {
    // Null behaves like an absent value everywhere except the required check,
    // which reports it explicitly.
    let present = value.filter(|v| !v.is_null());

    match &rule.kind {
        RuleKind::Required {
            allow_empty,
            allow_whitespace_only,
        } => Ok(evaluate_required(
            rule,
            path,
            value,
            *allow_empty,
            *allow_whitespace_only,
        )),
        RuleKind::Format {
            pattern,
            format_type,
            case_sensitive,
        } => Ok(evaluate_format(
            rule,
            path,
            present,
            pattern.as_deref(),
            format_type.as_deref(),
            *case_sensitive,
            validators,
        )),
        RuleKind::Range {
            min_value,
            max_value,
            inclusive_min,
            inclusive_max,
            domain,
        } => evaluate_range(
            rule,
            path,
            present,
            *min_value,
            *max_value,
            *inclusive_min,
            *inclusive_max,
            *domain,
        ),
        RuleKind::CodeSet {
            code_system,
            allowed_codes,
            ..
        } => Ok(evaluate_code_set(
            rule,
            path,
            present,
            code_system,
            allowed_codes.as_deref(),
            validators,
        )),
        RuleKind::CrossField {
            related_fields,
            predicate,
        } => {
            let mut values: HashMap<String, Option<Value>> = HashMap::new();
            values.insert(
                rule.field_path.clone(),
                path::get_field_value(record, &rule.field_path).cloned(),
            );
            for field in related_fields {
                values.insert(field.clone(), path::get_field_value(record, field).cloned());
            }

            match predicate(&values, record) {
                Ok(true) => Ok(pass(rule, path, "Cross-field constraint satisfied")),
                Ok(false) => {
                    let mut fields: Vec<&str> =
                        related_fields.iter().map(String::as_str).collect();
                    fields.insert(0, rule.field_path.as_str());
                    Ok(fail(
                        rule,
                        path,
                        format!(
                            "Cross-field constraint failed for fields: {}",
                            fields.join(", ")
                        ),
                    ))
                }
                Err(message) => Err(RuleApplicationError {
                    message: format!("cross-field predicate failed: {message}"),
                }),
            }
        }
        RuleKind::Temporal { kind } => evaluate_temporal(rule, path, present, record, kind, now),
        RuleKind::Completeness { required_fields } => {
            Ok(evaluate_completeness(rule, required_fields, record))
        }
        RuleKind::Custom { predicate } => match predicate(present, record) {
            Ok(true) => Ok(pass(rule, path, "Custom constraint satisfied")),
            Ok(false) => Ok(fail(
                rule,
                path,
                format!("Custom constraint failed for field '{path}'"),
            )),
            Err(message) => Err(RuleApplicationError {
                message: format!("custom predicate failed: {message}"),
            }),
        },
    }
}

fn evaluate_required(
    rule: &ValidationRule,
    path: &str,
    value: Option<&Value>,
    allow_empty: bool,
    allow_whitespace_only: bool,
) -> RuleEvaluation {
    match value {
        None | Some(Value::Null) => fail(rule, path, format!("Required field '{path}' is missing")),
        Some(Value::String(s)) => {
            if s.is_empty() && !allow_empty {
                fail(rule, path, format!("Required field '{path}' is empty"))
            } else if !s.is_empty() && s.trim().is_empty() && !allow_whitespace_only {
                fail(
                    rule,
                    path,
                    format!("Required field '{path}' contains only whitespace"),
                )
            } else {
                pass(rule, path, format!("Required field '{path}' is present"))
            }
        }
        Some(_) => pass(rule, path, format!("Required field '{path}' is present")),
    }
}

fn evaluate_format(
    rule: &ValidationRule,
    path: &str,
    value: Option<&Value>,
    pattern: Option<&str>,
    format_type: Option<&str>,
    case_sensitive: bool,
    validators: &ValidatorRegistry,
) -> RuleEvaluation {
    let Some(value) = value else {
        return RuleEvaluation::Skip;
    };
    let text = coerce::value_to_string(value);
    if text.is_empty() {
        return RuleEvaluation::Skip;
    }

    if pattern.is_none() && format_type.is_none() {
        warn!(rule_id = %rule.rule_id, "format rule has neither pattern nor format type, skipping");
        return RuleEvaluation::Skip;
    }

    if let Some(pattern) = pattern {
        let regex = match RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
        {
            Ok(regex) => regex,
            Err(err) => {
                warn!(rule_id = %rule.rule_id, %err, "format rule has an invalid pattern, skipping");
                return RuleEvaluation::Skip;
            }
        };
        if !regex.is_match(&text) {
            return fail(
                rule,
                path,
                format!("Value '{text}' does not match the required pattern for '{path}'"),
            );
        }
    }

    if let Some(name) = format_type {
        let Some(validator) = validators.format_validator(name) else {
            warn!(rule_id = %rule.rule_id, format = name, "unknown format validator, skipping");
            return RuleEvaluation::Skip;
        };
        if !validator(&text) {
            return fail(
                rule,
                path,
                format!("Value '{text}' is not a valid {name} for '{path}'"),
            );
        }
    }

    pass(rule, path, format!("Value matches the '{path}' format"))
}

#[allow(clippy::too_many_arguments)]
fn evaluate_range(
    rule: &ValidationRule,
    path: &str,
    value: Option<&Value>,
    min_value: Option<RangeBound>,
    max_value: Option<RangeBound>,
    inclusive_min: bool,
    inclusive_max: bool,
    domain: RangeDomain,
) -> EvalResult {
    let Some(value) = value else {
        return Ok(RuleEvaluation::Skip);
    };

    let coerced = coerce::coerce_to_domain(value, domain).map_err(|message| {
        RuleApplicationError {
            message: format!("coercion failed: {message}"),
        }
    })?;

    let violation = match domain {
        RangeDomain::Number => check_bounds(
            coerce::bound_as_number(&coerced),
            resolve_bound(rule, min_value, coerce::bound_as_number),
            resolve_bound(rule, max_value, coerce::bound_as_number),
            inclusive_min,
            inclusive_max,
        ),
        RangeDomain::Date => check_bounds(
            coerce::bound_as_date(&coerced),
            resolve_bound(rule, min_value, |b| coerce::bound_as_date(b)),
            resolve_bound(rule, max_value, |b| coerce::bound_as_date(b)),
            inclusive_min,
            inclusive_max,
        ),
        RangeDomain::DateTime => check_bounds(
            coerce::bound_as_datetime(&coerced),
            resolve_bound(rule, min_value, |b| coerce::bound_as_datetime(b)),
            resolve_bound(rule, max_value, |b| coerce::bound_as_datetime(b)),
            inclusive_min,
            inclusive_max,
        ),
    };

    let text = coerce::value_to_string(value);
    Ok(match violation {
        Some(BoundViolation::BelowMin) => fail(
            rule,
            path,
            format!("Value '{text}' at '{path}' is below the allowed minimum"),
        ),
        Some(BoundViolation::AboveMax) => fail(
            rule,
            path,
            format!("Value '{text}' at '{path}' is above the allowed maximum"),
        ),
        None => pass(rule, path, format!("Value at '{path}' is within range")),
    })
}

enum BoundViolation {
    BelowMin,
    AboveMax,
}

/// Project a configured bound into the rule's domain. A bound from another
/// domain is a rule configuration problem: it is logged and the bound is not
/// enforced.
fn resolve_bound<T>(
    rule: &ValidationRule,
    bound: Option<RangeBound>,
    view: impl Fn(&RangeBound) -> Option<T>,
) -> Option<T> {
    let bound = bound?;
    let projected = view(&bound);
    if projected.is_none() {
        warn!(rule_id = %rule.rule_id, "range bound does not fit the rule domain, ignoring it");
    }
    projected
}

fn check_bounds<T: PartialOrd>(
    value: Option<T>,
    min: Option<T>,
    max: Option<T>,
    inclusive_min: bool,
    inclusive_max: bool,
) -> Option<BoundViolation> {
    let value = value?;

    if let Some(min) = min {
        let ok = if inclusive_min {
            value >= min
        } else {
            value > min
        };
        if !ok {
            return Some(BoundViolation::BelowMin);
        }
    }

    if let Some(max) = max {
        let ok = if inclusive_max {
            value <= max
        } else {
            value < max
        };
        if !ok {
            return Some(BoundViolation::AboveMax);
        }
    }

    None
}

fn evaluate_code_set(
    rule: &ValidationRule,
    path: &str,
    value: Option<&Value>,
    code_system: &str,
    allowed_codes: Option<&[String]>,
    validators: &ValidatorRegistry,
) -> RuleEvaluation {
    let Some(value) = value else {
        return RuleEvaluation::Skip;
    };

    // Coded values often arrive as mappings; the code lives under `code` or
    // `value`.
    let code_value = match value {
        Value::Object(map) => match map.get("code").or_else(|| map.get("value")) {
            Some(inner) => inner,
            None => {
                return fail(
                    rule,
                    path,
                    format!("Coded value at '{path}' has no 'code' or 'value' field"),
                );
            }
        },
        other => other,
    };

    let code = coerce::value_to_string(code_value);
    if code.is_empty() {
        return RuleEvaluation::Skip;
    }

    if let Some(allowed) = allowed_codes
        && !allowed.iter().any(|c| c == &code)
    {
        return fail(
            rule,
            path,
            format!("Code '{code}' at '{path}' is not in the allowed set"),
        );
    }

    if let Some(validator) = validators.code_validator(code_system)
        && !validator(&code)
    {
        return fail(
            rule,
            path,
            format!("Code '{code}' at '{path}' is not a valid {code_system} code"),
        );
    }

    pass(rule, path, format!("Code at '{path}' is accepted"))
}

fn evaluate_temporal(
    rule: &ValidationRule,
    path: &str,
    value: Option<&Value>,
    record: &Value,
    kind: &TemporalKind,
    now: NaiveDateTime,
) -> EvalResult {
    let Some(value) = value else {
        return Ok(RuleEvaluation::Skip);
    };

    let text = coerce::value_to_string(value);
    let parsed = coerce::parse_datetime(&text).ok_or_else(|| RuleApplicationError {
        message: format!("coercion failed: value '{text}' is not a valid date or datetime"),
    })?;

    match kind {
        TemporalKind::Past => {
            if parsed > now {
                Ok(fail(
                    rule,
                    path,
                    format!("Value '{text}' at '{path}' must be in the past"),
                ))
            } else {
                Ok(pass(rule, path, format!("Value at '{path}' is in the past")))
            }
        }
        TemporalKind::Future => {
            if parsed < now {
                Ok(fail(
                    rule,
                    path,
                    format!("Value '{text}' at '{path}' must be in the future"),
                ))
            } else {
                Ok(pass(
                    rule,
                    path,
                    format!("Value at '{path}' is in the future"),
                ))
            }
        }
        TemporalKind::RelativeToField {
            reference_field,
            offset_days,
        } => {
            let Some(reference) =
                path::get_field_value(record, reference_field).filter(|v| !v.is_null())
            else {
                // Missing reference field vacuously satisfies the rule, the
                // same policy cross-field date ordering follows.
                return Ok(RuleEvaluation::Skip);
            };

            let reference_text = coerce::value_to_string(reference);
            let reference_parsed =
                coerce::parse_datetime(&reference_text).ok_or_else(|| RuleApplicationError {
                    message: format!(
                        "coercion failed: reference field '{reference_field}' value \
                         '{reference_text}' is not a valid date or datetime"
                    ),
                })?;

            // Without an offset the relative constraint is informational and
            // always passes.
            let Some(offset_days) = offset_days else {
                return Ok(pass(
                    rule,
                    path,
                    format!("Value at '{path}' recorded relative to '{reference_field}'"),
                ));
            };

            let days_apart = (parsed - reference_parsed).num_days().abs();
            if days_apart > *offset_days {
                Ok(fail(
                    rule,
                    path,
                    format!(
                        "Value '{text}' at '{path}' is {days_apart} days from \
                         '{reference_field}', more than the allowed {offset_days}"
                    ),
                ))
            } else {
                Ok(pass(
                    rule,
                    path,
                    format!("Value at '{path}' is within {offset_days} days of '{reference_field}'"),
                ))
            }
        }
    }
}

/// Whole-record completeness check: every path in `required_fields` must
/// resolve to a non-absent, non-empty value. Emits exactly one result per
/// rule, carrying the missing-field list and the completeness percentage.
pub(crate) fn evaluate_completeness(
    rule: &ValidationRule,
    required_fields: &[String],
    record: &Value,
) -> RuleEvaluation {
    let missing: Vec<&String> = required_fields
        .iter()
        .filter(|field| {
            match path::get_field_value(record, field) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            }
        })
        .collect();

    let total = required_fields.len();
    let percentage = if total == 0 {
        100.0
    } else {
        (total - missing.len()) as f64 / total as f64 * 100.0
    };

    if missing.is_empty() {
        pass(
            rule,
            &rule.field_path,
            "All required fields are present".to_string(),
        )
    } else {
        let listed: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
        let evaluation = fail(
            rule,
            &rule.field_path,
            format!("Record is missing required fields: {}", listed.join(", ")),
        );
        match evaluation {
            RuleEvaluation::Outcome(result) => RuleEvaluation::Outcome(
                result
                    .with_metadata("missing_fields", json!(listed))
                    .with_metadata("completeness_percentage", json!(percentage)),
            ),
            skip => skip,
        }
    }
}

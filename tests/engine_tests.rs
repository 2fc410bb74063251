use std::sync::Arc;

use recordrules::*;
use serde_json::json;

fn patient_record() -> serde_json::Value {
    json!({
        "patient": {
            "name": "Doe",
            "birth_date": "1990-05-17",
            "email": "doe@example.org",
            "unhcr_id": "ABC-12X34567"
        },
        "condition": {
            "code": "A00.1",
            "onset_date": "2015-03-01"
        },
        "observation": {
            "heart_rate": 72
        }
    })
}

#[test]
fn empty_required_field_produces_exactly_one_error() {
    let mut engine = ValidationEngine::new();
    engine
        .register_rule(ValidationRule::required("name-required", "patient.name"))
        .unwrap();

    let record = json!({"patient": {"name": ""}});
    let results = engine.validate_object(&record, ValidationContext::Processing);

    let failures: Vec<_> = results.iter().filter(|r| !r.is_valid).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].rule_id, "name-required");
    assert_eq!(failures[0].severity, Severity::Error);
    assert!(failures[0].is_blocking());
}

#[test]
fn inclusive_range_bounds_and_coercion_failure() {
    let mut engine = ValidationEngine::new();
    engine
        .register_rule(ValidationRule::range(
            "rate-range",
            "observation.heart_rate",
            RangeDomain::Number,
            Some(RangeBound::Number(60.0)),
            Some(RangeBound::Number(300.0)),
        ))
        .unwrap();

    let verdict = |value: serde_json::Value| {
        let record = json!({"observation": {"heart_rate": value}});
        engine
            .validate_object(&record, ValidationContext::Processing)
            .into_iter()
            .find(|r| r.rule_id == "rate-range")
            .expect("range rule must produce a result")
    };

    assert!(verdict(json!(60)).is_valid);
    assert!(verdict(json!(300)).is_valid);
    assert!(!verdict(json!(59)).is_valid);
    assert!(!verdict(json!(301)).is_valid);

    // A non-numeric value fails with a distinct coercion message, never a
    // silent pass.
    let coercion = verdict(json!("racing"));
    assert!(!coercion.is_valid);
    assert_eq!(coercion.severity, Severity::Error);
    assert!(coercion.message.contains("coercion failed"));
}

#[test]
fn icd10_code_set_shapes() {
    let mut engine = ValidationEngine::new();
    engine
        .register_rule(ValidationRule::code_set(
            "condition-code",
            "condition.code",
            "ICD10",
        ))
        .unwrap();

    let verdict = |code: &str| {
        let record = json!({"condition": {"code": code}});
        engine
            .validate_object(&record, ValidationContext::Processing)
            .into_iter()
            .find(|r| r.rule_id == "condition-code")
            .expect("code rule must produce a result")
            .is_valid
    };

    assert!(verdict("A00"));
    assert!(verdict("A00.1"));
    assert!(!verdict("AA00"));
    assert!(!verdict("123"));
}

#[test]
fn unhcr_id_format_is_case_insensitive() {
    let mut engine = ValidationEngine::new();
    engine
        .register_rule(ValidationRule::format_named(
            "unhcr-format",
            "patient.unhcr_id",
            "unhcr_id",
        ))
        .unwrap();

    let verdict = |id: &str| {
        let record = json!({"patient": {"unhcr_id": id}});
        engine
            .validate_object(&record, ValidationContext::Processing)
            .into_iter()
            .find(|r| r.rule_id == "unhcr-format")
            .expect("format rule must produce a result")
            .is_valid
    };

    assert!(verdict("ABC-12X34567"));
    assert!(verdict("abc-12x34567"));
    assert!(!verdict("AB-12X34567"));
}

#[test]
fn cross_field_date_ordering() {
    let mut engine = ValidationEngine::new();
    engine
        .register_rule(
            ValidationRule::cross_field(
                "onset-after-birth",
                "condition.onset_date",
                vec!["patient.birth_date".to_string()],
                predicates::date_not_before("patient.birth_date", "condition.onset_date"),
            )
            .with_error_message(
                "condition.onset_date must not precede patient.birth_date",
            ),
        )
        .unwrap();

    // Onset strictly before birth: one error citing both paths.
    let bad = json!({
        "patient": {"birth_date": "1990-05-17"},
        "condition": {"onset_date": "1980-01-01"}
    });
    let failures: Vec<_> = engine
        .validate_object(&bad, ValidationContext::Processing)
        .into_iter()
        .filter(|r| !r.is_valid)
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].rule_id, "onset-after-birth");
    assert!(failures[0].message.contains("condition.onset_date"));
    assert!(failures[0].message.contains("patient.birth_date"));

    // Either field absent: vacuously satisfied.
    let incomplete = json!({"condition": {"onset_date": "1980-01-01"}});
    assert!(
        engine
            .validate_object(&incomplete, ValidationContext::Processing)
            .iter()
            .all(|r| r.is_valid)
    );
}

#[test]
fn cross_field_rules_run_even_when_their_field_is_absent_from_paths() {
    let mut engine = ValidationEngine::new();
    engine
        .register_rule(ValidationRule::cross_field(
            "onset-after-birth",
            "condition.onset_date",
            vec!["patient.birth_date".to_string()],
            predicates::date_not_before("patient.birth_date", "condition.onset_date"),
        ))
        .unwrap();

    let record = json!({
        "patient": {"birth_date": "1990-05-17"},
        "condition": {"onset_date": "1980-01-01"}
    });
    // Explicit path list that does not mention either field; the
    // cross-field pass still runs over the whole record.
    let paths = vec!["patient.name".to_string()];
    let results = engine.validate_object_with_paths(&record, ValidationContext::Processing, &paths);
    assert!(results.iter().any(|r| !r.is_valid && r.rule_id == "onset-after-birth"));
}

#[test]
fn completeness_result_carries_percentage_metadata() {
    let mut engine = ValidationEngine::new();
    engine
        .register_rule(ValidationRule::completeness(
            "demographics-complete",
            "patient",
            vec![
                "patient.name".to_string(),
                "patient.birth_date".to_string(),
                "patient.gender".to_string(),
                "patient.address".to_string(),
            ],
        ))
        .unwrap();

    let record = json!({"patient": {"name": "Doe", "birth_date": "1990-05-17"}});
    let results = engine.validate_object(&record, ValidationContext::Processing);

    let completeness: Vec<_> = results
        .iter()
        .filter(|r| r.rule_id == "demographics-complete")
        .collect();
    assert_eq!(completeness.len(), 1);
    assert!(!completeness[0].is_valid);

    let metadata = completeness[0].metadata.as_ref().unwrap();
    assert_eq!(metadata["completeness_percentage"], json!(50.0));
    assert_eq!(
        metadata["missing_fields"],
        json!(["patient.gender", "patient.address"])
    );
}

#[test]
fn predicate_error_is_isolated_to_one_result() {
    let mut engine = ValidationEngine::new();
    engine
        .register_rule(ValidationRule::custom(
            "exploding",
            "patient.name",
            Arc::new(|_value, _record| Err("reference data unavailable".to_string())),
        ))
        .unwrap();
    engine
        .register_rule(ValidationRule::required("name-required", "patient.name"))
        .unwrap();
    engine
        .register_rule(ValidationRule::required("birth-required", "patient.birth_date"))
        .unwrap();

    let results = engine.validate_object(&patient_record(), ValidationContext::Processing);

    let exploded: Vec<_> = results.iter().filter(|r| r.rule_id == "exploding").collect();
    assert_eq!(exploded.len(), 1);
    assert!(!exploded[0].is_valid);
    assert_eq!(exploded[0].severity, Severity::Error);
    assert!(exploded[0].message.contains("reference data unavailable"));

    // Other rules on the same and other fields still ran.
    assert!(results.iter().any(|r| r.rule_id == "name-required" && r.is_valid));
    assert!(results.iter().any(|r| r.rule_id == "birth-required" && r.is_valid));
}

#[test]
fn validation_is_idempotent() {
    let mut engine = ValidationEngine::new();
    engine
        .register_rule(ValidationRule::required("name-required", "patient.name"))
        .unwrap();
    engine
        .register_rule(ValidationRule::format_named("email-format", "patient.email", "email"))
        .unwrap();
    engine
        .register_rule(ValidationRule::temporal(
            "birth-in-past",
            "patient.birth_date",
            TemporalKind::Past,
        ))
        .unwrap();

    let record = patient_record();
    let mut first = engine.validate_object(&record, ValidationContext::Processing);
    let mut second = engine.validate_object(&record, ValidationContext::Processing);

    let key = |r: &ValidationResult| (r.rule_id.clone(), r.field_path.clone(), r.is_valid);
    first.sort_by_key(key);
    second.sort_by_key(key);
    assert_eq!(first, second);
}

#[test]
fn duplicate_rule_registration_is_rejected() {
    let mut engine = ValidationEngine::new();
    engine
        .register_rule(ValidationRule::required("r1", "patient.name"))
        .unwrap();

    let err = engine
        .register_rule(ValidationRule::required("r1", "patient.gender"))
        .unwrap_err();
    assert!(matches!(err, RecordRulesError::DuplicateRule { .. }));
}

#[test]
fn severities_map_to_blocking_behavior() {
    let mut engine = ValidationEngine::new();
    engine
        .register_rule(
            ValidationRule::required("name-required", "patient.name")
                .with_severity(Severity::Error),
        )
        .unwrap();
    engine
        .register_rule(
            ValidationRule::format_named("phone-format", "patient.phone", "phone")
                .with_severity(Severity::Warning),
        )
        .unwrap();

    let record = json!({"patient": {"name": "", "phone": "12"}});
    let results = engine.validate_object(&record, ValidationContext::Processing);

    assert!(has_blocking_failures(&results));
    assert_eq!(count_failures(&results, Severity::Error), 1);
    assert_eq!(count_failures(&results, Severity::Warning), 1);

    // With the name present only the warning remains, which does not block.
    let record = json!({"patient": {"name": "Doe", "phone": "12"}});
    let results = engine.validate_object(&record, ValidationContext::Processing);
    assert!(!has_blocking_failures(&results));
    assert_eq!(count_failures(&results, Severity::Warning), 1);
}

#[test]
fn configured_engine_can_be_shared_across_threads() {
    let mut engine = ValidationEngine::new();
    engine
        .register_rule(ValidationRule::required("name-required", "patient.name"))
        .unwrap();

    let engine = Arc::new(engine);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                let record = json!({"patient": {"name": "Doe"}});
                engine
                    .validate_object(&record, ValidationContext::Processing)
                    .len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 1);
    }
}

//! Stock cross-field predicates.

use std::sync::Arc;

use crate::types::CrossFieldPredicate;
use crate::validation::coerce;

/// Predicate enforcing that the date at `later_path` is not before the date
/// at `earlier_path` (e.g. a condition's onset must not precede the
/// patient's birth date).
///
/// A missing value at either path vacuously satisfies the predicate:
/// incomplete records pass this check. That is a deliberate, known policy of
/// the date-ordering rule family, not a defect; pair with required or
/// completeness rules to reject the missing fields themselves.
/// An unparseable value at either path is a predicate error and surfaces as
/// an Error-severity result.
pub fn date_not_before(
    earlier_path: impl Into<String>,
    later_path: impl Into<String>,
) -> CrossFieldPredicate {
    let earlier_path = earlier_path.into();
    let later_path = later_path.into();

    Arc::new(move |values, _record| {
        let resolve = |path: &str| values.get(path).and_then(|v| v.as_ref()).filter(|v| !v.is_null());

        let (Some(earlier), Some(later)) = (resolve(&earlier_path), resolve(&later_path)) else {
            return Ok(true);
        };

        let parse = |path: &str, value: &serde_json::Value| {
            let text = coerce::value_to_string(value);
            coerce::parse_datetime(&text)
                .ok_or_else(|| format!("field '{path}' value '{text}' is not a valid date"))
        };

        let earlier = parse(&earlier_path, earlier)?;
        let later = parse(&later_path, later)?;
        Ok(later >= earlier)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    fn values(pairs: &[(&str, Option<Value>)]) -> HashMap<String, Option<Value>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn ordered_dates_pass() {
        let predicate = date_not_before("patient.birth_date", "condition.onset_date");
        let map = values(&[
            ("patient.birth_date", Some(json!("1990-05-17"))),
            ("condition.onset_date", Some(json!("2015-03-01"))),
        ]);
        assert_eq!(predicate(&map, &json!({})), Ok(true));
    }

    #[test]
    fn reversed_dates_fail() {
        let predicate = date_not_before("patient.birth_date", "condition.onset_date");
        let map = values(&[
            ("patient.birth_date", Some(json!("1990-05-17"))),
            ("condition.onset_date", Some(json!("1980-01-01"))),
        ]);
        assert_eq!(predicate(&map, &json!({})), Ok(false));
    }

    #[test]
    fn equal_dates_pass() {
        let predicate = date_not_before("a", "b");
        let map = values(&[
            ("a", Some(json!("1990-05-17"))),
            ("b", Some(json!("1990-05-17"))),
        ]);
        assert_eq!(predicate(&map, &json!({})), Ok(true));
    }

    #[test]
    fn missing_field_is_vacuously_satisfied() {
        let predicate = date_not_before("patient.birth_date", "condition.onset_date");
        let map = values(&[
            ("patient.birth_date", None),
            ("condition.onset_date", Some(json!("2015-03-01"))),
        ]);
        assert_eq!(predicate(&map, &json!({})), Ok(true));
    }

    #[test]
    fn unparseable_date_is_a_predicate_error() {
        let predicate = date_not_before("a", "b");
        let map = values(&[
            ("a", Some(json!("not-a-date"))),
            ("b", Some(json!("2015-03-01"))),
        ]);
        assert!(predicate(&map, &json!({})).is_err());
    }
}

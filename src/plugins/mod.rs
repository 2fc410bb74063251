//! Pluggable validator functions.
//!
//! Two named registries of pure `(&str) -> bool` predicates: format
//! validators (string-shape checks used by format rules) and code-system
//! validators (coded-value shape checks used by code-set rules). Both come
//! seeded with the built-in set below; callers may register additional
//! validators or replace existing ones.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

pub type ValidatorFn = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Named registries for format and code-system validators.
pub struct ValidatorRegistry {
    format: HashMap<String, ValidatorFn>,
    code: HashMap<String, ValidatorFn>,
}

impl ValidatorRegistry {
    /// Registry seeded with the built-in format and code validators.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_format("email", is_email);
        registry.register_format("phone", is_phone);
        registry.register_format("url", is_url);
        registry.register_format("date", is_date);
        registry.register_format("datetime", is_datetime);
        registry.register_format("uuid", is_uuid);
        registry.register_format("ssn", is_ssn);
        registry.register_format("npi", is_npi);
        registry.register_format("ein", is_ein);
        registry.register_format("postal_code", is_postal_code);
        registry.register_format("unhcr_id", is_unhcr_id);

        registry.register_code("ICD10", is_icd10);
        registry.register_code("CPT", is_cpt);
        registry.register_code("LOINC", is_loinc);
        registry.register_code("SNOMED", is_snomed);
        registry.register_code("RXNORM", is_rxnorm);
        registry.register_code("CVX", is_cvx);
        registry.register_code("NDC", is_ndc);

        registry
    }

    /// Registry with no validators at all.
    pub fn empty() -> Self {
        Self {
            format: HashMap::new(),
            code: HashMap::new(),
        }
    }

    pub fn register_format(
        &mut self,
        name: impl Into<String>,
        validator: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) {
        let name = name.into();
        if self.format.insert(name.clone(), Box::new(validator)).is_some() {
            warn!(validator = %name, "replacing existing format validator");
        }
    }

    pub fn register_code(
        &mut self,
        name: impl Into<String>,
        validator: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) {
        let name = name.into();
        if self.code.insert(name.clone(), Box::new(validator)).is_some() {
            warn!(validator = %name, "replacing existing code validator");
        }
    }

    pub fn format_validator(&self, name: &str) -> Option<&ValidatorFn> {
        self.format.get(name)
    }

    pub fn code_validator(&self, name: &str) -> Option<&ValidatorFn> {
        self.code.get(name)
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// --- built-in format validators ---

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap()
});

fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

fn is_phone(value: &str) -> bool {
    let digits: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '+' | '-'))
        .collect();
    (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

static DATE_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

fn is_date(value: &str) -> bool {
    // chrono's %m/%d accept non-zero-padded components; gate on the shape
    // first, then let chrono reject impossible calendar dates.
    DATE_SHAPE_RE.is_match(value)
        && chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn is_datetime(value: &str) -> bool {
    // Unlike the lenient range/temporal coercion, the named validator
    // requires a time component.
    chrono::DateTime::parse_from_rfc3339(value).is_ok()
        || chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

fn is_uuid(value: &str) -> bool {
    // parse_str also accepts the 32-hex simple form; require the hyphenated
    // 8-4-4-4-12 shape.
    value.len() == 36 && uuid::Uuid::parse_str(value).is_ok()
}

fn stripped_digits(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .collect();
    cleaned
        .chars()
        .all(|c| c.is_ascii_digit())
        .then_some(cleaned)
}

fn is_ssn(value: &str) -> bool {
    stripped_digits(value).is_some_and(|d| d.len() == 9)
}

/// NPI check: ten digits where the last is a Luhn check digit over the first
/// nine (doubling every other digit from the right, folding digits above 9,
/// then `(sum * 9) mod 10`).
fn is_npi(value: &str) -> bool {
    if value.len() != 10 || !value.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    let check = digits[9];
    let mut sum = 0;
    for (i, digit) in digits[..9].iter().rev().enumerate() {
        let mut digit = *digit;
        if i % 2 == 0 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }

    (sum * 9) % 10 == check
}

fn is_ein(value: &str) -> bool {
    stripped_digits(value).is_some_and(|d| d.len() == 9)
}

static POSTAL_US_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").unwrap());
static POSTAL_CA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]\d[A-Za-z] ?\d[A-Za-z]\d$").unwrap());
static POSTAL_UK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{1,2}\d[A-Za-z\d]? ?\d[A-Za-z]{2}$").unwrap());
static POSTAL_GENERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4,6}$").unwrap());

fn is_postal_code(value: &str) -> bool {
    POSTAL_US_RE.is_match(value)
        || POSTAL_CA_RE.is_match(value)
        || POSTAL_UK_RE.is_match(value)
        || POSTAL_GENERIC_RE.is_match(value)
}

static UNHCR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Z]{3}-\d{2}[A-Z]\d{5,7}$").unwrap());

fn is_unhcr_id(value: &str) -> bool {
    UNHCR_RE.is_match(value)
}

// --- built-in code-system validators ---

static ICD10_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]\d{2}(\.\d{1,4})?$").unwrap());
static CPT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{5}|\d{4}[A-Z])$").unwrap());
static LOINC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,5}-\d$").unwrap());
static SNOMED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{6,18}$").unwrap());
static RXNORM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,7}$").unwrap());
static CVX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,3}$").unwrap());

fn is_icd10(value: &str) -> bool {
    ICD10_RE.is_match(value)
}

fn is_cpt(value: &str) -> bool {
    CPT_RE.is_match(value)
}

fn is_loinc(value: &str) -> bool {
    LOINC_RE.is_match(value)
}

fn is_snomed(value: &str) -> bool {
    SNOMED_RE.is_match(value)
}

fn is_rxnorm(value: &str) -> bool {
    RXNORM_RE.is_match(value)
}

fn is_cvx(value: &str) -> bool {
    CVX_RE.is_match(value)
}

fn is_ndc(value: &str) -> bool {
    stripped_digits(value).is_some_and(|d| d.len() == 10 || d.len() == 11)
}

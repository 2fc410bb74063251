pub mod result;
pub mod rule;

pub use result::{ValidationResult, count_failures, has_blocking_failures};
pub use rule::{
    CrossFieldPredicate, CustomPredicate, PredicateOutcome, RangeBound, RangeDomain, RuleKind,
    Severity, TemporalKind, ValidationContext, ValidationRule,
};

//! Rule storage indexed by field path and by rule id.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{RecordRulesError, Result};
use crate::types::{ValidationContext, ValidationRule};

/// Read-mostly store of validation rules. Rules are indexed twice: by their
/// field path (including wildcard paths) for per-field lookup, and by rule id
/// for removal and whole-registry passes.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    by_path: HashMap<String, Vec<Arc<ValidationRule>>>,
    by_id: HashMap<String, Arc<ValidationRule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule into both indices. A duplicate `rule_id` is rejected so
    /// the two indices can never disagree about which rule an id refers to.
    pub fn register(&mut self, rule: ValidationRule) -> Result<()> {
        if self.by_id.contains_key(&rule.rule_id) {
            return Err(RecordRulesError::DuplicateRule {
                rule_id: rule.rule_id,
            });
        }

        let rule = Arc::new(rule);
        self.by_path
            .entry(rule.field_path.clone())
            .or_default()
            .push(Arc::clone(&rule));
        debug!(rule_id = %rule.rule_id, field_path = %rule.field_path, "registered rule");
        self.by_id.insert(rule.rule_id.clone(), rule);
        Ok(())
    }

    /// Remove a rule from both indices. Returns false when the id is unknown.
    pub fn unregister(&mut self, rule_id: &str) -> bool {
        let Some(rule) = self.by_id.remove(rule_id) else {
            return false;
        };

        if let Some(rules) = self.by_path.get_mut(&rule.field_path) {
            rules.retain(|r| r.rule_id != rule_id);
            if rules.is_empty() {
                self.by_path.remove(&rule.field_path);
            }
        }
        debug!(rule_id, "unregistered rule");
        true
    }

    pub fn get(&self, rule_id: &str) -> Option<&Arc<ValidationRule>> {
        self.by_id.get(rule_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All registered rules, in no particular order.
    pub fn rules(&self) -> impl Iterator<Item = &Arc<ValidationRule>> {
        self.by_id.values()
    }

    /// Rules applicable to a concrete path in a context: rules registered
    /// directly at the path, then wildcard rules registered at
    /// `prefix + ".*"` for every non-empty proper prefix of the path.
    pub fn applicable_rules(
        &self,
        path: &str,
        context: ValidationContext,
    ) -> Vec<Arc<ValidationRule>> {
        let mut matched = Vec::new();

        if let Some(rules) = self.by_path.get(path) {
            matched.extend(
                rules
                    .iter()
                    .filter(|r| r.applies_in(context))
                    .map(Arc::clone),
            );
        }

        let segments: Vec<&str> = path.split('.').collect();
        for prefix_len in 1..segments.len() {
            let wildcard = format!("{}.*", segments[..prefix_len].join("."));
            if let Some(rules) = self.by_path.get(&wildcard) {
                matched.extend(
                    rules
                        .iter()
                        .filter(|r| r.applies_in(context))
                        .map(Arc::clone),
                );
            }
        }

        matched
    }
}

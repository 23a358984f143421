//! Dot-path field resolution and condition checks.
//!
//! Paths are resolved against the serialized contract document. A path that
//! leads nowhere is `Unresolvable`, never a silent `false`; the evaluator
//! still treats it as "condition not met", but reports it.

use std::borrow::Cow;

use serde_json::Value as JsonValue;

use crate::rule::{ConditionOperator, RuleCondition};

/// Outcome of resolving a dot path.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    Value(Cow<'a, JsonValue>),
    Unresolvable,
}

/// Outcome of checking one condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionOutcome {
    Met,
    NotMet,
    /// The field path or the operand types made the check meaningless.
    Unresolvable(String),
}

impl ConditionOutcome {
    pub fn is_met(&self) -> bool {
        matches!(self, ConditionOutcome::Met)
    }
}

/// Resolve `path` (e.g. `buyer.name`, `qualitySpecs.micronaire`) in `document`.
///
/// Objects are indexed by key, arrays by numeric segment. `length` on an
/// array or string yields its length.
pub fn resolve<'a>(document: &'a JsonValue, path: &str) -> Resolution<'a> {
    if path.trim().is_empty() {
        return Resolution::Unresolvable;
    }

    let mut current = document;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let is_last = segments.peek().is_none();
        match current {
            JsonValue::Object(map) => match map.get(segment) {
                Some(next) => current = next,
                None => return Resolution::Unresolvable,
            },
            JsonValue::Array(items) => {
                if segment == "length" && is_last {
                    return Resolution::Value(Cow::Owned(JsonValue::from(items.len())));
                }
                match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                    Some(next) => current = next,
                    None => return Resolution::Unresolvable,
                }
            }
            JsonValue::String(s) if segment == "length" && is_last => {
                return Resolution::Value(Cow::Owned(JsonValue::from(s.chars().count())));
            }
            _ => return Resolution::Unresolvable,
        }
    }

    Resolution::Value(Cow::Borrowed(current))
}

/// Check one condition against the contract document.
pub fn check_condition(document: &JsonValue, condition: &RuleCondition) -> ConditionOutcome {
    let field = match resolve(document, &condition.field) {
        Resolution::Value(v) => v,
        Resolution::Unresolvable => {
            return ConditionOutcome::Unresolvable(format!(
                "field '{}' not found",
                condition.field
            ));
        }
    };

    let held = match condition.operator {
        ConditionOperator::Equals => Some(values_equal(&field, &condition.value)),
        ConditionOperator::GreaterThan => {
            numbers(&field, &condition.value).map(|(f, v)| f > v)
        }
        ConditionOperator::LessThan => numbers(&field, &condition.value).map(|(f, v)| f < v),
        ConditionOperator::Contains => contains(&field, &condition.value),
        ConditionOperator::Between => {
            let Some(upper) = condition.value2.as_ref() else {
                return ConditionOutcome::Unresolvable(format!(
                    "between on '{}' has no upper bound",
                    condition.field
                ));
            };
            match (field.as_f64(), condition.value.as_f64(), upper.as_f64()) {
                (Some(f), Some(lo), Some(hi)) => Some(lo <= f && f <= hi),
                _ => None,
            }
        }
    };

    match held {
        Some(true) => ConditionOutcome::Met,
        Some(false) => ConditionOutcome::NotMet,
        None => ConditionOutcome::Unresolvable(format!(
            "operand type mismatch on '{}'",
            condition.field
        )),
    }
}

fn numbers(field: &JsonValue, value: &JsonValue) -> Option<(f64, f64)> {
    Some((field.as_f64()?, value.as_f64()?))
}

fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn contains(field: &JsonValue, value: &JsonValue) -> Option<bool> {
    match (field, value) {
        (JsonValue::String(haystack), JsonValue::String(needle)) => {
            Some(haystack.contains(needle.as_str()))
        }
        (JsonValue::Array(items), v) => Some(items.iter().any(|item| values_equal(item, v))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> JsonValue {
        json!({
            "quantityBales": 1500,
            "bargainType": "Pucca Sauda",
            "buyer": { "name": "Mahalaxmi Spinners" },
            "tags": ["export", "priority"],
            "qualitySpecs": { "micronaire": 4.1 },
            "note": null
        })
    }

    #[test]
    fn resolves_nested_paths() {
        let d = doc();
        assert_eq!(
            resolve(&d, "buyer.name"),
            Resolution::Value(Cow::Owned(json!("Mahalaxmi Spinners")))
        );
        assert_eq!(resolve(&d, "tags.1"), Resolution::Value(Cow::Owned(json!("priority"))));
        assert_eq!(resolve(&d, "tags.length"), Resolution::Value(Cow::Owned(json!(2))));
        assert_eq!(resolve(&d, "buyer.name.length"), Resolution::Value(Cow::Owned(json!(18))));
    }

    #[test]
    fn missing_paths_are_unresolvable() {
        let d = doc();
        assert_eq!(resolve(&d, "seller.name"), Resolution::Unresolvable);
        assert_eq!(resolve(&d, "quantityBales.value"), Resolution::Unresolvable);
        assert_eq!(resolve(&d, "tags.9"), Resolution::Unresolvable);
        assert_eq!(resolve(&d, ""), Resolution::Unresolvable);
        assert_eq!(resolve(&d, "note.inner"), Resolution::Unresolvable);
    }

    #[test]
    fn operators_apply_to_resolved_values() {
        let d = doc();
        assert!(check_condition(&d, &RuleCondition::greater_than("quantityBales", 1000)).is_met());
        assert!(!check_condition(&d, &RuleCondition::less_than("quantityBales", 1000)).is_met());
        assert!(check_condition(&d, &RuleCondition::equals("quantityBales", 1500.0)).is_met());
        assert!(check_condition(&d, &RuleCondition::equals("bargainType", "Pucca Sauda")).is_met());
        assert!(check_condition(&d, &RuleCondition::contains("bargainType", "Pucca")).is_met());
        assert!(check_condition(&d, &RuleCondition::contains("tags", "export")).is_met());
        assert_eq!(
            check_condition(&d, &RuleCondition::contains("tags", "domestic")),
            ConditionOutcome::NotMet
        );
    }

    #[test]
    fn between_is_inclusive_on_both_bounds() {
        let d = doc();
        assert!(check_condition(&d, &RuleCondition::between("quantityBales", 1500, 2000)).is_met());
        assert!(check_condition(&d, &RuleCondition::between("quantityBales", 1000, 1500)).is_met());
        assert_eq!(
            check_condition(&d, &RuleCondition::between("quantityBales", 1501, 2000)),
            ConditionOutcome::NotMet
        );
    }

    #[test]
    fn malformed_conditions_are_unresolvable_not_false() {
        let d = doc();
        let no_upper = RuleCondition::new("quantityBales", ConditionOperator::Between, json!(1));
        assert!(matches!(check_condition(&d, &no_upper), ConditionOutcome::Unresolvable(_)));
        assert!(matches!(
            check_condition(&d, &RuleCondition::greater_than("bargainType", 10)),
            ConditionOutcome::Unresolvable(_)
        ));
        assert!(matches!(
            check_condition(&d, &RuleCondition::equals("qualitySpecs.trashPercent", 3)),
            ConditionOutcome::Unresolvable(_)
        ));
    }
}

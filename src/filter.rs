//! Metadata filter evaluation
//!
//! A filter maps metadata keys to either a scalar (equality shorthand) or
//! an operator map (`$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`,
//! `$nin`, `$contains`). Entries combine with implicit AND. A missing key
//! or an unknown operator fails the predicate — it is never an error.

use serde_json::Value;

use crate::models::Metadata;

/// True when `metadata` satisfies every entry of `filter`.
pub fn matches(metadata: &Metadata, filter: &Metadata) -> bool {
    for (key, condition) in filter {
        let Some(actual) = metadata.get(key) else {
            return false;
        };
        match condition {
            Value::Object(ops) => {
                for (op, expected) in ops {
                    if !op_matches(op, actual, expected) {
                        return false;
                    }
                }
            }
            scalar => {
                if actual != scalar {
                    return false;
                }
            }
        }
    }
    true
}

fn op_matches(op: &str, actual: &Value, expected: &Value) -> bool {
    match op {
        "$eq" => actual == expected,
        "$ne" => actual != expected,
        "$gt" | "$gte" | "$lt" | "$lte" => numeric_cmp(op, actual, expected),
        "$in" => expected
            .as_array()
            .is_some_and(|seq| seq.contains(actual)),
        "$nin" => expected
            .as_array()
            .is_some_and(|seq| !seq.contains(actual)),
        "$contains" => match (actual.as_str(), expected.as_str()) {
            (Some(haystack), Some(needle)) => haystack.contains(needle),
            _ => false,
        },
        other => {
            tracing::warn!(operator = other, "Unsupported filter operator");
            false
        }
    }
}

/// Numeric comparison; fails when either side is not a number.
fn numeric_cmp(op: &str, actual: &Value, expected: &Value) -> bool {
    let (Some(a), Some(b)) = (actual.as_f64(), expected.as_f64()) else {
        return false;
    };
    match op {
        "$gt" => a > b,
        "$gte" => a >= b,
        "$lt" => a < b,
        "$lte" => a <= b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: Value) -> Metadata {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn test_scalar_shorthand_equality() {
        let m = meta(json!({"source": "a", "page": 1}));
        assert!(matches(&m, &meta(json!({"source": "a"}))));
        assert!(!matches(&m, &meta(json!({"source": "b"}))));
    }

    #[test]
    fn test_missing_key_fails() {
        let m = meta(json!({"source": "a"}));
        assert!(!matches(&m, &meta(json!({"author": "x"}))));
    }

    #[test]
    fn test_implicit_and_across_keys() {
        let m = meta(json!({"source": "a", "page": 3}));
        assert!(matches(&m, &meta(json!({"source": "a", "page": {"$gt": 1}}))));
        assert!(!matches(&m, &meta(json!({"source": "a", "page": {"$gt": 5}}))));
    }

    #[test]
    fn test_eq_ne() {
        let m = meta(json!({"lang": "en"}));
        assert!(matches(&m, &meta(json!({"lang": {"$eq": "en"}}))));
        assert!(matches(&m, &meta(json!({"lang": {"$ne": "fr"}}))));
        assert!(!matches(&m, &meta(json!({"lang": {"$ne": "en"}}))));
    }

    #[test]
    fn test_numeric_comparisons() {
        let m = meta(json!({"page": 5}));
        assert!(matches(&m, &meta(json!({"page": {"$gte": 5}}))));
        assert!(matches(&m, &meta(json!({"page": {"$lt": 6}}))));
        assert!(!matches(&m, &meta(json!({"page": {"$lte": 4}}))));
        // Float filter against integer metadata
        assert!(matches(&m, &meta(json!({"page": {"$gt": 4.5}}))));
    }

    #[test]
    fn test_numeric_comparison_rejects_non_numbers() {
        let m = meta(json!({"page": "five"}));
        assert!(!matches(&m, &meta(json!({"page": {"$gt": 1}}))));

        let m = meta(json!({"page": 5}));
        assert!(!matches(&m, &meta(json!({"page": {"$gt": "one"}}))));
    }

    #[test]
    fn test_in_nin() {
        let m = meta(json!({"source": "a"}));
        assert!(matches(&m, &meta(json!({"source": {"$in": ["a", "b"]}}))));
        assert!(!matches(&m, &meta(json!({"source": {"$in": ["c"]}}))));
        assert!(matches(&m, &meta(json!({"source": {"$nin": ["c"]}}))));
        assert!(!matches(&m, &meta(json!({"source": {"$nin": ["a"]}}))));
        // Non-sequence operand fails the predicate either way
        assert!(!matches(&m, &meta(json!({"source": {"$in": "a"}}))));
        assert!(!matches(&m, &meta(json!({"source": {"$nin": "a"}}))));
    }

    #[test]
    fn test_contains() {
        let m = meta(json!({"title": "introduction to graphs"}));
        assert!(matches(&m, &meta(json!({"title": {"$contains": "graphs"}}))));
        assert!(!matches(&m, &meta(json!({"title": {"$contains": "trees"}}))));
        // Non-string sides fail
        let m = meta(json!({"title": 42}));
        assert!(!matches(&m, &meta(json!({"title": {"$contains": "4"}}))));
    }

    #[test]
    fn test_unknown_operator_fails_not_errors() {
        let m = meta(json!({"page": 1}));
        assert!(!matches(&m, &meta(json!({"page": {"$regex": ".*"}}))));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let m = meta(json!({"anything": true}));
        assert!(matches(&m, &Metadata::new()));
    }

    #[test]
    fn test_multiple_operators_all_must_hold() {
        let m = meta(json!({"page": 5}));
        assert!(matches(&m, &meta(json!({"page": {"$gt": 1, "$lt": 10}}))));
        assert!(!matches(&m, &meta(json!({"page": {"$gt": 1, "$lt": 5}}))));
    }
}

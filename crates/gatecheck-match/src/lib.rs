//! Gatecheck Match - deterministic output pattern matching
//!
//! Compares an observed artifact output against an expected-output pattern:
//! - Subset semantics: only keys named by the pattern are inspected
//! - Wildcard operators: `$exists`, `$startsWith:`, `$contains:`
//! - Numeric tolerance for nondeterministic outputs
//! - Substring comparison for `error`/`errorMessage` text
//! - Recursion into nested objects
//!
//! Unrecognized `$`-prefixed operators are skipped rather than failed, so
//! new operators can ship before every matcher knows them.

#![warn(unreachable_pub)]

use gatecheck_types::MatchTolerance;
use serde_json::Value;

/// Presence wildcard: the key must exist, any value
const OP_EXISTS: &str = "$exists";
/// Prefix operator: the value must be a string with the given prefix
const OP_STARTS_WITH: &str = "$startsWith:";
/// Substring operator: the value must be a string containing the fragment
const OP_CONTAINS: &str = "$contains:";

/// Keys whose string values are compared by substring, since error text
/// varies with context
const ERROR_KEYS: [&str; 2] = ["error", "errorMessage"];

/// Recursive pattern matcher with configurable numeric tolerance
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    tolerance: MatchTolerance,
}

impl PatternMatcher {
    /// Create a matcher with default tolerance
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matcher with the given tolerance
    #[inline]
    #[must_use]
    pub fn with_tolerance(tolerance: MatchTolerance) -> Self {
        Self { tolerance }
    }

    /// Match an observed output against an expected pattern
    ///
    /// Subset semantics: every key in `pattern` must be satisfied by
    /// `actual`; keys absent from the pattern are never inspected.
    #[must_use]
    pub fn matches(&self, actual: &Value, pattern: &Value) -> bool {
        let Some(pattern_map) = pattern.as_object() else {
            // Scalar or array pattern: plain equality
            return self.value_matches(None, actual, pattern);
        };

        let Some(actual_map) = actual.as_object() else {
            // Object pattern against a non-object output always fails
            return false;
        };

        for (key, expected) in pattern_map {
            if let Some(op) = expected.as_str() {
                if op == OP_EXISTS {
                    if !actual_map.contains_key(key) {
                        return false;
                    }
                    continue;
                }
                if let Some(prefix) = op.strip_prefix(OP_STARTS_WITH) {
                    match actual_map.get(key).and_then(Value::as_str) {
                        Some(s) if s.starts_with(prefix) => continue,
                        _ => return false,
                    }
                }
                if let Some(fragment) = op.strip_prefix(OP_CONTAINS) {
                    match actual_map.get(key).and_then(Value::as_str) {
                        Some(s) if s.contains(fragment) => continue,
                        _ => return false,
                    }
                }
                if op.starts_with('$') {
                    // Unknown operator: skip, never fail
                    continue;
                }
            }

            let Some(actual_value) = actual_map.get(key) else {
                return false;
            };

            if !self.value_matches(Some(key), actual_value, expected) {
                return false;
            }
        }

        true
    }

    /// Match a single value, with the owning key for error-text handling
    fn value_matches(&self, key: Option<&str>, actual: &Value, expected: &Value) -> bool {
        if let (Some(a), Some(e)) = (actual.as_f64(), expected.as_f64()) {
            return (a - e).abs() <= self.tolerance.allowance(e);
        }

        if let (Some(k), Some(a), Some(e)) = (key, actual.as_str(), expected.as_str()) {
            if ERROR_KEYS.contains(&k) {
                return a.contains(e);
            }
        }

        if expected.is_object() {
            return self.matches(actual, expected);
        }

        actual == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_subset_passes() {
        let matcher = PatternMatcher::new();
        let actual = json!({"city": "Oslo", "country": "NO", "population": 700_000});
        let pattern = json!({"city": "Oslo"});
        assert!(matcher.matches(&actual, &pattern));
    }

    #[test]
    fn missing_key_fails() {
        let matcher = PatternMatcher::new();
        assert!(!matcher.matches(&json!({"city": "Oslo"}), &json!({"region": "east"})));
    }

    #[test]
    fn non_object_actual_fails() {
        let matcher = PatternMatcher::new();
        assert!(!matcher.matches(&json!("just a string"), &json!({"city": "Oslo"})));
        assert!(!matcher.matches(&Value::Null, &json!({"city": "Oslo"})));
    }

    #[test]
    fn exists_wildcard() {
        let matcher = PatternMatcher::new();
        assert!(matcher.matches(&json!({"id": 9}), &json!({"id": "$exists"})));
        assert!(matcher.matches(&json!({"id": null}), &json!({"id": "$exists"})));
        assert!(!matcher.matches(&json!({"other": 9}), &json!({"id": "$exists"})));
    }

    #[test]
    fn starts_with_operator() {
        let matcher = PatternMatcher::new();
        let actual = json!({"greeting": "Hello, Oslo"});
        assert!(matcher.matches(&actual, &json!({"greeting": "$startsWith:Hello"})));
        assert!(!matcher.matches(&actual, &json!({"greeting": "$startsWith:Goodbye"})));
        assert!(!matcher.matches(&json!({"greeting": 7}), &json!({"greeting": "$startsWith:H"})));
    }

    #[test]
    fn contains_operator() {
        let matcher = PatternMatcher::new();
        let actual = json!({"summary": "sunny with showers"});
        assert!(matcher.matches(&actual, &json!({"summary": "$contains:showers"})));
        assert!(!matcher.matches(&actual, &json!({"summary": "$contains:snow"})));
    }

    #[test]
    fn unknown_operator_is_ignored() {
        let matcher = PatternMatcher::new();
        // Key absent and operator unknown: still passes
        assert!(matcher.matches(&json!({}), &json!({"anything": "$matchesRegex:^a"})));
        // Other keys still checked
        assert!(!matcher.matches(
            &json!({"x": 1}),
            &json!({"x": 2_000, "y": "$someFutureOp:arg"})
        ));
    }

    #[test]
    fn numeric_tolerance_relative() {
        let matcher = PatternMatcher::new();
        // 20% of 100 is 20
        assert!(matcher.matches(&json!({"n": 119.0}), &json!({"n": 100})));
        assert!(!matcher.matches(&json!({"n": 121.0}), &json!({"n": 100})));
    }

    #[test]
    fn numeric_tolerance_absolute_floor() {
        let matcher = PatternMatcher::new();
        // 20% of 2 is 0.4, floor of 5 applies
        assert!(matcher.matches(&json!({"n": 6.9}), &json!({"n": 2})));
        assert!(!matcher.matches(&json!({"n": 7.1}), &json!({"n": 2})));
    }

    #[test]
    fn celsius_within_tolerance() {
        // 20% of 20 is 4, observed drift of 1.5 is inside it
        let matcher = PatternMatcher::new();
        assert!(matcher.matches(&json!({"celsius": 21.5}), &json!({"celsius": 20})));
    }

    #[test]
    fn error_text_substring() {
        let matcher = PatternMatcher::new();
        let actual = json!({"error": "city 'Atlantis' not found in region db"});
        assert!(matcher.matches(&actual, &json!({"error": "not found"})));
        assert!(!matcher.matches(&actual, &json!({"error": "timed out"})));

        let actual = json!({"errorMessage": "invalid input: city required"});
        assert!(matcher.matches(&actual, &json!({"errorMessage": "city required"})));
    }

    #[test]
    fn substring_rule_is_error_keys_only() {
        let matcher = PatternMatcher::new();
        // Ordinary string keys need exact equality
        assert!(!matcher.matches(&json!({"city": "Oslo, Norway"}), &json!({"city": "Oslo"})));
    }

    #[test]
    fn nested_object_recursion() {
        let matcher = PatternMatcher::new();
        let actual = json!({"result": {"temp": {"celsius": 21.0}, "city": "Oslo"}});
        let pattern = json!({"result": {"temp": {"celsius": 20}}});
        assert!(matcher.matches(&actual, &pattern));

        let pattern = json!({"result": {"temp": {"celsius": 40}}});
        assert!(!matcher.matches(&actual, &pattern));
    }

    #[test]
    fn nested_pattern_against_scalar_fails() {
        let matcher = PatternMatcher::new();
        let actual = json!({"result": "flat"});
        assert!(!matcher.matches(&actual, &json!({"result": {"temp": 20}})));
    }

    #[test]
    fn custom_tolerance() {
        let matcher = PatternMatcher::with_tolerance(MatchTolerance {
            relative: 0.0,
            absolute: 0.5,
        });
        assert!(matcher.matches(&json!({"n": 100.4}), &json!({"n": 100})));
        assert!(!matcher.matches(&json!({"n": 101.0}), &json!({"n": 100})));
    }

    #[test]
    fn array_values_compared_exactly() {
        let matcher = PatternMatcher::new();
        let actual = json!({"tags": ["a", "b"]});
        assert!(matcher.matches(&actual, &json!({"tags": ["a", "b"]})));
        assert!(!matcher.matches(&actual, &json!({"tags": ["a"]})));
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            proptest::bool::ANY.prop_map(Value::Bool),
            (-1_000_000i64..1_000_000).prop_map(|n| json!(n)),
            "[a-z]{1,12}".prop_map(Value::String),
        ]
    }

    fn object() -> impl Strategy<Value = Map<String, Value>> {
        proptest::collection::btree_map("[a-z]{1,8}", scalar(), 1..6)
            .prop_map(|m| m.into_iter().collect())
    }

    proptest! {
        /// Any pattern built from a subset of the actual object's own
        /// entries matches (error keys excluded, substring rule differs).
        #[test]
        fn subset_of_self_always_matches(entries in object()) {
            let actual = Value::Object(entries.clone());
            let subset: Map<String, Value> = entries
                .into_iter()
                .enumerate()
                .filter(|(i, _)| i % 2 == 0)
                .map(|(_, kv)| kv)
                .collect();

            let matcher = PatternMatcher::new();
            prop_assert!(matcher.matches(&actual, &Value::Object(subset)));
        }

        /// Numeric pairs beyond max(20%, 5) never match.
        #[test]
        fn out_of_tolerance_numbers_fail(expected in -10_000i64..10_000, extra in 1u32..1_000) {
            let e = expected as f64;
            let allowance = (e.abs() * 0.2).max(5.0);
            let a = e + allowance + f64::from(extra);

            let matcher = PatternMatcher::new();
            let actual = json!({"n": a});
            let expected = json!({"n": e});
            prop_assert!(!matcher.matches(&actual, &expected));
        }

        /// Numeric pairs inside the allowance always match.
        #[test]
        fn in_tolerance_numbers_pass(expected in -10_000i64..10_000, frac in 0.0f64..0.99) {
            let e = expected as f64;
            let a = e + (e.abs() * 0.2).max(5.0) * frac;

            let matcher = PatternMatcher::new();
            let actual = json!({"n": a});
            let expected = json!({"n": e});
            prop_assert!(matcher.matches(&actual, &expected));
        }
    }
}

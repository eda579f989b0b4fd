//! The shared JSON value abstraction consumed by the schema, path and JTD crates.
//!
//! A raw parser result (`serde_json::Value`) is reused directly as the value model:
//! its variants already line up with the sum type this toolkit needs (`Null`, `Bool`,
//! `Number`, `String`, `Array`, `Object`), and with the `preserve_order` feature enabled
//! on `serde_json` its `Map` iterates members in insertion order. The `arbitrary_precision`
//! feature is also enabled, so `Number` carries the exact textual lexeme it was parsed
//! from alongside its `f64` projection — a 25-digit integer or a `1.50`-with-trailing-zero
//! literal serializes back to the same digits instead of being rounded through an `f64`
//! or truncated to an `i64`/`u64`. What's missing from `serde_json::Value`'s own
//! `PartialEq` is the numeric normalization JSON Schema requires (`1 == 1.0`), so that
//! lives here as a free function rather than a newtype, to avoid forcing every caller
//! to unwrap a wrapper around the value they already have.

use std::cmp::Ordering;
use std::fmt;

pub use serde_json::{Map, Number};

/// The JSON value type shared across this workspace.
pub type Value = serde_json::Value;

/// The classification of a [`Value`], used by the `type` keyword and by error messages.
///
/// `Integer` is a refinement of `Number`: a JSON number with zero fractional part is
/// both a `Number` and an `Integer` for the purposes of the `type` keyword's `integer`
/// variant, but `kind` always reports the more specific `Integer` when applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Null,
    Boolean,
    Object,
    Array,
    String,
    Integer,
    Number,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveType::Null => "null",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Object => "object",
            PrimitiveType::Array => "array",
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Number => "number",
        };
        f.write_str(name)
    }
}

impl PrimitiveType {
    /// Parse a JSON Schema `type` keyword value, e.g. `"string"` or `"integer"`.
    pub fn from_name(name: &str) -> Option<PrimitiveType> {
        Some(match name {
            "null" => PrimitiveType::Null,
            "boolean" => PrimitiveType::Boolean,
            "object" => PrimitiveType::Object,
            "array" => PrimitiveType::Array,
            "string" => PrimitiveType::String,
            "integer" => PrimitiveType::Integer,
            "number" => PrimitiveType::Number,
            _ => return None,
        })
    }
}

/// Classify a value's runtime JSON type, reporting `Integer` for whole-valued numbers.
#[must_use]
pub fn kind(value: &Value) -> PrimitiveType {
    match value {
        Value::Null => PrimitiveType::Null,
        Value::Bool(_) => PrimitiveType::Boolean,
        Value::Number(n) => {
            if is_integer(n) {
                PrimitiveType::Integer
            } else {
                PrimitiveType::Number
            }
        }
        Value::String(_) => PrimitiveType::String,
        Value::Array(_) => PrimitiveType::Array,
        Value::Object(_) => PrimitiveType::Object,
    }
}

/// A value satisfies the `type: "integer"` assertion iff it is a number with zero
/// fractional part; this includes numbers that only fit in a `f64`.
#[must_use]
pub fn is_integer(number: &Number) -> bool {
    if number.is_i64() || number.is_u64() {
        return true;
    }
    number.as_f64().is_some_and(|f| f.fract() == 0.0 && f.is_finite())
}

/// Structural equality per JSON Schema's `enum`/`const`/`uniqueItems` semantics:
/// objects compare by key set regardless of order, arrays compare position-wise,
/// and numbers compare by normalized numeric value so `1` equals `1.0` but neither
/// equals the string `"1"` or the boolean `true`.
#[must_use]
pub fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| equal(value, other)))
        }
        _ => false,
    }
}

/// Numeric equality normalized across representations: integral values compare
/// exactly regardless of whether they were parsed as integers or floats.
#[must_use]
pub fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return a == b;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Total order over numbers used for `minimum`/`maximum`/`exclusiveMinimum`/`exclusiveMaximum`.
///
/// Returns `None` if either number cannot be represented as `f64` (should not happen
/// for any number produced by `serde_json`'s default feature set).
#[must_use]
pub fn numbers_cmp(a: &Number, b: &Number) -> Option<Ordering> {
    a.as_f64().and_then(|a| b.as_f64().map(|b| a.total_cmp(&b)))
}

/// `uniqueItems` semantics: true iff no two elements are [`equal`].
#[must_use]
pub fn has_unique_items(items: &[Value]) -> bool {
    for (i, item) in items.iter().enumerate() {
        for other in &items[i + 1..] {
            if equal(item, other) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(1), json!(1.0) ; "integer and float")]
    #[test_case(json!(0), json!(-0.0) ; "zero and negative zero")]
    fn numbers_are_equal(a: Value, b: Value) {
        assert!(equal(&a, &b));
    }

    #[test_case(json!(1), json!("1") ; "number and string")]
    #[test_case(json!(1), json!(true) ; "number and bool")]
    #[test_case(json!(0), json!(false) ; "zero and bool")]
    fn cross_type_values_are_not_equal(a: Value, b: Value) {
        assert!(!equal(&a, &b));
    }

    #[test]
    fn objects_compare_regardless_of_key_order() {
        let a = json!({"a": 1, "b": 2});
        let b = json!({"b": 2, "a": 1});
        assert!(equal(&a, &b));
    }

    #[test]
    fn unique_items_deep_equality() {
        let not_unique = [json!({"a": 1, "b": 2}), json!({"b": 2, "a": 1})];
        assert!(!has_unique_items(&not_unique));

        let unique = [json!([1, 2]), json!([2, 1])];
        assert!(has_unique_items(&unique));
    }

    #[test]
    fn kind_reports_integer_for_whole_floats() {
        assert_eq!(kind(&json!(4.0)), PrimitiveType::Integer);
        assert_eq!(kind(&json!(4.5)), PrimitiveType::Number);
    }

    #[test_case("123456789012345678901234567890" ; "25-digit integer beyond i64/u64 range")]
    #[test_case("1.50" ; "trailing zero past the significant digits")]
    #[test_case("2.0000000000000002220446049250313080847263336181640625" ; "precision an f64 round-trip would collapse")]
    fn numbers_round_trip_their_exact_source_text(text: &str) {
        let parsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(serde_json::to_string(&parsed).unwrap(), text);
    }
}

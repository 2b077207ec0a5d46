//! Numeric coercion of response payloads
//!
//! Form-encoded backends and many JSON endpoints deliver scalars as
//! strings. `coerce` walks a response tree and turns every string leaf that
//! is unambiguously an integer or a plain decimal into a JSON number.
//!
//! Only two fully anchored, ASCII-digit patterns are recognised:
//!
//! - integer: `^-?[0-9]+$`
//! - decimal: `^-?[0-9]+\.[0-9]+$`
//!
//! Anything else stays a string. A lenient "does it parse as a float" test
//! would turn `"2018-04-01"` into `2018`; exponent notation, a leading `+`,
//! `".5"` and `"5."` are deliberately left alone as well.
//!
//! Recursion depth follows the nesting depth of the input. Callers own that
//! bound; trees produced by `serde_json` are already capped at 128 levels.

use regex::Regex;
use serde_json::{Number, Value};
use std::sync::OnceLock;

fn integer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?[0-9]+$").unwrap())
}

fn decimal_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?[0-9]+\.[0-9]+$").unwrap())
}

/// Coerce numeric-looking strings anywhere in `value` into numbers
///
/// The output has the same shape as the input: same container kinds, same
/// keys, same array lengths. Numbers, booleans, null and non-numeric
/// strings pass through unchanged.
pub fn coerce(mut value: Value) -> Value {
    coerce_in_place(&mut value);
    value
}

/// In-place variant of [`coerce`]
pub fn coerce_in_place(value: &mut Value) {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
        Value::Array(items) => {
            for item in items.iter_mut() {
                coerce_in_place(item);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                coerce_in_place(item);
            }
        }
        Value::String(text) => {
            if let Some(number) = parse_numeric(text) {
                *value = Value::Number(number);
            }
        }
    }
}

/// Classify a single string, returning its numeric value if it matches
/// the integer or decimal pattern
pub fn parse_numeric(text: &str) -> Option<Number> {
    if integer_regex().is_match(text) {
        return parse_integer(text);
    }
    if decimal_regex().is_match(text) {
        return text.parse::<f64>().ok().and_then(Number::from_f64);
    }
    None
}

fn parse_integer(text: &str) -> Option<Number> {
    if let Ok(n) = text.parse::<i64>() {
        return Some(Number::from(n));
    }
    if let Ok(n) = text.parse::<u64>() {
        return Some(Number::from(n));
    }
    // Out of 64-bit range: fall back to the nearest float, as long as it is finite
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_strings() {
        assert_eq!(coerce(json!("42")), json!(42));
        assert_eq!(coerce(json!("-7")), json!(-7));
        assert_eq!(coerce(json!("007")), json!(7));
        assert!(coerce(json!("42")).is_i64());
    }

    #[test]
    fn test_decimal_strings() {
        assert_eq!(coerce(json!("3.14")), json!(3.14));
        assert_eq!(coerce(json!("-0.5")), json!(-0.5));
        assert!(coerce(json!("3.14")).is_f64());
    }

    #[test]
    fn test_non_numeric_strings_untouched() {
        for s in [
            "2018-04-01",
            "1e5",
            "+5",
            ".5",
            "5.",
            " 42",
            "42 ",
            "42\n",
            "1.2.3",
            "-",
            "",
            "abc",
            "0x1F",
            "١٢٣",
        ] {
            assert_eq!(coerce(json!(s)), json!(s), "{:?} should stay a string", s);
        }
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(coerce(Value::Null), Value::Null);
        assert_eq!(coerce(json!(true)), json!(true));
        assert_eq!(coerce(json!(12)), json!(12));
        assert_eq!(coerce(json!(1.5)), json!(1.5));
    }

    #[test]
    fn test_nested_structure() {
        let input = json!({"a": "10", "b": [{"c": "2.5"}, "x"]});
        assert_eq!(coerce(input), json!({"a": 10, "b": [{"c": 2.5}, "x"]}));
    }

    #[test]
    fn test_shape_preserved() {
        let input = json!({
            "rows": [["1", "two", null], [], [{"id": "9", "tags": ["a", "2"]}]],
            "empty": {},
            "flag": false
        });
        let output = coerce(input.clone());

        let in_rows = input["rows"].as_array().unwrap();
        let out_rows = output["rows"].as_array().unwrap();
        assert_eq!(in_rows.len(), out_rows.len());
        for (a, b) in in_rows.iter().zip(out_rows) {
            assert_eq!(a.as_array().unwrap().len(), b.as_array().unwrap().len());
        }
        let in_keys: Vec<_> = input.as_object().unwrap().keys().collect();
        let out_keys: Vec<_> = output.as_object().unwrap().keys().collect();
        assert_eq!(in_keys, out_keys);
        assert_eq!(output["rows"][2][0]["tags"], json!(["a", 2]));
        assert_eq!(output["empty"], json!({}));
    }

    #[test]
    fn test_idempotent() {
        let input = json!({
            "a": ["1", "1.50", "x", {"b": "-3", "c": "2018-04-01"}],
            "d": "18446744073709551615",
            "e": "123456789012345678901234567890"
        });
        let once = coerce(input);
        let twice = coerce(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_wide_integers() {
        assert_eq!(coerce(json!("18446744073709551615")), json!(u64::MAX));
        let huge = coerce(json!("123456789012345678901234567890"));
        assert!(huge.is_f64());
    }

    #[test]
    fn test_non_finite_stays_string() {
        let digits = "9".repeat(400);
        assert_eq!(coerce(json!(digits.clone())), json!(digits));
        let decimal = format!("{}.5", "9".repeat(400));
        assert_eq!(coerce(json!(decimal.clone())), json!(decimal));
    }

    #[test]
    fn test_in_place() {
        let mut value = json!(["5", {"k": "6.25"}]);
        coerce_in_place(&mut value);
        assert_eq!(value, json!([5, {"k": 6.25}]));
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("12"), Some(Number::from(12)));
        assert!(parse_numeric("12.0").unwrap().is_f64());
        assert_eq!(parse_numeric("2018-04-01"), None);
    }
}

//! Cleaning and parsing of raw LLM responses.
//!
//! Models wrap JSON in Markdown code fences and sometimes leave arithmetic
//! where a number belongs, both as invalid unquoted JSON
//! (`"amount": 2650 + 265`) and as quoted strings
//! (`"amount": "(2650 + 265) * 0.05"`). Both are repaired here before the
//! payload is handed to serde. A response that is still not valid JSON
//! afterwards is a fatal extraction failure for the run.

use log::{debug, info};
use regex::Regex;
use serde_json::Value;

use crate::error::{FormFillError, Result};
use crate::expr;

/// Strips Markdown code fences from a response, returning the inner text.
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    if let Some(body) = trimmed.strip_prefix("```") {
        if let Some(body) = body.strip_suffix("```") {
            let body = body.trim();
            return body.strip_prefix("json").map_or(body, str::trim);
        }
    }

    trimmed
}

/// Replaces unquoted arithmetic values (`"key": 2650 + 265`) with their
/// evaluated result so the text becomes parseable JSON.
fn evaluate_unquoted_expressions(text: &str) -> String {
    // Matches a key followed by a bare run of arithmetic characters. Plain
    // numbers match too but are left untouched below.
    let pattern = Regex::new(r#""([^"\n]+)"\s*:\s*([0-9.\-+*/() ]+)"#).expect("static regex");

    pattern
        .replace_all(text, |caps: &regex::Captures| {
            let key = &caps[1];
            let value = caps[2].trim();
            if expr::is_expression(value) {
                match expr::evaluate(value) {
                    Some(result) => {
                        debug!("Evaluated expression for '{}': {} = {}", key, value, result);
                        // {:?} keeps a trailing .0 so the result stays a
                        // float through the JSON round trip.
                        return format!("\"{}\": {:?}", key, result);
                    }
                    None => {}
                }
            }
            caps[0].to_string()
        })
        .into_owned()
}

/// A quoted string is only treated as arithmetic when it is spelled like
/// one: a parenthesized group, or a `+`, `*` or `/` padded with spaces.
/// A bare spaced minus never qualifies: year ranges are routinely written
/// "2024 - 2026" and must survive as text, like codes and compact ranges
/// ("01-2024/7", "2024-2026") do.
fn looks_like_quoted_expression(s: &str) -> bool {
    let spelled_out =
        s.contains('(') || s.contains(" + ") || s.contains(" * ") || s.contains(" / ");
    spelled_out && expr::is_expression(s)
}

/// Walks a parsed value and replaces string leaves that hold an arithmetic
/// expression with the evaluated number. Returns how many were replaced.
fn evaluate_string_expressions(value: &mut Value) -> usize {
    match value {
        Value::String(s) => {
            if looks_like_quoted_expression(s) {
                if let Some(result) = expr::evaluate(s) {
                    if let Some(number) = serde_json::Number::from_f64(result) {
                        *value = Value::Number(number);
                        return 1;
                    }
                }
            }
            0
        }
        Value::Array(items) => items.iter_mut().map(evaluate_string_expressions).sum(),
        Value::Object(map) => map.values_mut().map(evaluate_string_expressions).sum(),
        _ => 0,
    }
}

/// Cleans a raw LLM response and parses it into JSON, verifying that every
/// required top-level key is present.
pub fn parse_response(raw: &str, required_keys: &[&str]) -> Result<Value> {
    let stripped = strip_code_fences(raw);
    let cleaned = evaluate_unquoted_expressions(stripped);

    let mut value: Value =
        serde_json::from_str(&cleaned).map_err(|e| FormFillError::MalformedResponse {
            details: format!("{} (response starts: {:.80})", e, raw.trim()),
        })?;

    let replaced = evaluate_string_expressions(&mut value);
    if replaced > 0 {
        info!("Evaluated {} arithmetic string(s) in LLM response", replaced);
    }

    let object = value
        .as_object()
        .ok_or_else(|| FormFillError::MalformedResponse {
            details: "top-level JSON value is not an object".to_string(),
        })?;

    for key in required_keys {
        if !object.contains_key(*key) {
            return Err(FormFillError::MissingSection {
                key: (*key).to_string(),
            });
        }
    }

    Ok(value)
}

/// Reads a numeric field leniently: numbers pass through, numeric or
/// arithmetic strings are evaluated, anything else defaults.
pub fn num_field(object: &Value, key: &str, default: f64) -> f64 {
    match object.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => expr::evaluate(s).unwrap_or(default),
        _ => default,
    }
}

/// Reads an integer field with the same leniency as [`num_field`].
pub fn int_field(object: &Value, key: &str, default: u32) -> u32 {
    let value = num_field(object, key, f64::from(default));
    if value.is_finite() && value >= 0.0 {
        value.round() as u32
    } else {
        default
    }
}

/// Reads a string field, defaulting to empty.
pub fn str_field(object: &Value, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Reads an optional percentage field; absent, null or zero means none.
pub fn pct_field(object: &Value, key: &str) -> Option<f64> {
    let value = num_field(object, key, 0.0);
    if value != 0.0 {
        Some(value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_json_fence() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```\nHope that helps!";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_generic_fence() {
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_no_fence_passthrough() {
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_unquoted_expression_repair() {
        let raw = r#"{"salary": 2650, "increase_amount": 2650 + 265, "note": "ok"}"#;
        let parsed = parse_response(raw, &[]).unwrap();
        assert_eq!(parsed["increase_amount"], json!(2915.0));
        assert_eq!(parsed["salary"], json!(2650));
    }

    #[test]
    fn test_quoted_expression_repair() {
        let raw = r#"{"amount": "(2650 + 265) * 0.05"}"#;
        let parsed = parse_response(raw, &["amount"]).unwrap();
        assert!((parsed["amount"].as_f64().unwrap() - 145.75).abs() < 1e-9);
    }

    #[test]
    fn test_nested_string_expressions() {
        let raw = r#"{"items": [{"price": "100 + 20"}, {"price": 50}]}"#;
        let parsed = parse_response(raw, &["items"]).unwrap();
        assert_eq!(parsed["items"][0]["price"], json!(120.0));
        assert_eq!(parsed["items"][1]["price"], json!(50));
    }

    #[test]
    fn test_non_expression_strings_untouched() {
        let raw = r#"{"project_code": "01-2024/7", "period": "2024-2026", "name": "ACME"}"#;
        let parsed = parse_response(raw, &[]).unwrap();
        assert_eq!(parsed["project_code"], json!("01-2024/7"));
        assert_eq!(parsed["period"], json!("2024-2026"));
        assert_eq!(parsed["name"], json!("ACME"));
    }

    #[test]
    fn test_spaced_year_range_stays_text() {
        // "2024 - 2026" evaluates to -2 under the expression grammar; it
        // must never be mistaken for arithmetic inside a string field.
        let raw = r#"{"remuneration_year": "2024 - 2026", "amount": "2650 * 0.05"}"#;
        let parsed = parse_response(raw, &[]).unwrap();
        assert_eq!(parsed["remuneration_year"], json!("2024 - 2026"));
        assert!((parsed["amount"].as_f64().unwrap() - 132.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_required_key() {
        let raw = r#"{"project_info": {}}"#;
        let err = parse_response(raw, &["project_info", "job_positions"]).unwrap_err();
        assert!(matches!(
            err,
            FormFillError::MissingSection { ref key } if key == "job_positions"
        ));
    }

    #[test]
    fn test_malformed_response_is_fatal() {
        let err = parse_response("I could not find any figures, sorry.", &[]).unwrap_err();
        assert!(matches!(err, FormFillError::MalformedResponse { .. }));
    }

    #[test]
    fn test_lenient_field_readers() {
        let obj = json!({
            "rate": "26.5",
            "months": 12.0,
            "week": "40",
            "label": "  Researcher ",
            "pct": 0.0
        });
        assert_eq!(num_field(&obj, "rate", 0.0), 26.5);
        assert_eq!(num_field(&obj, "missing", 7.0), 7.0);
        assert_eq!(int_field(&obj, "months", 0), 12);
        assert_eq!(int_field(&obj, "week", 5), 40);
        assert_eq!(str_field(&obj, "label"), "Researcher");
        assert_eq!(pct_field(&obj, "pct"), None);
    }
}

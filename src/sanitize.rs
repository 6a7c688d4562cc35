//! Field-level sanitization of decrypted report bodies.
//!
//! Every string leaf loses its `<` and `>` characters, is trimmed, and is cut
//! to [`MAX_FIELD_CHARS`] characters. Object keys, numbers, booleans and nulls
//! pass through untouched. Applying the sanitizer twice changes nothing.

use serde_json::{Map, Value};

use crate::wire::MAX_FIELD_CHARS;

/// Sanitize a single string.
pub fn sanitize_str(input: &str) -> String {
    let stripped: String = input.chars().filter(|c| !matches!(c, '<' | '>')).collect();
    let trimmed = stripped.trim();
    match trimmed.char_indices().nth(MAX_FIELD_CHARS) {
        // Cutting may expose trailing whitespace; drop it so a second pass is a no-op.
        Some((cut, _)) => trimmed[..cut].trim_end().to_owned(),
        None => trimmed.to_owned(),
    }
}

/// Recursively sanitize every string leaf of `value`.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(sanitize_object(map)),
        other => other,
    }
}

pub fn sanitize_object(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().map(|(k, v)| (k, sanitize_value(v))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_angle_brackets() {
        assert_eq!(sanitize_str("<script>alert(1)</script>"), "scriptalert(1)/script");
    }

    #[test]
    fn truncates_to_limit() {
        let long = "a".repeat(MAX_FIELD_CHARS + 5_000);
        assert_eq!(sanitize_str(&long).chars().count(), MAX_FIELD_CHARS);

        let exact = "b".repeat(MAX_FIELD_CHARS);
        assert_eq!(sanitize_str(&exact), exact);
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let long = "ñ".repeat(MAX_FIELD_CHARS + 1);
        let out = sanitize_str(&long);
        assert_eq!(out.chars().count(), MAX_FIELD_CHARS);
        assert_eq!(out.len(), MAX_FIELD_CHARS * 2);
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(sanitize_str("  Vi un robo ayer \n"), "Vi un robo ayer");
        assert_eq!(sanitize_str(" < > "), "");
    }

    #[test]
    fn recurses_into_nested_values() {
        let input = json!({
            "narrative": " <b>hola</b> ",
            "addressDetails": { "street": "  Av. <Juárez> 12 " },
            "tags": ["<x>", 3, null],
            "count": 7,
            "<key>": true
        });
        let out = sanitize_value(input);
        assert_eq!(
            out,
            json!({
                "narrative": "bhola/b",
                "addressDetails": { "street": "Av. Juárez 12" },
                "tags": ["x", 3, null],
                "count": 7,
                "<key>": true
            })
        );
    }

    #[test]
    fn idempotent_when_cut_lands_before_whitespace() {
        let mut s = "a".repeat(MAX_FIELD_CHARS - 1);
        s.push(' ');
        s.push_str("tail");
        let once = sanitize_str(&s);
        assert_eq!(sanitize_str(&once), once);
        assert_eq!(once.chars().count(), MAX_FIELD_CHARS - 1);
    }
}

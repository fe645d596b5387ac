//! Scalar literal coercion.
//!
//! Annotation values are plain text. Before they land in a schema they are
//! read back with YAML scalar rules, so `true` becomes a boolean, `8080` an
//! integer and `0.5` a float, while anything YAML would not read as a single
//! scalar stays the string it was.

use serde_json::Value;

/// Reads `text` as a YAML scalar in value position.
///
/// Empty text yields `Value::Null`. Text that YAML rejects, reads as a
/// collection, or reads as null without being a null literal (`#fff` is a
/// comment to YAML) is kept verbatim.
///
/// ```
/// use serde_json::json;
/// use values_schema_generate::coerce_scalar;
///
/// assert_eq!(coerce_scalar("true"), json!(true));
/// assert_eq!(coerce_scalar("123"), json!(123));
/// assert_eq!(coerce_scalar("1.5"), json!(1.5));
/// assert_eq!(coerce_scalar("8.0.30"), json!("8.0.30"));
/// assert_eq!(coerce_scalar("a: b"), json!("a: b"));
/// ```
pub fn coerce_scalar(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    let verbatim = || Value::String(text.to_string());

    // Parsed as a mapping value so that `a: b` or `- x` stay strings.
    let document = format!("key: {text}");
    let Ok(serde_yaml::Value::Mapping(mapping)) = serde_yaml::from_str(&document) else {
        return verbatim();
    };
    match mapping.get("key") {
        Some(serde_yaml::Value::Null) if is_null_literal(text) => Value::Null,
        Some(
            value @ (serde_yaml::Value::Bool(_)
            | serde_yaml::Value::Number(_)
            | serde_yaml::Value::String(_)),
        ) => serde_json::to_value(value).unwrap_or_else(|_| verbatim()),
        _ => verbatim(),
    }
}

/// Coerces the value of an unrecognized annotation key.
///
/// Text opening with `{` or `[` is tried as a JSON literal first so that
/// nested structures can be passed through verbatim.
pub fn coerce_extra(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    if text.starts_with('{') || text.starts_with('[') {
        if let Ok(value) = serde_json::from_str(text) {
            return value;
        }
    }
    coerce_scalar(text)
}

fn is_null_literal(text: &str) -> bool {
    matches!(text.trim(), "~" | "null" | "Null" | "NULL")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_coerce_scalar_types() {
        assert_eq!(coerce_scalar(""), Value::Null);
        assert_eq!(coerce_scalar("false"), json!(false));
        assert_eq!(coerce_scalar("-7"), json!(-7));
        assert_eq!(coerce_scalar("0.25"), json!(0.25));
        assert_eq!(coerce_scalar("radio"), json!("radio"));
        assert_eq!(coerce_scalar("null"), Value::Null);
        assert_eq!(coerce_scalar("~"), Value::Null);
    }

    #[test]
    fn test_coerce_scalar_keeps_yaml_oddities_as_text() {
        assert_eq!(coerce_scalar("#fff"), json!("#fff"));
        assert_eq!(coerce_scalar("- item"), json!("- item"));
        assert_eq!(coerce_scalar("[a, b"), json!("[a, b"));
        assert_eq!(coerce_scalar("{a: 1}"), json!("{a: 1}"));
    }

    #[test]
    fn test_coerce_scalar_unquotes_yaml_strings() {
        assert_eq!(coerce_scalar("'123'"), json!("123"));
        assert_eq!(coerce_scalar(" padded "), json!("padded"));
    }

    #[test]
    fn test_coerce_extra_json_literals() {
        assert_eq!(coerce_extra(r#"{"a": 1}"#), json!({"a": 1}));
        assert_eq!(coerce_extra("[1, 2]"), json!([1, 2]));
        assert_eq!(coerce_extra("[broken"), json!("[broken"));
        assert_eq!(coerce_extra("42"), json!(42));
        assert_eq!(coerce_extra(""), Value::Null);
    }
}

//! Generic property setter used by `@schema` options and by fallback
//! sections.
//!
//! Keys are folded over a small set of synonyms. Keys without a field land
//! in `extensions` when they start with `x-` and in `extra_props` otherwise.
//! Values are parsed leniently: a malformed number leaves the field unset, a
//! malformed JSON literal is logged and ignored, and nothing here ever fails
//! the caller.

use serde_json::{Map, Value};
use tracing::warn;
use values_schema_core::{DecodeError, Schema, SchemaItems};

use crate::coerce::{coerce_extra, coerce_scalar};

/// Assigns `value` to the schema keyword named by `key`.
///
/// ```
/// use values_schema_core::Schema;
/// use values_schema_generate::set_property;
///
/// let mut schema = Schema::with_type("string");
/// set_property(&mut schema, "minLen", "3");
/// set_property(&mut schema, "enum", "a,b,c");
/// set_property(&mut schema, "type", "null");
///
/// assert_eq!(schema.min_length, Some(3));
/// assert_eq!(schema.enum_values.len(), 3);
/// assert_eq!(schema.types.as_slice(), ["string", "null"]);
/// ```
pub fn set_property(schema: &mut Schema, key: &str, value: &str) {
    match key {
        "min" | "minmum" | "minimum" => schema.minimum = parse_f64(value),
        "max" | "maxmum" | "maximum" => schema.maximum = parse_f64(value),
        "exclusiveMinimum" => schema.exclusive_minimum = parse_flag(value),
        "exclusiveMaximum" => schema.exclusive_maximum = parse_flag(value),
        "multipleOf" => schema.multiple_of = parse_f64(value),
        "minLength" | "minLen" | "minlen" => schema.min_length = parse_i64(value),
        "maxLength" | "maxLen" | "maxlen" => schema.max_length = parse_i64(value),
        "minItems" => schema.min_items = parse_i64(value),
        "maxItems" => schema.max_items = parse_i64(value),
        "minProperties" => schema.min_properties = parse_i64(value),
        "maxProperties" => schema.max_properties = parse_i64(value),
        "uniqueItems" => schema.unique_items = parse_flag(value),
        "nullable" => schema.nullable = parse_flag(value),
        "readOnly" => schema.read_only = parse_flag(value),
        "title" => schema.title = value.to_string(),
        "description" => schema.description = value.to_string(),
        "format" => schema.format = value.to_string(),
        "pattern" => schema.pattern = value.to_string(),
        "id" => schema.id = value.to_string(),
        "$ref" | "ref" => schema.reference = value.to_string(),
        "$schema" => schema.meta_schema = value.to_string(),
        "discriminator" => schema.discriminator = value.to_string(),
        "type" => {
            if !value.is_empty() {
                schema.types.insert(value);
            }
        }
        "required" => {
            schema.required = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }
        "enum" => schema.enum_values = value.split(',').map(coerce_scalar).collect(),
        "default" => schema.default = non_null(coerce_scalar(value)),
        "example" => {
            schema.example = (!value.is_empty()).then(|| Value::String(value.to_string()));
        }
        "items" => match SchemaItems::from_json_str(value) {
            Ok(items) => schema.items = Some(items),
            Err(err) => warn!(value, %err, "ignoring undecodable items literal"),
        },
        "allOf" | "oneOf" | "anyOf" | "not" | "properties" | "additionalProperties"
        | "patternProperties" | "dependencies" | "additionalItems" | "definitions" => {
            set_structural(schema, key, value);
        }
        _ => schema.insert_extra(key, coerce_extra(value)),
    }
}

/// Decodes a JSON literal for a structural keyword and moves the decoded
/// field into `schema`.
fn set_structural(schema: &mut Schema, key: &str, value: &str) {
    let decoded = match decode_keyword(key, value) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!(key, value, %err, "ignoring undecodable schema literal");
            return;
        }
    };
    match key {
        "allOf" => schema.all_of = decoded.all_of,
        "oneOf" => schema.one_of = decoded.one_of,
        "anyOf" => schema.any_of = decoded.any_of,
        "not" => schema.not = decoded.not,
        "properties" => schema.properties = decoded.properties,
        "additionalProperties" => schema.additional_properties = decoded.additional_properties,
        "patternProperties" => schema.pattern_properties = decoded.pattern_properties,
        "dependencies" => schema.dependencies = decoded.dependencies,
        "additionalItems" => schema.additional_items = decoded.additional_items,
        "definitions" => schema.definitions = decoded.definitions,
        _ => {}
    }
}

fn decode_keyword(key: &str, value: &str) -> Result<Schema, DecodeError> {
    let literal: Value =
        serde_json::from_str(value).map_err(|err| DecodeError::Syntax(err.to_string()))?;
    let mut object = Map::new();
    object.insert(key.to_string(), literal);
    Schema::from_json(Value::Object(object))
}

fn non_null(value: Value) -> Option<Value> {
    (!value.is_null()).then_some(value)
}

fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse().ok().filter(|number: &f64| number.is_finite())
}

fn parse_i64(value: &str) -> Option<i64> {
    let value = value.trim();
    value
        .parse()
        .ok()
        .or_else(|| parse_f64(value).filter(|n| n.fract() == 0.0).map(|n| n as i64))
}

/// A bare flag (`nullable` with no value) reads as `true`.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim(),
        "" | "true" | "True" | "TRUE" | "t" | "T" | "1"
    )
}

//! JSON encoding and decoding for [`Schema`].
//!
//! A schema serializes to one flat JSON object: the fixed fields first (in a
//! stable order, empty values omitted), then [`Schema::extensions`], then
//! [`Schema::extra_props`]. Decoding is the reverse and is used for JSON
//! literals embedded in annotations (for example `items={"type":"string"}`).

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    Schema, SchemaItems, SchemaOrBool, SchemaOrStringArray, SchemaProperties, SchemaType,
    is_extension_key,
};

/// Errors raised while decoding a JSON value into a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The value (or a nested value) must be a JSON object.
    #[error("expected a schema object, found {0}")]
    NotAnObject(&'static str),
    /// A fixed field holds a value of the wrong JSON type.
    #[error("invalid value for `{field}`: expected {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
    /// The text is not valid JSON.
    #[error("invalid JSON: {0}")]
    Syntax(String),
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        put_str(&mut map, "$ref", &self.reference)?;
        put_str(&mut map, "$schema", &self.meta_schema)?;
        put_str(&mut map, "id", &self.id)?;
        put_str(&mut map, "description", &self.description)?;
        if !self.types.is_empty() {
            map.serialize_entry("type", &self.types)?;
        }
        put_flag(&mut map, "nullable", self.nullable)?;
        put_str(&mut map, "format", &self.format)?;
        put_str(&mut map, "title", &self.title)?;
        put_opt(&mut map, "default", non_null(&self.default))?;
        put_opt(&mut map, "maximum", self.maximum.as_ref())?;
        put_flag(&mut map, "exclusiveMaximum", self.exclusive_maximum)?;
        put_opt(&mut map, "minimum", self.minimum.as_ref())?;
        put_flag(&mut map, "exclusiveMinimum", self.exclusive_minimum)?;
        put_opt(&mut map, "maxLength", self.max_length.as_ref())?;
        put_opt(&mut map, "minLength", self.min_length.as_ref())?;
        put_str(&mut map, "pattern", &self.pattern)?;
        put_opt(&mut map, "maxItems", self.max_items.as_ref())?;
        put_opt(&mut map, "minItems", self.min_items.as_ref())?;
        put_flag(&mut map, "uniqueItems", self.unique_items)?;
        put_opt(&mut map, "multipleOf", self.multiple_of.as_ref())?;
        put_list(&mut map, "enum", &self.enum_values)?;
        put_opt(&mut map, "maxProperties", self.max_properties.as_ref())?;
        put_opt(&mut map, "minProperties", self.min_properties.as_ref())?;
        put_list(&mut map, "required", &self.required)?;
        put_list(&mut map, "allOf", &self.all_of)?;
        put_list(&mut map, "oneOf", &self.one_of)?;
        put_list(&mut map, "anyOf", &self.any_of)?;
        put_opt(&mut map, "not", self.not.as_ref())?;
        if !self.properties.is_empty() {
            map.serialize_entry("properties", &self.properties)?;
        }
        put_opt(
            &mut map,
            "additionalProperties",
            self.additional_properties.as_ref(),
        )?;
        if !self.pattern_properties.is_empty() {
            map.serialize_entry("patternProperties", &self.pattern_properties)?;
        }
        if !self.dependencies.is_empty() {
            map.serialize_entry("dependencies", &self.dependencies)?;
        }
        put_opt(&mut map, "additionalItems", self.additional_items.as_ref())?;
        if !self.definitions.is_empty() {
            map.serialize_entry("definitions", &self.definitions)?;
        }
        put_opt(&mut map, "items", self.items.as_ref())?;
        put_opt(&mut map, "example", non_null(&self.example))?;
        put_str(&mut map, "discriminator", &self.discriminator)?;
        put_flag(&mut map, "readOnly", self.read_only)?;

        for (key, value) in &self.extensions {
            map.serialize_entry(key, value)?;
        }
        // Extensions win a key clash so the object never repeats a key.
        for (key, value) in &self.extra_props {
            if !self.extensions.contains_key(key) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

fn put_str<M: SerializeMap>(map: &mut M, key: &str, value: &str) -> Result<(), M::Error> {
    if value.is_empty() {
        return Ok(());
    }
    map.serialize_entry(key, value)
}

fn put_flag<M: SerializeMap>(map: &mut M, key: &str, value: bool) -> Result<(), M::Error> {
    if !value {
        return Ok(());
    }
    map.serialize_entry(key, &true)
}

fn put_opt<M: SerializeMap, T: Serialize>(
    map: &mut M,
    key: &str,
    value: Option<&T>,
) -> Result<(), M::Error> {
    match value {
        Some(value) => map.serialize_entry(key, value),
        None => Ok(()),
    }
}

fn put_list<M: SerializeMap, T: Serialize>(
    map: &mut M,
    key: &str,
    values: &[T],
) -> Result<(), M::Error> {
    if values.is_empty() {
        return Ok(());
    }
    map.serialize_entry(key, values)
}

fn non_null(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|v| !v.is_null())
}

impl Serialize for SchemaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_slice() {
            [only] => serializer.serialize_str(only),
            many => many.serialize(serializer),
        }
    }
}

impl Serialize for SchemaProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for property in self.iter() {
            map.serialize_entry(&property.name, &property.schema)?;
        }
        map.end()
    }
}

impl Serialize for SchemaItems {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Single(schema) => schema.serialize(serializer),
            Self::Array(items) => items.serialize(serializer),
        }
    }
}

impl Serialize for SchemaOrBool {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(allows) => serializer.serialize_bool(*allows),
            Self::Schema(schema) => schema.serialize(serializer),
        }
    }
}

impl Serialize for SchemaOrStringArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Properties(names) => names.serialize(serializer),
            Self::Schema(schema) => schema.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Schema::from_json(value).map_err(de::Error::custom)
    }
}

impl Schema {
    /// Decodes a JSON object into a schema.
    ///
    /// Known keywords fill their fields, `x-*` keywords land in
    /// [`extensions`](Schema::extensions), and everything else lands in
    /// [`extra_props`](Schema::extra_props). Property order follows the order
    /// of the source object.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the value is not an object or a fixed
    /// field holds a value of the wrong type.
    ///
    /// # Examples
    ///
    /// ```
    /// use values_schema_core::Schema;
    ///
    /// let schema = Schema::from_json(serde_json::json!({
    ///     "type": ["string", "null"],
    ///     "maxLength": 8,
    ///     "x-order": 2,
    ///     "render": "textarea"
    /// }))
    /// .unwrap();
    ///
    /// assert_eq!(schema.types.as_slice(), ["string", "null"]);
    /// assert_eq!(schema.max_length, Some(8));
    /// assert!(schema.extensions.contains_key("x-order"));
    /// assert!(schema.extra_props.contains_key("render"));
    /// ```
    pub fn from_json(value: Value) -> Result<Self, DecodeError> {
        let object = match value {
            Value::Object(object) => object,
            other => return Err(DecodeError::NotAnObject(json_kind(&other))),
        };

        let mut schema = Schema::default();
        for (key, value) in object {
            match key.as_str() {
                "$ref" => schema.reference = expect_string("$ref", value)?,
                "$schema" => schema.meta_schema = expect_string("$schema", value)?,
                "id" => schema.id = expect_string("id", value)?,
                "description" => schema.description = expect_string("description", value)?,
                "type" => schema.types = decode_type(value)?,
                "nullable" => schema.nullable = expect_bool("nullable", value)?,
                "format" => schema.format = expect_string("format", value)?,
                "title" => schema.title = expect_string("title", value)?,
                "default" => schema.default = Some(value),
                "maximum" => schema.maximum = Some(expect_f64("maximum", value)?),
                "exclusiveMaximum" => {
                    schema.exclusive_maximum = expect_bool("exclusiveMaximum", value)?
                }
                "minimum" => schema.minimum = Some(expect_f64("minimum", value)?),
                "exclusiveMinimum" => {
                    schema.exclusive_minimum = expect_bool("exclusiveMinimum", value)?
                }
                "maxLength" => schema.max_length = Some(expect_i64("maxLength", value)?),
                "minLength" => schema.min_length = Some(expect_i64("minLength", value)?),
                "pattern" => schema.pattern = expect_string("pattern", value)?,
                "maxItems" => schema.max_items = Some(expect_i64("maxItems", value)?),
                "minItems" => schema.min_items = Some(expect_i64("minItems", value)?),
                "uniqueItems" => schema.unique_items = expect_bool("uniqueItems", value)?,
                "multipleOf" => schema.multiple_of = Some(expect_f64("multipleOf", value)?),
                "enum" => schema.enum_values = expect_array("enum", value)?,
                "maxProperties" => {
                    schema.max_properties = Some(expect_i64("maxProperties", value)?)
                }
                "minProperties" => {
                    schema.min_properties = Some(expect_i64("minProperties", value)?)
                }
                "required" => schema.required = decode_string_list("required", value)?,
                "allOf" => schema.all_of = decode_schema_list("allOf", value)?,
                "oneOf" => schema.one_of = decode_schema_list("oneOf", value)?,
                "anyOf" => schema.any_of = decode_schema_list("anyOf", value)?,
                "not" => schema.not = Some(Box::new(Schema::from_json(value)?)),
                "properties" => schema.properties = decode_properties("properties", value)?,
                "additionalProperties" => {
                    schema.additional_properties = Some(SchemaOrBool::from_json(value)?)
                }
                "patternProperties" => {
                    schema.pattern_properties = decode_properties("patternProperties", value)?
                }
                "dependencies" => schema.dependencies = decode_dependencies(value)?,
                "additionalItems" => {
                    schema.additional_items = Some(SchemaOrBool::from_json(value)?)
                }
                "definitions" => schema.definitions = decode_definitions(value)?,
                "items" => schema.items = Some(SchemaItems::from_json(value)?),
                "example" => schema.example = Some(value),
                "discriminator" => schema.discriminator = expect_string("discriminator", value)?,
                "readOnly" => schema.read_only = expect_bool("readOnly", value)?,
                _ if is_extension_key(&key) => {
                    schema.extensions.insert(key, value);
                }
                _ => {
                    schema.extra_props.insert(key, value);
                }
            }
        }
        Ok(schema)
    }

    /// Decodes a JSON document held in a string.
    pub fn from_json_str(text: &str) -> Result<Self, DecodeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| DecodeError::Syntax(err.to_string()))?;
        Self::from_json(value)
    }
}

impl SchemaItems {
    /// Decodes `items`: an object becomes [`Single`](SchemaItems::Single), an
    /// array becomes [`Array`](SchemaItems::Array).
    pub fn from_json(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Array(values) => values
                .into_iter()
                .map(Schema::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Array),
            Value::Object(_) => Schema::from_json(value).map(|s| Self::Single(Box::new(s))),
            other => Err(DecodeError::NotAnObject(json_kind(&other))),
        }
    }

    /// Decodes `items` from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, DecodeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| DecodeError::Syntax(err.to_string()))?;
        Self::from_json(value)
    }
}

impl SchemaOrBool {
    pub fn from_json(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bool(allows) => Ok(Self::Bool(allows)),
            other => Schema::from_json(other).map(|s| Self::Schema(Box::new(s))),
        }
    }
}

fn decode_type(value: Value) -> Result<SchemaType, DecodeError> {
    match value {
        Value::String(name) => Ok(SchemaType::single(&name)),
        Value::Array(_) => decode_string_list("type", value).map(SchemaType::from),
        _ => Err(DecodeError::InvalidField {
            field: "type",
            expected: "a string or an array of strings",
        }),
    }
}

fn decode_string_list(field: &'static str, value: Value) -> Result<Vec<String>, DecodeError> {
    expect_array(field, value)?
        .into_iter()
        .map(|item| expect_string(field, item))
        .collect()
}

fn decode_schema_list(field: &'static str, value: Value) -> Result<Vec<Schema>, DecodeError> {
    expect_array(field, value)?
        .into_iter()
        .map(Schema::from_json)
        .collect()
}

fn decode_properties(field: &'static str, value: Value) -> Result<SchemaProperties, DecodeError> {
    expect_object(field, value)?
        .into_iter()
        .map(|(name, value)| Schema::from_json(value).map(|schema| (name, schema)))
        .collect()
}

fn decode_definitions(value: Value) -> Result<BTreeMap<String, Schema>, DecodeError> {
    expect_object("definitions", value)?
        .into_iter()
        .map(|(name, value)| Schema::from_json(value).map(|schema| (name, schema)))
        .collect()
}

fn decode_dependencies(
    value: Value,
) -> Result<BTreeMap<String, SchemaOrStringArray>, DecodeError> {
    expect_object("dependencies", value)?
        .into_iter()
        .map(|(name, value)| {
            let dependency = match value {
                Value::Array(_) => {
                    SchemaOrStringArray::Properties(decode_string_list("dependencies", value)?)
                }
                other => SchemaOrStringArray::Schema(Box::new(Schema::from_json(other)?)),
            };
            Ok((name, dependency))
        })
        .collect()
}

fn expect_string(field: &'static str, value: Value) -> Result<String, DecodeError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(DecodeError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

fn expect_bool(field: &'static str, value: Value) -> Result<bool, DecodeError> {
    value.as_bool().ok_or(DecodeError::InvalidField {
        field,
        expected: "a boolean",
    })
}

fn expect_f64(field: &'static str, value: Value) -> Result<f64, DecodeError> {
    value.as_f64().ok_or(DecodeError::InvalidField {
        field,
        expected: "a number",
    })
}

fn expect_i64(field: &'static str, value: Value) -> Result<i64, DecodeError> {
    value.as_i64().ok_or(DecodeError::InvalidField {
        field,
        expected: "an integer",
    })
}

fn expect_array(field: &'static str, value: Value) -> Result<Vec<Value>, DecodeError> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(DecodeError::InvalidField {
            field,
            expected: "an array",
        }),
    }
}

fn expect_object(field: &'static str, value: Value) -> Result<Map<String, Value>, DecodeError> {
    match value {
        Value::Object(object) => Ok(object),
        _ => Err(DecodeError::InvalidField {
            field,
            expected: "an object",
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

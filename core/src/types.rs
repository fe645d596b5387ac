//! Schema type definitions for JSON-Schema document modeling.
//!
//! This module defines the in-memory data model for one JSON-Schema node. The
//! model keeps object properties in insertion order and carries two side
//! channels ([`Schema::extra_props`] and [`Schema::extensions`]) for keywords
//! that have no dedicated field. Serialization lives in [`crate::json`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Identifier stamped into the `$schema` field of every generated root.
pub const JSON_SCHEMA_DRAFT: &str = "http://json-schema.org/schema#";

/// Extension key used for ordering hints consumed by form renderers.
pub const ORDER_EXTENSION: &str = "x-order";

/// Keywords with a dedicated field on [`Schema`].
///
/// Nothing outside these fields may be written under one of these names, so
/// the flattened JSON object never carries a duplicated key.
pub const FIXED_KEYWORDS: &[&str] = &[
    "$ref",
    "$schema",
    "id",
    "description",
    "type",
    "nullable",
    "format",
    "title",
    "default",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "maxItems",
    "minItems",
    "uniqueItems",
    "multipleOf",
    "enum",
    "maxProperties",
    "minProperties",
    "required",
    "allOf",
    "oneOf",
    "anyOf",
    "not",
    "properties",
    "additionalProperties",
    "patternProperties",
    "dependencies",
    "additionalItems",
    "definitions",
    "items",
    "example",
    "discriminator",
    "readOnly",
];

/// Returns `true` when `keyword` names a dedicated [`Schema`] field.
///
/// # Examples
///
/// ```
/// use values_schema_core::is_fixed_keyword;
///
/// assert!(is_fixed_keyword("minLength"));
/// assert!(!is_fixed_keyword("render"));
/// ```
pub fn is_fixed_keyword(keyword: &str) -> bool {
    FIXED_KEYWORDS.contains(&keyword)
}

/// Ordered, duplicate-free list of JSON type names.
///
/// Insertion follows a fixed rule: an already-present type is ignored,
/// `"null"` is appended, and any other type is prepended. A freshly declared
/// concrete type therefore wins over an inferred one while nullability always
/// stays last.
///
/// # Examples
///
/// ```
/// use values_schema_core::SchemaType;
///
/// let mut types = SchemaType::single("string");
/// types.insert("integer");
/// types.insert("null");
/// types.insert("string");
/// assert_eq!(types.as_slice(), ["integer", "string", "null"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaType(Vec<String>);

impl SchemaType {
    /// Creates a type list holding exactly one type.
    pub fn single(name: &str) -> Self {
        Self(vec![name.to_string()])
    }

    /// Inserts a type following the prepend/append rule.
    pub fn insert(&mut self, name: &str) {
        if self.contains(name) {
            return;
        }
        if name == "null" {
            self.0.push(name.to_string());
        } else {
            self.0.insert(0, name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|t| t == name)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<String>> for SchemaType {
    /// Builds a type list, dropping repeated names while keeping the first
    /// occurrence of each.
    fn from(names: Vec<String>) -> Self {
        let mut deduped: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if !deduped.contains(&name) {
                deduped.push(name);
            }
        }
        Self(deduped)
    }
}

/// The `items` keyword: one schema for every element, or one per position.
///
/// A [`Single`](SchemaItems::Single) is not the same state as an
/// [`Array`](SchemaItems::Array) of length one; they serialize differently.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaItems {
    /// Uniform array: every element matches this schema.
    Single(Box<Schema>),
    /// Tuple form, positionally aligned with the source elements.
    Array(Vec<Schema>),
}

impl SchemaItems {
    /// Collapses element schemas into the `items` form.
    ///
    /// Returns `None` for an empty list, [`Single`](SchemaItems::Single) when
    /// every element schema is identical, and the full positional list
    /// otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use values_schema_core::{Schema, SchemaItems};
    ///
    /// let uniform = SchemaItems::from_elements(vec![
    ///     Schema::with_type("string"),
    ///     Schema::with_type("string"),
    /// ]);
    /// assert!(matches!(uniform, Some(SchemaItems::Single(_))));
    ///
    /// let tuple = SchemaItems::from_elements(vec![
    ///     Schema::with_type("string"),
    ///     Schema::with_type("integer"),
    /// ]);
    /// assert!(matches!(tuple, Some(SchemaItems::Array(ref items)) if items.len() == 2));
    /// ```
    pub fn from_elements(mut elements: Vec<Schema>) -> Option<Self> {
        match elements.len() {
            0 => None,
            1 => elements.pop().map(|only| Self::Single(Box::new(only))),
            _ if elements.iter().all(|schema| *schema == elements[0]) => {
                elements.truncate(1);
                elements.pop().map(|only| Self::Single(Box::new(only)))
            }
            _ => Some(Self::Array(elements)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Array(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the item schema at `index`; a single schema sits at index 0.
    pub fn get(&self, index: usize) -> Option<&Schema> {
        match self {
            Self::Single(schema) if index == 0 => Some(schema),
            Self::Single(_) => None,
            Self::Array(items) => items.get(index),
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Schema> {
        match self {
            Self::Single(schema) if index == 0 => Some(schema),
            Self::Single(_) => None,
            Self::Array(items) => items.get_mut(index),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Schema> {
        match self {
            Self::Single(schema) => std::slice::from_ref(schema.as_ref()).iter(),
            Self::Array(items) => items.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Schema> {
        match self {
            Self::Single(schema) => std::slice::from_mut(schema.as_mut()).iter_mut(),
            Self::Array(items) => items.iter_mut(),
        }
    }
}

/// Boolean-or-schema value used by `additionalProperties` and
/// `additionalItems`.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaOrBool {
    Bool(bool),
    Schema(Box<Schema>),
}

/// Value of one `dependencies` entry: a schema or a list of property names.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaOrStringArray {
    Schema(Box<Schema>),
    Properties(Vec<String>),
}

/// One named entry of an ordered property map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaProperty {
    pub name: String,
    pub schema: Schema,
}

/// Property map that remembers insertion order.
///
/// Serializes as a JSON object whose key order matches the order in which
/// properties were inserted, not alphabetical order.
///
/// # Examples
///
/// ```
/// use values_schema_core::{Schema, SchemaProperties};
///
/// let mut props = SchemaProperties::default();
/// props.insert("zeta", Schema::with_type("string"));
/// props.insert("alpha", Schema::with_type("integer"));
/// props.insert("zeta", Schema::with_type("boolean"));
///
/// assert_eq!(props.names(), vec!["zeta", "alpha"]);
/// assert!(props.get("zeta").unwrap().types.contains("boolean"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaProperties(Vec<SchemaProperty>);

impl SchemaProperties {
    /// Inserts or replaces a property. A replaced property keeps its position.
    pub fn insert(&mut self, name: &str, schema: Schema) {
        match self.get_mut(name) {
            Some(existing) => *existing = schema,
            None => self.0.push(SchemaProperty {
                name: name.to_string(),
                schema,
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.0.iter().find(|p| p.name == name).map(|p| &p.schema)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Schema> {
        self.0
            .iter_mut()
            .find(|p| p.name == name)
            .map(|p| &mut p.schema)
    }

    /// Returns the property at `index` in insertion order.
    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut SchemaProperty> {
        self.0.get_mut(index)
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SchemaProperty> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SchemaProperty> {
        self.0.iter_mut()
    }

    /// Keeps only the properties for which `keep` returns `true`, preserving
    /// order.
    pub fn retain(&mut self, keep: impl FnMut(&SchemaProperty) -> bool) {
        self.0.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Schema)> for SchemaProperties {
    fn from_iter<I: IntoIterator<Item = (String, Schema)>>(iter: I) -> Self {
        let mut props = Self::default();
        for (name, schema) in iter {
            props.insert(&name, schema);
        }
        props
    }
}

/// Returns `true` for vendor extension keywords (`x-*`).
pub fn is_extension_key(key: &str) -> bool {
    key.starts_with("x-")
}

/// One JSON-Schema node.
///
/// Empty strings, `None`, `false` and empty collections mean "not set" and are
/// omitted on serialization. [`extensions`](Schema::extensions) holds vendor
/// `x-*` keys, [`extra_props`](Schema::extra_props) holds every other keyword
/// without a dedicated field; both are flattened into the same JSON object as
/// the fixed fields.
///
/// [`comment`](Schema::comment) carries the head comment the node was built
/// from. It drives annotation processing and is never serialized.
///
/// # Examples
///
/// ```
/// use values_schema_core::Schema;
///
/// let mut schema = Schema::with_type("object");
/// schema.properties.insert("port", Schema::with_type("integer"));
/// schema.title = "Server".into();
///
/// let json = serde_json::to_string(&schema).unwrap();
/// assert_eq!(
///     json,
///     r#"{"type":"object","title":"Server","properties":{"port":{"type":"integer"}}}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    /// `$ref`
    pub reference: String,
    /// `$schema`
    pub meta_schema: String,
    pub id: String,
    pub description: String,
    /// `type`
    pub types: SchemaType,
    pub nullable: bool,
    pub format: String,
    pub title: String,
    pub default: Option<Value>,
    pub maximum: Option<f64>,
    pub exclusive_maximum: bool,
    pub minimum: Option<f64>,
    pub exclusive_minimum: bool,
    pub max_length: Option<i64>,
    pub min_length: Option<i64>,
    pub pattern: String,
    pub max_items: Option<i64>,
    pub min_items: Option<i64>,
    pub unique_items: bool,
    pub multiple_of: Option<f64>,
    /// `enum`
    pub enum_values: Vec<Value>,
    pub max_properties: Option<i64>,
    pub min_properties: Option<i64>,
    pub required: Vec<String>,
    pub all_of: Vec<Schema>,
    pub one_of: Vec<Schema>,
    pub any_of: Vec<Schema>,
    pub not: Option<Box<Schema>>,
    pub properties: SchemaProperties,
    pub additional_properties: Option<SchemaOrBool>,
    pub pattern_properties: SchemaProperties,
    pub dependencies: BTreeMap<String, SchemaOrStringArray>,
    pub additional_items: Option<SchemaOrBool>,
    pub definitions: BTreeMap<String, Schema>,
    pub items: Option<SchemaItems>,
    pub example: Option<Value>,
    pub discriminator: String,
    pub read_only: bool,
    /// Vendor `x-*` keywords.
    pub extensions: Map<String, Value>,
    /// Every other keyword without a dedicated field.
    pub extra_props: Map<String, Value>,
    /// Head comment of the source key. Not serialized.
    pub comment: String,
}

impl Schema {
    /// Creates a schema with a single type.
    pub fn with_type(name: &str) -> Self {
        Self {
            types: SchemaType::single(name),
            ..Default::default()
        }
    }

    /// Returns `true` when the schema has neither properties nor items.
    ///
    /// Empty schemas carry nothing worth publishing once untitled nodes have
    /// been purged.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.items.is_none()
    }

    /// Stores a keyword that has no dedicated field. `x-*` keys go to
    /// [`extensions`](Schema::extensions), everything else to
    /// [`extra_props`](Schema::extra_props); a key never lives in both.
    ///
    /// ```
    /// use serde_json::json;
    /// use values_schema_core::Schema;
    ///
    /// let mut schema = Schema::default();
    /// schema.insert_extra("x-order", json!(2));
    /// schema.insert_extra("render", json!("radio"));
    /// assert_eq!(schema.extensions["x-order"], 2);
    /// assert_eq!(schema.extra_props["render"], "radio");
    /// ```
    pub fn insert_extra(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if is_extension_key(&key) {
            self.extra_props.remove(&key);
            self.extensions.insert(key, value);
        } else {
            self.extra_props.insert(key, value);
        }
    }

    /// Looks up a keyword stored by [`insert_extra`](Schema::insert_extra).
    pub fn extra(&self, key: &str) -> Option<&Value> {
        if is_extension_key(key) {
            self.extensions.get(key)
        } else {
            self.extra_props.get(key)
        }
    }

    /// Forks this node for a locale variant.
    ///
    /// The fork is a full structural copy: later changes to the fork never
    /// reach `self`, and vice versa.
    pub fn fork(&self) -> Self {
        self.clone()
    }
}

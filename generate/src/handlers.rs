//! Keyword handlers for annotation sections.
//!
//! Dispatch is a closed set of [`Handler`] operations plus a fallback for
//! keywords nobody registered. A [`HandlerRegistry`] maps keywords to
//! handlers; it is built once, never mutated afterwards, and passed by
//! reference into the mapper and the i18n engine.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value, json};
use values_schema_core::{ORDER_EXTENSION, Schema, is_fixed_keyword};

use crate::annotation::Section;
use crate::coerce::coerce_scalar;
use crate::error::AnnotationError;
use crate::property::set_property;

/// A registered keyword behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// `@schema k=v;...`: bulk constraint assignment.
    Schema,
    /// `@param`: reserved for chart parameters, no effect on the schema.
    Param,
    /// `@hidden`: visibility condition.
    Hidden,
    /// `@order`: rendering order hint.
    Order,
    /// `@title`: title plus the `form` flag.
    Title,
    /// `@x-enum`: labelled enumeration.
    XEnum,
    /// `@description`: raw free text.
    Description,
}

/// Result of looking up a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch<'a> {
    Known(Handler),
    Fallback(&'a str),
}

/// Immutable keyword → handler table.
///
/// # Examples
///
/// ```
/// use values_schema_core::Schema;
/// use values_schema_generate::{HandlerRegistry, parse_line};
///
/// let registry = HandlerRegistry::standard();
/// let mut schema = Schema::with_type("string");
/// let errors = registry.apply_all(
///     &mut schema,
///     &parse_line(r#"# @schema type=string;minLength=3;maxLength=10 @title "Name""#),
/// );
///
/// assert!(errors.is_empty());
/// assert_eq!(schema.min_length, Some(3));
/// assert_eq!(schema.max_length, Some(10));
/// assert_eq!(schema.title, "Name");
/// assert_eq!(schema.extra_props["form"], true);
/// ```
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Handler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl HandlerRegistry {
    /// Registry with every built-in keyword.
    pub fn standard() -> Self {
        Self::empty()
            .with("schema", Handler::Schema)
            .with("param", Handler::Param)
            .with("hidden", Handler::Hidden)
            .with("order", Handler::Order)
            .with("title", Handler::Title)
            .with("x-enum", Handler::XEnum)
            .with("description", Handler::Description)
    }

    /// Registry where every keyword goes through the fallback.
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Registers `keyword` (without `@`), replacing any earlier entry.
    pub fn with(mut self, keyword: &str, handler: Handler) -> Self {
        self.handlers.insert(keyword.to_string(), handler);
        self
    }

    /// Removes `keyword` so it falls back to the generic behavior.
    pub fn without(mut self, keyword: &str) -> Self {
        self.handlers.remove(keyword);
        self
    }

    pub fn resolve<'a>(&self, keyword: &'a str) -> Dispatch<'a> {
        match self.handlers.get(keyword) {
            Some(handler) => Dispatch::Known(*handler),
            None => Dispatch::Fallback(keyword),
        }
    }

    /// Applies one locale-less section to `schema`.
    pub fn apply(&self, schema: &mut Schema, section: &Section) -> Result<(), AnnotationError> {
        match self.resolve(section.keyword()) {
            Dispatch::Known(handler) => handler.apply(schema, section),
            Dispatch::Fallback(keyword) => apply_fallback(schema, keyword, section),
        }
    }

    /// Applies sections in order, collecting failures instead of stopping.
    pub fn apply_all(&self, schema: &mut Schema, sections: &[Section]) -> Vec<AnnotationError> {
        sections
            .iter()
            .filter_map(|section| self.apply(schema, section).err())
            .collect()
    }
}

impl Handler {
    pub fn apply(self, schema: &mut Schema, section: &Section) -> Result<(), AnnotationError> {
        match self {
            Self::Schema => {
                for option in &section.options {
                    set_property(schema, &option.name, &option.value);
                }
                Ok(())
            }
            Self::Param => Ok(()),
            Self::Hidden => apply_hidden(schema, section),
            Self::Order => {
                if !section.value.is_empty() {
                    schema.insert_extra(ORDER_EXTENSION, coerce_scalar(&section.value));
                }
                Ok(())
            }
            Self::Title => {
                apply_fallback(schema, "title", section)?;
                if !schema.title.is_empty() {
                    schema.extra_props.insert("form".to_string(), Value::Bool(true));
                }
                Ok(())
            }
            Self::XEnum => {
                apply_x_enum(schema, section);
                Ok(())
            }
            Self::Description => {
                schema.description = description_text(section);
                Ok(())
            }
        }
    }
}

/// Bare value → setter; options → nested object in extra properties;
/// neither → boolean flag.
fn apply_fallback(schema: &mut Schema, keyword: &str, section: &Section) -> Result<(), AnnotationError> {
    if section.is_flag() {
        set_property(schema, keyword, "true");
        return Ok(());
    }
    if !section.value.is_empty() {
        set_property(schema, keyword, &section.value);
        return Ok(());
    }
    if is_fixed_keyword(keyword) {
        return Err(AnnotationError::ReservedKeyword(keyword.to_string()));
    }
    let nested: Map<String, Value> = section
        .options
        .iter()
        .map(|option| (option.name.clone(), coerce_scalar(&option.value)))
        .collect();
    schema.insert_extra(keyword, Value::Object(nested));
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum HiddenOperator {
    Or,
    And,
    Nor,
    Not,
}

impl FromStr for HiddenOperator {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "or" => Ok(Self::Or),
            "and" => Ok(Self::And),
            "nor" => Ok(Self::Nor),
            "not" => Ok(Self::Not),
            other => Err(AnnotationError::UnknownHiddenOperator(other.to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
struct HiddenCondition {
    path: String,
    value: Value,
}

/// A condition or a group of rules joined by an operator.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum HiddenRule {
    Condition(HiddenCondition),
    Group {
        operator: HiddenOperator,
        conditions: Vec<HiddenRule>,
    },
}

impl HiddenRule {
    /// `path=value`, or `path!=value` for the negated form.
    fn from_option(name: &str, value: &str) -> Self {
        let (path, negated) = match name.strip_suffix('!') {
            Some(path) => (path, true),
            None => (name, false),
        };
        let condition = Self::Condition(HiddenCondition {
            path: path.to_string(),
            value: coerce_scalar(value),
        });
        if negated {
            Self::Group {
                operator: HiddenOperator::Not,
                conditions: vec![condition],
            }
        } else {
            condition
        }
    }
}

/// `@hidden`
///
/// - `@hidden` → `true`
/// - `@hidden value` → coerced scalar
/// - `@hidden path=value` → `{path, value}`
/// - `@hidden path!=value` → `{operator: not, conditions: [{path, value}]}`
/// - `@hidden a=1 b=2 operator=and` → `{operator, conditions}`
fn apply_hidden(schema: &mut Schema, section: &Section) -> Result<(), AnnotationError> {
    if section.is_flag() {
        schema.extra_props.insert("hidden".to_string(), Value::Bool(true));
        return Ok(());
    }
    if !section.value.is_empty() {
        schema
            .extra_props
            .insert("hidden".to_string(), coerce_scalar(&section.value));
        return Ok(());
    }

    let mut operator = HiddenOperator::Or;
    let mut rules = Vec::new();
    for option in &section.options {
        if option.name == "operator" {
            operator = option.value.parse()?;
        } else {
            rules.push(HiddenRule::from_option(&option.name, &option.value));
        }
    }

    let rule = match rules.len() {
        0 => return Ok(()),
        1 => rules.remove(0),
        _ => HiddenRule::Group {
            operator,
            conditions: rules,
        },
    };
    let hidden = encode_hidden(&rule)?;
    schema.extra_props.insert("hidden".to_string(), hidden);
    Ok(())
}

fn encode_hidden(value: &impl Serialize) -> Result<Value, AnnotationError> {
    serde_json::to_value(value).map_err(|err| AnnotationError::Encode {
        keyword: "hidden".to_string(),
        message: err.to_string(),
    })
}

/// `@x-enum a=Alpha b=Beta` → `[{"text":"Alpha","value":"a"}, ...]`.
fn apply_x_enum(schema: &mut Schema, section: &Section) {
    let entries = section
        .options
        .iter()
        .map(|option| json!({ "text": option.value, "value": coerce_scalar(&option.name) }))
        .collect();
    schema.insert_extra("x-enum", Value::Array(entries));
    schema
        .extra_props
        .entry("render")
        .or_insert_with(|| Value::String("radio".to_string()));
}

/// Raw clause text; a clause that is exactly one quoted value is unquoted.
fn description_text(section: &Section) -> String {
    let raw = section.raw.trim();
    let quoted = raw.len() >= 2
        && section.options.is_empty()
        && [b'"', b'\'', b'`']
            .iter()
            .any(|quote| raw.as_bytes()[0] == *quote && raw.as_bytes()[raw.len() - 1] == *quote);
    if quoted {
        section.value.clone()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::annotation::{SectionOption, parse_line};

    use super::*;

    fn apply_line(schema: &mut Schema, line: &str) -> Vec<AnnotationError> {
        HandlerRegistry::standard().apply_all(schema, &parse_line(line))
    }

    #[test]
    fn test_resolve() {
        let registry = HandlerRegistry::standard();
        assert_eq!(registry.resolve("title"), Dispatch::Known(Handler::Title));
        assert_eq!(registry.resolve("render"), Dispatch::Fallback("render"));

        let trimmed = registry.without("title");
        assert_eq!(trimmed.resolve("title"), Dispatch::Fallback("title"));
    }

    #[test]
    fn test_schema_and_title_example() {
        let mut schema = Schema::default();
        let errors = apply_line(
            &mut schema,
            r#"# @schema type=string;minLength=3;maxLength=10 @title "Name""#,
        );
        assert!(errors.is_empty());
        assert_eq!(schema.types.as_slice(), ["string"]);
        assert_eq!(schema.min_length, Some(3));
        assert_eq!(schema.max_length, Some(10));
        assert_eq!(schema.title, "Name");
        assert_eq!(schema.extra_props["form"], json!(true));
    }

    #[test]
    fn test_param_has_no_effect() {
        let mut schema = Schema::with_type("string");
        apply_line(&mut schema, "# @param image.tag The image tag");
        assert_eq!(schema, Schema::with_type("string"));
    }

    #[test]
    fn test_hidden_forms() {
        let mut schema = Schema::default();
        apply_line(&mut schema, "@hidden");
        assert_eq!(schema.extra_props["hidden"], json!(true));

        apply_line(&mut schema, "@hidden false");
        assert_eq!(schema.extra_props["hidden"], json!(false));

        apply_line(&mut schema, "@hidden ingress.enabled=false");
        assert_eq!(
            schema.extra_props["hidden"],
            json!({"path": "ingress.enabled", "value": false})
        );

        apply_line(&mut schema, "@hidden persistence.enabled!=true");
        assert_eq!(
            schema.extra_props["hidden"],
            json!({"operator": "not", "conditions": [{"path": "persistence.enabled", "value": true}]})
        );

        apply_line(&mut schema, "@hidden a=1 b=x operator=and");
        assert_eq!(
            schema.extra_props["hidden"],
            json!({"operator": "and", "conditions": [
                {"path": "a", "value": 1},
                {"path": "b", "value": "x"},
            ]})
        );
    }

    #[test]
    fn test_hidden_default_operator_is_or() {
        let mut schema = Schema::default();
        apply_line(&mut schema, "@hidden a=1 b!=2");
        assert_eq!(
            schema.extra_props["hidden"],
            json!({"operator": "or", "conditions": [
                {"path": "a", "value": 1},
                {"operator": "not", "conditions": [{"path": "b", "value": 2}]},
            ]})
        );
    }

    #[test]
    fn test_hidden_unknown_operator() {
        let mut schema = Schema::default();
        let errors = apply_line(&mut schema, "@hidden a=1 b=2 operator=xor");
        assert_eq!(
            errors,
            vec![AnnotationError::UnknownHiddenOperator("xor".to_string())]
        );
        assert!(!schema.extra_props.contains_key("hidden"));
    }

    #[test]
    fn test_order_goes_to_extensions() {
        let mut schema = Schema::default();
        apply_line(&mut schema, "@order 3");
        assert_eq!(schema.extensions[ORDER_EXTENSION], json!(3));
        assert!(schema.extra_props.is_empty());
    }

    #[test]
    fn test_schema_option_overrides_order_without_duplicate_key() {
        let mut schema = Schema::with_type("integer");
        apply_line(&mut schema, "# @title A @order 1 @schema x-order=2");
        assert_eq!(schema.extensions[ORDER_EXTENSION], json!(2));
        assert!(!schema.extra_props.contains_key(ORDER_EXTENSION));

        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json.matches("\"x-order\"").count(), 1);
        assert_eq!(
            json,
            r#"{"type":"integer","title":"A","x-order":2,"form":true}"#
        );
    }

    #[test]
    fn test_vendor_fallback_with_options_goes_to_extensions() {
        let mut schema = Schema::default();
        apply_line(&mut schema, "@x-layout cols=2");
        assert_eq!(schema.extensions["x-layout"], json!({"cols": 2}));
        assert!(schema.extra_props.is_empty());
    }

    #[test]
    fn test_bare_hidden_flag_always_hides() {
        // A bare `@hidden` marks the value as never shown in forms.
        let mut schema = Schema::with_type("string");
        let errors = apply_line(&mut schema, "# @title Internal token @hidden");
        assert!(errors.is_empty());
        assert_eq!(schema.extra_props["hidden"], json!(true));

        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["hidden"], true);
        assert_eq!(json["title"], "Internal token");
    }

    #[test]
    fn test_title_with_only_options_is_rejected() {
        let mut schema = Schema::default();
        let section = Section {
            name: "@title".to_string(),
            value: String::new(),
            options: vec![SectionOption::new("", "")],
            raw: String::new(),
        };
        let errors = HandlerRegistry::standard().apply_all(&mut schema, &[section]);
        assert_eq!(errors, vec![AnnotationError::ReservedKeyword("title".to_string())]);
        assert!(!schema.extra_props.contains_key("form"));
    }

    #[test]
    fn test_x_enum() {
        let mut schema = Schema::default();
        apply_line(&mut schema, r#"@x-enum 1=One 2="Two things""#);
        assert_eq!(
            schema.extensions["x-enum"],
            json!([{"text": "One", "value": 1}, {"text": "Two things", "value": 2}])
        );
        assert_eq!(schema.extra_props["render"], json!("radio"));

        let mut preset = Schema::default();
        preset
            .extra_props
            .insert("render".to_string(), json!("select"));
        apply_line(&mut preset, "@x-enum a=A");
        assert_eq!(preset.extra_props["render"], json!("select"));
    }

    #[test]
    fn test_description_keeps_raw_text() {
        let mut schema = Schema::default();
        apply_line(&mut schema, "# @description Listen port (TCP); default=8080");
        assert_eq!(schema.description, "Listen port (TCP); default=8080");

        apply_line(&mut schema, r#"# @description "Quoted, single value""#);
        assert_eq!(schema.description, "Quoted, single value");
    }

    #[test]
    fn test_fallback_behaviors() {
        let mut schema = Schema::default();
        apply_line(&mut schema, "@render textarea");
        apply_line(&mut schema, "@layout cols=2 wide=true");
        apply_line(&mut schema, "@advanced");
        apply_line(&mut schema, "@format password");
        assert_eq!(schema.extra_props["render"], json!("textarea"));
        assert_eq!(schema.extra_props["layout"], json!({"cols": 2, "wide": true}));
        assert_eq!(schema.extra_props["advanced"], json!(true));
        assert_eq!(schema.format, "password");
    }

    #[test]
    fn test_fixed_keyword_with_options_is_rejected() {
        let mut schema = Schema::default();
        let errors = apply_line(&mut schema, "@minimum a=1");
        assert_eq!(errors, vec![AnnotationError::ReservedKeyword("minimum".to_string())]);
        assert!(!schema.extra_props.contains_key("minimum"));
    }

    #[test]
    fn test_errors_do_not_stop_later_sections() {
        let mut schema = Schema::default();
        let errors = apply_line(&mut schema, "@hidden a=1 operator=xor @title Port");
        assert_eq!(errors.len(), 1);
        assert_eq!(schema.title, "Port");
    }
}

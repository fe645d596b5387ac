//! Maps a loaded document onto a schema tree.

use tracing::{debug, warn};
use values_schema_core::{JSON_SCHEMA_DRAFT, Schema, SchemaItems};

use crate::annotation::parse_comment;
use crate::coerce::coerce_scalar;
use crate::document::{Document, Node, ScalarTag};
use crate::handlers::HandlerRegistry;

/// Recursive document → schema mapper.
///
/// Only locale-less sections are applied here; `@keyword.locale` sections
/// stay in each node's `comment` for the i18n engine.
#[derive(Debug, Clone, Copy)]
pub struct Mapper<'r> {
    registry: &'r HandlerRegistry,
}

impl<'r> Mapper<'r> {
    pub fn new(registry: &'r HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Maps the document root and stamps `$schema`. Returns `None` for an
    /// empty document.
    pub fn map_document(&self, document: &Document) -> Option<Schema> {
        let root = document.root.as_ref()?;
        let mut schema = self.map_node(root);
        schema.meta_schema = JSON_SCHEMA_DRAFT.to_string();
        Some(schema)
    }

    pub fn map_node(&self, node: &Node) -> Schema {
        match node {
            Node::Mapping(entries) => {
                let mut schema = Schema::with_type("object");
                for entry in entries {
                    let mut child = self.map_node(&entry.value);
                    child.comment = entry.head_comment.clone();
                    self.annotate(&mut child, &entry.key);
                    schema.properties.insert(&entry.key, child);
                }
                schema
            }
            Node::Sequence(elements) => {
                let mut schema = Schema::with_type("array");
                let elements = elements.iter().map(|element| self.map_node(element)).collect();
                schema.items = SchemaItems::from_elements(elements);
                schema
            }
            Node::Scalar { tag, value } => map_scalar(tag, value),
        }
    }

    fn annotate(&self, schema: &mut Schema, key: &str) {
        if schema.comment.is_empty() {
            return;
        }
        for section in parse_comment(&schema.comment) {
            if let (_, Some(locale)) = section.split_locale() {
                debug!(key, section = %section.name, locale, "deferring localized section");
                continue;
            }
            if let Err(err) = self.registry.apply(schema, &section) {
                warn!(key, section = %section.name, %err, "annotation not applied");
            }
        }
    }
}

fn map_scalar(tag: &ScalarTag, value: &str) -> Schema {
    let (type_name, format) = match tag {
        ScalarTag::Str | ScalarTag::Binary => ("string", None),
        ScalarTag::Int => ("integer", None),
        ScalarTag::Float => ("number", None),
        ScalarTag::Bool => ("boolean", None),
        ScalarTag::Timestamp => ("string", Some("date-time")),
        ScalarTag::Null => ("null", None),
        ScalarTag::Other(_) => ("object", None),
    };
    let mut schema = Schema::with_type(type_name);
    if let Some(format) = format {
        schema.format = format.to_string();
    }
    if !value.is_empty() {
        schema.default = Some(if type_name == "string" {
            serde_json::Value::String(value.to_string())
        } else {
            coerce_scalar(value)
        });
    }
    schema
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn map(text: &str) -> Schema {
        let document = Document::parse(text).unwrap();
        Mapper::new(&HandlerRegistry::standard())
            .map_document(&document)
            .unwrap()
    }

    #[test]
    fn test_root_is_stamped() {
        let schema = map("a: 1\n");
        assert_eq!(schema.meta_schema, JSON_SCHEMA_DRAFT);
        assert_eq!(schema.types.as_slice(), ["object"]);
    }

    #[test]
    fn test_empty_document_maps_to_none() {
        let document = Document::parse("# nothing here\n").unwrap();
        assert!(
            Mapper::new(&HandlerRegistry::standard())
                .map_document(&document)
                .is_none()
        );
    }

    #[test]
    fn test_properties_keep_document_order() {
        let schema = map("zeta: 1\nalpha: 2\nmid: 3\n");
        assert_eq!(schema.properties.names(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_scalar_types_and_defaults() {
        let schema = map(
            "name: web\nport: 8080\nratio: 0.5\nenabled: true\nnothing: null\nversion: \"1.20\"\nwhen: 2024-01-02\n",
        );
        let prop = |name: &str| schema.properties.get(name).unwrap();

        assert_eq!(prop("name").types.as_slice(), ["string"]);
        assert_eq!(prop("name").default, Some(json!("web")));
        assert_eq!(prop("port").types.as_slice(), ["integer"]);
        assert_eq!(prop("port").default, Some(json!(8080)));
        assert_eq!(prop("ratio").types.as_slice(), ["number"]);
        assert_eq!(prop("ratio").default, Some(json!(0.5)));
        assert_eq!(prop("enabled").default, Some(json!(true)));
        assert_eq!(prop("nothing").types.as_slice(), ["null"]);
        assert_eq!(prop("nothing").default, None);
        assert_eq!(prop("version").default, Some(json!("1.20")));
        assert_eq!(prop("when").format, "date-time");
    }

    #[test]
    fn test_quoted_date_maps_to_plain_string() {
        let schema = map("released: \"2024-01-02\"\nplain: 2024-01-02\n");
        let released = serde_json::to_value(schema.properties.get("released").unwrap()).unwrap();
        assert_eq!(released, json!({"type": "string", "default": "2024-01-02"}));

        let plain = schema.properties.get("plain").unwrap();
        assert_eq!(plain.format, "date-time");
    }

    #[test]
    fn test_uniform_and_tuple_sequences() {
        let schema = map("ports: [80, 80]\nmixed: [a, 1]\nempty: []\n");
        let ports = schema.properties.get("ports").unwrap();
        assert!(matches!(ports.items, Some(SchemaItems::Single(_))));

        let mixed = schema.properties.get("mixed").unwrap();
        assert!(matches!(&mixed.items, Some(SchemaItems::Array(items)) if items.len() == 2));

        let empty = schema.properties.get("empty").unwrap();
        assert_eq!(empty.types.as_slice(), ["array"]);
        assert!(empty.items.is_none());
    }

    #[test]
    fn test_head_comment_annotates_child() {
        let schema = map(
            "# @title Replicas\n# @schema minimum=1;maximum=10\nreplicaCount: 1\n",
        );
        let replicas = schema.properties.get("replicaCount").unwrap();
        assert_eq!(replicas.title, "Replicas");
        assert_eq!(replicas.minimum, Some(1.0));
        assert_eq!(replicas.maximum, Some(10.0));
        assert_eq!(replicas.comment, "# @title Replicas\n# @schema minimum=1;maximum=10");
    }

    #[test]
    fn test_localized_sections_are_deferred() {
        let schema = map("# @title.zh 副本\nreplicaCount: 1\n");
        let replicas = schema.properties.get("replicaCount").unwrap();
        assert!(replicas.title.is_empty());
        assert!(!replicas.extra_props.contains_key("form"));
    }

    #[test]
    fn test_declared_type_wins_over_inferred() {
        let schema = map("# @schema type=string\nport: 8080\n");
        let port = schema.properties.get("port").unwrap();
        assert_eq!(port.types.as_slice(), ["string", "integer"]);
    }
}

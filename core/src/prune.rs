//! Pruning of untitled schema nodes.
//!
//! A title marks a value as user-facing. Purging keeps the public surface of
//! a schema only: untitled object properties are dropped, array item schemas
//! are thinned but never dropped.
//!
//! # Examples
//!
//! ```
//! use values_schema_core::{Schema, purge_schema};
//!
//! let mut root = Schema::with_type("object");
//! let mut port = Schema::with_type("integer");
//! port.title = "Port".into();
//! root.properties.insert("port", port);
//! root.properties.insert("internal", Schema::with_type("string"));
//!
//! purge_schema(&mut root);
//! assert_eq!(root.properties.names(), vec!["port"]);
//! ```

use crate::Schema;

/// Removes untitled nodes from `schema`, in place.
///
/// Object-typed nodes drop every property whose schema has an empty title and
/// recurse into the kept ones. Array-typed nodes recurse into every item
/// schema. Purging twice yields the same tree as purging once.
pub fn purge_schema(schema: &mut Schema) {
    if schema.types.contains("object") {
        schema.properties.retain(|property| !property.schema.title.is_empty());
        for property in schema.properties.iter_mut() {
            purge_schema(&mut property.schema);
        }
    }
    if schema.types.contains("array") {
        if let Some(items) = schema.items.as_mut() {
            for item in items.iter_mut() {
                purge_schema(item);
            }
        }
    }
}

//! Core JSON-Schema model for generated values schemas.
//!
//! This crate defines the in-memory schema tree produced from annotated
//! values documents:
//!
//! - [`Schema`]: one JSON-Schema node with typed constraint fields, ordered
//!   [`SchemaProperties`], and two flattened side channels (`extra_props` and
//!   `extensions`).
//! - [`SchemaType`]: the duplicate-free `type` list with its
//!   prepend/append insertion rule.
//! - [`SchemaItems`]: single item schema vs positional item list.
//! - [`I18nSchema`]: an authoritative tree plus per-locale copies, merged
//!   with [`I18nSchema::merge_children`].
//!
//! Pruning ([`purge_schema`]) trims a tree down to its titled, user-facing
//! nodes.
//!
//! # Example
//!
//! ```
//! use values_schema_core::*;
//!
//! let mut root = Schema::with_type("object");
//! root.meta_schema = JSON_SCHEMA_DRAFT.to_string();
//!
//! let mut replicas = Schema::with_type("integer");
//! replicas.title = "Replicas".into();
//! replicas.minimum = Some(1.0);
//! root.properties.insert("replicas", replicas);
//! root.properties.insert("podLabels", Schema::with_type("object"));
//!
//! purge_schema(&mut root);
//! assert_eq!(root.properties.names(), vec!["replicas"]);
//!
//! let json = serde_json::to_value(&root).unwrap();
//! assert_eq!(json["properties"]["replicas"]["minimum"], 1.0);
//! ```

mod json;
mod merge;
mod prune;
mod types;

pub use json::DecodeError;
pub use merge::{ChildSlot, I18nSchema, ResolvedChild};
pub use prune::purge_schema;
pub use types::*;

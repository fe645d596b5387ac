//! JSON-Schema generation from annotated Helm values documents.
//!
//! Comments directly above a key carry `@keyword` annotations:
//!
//! ```yaml
//! # @title Replicas
//! # @title.zh 副本数
//! # @schema minimum=1;maximum=10
//! replicaCount: 1
//! ```
//!
//! The pipeline has three stages:
//!
//! 1. [`generate_schema`] loads the document, infers a schema from the
//!    values and applies every locale-less annotation.
//! 2. [`complete_i18n`] re-reads the annotations and derives one schema
//!    tree per `@keyword.locale` locale.
//! 3. [`purge_schema`](values_schema_core::purge_schema) keeps only titled
//!    nodes.
//!
//! [`generate_charts`] runs all three over chart directories and writes the
//! resulting `values.schema*.json` files.
//!
//! # Example
//!
//! ```
//! use values_schema_generate::{complete_i18n, generate_schema};
//!
//! let values = br#"
//! ## @title Image
//! image:
//!   ## @title Repository
//!   ## @schema pattern=^[a-z0-9./-]+$
//!   repository: nginx
//!   pullPolicy: IfNotPresent
//! "#;
//!
//! let schema = generate_schema(values).unwrap().unwrap();
//! let image = schema.properties.get("image").unwrap();
//! assert_eq!(image.properties.get("repository").unwrap().pattern, "^[a-z0-9./-]+$");
//!
//! let mut i18n = complete_i18n(&schema).into_result().unwrap();
//! i18n.purge();
//! let image = i18n.original.properties.get("image").unwrap();
//! assert_eq!(image.properties.names(), vec!["repository"]);
//! ```

pub mod annotation;
mod charts;
mod coerce;
mod config;
pub mod document;
mod error;
mod handlers;
mod i18n;
mod mapper;
mod property;

pub use annotation::{Section, SectionOption, parse_comment, parse_line};
pub use charts::{
    BatchOutcome, ChartOutcome, RenderedSchemas, collect_chart_dirs, generate_chart,
    generate_charts, render_values, write_schema,
};
pub use coerce::{coerce_extra, coerce_scalar};
pub use config::{DEFAULT_SCHEMA_FILE, DEFAULT_VALUES_FILE, GenerateConfig};
pub use document::Document;
pub use error::{AnnotationError, ChartError, GenerateError, I18nError, NodeFailure};
pub use handlers::{Dispatch, Handler, HandlerRegistry};
pub use i18n::{I18nResult, complete_i18n, complete_i18n_with};
pub use mapper::Mapper;
pub use property::set_property;

use values_schema_core::Schema;

/// Parses a values document into a schema with the standard handlers.
///
/// Returns `Ok(None)` for an empty document. Annotation problems never fail
/// this call; they are logged and the affected annotation is skipped.
///
/// # Errors
///
/// Returns [`GenerateError`] when the bytes are not a readable YAML document.
pub fn generate_schema(document: &[u8]) -> Result<Option<Schema>, GenerateError> {
    generate_schema_with(document, &HandlerRegistry::standard())
}

/// Parses a values document into a schema with an explicit registry.
pub fn generate_schema_with(
    document: &[u8],
    registry: &HandlerRegistry,
) -> Result<Option<Schema>, GenerateError> {
    let document = Document::from_slice(document)?;
    Ok(Mapper::new(registry).map_document(&document))
}

//! Locale variant derivation.
//!
//! Every node re-reads its own head comment. Sections named
//! `@keyword.locale` are applied, under `@keyword`, to a fork of the node
//! made for that locale; all other sections are applied to the node's
//! original. Children are resolved first and folded back through
//! [`I18nSchema::merge_children`], so a locale first seen deep in the tree
//! reaches every ancestor with all siblings intact.

use std::collections::BTreeMap;

use tracing::debug;
use values_schema_core::{ChildSlot, I18nSchema, ResolvedChild, Schema};

use crate::annotation::{Section, parse_comment};
use crate::error::{AnnotationError, I18nError, NodeFailure};
use crate::handlers::HandlerRegistry;

/// Outcome of [`complete_i18n`]: the full result plus every annotation that
/// could not be applied.
#[derive(Debug, Clone)]
pub struct I18nResult {
    pub schema: I18nSchema,
    pub failures: Vec<NodeFailure>,
}

impl I18nResult {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turns collected failures into an error, dropping the result.
    ///
    /// Callers that want the best-effort result regardless read
    /// [`schema`](Self::schema) directly.
    pub fn into_result(self) -> Result<I18nSchema, I18nError> {
        if self.failures.is_empty() {
            Ok(self.schema)
        } else {
            Err(I18nError {
                failures: self.failures,
            })
        }
    }
}

/// Derives locale variants with the standard handler registry.
///
/// ```
/// use values_schema_generate::{complete_i18n, generate_schema};
///
/// let values = b"# @title Name\n# @title.zh \xe5\x90\x8d\xe7\xa7\xb0\nname: web\n";
/// let schema = generate_schema(values).unwrap().unwrap();
/// let i18n = complete_i18n(&schema).into_result().unwrap();
///
/// assert_eq!(i18n.original.properties.get("name").unwrap().title, "Name");
/// assert_eq!(i18n.locales["zh"].properties.get("name").unwrap().title, "名称");
/// ```
pub fn complete_i18n(schema: &Schema) -> I18nResult {
    complete_i18n_with(schema, &HandlerRegistry::standard())
}

/// Derives locale variants with an explicit handler registry.
pub fn complete_i18n_with(schema: &Schema, registry: &HandlerRegistry) -> I18nResult {
    let mut failures = Vec::new();
    let resolved = Engine {
        registry,
        failures: &mut failures,
    }
    .resolve(schema, "$");
    I18nResult {
        schema: resolved,
        failures,
    }
}

struct Engine<'a> {
    registry: &'a HandlerRegistry,
    failures: &'a mut Vec<NodeFailure>,
}

/// Sections of one comment split by locale.
#[derive(Debug, Default)]
struct LocaleSplit {
    shared: Vec<Section>,
    by_locale: BTreeMap<String, Vec<Section>>,
}

impl Engine<'_> {
    fn resolve(&mut self, schema: &Schema, path: &str) -> I18nSchema {
        let split = self.split(&schema.comment, path);

        let mut original = schema.fork();
        self.apply(&mut original, &split.shared, path);

        let mut children = Vec::new();
        if let Some(items) = &original.items {
            for (position, item) in items.iter().enumerate() {
                let child = self.resolve(item, &format!("{path}[{position}]"));
                children.push(ResolvedChild::new(ChildSlot::Item(position), child));
            }
        }
        for (position, property) in original.properties.iter().enumerate() {
            let child = self.resolve(&property.schema, &format!("{path}.{}", property.name));
            children.push(ResolvedChild::new(ChildSlot::Property(position), child));
        }

        let mut node = I18nSchema::new(original);
        node.merge_children(children);

        for (locale, sections) in &split.by_locale {
            debug!(path, locale, sections = sections.len(), "applying localized sections");
            let variant = node.fork_locale(locale);
            self.apply(variant, sections, path);
        }
        node
    }

    fn split(&mut self, comment: &str, path: &str) -> LocaleSplit {
        let mut split = LocaleSplit::default();
        if comment.is_empty() {
            return split;
        }
        for section in parse_comment(comment) {
            match section.split_locale() {
                (_, None) => split.shared.push(section),
                (_, Some("")) => self.fail(path, AnnotationError::EmptyLocale(section.name.clone())),
                (_, Some(locale)) if !is_locale_name(locale) => {
                    self.fail(path, AnnotationError::InvalidLocale(section.name.clone()));
                }
                (keyword, Some(locale)) => {
                    let renamed = section.renamed(keyword);
                    split
                        .by_locale
                        .entry(locale.to_string())
                        .or_default()
                        .push(renamed);
                }
            }
        }
        split
    }

    fn apply(&mut self, schema: &mut Schema, sections: &[Section], path: &str) {
        for error in self.registry.apply_all(schema, sections) {
            self.fail(path, error);
        }
    }

    fn fail(&mut self, path: &str, error: AnnotationError) {
        self.failures.push(NodeFailure {
            path: path.to_string(),
            error,
        });
    }
}

/// Accepts language tags such as `zh`, `en-US` or `zh_Hans`: an ASCII
/// letter or digit followed by letters, digits, `-` or `_`.
pub(crate) fn is_locale_name(locale: &str) -> bool {
    let mut chars = locale.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

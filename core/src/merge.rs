//! Locale variants and the copy-on-write merge of resolved children.
//!
//! An [`I18nSchema`] pairs the authoritative `original` tree with one full
//! copy per locale. A locale copy is forked from `original` the first time the
//! locale shows up at a node and evolves independently afterwards.
//!
//! The merge order matters: every child's `original` must be written back
//! into the parent's `original` before the parent forks a new locale,
//! otherwise the fork captures stale siblings and the localized content of a
//! child is lost for locales the parent had not seen yet.
//! [`I18nSchema::merge_children`] performs both steps in that order.
//!
//! # Example
//!
//! ```
//! use values_schema_core::*;
//!
//! let mut parent = I18nSchema::new(Schema::with_type("object"));
//! parent.original.properties.insert("name", Schema::with_type("string"));
//!
//! let mut child = I18nSchema::new(Schema::with_type("string"));
//! child.original.title = "Name".into();
//! child.fork_locale("zh").title = "名称".into();
//!
//! parent.merge_children(vec![ResolvedChild::new(ChildSlot::Property(0), child)]);
//!
//! assert_eq!(parent.original.properties.get("name").unwrap().title, "Name");
//! assert_eq!(parent.locales["zh"].properties.get("name").unwrap().title, "名称");
//! ```

use std::collections::BTreeMap;

use crate::{Schema, purge_schema};

/// A schema tree together with its per-locale variants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct I18nSchema {
    /// Locale-less, authoritative tree.
    pub original: Schema,
    /// Full copies of `original` with locale overrides applied.
    pub locales: BTreeMap<String, Schema>,
}

/// Position of a child node inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSlot {
    /// Index into `items` (a single item schema sits at index 0).
    Item(usize),
    /// Index into `properties`, in insertion order.
    Property(usize),
}

impl ChildSlot {
    /// Returns the child schema this slot points at in `parent`.
    pub fn get_mut(self, parent: &mut Schema) -> Option<&mut Schema> {
        match self {
            Self::Item(index) => parent.items.as_mut()?.get_mut(index),
            Self::Property(index) => parent
                .properties
                .get_index_mut(index)
                .map(|property| &mut property.schema),
        }
    }
}

/// A child subtree whose own locales are already resolved.
#[derive(Debug, Clone)]
pub struct ResolvedChild {
    pub slot: ChildSlot,
    pub schema: I18nSchema,
}

impl ResolvedChild {
    pub fn new(slot: ChildSlot, schema: I18nSchema) -> Self {
        Self { slot, schema }
    }
}

impl I18nSchema {
    /// Wraps a tree with no locale variants yet.
    pub fn new(original: Schema) -> Self {
        Self {
            original,
            locales: BTreeMap::new(),
        }
    }

    /// Returns the variant for `locale`, forking it from the current
    /// `original` if the locale is new at this node.
    pub fn fork_locale(&mut self, locale: &str) -> &mut Schema {
        let original = &self.original;
        self.locales
            .entry(locale.to_string())
            .or_insert_with(|| original.fork())
    }

    /// Folds resolved children into this node.
    ///
    /// All child originals are written into `original` first; only then are
    /// child variants placed into the matching locale trees, forking any
    /// locale this node has not seen from the fully updated `original`.
    pub fn merge_children(&mut self, children: Vec<ResolvedChild>) {
        let mut pending = Vec::with_capacity(children.len());
        for child in children {
            let I18nSchema { original, locales } = child.schema;
            if let Some(target) = child.slot.get_mut(&mut self.original) {
                *target = original;
            }
            pending.push((child.slot, locales));
        }

        for (slot, locales) in pending {
            for (locale, variant) in locales {
                if let Some(target) = slot.get_mut(self.fork_locale(&locale)) {
                    *target = variant;
                }
            }
        }
    }

    /// Drops every locale variant not listed in `keep`. An empty list keeps
    /// all of them.
    pub fn retain_locales(&mut self, keep: &[String]) {
        if keep.is_empty() {
            return;
        }
        self.locales.retain(|locale, _| keep.contains(locale));
    }

    /// Purges `original` and every locale variant.
    pub fn purge(&mut self) {
        purge_schema(&mut self.original);
        for variant in self.locales.values_mut() {
            purge_schema(variant);
        }
    }

    pub fn locale_names(&self) -> Vec<&str> {
        self.locales.keys().map(String::as_str).collect()
    }
}

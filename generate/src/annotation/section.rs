//! Section parser: turns comment lines into `@keyword` clauses.

use serde::Serialize;

use super::lexer::{Lexer, Terminator};

/// A key, or `key=value` pair, attached to a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionOption {
    pub name: String,
    pub value: String,
}

impl SectionOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One parsed `@keyword ...` clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Untouched source text between the marker and the next marker (or end
    /// of line).
    pub raw: String,
    /// Marker including the leading `@`, e.g. `@title.zh`.
    pub name: String,
    /// First bare token of the clause.
    pub value: String,
    pub options: Vec<SectionOption>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Marker without the leading `@`.
    pub fn keyword(&self) -> &str {
        self.name.strip_prefix('@').unwrap_or(&self.name)
    }

    /// Splits `keyword.locale` at the first dot.
    ///
    /// Returns the base keyword and, for localized sections, the locale. An
    /// empty locale (`@title.`) comes back as `Some("")`.
    pub fn split_locale(&self) -> (&str, Option<&str>) {
        let keyword = self.keyword();
        match keyword.find('.') {
            Some(dot) if dot > 0 => (&keyword[..dot], Some(&keyword[dot + 1..])),
            _ => (keyword, None),
        }
    }

    /// Same clause under another marker name.
    pub fn renamed(&self, keyword: &str) -> Self {
        Self {
            name: format!("@{keyword}"),
            ..self.clone()
        }
    }

    /// A section with neither value nor options is a boolean flag.
    pub fn is_flag(&self) -> bool {
        self.value.is_empty() && self.options.is_empty()
    }
}

/// Parses every line of a head comment.
///
/// Lines that do not open with a section marker are plain prose and yield
/// nothing.
///
/// ```
/// use values_schema_generate::parse_comment;
///
/// let sections = parse_comment("# Replica count\n# @title Replicas @schema minimum=1");
/// assert_eq!(sections.len(), 2);
/// assert_eq!(sections[0].value, "Replicas");
/// assert_eq!(sections[1].options[0].name, "minimum");
/// ```
pub fn parse_comment(comment: &str) -> Vec<Section> {
    comment.lines().flat_map(parse_line).collect()
}

/// Parses one comment line into its sections, left to right.
pub fn parse_line(line: &str) -> Vec<Section> {
    let mut lexer = Lexer::new(line);
    lexer.skip_separators();

    let Some(first) = lexer.next_identity() else {
        return Vec::new();
    };
    if !first.is_section_marker() {
        return Vec::new();
    }

    let mut sections = Vec::new();
    let mut current = Section::new(first.text);
    let mut body_start = lexer.pos();

    while let Some(token) = lexer.next_identity() {
        if token.is_section_marker() {
            current.raw = line[body_start..token.start].to_string();
            sections.push(std::mem::replace(&mut current, Section::new(token.text)));
            body_start = lexer.pos();
            continue;
        }

        if token.terminator == Terminator::Equals {
            let value = lexer.next_raw().map(|value| value.text).unwrap_or_default();
            current.options.push(SectionOption::new(token.text, value));
        } else if current.value.is_empty() {
            current.value = token.text;
        } else {
            current.options.push(SectionOption::new(token.text, ""));
        }
    }

    current.raw = line[body_start.min(line.len())..].to_string();
    sections.push(current);
    sections
}

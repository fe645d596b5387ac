//! Values document loader.
//!
//! `serde_yaml` yields the data but drops comments, so loading runs in two
//! passes: the text is decoded into a [`serde_yaml::Value`], and a line
//! scanner builds a [`CommentIndex`] of the comment block sitting directly
//! above each mapping key. The two are joined by key path into a [`Node`]
//! tree.
//!
//! The scanner also notes which values are written as quoted scalars. YAML
//! resolves timestamps only for plain scalars, so `"2024-01-02"` stays a
//! string.
//!
//! The scanner understands block mappings, block sequences (including
//! sequences indented at the same column as their parent key), block
//! scalars and multi-line flow collections. A blank line between a comment
//! block and its key detaches the block.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value as YamlValue;

use crate::error::GenerateError;

/// YAML 1.1 timestamp, the form `values.yaml` files use for dates.
static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\d{4}-\d{1,2}-\d{1,2}(?:(?:[Tt]|[ \t]+)\d{1,2}:\d{2}:\d{2}(?:\.\d*)?(?:[ \t]*(?:Z|[-+]\d{1,2}(?::?\d{2})?))?)?$",
    )
    .expect("static regex must compile")
});

/// Resolved tag of a scalar node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarTag {
    Str,
    Binary,
    Int,
    Float,
    Bool,
    Timestamp,
    Null,
    /// Any explicit tag not listed above.
    Other(String),
}

/// One node of a loaded document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mapping(Vec<MappingEntry>),
    Sequence(Vec<Node>),
    Scalar { tag: ScalarTag, value: String },
}

/// One key of a mapping, with the comment block directly above it.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    pub key: String,
    pub head_comment: String,
    pub value: Node,
}

/// A parsed values document. `root` is `None` for an empty document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Option<Node>,
}

impl Document {
    /// Decodes document bytes.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::InvalidUtf8`] for non-UTF-8 input and
    /// [`GenerateError::Yaml`] when the text is not valid YAML.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, GenerateError> {
        let text = std::str::from_utf8(bytes)?;
        Self::parse(text)
    }

    /// Decodes document text.
    pub fn parse(text: &str) -> Result<Self, GenerateError> {
        let value: YamlValue = serde_yaml::from_str(text)?;
        if !has_content(text) {
            return Ok(Self { root: None });
        }
        let comments = CommentIndex::scan(text);
        let mut path = Vec::new();
        Ok(Self {
            root: Some(build_node(value, &mut path, &comments)),
        })
    }
}

/// One step of a key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Head comments and quoted scalar values by key path.
#[derive(Debug, Clone, Default)]
pub struct CommentIndex {
    comments: HashMap<Vec<PathSegment>, String>,
    quoted: HashSet<Vec<PathSegment>>,
}

#[derive(Debug)]
struct Frame {
    indent: usize,
    segment: PathSegment,
}

impl CommentIndex {
    pub fn get(&self, path: &[PathSegment]) -> Option<&str> {
        self.comments.get(path).map(String::as_str)
    }

    /// Returns `true` when the value at `path` is a single- or
    /// double-quoted scalar.
    pub fn is_quoted(&self, path: &[PathSegment]) -> bool {
        self.quoted.contains(path)
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Scans document text for comment blocks directly above keys.
    pub fn scan(text: &str) -> Self {
        let mut index = Self::default();
        let mut stack: Vec<Frame> = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        // Indent of the line that opened a block scalar.
        let mut block_scalar: Option<usize> = None;
        let mut flow_depth: i32 = 0;

        for line in text.lines() {
            let trimmed = line.trim();
            let indent = line.len() - line.trim_start().len();

            if let Some(owner) = block_scalar {
                if trimmed.is_empty() || indent > owner {
                    continue;
                }
                block_scalar = None;
            }
            if flow_depth > 0 {
                flow_depth += bracket_balance(trimmed);
                continue;
            }
            if trimmed.is_empty() {
                pending.clear();
                continue;
            }
            if trimmed.starts_with('#') {
                pending.push(trimmed);
                continue;
            }
            if trimmed == "---" || trimmed.starts_with("--- ") || trimmed == "..." {
                stack.clear();
                pending.clear();
                continue;
            }
            if trimmed.starts_with('%') {
                continue;
            }

            let mut column = indent;
            let mut rest = &line[indent..];
            while rest == "-" || rest.starts_with("- ") || rest.starts_with("-\t") {
                while stack.last().is_some_and(|frame| frame.indent > column) {
                    stack.pop();
                }
                match stack.last_mut() {
                    Some(Frame {
                        indent: frame_indent,
                        segment: PathSegment::Index(position),
                    }) if *frame_indent == column => *position += 1,
                    _ => stack.push(Frame {
                        indent: column,
                        segment: PathSegment::Index(0),
                    }),
                }
                let after = &rest[1..];
                let inner = after.trim_start();
                column += 1 + (after.len() - inner.len());
                rest = inner;
            }
            if rest.is_empty() {
                continue;
            }
            if rest.starts_with('#') {
                // `- # comment` heads the first key of the item.
                pending.push(rest);
                continue;
            }

            let Some((key, after_colon)) = split_key(rest) else {
                pending.clear();
                if column > indent && rest.starts_with(['"', '\'']) {
                    index.quoted.insert(stack_path(&stack));
                }
                match rest.as_bytes()[0] {
                    b'[' | b'{' => flow_depth = bracket_balance(rest),
                    b'|' | b'>' => block_scalar = Some(indent),
                    _ => {}
                }
                continue;
            };

            // A key never lives inside a frame at its own column: that is a
            // sibling key or the end of an indentless sequence.
            while stack.last().is_some_and(|frame| frame.indent >= column) {
                stack.pop();
            }
            stack.push(Frame {
                indent: column,
                segment: PathSegment::Key(key),
            });

            if !pending.is_empty() {
                index.comments.insert(stack_path(&stack), pending.join("\n"));
                pending.clear();
            }

            let value = strip_comment(after_colon).trim();
            match value.as_bytes().first() {
                Some(b'"' | b'\'') => {
                    index.quoted.insert(stack_path(&stack));
                }
                Some(b'|' | b'>') => block_scalar = Some(column),
                Some(b'[' | b'{') => flow_depth = bracket_balance(value),
                _ => {}
            }
        }
        index
    }
}

fn stack_path(stack: &[Frame]) -> Vec<PathSegment> {
    stack.iter().map(|frame| frame.segment.clone()).collect()
}

/// Splits `key: value` at the mapping colon. Quoted keys are unquoted.
fn split_key(text: &str) -> Option<(String, &str)> {
    let bytes = text.as_bytes();
    match bytes.first()? {
        b'"' | b'\'' => {
            let quote = bytes[0];
            let mut pos = 1;
            while pos < bytes.len() {
                if bytes[pos] == b'\\' && quote == b'"' {
                    pos += 2;
                    continue;
                }
                if bytes[pos] == quote {
                    if quote == b'\'' && bytes.get(pos + 1) == Some(&b'\'') {
                        pos += 2;
                        continue;
                    }
                    break;
                }
                pos += 1;
            }
            let close = pos.min(bytes.len());
            let after = text.get(close + 1..)?.trim_start();
            let after_colon = after.strip_prefix(':')?;
            if !(after_colon.is_empty() || after_colon.starts_with([' ', '\t'])) {
                return None;
            }
            let inner = &text[1..close];
            let key = if quote == b'\'' {
                inner.replace("''", "'")
            } else {
                inner.replace("\\\"", "\"").replace("\\\\", "\\")
            };
            Some((key, after_colon))
        }
        b'[' | b'{' | b'?' | b'#' | b'|' | b'>' | b'*' => None,
        _ => {
            let mut search = 0;
            loop {
                let offset = text[search..].find(':')?;
                let colon = search + offset;
                if text[..colon].contains(" #") {
                    return None;
                }
                let after = &text[colon + 1..];
                if after.is_empty() || after.starts_with([' ', '\t']) {
                    let key = text[..colon].trim_end();
                    return (!key.is_empty()).then(|| (key.to_string(), after));
                }
                search = colon + 1;
            }
        }
    }
}

fn strip_comment(text: &str) -> &str {
    match text.find(" #") {
        Some(pos) => &text[..pos],
        None if text.starts_with('#') => "",
        None => text,
    }
}

/// Net count of opened flow brackets on a line, ignoring quoted text.
fn bracket_balance(text: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    for c in strip_comment(text).chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '{') => depth += 1,
            (None, ']' | '}') => depth -= 1,
            _ => {}
        }
    }
    depth
}

fn has_content(text: &str) -> bool {
    text.lines().any(|line| {
        let trimmed = line.trim();
        !(trimmed.is_empty()
            || trimmed.starts_with('#')
            || trimmed.starts_with('%')
            || trimmed == "---"
            || trimmed == "...")
    })
}

fn build_node(value: YamlValue, path: &mut Vec<PathSegment>, comments: &CommentIndex) -> Node {
    match value {
        YamlValue::Mapping(mapping) => {
            let mut entries = Vec::with_capacity(mapping.len());
            for (key, value) in mapping {
                let key = scalar_text(&key);
                path.push(PathSegment::Key(key.clone()));
                let head_comment = comments.get(path).unwrap_or_default().to_string();
                let value = build_node(value, path, comments);
                path.pop();
                entries.push(MappingEntry {
                    key,
                    head_comment,
                    value,
                });
            }
            Node::Mapping(entries)
        }
        YamlValue::Sequence(elements) => {
            let mut nodes = Vec::with_capacity(elements.len());
            for (position, element) in elements.into_iter().enumerate() {
                path.push(PathSegment::Index(position));
                nodes.push(build_node(element, path, comments));
                path.pop();
            }
            Node::Sequence(nodes)
        }
        YamlValue::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            match tagged.value {
                inner @ (YamlValue::Mapping(_) | YamlValue::Sequence(_)) => {
                    build_node(inner, path, comments)
                }
                inner => {
                    let name = tag
                        .trim_start_matches("tag:yaml.org,2002:")
                        .trim_start_matches('!');
                    let tag = match name {
                        "binary" => ScalarTag::Binary,
                        "str" => ScalarTag::Str,
                        "int" => ScalarTag::Int,
                        "float" => ScalarTag::Float,
                        "bool" => ScalarTag::Bool,
                        "null" => ScalarTag::Null,
                        "timestamp" => ScalarTag::Timestamp,
                        _ => ScalarTag::Other(tag),
                    };
                    Node::Scalar {
                        tag,
                        value: scalar_text(&inner),
                    }
                }
            }
        }
        YamlValue::Null => Node::Scalar {
            tag: ScalarTag::Null,
            value: String::new(),
        },
        YamlValue::Bool(flag) => Node::Scalar {
            tag: ScalarTag::Bool,
            value: flag.to_string(),
        },
        YamlValue::Number(number) => match number.as_f64() {
            Some(float) if number.is_f64() => Node::Scalar {
                tag: ScalarTag::Float,
                value: float_text(float),
            },
            _ => Node::Scalar {
                tag: ScalarTag::Int,
                value: number.to_string(),
            },
        },
        YamlValue::String(text) => {
            let tag = if !comments.is_quoted(path) && TIMESTAMP.is_match(&text) {
                ScalarTag::Timestamp
            } else {
                ScalarTag::Str
            };
            Node::Scalar { tag, value: text }
        }
    }
}

/// Text form of a scalar key or value.
fn scalar_text(value: &YamlValue) -> String {
    match value {
        YamlValue::Null => String::new(),
        YamlValue::Bool(flag) => flag.to_string(),
        YamlValue::Number(number) => match number.as_f64() {
            Some(float) if number.is_f64() => float_text(float),
            _ => number.to_string(),
        },
        YamlValue::String(text) => text.clone(),
        YamlValue::Tagged(tagged) => scalar_text(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Float text that reads back as a float (`1.0`, not `1`).
fn float_text(float: f64) -> String {
    if float.is_nan() {
        ".nan".to_string()
    } else if float.is_infinite() {
        if float > 0.0 { ".inf" } else { "-.inf" }.to_string()
    } else if float.fract() == 0.0 && float.abs() < 1e15 {
        format!("{float:.1}")
    } else {
        float.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> PathSegment {
        PathSegment::Key(name.to_string())
    }

    fn entries(node: &Node) -> &[MappingEntry] {
        match node {
            Node::Mapping(entries) => entries,
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_documents() {
        assert_eq!(Document::parse("").unwrap().root, None);
        assert_eq!(Document::parse("# only a comment\n").unwrap().root, None);
        assert_eq!(Document::parse("---\n").unwrap().root, None);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(matches!(
            Document::parse("a: [1, 2\nb: c"),
            Err(GenerateError::Yaml(_))
        ));
        assert!(matches!(
            Document::from_slice(&[0xff, 0xfe]),
            Err(GenerateError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_head_comments_on_nested_keys() {
        let text = "\
# @title Image
image:
  # @title Repository
  repository: nginx
  tag: latest # trailing remark

  # detached

  # @title Pull policy
  pullPolicy: IfNotPresent
";
        let index = CommentIndex::scan(text);
        assert_eq!(index.get(&[key("image")]), Some("# @title Image"));
        assert_eq!(
            index.get(&[key("image"), key("repository")]),
            Some("# @title Repository")
        );
        assert_eq!(index.get(&[key("image"), key("tag")]), None);
        assert_eq!(
            index.get(&[key("image"), key("pullPolicy")]),
            Some("# @title Pull policy")
        );
    }

    #[test]
    fn test_multi_line_comment_block() {
        let text = "# Number of replicas.\n# @title Replicas\nreplicas: 1\n";
        let index = CommentIndex::scan(text);
        assert_eq!(
            index.get(&[key("replicas")]),
            Some("# Number of replicas.\n# @title Replicas")
        );
    }

    #[test]
    fn test_comments_inside_sequences() {
        let text = "\
ports:
  - # @title Name
    name: http
    # @title Port
    port: 80
  - name: https
    # @title Port
    port: 443
hosts:
- # @title Host
  host: a.example
";
        let index = CommentIndex::scan(text);
        assert_eq!(
            index.get(&[key("ports"), PathSegment::Index(0), key("name")]),
            Some("# @title Name")
        );
        assert_eq!(
            index.get(&[key("ports"), PathSegment::Index(1), key("port")]),
            Some("# @title Port")
        );
        assert_eq!(
            index.get(&[key("hosts"), PathSegment::Index(0), key("host")]),
            Some("# @title Host")
        );
    }

    #[test]
    fn test_block_scalars_and_flow_collections_are_skipped() {
        let text = "\
script: |
  # not a comment
  key: not a key
list: [
  a, b,
]
# @title After
after: 1
";
        let index = CommentIndex::scan(text);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&[key("after")]), Some("# @title After"));
    }

    #[test]
    fn test_quoted_keys() {
        let text = "# @title Dotted\n\"a.b\": 1\n# @title Single\n'it''s': 2\n";
        let index = CommentIndex::scan(text);
        assert_eq!(index.get(&[key("a.b")]), Some("# @title Dotted"));
        assert_eq!(index.get(&[key("it's")]), Some("# @title Single"));
    }

    #[test]
    fn test_scalar_tags() {
        let text = "\
s: text
q: \"123\"
i: 42
f: 1.0
b: true
n: ~
t: 2024-01-02T03:04:05Z
d: 2024-01-02
bin: !!binary aGVsbG8=
custom: !thing value
";
        let document = Document::parse(text).unwrap();
        let root = document.root.unwrap();
        let tags: Vec<(&str, &ScalarTag, &str)> = entries(&root)
            .iter()
            .map(|entry| match &entry.value {
                Node::Scalar { tag, value } => (entry.key.as_str(), tag, value.as_str()),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(tags[0], ("s", &ScalarTag::Str, "text"));
        assert_eq!(tags[1], ("q", &ScalarTag::Str, "123"));
        assert_eq!(tags[2], ("i", &ScalarTag::Int, "42"));
        assert_eq!(tags[3], ("f", &ScalarTag::Float, "1.0"));
        assert_eq!(tags[4], ("b", &ScalarTag::Bool, "true"));
        assert_eq!(tags[5], ("n", &ScalarTag::Null, ""));
        assert_eq!(tags[6].1, &ScalarTag::Timestamp);
        assert_eq!(tags[7].1, &ScalarTag::Timestamp);
        assert_eq!(tags[8].1, &ScalarTag::Binary);
        assert!(matches!(tags[9].1, ScalarTag::Other(_)));
    }

    #[test]
    fn test_quoted_dates_stay_strings() {
        let text = "\
released: \"2024-01-02\"
plain: 2024-01-02
single: '2024-01-02T03:04:05Z' # remark
dates:
  - \"2024-01-02\"
  - 2024-01-03
";
        let index = CommentIndex::scan(text);
        assert!(index.is_quoted(&[key("released")]));
        assert!(!index.is_quoted(&[key("plain")]));
        assert!(index.is_quoted(&[key("dates"), PathSegment::Index(0)]));
        assert!(!index.is_quoted(&[key("dates"), PathSegment::Index(1)]));

        let root = Document::parse(text).unwrap().root.unwrap();
        let root = entries(&root);
        let tag_of = |node: &Node| match node {
            Node::Scalar { tag, .. } => tag.clone(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(tag_of(&root[0].value), ScalarTag::Str);
        assert_eq!(tag_of(&root[1].value), ScalarTag::Timestamp);
        assert_eq!(tag_of(&root[2].value), ScalarTag::Str);
        match &root[3].value {
            Node::Sequence(items) => {
                assert_eq!(tag_of(&items[0]), ScalarTag::Str);
                assert_eq!(tag_of(&items[1]), ScalarTag::Timestamp);
            }
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn test_tree_carries_head_comments() {
        let text = "# @title Service\nservice:\n  # @title Port\n  port: 80\n";
        let root = Document::parse(text).unwrap().root.unwrap();
        let service = &entries(&root)[0];
        assert_eq!(service.head_comment, "# @title Service");
        let port = &entries(&service.value)[0];
        assert_eq!(port.key, "port");
        assert_eq!(port.head_comment, "# @title Port");
    }

    #[test]
    fn test_float_text() {
        assert_eq!(float_text(1.0), "1.0");
        assert_eq!(float_text(0.5), "0.5");
        assert_eq!(float_text(f64::INFINITY), ".inf");
    }
}

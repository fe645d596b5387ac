//! Error types for schema generation.
//!
//! Only [`GenerateError`] is fatal, and only for the one document it was
//! raised for. Annotation problems surface as [`AnnotationError`] values that
//! are logged or collected next to a still-usable result.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The source document could not be read at all.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Document bytes are not UTF-8 text.
    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// YAML syntax or structure failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A single annotation that could not be applied to a schema node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    /// `@keyword.` with nothing after the dot.
    #[error("section '{0}' names an empty locale")]
    EmptyLocale(String),

    /// Locale suffix that is not a plain language tag such as `zh` or
    /// `en-US`. Locale names become file names, so anything else is refused.
    #[error("section '{0}' names an invalid locale")]
    InvalidLocale(String),

    /// `@hidden operator=...` with an operator other than or/and/nor/not.
    #[error("unknown hidden operator '{0}'")]
    UnknownHiddenOperator(String),

    /// Options-only section under a fixed schema keyword, which would shadow
    /// the typed field in the extra-properties channel.
    #[error("'{0}' is a schema keyword and cannot take an options object")]
    ReservedKeyword(String),

    /// A built annotation value could not be encoded as JSON.
    #[error("cannot encode '{keyword}': {message}")]
    Encode { keyword: String, message: String },
}

/// An [`AnnotationError`] together with the node it happened at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {error}")]
pub struct NodeFailure {
    /// Dotted node path, `$` for the root, `[i]` for item positions.
    pub path: String,
    pub error: AnnotationError,
}

/// Every locale application failure of one [`complete_i18n`](crate::complete_i18n) run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct I18nError {
    pub failures: Vec<NodeFailure>,
}

impl fmt::Display for I18nError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} annotation(s) could not be applied", self.failures.len())?;
        for (index, failure) in self.failures.iter().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(f, "{separator}{failure}")?;
        }
        Ok(())
    }
}

/// Failure of one chart in the batch driver.
#[derive(Debug, Error)]
pub enum ChartError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file parsing failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The values document could not be parsed.
    #[error("{path}: {source}")]
    Generate {
        path: PathBuf,
        #[source]
        source: GenerateError,
    },

    /// Invalid or missing input (bad glob, no chart found).
    #[error("{0}")]
    InvalidInput(String),
}

/// Convenience alias for results with [`ChartError`].
pub type Result<T> = std::result::Result<T, ChartError>;

//! Generation settings for chart batch runs.
//!
//! # Example YAML
//!
//! ```yaml
//! include_all: false
//! i18n_directory: i18n
//! locales:
//!   - zh
//!   - en
//! jobs: 4
//! values_file: values.yaml
//! schema_file: values.schema.json
//! ```

use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default name of the values document inside a chart.
pub const DEFAULT_VALUES_FILE: &str = "values.yaml";

/// Default name of the canonical schema written next to it.
pub const DEFAULT_SCHEMA_FILE: &str = "values.schema.json";

/// Settings for [`generate_charts`](crate::generate_charts).
///
/// Every field is optional in YAML; missing fields take their defaults.
///
/// # Examples
///
/// ```
/// use values_schema_generate::GenerateConfig;
///
/// let config: GenerateConfig = serde_yaml::from_str("locales: [zh]").unwrap();
/// assert!(!config.include_all);
/// assert_eq!(config.values_file, "values.yaml");
/// assert_eq!(config.locale_file_name("zh"), "values.schema.zh.json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Keep untitled nodes instead of purging them.
    pub include_all: bool,
    /// Chart-relative directory for locale schemas. `None` writes them next
    /// to the canonical schema.
    pub i18n_directory: Option<PathBuf>,
    /// Locales to write. Empty writes every locale found.
    pub locales: Vec<String>,
    /// Parallel chart jobs. `None` picks a default from the CPU count.
    pub jobs: Option<usize>,
    pub values_file: String,
    pub schema_file: String,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            include_all: false,
            i18n_directory: None,
            locales: Vec::new(),
            jobs: None,
            values_file: DEFAULT_VALUES_FILE.to_string(),
            schema_file: DEFAULT_SCHEMA_FILE.to_string(),
        }
    }
}

impl GenerateConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ChartError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::ChartError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// File name of the schema for `locale`: `values.schema.json` becomes
    /// `values.schema.<locale>.json`.
    pub fn locale_file_name(&self, locale: &str) -> String {
        match self.schema_file.strip_suffix(".json") {
            Some(stem) => format!("{stem}.{locale}.json"),
            None => format!("{}.{locale}", self.schema_file),
        }
    }
}

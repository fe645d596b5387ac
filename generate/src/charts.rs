//! Chart batch driver: values documents in, schema files out.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use values_schema_core::Schema;

use crate::config::GenerateConfig;
use crate::error::{ChartError, GenerateError, NodeFailure, Result};
use crate::handlers::HandlerRegistry;
use crate::i18n::is_locale_name;
use crate::{complete_i18n_with, generate_schema_with};

/// Schemas derived from one values document, ready to be written.
#[derive(Debug, Clone, Default)]
pub struct RenderedSchemas {
    /// Locale-less schema; `None` for an empty document.
    pub canonical: Option<Schema>,
    pub locales: BTreeMap<String, Schema>,
    /// Annotations that could not be applied.
    pub failures: Vec<NodeFailure>,
}

/// Result of one chart.
#[derive(Debug, Clone, Default)]
pub struct ChartOutcome {
    pub chart: PathBuf,
    pub written: Vec<PathBuf>,
    /// Outputs skipped because the schema had neither properties nor items.
    pub skipped_empty: Vec<PathBuf>,
    pub failures: Vec<NodeFailure>,
}

/// Result of a batch run. Charts are sorted by path.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub charts: Vec<ChartOutcome>,
    pub failures: Vec<(PathBuf, ChartError)>,
}

impl BatchOutcome {
    pub fn written_count(&self) -> usize {
        self.charts.iter().map(|chart| chart.written.len()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Generates, localizes and (unless `include_all`) purges one document.
///
/// # Errors
///
/// Fails only when the document cannot be parsed.
pub fn render_values(
    values: &[u8],
    config: &GenerateConfig,
    registry: &HandlerRegistry,
) -> std::result::Result<RenderedSchemas, GenerateError> {
    let Some(schema) = generate_schema_with(values, registry)? else {
        return Ok(RenderedSchemas::default());
    };

    let result = complete_i18n_with(&schema, registry);
    let mut i18n = result.schema;
    i18n.retain_locales(&config.locales);
    if !config.include_all {
        i18n.purge();
    }
    Ok(RenderedSchemas {
        canonical: Some(i18n.original),
        locales: i18n.locales,
        failures: result.failures,
    })
}

/// Expands glob patterns to chart directories.
///
/// A match naming the values file stands for its directory; a directory
/// counts only when it holds the values file.
///
/// # Errors
///
/// Returns [`ChartError::InvalidInput`] for a malformed pattern or when no
/// chart matches at all.
pub fn collect_chart_dirs(patterns: &[String], values_file: &str) -> Result<Vec<PathBuf>> {
    if patterns.is_empty() {
        return Err(ChartError::InvalidInput(
            "No chart paths were provided".to_string(),
        ));
    }

    let mut charts = BTreeSet::new();
    for pattern in patterns {
        let matches = glob::glob(pattern).map_err(|err| {
            ChartError::InvalidInput(format!("Invalid pattern '{pattern}': {err}"))
        })?;
        for entry in matches {
            let path = match entry {
                Ok(path) => path,
                Err(err) => {
                    warn!(%err, "skipping unreadable path");
                    continue;
                }
            };
            let is_values_file = path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name == values_file);
            if is_values_file {
                let dir = path
                    .parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .unwrap_or(Path::new("."));
                charts.insert(dir.to_path_buf());
            } else if path.is_dir() && path.join(values_file).is_file() {
                charts.insert(path);
            } else {
                debug!(path = %path.display(), "not a chart");
            }
        }
    }

    if charts.is_empty() {
        return Err(ChartError::InvalidInput(format!(
            "No chart with a {values_file} matches {}",
            patterns.join(", ")
        )));
    }
    Ok(charts.into_iter().collect())
}

/// Generates and writes the schemas of one chart directory.
pub fn generate_chart(
    chart: &Path,
    config: &GenerateConfig,
    registry: &HandlerRegistry,
) -> Result<ChartOutcome> {
    let values_path = chart.join(&config.values_file);
    let values = fs::read(&values_path)?;
    let rendered = render_values(&values, config, registry).map_err(|source| {
        ChartError::Generate {
            path: values_path.clone(),
            source,
        }
    })?;

    let mut outcome = ChartOutcome {
        chart: chart.to_path_buf(),
        failures: rendered.failures,
        ..ChartOutcome::default()
    };
    for failure in &outcome.failures {
        warn!(chart = %chart.display(), %failure, "annotation not applied");
    }

    let Some(canonical) = rendered.canonical else {
        info!(chart = %chart.display(), "values document is empty");
        return Ok(outcome);
    };
    write_unless_empty(&canonical, &chart.join(&config.schema_file), &mut outcome)?;

    let locale_dir = match &config.i18n_directory {
        Some(dir) => chart.join(dir),
        None => chart.to_path_buf(),
    };
    for (locale, schema) in &rendered.locales {
        if !is_locale_name(locale) {
            warn!(chart = %chart.display(), locale, "refusing to write schema for invalid locale");
            continue;
        }
        let path = locale_dir.join(config.locale_file_name(locale));
        write_unless_empty(schema, &path, &mut outcome)?;
    }

    info!(
        chart = %chart.display(),
        written = outcome.written.len(),
        "generated schemas"
    );
    Ok(outcome)
}

/// Runs [`generate_chart`] for every chart matching `patterns`.
///
/// Charts run on a dedicated rayon pool. A failing chart is recorded in
/// [`BatchOutcome::failures`] and never stops the others.
///
/// # Errors
///
/// Fails only when the patterns match no chart or the pool cannot start.
pub fn generate_charts(patterns: &[String], config: &GenerateConfig) -> Result<BatchOutcome> {
    use rayon::prelude::*;

    let charts = collect_chart_dirs(patterns, &config.values_file)?;
    let registry = HandlerRegistry::standard();
    let jobs = config
        .jobs
        .filter(|jobs| *jobs > 0)
        .unwrap_or_else(|| default_parallel_jobs(charts.len()));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|err| ChartError::InvalidInput(format!("cannot start worker pool: {err}")))?;

    let results: Vec<(PathBuf, Result<ChartOutcome>)> = pool.install(|| {
        charts
            .par_iter()
            .map(|chart| (chart.clone(), generate_chart(chart, config, &registry)))
            .collect()
    });

    let mut outcome = BatchOutcome::default();
    for (chart, result) in results {
        match result {
            Ok(chart_outcome) => outcome.charts.push(chart_outcome),
            Err(err) => {
                warn!(chart = %chart.display(), %err, "chart failed");
                outcome.failures.push((chart, err));
            }
        }
    }
    Ok(outcome)
}

fn default_parallel_jobs(chart_count: usize) -> usize {
    let cpu_count = std::thread::available_parallelism()
        .map(|parallelism| parallelism.get())
        .unwrap_or(4);
    cpu_count.min(chart_count.max(1))
}

fn write_unless_empty(schema: &Schema, path: &Path, outcome: &mut ChartOutcome) -> Result<()> {
    if schema.is_empty() {
        debug!(path = %path.display(), "skipping empty schema");
        outcome.skipped_empty.push(path.to_path_buf());
        return Ok(());
    }
    write_schema(schema, path)?;
    outcome.written.push(path.to_path_buf());
    Ok(())
}

/// Writes `schema` as pretty-printed JSON with a trailing newline, creating
/// parent directories as needed.
pub fn write_schema(schema: &Schema, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(schema)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

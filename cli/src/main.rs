use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use values_schema_core::Schema;
use values_schema_generate::{
    GenerateConfig, HandlerRegistry, generate_charts, parse_comment, render_values,
};

#[derive(Debug, Parser)]
#[command(name = "values-schema")]
#[command(about = "Generate JSON-Schema files from annotated Helm values documents")]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate values.schema.json files for chart directories.
    Generate(GenerateArgs),
    /// Print the parsed annotation sections of a comment as JSON.
    ParseComment(ParseCommentArgs),
    /// Print the schema of a single values document.
    Print(PrintArgs),
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Chart directories, values files, or glob patterns matching either.
    #[arg(required = true)]
    patterns: Vec<String>,
    /// Keep untitled values instead of purging them.
    #[arg(long)]
    include_all: bool,
    /// Chart-relative directory for locale schemas.
    #[arg(long)]
    i18n_dir: Option<PathBuf>,
    /// Only write these locales (repeatable).
    #[arg(long = "locale")]
    locales: Vec<String>,
    /// Path to a generation config YAML file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of parallel chart jobs (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(Debug, Args)]
struct ParseCommentArgs {
    /// File containing the comment text (default: stdin).
    #[arg(long)]
    input: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct PrintArgs {
    /// Values document to read (default: stdin).
    #[arg(long)]
    input: Option<PathBuf>,
    /// Print this locale's schema instead of the canonical one.
    #[arg(long)]
    locale: Option<String>,
    /// Keep untitled values instead of purging them.
    #[arg(long)]
    include_all: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::ParseComment(args) => run_parse_comment(args),
        Command::Print(args) => run_print(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins when set and no `-v` is given.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_generate(args: GenerateArgs) -> Result<(), String> {
    let config = resolve_config(&args)?;
    debug!(?config, "resolved generation config");
    let outcome = generate_charts(&args.patterns, &config).map_err(|e| e.to_string())?;

    for chart in &outcome.charts {
        for path in &chart.written {
            println!("{}", path.display());
        }
    }
    info!(
        charts = outcome.charts.len(),
        failed = outcome.failures.len(),
        written = outcome.written_count(),
        "generation finished"
    );
    println!(
        "Generated {} schema file(s) for {} chart(s).",
        outcome.written_count(),
        outcome.charts.len()
    );

    let annotation_failures: usize = outcome.charts.iter().map(|c| c.failures.len()).sum();
    if annotation_failures > 0 {
        eprintln!("{annotation_failures} annotation(s) could not be applied.");
    }

    if !outcome.is_success() {
        for (chart, err) in &outcome.failures {
            eprintln!("{}: {err}", chart.display());
        }
        return Err(format!("{} chart(s) failed", outcome.failures.len()));
    }
    Ok(())
}

/// Loads the config file, if any, then applies command-line overrides.
fn resolve_config(args: &GenerateArgs) -> Result<GenerateConfig, String> {
    let mut config = match &args.config {
        Some(path) => GenerateConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => GenerateConfig::default(),
    };
    if args.include_all {
        config.include_all = true;
    }
    if let Some(dir) = &args.i18n_dir {
        config.i18n_directory = Some(dir.clone());
    }
    if !args.locales.is_empty() {
        config.locales = args.locales.clone();
    }
    if args.jobs.is_some() {
        config.jobs = args.jobs;
    }
    Ok(config)
}

fn run_parse_comment(args: ParseCommentArgs) -> Result<(), String> {
    let raw = read_input(args.input.as_ref())?;
    let text = String::from_utf8(raw).map_err(|err| format!("Input is not UTF-8: {err}"))?;
    let sections = parse_comment(&text);
    let json = serde_json::to_string_pretty(&sections)
        .map_err(|err| format!("Failed to serialize sections: {err}"))?;
    println!("{json}");
    Ok(())
}

fn run_print(args: PrintArgs) -> Result<(), String> {
    let raw = read_input(args.input.as_ref())?;
    let config = GenerateConfig {
        include_all: args.include_all,
        locales: args.locale.iter().cloned().collect(),
        ..GenerateConfig::default()
    };
    let rendered = render_values(&raw, &config, &HandlerRegistry::standard())
        .map_err(|err| format!("Failed to generate schema: {err}"))?;

    let Some(canonical) = rendered.canonical else {
        return Err("Values document is empty".to_string());
    };
    let schema = match &args.locale {
        Some(locale) => rendered
            .locales
            .get(locale)
            .ok_or_else(|| format!("Locale '{locale}' is not used in the document"))?,
        None => &canonical,
    };
    print_schema(schema)
}

fn print_schema(schema: &Schema) -> Result<(), String> {
    let json = serde_json::to_string_pretty(schema)
        .map_err(|err| format!("Failed to serialize schema: {err}"))?;
    println!("{json}");
    Ok(())
}

fn read_input(input: Option<&PathBuf>) -> Result<Vec<u8>, String> {
    match input {
        Some(path) => {
            fs::read(path).map_err(|err| format!("Failed to read '{}': {err}", path.display()))
        }
        None => {
            let mut raw = Vec::new();
            std::io::stdin()
                .read_to_end(&mut raw)
                .map_err(|err| format!("Failed to read stdin: {err}"))?;
            Ok(raw)
        }
    }
}

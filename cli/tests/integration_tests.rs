use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::Value;

const BIN: &str = env!("CARGO_BIN_EXE_values-schema");

const VALUES: &str = "\
# @title Replicas
# @title.zh 副本数
# @schema minimum=1
replicaCount: 1
# @title Image
image:
  # @title Repository
  repository: nginx
  pullPolicy: IfNotPresent
podLabels: {}
";

fn write_chart(root: &Path, name: &str, values: &str) -> std::path::PathBuf {
    let chart = root.join(name);
    fs::create_dir_all(&chart).expect("failed to create chart dir");
    fs::write(chart.join("values.yaml"), values).expect("failed to write values");
    chart
}

fn read_json(path: &Path) -> Value {
    let raw = fs::read_to_string(path).expect("failed to read schema");
    serde_json::from_str(&raw).expect("schema is not JSON")
}

fn run_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(BIN)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run values-schema");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("failed to write stdin");
    child.wait_with_output().expect("failed to wait for values-schema")
}

#[test]
fn generate_writes_canonical_and_locale_schemas() {
    let dir = tempfile::tempdir().unwrap();
    let chart = write_chart(dir.path(), "web", VALUES);

    let output = Command::new(BIN)
        .args(["generate", chart.to_str().unwrap()])
        .output()
        .expect("failed to run values-schema");
    assert!(output.status.success(), "generate should succeed");

    let canonical = read_json(&chart.join("values.schema.json"));
    assert_eq!(canonical["$schema"], "http://json-schema.org/schema#");
    let keys: Vec<&String> = canonical["properties"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["replicaCount", "image"]);
    assert_eq!(canonical["properties"]["replicaCount"]["title"], "Replicas");
    assert_eq!(
        canonical["properties"]["image"]["properties"]
            .as_object()
            .unwrap()
            .len(),
        1
    );

    let zh = read_json(&chart.join("values.schema.zh.json"));
    assert_eq!(zh["properties"]["replicaCount"]["title"], "副本数");
    assert_eq!(zh["properties"]["image"]["title"], "Image");

    let raw = fs::read_to_string(chart.join("values.schema.json")).unwrap();
    assert!(raw.starts_with("{\n  \""));
    assert!(raw.ends_with("}\n"));
}

#[test]
fn generate_honors_include_all_and_i18n_dir() {
    let dir = tempfile::tempdir().unwrap();
    let chart = write_chart(dir.path(), "web", VALUES);

    let status = Command::new(BIN)
        .args([
            "generate",
            chart.join("values.yaml").to_str().unwrap(),
            "--include-all",
            "--i18n-dir",
            "i18n",
        ])
        .status()
        .expect("failed to run values-schema");
    assert!(status.success());

    let canonical = read_json(&chart.join("values.schema.json"));
    assert!(canonical["properties"]["podLabels"].is_object());
    assert!(chart.join("i18n").join("values.schema.zh.json").exists());
    assert!(!chart.join("values.schema.zh.json").exists());
}

#[test]
fn generate_expands_globs_and_reads_config() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_chart(dir.path(), "first", VALUES);
    let second = write_chart(dir.path(), "second", VALUES);
    fs::create_dir_all(dir.path().join("not-a-chart")).unwrap();

    let config = dir.path().join("values-schema.yaml");
    fs::write(&config, "locales: [en]\njobs: 2\n").unwrap();

    let pattern = format!("{}/*", dir.path().display());
    let output = Command::new(BIN)
        .args(["generate", &pattern, "--config", config.to_str().unwrap()])
        .output()
        .expect("failed to run values-schema");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("for 2 chart(s)"));
    for chart in [&first, &second] {
        assert!(chart.join("values.schema.json").exists());
        assert!(!chart.join("values.schema.zh.json").exists());
    }
}

#[test]
fn generate_reports_broken_chart_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_chart(dir.path(), "good", VALUES);
    write_chart(dir.path(), "broken", "key: [1, 2\n");

    let pattern = format!("{}/*", dir.path().display());
    let output = Command::new(BIN)
        .args(["generate", &pattern])
        .output()
        .expect("failed to run values-schema");

    assert!(!output.status.success(), "a broken chart should fail the run");
    assert!(good.join("values.schema.json").exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: 1 chart(s) failed"));
}

#[test]
fn generate_verbose_logs_to_stderr_only() {
    let dir = tempfile::tempdir().unwrap();
    let chart = write_chart(dir.path(), "web", VALUES);

    let output = Command::new(BIN)
        .args(["-vv", "generate", chart.to_str().unwrap()])
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run values-schema");
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("resolved generation config"));
    assert!(stderr.contains("generation finished"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("generation finished"));
}

#[test]
fn generate_without_matches_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(BIN)
        .args(["generate", dir.path().join("missing").to_str().unwrap()])
        .output()
        .expect("failed to run values-schema");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: "));
}

#[test]
fn parse_comment_prints_sections() {
    let output = run_with_stdin(
        &["parse-comment"],
        "# @schema type=string;minLength=3 @title \"Name\"\n",
    );
    assert!(output.status.success());

    let sections: Value = serde_json::from_slice(&output.stdout).unwrap();
    let sections = sections.as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["name"], "@schema");
    assert_eq!(sections[0]["options"][1]["name"], "minLength");
    assert_eq!(sections[0]["options"][1]["value"], "3");
    assert_eq!(sections[1]["name"], "@title");
    assert_eq!(sections[1]["value"], "Name");
}

#[test]
fn print_renders_canonical_and_locale() {
    let dir = tempfile::tempdir().unwrap();
    let chart = write_chart(dir.path(), "web", VALUES);
    let input = chart.join("values.yaml");

    let output = Command::new(BIN)
        .args(["print", "--input", input.to_str().unwrap()])
        .output()
        .expect("failed to run values-schema");
    assert!(output.status.success());
    let schema: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["properties"]["replicaCount"]["minimum"], 1.0);
    assert!(schema["properties"].get("podLabels").is_none());

    let output = run_with_stdin(&["print", "--locale", "zh"], VALUES);
    assert!(output.status.success());
    let schema: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["properties"]["replicaCount"]["title"], "副本数");
}

#[test]
fn print_unknown_locale_fails() {
    let output = run_with_stdin(&["print", "--locale", "fr"], VALUES);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Locale 'fr'"));
}

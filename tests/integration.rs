use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn droma_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("droma");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/droma.sqlite"

[harmonize]
max_distance = 0.2
min_name_length = 5

[logging]
filter = "warn"
"#,
        root.display()
    );

    let config_path = config_dir.join("droma.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_droma(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_droma_with_stdin(config_path, args, None)
}

fn run_droma_with_stdin(
    config_path: &Path,
    args: &[&str],
    stdin: Option<&str>,
) -> (String, String, bool) {
    let binary = droma_binary();
    let mut child = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("Failed to run droma binary at {:?}: {}", binary, e));

    {
        let mut pipe = child.stdin.take().unwrap();
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).unwrap();
        }
    }

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn write_names(config_path: &Path, file: &str, names: &[&str]) -> PathBuf {
    let path = config_path.parent().unwrap().parent().unwrap().join(file);
    fs::write(&path, names.join("\n")).unwrap();
    path
}

/// Seed `sample_anno` by applying an initial batch to the empty table:
/// with no reference rows every name is added verbatim.
fn seed_samples(config_path: &Path, samples: &[&str]) {
    let (_, stderr, success) = run_droma(config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    let seed = write_names(config_path, "seed.txt", samples);
    let (stdout, stderr, success) = run_droma(
        config_path,
        &[
            "harmonize",
            "samples",
            seed.to_str().unwrap(),
            "--apply",
            "--project",
            "gCSI",
            "--data-type",
            "CellLine",
            "--format",
            "csv",
        ],
    );
    assert!(success, "seed failed: stdout={}, stderr={}", stdout, stderr);
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_droma(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_droma(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_droma(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_harmonize_before_init_fails() {
    let (_tmp, config_path) = setup_test_env();
    let input = write_names(&config_path, "names.txt", &["MCF-7"]);

    let (_, stderr, success) =
        run_droma(&config_path, &["harmonize", "samples", input.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("Database file not found"), "stderr={}", stderr);
}

#[test]
fn test_harmonize_samples_csv() {
    let (_tmp, config_path) = setup_test_env();
    seed_samples(&config_path, &["MCF7", "HELA", "NCIH460"]);

    let input = write_names(&config_path, "names.txt", &["mcf-7", "", "NCI-H46", "Jurkat"]);
    let (stdout, stderr, success) = run_droma(
        &config_path,
        &["harmonize", "samples", input.to_str().unwrap(), "--format", "csv"],
    );
    assert!(success, "harmonize failed: stderr={}", stderr);

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines[0],
        "original_name,cleaned_name,harmonized_name,match_type,match_confidence,new_name"
    );
    assert_eq!(lines.len(), 4, "blank input lines are skipped: {}", stdout);
    assert_eq!(lines[1], "mcf-7,mcf7,MCF7,exact_sampleid,high,MCF7");
    assert_eq!(lines[2], "NCI-H46,ncih46,NCIH460,fuzzy_sampleid,medium,NCIH460");
    assert_eq!(lines[3], "Jurkat,jurkat,jurkat,no_match,none,Jurkat");
}

#[test]
fn test_harmonize_stdin_json() {
    let (_tmp, config_path) = setup_test_env();
    seed_samples(&config_path, &["MCF7"]);

    let (stdout, stderr, success) = run_droma_with_stdin(
        &config_path,
        &["harmonize", "samples", "-", "--format", "json"],
        Some("MCF 7\nMCF7 treated with tamoxifen for 24h\n"),
    );
    assert!(success, "harmonize failed: stderr={}", stderr);

    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let rows = v.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["harmonized_name"], "MCF7");
    assert_eq!(rows[1]["match_type"], "keep_original_long");
    assert_eq!(rows[1]["match_confidence"], "medium");
}

#[test]
fn test_harmonize_table_has_summary() {
    let (_tmp, config_path) = setup_test_env();
    seed_samples(&config_path, &["MCF7"]);

    let input = write_names(&config_path, "names.txt", &["MCF-7", "unknown"]);
    let (stdout, _, success) =
        run_droma(&config_path, &["harmonize", "samples", input.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("Match types:"));
    assert!(stdout.contains("exact_sampleid"));
    assert!(stdout.contains("no_match"));
}

#[test]
fn test_harmonize_rejects_invalid_max_distance() {
    let (_tmp, config_path) = setup_test_env();
    seed_samples(&config_path, &["MCF7"]);

    let input = write_names(&config_path, "names.txt", &["MCF-7"]);
    let (_, stderr, success) = run_droma(
        &config_path,
        &[
            "harmonize",
            "samples",
            input.to_str().unwrap(),
            "--max-distance",
            "1.5",
        ],
    );
    assert!(!success);
    assert!(stderr.contains("max_distance"), "stderr={}", stderr);
}

#[test]
fn test_apply_then_annotation_json() {
    let (_tmp, config_path) = setup_test_env();
    seed_samples(&config_path, &["MCF7", "HELA"]);

    let (stdout, stderr, success) = run_droma(
        &config_path,
        &["annotation", "sample", "--project", "gCSI", "--format", "json"],
    );
    assert!(success, "annotation failed: stderr={}", stderr);

    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let rows = v.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    // Rows are ordered by SampleID.
    assert_eq!(rows[0]["SampleID"], "HELA");
    assert_eq!(rows[0]["DataType"], "CellLine");
    assert_eq!(rows[1]["SampleID"], "MCF7");
    assert_eq!(rows[1]["IndexID"], "UM_SAMPLE_1");
}

#[test]
fn test_annotation_id_filter() {
    let (_tmp, config_path) = setup_test_env();
    seed_samples(&config_path, &["MCF7", "HELA"]);

    let (stdout, _, success) = run_droma(
        &config_path,
        &["annotation", "sample", "--id", "HELA", "--format", "json"],
    );
    assert!(success);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(v.as_array().unwrap().len(), 1);
}

#[test]
fn test_tables_empty_database() {
    let (_tmp, config_path) = setup_test_env();
    run_droma(&config_path, &["init"]);

    let (stdout, stderr, success) = run_droma(&config_path, &["tables"]);
    assert!(success, "tables failed: stderr={}", stderr);
    assert!(stdout.contains("No omics or drug tables found"));
}

#[test]
fn test_tables_rejects_bad_pattern() {
    let (_tmp, config_path) = setup_test_env();
    run_droma(&config_path, &["init"]);

    let (_, stderr, success) = run_droma(&config_path, &["tables", "--pattern", "("]);
    assert!(!success);
    assert!(stderr.contains("Invalid --pattern regex"), "stderr={}", stderr);
}

#[test]
fn test_projects_empty_database() {
    let (_tmp, config_path) = setup_test_env();
    run_droma(&config_path, &["init"]);

    let (stdout, _, success) = run_droma(&config_path, &["projects"]);
    assert!(success);
    assert!(stdout.contains("No projects found"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");
    let (_, stderr, success) = run_droma(&missing, &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "stderr={}", stderr);
}

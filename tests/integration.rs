use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn air_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("air");
    path
}

fn write_config(root: &Path, extra: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Relative to the config directory.
    let config_content = format!(
        r#"[sources]
entities = "../data/students.csv"
metrics = "../data/grades.csv"
reference = "../data/courses.json"
documents = "../data/unstructured"

[search]
preview_chars = 40
{}
"#,
        extra
    );

    let config_path = config_dir.join("air.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let data = root.join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(
        data.join("students.csv"),
        "student_id,name,programme,email\n\
         S1,Ada Lovelace,Computing,ada@uni.edu\n\
         S2,Alan Turing,Mathematics,alan@uni.edu\n",
    )
    .unwrap();
    fs::write(
        data.join("grades.csv"),
        "student_id,CS101,MA201\nS1,88,\nS2,72,95\n",
    )
    .unwrap();
    fs::write(
        data.join("courses.json"),
        r#"[
  {"course_id": "CS101", "title": "Intro to Computing", "lecturer": "Dr. Hopper"},
  {"course_id": "MA201", "title": "Linear Algebra", "lecturer": "Dr. Noether"}
]"#,
    )
    .unwrap();

    let s1 = data.join("unstructured").join("S1");
    fs::create_dir_all(&s1).unwrap();
    fs::write(
        s1.join("notes.txt"),
        "Reflections on the analytical engine and its programs.",
    )
    .unwrap();
    fs::write(s1.join("cv.pdf"), b"%PDF-1.4 not really a pdf").unwrap();

    // A folder with no matching student row.
    let s3 = data.join("unstructured").join("S3");
    fs::create_dir_all(&s3).unwrap();
    fs::write(s3.join("essay.md"), "# Essay\n\nOn wartime cryptanalysis.").unwrap();

    let config_path = write_config(&root, "");
    (tmp, config_path)
}

fn run_air(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = air_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run air binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn search_json(config_path: &Path, args: &[&str]) -> Value {
    let mut full = vec!["search"];
    full.extend_from_slice(args);
    full.push("--json");
    let (stdout, stderr, success) = run_air(config_path, &full);
    assert!(success, "search failed: {}", stderr);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad JSON ({}): {}", e, stdout))
}

fn doc_keys(response: &Value) -> Vec<String> {
    response["results"]["documents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| {
            format!(
                "{}/{}",
                d["entity_id"].as_str().unwrap(),
                d["filename"].as_str().unwrap()
            )
        })
        .collect()
}

#[test]
fn test_search_name_returns_entity_and_documents() {
    let (_tmp, config_path) = setup_test_env();
    let resp = search_json(&config_path, &["lovelace"]);

    assert_eq!(resp["counts"]["entities"], 1);
    assert_eq!(resp["counts"]["metrics"], 0);
    assert_eq!(resp["results"]["entities"][0]["student_id"], "S1");
    assert_eq!(resp["results"]["entities"][0]["programme"], "Computing");

    assert_eq!(doc_keys(&resp), vec!["S1/cv.pdf", "S1/notes.txt"]);
    for doc in resp["results"]["documents"].as_array().unwrap() {
        assert_eq!(doc["preview"], "(document available)");
    }
}

#[test]
fn test_search_document_content() {
    let (_tmp, config_path) = setup_test_env();
    let resp = search_json(&config_path, &["ANALYTICAL ENGINE"]);

    assert_eq!(resp["counts"]["entities"], 0);
    assert_eq!(doc_keys(&resp), vec!["S1/notes.txt"]);
    let preview = resp["results"]["documents"][0]["preview"].as_str().unwrap();
    assert_eq!(preview.chars().count(), 40);
    assert!(preview.starts_with("Reflections on the analytical"));
}

#[test]
fn test_search_metrics_joined_with_reference() {
    let (_tmp, config_path) = setup_test_env();
    let resp = search_json(&config_path, &["noether", "--filter", "courses"]);

    assert_eq!(resp["category"], "metrics");
    let metrics = resp["results"]["metrics"].as_array().unwrap();
    assert_eq!(metrics.len(), 2);
    // Wide tables pivot column by column, and empty cells are kept.
    assert_eq!(metrics[0]["entity_id"], "S1");
    assert_eq!(metrics[0]["value"], "");
    assert_eq!(metrics[1]["entity_id"], "S2");
    assert_eq!(metrics[1]["value"], "95");
    assert_eq!(metrics[1]["metadata"]["title"], "Linear Algebra");
}

#[test]
fn test_search_folder_without_entity() {
    let (_tmp, config_path) = setup_test_env();
    let resp = search_json(&config_path, &["s3"]);

    assert_eq!(resp["counts"]["entities"], 0);
    assert_eq!(resp["counts"]["metrics"], 0);
    assert_eq!(doc_keys(&resp), vec!["S3/essay.md"]);
    assert_eq!(
        resp["results"]["documents"][0]["preview"],
        "(document available)"
    );
}

#[test]
fn test_search_filter_aliases() {
    let (_tmp, config_path) = setup_test_env();

    let docs = search_json(&config_path, &["lovelace", "--filter", "docs"]);
    assert_eq!(docs["category"], "documents");
    assert_eq!(docs["counts"]["entities"], 0);
    assert_eq!(docs["counts"]["documents"], 2);

    let students = search_json(&config_path, &["lovelace", "--filter", "Students"]);
    assert_eq!(students["category"], "entities");
    assert_eq!(students["counts"]["entities"], 1);
    assert_eq!(students["counts"]["documents"], 0);
}

#[test]
fn test_search_unknown_filter_errors() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_air(&config_path, &["search", "ada", "--filter", "grades"]);
    assert!(!success);
    assert!(stderr.contains("unknown category"), "{}", stderr);
}

#[test]
fn test_search_empty_query() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_air(&config_path, &["search", "   "]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_human_output() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_air(&config_path, &["search", "S2"]);
    assert!(success);
    assert!(stdout.contains("--- Entities (1) ---"), "{}", stdout);
    assert!(stdout.contains("--- Metrics (2) ---"), "{}", stdout);
    assert!(stdout.contains("S2 / MA201 = 95"), "{}", stdout);
    assert!(stdout.contains("lecturer: Dr. Noether"), "{}", stdout);
}

#[test]
fn test_fetch_document() {
    let (tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_air(&config_path, &["fetch", "S1", "notes.txt"]);
    assert!(success);
    assert!(stdout.trim().ends_with("notes.txt"), "{}", stdout);

    let dest = tmp.path().join("copy.txt");
    let (_, _, success) = run_air(
        &config_path,
        &["fetch", "S1", "notes.txt", "--output", dest.to_str().unwrap()],
    );
    assert!(success);
    assert!(fs::read_to_string(&dest).unwrap().contains("analytical engine"));
}

#[test]
fn test_fetch_missing_document() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_air(&config_path, &["fetch", "S1", "missing.txt"]);
    assert!(!success);
    assert!(stderr.contains("document not found"), "{}", stderr);

    let (_, stderr, success) = run_air(&config_path, &["fetch", "S9", "notes.txt"]);
    assert!(!success);
    assert!(stderr.contains("entity folder not found"), "{}", stderr);
}

#[test]
fn test_fetch_rejects_path_traversal() {
    let (_tmp, config_path) = setup_test_env();
    let (_, _, success) = run_air(&config_path, &["fetch", "S1", "../../students.csv"]);
    assert!(!success);
}

#[test]
fn test_sources() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_air(&config_path, &["sources"]);
    assert!(success);
    assert!(stdout.contains("entities"));
    assert!(stdout.contains("wide layout"), "{}", stdout);
    assert!(!stdout.contains("MISSING"), "{}", stdout);
}

#[test]
fn test_missing_sources_still_answer() {
    let (tmp, config_path) = setup_test_env();
    fs::remove_file(tmp.path().join("data").join("grades.csv")).unwrap();
    fs::write(tmp.path().join("data").join("courses.json"), "{ not json").unwrap();

    let resp = search_json(&config_path, &["lovelace"]);
    assert_eq!(resp["counts"]["entities"], 1);
    assert_eq!(resp["counts"]["metrics"], 0);

    let (stdout, _, _) = run_air(&config_path, &["sources"]);
    assert!(stdout.contains("MISSING"));
    assert!(stdout.contains("INVALID"));
}

#[test]
fn test_long_layout_config() {
    let (tmp, _) = setup_test_env();
    fs::write(
        tmp.path().join("data").join("grades.csv"),
        "student_id,course_id,score\nS1,CS101,88\nS2,MA201,95\n",
    )
    .unwrap();
    let config_path = write_config(tmp.path(), "\n[normalize]\nlayout = \"long\"\n");

    let resp = search_json(&config_path, &["hopper"]);
    let metrics = resp["results"]["metrics"].as_array().unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0]["entity_id"], "S1");
    assert_eq!(metrics[0]["metric_key"], "CS101");
    assert_eq!(metrics[0]["value"], "88");
    assert_eq!(metrics[0]["metadata"]["title"], "Intro to Computing");
}

#[test]
fn test_invalid_config_errors() {
    let (tmp, _) = setup_test_env();
    let config_path = tmp.path().join("config").join("air.toml");
    fs::write(&config_path, "[search]\npreview_chars = 10\n").unwrap();
    let (_, _, success) = run_air(&config_path, &["sources"]);
    assert!(!success);
}

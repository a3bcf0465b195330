//! End-to-end tests of the changeaudit binary

use serde_json::{json, Value};
use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OLD: &str = "Q1
How satisfied are you with the service overall?

Q2
Respondents may skip this question entirely.
";

const NEW: &str = "Q1
How satisfied are you with the service overall?

Q2
Respondents must answer this question before continuing.
Q3
Describe your household.
";

async fn changeaudit(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_changeaudit"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "changeaudit=warn")
        .output()
        .await
        .unwrap()
}

fn write_config(dir: &Path, backend_url: &str) -> std::path::PathBuf {
    let path = dir.join("changeaudit.yaml");
    std::fs::write(
        &path,
        format!(
            "backend:\n  url: {}\n  timeout_secs: 5\n  retry_delay_ms: 0\nrules:\n  backend: file\n  path: {}\n",
            backend_url,
            dir.join("rules").display()
        ),
    )
    .unwrap();
    path
}

#[tokio::test]
async fn test_rules_add_then_list() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "http://localhost:11434");

    let added = changeaudit(&config, &["rules", "add", "Treat typo fixes as cosmetic."]).await;
    assert!(added.status.success(), "{}", String::from_utf8_lossy(&added.stderr));
    assert!(String::from_utf8_lossy(&added.stdout).contains("Added 1 rule(s); 2 stored in total"));

    let listed = changeaudit(&config, &["rules", "list"]).await;
    let stdout = String::from_utf8_lossy(&listed.stdout);
    assert!(listed.status.success());
    assert!(stdout.contains("Treat typo fixes as cosmetic."));
    assert!(stdout.contains("Ignore identical numerical changes (e.g. 200 to 200)."));
}

#[tokio::test]
async fn test_audit_writes_jsonl_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "{\"description\": \"Wording changed\", \"classification\": \"textual\"}",
            "done": true
        })))
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());
    let old = dir.path().join("old.txt");
    let new = dir.path().join("new.md");
    std::fs::write(&old, OLD).unwrap();
    std::fs::write(&new, NEW).unwrap();
    let report = dir.path().join("report.jsonl");

    let output = changeaudit(
        &config,
        &[
            "audit",
            "--old",
            old.to_str().unwrap(),
            "--new",
            new.to_str().unwrap(),
            "--output",
            report.to_str().unwrap(),
        ],
    )
    .await;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout)
        .contains("1 modified, 2 inserted, 0 deleted, 3 unchanged, 0 failed"));

    let rows: Vec<Value> = std::fs::read_to_string(&report)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["kind"], "modified");
    assert_eq!(rows[0]["q_no"], "Q2");
    assert_eq!(rows[0]["description"], "Wording changed");
    assert_eq!(rows[1]["kind"], "inserted");
    assert_eq!(rows[2]["new_text"], "Describe your household.");
}

#[tokio::test]
async fn test_unreachable_backend_still_completes_the_report() {
    let dir = tempfile::tempdir().unwrap();
    // Nothing listens on port 9 of localhost
    let config = write_config(dir.path(), "http://127.0.0.1:9");
    let old = dir.path().join("old.txt");
    let new = dir.path().join("new.txt");
    std::fs::write(&old, OLD).unwrap();
    std::fs::write(&new, NEW).unwrap();

    let output = changeaudit(
        &config,
        &["audit", "--old", old.to_str().unwrap(), "--new", new.to_str().unwrap()],
    )
    .await;
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("3 failed"));
}

#[tokio::test]
async fn test_missing_document_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "http://localhost:11434");

    let output = changeaudit(
        &config,
        &["audit", "--old", "/nonexistent/a.docx", "--new", "/nonexistent/b.docx"],
    )
    .await;
    assert!(!output.status.success());
}

#[tokio::test]
async fn test_train_dry_run_stores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "http://localhost:11434");
    let corrections = dir.path().join("corrections.jsonl");
    std::fs::write(
        &corrections,
        r#"{"q_no":"Q2","old_text":"a","new_text":"b","description":"Wording changed","refined_q_no":"Q2","classification":"textual","human_classification":"requirement"}
"#,
    )
    .unwrap();

    let output = changeaudit(
        &config,
        &["train", "--corrections", corrections.to_str().unwrap(), "--dry-run"],
    )
    .await;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("classify the change as requirement"));
    assert!(!dir.path().join("rules").exists());
}

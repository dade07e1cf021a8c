use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn policy_rag_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("policy-rag");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(
        data_dir.join("refund_policy.txt"),
        "Refund Policy\n\nCustomers may request a refund within 30 days of purchase.\nGift cards are non-refundable.",
    )
    .unwrap();
    fs::write(data_dir.join("shipping_policy.txt"), "x".repeat(1000)).unwrap();
    fs::write(data_dir.join("notes.md"), "Not a policy document.").unwrap();

    let config_content = format!(
        r#"[data]
dir = "{}/data"

[chunking]
chunk_size = 500
overlap = 50

[llm]
api_key_env = "POLICY_RAG_CLI_TEST_KEY"
"#,
        root.display()
    );

    let config_path = config_dir.join("policy-rag.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_policy_rag(config_path: &Path, cwd: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(policy_rag_binary())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .current_dir(cwd)
        .env_remove("POLICY_RAG_CLI_TEST_KEY")
        .env_remove("GROQ_MODEL")
        .output()
        .expect("Failed to run policy-rag binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_ingest_dry_run_counts() {
    let (tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_policy_rag(&config, tmp.path(), &["ingest", "--dry-run"]);
    assert!(success, "dry run failed: {}", stderr);
    // 1000 chars at size 500 / overlap 50 → 3 windows; the short file → 1.
    assert!(stdout.contains("documents: 2"), "stdout: {}", stdout);
    assert!(stdout.contains("chunks:    4"), "stdout: {}", stdout);
}

#[test]
fn test_ingest_missing_data_dir_fails() {
    let (tmp, config) = setup_test_env();
    fs::remove_dir_all(tmp.path().join("data")).unwrap();
    let (_, stderr, success) = run_policy_rag(&config, tmp.path(), &["ingest", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("does not exist"), "stderr: {}", stderr);
}

#[test]
fn test_query_without_api_key_fails() {
    let (tmp, config) = setup_test_env();
    let (_, stderr, success) = run_policy_rag(
        &config,
        tmp.path(),
        &["query", "What is the time limit for refunds?"],
    );
    assert!(!success);
    assert!(
        stderr.contains("POLICY_RAG_CLI_TEST_KEY environment variable not set"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_invalid_chunking_config_fails() {
    let (tmp, config) = setup_test_env();
    fs::write(&config, "[chunking]\nchunk_size = 100\noverlap = 100\n").unwrap();
    let (_, stderr, success) = run_policy_rag(&config, tmp.path(), &["ingest", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("overlap"), "stderr: {}", stderr);
}

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn bulletin_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_bulletin"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/bulletin.sqlite"

[server]
bind = "127.0.0.1:7340"

[digest]
utc_offset = "+00:00"
"#,
        root.display()
    );

    let config_path = config_dir.join("bulletin.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_bulletin(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = bulletin_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run bulletin binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Create a post and return its id (parsed from the "created post <id>" line).
fn create_post(config_path: &Path, extra: &[&str]) -> String {
    let mut args = vec![
        "post",
        "--user",
        "u1",
        "--community",
        "riverside",
    ];
    args.extend_from_slice(extra);
    let (stdout, stderr, success) = run_bulletin(config_path, &args);
    assert!(success, "post failed: stdout={}, stderr={}", stdout, stderr);
    stdout
        .lines()
        .find_map(|l| l.strip_prefix("created post "))
        .map(|id| id.trim().to_string())
        .unwrap_or_else(|| panic!("no post id in output: {}", stdout))
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_bulletin(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/bulletin.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_bulletin(&config_path, &["init"]);
    assert!(success1, "First init failed");
    let (_, _, success2) = run_bulletin(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_post_and_get() {
    let (_tmp, config_path) = setup_test_env();
    run_bulletin(&config_path, &["init"]);

    let id = create_post(
        &config_path,
        &[
            "--text",
            "Lost cat near the library",
            "--category",
            "Lost & Found",
            "--tag",
            "cat",
        ],
    );

    let (stdout, _, success) = run_bulletin(&config_path, &["get", &id]);
    assert!(success);
    assert!(stdout.contains("Lost cat near the library"));
    assert!(stdout.contains("Lost & Found"));
    assert!(stdout.contains("status:      active"));
}

#[test]
fn test_get_missing_post_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_bulletin(&config_path, &["init"]);

    let (_, stderr, success) = run_bulletin(&config_path, &["get", "does-not-exist"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

#[test]
fn test_post_rejects_empty_text() {
    let (_tmp, config_path) = setup_test_env();
    run_bulletin(&config_path, &["init"]);

    let (_, _, success) = run_bulletin(
        &config_path,
        &["post", "--user", "u1", "--community", "riverside", "--text", "   "],
    );
    assert!(!success);
}

#[test]
fn test_vote_switch_keeps_single_vote() {
    let (_tmp, config_path) = setup_test_env();
    run_bulletin(&config_path, &["init"]);
    let id = create_post(&config_path, &["--text", "Street light out on Elm"]);

    let (stdout, stderr, success) =
        run_bulletin(&config_path, &["vote", &id, "--user", "u2", "--value", "1"]);
    assert!(success, "vote failed: {}", stderr);
    assert!(stdout.contains("upvotes: 1  downvotes: 0"));

    let (stdout, stderr, success) =
        run_bulletin(&config_path, &["vote", &id, "--user", "u2", "--value", "-1"]);
    assert!(success, "vote failed: {}", stderr);
    assert!(
        stdout.contains("upvotes: 0  downvotes: 1  score: -1  your vote: -1"),
        "got: {}",
        stdout
    );
}

#[test]
fn test_vote_rejects_invalid_value() {
    let (_tmp, config_path) = setup_test_env();
    run_bulletin(&config_path, &["init"]);
    let id = create_post(&config_path, &["--text", "hello"]);

    let (_, _, success) =
        run_bulletin(&config_path, &["vote", &id, "--user", "u2", "--value", "2"]);
    assert!(!success);
}

#[test]
fn test_status_transitions() {
    let (_tmp, config_path) = setup_test_env();
    run_bulletin(&config_path, &["init"]);
    let id = create_post(&config_path, &["--text", "spam spam spam"]);

    let (stdout, _, success) = run_bulletin(&config_path, &["status", &id, "flagged"]);
    assert!(success);
    assert!(stdout.contains("is now flagged"));

    let (_, _, success) = run_bulletin(&config_path, &["status", &id, "active"]);
    assert!(!success, "flagged -> active must be rejected");

    let (_, _, success) = run_bulletin(&config_path, &["status", &id, "removed"]);
    assert!(success);
}

#[test]
fn test_summary_for_day_with_posts() {
    let (_tmp, config_path) = setup_test_env();
    run_bulletin(&config_path, &["init"]);
    create_post(
        &config_path,
        &[
            "--text",
            "Gas leak on Main St",
            "--category",
            "Safety",
            "--urgency",
            "emergency",
            "--at",
            "2024-03-15T09:30:00Z",
        ],
    );
    create_post(
        &config_path,
        &[
            "--text",
            "Farmers market Saturday",
            "--category",
            "Events",
            "--at",
            "2024-03-15T18:00:00Z",
        ],
    );

    let (stdout, stderr, success) = run_bulletin(
        &config_path,
        &["summary", "riverside", "--date", "2024-03-15"],
    );
    assert!(success, "summary failed: {}", stderr);
    assert!(stdout.contains("# 📊 Daily Summary for riverside"));
    assert!(stdout.contains("**Friday, 2024-03-15**"));
    assert!(stdout.contains("- **Total Posts:** 2"));
    assert!(stdout.contains("stats: total=2 emergency=1 urgent=0 normal=1"));
}

#[test]
fn test_summary_idempotent() {
    let (_tmp, config_path) = setup_test_env();
    run_bulletin(&config_path, &["init"]);
    create_post(
        &config_path,
        &["--text", "Pothole", "--at", "2024-03-15T12:00:00Z"],
    );

    let (first, _, ok1) = run_bulletin(
        &config_path,
        &["summary", "riverside", "--date", "2024-03-15"],
    );
    // A post added after the first call must not change the stored summary.
    create_post(
        &config_path,
        &["--text", "Another pothole", "--at", "2024-03-15T13:00:00Z"],
    );
    let (second, _, ok2) = run_bulletin(
        &config_path,
        &["summary", "riverside", "--date", "2024-03-15"],
    );
    assert!(ok1 && ok2);
    assert_eq!(first, second);

    let (listing, _, ok) = run_bulletin(&config_path, &["summaries", "riverside"]);
    assert!(ok);
    assert_eq!(listing.matches("2024-03-15").count(), 1);
}

#[test]
fn test_summary_empty_day() {
    let (_tmp, config_path) = setup_test_env();
    run_bulletin(&config_path, &["init"]);

    let (stdout, _, success) = run_bulletin(
        &config_path,
        &["summary", "riverside", "--date", "2030-01-01"],
    );
    assert!(success);
    assert!(stdout.contains("No activity reported in riverside on 2030-01-01."));
    assert!(stdout.contains("stats: total=0 emergency=0 urgent=0 normal=0"));
}

#[test]
fn test_summary_rejects_bad_date() {
    let (_tmp, config_path) = setup_test_env();
    run_bulletin(&config_path, &["init"]);

    let (_, stderr, success) = run_bulletin(
        &config_path,
        &["summary", "riverside", "--date", "2024-13-01"],
    );
    assert!(!success);
    assert!(stderr.contains("invalid date"), "stderr: {}", stderr);

    let (listing, _, _) = run_bulletin(&config_path, &["summaries", "riverside"]);
    assert!(listing.contains("No summaries"));
}

#[test]
fn test_search_finds_active_posts() {
    let (_tmp, config_path) = setup_test_env();
    run_bulletin(&config_path, &["init"]);
    create_post(&config_path, &["--text", "Water main break on Oak Avenue"]);
    create_post(&config_path, &["--text", "Bake sale at the school"]);

    let (stdout, _, success) = run_bulletin(&config_path, &["search", "water"]);
    assert!(success);
    assert!(stdout.contains("Water main break"));
    assert!(!stdout.contains("Bake sale"));
}

#[test]
fn test_stats_runs() {
    let (_tmp, config_path) = setup_test_env();
    run_bulletin(&config_path, &["init"]);
    create_post(&config_path, &["--text", "hello neighbors"]);

    let (stdout, _, success) = run_bulletin(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("1 active"));
    assert!(stdout.contains("riverside"));
}

#[test]
fn test_missing_config_fails() {
    let (stdout, stderr, success) = run_bulletin(Path::new("/nonexistent/bulletin.toml"), &["init"]);
    assert!(!success, "expected failure: stdout={}", stdout);
    assert!(stderr.contains("Failed to read config file"));
}

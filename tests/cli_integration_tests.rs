use assert_cmd::Command;
use predicates::prelude::*;

fn depwatch(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("depwatch").unwrap();
    cmd.current_dir(dir)
        .env("DEPWATCH__CACHE__ROOT_PATH", dir)
        .env("DEPWATCH__OBSERVABILITY__JSON", "false");
    cmd
}

#[test]
fn test_config_prints_defaults_as_toml() {
    let dir = tempfile::tempdir().unwrap();

    depwatch(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[cache]"))
        .stdout(predicate::str::contains("directory_name = \"depwatch-cache\""))
        .stdout(predicate::str::contains("creator = \"virtualenv\""));
}

#[test]
fn test_config_reads_file_and_environment() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("depwatch.toml"),
        "[cache]\ndirectory_name = \"elsewhere\"\n\n[git]\nbranch = \"develop\"\n",
    )
    .unwrap();

    depwatch(dir.path())
        .env("DEPWATCH__GIT__BRANCH", "main")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("directory_name = \"elsewhere\""))
        .stdout(predicate::str::contains("branch = \"main\""));
}

#[test]
fn test_config_never_prints_token() {
    let dir = tempfile::tempdir().unwrap();

    depwatch(dir.path())
        .env("GITHUB_TOKEN", "ghp_secret_value")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("ghp_secret_value").not());
}

#[test]
fn test_process_rejects_malformed_request() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("request.json"), "{ not json").unwrap();

    depwatch(dir.path())
        .args(["process", "request.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed processing request"));
}

#[test]
fn test_process_reports_failure_when_clone_fails() {
    let dir = tempfile::tempdir().unwrap();
    let request = serde_json::json!({
        "id": 99,
        "name": "missing",
        "repository": {
            "flavor": "git",
            "url": dir.path().join("does-not-exist.git")
        },
        "check_command": "true",
        "requirements_files": []
    });

    depwatch(dir.path())
        .args(["process", "-"])
        .write_stdin(request.to_string())
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"final_state\": \"Failure\""));
}

// Copyright 2026 Martin Pool.

//! Config files and required settings.

use indoc::indoc;

use coldstash::test_fixtures::TreeFixture;
use coldstash::Config;

use super::*;

#[test]
fn sample_config_needs_no_settings() {
    let temp = TempDir::new().unwrap();
    let path = temp.child("coldstash.json");
    run_coldstash()
        .arg("sample-config")
        .arg(path.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    path.assert(predicate::str::contains("\"account_id\""));
    assert_eq!(Config::load(path.path()).unwrap(), Config::sample());
}

#[test]
fn missing_account_id_exits_before_any_work() {
    let temp = TempDir::new().unwrap();
    let src = TreeFixture::new();
    src.create_file("a.jpg");
    run_coldstash()
        .arg("--database")
        .arg(temp.child("db").path())
        .args(["backup", "--dummy-upload", "--vault", "v"])
        .arg(src.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Account id has not been supplied"));
    temp.child("db").assert(predicate::path::missing());
}

#[test]
fn missing_database_exits() {
    run_coldstash()
        .args(["--account-id", "42", "ls", "v"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Database directory has not been supplied",
        ));
}

#[test]
fn settings_from_config_file() {
    let temp = TempDir::new().unwrap();
    let db = temp.child("db");
    let src = TreeFixture::new();
    src.create_file("a.jpg");
    let config = temp.child("c.json");
    config
        .write_str(&format!(
            indoc! { r#"
                {{
                    "account_id": "42",
                    "database": {db:?},
                    "backup_directory": {src:?},
                    "vault": "v",
                    "compressor": "tar-snappy"
                }}
            "# },
            db = db.path().to_str().unwrap(),
            src = src.path().to_str().unwrap(),
        ))
        .unwrap();
    run_coldstash()
        .arg("--config")
        .arg(config.path())
        .args(["new-vault", "--dummy-upload", "v"])
        .assert()
        .success();
    run_coldstash()
        .arg("--config")
        .arg(config.path())
        .args(["backup", "--dummy-upload"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1        uploaded bundles"));
}

#[test]
fn account_id_from_environment() {
    let temp = TempDir::new().unwrap();
    run_coldstash()
        .env("COLDSTASH_ACCOUNT_ID", "42")
        .env("COLDSTASH_DATABASE", temp.child("db").path())
        .args(["new-vault", "--dummy-upload", "v"])
        .assert()
        .success();
}

#[test]
fn bad_config_file_is_reported() {
    let temp = TempDir::new().unwrap();
    let config = temp.child("c.json");
    config.write_str("{ \"vault\": ").unwrap();
    run_coldstash()
        .arg("--config")
        .arg(config.path())
        .args(["ls", "v"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config file"));
}

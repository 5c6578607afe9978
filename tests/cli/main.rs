// Coldstash cold-storage backup.
// Copyright 2016-2026 Martin Pool.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! Run coldstash CLI as a subprocess and test it.

use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

mod config;

fn run_coldstash() -> Command {
    let mut command = Command::cargo_bin("coldstash").expect("locate coldstash binary");
    command
        .env_remove("COLDSTASH_ACCOUNT_ID")
        .env_remove("COLDSTASH_DATABASE");
    command
}

/// Run with an account id, a database in `db`, the built-in compressor, and
/// no network.
fn run_offline(db: &Path) -> Command {
    let mut command = run_coldstash();
    command
        .args(["--account-id", "123456789012", "--compressor", "tar-snappy"])
        .arg("--database")
        .arg(db);
    command
}

#[test]
fn no_args() {
    // Run with no arguments, should fail with a usage message to stderr.
    run_coldstash()
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn help() {
    run_coldstash()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Back up a directory tree to cold storage",
        ))
        .stdout(predicate::str::contains(
            "Upload changed directories and delete superseded versions",
        ))
        .stderr(predicate::str::is_empty());
}

#[test]
fn ls_unknown_vault_fails() {
    let temp = TempDir::new().unwrap();
    run_offline(temp.child("db").path())
        .args(["ls", "nothing"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "Vault \"nothing\" is not known to the metadata store",
        ));
}

// Copyright 2015-2026 Martin Pool.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! Backup runs against a scratch store and a fake gateway.

use std::sync::Arc;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tracing_test::traced_test;

use coldstash::gateway::record::{Call, Verb};
use coldstash::test_fixtures::{
    session_with_gateway, session_with_vault, FailingCompressor, FakeGateway, FlakyStore,
    ScratchStore, TreeFixture, WarningCompressor,
};
use coldstash::*;

fn photos_tree() -> TreeFixture {
    let tf = TreeFixture::new();
    tf.create_dir("photos");
    tf.create_file_with_contents("photos/a.jpg", b"first a");
    tf.create_file_with_contents("photos/b.jpg", b"b");
    tf.create_file_with_contents("photos/thumbs.db", b"cache");
    tf
}

#[test]
fn photos_scenario() {
    let tf = photos_tree();
    let (store, gateway, session) = session_with_vault("v");
    let source = tf.source_tree();
    let options = BackupOptions::default();

    let stats = backup(&session, &source, "v", &options).unwrap();
    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.empty_directories, 1, "root has no files");
    assert_eq!(gateway.uploaded_names(), ["photos.tar.sz"]);
    let first = store
        .most_recent_version("v", "photos.tar.sz")
        .unwrap()
        .expect("version recorded");
    assert_eq!(first.state, VersionState::Active);

    // Nothing changed: nothing is uploaded.
    let stats = backup(&session, &source, "v", &options).unwrap();
    assert_eq!(stats.uploaded, 0);
    assert_eq!(stats.unchanged, 1);
    assert_eq!(gateway.count(Verb::Upload), 1);

    // Changing a.jpg makes a new version and supersedes the old one.
    tf.create_file_with_contents("photos/a.jpg", b"second a");
    let stats = backup(&session, &source, "v", &options).unwrap();
    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.retired_versions, 1);
    let second = store
        .most_recent_version("v", "photos.tar.sz")
        .unwrap()
        .unwrap();
    assert_ne!(second.archive_id, first.archive_id);
    assert_ne!(second.tree_hash, first.tree_hash);
    let pending = store.list_pending_deletion("v").unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].archive_id, first.archive_id);
    // The retired version's size and hash are untouched.
    assert_eq!(pending[0].tree_hash, first.tree_hash);
    assert_eq!(pending[0].size, first.size);
    store.assert_single_active("v");
}

#[test]
#[traced_test]
fn second_run_uploads_nothing() {
    let tf = TreeFixture::new();
    tf.create_file("top");
    for dir in ["a", "a/b", "a/b/c", "d"] {
        tf.create_dir(dir);
        tf.create_file(&format!("{dir}/file"));
    }
    let (_store, gateway, session) = session_with_vault("v");
    let source = tf.source_tree();
    let first = backup(&session, &source, "v", &BackupOptions::default()).unwrap();
    assert_eq!(first.uploaded, 5);
    let second = backup(&session, &source, "v", &BackupOptions::default()).unwrap();
    assert_eq!(second.uploaded, 0);
    assert_eq!(second.unchanged, 5);
    assert_eq!(gateway.count(Verb::Upload), 5);
    assert!(!logs_contain("ERROR") && !logs_contain("WARN"));
}

#[test]
fn empty_directory_makes_no_records() {
    let tf = TreeFixture::new();
    tf.create_dir("empty");
    tf.create_file("empty/desktop.ini");
    let (store, gateway, session) = session_with_vault("v");
    let stats = backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.directories, 2);
    assert_eq!(stats.empty_directories, 2);
    assert!(gateway.calls().is_empty());
    assert!(store.list_versions("v").unwrap().is_empty());
}

#[test]
#[traced_test]
fn failed_upload_leaves_state_unchanged() {
    let tf = photos_tree();
    let gateway = Arc::new(FakeGateway::new());
    let (store, session) = session_with_gateway("v", gateway.clone());
    let source = tf.source_tree();
    backup(&session, &source, "v", &BackupOptions::default()).unwrap();
    let before = store.list_versions("v").unwrap();

    tf.create_file_with_contents("photos/a.jpg", b"changed");
    gateway.fail_uploads(true);
    let stats = backup(&session, &source, "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.upload_errors, 1);
    assert_eq!(stats.retired_versions, 0);
    assert!(logs_contain("Upload failed; tracked state is unchanged"));
    // The old version is still the active one: nothing was retired early.
    assert_eq!(store.list_versions("v").unwrap(), before);
    assert!(store.list_pending_deletion("v").unwrap().is_empty());

    // A later successful run uploads the change.
    gateway.fail_uploads(false);
    let stats = backup(&session, &source, "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.retired_versions, 1);
    store.assert_single_active("v");
}

#[test]
fn checksum_mismatch_counts_as_failed_upload() {
    let tf = photos_tree();
    let gateway = Arc::new(FakeGateway::new());
    gateway.wrong_checksums(true);
    let (store, session) = session_with_gateway("v", gateway.clone());
    let stats = backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.upload_errors, 1);
    assert_eq!(stats.uploaded, 0);
    assert!(store.list_versions("v").unwrap().is_empty());
}

#[test]
fn one_failed_directory_does_not_stop_the_others() {
    let tf = TreeFixture::new();
    for dir in ["a", "b", "c"] {
        tf.create_dir(dir);
        tf.create_file(&format!("{dir}/file"));
    }
    let gateway = Arc::new(FakeGateway::new());
    gateway.fail_uploads_of("b.tar.sz");
    let (store, session) = session_with_gateway("v", gateway.clone());
    let stats = backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.uploaded, 2);
    assert_eq!(stats.upload_errors, 1);
    assert_eq!(
        gateway.uploaded_names(),
        ["a.tar.sz", "b.tar.sz", "c.tar.sz"]
    );
    assert!(store.most_recent_version("v", "b.tar.sz").unwrap().is_none());
}

#[test]
fn build_failures_are_counted_and_contained() {
    let tf = photos_tree();
    let store = ScratchStore::new();
    store.add_vault("v");
    let gateway = Arc::new(FakeGateway::new());
    let session = Session::new(store.arc(), gateway.clone(), Arc::new(FailingCompressor));
    let stats = backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.build_errors, 1);
    assert_eq!(stats.error_count(), 1);
    assert!(gateway.calls().is_empty());
}

#[test]
fn extra_exclusions() {
    let tf = TreeFixture::new();
    tf.create_file("keep.jpg");
    tf.create_dir("skip");
    tf.create_file("skip/only.bak");
    let (_store, gateway, session) = session_with_vault("v");
    let options = BackupOptions {
        exclude: Exclude::with_extra(&["*.bak".to_owned()]).unwrap(),
        ..Default::default()
    };
    let stats = backup(&session, &tf.source_tree(), "v", &options).unwrap();
    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.empty_directories, 1);
    assert_eq!(gateway.uploaded_names(), [".tar.sz"]);
}

#[test]
fn missing_vault_is_fatal() {
    let tf = photos_tree();
    let (_store, gateway, session) = session_with_vault("v");
    assert_matches!(
        backup(&session, &tf.source_tree(), "other", &BackupOptions::default()),
        Err(Error::VaultNotFound { .. })
    );
    assert!(gateway.calls().is_empty());
}

fn flaky_session(vault: &str) -> (Arc<FlakyStore>, Arc<FakeGateway>, Session) {
    let store = FlakyStore::with_vault(vault);
    let gateway = Arc::new(FakeGateway::new());
    let session = Session::new(
        store.clone(),
        gateway.clone(),
        CompressorKind::TarSnappy.compressor(),
    );
    (store, gateway, session)
}

#[test]
fn interrupted_retirement_is_finished_by_next_run() {
    let tf = photos_tree();
    let (store, gateway, session) = flaky_session("v");
    let source = tf.source_tree();
    backup(&session, &source, "v", &BackupOptions::default()).unwrap();

    // The new version is recorded but the old one can't be marked.
    tf.create_file_with_contents("photos/a.jpg", b"second a");
    store.fail_next_marks(1);
    let stats = backup(&session, &source, "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.retired_versions, 0);
    let active = store
        .list_versions("v")
        .unwrap()
        .into_iter()
        .filter(BundleVersion::is_active)
        .count();
    assert_eq!(active, 2);

    // The next run finds the bundle unchanged and marks the leftover.
    let stats = backup(&session, &source, "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.unchanged, 1);
    assert_eq!(stats.uploaded, 0);
    assert_eq!(stats.retired_versions, 1);
    assert_eq!(stats.error_count(), 0);
    assert_eq!(gateway.count(Verb::Upload), 2);
    store.assert_single_active("v");

    let stats = prune(&session, "v").unwrap();
    assert_eq!(stats.deleted, 1);
    assert_eq!(store.list_versions("v").unwrap().len(), 1);

    // After that, unchanged runs mark nothing.
    let stats = backup(&session, &source, "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.retired_versions, 0);
}

#[test]
#[traced_test]
fn unrecorded_upload_is_deleted() {
    let tf = photos_tree();
    let (store, gateway, session) = flaky_session("v");
    store.fail_next_inserts(1);
    let stats = backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.uploaded, 0);
    assert_eq!(
        gateway.calls(),
        [
            Call::new(Verb::Upload, "v", "photos.tar.sz"),
            Call::new(Verb::Delete, "v", "fake-0"),
        ]
    );
    assert!(store.list_versions("v").unwrap().is_empty());
    assert!(logs_contain("Deleted uploaded archive that could not be recorded"));

    // The next run uploads it again.
    let stats = backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.uploaded, 1);
    store.assert_single_active("v");
}

#[test]
#[traced_test]
fn unrecorded_upload_that_cannot_be_deleted_is_reported() {
    let tf = photos_tree();
    let (store, gateway, session) = flaky_session("v");
    store.fail_next_inserts(1);
    gateway.fail_deletes(true);
    let stats = backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.errors, 1);
    assert_eq!(gateway.count(Verb::Delete), 1);
    assert!(logs_contain("must be deleted by hand"));
    assert!(logs_contain("fake://v/fake-0"));
}

#[test]
fn bundles_with_warnings_are_uploaded_and_counted() {
    let tf = photos_tree();
    let store = ScratchStore::new();
    store.add_vault("v");
    let gateway = Arc::new(FakeGateway::new());
    let session = Session::new(store.arc(), gateway.clone(), Arc::new(WarningCompressor));
    let stats = backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.partial_bundles, 1);
    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.error_count(), 0);
    assert_eq!(gateway.uploaded_names(), ["photos.tar.sz"]);
}

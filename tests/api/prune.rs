// Copyright 2026 Martin Pool.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! Pruning superseded versions after backups.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use time::OffsetDateTime;

use coldstash::gateway::record::{Call, Verb};
use coldstash::gateway::DummyGateway;
use coldstash::test_fixtures::{session_with_vault, ScratchStore, TreeFixture};
use coldstash::*;

#[test]
fn prune_after_change_deletes_old_version() {
    let tf = TreeFixture::new();
    tf.create_file_with_contents("a.jpg", b"one");
    let (store, gateway, session) = session_with_vault("v");
    let source = tf.source_tree();
    backup(&session, &source, "v", &BackupOptions::default()).unwrap();
    let old = store.most_recent_version("v", ".tar.sz").unwrap().unwrap();

    tf.create_file_with_contents("a.jpg", b"two");
    backup(&session, &source, "v", &BackupOptions::default()).unwrap();
    let stats = prune(&session, "v").unwrap();
    assert_eq!(
        stats,
        PruneStats {
            pending: 1,
            deleted: 1,
            delete_errors: 0
        }
    );
    assert_eq!(
        gateway.calls().last().unwrap(),
        &Call::new(Verb::Delete, "v", &old.archive_id)
    );
    let versions = store.list_versions("v").unwrap();
    assert_eq!(versions.len(), 1);
    assert!(versions[0].is_active());
}

#[test]
fn failed_deletes_are_retried_without_duplicates() {
    let tf = TreeFixture::new();
    tf.create_file_with_contents("a.jpg", b"one");
    let (store, gateway, session) = session_with_vault("v");
    let source = tf.source_tree();
    for content in [b"two", b"tre"] {
        backup(&session, &source, "v", &BackupOptions::default()).unwrap();
        tf.create_file_with_contents("a.jpg", content);
    }
    backup(&session, &source, "v", &BackupOptions::default()).unwrap();
    assert_eq!(store.list_pending_deletion("v").unwrap().len(), 2);

    gateway.fail_deletes(true);
    for _ in 0..2 {
        let stats = prune(&session, "v").unwrap();
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.delete_errors, 2);
        assert_eq!(store.list_pending_deletion("v").unwrap().len(), 2);
    }

    gateway.fail_deletes(false);
    let stats = prune(&session, "v").unwrap();
    assert_eq!(stats.deleted, 2);
    assert!(store.list_pending_deletion("v").unwrap().is_empty());
    store.assert_single_active("v");
}

#[test]
fn prune_without_backup_changes_nothing_active() {
    let tf = TreeFixture::new();
    tf.create_file("a.jpg");
    let (store, gateway, session) = session_with_vault("v");
    backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();
    let stats = prune(&session, "v").unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(gateway.count(Verb::Delete), 0);
    assert_eq!(store.list_versions("v").unwrap().len(), 1);
}

#[test]
fn rehearsal_prune_keeps_records_of_real_archives() {
    let store = ScratchStore::new();
    store.add_vault("v");
    for archive_id in ["REAL-GLACIER-ID-1", "REAL-GLACIER-ID-2"] {
        store
            .insert_version(BundleVersion {
                archive_id: archive_id.to_owned(),
                bundle_name: ".tar.sz".to_owned(),
                vault: "v".to_owned(),
                tree_hash: TreeHash::of_bytes(archive_id.as_bytes()),
                size: 1,
                location: format!("/123/vaults/v/archives/{archive_id}"),
                state: VersionState::Active,
                sequence: 0,
                created: OffsetDateTime::now_utc(),
            })
            .unwrap();
    }
    store
        .mark_pending_deletion("v", ".tar.sz", "REAL-GLACIER-ID-2")
        .unwrap();

    // Two rehearsal backups supersede the second real archive and then the
    // first fabricated one.
    let session = Session::new(
        store.arc(),
        Arc::new(DummyGateway::new()),
        CompressorKind::TarSnappy.compressor(),
    );
    let tf = TreeFixture::new();
    tf.create_file_with_contents("a.jpg", b"one");
    backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();
    tf.create_file_with_contents("a.jpg", b"two");
    backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();

    let stats = prune(&session, "v").unwrap();
    assert_eq!(
        stats,
        PruneStats {
            pending: 3,
            deleted: 1,
            delete_errors: 2
        }
    );
    let pending: Vec<String> = store
        .list_pending_deletion("v")
        .unwrap()
        .into_iter()
        .map(|v| v.archive_id)
        .collect();
    assert_eq!(pending, ["REAL-GLACIER-ID-1", "REAL-GLACIER-ID-2"]);
    store.assert_single_active("v");
}

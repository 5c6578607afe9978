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

//! Tracked state survives between runs that reopen the store.

use std::sync::Arc;

use assert_matches::assert_matches;
use tempfile::TempDir;

use coldstash::gateway::DummyGateway;
use coldstash::test_fixtures::TreeFixture;
use coldstash::*;

fn session_on(dir: &std::path::Path) -> Session {
    Session::new(
        Arc::new(JsonStore::open_locked(dir, false).unwrap()),
        Arc::new(DummyGateway::new()),
        CompressorKind::TarSnappy.compressor(),
    )
}

#[test]
fn unchanged_after_reopening_store() {
    let db = TempDir::new().unwrap();
    let tf = TreeFixture::new();
    tf.create_file("a.jpg");
    {
        let session = session_on(db.path());
        session.create_vault("v").unwrap();
        let stats = backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();
        assert_eq!(stats.uploaded, 1);
    }
    let session = session_on(db.path());
    let stats = backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();
    assert_eq!(stats.uploaded, 0);
    assert_eq!(stats.unchanged, 1);
}

#[test]
fn second_writer_is_locked_out() {
    let db = TempDir::new().unwrap();
    let _session = session_on(db.path());
    assert_matches!(
        JsonStore::open_locked(db.path(), false),
        Err(Error::Lease(_))
    );
    // Readers don't need the lease.
    JsonStore::open(db.path()).unwrap();
}

#[test]
fn dummy_versions_have_fabricated_ids() {
    let db = TempDir::new().unwrap();
    let tf = TreeFixture::new();
    tf.create_file("a.jpg");
    let session = session_on(db.path());
    session.create_vault("v").unwrap();
    backup(&session, &tf.source_tree(), "v", &BackupOptions::default()).unwrap();
    let version = session
        .store()
        .most_recent_version("v", ".tar.sz")
        .unwrap()
        .unwrap();
    assert!(version.archive_id.starts_with("v-coldstash-"));
    assert_eq!(version.location, format!("dummy://{}", version.archive_id));
}

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

//! Building bundles through the public API.

use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

use coldstash::compress::tar_snappy::TarSnappy;
use coldstash::test_fixtures::TreeFixture;
use coldstash::*;

use super::read_tar_snappy;

#[test]
fn photos_bundle_leaves_out_thumbnails() {
    let tf = TreeFixture::new();
    tf.create_dir("photos");
    tf.create_file_with_contents("photos/a.jpg", b"aaa");
    tf.create_file_with_contents("photos/b.jpg", b"bbb");
    tf.create_file_with_contents("photos/thumbs.db", b"cache");
    let source = tf.source_tree();
    let scratch = TempDir::new().unwrap();
    let exclude = Exclude::default();
    let builder = BundleBuilder::new(&source, &exclude, &TarSnappy, scratch.path());
    let BuildOutcome::Built(bundle) = builder.build(&BundlePath::from("photos")).unwrap() else {
        panic!("expected a bundle");
    };
    assert_eq!(bundle.bundle_name, "photos.tar.sz");
    assert_eq!(
        read_tar_snappy(bundle.path()),
        [
            ("a.jpg".to_owned(), b"aaa".to_vec()),
            ("b.jpg".to_owned(), b"bbb".to_vec()),
        ]
    );
}

#[rstest]
#[case::config("settings.ini")]
#[case::desktop("Desktop.ini")]
#[case::thumbnails("Thumbs.db")]
#[case::temp("download.tmp")]
#[case::conflict("notes.sync-conflict-20240101-123456.txt")]
fn only_excluded_files_is_empty(#[case] name: &str) {
    let tf = TreeFixture::new();
    tf.create_file(name);
    let source = tf.source_tree();
    let scratch = TempDir::new().unwrap();
    let exclude = Exclude::default();
    let builder = BundleBuilder::new(&source, &exclude, &TarSnappy, scratch.path());
    assert!(matches!(
        builder.build(&BundlePath::root()).unwrap(),
        BuildOutcome::Empty
    ));
}

#[test]
fn root_bundle_is_named_by_extension_alone() {
    let tf = TreeFixture::new();
    tf.create_file("top.txt");
    // A subdirectory whose own bundle name could be confused with the root's.
    tf.create_dir("x");
    tf.create_file("x/inner.txt");
    let source = tf.source_tree();
    let scratch = TempDir::new().unwrap();
    let exclude = Exclude::default();
    let builder = BundleBuilder::new(&source, &exclude, &TarSnappy, scratch.path());
    let names: Vec<String> = source
        .iter_bundle_paths()
        .map(|p| match builder.build(&p.unwrap()).unwrap() {
            BuildOutcome::Built(b) => b.bundle_name.clone(),
            BuildOutcome::Empty => panic!("unexpected empty"),
        })
        .collect();
    assert_eq!(names, [".tar.sz", "x.tar.sz"]);
}

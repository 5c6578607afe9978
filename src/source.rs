// Coldstash cold-storage backup.
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

//! Access the on-disk tree being backed up.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{trace, warn};

use crate::errors::Error;
use crate::{BundlePath, Exclude, Result};

/// A directory tree on the local filesystem, used as a backup source.
#[derive(Clone, Debug)]
pub struct SourceTree {
    path: PathBuf,
}

impl SourceTree {
    /// Open the tree rooted at `path`, which must be an existing directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SourceTree> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(Error::SourceNotFound {
                path: path.to_owned(),
            });
        }
        Ok(SourceTree {
            path: path.to_owned(),
        })
    }

    /// Return the root path for this tree.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iterate every directory in the tree, starting with the root.
    ///
    /// Each call starts a new walk. Each directory is yielded as its own
    /// independent bundle path. Symlinks to directories are not followed.
    pub fn iter_bundle_paths(&self) -> Iter {
        Iter {
            root_path: self.path.clone(),
            dir_deque: [BundlePath::root()].into(),
        }
    }

    /// List the regular files directly inside one directory that should be
    /// included in its bundle, sorted by name.
    pub fn bundle_files(&self, dir: &BundlePath, exclude: &Exclude) -> Result<Vec<PathBuf>> {
        let dir_path = dir.below(&self.path);
        let fail = |source| Error::ListSourceDirectory {
            path: dir_path.clone(),
            source,
        };
        let mut files = Vec::new();
        for dir_entry in fs::read_dir(&dir_path).map_err(fail)? {
            let dir_entry = dir_entry.map_err(fail)?;
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else {
                warn!(path = ?dir_entry.path(), "Skipping file with non-UTF-8 name");
                continue;
            };
            if exclude.matches(name) {
                trace!(%dir, name, "Excluded");
                continue;
            }
            // Follow symlinks here so that links to regular files are archived like files.
            match fs::metadata(dir_entry.path()) {
                Ok(metadata) if metadata.is_file() => files.push(dir_entry.path()),
                Ok(_) => (),
                Err(err) => warn!(path = ?dir_entry.path(), ?err, "Failed to stat file"),
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Lazy breadth-first iterator of the directories in a source tree.
///
/// Child directories of each directory are visited in name order, but nothing
/// depends on that order for correctness.
#[derive(Debug)]
pub struct Iter {
    root_path: PathBuf,

    /// Directories yet to be returned, whose children are not yet listed.
    dir_deque: VecDeque<BundlePath>,
}

impl Iter {
    fn list_children(&mut self, dir: &BundlePath) -> Result<()> {
        let dir_path = dir.below(&self.root_path);
        let fail = |source| Error::ListSourceDirectory {
            path: dir_path.clone(),
            source,
        };
        let mut children = Vec::new();
        for dir_entry in fs::read_dir(&dir_path).map_err(fail)? {
            let dir_entry = dir_entry.map_err(fail)?;
            if !dir_entry.file_type().map_err(fail)?.is_dir() {
                continue;
            }
            match dir_entry.file_name().into_string() {
                Ok(name) => children.push(dir.join(&name)),
                Err(name) => warn!(?name, parent = %dir, "Skipping directory with non-UTF-8 name"),
            }
        }
        children.sort();
        self.dir_deque.extend(children);
        Ok(())
    }
}

impl Iterator for Iter {
    type Item = Result<BundlePath>;

    fn next(&mut self) -> Option<Result<BundlePath>> {
        let dir = self.dir_deque.pop_front()?;
        // A directory that can't be listed is reported instead, and its subtree is skipped.
        if let Err(err) = self.list_children(&dir) {
            return Some(Err(err));
        }
        Some(Ok(dir))
    }
}

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

//! Bundle paths identify one directory of the backup source, and so one bundle.
//!
//! Bundle paths are:
//!
//!  * Relative to the top of the backup source.
//!  * Components are separated by `/` regardless of platform.
//!  * UTF-8.
//!  * Do not contain `.`, `..`, or empty components.
//!  * Empty for the root directory itself.
//!
//! Each bundle path maps to exactly one bundle name by appending the bundle
//! extension, so the root directory's bundle is named by the extension alone,
//! for example `.7z`. No subdirectory can map to that name because every
//! subdirectory path is non-empty.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A directory relative to the backup root.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundlePath(String);

impl BundlePath {
    /// The root of the backup source.
    pub fn root() -> BundlePath {
        BundlePath(String::new())
    }

    /// True if this names the root of the backup source.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// True if this string is a well-formed bundle path.
    pub fn is_valid(s: &str) -> bool {
        s.is_empty()
            || s.split('/')
                .all(|part| !part.is_empty() && part != "." && part != ".." && !part.contains('\0'))
    }

    /// Return the path of a child directory.
    #[must_use]
    pub fn join(&self, name: &str) -> BundlePath {
        debug_assert!(!name.contains('/'), "{name:?} contains /");
        if self.is_root() {
            BundlePath(name.to_owned())
        } else {
            BundlePath(format!("{}/{}", self.0, name))
        }
    }

    /// Return the local filesystem path of this directory below `root`.
    pub fn below<P: AsRef<Path>>(&self, root: P) -> PathBuf {
        let mut path = root.as_ref().to_path_buf();
        for part in self.0.split('/').filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path
    }

    /// The name of the bundle holding this directory's files.
    ///
    /// `extension` includes its leading dot, like `".7z"`. The root directory's
    /// bundle name is just the extension.
    pub fn bundle_name(&self, extension: &str) -> String {
        debug_assert!(extension.starts_with('.'), "{extension:?} has no dot");
        let mut name = self.0.clone();
        name.push_str(extension);
        name
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BundlePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for BundlePath {
    fn from(s: &str) -> BundlePath {
        assert!(BundlePath::is_valid(s), "invalid bundle path {s:?}");
        BundlePath(s.to_owned())
    }
}

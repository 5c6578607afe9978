// Copyright 2017 Julian Raufelder.
// Copyright 2020-2026 Martin Pool.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! Exclusion of files from bundles.
//!
//! Patterns are matched case-insensitively against the file name only, since
//! bundles never recurse into subdirectories. The same patterns are passed
//! to external compression tools, so they use the simple `*` and `?`
//! wildcard syntax understood by both.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::errors::Error;
use crate::Result;

/// Files that are never worth archiving: configuration files with the
/// reserved extension, sync-tool conflict copies, desktop and thumbnail
/// metadata, and temporary files.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "*.ini",
    "*sync-conflict*",
    "*desktop.ini",
    "*.tmp",
    "*thumbs.db",
];

/// A set of exclusion patterns, and the compiled matcher for them.
#[derive(Clone, Debug)]
pub struct Exclude {
    patterns: Vec<String>,
    globset: GlobSet,
}

impl Exclude {
    /// Build from a list of patterns.
    pub fn from_patterns<I: IntoIterator<Item = S>, S: AsRef<str>>(patterns: I) -> Result<Exclude> {
        let mut gsb = GlobSetBuilder::new();
        let mut kept = Vec::new();
        for pat in patterns {
            let pat = pat.as_ref().trim();
            if pat.is_empty() || pat.starts_with('#') {
                continue;
            }
            let glob = GlobBuilder::new(pat)
                .case_insensitive(true)
                .literal_separator(true)
                .build()
                .map_err(|source| Error::ParseGlob { source })?;
            gsb.add(glob);
            kept.push(pat.to_owned());
        }
        Ok(Exclude {
            globset: gsb.build().map_err(|source| Error::ParseGlob { source })?,
            patterns: kept,
        })
    }

    /// The default bundle exclusions plus some extra patterns.
    pub fn with_extra(extra: &[String]) -> Result<Exclude> {
        Exclude::from_patterns(
            DEFAULT_EXCLUDES
                .iter()
                .copied()
                .chain(extra.iter().map(String::as_str)),
        )
    }

    /// Exclude nothing at all.
    pub fn nothing() -> Exclude {
        Exclude {
            patterns: Vec::new(),
            globset: GlobSet::empty(),
        }
    }

    /// True if a file with this name should be left out of bundles.
    pub fn matches(&self, file_name: &str) -> bool {
        self.globset.is_match(file_name)
    }

    /// The source patterns, in the order they were given.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for Exclude {
    fn default() -> Self {
        Exclude::with_extra(&[]).expect("default exclusions are valid")
    }
}

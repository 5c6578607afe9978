// Coldstash cold-storage backup.
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

//! Build one directory's bundle in a scratch location.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::compress::{CompressError, CompressRequest, Compressor, Outcome};
use crate::{BundlePath, Error, Exclude, Result, SourceTree, TreeHash, TMP_PREFIX};

/// Builds bundles for directories of one source tree.
#[derive(Debug)]
pub struct BundleBuilder<'a> {
    source: &'a SourceTree,
    exclude: &'a Exclude,
    compressor: &'a dyn Compressor,
    scratch_dir: &'a Path,
}

/// The result of trying to build a bundle.
#[derive(Debug)]
pub enum BuildOutcome {
    Built(ScratchBundle),
    /// The directory has no files that qualify for a bundle.
    Empty,
}

/// A bundle file in the scratch area, deleted when this is dropped.
#[derive(Debug)]
pub struct ScratchBundle {
    path: PathBuf,
    pub bundle_path: BundlePath,
    /// Name under which versions of this bundle are tracked.
    pub bundle_name: String,
    /// Length in bytes.
    pub len: u64,
    pub tree_hash: TreeHash,
    /// True if some files were left out.
    pub with_warnings: bool,
}

impl ScratchBundle {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchBundle {
    fn drop(&mut self) {
        remove_scratch(&self.path);
    }
}

fn remove_scratch(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(?path, "Removed scratch bundle"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => (),
        Err(err) => warn!(?path, ?err, "Failed to remove scratch bundle"),
    }
}

/// Removes the scratch file if the build fails before a [ScratchBundle] exists.
struct ScratchGuard {
    path: PathBuf,
    armed: bool,
}

impl ScratchGuard {
    fn new(path: PathBuf) -> ScratchGuard {
        ScratchGuard { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Stop guarding the file, and hand over its path.
    fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if self.armed {
            remove_scratch(&self.path);
        }
    }
}

impl<'a> BundleBuilder<'a> {
    pub fn new(
        source: &'a SourceTree,
        exclude: &'a Exclude,
        compressor: &'a dyn Compressor,
        scratch_dir: &'a Path,
    ) -> BundleBuilder<'a> {
        BundleBuilder {
            source,
            exclude,
            compressor,
            scratch_dir,
        }
    }

    /// Bundle the files directly inside one directory.
    #[instrument(skip(self), fields(bundle_path = %bundle_path))]
    pub fn build(&self, bundle_path: &BundlePath) -> Result<BuildOutcome> {
        let files = self.source.bundle_files(bundle_path, self.exclude)?;
        if files.is_empty() {
            debug!("No files to bundle");
            return Ok(BuildOutcome::Empty);
        }
        let extension = self.compressor.extension();
        let dest = ScratchGuard::new(self.scratch_dir.join(format!("{TMP_PREFIX}bundle{extension}")));
        // A leftover file would be appended to by some tools.
        remove_scratch(dest.path());
        let dir = bundle_path.below(self.source.path());
        let outcome = self.compressor.compress(&CompressRequest {
            dir: &dir,
            files: &files,
            exclude: self.exclude,
            dest: dest.path(),
        })?;
        let len = match fs::metadata(dest.path()) {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            _ => {
                return Err(CompressError::NoOutput {
                    tool: self.compressor.name(),
                }
                .into())
            }
        };
        let with_warnings = outcome == Outcome::CompletedWithWarnings;
        if with_warnings {
            warn!(%bundle_path, "Some files were left out of the bundle");
        }
        let tree_hash = TreeHash::of_file(dest.path())?;
        debug!(len, %tree_hash, "Built bundle");
        Ok(BuildOutcome::Built(ScratchBundle {
            path: dest.disarm(),
            bundle_name: bundle_path.bundle_name(extension),
            bundle_path: bundle_path.clone(),
            len,
            tree_hash,
            with_warnings,
        }))
    }
}

/// Make a scratch directory for bundles, removed when dropped.
pub(crate) fn scratch_dir() -> Result<tempfile::TempDir> {
    tempfile::Builder::new()
        .prefix(TMP_PREFIX)
        .tempdir()
        .map_err(|source| Error::CreateScratch { source })
}

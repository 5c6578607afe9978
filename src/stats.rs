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

use std::fmt;

use derive_more::{Add, AddAssign};
use thousands::Separable;

pub fn mb_string(s: u64) -> String {
    (s / 1_000_000).separate_with_commas()
}

/// Counts of what happened during one backup pass.
#[derive(Add, AddAssign, Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BackupStats {
    /// Directories visited, including empty ones.
    pub directories: usize,
    /// Directories with no files to bundle.
    pub empty_directories: usize,
    /// Bundles that could not be built.
    pub build_errors: usize,
    /// Bundles built with some unreadable files left out.
    pub partial_bundles: usize,
    /// Bundles matching their most recent version.
    pub unchanged: usize,
    pub uploaded: usize,
    /// Uploads that failed or were rejected.
    pub upload_errors: usize,
    pub uploaded_bytes: u64,
    /// Older versions moved to pending deletion.
    pub retired_versions: usize,
    /// Other errors, such as failing to list a directory or update the store.
    pub errors: usize,
}

impl BackupStats {
    pub fn error_count(&self) -> usize {
        self.build_errors + self.upload_errors + self.errors
    }
}

impl fmt::Display for BackupStats {
    fn fmt(&self, w: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            w,
            "{:>12}      directories",
            self.directories.separate_with_commas()
        )?;
        writeln!(
            w,
            "{:>12}        empty",
            self.empty_directories.separate_with_commas()
        )?;
        writeln!(
            w,
            "{:>12}        bundles missing unreadable files",
            self.partial_bundles.separate_with_commas()
        )?;
        writeln!(
            w,
            "{:>12}        unchanged bundles",
            self.unchanged.separate_with_commas()
        )?;
        writeln!(
            w,
            "{:>12}        uploaded bundles",
            self.uploaded.separate_with_commas()
        )?;
        writeln!(w, "{:>12} MB     uploaded", mb_string(self.uploaded_bytes))?;
        writeln!(
            w,
            "{:>12}      superseded versions marked for deletion",
            self.retired_versions.separate_with_commas()
        )?;
        writeln!(w)?;
        writeln!(
            w,
            "{:>12}      build errors",
            self.build_errors.separate_with_commas()
        )?;
        writeln!(
            w,
            "{:>12}      upload errors",
            self.upload_errors.separate_with_commas()
        )?;
        writeln!(w, "{:>12}      other errors", self.errors.separate_with_commas())?;
        Ok(())
    }
}

/// Counts of what happened while deleting superseded versions.
#[derive(Add, AddAssign, Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PruneStats {
    /// Versions found pending deletion.
    pub pending: usize,
    /// Versions deleted from the service and removed from the store.
    pub deleted: usize,
    /// Versions left pending because deletion failed.
    pub delete_errors: usize,
}

impl fmt::Display for PruneStats {
    fn fmt(&self, w: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            w,
            "{:>12}      versions pending deletion",
            self.pending.separate_with_commas()
        )?;
        writeln!(w, "{:>12}      deleted", self.deleted.separate_with_commas())?;
        writeln!(
            w,
            "{:>12}      deletion errors",
            self.delete_errors.separate_with_commas()
        )?;
        Ok(())
    }
}

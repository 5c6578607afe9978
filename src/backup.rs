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

//! Make a backup by bundling each directory of a source tree and uploading
//! the bundles that changed.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, instrument, warn};

use crate::bundle::scratch_dir;
use crate::gateway::ArchiveGateway;
use crate::*;

/// Configuration of how to make a backup.
#[derive(Debug, Default, Clone)]
pub struct BackupOptions {
    /// Exclude matching files from bundles.
    pub exclude: Exclude,

    /// Build bundles here rather than in a new temporary directory.
    pub scratch_dir: Option<PathBuf>,
}

/// What happened to one built bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadOutcome {
    /// The bundle matches its most recent version. `retired` counts older
    /// versions still active alongside it that were marked for deletion.
    Unchanged { retired: usize },
    UploadFailed,
    Uploaded { len: u64, retired: usize },
}

/// Back up every directory of `source` into `vault`.
///
/// Directories are handled one at a time. A failure in one directory is
/// logged and counted, and the run continues with the next. Only a vault
/// unknown to the store or a failure to make the scratch directory stop the
/// run.
///
/// Returns statistics about what was done.
#[instrument(skip(session, options), fields(source = ?source.path()))]
pub fn backup(
    session: &Session,
    source: &SourceTree,
    vault: &str,
    options: &BackupOptions,
) -> Result<BackupStats> {
    let tracker = VersionTracker::open(session.store(), vault)?;
    let temp_dir;
    let scratch: &Path = match &options.scratch_dir {
        Some(dir) => dir,
        None => {
            temp_dir = scratch_dir()?;
            temp_dir.path()
        }
    };
    let builder = BundleBuilder::new(source, &options.exclude, session.compressor(), scratch);
    let mut stats = BackupStats::default();
    for bundle_path in source.iter_bundle_paths() {
        let bundle_path = match bundle_path {
            Ok(bundle_path) => bundle_path,
            Err(err) => {
                error!("{err}");
                stats.errors += 1;
                continue;
            }
        };
        stats.directories += 1;
        // The scratch bundle is removed when it goes out of scope at the end
        // of each iteration.
        let bundle = match builder.build(&bundle_path) {
            Ok(BuildOutcome::Built(bundle)) => bundle,
            Ok(BuildOutcome::Empty) => {
                stats.empty_directories += 1;
                continue;
            }
            Err(err) => {
                error!(%bundle_path, "Failed to build bundle: {err}");
                stats.build_errors += 1;
                continue;
            }
        };
        if bundle.with_warnings {
            stats.partial_bundles += 1;
        }
        match upload_if_changed(&tracker, session.gateway(), &bundle) {
            Ok(UploadOutcome::Unchanged { retired }) => {
                stats.unchanged += 1;
                stats.retired_versions += retired;
            }
            Ok(UploadOutcome::UploadFailed) => stats.upload_errors += 1,
            Ok(UploadOutcome::Uploaded { len, retired }) => {
                stats.uploaded += 1;
                stats.uploaded_bytes += len;
                stats.retired_versions += retired;
            }
            Err(err) => {
                error!(bundle_path = %bundle.bundle_path, "Failed to record bundle: {err}");
                stats.errors += 1;
            }
        }
    }
    info!(
        directories = stats.directories,
        uploaded = stats.uploaded,
        unchanged = stats.unchanged,
        errors = stats.error_count(),
        "Backup pass complete"
    );
    Ok(stats)
}

/// Compare a built bundle with its most recent version, and upload and record
/// it if it changed.
fn upload_if_changed(
    tracker: &VersionTracker,
    gateway: &dyn ArchiveGateway,
    bundle: &ScratchBundle,
) -> Result<UploadOutcome> {
    let bundle_name = &bundle.bundle_name;
    let checked = tracker.check(bundle_name, bundle.len, &bundle.tree_hash)?;
    if let (Change::Unchanged, Some(previous)) = checked {
        debug!(%bundle_name, "Unchanged");
        // Finish any retirement left undone when this version was recorded.
        let retired = tracker.retire_superseded(&previous)?;
        if retired > 0 {
            warn!(%bundle_name, retired, "Marked leftover active versions for deletion");
        }
        return Ok(UploadOutcome::Unchanged { retired });
    }
    let vault = &tracker.vault().name;
    let receipt = match gateway.upload(vault, bundle_name, bundle.path(), &bundle.tree_hash) {
        Ok(receipt) => receipt,
        Err(err) => {
            warn!(%bundle_name, "Upload failed; tracked state is unchanged: {err}");
            return Ok(UploadOutcome::UploadFailed);
        }
    };
    let version =
        match tracker.record_new_version(bundle_name, &receipt, &bundle.tree_hash, bundle.len) {
            Ok(version) => version,
            Err(err) => {
                abandon_upload(gateway, vault, &receipt);
                return Err(err);
            }
        };
    let retired = tracker.retire_superseded(&version)?;
    info!(
        %bundle_name,
        archive_id = %version.archive_id,
        size = bundle.len,
        retired,
        "Uploaded new version"
    );
    Ok(UploadOutcome::Uploaded {
        len: bundle.len,
        retired,
    })
}

/// Try to delete an uploaded archive that could not be recorded, since no
/// later run would know to delete it.
fn abandon_upload(gateway: &dyn ArchiveGateway, vault: &str, receipt: &UploadReceipt) {
    let archive_id = &receipt.archive_id;
    let location = &receipt.location;
    match gateway.delete(vault, archive_id) {
        Ok(()) => warn!(%archive_id, "Deleted uploaded archive that could not be recorded"),
        Err(err) => error!(
            %vault,
            %archive_id,
            %location,
            "Uploaded archive could not be recorded or deleted, and must be deleted by hand: {err}"
        ),
    }
}

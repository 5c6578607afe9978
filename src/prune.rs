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

//! Delete superseded versions from the service.

use tracing::{error, info, instrument, warn};

use crate::*;

/// Delete every version pending deletion in `vault`.
///
/// A version's record is removed only after the service confirms its archive
/// is deleted. Versions whose deletion fails stay pending, to be retried by a
/// later run.
#[instrument(skip(session))]
pub fn prune(session: &Session, vault: &str) -> Result<PruneStats> {
    let tracker = VersionTracker::open(session.store(), vault)?;
    let pending = tracker.list_pending_deletion()?;
    let mut stats = PruneStats {
        pending: pending.len(),
        ..Default::default()
    };
    for version in pending {
        let archive_id = &version.archive_id;
        if let Err(err) = session.gateway().delete(vault, archive_id) {
            warn!(%archive_id, bundle_name = %version.bundle_name, "Delete failed; will retry later: {err}");
            stats.delete_errors += 1;
            continue;
        }
        match tracker.finalize_deletion(archive_id) {
            Ok(()) => {
                info!(%archive_id, bundle_name = %version.bundle_name, "Deleted superseded version");
                stats.deleted += 1;
            }
            Err(err) => {
                // The archive is gone, so a retry only repeats a harmless delete.
                error!(%archive_id, "Deleted archive but failed to forget it: {err}");
                stats.delete_errors += 1;
            }
        }
    }
    Ok(stats)
}

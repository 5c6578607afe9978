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

//! Decide whether bundles changed, and move versions through their lifecycle.
//!
//! A version is active when recorded. Once a newer version of the same bundle
//! is recorded the older one becomes pending deletion, and after the service
//! confirms the archive is deleted the record is removed.

use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::store::{BundleVersion, MetadataStore, Vault, VersionState};
use crate::{Error, Result, TreeHash, UploadReceipt};

/// Whether a freshly built bundle differs from the last recorded version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Unchanged,
    Changed,
}

/// Compare a local bundle against the most recent recorded version, if any.
///
/// The bundle is unchanged only if both the size and hash match.
pub fn decide(
    local_size: u64,
    local_hash: &TreeHash,
    remote_size: Option<u64>,
    remote_hash: Option<&TreeHash>,
) -> Change {
    match (remote_size, remote_hash) {
        (Some(size), Some(hash)) if size == local_size && hash == local_hash => Change::Unchanged,
        _ => Change::Changed,
    }
}

/// Tracks bundle versions within one vault.
#[derive(Debug)]
pub struct VersionTracker<'s> {
    store: &'s dyn MetadataStore,
    vault: Vault,
}

impl<'s> VersionTracker<'s> {
    /// Track versions in a vault, which must already be recorded in the store.
    pub fn open(store: &'s dyn MetadataStore, vault_name: &str) -> Result<VersionTracker<'s>> {
        let vault = store
            .vault_by_name(vault_name)?
            .ok_or_else(|| Error::VaultNotFound {
                name: vault_name.to_owned(),
            })?;
        Ok(VersionTracker { store, vault })
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn most_recent_version(&self, bundle_name: &str) -> Result<Option<BundleVersion>> {
        self.store.most_recent_version(&self.vault.name, bundle_name)
    }

    /// Compare a built bundle against the last recorded version, which is
    /// also returned.
    pub fn check(
        &self,
        bundle_name: &str,
        size: u64,
        tree_hash: &TreeHash,
    ) -> Result<(Change, Option<BundleVersion>)> {
        let previous = self.most_recent_version(bundle_name)?;
        let change = decide(
            size,
            tree_hash,
            previous.as_ref().map(|v| v.size),
            previous.as_ref().map(|v| &v.tree_hash),
        );
        Ok((change, previous))
    }

    /// Record a successful upload as the new active version.
    #[instrument(skip(self, receipt, tree_hash))]
    pub fn record_new_version(
        &self,
        bundle_name: &str,
        receipt: &UploadReceipt,
        tree_hash: &TreeHash,
        size: u64,
    ) -> Result<BundleVersion> {
        self.store.insert_version(BundleVersion {
            archive_id: receipt.archive_id.clone(),
            bundle_name: bundle_name.to_owned(),
            vault: self.vault.name.clone(),
            tree_hash: tree_hash.clone(),
            size,
            location: receipt.location.clone(),
            state: VersionState::Active,
            sequence: 0,
            created: OffsetDateTime::now_utc(),
        })
    }

    /// Mark every other active version of the same bundle as pending deletion.
    ///
    /// Returns the number of versions marked.
    pub fn retire_superseded(&self, current: &BundleVersion) -> Result<usize> {
        let retired = self.store.mark_pending_deletion(
            &self.vault.name,
            &current.bundle_name,
            &current.archive_id,
        )?;
        for v in &retired {
            debug!(archive_id = %v.archive_id, bundle_name = %v.bundle_name, "Superseded");
        }
        Ok(retired.len())
    }

    pub fn list_pending_deletion(&self) -> Result<Vec<BundleVersion>> {
        self.store.list_pending_deletion(&self.vault.name)
    }

    /// Forget a version whose archive the service has deleted.
    pub fn finalize_deletion(&self, archive_id: &str) -> Result<()> {
        self.store.remove_version(archive_id)
    }
}

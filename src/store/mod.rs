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

//! Durable records of vaults and uploaded bundle versions.

use std::fmt::Debug;

use crate::Result;

mod json;
mod model;

pub use json::JsonStore;
pub use model::{BundleVersion, RetrievalRequest, Vault, VersionState};

/// Storage of vault and bundle version records.
///
/// Implementations apply each mutation completely or not at all.
pub trait MetadataStore: Debug + Send + Sync {
    /// Record a new vault. Fails if one with the same name exists.
    fn create_vault(&self, vault: Vault) -> Result<()>;

    fn vault_by_name(&self, name: &str) -> Result<Option<Vault>>;

    fn list_vaults(&self) -> Result<Vec<Vault>>;

    /// The most recently inserted active version of a bundle, if any.
    fn most_recent_version(&self, vault: &str, bundle_name: &str) -> Result<Option<BundleVersion>>;

    /// All versions in a vault, in insertion order.
    fn list_versions(&self, vault: &str) -> Result<Vec<BundleVersion>>;

    /// Add a version. `sequence` is assigned by the store, and the stored
    /// record is returned.
    fn insert_version(&self, version: BundleVersion) -> Result<BundleVersion>;

    /// Move every active version of `bundle_name` other than `keep_archive_id`
    /// to [VersionState::PendingDeletion], returning the versions changed.
    fn mark_pending_deletion(
        &self,
        vault: &str,
        bundle_name: &str,
        keep_archive_id: &str,
    ) -> Result<Vec<BundleVersion>>;

    /// Versions in a vault waiting for deletion from the service, in insertion order.
    fn list_pending_deletion(&self, vault: &str) -> Result<Vec<BundleVersion>>;

    /// Remove a pending-deletion version record.
    fn remove_version(&self, archive_id: &str) -> Result<()>;
}

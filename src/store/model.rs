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

//! Records kept in the metadata store.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::TreeHash;

/// A named container at the cold storage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Unique name chosen by the operator.
    pub name: String,
    /// Location assigned by the service when the vault was created.
    pub location: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

/// Lifecycle of an uploaded bundle version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionState {
    /// The current version for its bundle name.
    Active,
    /// Superseded by a newer version, and waiting to be deleted from the service.
    PendingDeletion,
}

impl fmt::Display for VersionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            VersionState::Active => "active",
            VersionState::PendingDeletion => "pending-deletion",
        })
    }
}

/// One uploaded snapshot of one directory's bundle.
///
/// The size and hash never change once recorded; only the state moves on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleVersion {
    /// Identifier assigned by the service; unique across the store.
    pub archive_id: String,
    /// Bundle name: the directory path plus the bundle extension.
    pub bundle_name: String,
    /// Name of the vault holding the archive.
    pub vault: String,
    pub tree_hash: TreeHash,
    /// Bundle length in bytes.
    pub size: u64,
    /// Location of the archive reported by the service.
    pub location: String,
    pub state: VersionState,
    /// Insertion order, increasing over the life of the store.
    pub sequence: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

impl BundleVersion {
    pub fn is_active(&self) -> bool {
        self.state == VersionState::Active
    }
}

/// A request to fetch an archive back from the service.
///
/// These are kept in the store's schema, but nothing creates or processes
/// them yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub vault: String,
    pub archive_id: String,
    pub job_id: String,
    pub job_location: String,
    pub destination: PathBuf,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

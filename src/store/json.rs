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

//! Metadata store kept as one JSON document in a local directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use super::{BundleVersion, MetadataStore, RetrievalRequest, Vault, VersionState};
use crate::jsonio::{self, read_json, write_json};
use crate::lease::Lease;
use crate::{Error, Result};

pub static METADATA_FILENAME: &str = "metadata.json";

const FORMAT: &str = "coldstash-metadata-1";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Document {
    format: String,
    vaults: Vec<Vault>,
    /// In insertion order.
    versions: Vec<BundleVersion>,
    #[serde(default)]
    retrievals: Vec<RetrievalRequest>,
    next_sequence: u64,
}

impl Default for Document {
    fn default() -> Self {
        Document {
            format: FORMAT.to_owned(),
            vaults: Vec::new(),
            versions: Vec::new(),
            retrievals: Vec::new(),
            next_sequence: 1,
        }
    }
}

/// A [MetadataStore] in a local directory.
///
/// Every mutation rewrites `metadata.json` atomically, so a crash leaves
/// either the old or new document.
#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    doc: Mutex<Document>,
    lease: Option<Lease>,
}

impl JsonStore {
    /// Open a store directory, creating it if necessary, without taking a lease.
    #[instrument]
    pub fn open(dir: &Path) -> Result<JsonStore> {
        fs::create_dir_all(dir).map_err(|source| Error::WriteStore {
            path: dir.to_owned(),
            source,
        })?;
        let path = dir.join(METADATA_FILENAME);
        let doc = match read_json::<Document>(&path) {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                debug!(?path, "No metadata yet; starting empty");
                Document::default()
            }
            Err(jsonio::Error::Io(source)) => return Err(Error::ReadStore { path, source }),
            Err(jsonio::Error::Json(source)) => return Err(Error::StoreCorrupt { path, source }),
        };
        Ok(JsonStore {
            dir: dir.to_owned(),
            doc: Mutex::new(doc),
            lease: None,
        })
    }

    /// Open a store directory holding its lease until the store is dropped.
    ///
    /// If `break_lock` is true, any existing lease is removed first.
    pub fn open_locked(dir: &Path, break_lock: bool) -> Result<JsonStore> {
        fs::create_dir_all(dir).map_err(|source| Error::WriteStore {
            path: dir.to_owned(),
            source,
        })?;
        let lease = if break_lock {
            Lease::break_lock(dir)?
        } else {
            Lease::acquire(dir)?
        };
        let mut store = JsonStore::open(dir)?;
        store.lease = Some(lease);
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn is_locked(&self) -> bool {
        self.lease.is_some()
    }

    /// Retrieval requests recorded in the store.
    pub fn list_retrievals(&self) -> Result<Vec<RetrievalRequest>> {
        Ok(self.lock().retrievals.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        // A panic while holding the lock can't leave the document half-mutated,
        // because mutations are applied to a copy.
        self.doc.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply a change to a copy of the document, persist it, and then make it current.
    fn mutate<T>(&self, f: impl FnOnce(&mut Document) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let mut doc = guard.clone();
        let r = f(&mut doc)?;
        let path = self.dir.join(METADATA_FILENAME);
        write_json(&path, &doc).map_err(|err| match err {
            jsonio::Error::Io(source) => Error::WriteStore { path, source },
            jsonio::Error::Json(source) => Error::StoreCorrupt { path, source },
        })?;
        *guard = doc;
        Ok(r)
    }
}

impl MetadataStore for JsonStore {
    #[instrument(skip(self))]
    fn create_vault(&self, vault: Vault) -> Result<()> {
        self.mutate(|doc| {
            if doc.vaults.iter().any(|v| v.name == vault.name) {
                return Err(Error::VaultExists { name: vault.name });
            }
            doc.vaults.push(vault);
            Ok(())
        })
    }

    fn vault_by_name(&self, name: &str) -> Result<Option<Vault>> {
        Ok(self.lock().vaults.iter().find(|v| v.name == name).cloned())
    }

    fn list_vaults(&self) -> Result<Vec<Vault>> {
        Ok(self.lock().vaults.clone())
    }

    fn most_recent_version(&self, vault: &str, bundle_name: &str) -> Result<Option<BundleVersion>> {
        Ok(self
            .lock()
            .versions
            .iter()
            .filter(|v| v.vault == vault && v.bundle_name == bundle_name && v.is_active())
            .max_by_key(|v| v.sequence)
            .cloned())
    }

    fn list_versions(&self, vault: &str) -> Result<Vec<BundleVersion>> {
        Ok(self
            .lock()
            .versions
            .iter()
            .filter(|v| v.vault == vault)
            .cloned()
            .collect())
    }

    #[instrument(skip(self, version), fields(archive_id = %version.archive_id))]
    fn insert_version(&self, mut version: BundleVersion) -> Result<BundleVersion> {
        self.mutate(|doc| {
            if doc
                .versions
                .iter()
                .any(|v| v.archive_id == version.archive_id)
            {
                return Err(Error::DuplicateArchive {
                    archive_id: version.archive_id,
                });
            }
            version.sequence = doc.next_sequence;
            doc.next_sequence += 1;
            doc.versions.push(version.clone());
            trace!(sequence = version.sequence, "Inserted version");
            Ok(version)
        })
    }

    #[instrument(skip(self))]
    fn mark_pending_deletion(
        &self,
        vault: &str,
        bundle_name: &str,
        keep_archive_id: &str,
    ) -> Result<Vec<BundleVersion>> {
        let superseded = |v: &BundleVersion| {
            v.vault == vault
                && v.bundle_name == bundle_name
                && v.archive_id != keep_archive_id
                && v.is_active()
        };
        // Usually there is nothing to mark, and then nothing is rewritten.
        if !self.lock().versions.iter().any(superseded) {
            return Ok(Vec::new());
        }
        self.mutate(|doc| {
            let mut changed = Vec::new();
            for v in doc.versions.iter_mut().filter(|v| superseded(&**v)) {
                v.state = VersionState::PendingDeletion;
                changed.push(v.clone());
            }
            Ok(changed)
        })
    }

    fn list_pending_deletion(&self, vault: &str) -> Result<Vec<BundleVersion>> {
        Ok(self
            .lock()
            .versions
            .iter()
            .filter(|v| v.vault == vault && v.state == VersionState::PendingDeletion)
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    fn remove_version(&self, archive_id: &str) -> Result<()> {
        self.mutate(|doc| {
            let Some(pos) = doc.versions.iter().position(|v| v.archive_id == archive_id) else {
                return Err(Error::ArchiveNotFound {
                    archive_id: archive_id.to_owned(),
                });
            };
            if doc.versions[pos].is_active() {
                return Err(Error::ArchiveStillActive {
                    archive_id: archive_id.to_owned(),
                });
            }
            doc.versions.remove(pos);
            Ok(())
        })
    }
}

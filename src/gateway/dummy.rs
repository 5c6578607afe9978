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

//! A gateway that sends nothing anywhere, for rehearsing a run.
//!
//! Uploads succeed with fabricated identifiers and the local hash as the
//! checksum, so the metadata store evolves just as it would for real.
//! Deletes succeed only for those fabricated identifiers: archives uploaded
//! by a real run stay pending deletion until a real run deletes them.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use tracing::{info, warn};

use super::{ArchiveGateway, Error, ErrorKind, Result, UploadReceipt};
use crate::TreeHash;

#[derive(Debug, Default)]
pub struct DummyGateway {
    counter: AtomicU64,
}

impl DummyGateway {
    pub fn new() -> DummyGateway {
        DummyGateway::default()
    }

    fn unique_id(&self, vault: &str) -> String {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{nanos}-{n}", id_prefix(vault))
    }
}

fn id_prefix(vault: &str) -> String {
    format!("{vault}-coldstash-")
}

impl ArchiveGateway for DummyGateway {
    fn create_vault(&self, name: &str) -> Result<String> {
        info!(%name, "Dummy vault created");
        Ok(format!("dummy://vaults/{name}"))
    }

    fn upload(
        &self,
        vault: &str,
        description: &str,
        _bundle: &Path,
        tree_hash: &TreeHash,
    ) -> Result<UploadReceipt> {
        let archive_id = self.unique_id(vault);
        info!(%vault, %description, %archive_id, "Dummy upload");
        Ok(UploadReceipt {
            location: format!("dummy://{archive_id}"),
            archive_id,
            checksum: tree_hash.clone(),
        })
    }

    fn delete(&self, vault: &str, archive_id: &str) -> Result<()> {
        if !archive_id.starts_with(&id_prefix(vault)) {
            warn!(%vault, %archive_id, "Not deleting archive uploaded by a real run");
            return Err(Error::new(ErrorKind::NotRehearsed, vault));
        }
        info!(%vault, %archive_id, "Dummy delete");
        Ok(())
    }
}

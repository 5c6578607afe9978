// Coldstash cold-storage backup.
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

//! Access to the cold storage service holding uploaded bundles.
//!
//! A gateway creates vaults, uploads bundles as archives, and deletes
//! archives. Calls block until the service has answered.

use std::error::Error as StdError;
use std::fmt;
use std::path::Path;

use derive_more::Display;

use crate::TreeHash;

pub mod dummy;
#[cfg(feature = "glacier")]
pub mod glacier;
pub mod record;

pub use dummy::DummyGateway;
#[cfg(feature = "glacier")]
pub use glacier::GlacierGateway;

/// What the service reports about a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Identifier assigned by the service.
    pub archive_id: String,
    /// Tree hash computed by the service over what it received.
    pub checksum: TreeHash,
    pub location: String,
}

/// A cold storage service.
pub trait ArchiveGateway: fmt::Debug + Send + Sync {
    /// Create a vault, returning the location assigned by the service.
    fn create_vault(&self, name: &str) -> Result<String>;

    /// Upload one bundle file as a new archive.
    ///
    /// `tree_hash` is the locally computed hash of the file. A receipt whose
    /// checksum differs from it is reported as [ErrorKind::ChecksumMismatch].
    fn upload(
        &self,
        vault: &str,
        description: &str,
        bundle: &Path,
        tree_hash: &TreeHash,
    ) -> Result<UploadReceipt>;

    /// Delete an archive. Deleting an archive that's already gone is not an error.
    fn delete(&self, vault: &str, archive_id: &str) -> Result<()>;
}

/// A gateway error.
#[derive(Debug)]
pub struct Error {
    /// What type of generally known error?
    pub kind: ErrorKind,
    /// The vault concerned, if any.
    pub vault: Option<String>,
    /// The underlying error: for example an IO or service error.
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

/// General categories of gateway errors.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    #[display(fmt = "Failed to create gateway")]
    CreateGateway,

    #[display(fmt = "Failed to create vault")]
    CreateVault,

    #[display(fmt = "Upload failed")]
    Upload,

    #[display(fmt = "Uploaded checksum does not match the local tree hash")]
    ChecksumMismatch,

    #[display(fmt = "Delete failed")]
    Delete,

    #[display(fmt = "Archive was not made by a rehearsal run and can't be deleted by one")]
    NotRehearsed,

    #[display(fmt = "Incomplete response from service")]
    IncompleteResponse,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, vault: &str) -> Error {
        Error {
            kind,
            vault: Some(vault.to_owned()),
            source: None,
        }
    }

    pub fn with_source<E>(mut self, source: E) -> Error
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(vault) = &self.vault {
            write!(f, " in vault {vault:?}")?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|s| &**s as _)
    }
}

/// Check a receipt against the locally computed hash.
pub(crate) fn check_receipt(
    vault: &str,
    receipt: UploadReceipt,
    tree_hash: &TreeHash,
) -> Result<UploadReceipt> {
    if receipt.checksum == *tree_hash {
        Ok(receipt)
    } else {
        Err(Error::new(ErrorKind::ChecksumMismatch, vault))
    }
}

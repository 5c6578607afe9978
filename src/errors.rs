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

//! Coldstash error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::{compress, gateway, lease};

/// Coldstash specific error.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("{name} has not been supplied: use {hint} or set it in a config file")]
    MissingConfig {
        name: &'static str,
        hint: &'static str,
    },

    #[error("Failed to read config file {path:?}")]
    ReadConfig { path: PathBuf, source: io::Error },

    #[error("Failed to parse config file {path:?}")]
    ParseConfig {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write config file {path:?}")]
    WriteConfig { path: PathBuf, source: io::Error },

    #[error("Backup directory {path:?} does not exist or is not a directory")]
    SourceNotFound { path: PathBuf },

    #[error("Failed to list source directory {path:?}")]
    ListSourceDirectory { path: PathBuf, source: io::Error },

    #[error("Failed to read bundle {path:?}")]
    ReadBundle { path: PathBuf, source: io::Error },

    #[error("Failed to create scratch directory")]
    CreateScratch { source: io::Error },

    #[error(transparent)]
    Compress(#[from] compress::CompressError),

    #[error(transparent)]
    Gateway(#[from] gateway::Error),

    #[error("Failed to read metadata store {path:?}")]
    ReadStore { path: PathBuf, source: io::Error },

    #[error("Metadata store {path:?} is corrupt")]
    StoreCorrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write metadata store {path:?}")]
    WriteStore { path: PathBuf, source: io::Error },

    #[error("Vault {name:?} is not known to the metadata store")]
    VaultNotFound { name: String },

    #[error("Vault {name:?} already exists in the metadata store")]
    VaultExists { name: String },

    #[error("Archive {archive_id:?} is already recorded")]
    DuplicateArchive { archive_id: String },

    #[error("Archive {archive_id:?} is not recorded in the metadata store")]
    ArchiveNotFound { archive_id: String },

    #[error("Archive {archive_id:?} is still active and can't be finalized for deletion")]
    ArchiveStillActive { archive_id: String },

    #[error(transparent)]
    Lease(#[from] lease::Error),

    #[error("Failed to parse exclusion pattern")]
    ParseGlob { source: globset::Error },

    #[error("Cold storage support is not built into this binary")]
    GlacierNotBuilt,

    #[error(transparent)]
    Io(#[from] io::Error),
}

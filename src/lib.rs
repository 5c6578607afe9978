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

//! Coldstash backs up a directory tree to a cold-storage archival service.
//!
//! The files directly inside each directory are compressed into one bundle.
//! Bundles are only uploaded when their content changed since the last tracked
//! version, and superseded versions are deleted from the service after their
//! replacement is safely recorded.

pub mod backup;
pub mod bundle;
pub mod bundle_path;
pub mod compress;
pub mod config;
pub mod errors;
pub mod excludes;
pub mod gateway;
mod jsonio;
pub mod lease;
pub mod prune;
pub mod session;
pub mod show;
pub mod source;
pub mod stats;
pub mod store;
pub mod test_fixtures;
pub mod trace;
pub mod tracker;
pub mod treehash;

pub use crate::backup::{backup, BackupOptions};
pub use crate::bundle::{BuildOutcome, BundleBuilder, ScratchBundle};
pub use crate::bundle_path::BundlePath;
pub use crate::compress::{Compressor, CompressorKind};
pub use crate::config::Config;
pub use crate::errors::Error;
pub use crate::excludes::Exclude;
pub use crate::gateway::{ArchiveGateway, UploadReceipt};
pub use crate::prune::prune;
pub use crate::session::Session;
pub use crate::source::SourceTree;
pub use crate::stats::{BackupStats, PruneStats};
pub use crate::store::{BundleVersion, JsonStore, MetadataStore, Vault, VersionState};
pub use crate::tracker::{decide, Change, VersionTracker};
pub use crate::treehash::TreeHash;

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}

/// Prefix for scratch files and directories created by this program.
pub const TMP_PREFIX: &str = "tmp-coldstash-";

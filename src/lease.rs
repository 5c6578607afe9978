// Coldstash cold-storage backup.
// Copyright 2024-2026 Martin Pool.

//! Leases giving one process at a time write access to a metadata store.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

use crate::jsonio::{self, read_json};

pub static LEASE_FILENAME: &str = "LEASE";

/// A lease on a metadata store directory, released when dropped.
#[derive(Debug)]
pub struct Lease {
    path: PathBuf,
}

/// Contents of the lease file, identifying the holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseContent {
    pub host: String,
    pub pid: u32,
    pub client_version: String,
    #[serde(with = "time::serde::rfc3339")]
    pub acquired: OffsetDateTime,
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("Metadata store lease {path:?} is held by another process: {content:?}")]
    Busy {
        path: PathBuf,
        content: Box<LeaseContent>,
    },

    #[error("IO error on lease file {path:?}")]
    Io { path: PathBuf, source: io::Error },

    #[error("JSON error in lease file {path:?}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

type Result<T> = std::result::Result<T, Error>;

impl Lease {
    /// Acquire the lease on a store directory, if it is available.
    ///
    /// Returns [Error::Busy] if the lease is already held.
    #[instrument]
    pub fn acquire(dir: &Path) -> Result<Lease> {
        let path = dir.join(LEASE_FILENAME);
        let content = LeaseContent {
            host: hostname::get()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned(),
            pid: std::process::id(),
            client_version: crate::VERSION.to_string(),
            acquired: OffsetDateTime::now_utc(),
        };
        let mut s = serde_json::to_string(&content).map_err(|source| Error::Json {
            path: path.clone(),
            source,
        })?;
        s.push('\n');
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(s.as_bytes()).map_err(|source| Error::Io {
                        path: path.clone(),
                        source,
                    })?;
                    debug!(?path, "Acquired lease");
                    return Ok(Lease { path });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    match Lease::peek(dir)? {
                        Some(content) => {
                            return Err(Error::Busy {
                                path,
                                content: Box::new(content),
                            })
                        }
                        None => {
                            debug!("Lease file disappeared after conflict");
                            continue;
                        }
                    }
                }
                Err(source) => return Err(Error::Io { path, source }),
            }
        }
    }

    /// Remove any existing lease and then acquire a new one.
    ///
    /// Use this only when the process holding the lease is known to have gone.
    pub fn break_lock(dir: &Path) -> Result<Lease> {
        let path = dir.join(LEASE_FILENAME);
        match fs::remove_file(&path) {
            Ok(()) => warn!(?path, "Broke existing lease"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => (),
            Err(source) => return Err(Error::Io { path, source }),
        }
        Lease::acquire(dir)
    }

    /// Return information about the current leaseholder, if any.
    pub fn peek(dir: &Path) -> Result<Option<LeaseContent>> {
        let path = dir.join(LEASE_FILENAME);
        read_json(&path).map_err(|err| match err {
            jsonio::Error::Io(source) => Error::Io { path, source },
            jsonio::Error::Json(source) => Error::Json { path, source },
        })
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = ?self.path, "Released lease"),
            Err(err) => warn!(path = ?self.path, ?err, "Failed to release lease"),
        }
    }
}

// Coldstash cold-storage backup.
// Copyright 2015-2026 Martin Pool.

//! Read and write JSON files.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{trace, warn};

use crate::TMP_PREFIX;

/// Errors reading or writing a JSON file.
#[derive(Debug)]
pub(crate) enum Error {
    Io(io::Error),
    Json(serde_json::Error),
}

/// Write a pretty-printed JSON file atomically.
///
/// The content is written to a temporary file in the same directory and then
/// renamed over the destination, so readers only ever see complete files.
pub(crate) fn write_json<T: Serialize>(path: &Path, obj: &T) -> Result<(), Error> {
    let mut s = serde_json::to_string_pretty(obj).map_err(Error::Json)?;
    s.push('\n');
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(TMP_PREFIX)
        .tempfile_in(dir)
        .map_err(Error::Io)?;
    if let Err(err) = temp.write_all(s.as_bytes()).and_then(|()| temp.as_file().sync_all()) {
        warn!(?path, ?err, "Failed to write");
        return Err(Error::Io(err));
    }
    temp.persist(path).map_err(|err| Error::Io(err.error))?;
    trace!(?path, len = s.len(), "Wrote json");
    Ok(())
}

/// Read and deserialize a JSON file, returning None if it does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, Error> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(Error::Io(err)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(Error::Json)
}

// Copyright 2017-2026 Martin Pool.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! Snappy-framed tar bundles, written in-process.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::{instrument, trace, warn};

use super::{CompressError, CompressRequest, Compressor, Outcome};

const TOOL: &str = "tar-snappy";

/// Write a tar stream of the requested files through a Snappy frame encoder.
///
/// Entries are named by the file name alone. Files that vanish or can't be
/// read while the bundle is written are skipped and reported as a warning,
/// the way 7-Zip treats locked files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarSnappy;

impl Compressor for TarSnappy {
    fn name(&self) -> &'static str {
        TOOL
    }

    fn extension(&self) -> &'static str {
        ".tar.sz"
    }

    #[instrument(skip_all, fields(dest = ?request.dest))]
    fn compress(&self, request: &CompressRequest<'_>) -> Result<Outcome, CompressError> {
        let dest = request.dest;
        let fail = |source| CompressError::Io {
            path: dest.to_owned(),
            source,
        };
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .map_err(fail)?;
        let encoder = snap::write::FrameEncoder::new(file);
        let mut builder = tar::Builder::new(encoder);
        builder.follow_symlinks(true);
        let mut outcome = Outcome::Complete;
        for path in request.files {
            let Some(name) = path.file_name() else {
                continue;
            };
            match append_file(&mut builder, path, Path::new(name)) {
                Ok(()) => trace!(?path, "Added to bundle"),
                Err(err) => {
                    warn!(?path, ?err, "Skipped unreadable file");
                    outcome = Outcome::CompletedWithWarnings;
                }
            }
        }
        let mut encoder = builder.into_inner().map_err(fail)?;
        encoder.flush().map_err(fail)?;
        Ok(outcome)
    }
}

fn append_file<W: Write>(builder: &mut tar::Builder<W>, path: &Path, name: &Path) -> io::Result<()> {
    let mut file = File::open(path)?;
    builder.append_file(name, &mut file)
}

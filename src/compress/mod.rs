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

//! Abstracted compression tools that turn a directory's files into one bundle.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Exclude;

pub mod sevenzip;
pub mod tar_snappy;

/// What to put into a bundle.
#[derive(Debug)]
pub struct CompressRequest<'a> {
    /// Directory holding the files.
    pub dir: &'a Path,
    /// The files that qualify for the bundle, already filtered.
    pub files: &'a [PathBuf],
    /// Exclusions, for tools that select files themselves.
    pub exclude: &'a Exclude,
    /// Bundle file to create. It does not exist beforehand.
    pub dest: &'a Path,
}

/// A successful compression, possibly with some files left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    /// Some files could not be read, for example because they were locked,
    /// but the others were compressed.
    CompletedWithWarnings,
}

/// Compression failures, distinguished the way the tools report them.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CompressError {
    #[error("{tool}: fatal error")]
    Fatal { tool: &'static str },

    #[error("{tool}: command-line error")]
    CommandLine { tool: &'static str },

    #[error("{tool}: not enough memory for operation")]
    OutOfMemory { tool: &'static str },

    #[error("{tool}: stopped by the user")]
    UserAbort { tool: &'static str },

    #[error("{tool}: unexpected exit status {code:?}")]
    UnexpectedStatus {
        tool: &'static str,
        code: Option<i32>,
    },

    #[error("{tool}: reported success but wrote no bundle")]
    NoOutput { tool: &'static str },

    #[error("Failed to run {tool}")]
    Spawn {
        tool: &'static str,
        source: io::Error,
    },

    #[error("Failed to write bundle {path:?}")]
    Io { path: PathBuf, source: io::Error },
}

/// A tool that creates a compressed bundle from a list of files.
pub trait Compressor: fmt::Debug + Send + Sync {
    /// Short name for messages.
    fn name(&self) -> &'static str;

    /// Bundle file extension including the leading dot, like `".7z"`.
    fn extension(&self) -> &'static str;

    /// Create a bundle at `request.dest`.
    fn compress(&self, request: &CompressRequest<'_>) -> Result<Outcome, CompressError>;
}

/// Choice of compression tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum CompressorKind {
    /// Run the external `7z` program, writing BZip2 compressed 7z bundles.
    #[default]
    #[serde(rename = "7z")]
    #[value(name = "7z")]
    SevenZip,

    /// Write Snappy-compressed tar bundles without any external program.
    #[serde(rename = "tar-snappy")]
    #[value(name = "tar-snappy")]
    TarSnappy,
}

impl CompressorKind {
    pub fn compressor(self) -> Arc<dyn Compressor> {
        match self {
            CompressorKind::SevenZip => Arc::new(sevenzip::SevenZip::default()),
            CompressorKind::TarSnappy => Arc::new(tar_snappy::TarSnappy),
        }
    }
}

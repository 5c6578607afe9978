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

//! Tree hashes identify the content of a bundle.
//!
//! The data is split into 1 MiB chunks, each chunk is hashed with SHA-256,
//! and then adjacent pairs of hashes are concatenated and hashed again, level
//! by level, until one hash remains. An odd hash at the end of a level is
//! carried up unchanged. This is the checksum the cold storage service
//! computes for uploaded archives, so local and remote values compare directly.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::Error;
use crate::Result;

/// Size of the leaf chunks.
pub const CHUNK_SIZE: usize = 1 << 20;

const HASH_BYTES: usize = 32;

type Digest256 = [u8; HASH_BYTES];

/// A SHA-256 tree hash.
///
/// Stored in memory as bytes, and serialized as lowercase hex.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(into = "String")]
#[serde(try_from = "String")]
pub struct TreeHash {
    bin: Digest256,
}

impl TreeHash {
    /// Hash data held in memory.
    pub fn of_bytes(data: &[u8]) -> TreeHash {
        let mut leaves: Vec<Digest256> = data.chunks(CHUNK_SIZE).map(sha256).collect();
        if leaves.is_empty() {
            leaves.push(sha256(&[]));
        }
        TreeHash {
            bin: reduce(leaves),
        }
    }

    /// Hash everything from a reader.
    pub fn of_reader<R: Read>(mut reader: R) -> io::Result<TreeHash> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut leaves = Vec::new();
        loop {
            let len = read_chunk(&mut reader, &mut buf)?;
            if len == 0 && !leaves.is_empty() {
                break;
            }
            leaves.push(sha256(&buf[..len]));
            if len < CHUNK_SIZE {
                break;
            }
        }
        Ok(TreeHash {
            bin: reduce(leaves),
        })
    }

    /// Hash the content of a file, typically a finished bundle.
    pub fn of_file(path: &Path) -> Result<TreeHash> {
        let fail = |source| Error::ReadBundle {
            path: path.to_owned(),
            source,
        };
        let file = File::open(path).map_err(fail)?;
        TreeHash::of_reader(file).map_err(fail)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bin
    }
}

fn sha256(data: &[u8]) -> Digest256 {
    Sha256::digest(data).into()
}

/// Combine one level of hashes pairwise until one is left.
fn reduce(mut level: Vec<Digest256>) -> Digest256 {
    debug_assert!(!level.is_empty());
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => {
                    let mut hasher = Sha256::new();
                    hasher.update(a);
                    hasher.update(b);
                    hasher.finalize().into()
                }
                [a] => *a,
                _ => unreachable!(),
            })
            .collect();
    }
    level[0]
}

/// Fill `buf` as far as possible; returns the length read, which is
/// shorter than the buffer only at the end of the input.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

#[derive(Debug)]
pub struct TreeHashParseError {
    rejected_string: String,
}

impl fmt::Display for TreeHashParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to parse tree hash: {:?}", self.rejected_string)
    }
}

impl std::error::Error for TreeHashParseError {}

impl FromStr for TreeHash {
    type Err = TreeHashParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut bin = [0; HASH_BYTES];
        hex::decode_to_slice(s, &mut bin)
            .map_err(|_| TreeHashParseError {
                rejected_string: s.to_owned(),
            })
            .and(Ok(TreeHash { bin }))
    }
}

impl TryFrom<String> for TreeHash {
    type Error = TreeHashParseError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        TreeHash::from_str(&s)
    }
}

impl From<TreeHash> for String {
    fn from(hash: TreeHash) -> String {
        hex::encode(hash.bin)
    }
}

impl fmt::Display for TreeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.bin))
    }
}

impl fmt::Debug for TreeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

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

//! Settings read from a JSON config file and overridden from the command line.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::jsonio::{self, write_json};
use crate::{CompressorKind, Error, Result};

/// Settings for a run.
///
/// Every field is optional in the file; [Config::merge] lays command-line
/// values over it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// AWS account owning the vaults.
    pub account_id: Option<String>,
    /// Directory holding the metadata store.
    pub database: Option<PathBuf>,
    pub aws_profile: Option<String>,
    pub region: Option<String>,
    /// Root of the tree to back up.
    pub backup_directory: Option<PathBuf>,
    /// Vault receiving the bundles.
    pub vault: Option<String>,
    /// Directory for daily log files.
    pub log_dir: Option<PathBuf>,
    /// Exclusion patterns in addition to the defaults.
    pub exclude: Vec<String>,
    pub compressor: Option<CompressorKind>,
}

impl Config {
    /// Read a config file.
    pub fn load(path: &Path) -> Result<Config> {
        let bytes = fs::read(path).map_err(|source| Error::ReadConfig {
            path: path.to_owned(),
            source,
        })?;
        let config = serde_json::from_slice(&bytes).map_err(|source| Error::ParseConfig {
            path: path.to_owned(),
            source,
        })?;
        debug!(?path, ?config, "Loaded config");
        Ok(config)
    }

    /// Return a config with values from `overrides` replacing those here.
    ///
    /// Exclusion patterns from both are kept.
    #[must_use]
    pub fn merge(self, overrides: Config) -> Config {
        let mut exclude = self.exclude;
        exclude.extend(overrides.exclude);
        Config {
            account_id: overrides.account_id.or(self.account_id),
            database: overrides.database.or(self.database),
            aws_profile: overrides.aws_profile.or(self.aws_profile),
            region: overrides.region.or(self.region),
            backup_directory: overrides.backup_directory.or(self.backup_directory),
            vault: overrides.vault.or(self.vault),
            log_dir: overrides.log_dir.or(self.log_dir),
            exclude,
            compressor: overrides.compressor.or(self.compressor),
        }
    }

    /// A config showing every setting, for the operator to edit.
    pub fn sample() -> Config {
        Config {
            account_id: Some("123456789012".to_owned()),
            database: Some(PathBuf::from("/var/lib/coldstash")),
            aws_profile: Some("default".to_owned()),
            region: Some("us-east-1".to_owned()),
            backup_directory: Some(PathBuf::from("/home/me/Pictures")),
            vault: Some("pictures".to_owned()),
            log_dir: Some(PathBuf::from("/var/log/coldstash")),
            exclude: vec!["*.bak".to_owned()],
            compressor: Some(CompressorKind::SevenZip),
        }
    }

    /// Write [Config::sample] to a file.
    pub fn write_sample(path: &Path) -> Result<()> {
        write_json(path, &Config::sample()).map_err(|err| match err {
            jsonio::Error::Io(source) => Error::WriteConfig {
                path: path.to_owned(),
                source,
            },
            jsonio::Error::Json(source) => Error::ParseConfig {
                path: path.to_owned(),
                source,
            },
        })
    }

    pub fn account_id(&self) -> Result<&str> {
        self.account_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(Error::MissingConfig {
                name: "Account id",
                hint: "--account-id",
            })
    }

    pub fn database(&self) -> Result<&Path> {
        self.database.as_deref().ok_or(Error::MissingConfig {
            name: "Database directory",
            hint: "--database",
        })
    }

    pub fn backup_directory(&self) -> Result<&Path> {
        self.backup_directory
            .as_deref()
            .ok_or(Error::MissingConfig {
                name: "Backup directory",
                hint: "a SOURCE argument",
            })
    }

    pub fn vault(&self) -> Result<&str> {
        self.vault.as_deref().ok_or(Error::MissingConfig {
            name: "Vault name",
            hint: "--vault",
        })
    }

    pub fn compressor(&self) -> CompressorKind {
        self.compressor.unwrap_or_default()
    }
}

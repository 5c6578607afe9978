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

//! Command-line entry point for Coldstash backups.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn, Level};

use coldstash::session::SessionOptions;
use coldstash::show::{show_vault_paths, show_vaults, show_versions};
use coldstash::trace::{enable_tracing, TraceTimeStyle};
use coldstash::*;

/// Back up a directory tree to cold storage, one compressed bundle per directory.
#[derive(Debug, Parser)]
#[command(author, about, version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Read settings from this JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// AWS account owning the vaults.
    #[arg(long, global = true, env = "COLDSTASH_ACCOUNT_ID")]
    account_id: Option<String>,

    /// Directory holding the metadata store.
    #[arg(long, global = true, env = "COLDSTASH_DATABASE")]
    database: Option<PathBuf>,

    /// Named profile from the AWS config files.
    #[arg(long, global = true)]
    aws_profile: Option<String>,

    /// AWS region holding the vaults.
    #[arg(long, global = true)]
    region: Option<String>,

    /// Bundle compression tool.
    #[arg(long, value_enum, global = true)]
    compressor: Option<CompressorKind>,

    /// Show debug trace to stderr.
    #[arg(long, short = 'D', global = true)]
    debug: bool,

    /// Also write the log to daily files in this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Control timestamps prefixes on stderr.
    #[arg(long, value_enum, global = true, default_value_t = TraceTimeStyle::None)]
    trace_time: TraceTimeStyle,

    /// Append a json formatted log to this file.
    #[arg(long, global = true)]
    log_json: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload changed directories and delete superseded versions.
    Backup {
        /// Directory to back up.
        source: Option<PathBuf>,
        /// Vault to upload into.
        #[arg(long)]
        vault: Option<String>,
        /// Skip uploading, and only delete superseded versions.
        #[arg(long)]
        no_backup: bool,
        /// Don't delete superseded versions from the service.
        #[arg(long)]
        no_prune: bool,
        /// Pretend to upload, without contacting the service. Only archives
        /// from earlier pretend uploads are pretend-deleted.
        #[arg(long)]
        dummy_upload: bool,
        /// Break a lease left behind by a previous interrupted run.
        #[arg(long)]
        break_lock: bool,
        /// Exclude files matching this pattern, in addition to the defaults.
        #[arg(long, short)]
        exclude: Vec<String>,
        #[arg(long)]
        no_stats: bool,
    },

    /// Create a new vault.
    NewVault {
        /// Name for the vault.
        name: String,
        /// Record a vault without contacting the service.
        #[arg(long)]
        dummy_upload: bool,
    },

    /// List the bundles with a current version in a vault.
    Ls { vault: String },

    /// List every tracked version in a vault.
    Versions { vault: String },

    /// List known vaults.
    Vaults,

    /// Write a sample config file.
    SampleConfig { path: PathBuf },
}

enum ExitCode {
    Success = 0,
    Failure = 1,
    NonFatalErrors = 2,
}

impl std::process::Termination for ExitCode {
    fn report(self) -> std::process::ExitCode {
        (self as u8).into()
    }
}

impl Args {
    /// Settings given on the command line, to lay over the config file.
    fn overrides(&self) -> Config {
        let mut config = Config {
            account_id: self.account_id.clone(),
            database: self.database.clone(),
            aws_profile: self.aws_profile.clone(),
            region: self.region.clone(),
            log_dir: self.log_dir.clone(),
            compressor: self.compressor,
            ..Default::default()
        };
        if let Command::Backup {
            source,
            vault,
            exclude,
            ..
        } = &self.command
        {
            config.backup_directory = source.clone();
            config.vault = vault.clone();
            config.exclude = exclude.clone();
        }
        config
    }

    fn load_config(&self) -> Result<Config> {
        let file = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        Ok(file.merge(self.overrides()))
    }
}

impl Command {
    fn run(&self, config: &Config) -> Result<ExitCode> {
        let mut stdout = io::stdout();
        let mut exit_code = ExitCode::Success;
        match self {
            Command::Backup {
                no_backup,
                no_prune,
                dummy_upload,
                break_lock,
                no_stats,
                ..
            } => {
                let vault = config.vault()?;
                let session = Session::from_config(
                    config,
                    SessionOptions {
                        dummy_upload: *dummy_upload,
                        break_lock: *break_lock,
                        read_only: false,
                    },
                )?;
                if !no_backup {
                    let source = SourceTree::open(config.backup_directory()?)?;
                    let options = BackupOptions {
                        exclude: Exclude::with_extra(&config.exclude)?,
                        ..Default::default()
                    };
                    let stats = backup(&session, &source, vault, &options)?;
                    if !no_stats {
                        writeln!(stdout, "Backup complete.\n{stats}")?;
                    }
                    if stats.error_count() > 0 {
                        exit_code = ExitCode::NonFatalErrors;
                    }
                }
                if !no_prune {
                    let stats = prune(&session, vault)?;
                    if !no_stats {
                        writeln!(stdout, "Prune complete.\n{stats}")?;
                    }
                    if stats.delete_errors > 0 {
                        exit_code = ExitCode::NonFatalErrors;
                    }
                }
            }
            Command::NewVault { name, dummy_upload } => {
                let session = Session::from_config(
                    config,
                    SessionOptions {
                        dummy_upload: *dummy_upload,
                        ..Default::default()
                    },
                )?;
                let vault = session.create_vault(name)?;
                writeln!(stdout, "{}", vault.location)?;
            }
            Command::Ls { vault } => {
                let store = JsonStore::open(config.database()?)?;
                show_vault_paths(&store, vault, &mut stdout)?;
            }
            Command::Versions { vault } => {
                let store = JsonStore::open(config.database()?)?;
                show_versions(&store, vault, &mut stdout)?;
            }
            Command::Vaults => {
                let store = JsonStore::open(config.database()?)?;
                show_vaults(&store, &mut stdout)?;
            }
            Command::SampleConfig { path } => {
                Config::write_sample(path)?;
                info!("Wrote sample config to {path:?}");
            }
        }
        Ok(exit_code)
    }
}

fn report_error(err: &coldstash::Error) {
    error!("{err}");
    let mut err: &dyn Error = err;
    while let Some(source) = err.source() {
        error!("caused by: {source}");
        err = source;
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let start_time = Instant::now();
    let trace_level = if args.debug {
        Level::TRACE
    } else {
        Level::INFO
    };
    let config = args.load_config();
    let log_dir = config.as_ref().ok().and_then(|c| c.log_dir.clone());
    let _guards = match enable_tracing(
        args.trace_time,
        trace_level,
        log_dir.as_deref(),
        args.log_json.as_deref(),
    ) {
        Ok(guards) => guards,
        Err(err) => {
            eprintln!("Failed to start logging: {err}");
            return ExitCode::Failure;
        }
    };
    let result = config.and_then(|config| args.command.run(&config));
    debug!(elapsed = ?start_time.elapsed());
    match result {
        Err(err) => {
            report_error(&err);
            ExitCode::Failure
        }
        Ok(exit_code) => exit_code,
    }
}

#[test]
fn verify_clap() {
    use clap::CommandFactory;
    Args::command().debug_assert()
}

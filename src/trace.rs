// Coldstash cold-storage backup.
// Copyright 2015-2026 Martin Pool.

//! Route tracing output to the terminal and log files.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use tracing::{trace, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::Registry;

use crate::Result;

/// Name prefix of the daily log files written into the log directory.
pub const LOG_FILE_PREFIX: &str = "coldstash";

/// Chosen style of timestamp prefix on trace lines.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceTimeStyle {
    /// No timestamp on trace lines.
    #[default]
    None,
    /// Universal time, in RFC 3339 style.
    Utc,
    /// Local time, in RFC 3339, using the offset when the program starts.
    Local,
    /// Time since the start of the process, in seconds.
    Relative,
}

/// Install the global tracing subscriber.
///
/// Messages at `console_level` and above go to stderr. If `log_dir` is given,
/// the same messages are also appended to a log file there that rolls over
/// daily. If `json_path` is given, everything is appended to it as JSON.
///
/// The returned guards must be held until the program exits, so that
/// buffered log lines are flushed.
#[must_use = "Dropping the guards stops writing to the log files"]
pub fn enable_tracing(
    time_style: TraceTimeStyle,
    console_level: Level,
    log_dir: Option<&Path>,
    json_path: Option<&Path>,
) -> Result<Vec<WorkerGuard>> {
    use tracing_subscriber::fmt::time;
    fn hookup<FT>(
        timer: FT,
        console_level: Level,
        log_dir: Option<&Path>,
        json_path: Option<&Path>,
    ) -> Result<Vec<WorkerGuard>>
    where
        FT: FormatTime + Clone + Send + Sync + 'static,
    {
        let mut guards = Vec::new();
        let targets = filter::Targets::new().with_target("coldstash", console_level);
        let console_layer = tracing_subscriber::fmt::Layer::default()
            .with_ansi(clicolors_control::colors_enabled())
            .with_writer(io::stderr)
            .with_timer(timer.clone())
            .with_filter(targets.clone());
        let file_layer = match log_dir {
            Some(log_dir) => {
                fs::create_dir_all(log_dir)?;
                let appender = RollingFileAppender::builder()
                    .rotation(Rotation::DAILY)
                    .filename_prefix(LOG_FILE_PREFIX)
                    .filename_suffix("log")
                    .build(log_dir)
                    .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                guards.push(guard);
                Some(
                    tracing_subscriber::fmt::Layer::default()
                        .with_ansi(false)
                        .with_writer(non_blocking)
                        .with_timer(timer)
                        .with_filter(targets),
                )
            }
            None => None,
        };
        let json_layer = match json_path {
            Some(json_path) => {
                let file_writer = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(json_path)?;
                let (non_blocking, guard) = tracing_appender::non_blocking(file_writer);
                guards.push(guard);
                Some(
                    tracing_subscriber::fmt::Layer::default()
                        .json()
                        .with_writer(non_blocking),
                )
            }
            None => None,
        };
        Registry::default()
            .with(console_layer)
            .with(file_layer)
            .with(json_layer)
            .init();
        Ok(guards)
    }

    let guards = match time_style {
        TraceTimeStyle::None => hookup((), console_level, log_dir, json_path),
        TraceTimeStyle::Utc => hookup(
            time::UtcTime::rfc_3339(),
            console_level,
            log_dir,
            json_path,
        ),
        TraceTimeStyle::Relative => hookup(time::uptime(), console_level, log_dir, json_path),
        TraceTimeStyle::Local => match time::OffsetTime::local_rfc_3339() {
            Ok(timer) => hookup(timer, console_level, log_dir, json_path),
            // The local offset can't always be determined, for example in
            // multithreaded processes on some platforms.
            Err(_) => hookup(
                time::UtcTime::rfc_3339(),
                console_level,
                log_dir,
                json_path,
            ),
        },
    }?;
    trace!("Tracing enabled");
    Ok(guards)
}

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

//! Bundles written by the external 7-Zip program.

use std::ffi::OsString;
use std::process::{Command, Stdio};

use tracing::{debug, instrument, warn};

use super::{CompressError, CompressRequest, Compressor, Outcome};

const TOOL: &str = "7z";

/// Run `7z` to build BZip2-compressed 7z bundles.
#[derive(Debug, Clone)]
pub struct SevenZip {
    /// Program to run.
    program: OsString,
}

impl Default for SevenZip {
    fn default() -> Self {
        SevenZip {
            program: TOOL.into(),
        }
    }
}

impl SevenZip {
    /// Use a specific 7-Zip binary, such as `7za`.
    pub fn with_program<S: Into<OsString>>(program: S) -> SevenZip {
        SevenZip {
            program: program.into(),
        }
    }

    /// Arguments for one run.
    ///
    /// The source is a glob over the directory, with subdirectories and the
    /// excluded patterns left out non-recursively.
    fn args(request: &CompressRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["a".into(), "-t7z".into(), request.dest.into()];
        args.push(request.dir.join("*").into());
        args.extend(["-m0=BZip2", "-y", "-aoa", "-xr-!*/"].map(OsString::from));
        for pattern in request.exclude.patterns() {
            args.push(format!("-xr-!{pattern}").into());
        }
        args
    }
}

/// Interpret a 7-Zip exit code.
pub(crate) fn interpret_status(code: Option<i32>) -> Result<Outcome, CompressError> {
    match code {
        Some(0) => Ok(Outcome::Complete),
        Some(1) => Ok(Outcome::CompletedWithWarnings),
        Some(2) => Err(CompressError::Fatal { tool: TOOL }),
        Some(7) => Err(CompressError::CommandLine { tool: TOOL }),
        Some(8) => Err(CompressError::OutOfMemory { tool: TOOL }),
        Some(255) => Err(CompressError::UserAbort { tool: TOOL }),
        code => Err(CompressError::UnexpectedStatus { tool: TOOL, code }),
    }
}

impl Compressor for SevenZip {
    fn name(&self) -> &'static str {
        TOOL
    }

    fn extension(&self) -> &'static str {
        ".7z"
    }

    #[instrument(skip_all, fields(dest = ?request.dest))]
    fn compress(&self, request: &CompressRequest<'_>) -> Result<Outcome, CompressError> {
        let args = SevenZip::args(request);
        debug!(?args, "Run 7z");
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| CompressError::Spawn { tool: TOOL, source })?;
        let result = interpret_status(output.status.code());
        match &result {
            Ok(Outcome::Complete) => (),
            Ok(Outcome::CompletedWithWarnings) => {
                warn!(
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "7z reported non-fatal warnings"
                );
            }
            Err(err) => {
                warn!(
                    %err,
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "7z failed"
                );
            }
        }
        result
    }
}

/*
 * nayur - A small helper for the Arch User Repository.
 * Copyright (C) 2025  nayur contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Helpers for running the external tools nayur drives.

use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use crate::error::{NayurError, NayurResult};

/// Resolve `tool` on PATH
pub fn require_tool(tool: &str) -> NayurResult<PathBuf> {
    which::which(tool).map_err(|_| NayurError::ToolMissing {
        tool: tool.to_string(),
    })
}

/// Whether the current process runs as root
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Run `cmd` with captured output, logging both streams at debug level.
pub fn run_captured(mut cmd: Command, label: &str, package: &str) -> NayurResult<()> {
    tracing::debug!("running {:?}", cmd);
    let output = cmd.output().map_err(|e| spawn_error(label, e))?;

    tracing::debug!("{} exit code: {:?}", label, output.status.code());
    tracing::debug!("{} stdout:\n{}", label, String::from_utf8_lossy(&output.stdout));
    tracing::debug!("{} stderr:\n{}", label, String::from_utf8_lossy(&output.stderr));

    check_status(output.status, label, package)
}

/// Run `cmd` attached to the terminal
pub fn run_inherited(mut cmd: Command, label: &str, package: &str) -> NayurResult<()> {
    tracing::debug!("running {:?}", cmd);
    let status = cmd.status().map_err(|e| spawn_error(label, e))?;
    tracing::debug!("{} exit code: {:?}", label, status.code());

    check_status(status, label, package)
}

fn check_status(status: ExitStatus, label: &str, package: &str) -> NayurResult<()> {
    if status.success() {
        Ok(())
    } else {
        Err(NayurError::CommandFailed {
            command: label.to_string(),
            package: package.to_string(),
            exit_code: status.code(),
        })
    }
}

fn spawn_error(label: &str, e: std::io::Error) -> NayurError {
    if e.kind() == std::io::ErrorKind::NotFound {
        NayurError::ToolMissing {
            tool: label.split_whitespace().next().unwrap_or(label).to_string(),
        }
    } else {
        NayurError::filesystem(label, "failed to start process", e)
    }
}

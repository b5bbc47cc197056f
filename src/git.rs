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

//! Git operations on cached package repositories.

use std::path::Path;
use std::process::Command;

use crate::error::NayurResult;
use crate::process::{require_tool, run_captured};

/// Clone `url` into `dest`. `dest` may already exist if it is empty.
pub fn clone_repository(url: &str, dest: &Path, package: &str) -> NayurResult<()> {
    let git = require_tool("git")?;

    let mut cmd = Command::new(git);
    cmd.arg("clone").arg(url).arg(dest);
    run_captured(cmd, "git clone", package)
}

/// Pull the latest changes inside an existing clone
pub fn pull(repo: &Path, package: &str) -> NayurResult<()> {
    let git = require_tool("git")?;

    let mut cmd = Command::new(git);
    cmd.arg("pull").current_dir(repo);
    run_captured(cmd, "git pull", package)
}

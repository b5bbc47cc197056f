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

//! makepkg driver for cached package repositories.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{NayurError, NayurResult};
use crate::process::{is_root, require_tool, run_inherited};

/// Sync dependencies, force a rebuild, never prompt
pub const MAKEPKG_ARGS: [&str; 3] = ["-s", "-f", "--noconfirm"];

/// Builds packages in place with makepkg
#[derive(Debug, Default)]
pub struct AurBuilder {
    extra_args: Vec<String>,
}

impl AurBuilder {
    /// Extra flags appended after the defaults
    pub fn with_args(extra_args: Vec<String>) -> Self {
        Self { extra_args }
    }

    /// Full makepkg argument list
    pub fn args(&self) -> Vec<String> {
        MAKEPKG_ARGS
            .iter()
            .map(|a| a.to_string())
            .chain(self.extra_args.iter().cloned())
            .collect()
    }

    /// Build the package whose PKGBUILD lives in `build_dir`.
    ///
    /// makepkg refuses to run as root, so that case is rejected up front.
    pub fn build(&self, build_dir: &Path, package: &str) -> NayurResult<()> {
        if is_root() {
            return Err(NayurError::PermissionDenied {
                operation: "makepkg cannot be run as root; run nayur as a normal user".to_string(),
            });
        }

        let makepkg = require_tool("makepkg")?;
        let args = self.args();
        tracing::info!("running makepkg {} in {}", args.join(" "), build_dir.display());

        let mut cmd = Command::new(makepkg);
        cmd.args(&args)
            .current_dir(build_dir)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        run_inherited(cmd, "makepkg", package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let builder = AurBuilder::default();
        assert_eq!(builder.args(), vec!["-s", "-f", "--noconfirm"]);
    }

    #[test]
    fn test_extra_args_follow_defaults() {
        let builder = AurBuilder::with_args(vec!["--skippgpcheck".to_string()]);
        assert_eq!(builder.args(), vec!["-s", "-f", "--noconfirm", "--skippgpcheck"]);
    }
}

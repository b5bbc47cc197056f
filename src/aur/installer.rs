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

//! Installs built artifacts with pacman.

use std::ffi::CStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::SystemTime;

use crate::error::{NayurError, NayurResult};
use crate::process::{is_root, require_tool, run_inherited};

const ARTIFACT_EXT: &str = ".pkg.tar.zst";

/// Machine hardware name, as `uname -m` reports it
pub fn machine_arch() -> String {
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } == 0 {
        let machine = unsafe { CStr::from_ptr(uts.machine.as_ptr()) };
        return machine.to_string_lossy().into_owned();
    }
    std::env::consts::ARCH.to_string()
}

/// Finds and installs build artifacts for one architecture
pub struct AurInstaller {
    arch: String,
}

impl AurInstaller {
    /// Installer for the running machine
    pub fn new() -> Self {
        Self::for_arch(machine_arch())
    }

    pub fn for_arch(arch: impl Into<String>) -> Self {
        Self { arch: arch.into() }
    }

    /// Glob-style pattern of the artifacts this installer picks up
    pub fn pattern(&self) -> String {
        format!("*-{}{}", self.arch, ARTIFACT_EXT)
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name
            .strip_suffix(ARTIFACT_EXT)
            .and_then(|stem| stem.strip_suffix(self.arch.as_str()))
            .is_some_and(|stem| stem.len() > 1 && stem.ends_with('-'))
    }

    /// Matching artifacts in `dir`, most recently modified first
    pub fn find_artifacts(&self, dir: &Path) -> NayurResult<Vec<PathBuf>> {
        let entries = fs::read_dir(dir).map_err(|e| {
            NayurError::filesystem(dir.display().to_string(), "failed to read package directory", e)
        })?;

        let mut artifacts: Vec<(SystemTime, PathBuf)> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| self.matches(n))
            })
            .map(|path| {
                let modified = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path)
            })
            .collect();

        artifacts.sort_by(|a, b| b.0.cmp(&a.0));
        tracing::debug!("artifacts matching {} in {}: {:?}", self.pattern(), dir.display(), artifacts);

        Ok(artifacts.into_iter().map(|(_, path)| path).collect())
    }

    /// Hand one artifact to `pacman -U`
    pub fn install_artifact(&self, artifact: &Path, package: &str) -> NayurResult<()> {
        let pacman = require_tool("pacman")?;
        let artifact = artifact
            .canonicalize()
            .map_err(|e| NayurError::filesystem(artifact.display().to_string(), "artifact not readable", e))?;

        let mut cmd = if is_root() {
            Command::new(pacman)
        } else {
            let mut sudo = Command::new(require_tool("sudo")?);
            sudo.arg(pacman);
            sudo
        };
        cmd.args(["-U", "--noconfirm"])
            .arg(&artifact)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        run_inherited(cmd, "pacman -U", package)
    }

    /// Install the newest artifact that pacman accepts, trying older ones on failure.
    ///
    /// The installed artifact is deleted afterwards. Returns its path.
    pub fn install(&self, dir: &Path, package: &str) -> NayurResult<PathBuf> {
        let artifacts = self.find_artifacts(dir)?;
        if artifacts.is_empty() {
            return Err(NayurError::NoArtifacts {
                package: package.to_string(),
                pattern: self.pattern(),
            });
        }

        let mut last_error = None;
        for artifact in artifacts {
            tracing::info!("trying {}", artifact.display());
            match self.install_artifact(&artifact, package) {
                Ok(()) => {
                    if let Err(e) = fs::remove_file(&artifact) {
                        tracing::warn!("could not remove {}: {}", artifact.display(), e);
                    }
                    return Ok(artifact);
                }
                Err(e) => {
                    tracing::warn!("failed on {}: {}", artifact.display(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| NayurError::NoArtifacts {
            package: package.to_string(),
            pattern: self.pattern(),
        }))
    }
}

impl Default for AurInstaller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
        path
    }

    #[test]
    fn test_pattern() {
        let installer = AurInstaller::for_arch("x86_64");
        assert_eq!(installer.pattern(), "*-x86_64.pkg.tar.zst");
    }

    #[test]
    fn test_machine_arch_not_empty() {
        assert!(!machine_arch().is_empty());
    }

    #[test]
    fn test_find_artifacts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let installer = AurInstaller::for_arch("x86_64");

        let old = touch(dir.path(), "yay-12.0.0-1-x86_64.pkg.tar.zst", 3600);
        let new = touch(dir.path(), "yay-12.1.0-1-x86_64.pkg.tar.zst", 10);
        touch(dir.path(), "yay-12.1.0-1-aarch64.pkg.tar.zst", 0);
        touch(dir.path(), "yay-debug-12.1.0-1-x86_64.pkg.tar.xz", 0);
        touch(dir.path(), "PKGBUILD", 0);
        touch(dir.path(), "-x86_64.pkg.tar.zst", 0);

        let found = installer.find_artifacts(dir.path()).unwrap();
        assert_eq!(found, vec![new, old]);
    }

    #[test]
    fn test_install_without_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let installer = AurInstaller::for_arch("x86_64");

        let err = installer.install(dir.path(), "yay").unwrap_err();
        assert!(matches!(err, NayurError::NoArtifacts { ref package, .. } if package == "yay"));
    }
}

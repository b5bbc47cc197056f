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

//! Local cache of cloned AUR repositories, one directory per package.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{NayurError, NayurResult};

/// A package directory found in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRepo {
    pub name: String,
    pub path: PathBuf,
    /// false when the directory exists but holds nothing
    pub populated: bool,
}

/// Repository cache manager
pub struct RepoCache {
    root: PathBuf,
}

impl RepoCache {
    /// Open the cache rooted at `root`, creating it if needed
    pub fn new(root: impl Into<PathBuf>) -> NayurResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            NayurError::filesystem(root.display().to_string(), "failed to create cache directory", e)
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a package. Names are case-insensitive.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name.to_lowercase())
    }

    /// Whether the package has a directory in the cache.
    ///
    /// Names that would leave the cache root are never cached.
    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.path(name).is_dir()
    }

    /// Whether the package directory exists and has no entries
    pub fn is_empty(&self, name: &str) -> bool {
        self.exists(name) && dir_is_empty(&self.path(name))
    }

    /// All cached packages, sorted by name. Plain files are skipped.
    pub fn list(&self) -> NayurResult<Vec<CachedRepo>> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            NayurError::filesystem(self.root.display().to_string(), "failed to read cache directory", e)
        })?;

        let mut repos: Vec<CachedRepo> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                let populated = !dir_is_empty(&path);
                Some(CachedRepo { name, path, populated })
            })
            .collect();

        repos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(repos)
    }

    /// Create an empty directory for a package that is not cached yet
    pub fn prepare(&self, name: &str) -> NayurResult<PathBuf> {
        validate_name(name)?;
        let path = self.path(name);
        if path.exists() {
            return Err(NayurError::AlreadyCached {
                package: name.to_lowercase(),
            });
        }

        fs::create_dir_all(&path).map_err(|e| {
            NayurError::filesystem(path.display().to_string(), "failed to create package directory", e)
        })?;
        Ok(path)
    }

    /// Delete a package directory
    pub fn remove(&self, name: &str) -> NayurResult<()> {
        validate_name(name)?;
        let path = self.path(name);
        if !path.exists() {
            return Err(NayurError::NotCached {
                package: name.to_lowercase(),
            });
        }

        tracing::debug!("removing {}", path.display());
        fs::remove_dir_all(&path)
            .map_err(|e| NayurError::filesystem(path.display().to_string(), "failed to remove package", e))
    }

    /// Delete every package directory, stopping at the first failure.
    ///
    /// Returns the names removed. Files next to the package directories
    /// (such as the log file) are left alone.
    pub fn clear(&self) -> NayurResult<Vec<String>> {
        let mut removed = Vec::new();
        for repo in self.list()? {
            fs::remove_dir_all(&repo.path).map_err(|e| {
                NayurError::filesystem(repo.path.display().to_string(), "failed to remove package", e)
            })?;
            tracing::debug!("removed {}", repo.name);
            removed.push(repo.name);
        }
        Ok(removed)
    }
}

fn dir_is_empty(path: &Path) -> bool {
    path.is_dir()
        && fs::read_dir(path)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false)
}

/// Reject names that would escape the cache root
fn validate_name(name: &str) -> NayurResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\0') {
        return Err(NayurError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> (tempfile::TempDir, RepoCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = RepoCache::new(dir.path().join("nayur")).unwrap();
        (dir, cache)
    }

    #[test]
    fn test_states() {
        let (_dir, cache) = cache();

        assert!(!cache.exists("yay"));
        assert!(!cache.is_empty("yay"));

        cache.prepare("yay").unwrap();
        assert!(cache.exists("yay"));
        assert!(cache.is_empty("yay"));

        fs::write(cache.path("yay").join("PKGBUILD"), "pkgname=yay").unwrap();
        assert!(cache.exists("yay"));
        assert!(!cache.is_empty("yay"));
    }

    #[test]
    fn test_names_are_lowercased() {
        let (_dir, cache) = cache();

        cache.prepare("Yay").unwrap();
        assert!(cache.exists("YAY"));
        assert_eq!(cache.path("YaY"), cache.root().join("yay"));
    }

    #[test]
    fn test_prepare_twice() {
        let (_dir, cache) = cache();

        cache.prepare("yay").unwrap();
        assert!(matches!(cache.prepare("yay"), Err(NayurError::AlreadyCached { .. })));
    }

    #[test]
    fn test_invalid_names() {
        let (_dir, cache) = cache();

        for name in ["", ".", "..", "../etc", "a/b"] {
            assert!(matches!(cache.prepare(name), Err(NayurError::InvalidName { .. })));
        }
    }

    #[test]
    fn test_parent_directory_is_not_cached() {
        let (_dir, cache) = cache();

        // The cache root's parent exists and is not empty
        assert!(cache.root().parent().unwrap().is_dir());
        for name in ["..", ".", ""] {
            assert!(!cache.exists(name));
            assert!(!cache.is_empty(name));
        }
        assert!(matches!(cache.remove(".."), Err(NayurError::InvalidName { .. })));
    }

    #[test]
    fn test_list_sorted_and_skips_files() {
        let (_dir, cache) = cache();

        cache.prepare("zoom").unwrap();
        cache.prepare("alpha").unwrap();
        fs::write(cache.path("alpha").join("PKGBUILD"), "").unwrap();
        fs::write(cache.root().join("nayur.log"), "log").unwrap();

        let repos = cache.list().unwrap();
        let names: Vec<&str> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zoom"]);
        assert!(repos[0].populated);
        assert!(!repos[1].populated);
    }

    #[test]
    fn test_remove() {
        let (_dir, cache) = cache();

        assert!(matches!(cache.remove("yay"), Err(NayurError::NotCached { .. })));

        cache.prepare("yay").unwrap();
        cache.remove("yay").unwrap();
        assert!(!cache.exists("yay"));
    }

    #[test]
    fn test_clear_keeps_log_file() {
        let (_dir, cache) = cache();

        cache.prepare("a").unwrap();
        cache.prepare("b").unwrap();
        fs::write(cache.root().join("nayur.log"), "log").unwrap();

        let removed = cache.clear().unwrap();
        assert_eq!(removed, vec!["a".to_string(), "b".to_string()]);
        assert!(cache.list().unwrap().is_empty());
        assert!(cache.root().join("nayur.log").exists());
    }
}

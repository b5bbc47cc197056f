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

//! Error types shared by the AUR client, the cache and the tool drivers.

use thiserror::Error;

/// Main error type for nayur operations
#[derive(Debug, Error)]
pub enum NayurError {
    /// Connection or transport failure talking to the AUR
    #[error("Network error for {url}: {message}")]
    Network {
        url: String,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The AUR answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// The RPC body carried an `error` field
    #[error("AUR RPC error: {message}")]
    Rpc { message: String },

    /// AUR package not found
    #[error("AUR package '{package}' not found")]
    PackageNotFound { package: String },

    /// Name that cannot be used as a cache key
    #[error("Invalid package name '{name}'")]
    InvalidName { name: String },

    /// Package has no directory in the local cache
    #[error("Package '{package}' does not exist in cache")]
    NotCached { package: String },

    /// Package directory already present in the local cache
    #[error("Package '{package}' already exists in cache")]
    AlreadyCached { package: String },

    /// An external tool (git, makepkg, pacman) exited unsuccessfully
    #[error("{command} failed for '{package}' (exit code {})", .exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    CommandFailed {
        command: String,
        package: String,
        exit_code: Option<i32>,
    },

    /// An external tool is not on PATH
    #[error("Required tool '{tool}' was not found in PATH")]
    ToolMissing { tool: String },

    /// No build artifacts matched the machine architecture
    #[error("No build artifacts found for '{package}' matching '{pattern}'")]
    NoArtifacts { package: String, pattern: String },

    /// Permission denied
    #[error("Permission denied: {operation}")]
    PermissionDenied { operation: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File system errors
    #[error("File system error for '{path}': {message}")]
    FileSystem {
        path: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl NayurError {
    /// Create a network error from a reqwest failure
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        NayurError::Network {
            url: url.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a filesystem error
    pub fn filesystem(path: impl Into<String>, message: impl Into<String>, source: std::io::Error) -> Self {
        NayurError::FileSystem {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Remote errors degrade resolution instead of aborting it
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            NayurError::Network { .. } | NayurError::HttpStatus { .. } | NayurError::Rpc { .. }
        )
    }
}

/// Result type alias for nayur operations
pub type NayurResult<T> = std::result::Result<T, NayurError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NayurError::PackageNotFound {
            package: "test-pkg".to_string(),
        };
        assert_eq!(format!("{}", err), "AUR package 'test-pkg' not found");
    }

    #[test]
    fn test_command_failed_display() {
        let err = NayurError::CommandFailed {
            command: "makepkg".to_string(),
            package: "yay".to_string(),
            exit_code: Some(4),
        };
        assert_eq!(format!("{}", err), "makepkg failed for 'yay' (exit code 4)");

        let err = NayurError::CommandFailed {
            command: "git clone".to_string(),
            package: "yay".to_string(),
            exit_code: None,
        };
        assert_eq!(format!("{}", err), "git clone failed for 'yay' (exit code none)");
    }

    #[test]
    fn test_is_remote() {
        let err = NayurError::HttpStatus {
            url: "https://aur.archlinux.org/rpc/v5/info".to_string(),
            status: 503,
        };
        assert!(err.is_remote());

        let err = NayurError::NotCached {
            package: "yay".to_string(),
        };
        assert!(!err.is_remote());
    }
}

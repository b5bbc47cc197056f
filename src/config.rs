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

//! Configuration management with validation and defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aur::resolver::ResolveOptions;
use crate::error::{NayurError, NayurResult};

/// Main configuration structure for nayur
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one cloned repository per package
    pub cache_dir: PathBuf,

    /// AUR RPC base URL (v5)
    pub rpc_url: String,

    /// AUR base URL used to build git remotes
    pub aur_url: String,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,

    /// Log level written to the log file
    pub log_level: String,

    /// Flags appended to `makepkg -s -f --noconfirm`
    pub makepkg_args: Vec<String>,

    /// Dependency resolution settings
    pub resolver: ResolverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            rpc_url: "https://aur.archlinux.org/rpc/v5/".to_string(),
            aur_url: "https://aur.archlinux.org/".to_string(),
            request_timeout_secs: 30,
            log_level: "info".to_string(),
            makepkg_args: Vec::new(),
            resolver: ResolverConfig::default(),
        }
    }
}

/// Dependency resolution settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Follow dependencies of dependencies
    pub recursive: bool,

    /// Expand OptDepends
    pub optional: bool,

    /// Expand MakeDepends
    pub make: bool,

    /// Delay added per throttle step, in milliseconds
    pub throttle_step_ms: u64,

    /// Number of depth levels per throttle step
    pub throttle_every: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            optional: true,
            make: true,
            throttle_step_ms: 75,
            throttle_every: 10,
        }
    }
}

impl ResolverConfig {
    /// Resolver options seeded from the configuration
    pub fn options(&self) -> ResolveOptions {
        ResolveOptions {
            recursive: self.recursive,
            optional: self.optional,
            make: self.make,
            throttle_step: Duration::from_millis(self.throttle_step_ms),
            throttle_every: self.throttle_every,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("nayur")
}

impl Config {
    /// Load configuration from multiple sources with precedence:
    /// 1. /etc/nayur/nayur.toml (system-wide)
    /// 2. ~/.config/nayur/config.toml (user)
    /// 3. Environment variables (NAYUR_*)
    ///
    /// Files that fail to parse are skipped. Their errors are returned
    /// alongside the config so they can be logged once logging is up.
    pub fn load() -> (Self, Vec<NayurError>) {
        let mut config = Config::default();
        let mut warnings = Vec::new();

        let mut paths = vec![PathBuf::from("/etc/nayur/nayur.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("nayur").join("config.toml"));
        }

        for path in paths {
            match Self::read_file(&path) {
                Ok(Some(parsed)) => config = config.merge(parsed),
                Ok(None) => {}
                Err(e) => warnings.push(e),
            }
        }

        (config.apply_env_overrides(), warnings)
    }

    /// Parse one config file, `None` when it does not exist
    fn read_file(path: &Path) -> NayurResult<Option<Config>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(NayurError::filesystem(
                    path.display().to_string(),
                    "failed to read config",
                    e,
                ))
            }
        };

        toml::from_str::<Config>(&content)
            .map(Some)
            .map_err(|e| NayurError::Config {
                message: format!("ignoring invalid config {}: {}", path.display(), e),
            })
    }

    /// Merge another config into this one (other takes precedence for non-default values)
    fn merge(mut self, other: Config) -> Self {
        let default = Config::default();

        if other.cache_dir != default.cache_dir {
            self.cache_dir = other.cache_dir;
        }
        if other.rpc_url != default.rpc_url {
            self.rpc_url = other.rpc_url;
        }
        if other.aur_url != default.aur_url {
            self.aur_url = other.aur_url;
        }
        if other.request_timeout_secs != default.request_timeout_secs {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        if other.log_level != default.log_level {
            self.log_level = other.log_level;
        }
        if other.makepkg_args != default.makepkg_args {
            self.makepkg_args = other.makepkg_args;
        }
        if other.resolver != default.resolver {
            self.resolver = other.resolver;
        }

        self
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("NAYUR_CACHE_DIR") {
            if !val.is_empty() {
                self.cache_dir = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var("NAYUR_RPC_URL") {
            self.rpc_url = val;
        }

        if let Ok(val) = std::env::var("NAYUR_LOG_LEVEL") {
            self.log_level = val;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> NayurResult<()> {
        let invalid = |message: &str| {
            Err(NayurError::Config {
                message: message.to_string(),
            })
        };

        if self.rpc_url.trim().is_empty() {
            return invalid("rpc_url must not be empty");
        }
        if self.aur_url.trim().is_empty() {
            return invalid("aur_url must not be empty");
        }
        if self.request_timeout_secs == 0 {
            return invalid("request_timeout_secs must be at least 1");
        }
        if self.resolver.throttle_every == 0 {
            return invalid("resolver.throttle_every must be at least 1");
        }
        Ok(())
    }

    /// Git remote for a package
    pub fn git_url(&self, package: &str) -> String {
        format!("{}/{}.git", self.aur_url.trim_end_matches('/'), package)
    }

    /// Path of the log file inside the cache directory
    pub fn log_file(&self) -> PathBuf {
        self.cache_dir.join("nayur.log")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.rpc_url, "https://aur.archlinux.org/rpc/v5/");
        assert!(config.cache_dir.ends_with("nayur"));
        assert!(config.resolver.recursive);
        assert!(config.resolver.optional);
        assert!(config.resolver.make);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.resolver.throttle_every = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rpc_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            cache_dir = "/srv/nayur"

            [resolver]
            optional = false
            "#,
        )
        .unwrap();

        let config = Config::default().merge(parsed);
        assert_eq!(config.cache_dir, PathBuf::from("/srv/nayur"));
        assert!(!config.resolver.optional);
        assert!(config.resolver.make);
        assert_eq!(config.resolver.throttle_every, 10);
        assert_eq!(config.rpc_url, "https://aur.archlinux.org/rpc/v5/");
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(Config::read_file(&dir.path().join("missing.toml")).unwrap().is_none());

        let good = dir.path().join("good.toml");
        fs::write(&good, "log_level = \"debug\"\n").unwrap();
        let parsed = Config::read_file(&good).unwrap().unwrap();
        assert_eq!(parsed.log_level, "debug");

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "cache_dir = [").unwrap();
        let err = Config::read_file(&bad).unwrap_err();
        assert!(matches!(err, NayurError::Config { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_git_url() {
        let mut config = Config::default();
        assert_eq!(config.git_url("yay"), "https://aur.archlinux.org/yay.git");

        config.aur_url = "https://mirror.example".to_string();
        assert_eq!(config.git_url("yay"), "https://mirror.example/yay.git");
    }

    #[test]
    fn test_resolver_options() {
        let options = ResolverConfig::default().options();
        assert_eq!(options.throttle_step, Duration::from_millis(75));
        assert_eq!(options.throttle_every, 10);
    }
}

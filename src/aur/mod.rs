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

//! AUR (Arch User Repository) support module.
//!
//! This module provides:
//! - RPC v5 client for info and search queries
//! - Recursive dependency discovery across the AUR
//! - makepkg build driver
//! - pacman install driver for built artifacts

pub mod builder;
pub mod client;
pub mod installer;
pub mod resolver;

pub use builder::AurBuilder;
pub use client::AurClient;
pub use installer::AurInstaller;
pub use resolver::{check_deps, find_deps, ResolveOptions};

use client::AurPackage;
use serde::Deserialize;

/// AUR RPC API response wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct AurRpcResponse {
    #[serde(default)]
    pub resultcount: usize,
    #[serde(default)]
    pub results: Vec<AurPackage>,
    pub error: Option<String>,
}

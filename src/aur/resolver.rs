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

//! AUR dependency discovery.
//!
//! Starting from a set of package names, the resolver asks the AUR about the
//! whole frontier in one batched request, collects every package the AUR
//! knows, and turns their dependency lists into the next frontier. Names the
//! AUR does not return (official repo packages, virtual provides) drop out on
//! their own. The walk is an explicit loop over frontiers, so arbitrarily deep
//! chains cost one request per level and no stack.

use async_trait::async_trait;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;
use std::time::Duration;

use super::client::AurPackage;
use crate::error::NayurResult;

/// Trailing comparator and version, e.g. `>=1.2.3`
static VERSION_CLAUSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[<>=].*$").unwrap());

/// Bracketed architecture qualifier, e.g. `[x86_64]`
static ARCH_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*\]").unwrap());

/// OptDepends reason, e.g. `: for foo support`
static OPT_REASON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":.*$").unwrap());

/// Anything that can answer batched AUR info queries
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// Look up `names` in one request. Unknown names are left out of the result.
    async fn fetch(&self, names: &[String]) -> NayurResult<Vec<AurPackage>>;
}

/// Controls how far the resolver expands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveOptions {
    /// Follow dependencies of discovered packages
    pub recursive: bool,
    /// Include OptDepends in the expansion
    pub optional: bool,
    /// Include MakeDepends in the expansion
    pub make: bool,
    /// Delay added for every `throttle_every` levels of depth
    pub throttle_step: Duration,
    pub throttle_every: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            optional: true,
            make: true,
            throttle_step: Duration::from_millis(75),
            throttle_every: 10,
        }
    }
}

impl ResolveOptions {
    /// Pause before querying the frontier at `depth`.
    ///
    /// `floor(depth / throttle_every) * throttle_step`, so the first
    /// `throttle_every` levels go out back to back.
    pub fn throttle_delay(&self, depth: usize) -> Duration {
        let steps = depth / self.throttle_every.max(1);
        self.throttle_step
            .saturating_mul(u32::try_from(steps).unwrap_or(u32::MAX))
    }

    /// Dependency specifiers of `pkg` that this run expands
    fn candidates<'a>(&self, pkg: &'a AurPackage) -> impl Iterator<Item = &'a String> {
        let optional: &[String] = if self.optional { &pkg.opt_depends } else { &[] };
        let make: &[String] = if self.make { &pkg.make_depends } else { &[] };
        pkg.depends.iter().chain(optional).chain(make)
    }
}

/// Reduce a dependency specifier to a bare, lower-cased package name.
///
/// `foo>=1.2.3`, `foo[x86_64]`, `foo>=1.2.3[x86_64]` and `foo: for bar`
/// all become `foo`. Returns `None` if nothing is left.
pub fn normalize_specifier(spec: &str) -> Option<String> {
    let name = VERSION_CLAUSE.replace(spec, "");
    let name = ARCH_QUALIFIER.replace_all(&name, "");
    let name = OPT_REASON.replace(&name, "");
    let name = name.trim().to_lowercase();

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Find `seeds` and all of their AUR-hosted dependencies.
///
/// Returns the names of every AUR package discovered, seeds included when
/// the AUR knows them. A failure on the seed query is returned as an error;
/// a failure deeper down is logged and the names found so far are returned.
pub async fn find_deps<P>(
    source: &P,
    seeds: &[String],
    options: &ResolveOptions,
) -> NayurResult<BTreeSet<String>>
where
    P: PackageSource + ?Sized,
{
    let mut found: BTreeSet<String> = BTreeSet::new();
    let mut queried: HashSet<String> = HashSet::new();
    let mut frontier: BTreeSet<String> = seeds.iter().filter_map(|s| normalize_specifier(s)).collect();
    let mut depth = 0usize;

    while !frontier.is_empty() {
        let batch: Vec<String> = frontier.into_iter().collect();
        queried.extend(batch.iter().cloned());
        tracing::debug!(depth, "checking {} package(s) in AUR: {:?}", batch.len(), batch);

        let packages = match source.fetch(&batch).await {
            Ok(packages) => packages,
            Err(e) if depth == 0 => return Err(e),
            Err(e) => {
                tracing::warn!(depth, "failed to check for dependencies: {}", e);
                break;
            }
        };

        let mut next = BTreeSet::new();
        for pkg in &packages {
            found.insert(pkg.name.to_lowercase());

            if options.recursive {
                let deps: BTreeSet<String> = options
                    .candidates(pkg)
                    .filter_map(|d| normalize_specifier(d))
                    .collect();
                tracing::debug!("{} lists {} dependency name(s): {:?}", pkg.name, deps.len(), deps);
                next.extend(deps);
            }
        }

        if !options.recursive {
            break;
        }

        next.retain(|name| !found.contains(name) && !queried.contains(name));
        depth += 1;

        if !next.is_empty() {
            let delay = options.throttle_delay(depth);
            if !delay.is_zero() {
                tracing::debug!(depth, "throttling for {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }

        frontier = next;
    }

    tracing::debug!("resolved {} AUR package(s): {:?}", found.len(), found);
    Ok(found)
}

/// Which of `names` exist in the AUR, from a single batched query.
pub async fn check_deps<P>(source: &P, names: &[String]) -> NayurResult<BTreeSet<String>>
where
    P: PackageSource + ?Sized,
{
    let batch: Vec<String> = names
        .iter()
        .filter_map(|n| normalize_specifier(n))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if batch.is_empty() {
        return Ok(BTreeSet::new());
    }

    tracing::debug!("checking {} name(s) in AUR: {:?}", batch.len(), batch);
    let found: BTreeSet<String> = source
        .fetch(&batch)
        .await?
        .into_iter()
        .map(|pkg| pkg.name.to_lowercase())
        .collect();
    tracing::debug!("found {} AUR package(s): {:?}", found.len(), found);

    Ok(found)
}

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

//! Subcommand implementations.

use anyhow::{anyhow, Context as _, Result};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::time::Duration;

use crate::aur::client::AurPackage;
use crate::aur::{self, AurBuilder, AurClient, AurInstaller, ResolveOptions};
use crate::cache::RepoCache;
use crate::config::Config;
use crate::error::{NayurError, NayurResult};
use crate::git;

/// State shared by every subcommand
pub struct Context {
    pub config: Config,
    pub cache: RepoCache,
    pub debug: bool,
}

impl Context {
    fn client(&self) -> Result<AurClient> {
        AurClient::from_config(&self.config).context("failed to create AUR client")
    }

    /// Clear the terminal after noisy tool output, unless debugging
    fn clear_screen(&self) {
        if !self.debug {
            if let Err(e) = Term::stdout().clear_screen() {
                tracing::debug!("could not clear the screen: {}", e);
            }
        }
    }
}

/// Per-package results of a multi-package command
#[derive(Debug, Default)]
pub struct Outcome {
    pub ok: Vec<String>,
    pub failed: Vec<String>,
}

impl Outcome {
    fn record(&mut self, package: &str, result: NayurResult<()>) {
        match result {
            Ok(()) => self.ok.push(package.to_string()),
            Err(e) => {
                println!("{} {}", style("error:").red().bold(), e);
                self.failed.push(package.to_string());
            }
        }
    }

    /// Print the summary and turn failures into an error
    fn finish(self) -> Result<()> {
        for name in &self.ok {
            println!("{}", style(format!("Ok - {}", name)).green().bold());
        }
        for name in &self.failed {
            println!("{}", style(format!("Failed - {}", name)).red().bold());
        }

        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("{} package(s) failed", self.failed.len()))
        }
    }
}

fn spinner(msg: impl Into<String>) -> ProgressBar {
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let pb = ProgressBar::new_spinner();
    pb.set_style(style);
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn not_cached_hint(name: &str) -> NayurError {
    tracing::debug!("{} is not cached locally, `nayur cache get {}` fetches it", name, name);
    NayurError::NotCached {
        package: name.to_string(),
    }
}

/// `cache get`: clone packages into the cache without building them
pub async fn cache_get(ctx: &Context, names: &[String]) -> Result<()> {
    let client = ctx.client()?;
    let mut outcome = Outcome::default();

    for name in names {
        let name = name.to_lowercase();
        match get_one(ctx, &client, &name).await {
            Err(NayurError::AlreadyCached { package }) => {
                println!("{}", style(format!("Package {} already exists in cache.", package)).red());
            }
            result => outcome.record(&name, result),
        }
    }

    outcome.finish()
}

async fn get_one(ctx: &Context, client: &AurClient, name: &str) -> NayurResult<()> {
    if ctx.cache.is_empty(name) {
        // Left behind by an interrupted get
        tracing::info!("discarding empty cache entry for {}", name);
        ctx.cache.remove(name)?;
    } else if ctx.cache.exists(name) {
        return Err(NayurError::AlreadyCached {
            package: name.to_string(),
        });
    }

    let pb = spinner(format!("Retrieving metadata for {}", name));
    let info = client.info_one(name).await;
    pb.finish_and_clear();

    let info = match info {
        Ok(Some(info)) => info,
        Ok(None) => {
            return Err(NayurError::PackageNotFound {
                package: name.to_string(),
            })
        }
        Err(e) => {
            if e.is_remote() {
                tracing::error!("failed to download metadata for {}: {}", name, e);
            }
            return Err(e);
        }
    };
    tracing::debug!("metadata for {}: {:?}", name, info);

    // Split packages live in the repository of their package base
    let base = info.package_base.as_deref().unwrap_or(name);
    let path = ctx.cache.prepare(name)?;
    let pb = spinner(format!("Cloning {} repository", name));
    let cloned = git::clone_repository(&ctx.config.git_url(base), &path, name);
    pb.finish_and_clear();

    if let Err(e) = cloned {
        if let Err(cleanup) = fs::remove_dir_all(&path) {
            tracing::warn!("could not clean up {}: {}", path.display(), cleanup);
        }
        return Err(e);
    }

    if !path.join("PKGBUILD").exists() {
        println!("{}", style(format!("Warn - {} (empty repository)", name)).yellow().bold());
    }
    Ok(())
}

/// `cache list`: show cached packages, `*` marks populated ones
pub fn cache_list(ctx: &Context) -> Result<()> {
    let repos = ctx.cache.list()?;
    if repos.is_empty() {
        println!("{}", style(format!("The cache at {} is empty.", ctx.cache.root().display())).dim());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("").fg(Color::Cyan),
        Cell::new("Package").fg(Color::Cyan),
        Cell::new("Path").fg(Color::Cyan),
    ]);

    for repo in &repos {
        let (marker, color) = if repo.populated {
            ("*", Color::Green)
        } else {
            (" ", Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(marker).fg(color),
            Cell::new(&repo.name).fg(color),
            Cell::new(repo.path.display()),
        ]);
    }

    println!("{}", table);
    Ok(())
}

/// `cache clear`: remove everything, stopping at the first failure
pub fn cache_clear(ctx: &Context) -> Result<()> {
    let pb = spinner("Removing cached packages");
    let result = ctx.cache.clear();
    pb.finish_and_clear();

    let removed = result.context("Failed to remove package")?;
    for name in &removed {
        tracing::debug!("OK - {}", name);
    }
    println!("{}", style("Ok").green());
    Ok(())
}

/// `cache update`: git pull inside a cached package
pub fn cache_update(ctx: &Context, name: &str) -> Result<()> {
    let name = name.to_lowercase();
    if !ctx.cache.exists(&name) {
        return Err(not_cached_hint(&name).into());
    }

    let pb = spinner(format!("Updating {}", name));
    let result = git::pull(&ctx.cache.path(&name), &name);
    pb.finish_and_clear();

    result.context("Failed to update repository")?;
    println!("{}", style("Ok").green());
    Ok(())
}

/// `cache remove`: delete one cached package
pub fn cache_remove(ctx: &Context, name: &str) -> Result<()> {
    let name = name.to_lowercase();
    ctx.cache.remove(&name).context("Failed to remove package")?;
    println!("{}", style("Ok").green());
    Ok(())
}

/// Search results, least popular first
async fn search_results(ctx: &Context, query: &str) -> Result<Vec<AurPackage>> {
    let client = ctx.client()?;

    let pb = spinner("Searching");
    let results = client.search(query).await;
    pb.finish_and_clear();

    let mut results = results.with_context(|| format!("Failed to search the AUR for {}", query))?;
    results.sort_by(|a, b| a.popularity.total_cmp(&b.popularity));
    Ok(results)
}

fn headline(pkg: &AurPackage) -> String {
    format!("{} (v{}, {:.2} popularity)", pkg.name, pkg.version, pkg.popularity)
}

/// `search`: query the AUR, most popular results printed last
pub async fn search(ctx: &Context, query: &str, brief: bool) -> Result<()> {
    let results = search_results(ctx, query).await?;
    if results.is_empty() {
        println!("No results found for '{}'", style(query).yellow());
        return Ok(());
    }

    println!("Displaying {} result(s)", style(results.len()).bold());

    for pkg in &results {
        let out_of_date = if pkg.out_of_date.is_some() {
            style(" [out-of-date]").red().to_string()
        } else {
            String::new()
        };
        println!("{}{}", style(headline(pkg)).cyan(), out_of_date);
        if !brief {
            if let Some(summary) = pkg.summary() {
                println!("\t{:?}", summary);
            }
            println!(
                "\tVotes: {}  Maintainer: {}",
                pkg.num_votes,
                pkg.maintainer.as_deref().unwrap_or("orphan")
            );
            if let Some(url) = &pkg.url {
                println!("\tURL: {}", style(url).blue().underlined());
            }
            println!();
        }
    }
    Ok(())
}

/// `build`: run makepkg in each cached package
pub fn build(ctx: &Context, names: &[String]) -> Result<()> {
    let builder = if ctx.config.makepkg_args.is_empty() {
        AurBuilder::default()
    } else {
        AurBuilder::with_args(ctx.config.makepkg_args.clone())
    };
    let mut outcome = Outcome::default();

    for name in names {
        let name = name.to_lowercase();
        let result = if ctx.cache.exists(&name) {
            println!(
                "{}",
                style(format!(
                    "Running makepkg {} in {}",
                    builder.args().join(" "),
                    ctx.cache.path(&name).display()
                ))
                .green()
                .bold()
            );
            let result = builder.build(&ctx.cache.path(&name), &name);
            if result.is_ok() {
                ctx.clear_screen();
            }
            result
        } else {
            Err(not_cached_hint(&name))
        };
        outcome.record(&name, result);
    }

    outcome.finish()
}

/// `install`: install the newest built artifact of each cached package
pub fn install(ctx: &Context, names: &[String]) -> Result<()> {
    let installer = AurInstaller::new();
    tracing::debug!("looking for build files with pattern {:?}", installer.pattern());
    let mut outcome = Outcome::default();

    for name in names {
        let name = name.to_lowercase();
        let result = if ctx.cache.exists(&name) {
            installer.install(&ctx.cache.path(&name), &name).map(|artifact| {
                tracing::info!("installed {}", artifact.display());
            })
        } else {
            Err(not_cached_hint(&name))
        };
        outcome.record(&name, result);
    }

    ctx.clear_screen();
    outcome.finish()
}

/// `deps`: list the AUR packages among `names` and their dependencies
pub async fn deps(ctx: &Context, names: &[String], options: ResolveOptions, check_only: bool) -> Result<()> {
    let client = ctx.client()?;

    let pb = spinner(format!("Resolving {} package(s)", names.len()));
    let result = if check_only {
        aur::check_deps(&client, names).await
    } else {
        aur::find_deps(&client, names, &options).await
    };
    pb.finish_and_clear();

    let found = result.context("Failed to check for dependencies")?;
    if found.is_empty() {
        println!("{}", style("No AUR packages found.").yellow());
        return Ok(());
    }

    println!(
        "{} {} AUR package(s):",
        style("::").cyan().bold(),
        style(found.len()).white().bold()
    );
    for name in &found {
        println!("   {}", style(name).cyan());
    }
    Ok(())
}

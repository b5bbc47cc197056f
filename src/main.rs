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

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;

mod aur;
mod cache;
mod commands;
mod config;
mod error;
mod git;
mod logging;
mod process;

use commands::Context;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\n",
    "Copyright (C) 2025  nayur contributors\n",
    "License GPLv3+: GNU GPL version 3 or later <https://gnu.org/licenses/gpl.html>\n\n",
    "This is free software; you are free to change and redistribute it.\n",
    "There is NO WARRANTY, to the extent permitted by law."
);

#[derive(Parser)]
#[command(name = "nayur")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Nayur - the least helpful AUR helper")]
struct Cli {
    #[arg(long, global = true, help = "Enables debug mode")]
    debug: bool,
    #[arg(
        short = 'L',
        long,
        global = true,
        value_enum,
        ignore_case = true,
        help = "The log level written to the nayur.log file in the cache directory [default: INFO]"
    )]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Cache-related commands
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
    /// Searches for a package on the AUR
    Search {
        #[arg(short = 'B', long, help = "Compacts output")]
        brief: bool,
        query: String,
    },
    /// Builds packages, preparing them for install
    Build {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Installs built packages
    Install {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Lists the AUR packages a set of packages pulls in
    Deps {
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long, help = "Only look at the named packages")]
        no_recursive: bool,
        #[arg(long, help = "Skip optional dependencies")]
        no_optional: bool,
        #[arg(long, help = "Skip build-time dependencies")]
        no_make: bool,
        #[arg(long, help = "Only report which of the names are AUR packages")]
        check: bool,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Downloads packages. This does not install them
    Get {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Lists all packages in the cache
    List,
    /// Removes all packages from the cache
    Clear,
    /// Updates the locally cloned repository of a package
    Update { name: String },
    /// Removes a package from the cache
    Remove { name: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        use clap::CommandFactory;
        eprintln!("{}", style("No subcommand specified.").red().bold());
        Cli::command().print_help()?;
        return Ok(());
    };

    let (config, config_warnings) = config::Config::load();
    config.validate()?;

    let level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .unwrap_or_else(|| config.log_level.clone());
    let cache = cache::RepoCache::new(&config.cache_dir)?;
    let _log_guard = logging::init(cli.debug, &level, Some(&config.log_file()));
    tracing::info!("log level is set to {}", level);
    for warning in &config_warnings {
        tracing::warn!("{}", warning);
        eprintln!("{} {}", style("warning:").yellow().bold(), warning);
    }

    let ctx = Context {
        config,
        cache,
        debug: cli.debug,
    };

    match command {
        Commands::Cache { action } => match action {
            CacheCommand::Get { names } => commands::cache_get(&ctx, &names).await,
            CacheCommand::List => commands::cache_list(&ctx),
            CacheCommand::Clear => commands::cache_clear(&ctx),
            CacheCommand::Update { name } => commands::cache_update(&ctx, &name),
            CacheCommand::Remove { name } => commands::cache_remove(&ctx, &name),
        },
        Commands::Search { brief, query } => commands::search(&ctx, &query, brief).await,
        Commands::Build { names } => commands::build(&ctx, &names),
        Commands::Install { names } => commands::install(&ctx, &names),
        Commands::Deps {
            names,
            no_recursive,
            no_optional,
            no_make,
            check,
        } => {
            let mut options = ctx.config.resolver.options();
            options.recursive &= !no_recursive;
            options.optional &= !no_optional;
            options.make &= !no_make;
            commands::deps(&ctx, &names, options, check).await
        }
    }
}

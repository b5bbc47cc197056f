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

//! Logging with tracing: debug output on the console, everything else in a log file.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Map a user-facing level name onto a tracing filter directive.
///
/// Accepts the classic names (`DEBUG`, `INFO`, `WARNING`, `ERROR`,
/// `CRITICAL`) in any case, plus the tracing ones. Unknown input
/// falls back to `info`.
pub fn level_directive(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" | "critical" => "error",
        _ => "info",
    }
}

/// Initialize logging.
///
/// The console layer writes to stderr and is only active in debug mode.
/// The file layer writes plain text to `log_file`, rolled over daily
/// (`nayur.log.YYYY-MM-DD`), at `file_level` unless `RUST_LOG` says
/// otherwise. Keep the returned guard alive until exit so buffered
/// lines reach the file.
pub fn init(debug: bool, file_level: &str, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .compact()
        .with_filter(EnvFilter::new(if debug { "debug" } else { "off" }));

    let (file_layer, guard) = match log_file.and_then(file_appender) {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level_directive(file_level)));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(filter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();

    guard
}

/// Daily rolling appender for `path`, `None` if its directory is unusable
fn file_appender(path: &Path) -> Option<RollingFileAppender> {
    let dir = path.parent()?;
    let prefix = path.file_name()?;
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("cannot create log directory {}: {}", dir.display(), e);
        return None;
    }
    Some(rolling::daily(dir, prefix))
}

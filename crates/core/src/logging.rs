//! Tracing setup for the `respack` binary.
//!
//! Every subcommand logs to its own daily file, `respack-<command>.<date>.log`, so the
//! symbol, packaging and finish steps of one build can be read separately.

use std::ffi::OsString;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Overrides the log directory.
pub const LOG_DIR_ENV: &str = "RESPACK_LOG_DIR";

const MAX_LOG_FILES: usize = 14;

/// `$RESPACK_LOG_DIR` when set, otherwise `$HOME/.respack/logs`.
pub fn resolve_log_dir(override_dir: Option<OsString>, home: Option<OsString>) -> PathBuf {
    match override_dir.filter(|dir| !dir.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(home.unwrap_or_else(|| ".".into())).join(".respack/logs"),
    }
}

/// Default filter when `RUST_LOG` is unset. Verbose runs include the crate's debug events.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "info,respack_core=debug,respack_cli=debug"
    } else {
        "info"
    }
}

fn file_appender(command: &str) -> Option<RollingFileAppender> {
    let dir = resolve_log_dir(std::env::var_os(LOG_DIR_ENV), std::env::var_os("HOME"));
    std::fs::create_dir_all(&dir).ok()?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(format!("respack-{command}"))
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(&dir)
        .ok()
}

/// Installs the global subscriber for `command`.
///
/// Falls back to stderr only when the log directory cannot be used. Keep the returned guard
/// alive until exit so buffered lines are flushed.
pub fn init_logging(command: &str, verbose: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let (file_layer, guard) = match file_appender(command) {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = (verbose || guard.is_none()).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    guard
}

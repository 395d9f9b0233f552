use std::io;
use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Initialise tracing with a non-blocking daily file appender, optionally mirrored to stdout.
///
/// Respects `RUST_LOG`, falling back to `default_level`. Keep the returned guard
/// alive for the life of the process or buffered lines are lost.
pub fn init(app_name: &str, log_dir: impl AsRef<Path>, default_level: Level, stdout: bool) -> WorkerGuard {
    let log_dir = log_dir.as_ref();
    let _ = std::fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::daily(log_dir, format!("{app_name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();

    let file_layer =
        fmt::layer().with_writer(non_blocking).with_target(true).with_thread_ids(true).with_line_number(true).with_ansi(false).compact();

    let stdout_layer = stdout.then(|| fmt::layer().with_writer(io::stdout).with_target(true).with_ansi(true).compact());

    tracing_subscriber::registry().with(env_filter).with(file_layer).with(stdout_layer).init();

    guard
}

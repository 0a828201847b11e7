use std::path::Path;
use time::{macros::format_description, UtcOffset};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::time::OffsetTime, EnvFilter};

const LOG_FILE: &str = "mr.log";

/// Installs the global subscriber. Logs go to stderr, or to `mr.log` under
/// `log_dir` when one is given; stdout carries job output only.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init_logger(log_dir: Option<&Path>) -> WorkerGuard {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(
        offset,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"),
    );

    let (writer, guard) = match log_dir {
        Some(dir) => tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE)),
        None => tracing_appender::non_blocking(std::io::stderr()),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_writer(writer)
        .with_ansi(log_dir.is_none())
        .init();
    guard
}

//! File logging for the hook binary.
//!
//! Hooks run inside the agent's process tree, and anything on stderr ends up
//! in the agent's transcript. Logs go to `~/.lanes/logs/lanes-hook.log.<date>`.

use std::env;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "lanes-hook.log";

/// Installs the file subscriber. The returned guard flushes on drop, so it
/// must live until `main` returns. `None` means logging is off.
pub fn init() -> Option<WorkerGuard> {
    let log_dir = lanes_core::lanes_dir()?.join("logs");
    // A failure here has nowhere to be reported.
    fs_err::create_dir_all(&log_dir).ok()?;

    let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}

fn filter() -> EnvFilter {
    let debug_enabled = env::var("LANES_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

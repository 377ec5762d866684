use std::fs;
use std::path::Path;

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::Subscriber;
use tracing_subscriber::EnvFilter;

use crate::errors::{Result, SyncError};

static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. Events go to stdout unless `log_dir` is
/// given, in which case they land in a daily-rolling `channel-sync.log`.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
    let result = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "channel-sync.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);

            let subscriber = Subscriber::builder()
                .with_env_filter(env_filter())
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        None => {
            let subscriber = Subscriber::builder()
                .with_env_filter(env_filter())
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };

    result.map_err(|err| SyncError::Config(err.to_string()))
}

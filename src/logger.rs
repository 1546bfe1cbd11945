use std::result::Result;

use snafu::ResultExt;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{registry, EnvFilter};

use crate::config::Config;
use crate::error::{ApplicationError, InitializeLoggerSnafu, LogDirectorySnafu};

/// Logs to the console and to a daily rolling JSON file under `LOG_DIR`.
///
/// The returned guard flushes the file writer when dropped, keep it alive for as long as the process runs.
pub fn init(config: &Config) -> Result<WorkerGuard, ApplicationError> {
    std::fs::create_dir_all(&config.log_dir).context(LogDirectorySnafu {
        path: config.log_dir.clone(),
    })?;

    let (file_layer, guard) = {
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "learnpath.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = layer().with_ansi(false).json().with_writer(non_blocking);

        (layer, guard)
    };

    let console_layer = layer().pretty().with_writer(std::io::stdout);
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|error| {
        eprintln!("invalid LOG_FILTER `{}`: {error}, falling back to `info`", config.log_filter);
        EnvFilter::new("info")
    });

    let subscriber = registry().with(filter).with(console_layer).with(file_layer);
    tracing::subscriber::set_global_default(subscriber).context(InitializeLoggerSnafu)?;

    Ok(guard)
}

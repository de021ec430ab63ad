//! Logging setup.
//!
//! Logs go to stderr so rendered dashboard output on stdout stays clean.
//! `RUST_LOG` takes precedence over the configured level.

use std::sync::Once;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingSection};

static INIT: Once = Once::new();

/// Initializes the global subscriber.
///
/// Safe to call more than once; later calls are no-ops and return `None`.
/// When a log file is configured the returned guard must be held until
/// exit so buffered lines are flushed.
pub fn init_logging(config: &LoggingSection) -> Option<WorkerGuard> {
    let mut guard = None;
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let stderr_layer = match config.format {
            LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
            LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        };

        let file_layer = config.file.as_ref().map(|path| {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let prefix = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "dashsync.log".to_string());
            let appender = tracing_appender::rolling::daily(dir, prefix);
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard = Some(file_guard);
            fmt::layer().json().with_writer(writer).boxed()
        });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    });
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LoggingSection::default();
        init_logging(&config);
        assert!(init_logging(&config).is_none());
        tracing::info!("logging initialised");
    }
}

//! Tracing subscriber setup: env filter, rolling file output, optional JSON

use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log file rotation policy from the `rotation` config key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Hourly,
    Daily,
    Never,
}

impl Rotation {
    /// Unknown values fall back to a single, never-rotated file
    pub fn from_config(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Rotation::Hourly,
            "daily" => Rotation::Daily,
            _ => Rotation::Never,
        }
    }

    fn appender(self, dir: &str, file: &str) -> RollingFileAppender {
        match self {
            Rotation::Hourly => tracing_appender::rolling::hourly(dir, file),
            Rotation::Daily => tracing_appender::rolling::daily(dir, file),
            Rotation::Never => tracing_appender::rolling::never(dir, file),
        }
    }
}

/// Default directive: configured level, with sqlx statement logging held at warn
fn default_directive(log_level: &str) -> String {
    format!("{},sqlx=warn", log_level)
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `log_level`. Keep the returned guard alive
/// for the lifetime of the process or buffered file output is lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let file_appender = Rotation::from_config(&config.rotation)
        .appender(&config.log_dir, &config.log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        // JSON keeps the target for structured queries
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(non_blocking)
                    .with_ansi(false),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(non_blocking)
                    .with_ansi(false),
            )
            .with(fmt::layer().with_target(false).with_ansi(true))
            .init();
    }

    guard
}

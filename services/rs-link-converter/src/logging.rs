//!
//! src/logging.rs  Andrew Belles  Oct 19th, 2026
//!
//! Initializes logger. Output goes to stderr so the converted link
//! printed by the cli is the only thing on stdout
//!
//!

use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tracing_error::ErrorLayer;
use tracing_appender::non_blocking;

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::ServiceError;

pub struct LoggingGuard(tracing_appender::non_blocking::WorkerGuard);

pub fn env_filter(cfg: &LoggingConfig) -> EnvFilter {
    std::env::var("RUST_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(cfg.filter_directives.clone()))
}

pub fn init_logging(cfg: &LoggingConfig) -> Result<LoggingGuard, ServiceError> {
    let (writer, guard) = non_blocking(std::io::stderr());
    let filter = env_filter(cfg);
    let time = fmt::time::UtcTime::rfc_3339();

    let fmt_layer = fmt::layer()
        .with_writer(writer)
        .with_timer(time)
        .with_ansi(cfg.with_ansi)
        .with_target(cfg.include_target)
        .with_file(cfg.include_file_line)
        .with_line_number(cfg.include_file_line);

    let fmt_layer = match cfg.format {
        LogFormat::Json => fmt_layer
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Pretty => fmt_layer.pretty().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| ServiceError::Config(format!("logging already initialized: {e}")))?;

    Ok( LoggingGuard(guard) )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_directives_parse() {
        let cfg = LoggingConfig::default();
        let filter = EnvFilter::try_new(cfg.filter_directives.clone());
        assert!(filter.is_ok());
    }
}

use std::io;
use tracing::{debug, Level};
use tracing_appender::rolling;
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Default stdout filter; overridden by `RUST_LOG` when set.
const STDOUT_FILTER: &str =
    "info,llm_request=warn,classifier=info,duplicates=info,benchmark=info,db_query=warn,sqlx=off";

/// File logs keep the full LLM conversation for later inspection.
const FILE_FILTER: &str = "info,llm_request=debug,classifier=debug,benchmark=debug,sqlx=info";

pub fn configure_logging() {
    configure_logging_in("logs");
}

/// Installs the stdout and rolling-file layers. Returns false when a global
/// subscriber is already set; that subscriber stays in place.
pub fn configure_logging_in(log_dir: &str) -> bool {
    // sqlx logs every slow statement at WARN; the pool already reports those via db_query
    let custom_filter = FilterFn::new(|metadata| {
        !(metadata.level() == &Level::WARN && metadata.target().starts_with("sqlx::query"))
    });

    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(STDOUT_FILTER));

    let stdout_log = fmt::layer()
        .with_writer(io::stdout)
        .with_filter(stdout_filter)
        .with_filter(custom_filter);

    let file_appender = rolling::daily(log_dir, "nomenclator.log");
    let file_log = fmt::layer()
        .with_ansi(false)
        .with_writer(file_appender)
        .with_filter(EnvFilter::new(FILE_FILTER));

    match tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .try_init()
    {
        Ok(()) => true,
        Err(e) => {
            debug!("Logging already configured, keeping the existing subscriber: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_configuration_keeps_first_subscriber() {
        let dir = std::env::temp_dir().join("nomenclator-logging-test");
        let dir = dir.to_string_lossy();

        configure_logging_in(&dir);
        assert!(!configure_logging_in(&dir));
    }
}

//! Logging
//!
//! Installs the `tracing` subscriber used by the client. Outside dev mode
//! only errors reach the output; `RUST_LOG` always wins when set.

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive derived from the logging config
pub fn filter_directive(config: &LoggingConfig) -> String {
    if config.dev_mode {
        format!("docqa_client={0},docqa={0}", config.level)
    } else {
        "error".to_string()
    }
}

/// Install the global subscriber.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_mode_only_errors() {
        let config = LoggingConfig::default();
        assert_eq!(filter_directive(&config), "error");
    }

    #[test]
    fn test_dev_mode_uses_level() {
        let config = LoggingConfig {
            level: "trace".to_string(),
            format: "json".to_string(),
            dev_mode: true,
        };
        assert_eq!(filter_directive(&config), "docqa_client=trace,docqa=trace");
    }

    #[test]
    fn test_init_twice() {
        let config = LoggingConfig::default();
        init_logging(&config);
        init_logging(&config);
    }
}

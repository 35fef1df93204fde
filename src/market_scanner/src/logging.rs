use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};

static INIT: Once = Once::new();

const QUIET_CRATES: [&str; 4] = ["hyper=warn", "hyper_util=warn", "reqwest=warn", "diesel=warn"];

/// Builds the filter: `RUST_LOG` when set, otherwise `level`, with the HTTP
/// stack pinned to warn.
pub fn build_filter(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in QUIET_CRATES {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }
    filter
}

/// Installs the global subscriber once; later calls are no-ops.
pub fn init_logging(config: &LogConfig) {
    INIT.call_once(|| {
        let filter = build_filter(&config.level);
        let installed = match config.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_target(true)
                .with_env_filter(filter)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_target(true)
                .with_env_filter(filter)
                .try_init(),
        };
        if installed.is_ok() {
            tracing::debug!(level = %config.level, format = ?config.format, "logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back() {
        let filter = build_filter("definitely not a directive [");
        assert!(filter.to_string().contains("hyper=warn"));
    }

    #[test]
    fn init_twice_is_harmless() {
        let cfg = LogConfig::default();
        init_logging(&cfg);
        init_logging(&cfg);
    }
}

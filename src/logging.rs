//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Events go to stderr so stdout stays machine-readable for `--format csv`
//! and `--format json`. The filter directive is chosen in this order:
//!
//! 1. `RUST_LOG`
//! 2. `-v` (debug) / `-vv` (trace)
//! 3. `[logging].filter` from the config file
//! 4. `info`

use anyhow::{anyhow, Result};
use std::io;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            with_ansi: true,
        }
    }
}

impl LogConfig {
    pub fn resolve(env_filter: Option<&str>, verbosity: u8, config_filter: Option<&str>) -> Self {
        Self {
            filter: resolve_filter(env_filter, verbosity, config_filter),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }
}

fn resolve_filter(env_filter: Option<&str>, verbosity: u8, config_filter: Option<&str>) -> String {
    if let Some(env) = env_filter.filter(|s| !s.trim().is_empty()) {
        return env.to_string();
    }
    match verbosity {
        0 => config_filter
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("info")
            .to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber. Call once from the binary.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| anyhow!("invalid log filter '{}': {}", config.filter, e))?;

    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_wins() {
        assert_eq!(resolve_filter(Some("warn"), 2, Some("debug")), "warn");
    }

    #[test]
    fn test_verbosity_over_config() {
        assert_eq!(resolve_filter(None, 1, Some("warn")), "debug");
        assert_eq!(resolve_filter(None, 3, None), "trace");
    }

    #[test]
    fn test_config_then_default() {
        assert_eq!(resolve_filter(None, 0, Some("droma=debug")), "droma=debug");
        assert_eq!(resolve_filter(Some(""), 0, None), "info");
    }
}

//! Logging setup shared by the service and the command-line tools

use crate::config::LoggingConfig;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Target of the crate-level directive added on top of `RUST_LOG`
const CRATE_TARGET: &str = "credit_scoring";

/// Output format selected by `logging.format`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Multi-line human-readable events
    Pretty,
    /// Single-line events
    Full,
}

impl LogFormat {
    /// Unrecognised names fall back to single-line output
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Full,
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` sets the base filter and the configured level is added for
/// this crate.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("{}={}", CRATE_TARGET, config.level).parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match LogFormat::from_name(&config.format) {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Full => builder.try_init(),
    };

    // A subscriber may already be installed, e.g. by a test harness.
    if let Err(e) = result {
        eprintln!("Logging already initialized: {e}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!(LogFormat::from_name("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_name("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("full"), LogFormat::Full);
        assert_eq!(LogFormat::from_name("text"), LogFormat::Full);
    }
}

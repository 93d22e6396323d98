//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

use crate::config::helpers::parse_string_env;
use crate::error::ConfigError;

const DEFAULT_FILTER: &str = "buildtrack=info,tower_http=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Read `BUILDTRACK_LOG_FORMAT` (`pretty` or `json`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::parse(&parse_string_env("BUILDTRACK_LOG_FORMAT", "pretty".to_string())?)
    }

    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                key: "BUILDTRACK_LOG_FORMAT".to_string(),
                message: format!("expected 'pretty' or 'json', got '{other}'"),
            }),
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
/// Output goes to stderr so command output on stdout stays clean.
pub fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {e}");
    }
}

//! Tracing subscriber setup for the binary.

use hubsync_core::{ConfigError, SyncError, SyncResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target prefix match covers the `hubsync` binary and every `hubsync_*` crate.
const DEFAULT_FILTER: &str = "hubsync=info,warn";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(ConfigError::InvalidValue {
                field: "HUBSYNC_LOG_FORMAT".to_string(),
                value: other.to_string(),
                reason: "must be json or pretty".to_string(),
            }),
        }
    }
}

/// Telemetry configuration from environment variables.
///
/// Environment variables:
/// - `RUST_LOG`: filter directives (default: hubsync crates at info, rest at warn)
/// - `HUBSYNC_LOG_FORMAT`: `json` or `pretty` (default: json)
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub format: LogFormat,
}

impl TelemetryConfig {
    pub fn from_env() -> SyncResult<Self> {
        let format = match std::env::var("HUBSYNC_LOG_FORMAT") {
            Ok(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => LogFormat::default(),
        };
        Ok(Self { format })
    }
}

/// Install the global subscriber. Call once, before the first span.
pub fn init_tracing(config: &TelemetryConfig) -> SyncResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    result.map_err(|e| SyncError::Telemetry(format!("Failed to init subscriber: {}", e)))?;

    tracing::debug!(format = ?config.format, "Telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}

//! Shared logging utilities for consistent tracing across the bot

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use tracing::{error, info};

use crate::errors::SharedError;

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Text,
    /// One JSON object per line, for log shippers
    Json,
}

impl FromStr for LogFormat {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(SharedError::InvalidLogFormat { input: s.to_string() }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Filter directive for the bot's own crates at the given base level
pub fn filter_directive(base_level: &str) -> String {
    format!("pairbot={base_level},shared={base_level},reqwest=warn,hyper=warn")
}

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the computed directive when set.
pub fn init_tracing(log_level: Option<&str>, format: LogFormat) {
    use tracing_subscriber::{EnvFilter, fmt};

    let base_level = log_level.unwrap_or("info");
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(base_level)));

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    // A second init (e.g. in tests) keeps the first subscriber
    let _ = match format {
        LogFormat::Text => builder.compact().try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for channel-aware info logging
#[macro_export]
macro_rules! round_info {
    ($channel:expr, $($arg:tt)*) => {
        tracing::info!(
            channel = %$channel,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for channel-aware warning logging
#[macro_export]
macro_rules! round_warn {
    ($channel:expr, $($arg:tt)*) => {
        tracing::warn!(
            channel = %$channel,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for channel-aware debug logging
#[macro_export]
macro_rules! round_debug {
    ($channel:expr, $($arg:tt)*) => {
        tracing::debug!(
            channel = %$channel,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(details: &str) {
    info!(timestamp = format_timestamp(), "🚀 Starting {}", details);
}

/// Contextual logging helper for error conditions
pub fn log_error(scope: &dyn fmt::Display, context: &str, error: &dyn fmt::Display) {
    error!(
        channel = %scope,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(scope: &dyn fmt::Display, message: &str) {
    info!(channel = %scope, timestamp = format_timestamp(), "✅ {}", message);
}

/// Contextual logging helper for progress updates
pub fn log_progress(scope: &dyn fmt::Display, action: &str, details: &str) {
    info!(channel = %scope, timestamp = format_timestamp(), "📋 {}: {}", action, details);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("TEXT".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_filter_directive() {
        let directive = filter_directive("debug");
        assert!(directive.starts_with("pairbot=debug,shared=debug"));
        assert!(directive.contains("reqwest=warn"));
    }
}

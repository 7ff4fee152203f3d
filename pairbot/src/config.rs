//! Environment-based configuration
//!
//! Settings are read from:
//! 1. `.env` file in the current directory or parent directories (if present)
//! 2. System environment variables
//!
//! Environment variables take precedence over .env file values. The binary
//! loads `.env` once at startup; CLI flags override both (see `main.rs`).
//!
//! ## Required
//! - `PAIRBOT_MATTERMOST_URL`: server host or full URL
//! - `PAIRBOT_MATTERMOST_TOKEN`, or `PAIRBOT_MATTERMOST_USERNAME` plus
//!   `PAIRBOT_MATTERMOST_PASSWORD`
//! - `PAIRBOT_CHANNELS`: comma-separated `team/channel` list
//!
//! ## Optional
//! - `PAIRBOT_MATTERMOST_PORT` (443), `PAIRBOT_MATTERMOST_SCHEME` (https)
//! - `PAIRBOT_LEDGER_DIR` (./ledger)
//! - `PAIRBOT_MESSAGE`, `PAIRBOT_UNMATCHED_MESSAGE`, `PAIRBOT_ANNOUNCEMENT`
//! - `PAIRBOT_DEBUG` (non-zero enables debug logging), `PAIRBOT_LOG_FORMAT`
//! - `PAIRBOT_SEED` (fixes the shuffle for reproducible rounds)

use std::path::PathBuf;

use shared::logging::LogFormat;
use shared::ChannelRef;
use url::Url;

use crate::error::{PairbotError, PairbotResult};

pub const DEFAULT_MESSAGE: &str = "You have been matched to meet up! Please respond with your availabilities :)";
pub const DEFAULT_UNMATCHED_MESSAGE: &str =
    "There was an odd number of people this round, so you were not matched. You'll be first in line next time!";
pub const DEFAULT_LEDGER_DIR: &str = "./ledger";

/// How the bot authenticates
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal access or bot token
    Token(String),
    /// Username/email and password login
    Password { login_id: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(***)"),
            Credentials::Password { login_id, .. } => write!(f, "Password {{ login_id: {login_id:?}, password: *** }}"),
        }
    }
}

/// Connection settings for the Mattermost server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MattermostSettings {
    /// Server root, always ending in `/`
    pub server_url: Url,
    pub credentials: Credentials,
}

/// Message templates sent after a round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub pair: String,
    pub unmatched: String,
    /// Posted into the channel before pairing, when set
    pub announcement: Option<String>,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            pair: DEFAULT_MESSAGE.to_string(),
            unmatched: DEFAULT_UNMATCHED_MESSAGE.to_string(),
            announcement: None,
        }
    }
}

/// Complete bot configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub mattermost: MattermostSettings,
    pub channels: Vec<ChannelRef>,
    pub ledger_dir: PathBuf,
    pub messages: Messages,
    pub debug: bool,
    pub log_format: LogFormat,
    pub seed: Option<u64>,
}

impl Config {
    /// Load from the process environment
    ///
    /// `.env` is read once by the binary before argument parsing, so its
    /// values are already in the environment here.
    pub fn from_env() -> PairbotResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> PairbotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| get(key).ok_or_else(|| PairbotError::config(key, "must be set"));

        let scheme = get("PAIRBOT_MATTERMOST_SCHEME").unwrap_or_else(|| "https".to_string());
        let port = match get("PAIRBOT_MATTERMOST_PORT") {
            Some(raw) => Some(
                raw.parse::<u16>()
                    .map_err(|e| PairbotError::config("PAIRBOT_MATTERMOST_PORT", e.to_string()))?,
            ),
            None => None,
        };
        let server_url = parse_server_url(&require("PAIRBOT_MATTERMOST_URL")?, &scheme, port)?;

        let credentials = match get("PAIRBOT_MATTERMOST_TOKEN") {
            Some(token) => Credentials::Token(token),
            None => Credentials::Password {
                login_id: require("PAIRBOT_MATTERMOST_USERNAME")?,
                password: require("PAIRBOT_MATTERMOST_PASSWORD")?,
            },
        };

        let channels = parse_channels(&require("PAIRBOT_CHANNELS")?)?;

        let debug = match get("PAIRBOT_DEBUG") {
            Some(raw) => raw
                .parse::<i64>()
                .map(|v| v != 0)
                .map_err(|e| PairbotError::config("PAIRBOT_DEBUG", e.to_string()))?,
            None => false,
        };

        let log_format = match get("PAIRBOT_LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| PairbotError::config("PAIRBOT_LOG_FORMAT", e.to_string()))?,
            None => LogFormat::Text,
        };

        let seed = match get("PAIRBOT_SEED") {
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|e| PairbotError::config("PAIRBOT_SEED", e.to_string()))?,
            ),
            None => None,
        };

        let defaults = Messages::default();
        let messages = Messages {
            pair: get("PAIRBOT_MESSAGE").unwrap_or(defaults.pair),
            unmatched: get("PAIRBOT_UNMATCHED_MESSAGE").unwrap_or(defaults.unmatched),
            announcement: get("PAIRBOT_ANNOUNCEMENT"),
        };

        Ok(Self {
            mattermost: MattermostSettings { server_url, credentials },
            channels,
            ledger_dir: get("PAIRBOT_LEDGER_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_DIR)),
            messages,
            debug,
            log_format,
            seed,
        })
    }

    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

/// Accept a bare host (`chat.example.com`) or a full URL
pub fn parse_server_url(raw: &str, scheme: &str, port: Option<u16>) -> PairbotResult<Url> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("{scheme}://{raw}")
    };
    let mut url = Url::parse(&with_scheme).map_err(|e| PairbotError::config("PAIRBOT_MATTERMOST_URL", e.to_string()))?;

    if let Some(port) = port {
        url.set_port(Some(port))
            .map_err(|_| PairbotError::config("PAIRBOT_MATTERMOST_PORT", "cannot set a port on this URL"))?;
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Parse a comma-separated `team/channel` list; duplicates are dropped
pub fn parse_channels(raw: &str) -> PairbotResult<Vec<ChannelRef>> {
    let mut channels: Vec<ChannelRef> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let channel: ChannelRef = entry
            .parse()
            .map_err(|e: shared::SharedError| PairbotError::config("PAIRBOT_CHANNELS", e.to_string()))?;
        if !channels.contains(&channel) {
            channels.push(channel);
        }
    }
    if channels.is_empty() {
        return Err(PairbotError::config("PAIRBOT_CHANNELS", "no channels listed"));
    }
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_minimal_token_config() {
        let config = Config::from_lookup(lookup(&[
            ("PAIRBOT_MATTERMOST_URL", "chat.example.com"),
            ("PAIRBOT_MATTERMOST_TOKEN", "secret"),
            ("PAIRBOT_CHANNELS", "eng/coffee"),
        ]))
        .unwrap();

        assert_eq!(config.mattermost.server_url.as_str(), "https://chat.example.com/");
        assert_eq!(config.mattermost.credentials, Credentials::Token("secret".to_string()));
        assert_eq!(config.channels, vec![ChannelRef::new("eng", "coffee")]);
        assert_eq!(config.ledger_dir, PathBuf::from(DEFAULT_LEDGER_DIR));
        assert_eq!(config.messages, Messages::default());
        assert!(!config.debug);
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_password_config_with_options() {
        let config = Config::from_lookup(lookup(&[
            ("PAIRBOT_MATTERMOST_URL", "chat.example.com"),
            ("PAIRBOT_MATTERMOST_PORT", "8065"),
            ("PAIRBOT_MATTERMOST_SCHEME", "http"),
            ("PAIRBOT_MATTERMOST_USERNAME", "pairbot"),
            ("PAIRBOT_MATTERMOST_PASSWORD", "hunter2"),
            ("PAIRBOT_CHANNELS", "eng/coffee, sales/lunch ,eng/coffee"),
            ("PAIRBOT_DEBUG", "1"),
            ("PAIRBOT_LOG_FORMAT", "json"),
            ("PAIRBOT_SEED", "42"),
            ("PAIRBOT_ANNOUNCEMENT", "Pairing time!"),
        ]))
        .unwrap();

        assert_eq!(config.mattermost.server_url.as_str(), "http://chat.example.com:8065/");
        assert!(matches!(config.mattermost.credentials, Credentials::Password { .. }));
        assert_eq!(config.channels.len(), 2);
        assert!(config.debug);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.messages.announcement.as_deref(), Some("Pairing time!"));
    }

    #[test]
    fn test_missing_credentials() {
        let result = Config::from_lookup(lookup(&[
            ("PAIRBOT_MATTERMOST_URL", "chat.example.com"),
            ("PAIRBOT_MATTERMOST_USERNAME", "pairbot"),
            ("PAIRBOT_CHANNELS", "eng/coffee"),
        ]));
        assert!(matches!(result, Err(PairbotError::Config { ref field, .. }) if field == "PAIRBOT_MATTERMOST_PASSWORD"));
    }

    #[test]
    fn test_invalid_values() {
        let base = [
            ("PAIRBOT_MATTERMOST_URL", "chat.example.com"),
            ("PAIRBOT_MATTERMOST_TOKEN", "secret"),
        ];

        let mut bad_channels = base.to_vec();
        bad_channels.push(("PAIRBOT_CHANNELS", "coffee"));
        assert!(matches!(
            Config::from_lookup(lookup(&bad_channels)),
            Err(PairbotError::Config { ref field, .. }) if field == "PAIRBOT_CHANNELS"
        ));

        let mut empty_channels = base.to_vec();
        empty_channels.push(("PAIRBOT_CHANNELS", " , "));
        assert!(matches!(
            Config::from_lookup(lookup(&empty_channels)),
            Err(PairbotError::Config { ref field, .. }) if field == "PAIRBOT_CHANNELS"
        ));

        let mut bad_format = base.to_vec();
        bad_format.extend([("PAIRBOT_CHANNELS", "eng/coffee"), ("PAIRBOT_LOG_FORMAT", "xml")]);
        assert!(matches!(
            Config::from_lookup(lookup(&bad_format)),
            Err(PairbotError::Config { ref field, .. }) if field == "PAIRBOT_LOG_FORMAT"
        ));

        let mut bad_seed = base.to_vec();
        bad_seed.extend([("PAIRBOT_CHANNELS", "eng/coffee"), ("PAIRBOT_SEED", "-1")]);
        assert!(matches!(
            Config::from_lookup(lookup(&bad_seed)),
            Err(PairbotError::Config { ref field, .. }) if field == "PAIRBOT_SEED"
        ));

        let mut bad_port = base.to_vec();
        bad_port.extend([("PAIRBOT_CHANNELS", "eng/coffee"), ("PAIRBOT_MATTERMOST_PORT", "http")]);
        assert!(matches!(
            Config::from_lookup(lookup(&bad_port)),
            Err(PairbotError::Config { ref field, .. }) if field == "PAIRBOT_MATTERMOST_PORT"
        ));
    }

    #[test]
    fn test_server_url_keeps_path_prefix() {
        let url = parse_server_url("https://example.com/mattermost", "https", None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/mattermost/");
        assert_eq!(url.join("api/v4/").unwrap().as_str(), "https://example.com/mattermost/api/v4/");
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let rendered = format!("{:?}", Credentials::Token("secret".to_string()));
        assert!(!rendered.contains("secret"));
    }
}

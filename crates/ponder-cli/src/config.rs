//! Configuration file support

use ponder_proto::TransportKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration for ponder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL
    pub base_url: Option<String>,
    /// Transport strategy (stream, push, oneshot)
    pub transport: Option<String>,
    /// Whether to use TUI mode by default
    pub tui: Option<bool>,
    /// Cancel a turn that runs longer than this
    pub request_timeout_secs: Option<u64>,
    /// tracing filter directive used when not in verbose mode
    pub log_filter: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ponder")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PONDER_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Log file used while the TUI owns the terminal
    pub fn log_path() -> PathBuf {
        Self::config_dir().join("ponder.log")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            base_url: Some(ponder_proto::DEFAULT_BASE_URL.to_string()),
            transport: Some(TransportKind::default().to_string()),
            tui: Some(true),
            request_timeout_secs: None,
            log_filter: None,
        };

        default_config.save()?;
        Ok(path)
    }

    /// Configured transport, if any
    pub fn transport_kind(&self) -> ponder_proto::Result<Option<TransportKind>> {
        self.transport.as_deref().map(str::parse).transpose()
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# ponder configuration file
# Place at ~/.config/ponder/config.toml (Linux) or set PONDER_CONFIG_PATH

# Agent backend
base_url = "http://localhost:5001"

# How to receive the agent's reasoning:
#   stream  - POST /api/chat/react-stream, newline-delimited JSON (default)
#   push    - GET /api/chat/react-stream as server-sent events
#   oneshot - POST /api/chat, final answer only
transport = "stream"

# Whether to use TUI mode by default
# Set to false for simple stdin/stdout mode
tui = true

# Cancel a turn that takes longer than this many seconds (optional)
# request_timeout_secs = 120

# tracing filter when not running with --verbose (optional)
# log_filter = "ponder=info"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let cfg = Config::parse(example_config()).unwrap();
        assert_eq!(cfg.base_url.as_deref(), Some("http://localhost:5001"));
        assert_eq!(cfg.transport_kind().unwrap(), Some(TransportKind::Stream));
        assert_eq!(cfg.tui, Some(true));
        assert_eq!(cfg.request_timeout_secs, None);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg = Config::parse("transport = \"sse\"\nrequest_timeout_secs = 30\n").unwrap();
        assert!(cfg.base_url.is_none());
        assert_eq!(cfg.transport_kind().unwrap(), Some(TransportKind::Push));
        assert_eq!(cfg.request_timeout_secs, Some(30));
    }

    #[test]
    fn test_bad_transport_is_reported() {
        let cfg = Config::parse("transport = \"pigeon\"").unwrap();
        assert!(cfg.transport_kind().is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let cfg = Config {
            base_url: Some("http://agent:8000".into()),
            transport: Some("oneshot".into()),
            tui: Some(false),
            request_timeout_secs: Some(5),
            log_filter: None,
        };
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back = Config::parse(&text).unwrap();
        assert_eq!(back.base_url, cfg.base_url);
        assert_eq!(back.tui, Some(false));
    }
}

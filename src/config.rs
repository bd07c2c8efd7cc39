use serde::Deserialize;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::relay::{EndpointDescriptor, PayloadShape, RemoteConfig};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

/// An endpoint entry: either a bare URL or a URL with an explicit payload shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointEntry {
    Url(String),
    Detailed { url: String, shape: Option<PayloadShape> },
}

impl From<EndpointEntry> for EndpointDescriptor {
    fn from(entry: EndpointEntry) -> Self {
        match entry {
            EndpointEntry::Url(url) => EndpointDescriptor::from_url(url),
            EndpointEntry::Detailed { url, shape: Some(shape) } => EndpointDescriptor::new(url, shape),
            EndpointEntry::Detailed { url, shape: None } => EndpointDescriptor::from_url(url),
        }
    }
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    /// Falls back to TELEGRAM_BOT_TOKEN / BOT_TOKEN when empty.
    #[serde(default)]
    telegram_bot_token: String,
    /// Remote text-generation endpoints, tried in rotation.
    endpoints: Option<Vec<EndpointEntry>>,
    /// Bearer token sent to the endpoints.
    api_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_max_reply_chars")]
    max_reply_chars: usize,
    #[serde(default = "default_history_max_users")]
    history_max_users: usize,
    #[serde(default = "default_history_max_messages")]
    history_max_messages: usize,
    /// Directory for log files. Defaults to current directory.
    data_dir: Option<String>,
    #[serde(default)]
    debug: bool,
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_max_reply_chars() -> usize {
    200
}

fn default_history_max_users() -> usize {
    1000
}

fn default_history_max_messages() -> usize {
    50
}

pub fn default_endpoints() -> Vec<EndpointDescriptor> {
    [
        "https://api-inference.huggingface.co/models/microsoft/DialoGPT-medium",
        "https://api-inference.huggingface.co/models/facebook/blenderbot-400M-distill",
        "https://api-inference.huggingface.co/models/microsoft/DialoGPT-small",
    ]
    .into_iter()
    .map(EndpointDescriptor::from_url)
    .collect()
}

pub struct Config {
    pub telegram_bot_token: String,
    pub endpoints: Vec<EndpointDescriptor>,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub max_reply_chars: usize,
    pub history_max_users: NonZeroUsize,
    pub history_max_messages: NonZeroUsize,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
    /// Raises the default log level to DEBUG.
    pub debug: bool,
}

impl Config {
    /// Load from a JSON file. A missing file is not an error: everything can
    /// come from defaults and the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    fn load_with_env<P, F>(path: P, env: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_path = path.as_ref().to_path_buf();
        let file = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
            serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?
        } else {
            ConfigFile::default_values()
        };
        Self::from_file(file, env)
    }

    fn from_file<F>(file: ConfigFile, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut token = file.telegram_bot_token.trim().to_string();
        if token.is_empty() {
            token = ["TELEGRAM_BOT_TOKEN", "BOT_TOKEN"]
                .into_iter()
                .filter_map(&env)
                .map(|t| t.trim().to_string())
                .find(|t| !t.is_empty())
                .unwrap_or_default();
        }
        if token.is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token is required (or set TELEGRAM_BOT_TOKEN)".into(),
            ));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }

        let endpoints = match file.endpoints {
            Some(entries) => entries.into_iter().map(EndpointDescriptor::from).collect(),
            None => default_endpoints(),
        };
        if endpoints.is_empty() {
            return Err(ConfigError::Validation("endpoints must contain at least one URL".into()));
        }
        if let Some(bad) = endpoints.iter().find(|e| reqwest::Url::parse(&e.url).is_err()) {
            return Err(ConfigError::Validation(format!("endpoint URL '{}' is invalid", bad.url)));
        }

        if file.request_timeout_secs == 0 {
            return Err(ConfigError::Validation("request_timeout_secs must be positive".into()));
        }
        if file.max_reply_chars == 0 {
            return Err(ConfigError::Validation("max_reply_chars must be positive".into()));
        }
        let history_max_users = NonZeroUsize::new(file.history_max_users)
            .ok_or_else(|| ConfigError::Validation("history_max_users must be positive".into()))?;
        let history_max_messages = NonZeroUsize::new(file.history_max_messages)
            .ok_or_else(|| ConfigError::Validation("history_max_messages must be positive".into()))?;

        let debug = file.debug
            || env("DEBUG")
                .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
                .unwrap_or(false);

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token: token,
            endpoints,
            api_token: file.api_token.filter(|t| !t.is_empty()),
            request_timeout: Duration::from_secs(file.request_timeout_secs),
            max_reply_chars: file.max_reply_chars,
            history_max_users,
            history_max_messages,
            data_dir,
            debug,
        })
    }

    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig {
            timeout: self.request_timeout,
            max_reply_chars: self.max_reply_chars,
            api_token: self.api_token.clone(),
            history_max_users: self.history_max_users,
            history_max_messages: self.history_max_messages,
        }
    }
}

impl ConfigFile {
    fn default_values() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            max_reply_chars: default_max_reply_chars(),
            history_max_users: default_history_max_users(),
            history_max_messages: default_history_max_messages(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config_uses_defaults() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz"
        }"#);
        let config = Config::load_with_env(file.path(), no_env).expect("should load valid config");
        assert_eq!(config.endpoints.len(), 3);
        assert_eq!(config.endpoints[0].shape, PayloadShape::Conversational);
        assert_eq!(config.endpoints[1].shape, PayloadShape::Prompt);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_reply_chars, 200);
        assert!(!config.debug);
    }

    #[test]
    fn test_custom_endpoints() {
        let file = write_config(r#"{
            "telegram_bot_token": "123:abc",
            "endpoints": [
                "http://localhost:8080/generate",
                {"url": "http://localhost:8081/chat", "shape": "conversational"}
            ],
            "request_timeout_secs": 2
        }"#);
        let config = Config::load_with_env(file.path(), no_env).unwrap();
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[0].shape, PayloadShape::Prompt);
        assert_eq!(config.endpoints[1].shape, PayloadShape::Conversational);
        assert_eq!(config.remote_config().timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_token_from_env() {
        let file = write_config("{}");
        let env = |key: &str| (key == "BOT_TOKEN").then(|| "42:secret".to_string());
        let config = Config::load_with_env(file.path(), env).unwrap();
        assert_eq!(config.telegram_bot_token, "42:secret");
    }

    #[test]
    fn test_missing_file_uses_env() {
        let env = |key: &str| match key {
            "TELEGRAM_BOT_TOKEN" => Some("42:secret".to_string()),
            "DEBUG" => Some("Yes".to_string()),
            _ => None,
        };
        let config = Config::load_with_env("/nonexistent/path/relaybot.json", env).unwrap();
        assert!(config.debug);
        assert_eq!(config.history_max_messages.get(), 50);
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{ "telegram_bot_token": "" }"#);
        let err = assert_err(Config::load_with_env(file.path(), no_env));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format() {
        for token in ["invalid_token_no_colon", "notanumber:ABCdef", "123456789:"] {
            let file = write_config(&format!(r#"{{ "telegram_bot_token": "{token}" }}"#));
            let err = assert_err(Config::load_with_env(file.path(), no_env));
            assert!(matches!(err, ConfigError::Validation(_)));
        }
    }

    #[test]
    fn test_empty_endpoints() {
        let file = write_config(r#"{ "telegram_bot_token": "123:abc", "endpoints": [] }"#);
        let err = assert_err(Config::load_with_env(file.path(), no_env));
        assert!(err.to_string().contains("endpoints"));
    }

    #[test]
    fn test_invalid_endpoint_url() {
        let file = write_config(r#"{ "telegram_bot_token": "123:abc", "endpoints": ["not a url"] }"#);
        let err = assert_err(Config::load_with_env(file.path(), no_env));
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn test_zero_limits_rejected() {
        for field in ["request_timeout_secs", "max_reply_chars", "history_max_users", "history_max_messages"] {
            let file = write_config(&format!(r#"{{ "telegram_bot_token": "123:abc", "{field}": 0 }}"#));
            let err = assert_err(Config::load_with_env(file.path(), no_env));
            assert!(err.to_string().contains(field), "{field}: {err}");
        }
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load_with_env(file.path(), no_env));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}

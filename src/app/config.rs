use crate::connector::ConnectorConfig;
use crate::sink::SinkConfig;
use crate::worker::{DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_QUEUE_SIZE, WorkerConfig};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(ConfigError::EnvError(format!("Invalid LOG_LEVEL: {s}"))),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Output format of the connector's own diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about = "Ships newline-delimited events from stdin to a Loglens collector", long_about = None)]
#[serde(default)]
pub struct Config {
    /// Collector endpoint URL
    #[arg(long, env = "LOGLENS_ENDPOINT", default_value = "http://localhost:8080/v1/logs")]
    pub endpoint: String,

    /// Bearer token sent with every request
    #[arg(long, env = "LOGLENS_TOKEN", default_value = "", hide_env_values = true)]
    pub token: String,

    /// Category attached to every shipped entry
    #[arg(long, env = "LOGLENS_CATEGORY", default_value = "loglens")]
    pub category: String,

    /// Index written into each message envelope
    #[arg(long, env = "LOGLENS_INDEX", default_value = "default")]
    pub index: String,

    /// Messages per network call
    #[arg(long, env = "MAX_BATCH_SIZE", default_value_t = DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch_size: usize,

    /// Queue length above which all buffered messages are purged
    #[arg(long, env = "MAX_QUEUE_SIZE", default_value_t = DEFAULT_MAX_QUEUE_SIZE)]
    pub max_queue_size: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Connect timeout in seconds
    #[arg(long, env = "CONNECT_TIMEOUT_SECS", default_value = "10")]
    pub connect_timeout_secs: u64,

    /// Health-check path requested with credentials when a connection is opened
    #[arg(long, env = "HEALTH_PATH")]
    pub health_path: Option<String>,

    /// Gzip request bodies
    #[arg(long, env = "ENABLE_COMPRESSION")]
    pub enable_compression: bool,

    /// Print envelopes to stdout instead of shipping them
    #[arg(long, env = "LOGLENS_DEBUG")]
    pub debug: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Diagnostic log format
    #[arg(long, env = "LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub request_timeout: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub connect_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1/logs".to_string(),
            token: String::new(),
            category: "loglens".to_string(),
            index: "default".to_string(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            health_path: None,
            enable_compression: false,
            debug: false,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            config_file: None,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Self::parse_args(args)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses CLI args; if `--config-file` is given, the file is loaded instead.
    /// Validation runs once, on whichever configuration wins.
    pub fn load<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Self::parse_args(args)?;
        match &config.config_file {
            Some(path) => Self::from_file(path),
            None => {
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn parse_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::try_parse_from(args)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        config.post_process();
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        load_env_string("LOGLENS_ENDPOINT", &mut config.endpoint);
        load_env_string("LOGLENS_TOKEN", &mut config.token);
        load_env_string("LOGLENS_CATEGORY", &mut config.category);
        load_env_string("LOGLENS_INDEX", &mut config.index);
        load_env_var("MAX_BATCH_SIZE", &mut config.max_batch_size)?;
        load_env_var("MAX_QUEUE_SIZE", &mut config.max_queue_size)?;
        load_env_var("REQUEST_TIMEOUT_SECS", &mut config.request_timeout_secs)?;
        load_env_var("CONNECT_TIMEOUT_SECS", &mut config.connect_timeout_secs)?;
        load_env_string_opt("HEALTH_PATH", &mut config.health_path);
        load_env_var("ENABLE_COMPRESSION", &mut config.enable_compression)?;
        load_env_var("LOGLENS_DEBUG", &mut config.debug)?;
        load_env_var("LOG_LEVEL", &mut config.log_level)?;

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.log_format = match format.to_lowercase().as_str() {
                "compact" => LogFormat::Compact,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::EnvError(format!(
                        "Invalid LOG_FORMAT: {format}. Valid values: compact, json"
                    )));
                }
            };
        }

        config.post_process();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.post_process();
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) {
        self.request_timeout = Duration::from_secs(self.request_timeout_secs);
        self.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid endpoint URL '{}': {}", self.endpoint, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "Endpoint must be http or https, got '{}'",
                url.scheme()
            )));
        }

        // Printing locally needs no credentials
        if !self.debug && self.token.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "A bearer token is required unless --debug is set".to_string(),
            ));
        }

        if self.category.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Category must not be empty".to_string(),
            ));
        }

        if self.max_batch_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Max batch size must be greater than 0".to_string(),
            ));
        }

        if self.max_queue_size < self.max_batch_size {
            return Err(ConfigError::InvalidConfig(format!(
                "Max queue size ({}) must be at least as large as max batch size ({})",
                self.max_queue_size, self.max_batch_size
            )));
        }

        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn connector_config(&self) -> ConnectorConfig {
        ConnectorConfig {
            category: self.category.clone(),
            worker: WorkerConfig {
                max_batch_size: self.max_batch_size,
                max_queue_size: self.max_queue_size,
            },
        }
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            endpoint: self.endpoint.clone(),
            token: self.token.clone(),
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            enable_compression: self.enable_compression,
            health_path: self.health_path.clone(),
            ..SinkConfig::default()
        }
    }
}

/// Loads and parses an environment variable. Missing variables keep the default.
fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = value
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

fn load_env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
    }
}

fn load_env_string_opt(name: &str, target: &mut Option<String>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(value);
    }
}

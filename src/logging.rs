//! Logger setup
//!
//! All diagnostics go through `tracing` and are written to stderr, either as
//! human-readable text or as one JSON object per line.

use std::fmt;
use std::io::IsTerminal;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_subscriber::{fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("Invalid log format: {0} (expected: text|json)")]
    InvalidFormat(String),

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Logger already initialized")]
    AlreadyInitialized,
}

pub type LoggerResult<T> = Result<T, LoggerError>;

/// Output format for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(LoggerError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoggerFormat::Text => "text",
            LoggerFormat::Json => "json",
        })
    }
}

/// A validated `EnvFilter` expression such as `"info"` or `"arena=debug,warn"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    pub fn new(s: impl Into<String>) -> LoggerResult<Self> {
        Self::try_from(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_env_filter(&self) -> LoggerResult<EnvFilter> {
        EnvFilter::try_new(self.as_str()).map_err(|e| LoggerError::InvalidLevel(e.to_string()))
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LoggerError::InvalidLevel(value));
        }
        EnvFilter::try_new(trimmed).map_err(|e| LoggerError::InvalidLevel(format!("{value}: {e}")))?;
        Ok(Self(trimmed.to_string()))
    }
}

impl From<LoggerLevel> for String {
    fn from(level: LoggerLevel) -> Self {
        level.0
    }
}

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: LoggerLevel,
    /// Include module targets in each line
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            with_targets: false,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Color only when enabled and stderr is a terminal.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stderr().is_terminal()
    }
}

/// Install the global subscriber described by `cfg`.
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    let filter = cfg.level.to_env_filter()?;
    match cfg.format {
        LoggerFormat::Text => {
            let layer = tfmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(cfg.should_use_color())
                .with_target(cfg.with_targets);
            init_subscriber(tracing_subscriber::registry().with(filter).with(layer))
        }
        LoggerFormat::Json => {
            let layer = tfmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(cfg.with_targets);
            init_subscriber(tracing_subscriber::registry().with(filter).with(layer))
        }
    }
}

fn init_subscriber<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}

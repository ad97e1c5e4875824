//! Tracing subscriber setup.

use crate::error::LoggingError;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// How much the solver logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Off,
    #[default]
    Normal,
    Verbose,
}

impl LogLevel {
    /// Default filter directive when `RUST_LOG` is unset.
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Normal => "info",
            LogLevel::Verbose => "skysolve=debug,info",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Off => write!(f, "off"),
            LogLevel::Normal => write!(f, "normal"),
            LogLevel::Verbose => write!(f, "verbose"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" | "none" => Ok(LogLevel::Off),
            "normal" | "info" => Ok(LogLevel::Normal),
            "verbose" | "debug" => Ok(LogLevel::Verbose),
            _ => Err(format!(
                "Unknown log level: '{}'. Valid options: off, normal, verbose",
                s
            )),
        }
    }
}

fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()))
}

/// Install a global fmt subscriber, writing to `log_file` when given.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: LogLevel, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(level));

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.try_init(),
    };
    installed.map_err(|_| LoggingError::AlreadyInitialised)
}

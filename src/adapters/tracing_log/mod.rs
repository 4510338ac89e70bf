// Tracing log adapter - Structured logging using tracing crate

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::domain::errors::*;
use crate::ports::*;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level_str: &str) -> Result<Self, DomainError> {
        match level_str.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(DomainError::InvalidInput(format!(
                "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                level_str
            ))),
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Tracing log adapter, tagging every line with a component name
pub struct TracingLogAdapter {
    component: &'static str,
}

impl TracingLogAdapter {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }
}

impl Default for TracingLogAdapter {
    fn default() -> Self {
        Self::new("livepair")
    }
}

#[async_trait]
impl LogPort for TracingLogAdapter {
    async fn info(&self, message: &str) {
        info!(component = self.component, "{}", message);
    }

    async fn warn(&self, message: &str) {
        warn!(component = self.component, "{}", message);
    }

    async fn error(&self, message: &str) {
        error!(component = self.component, "{}", message);
    }

    async fn debug(&self, message: &str) {
        debug!(component = self.component, "{}", message);
    }
}

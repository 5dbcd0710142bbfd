//! Structured logging via `tracing`.
//!
//! - Level-based filtering with per-module overrides
//! - Idempotent initialization (first call wins, a host subscriber is kept)
//! - Timing guard for expensive operations such as a full placement

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Once;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Installs the default subscriber when the crate runs inside a Bevy app
/// that has no `LogPlugin`
pub struct LoggingPlugin;

impl Plugin for LoggingPlugin {
    fn build(&self, _app: &mut App) {
        init_tracing_default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Map a `-v` count onto a level: 0 warn, 1 info, 2 debug, 3+ trace
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    pub default_level: LogLevel,
    pub module_filters: Vec<(String, LogLevel)>,
    pub show_thread_ids: bool,
    pub show_targets: bool,
    pub show_file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Info,
            module_filters: vec![
                ("noir_core::scene".to_string(), LogLevel::Info),
                ("noir_core::threat".to_string(), LogLevel::Info),
                ("noir_core::resolver".to_string(), LogLevel::Info),
                ("noir_core::balance".to_string(), LogLevel::Warn),
            ],
            show_thread_ids: false,
            show_targets: true,
            show_file_line: false,
        }
    }
}

impl TracingConfig {
    /// Same filters, different base level
    pub fn with_level(level: LogLevel) -> Self {
        Self {
            default_level: level,
            ..Self::default()
        }
    }

    pub fn to_env_filter_string(&self) -> String {
        let mut parts = vec![self.default_level.as_str().to_string()];
        for (module, level) in &self.module_filters {
            // A module filter never hides what the base level would show
            let level = (*level).min(self.default_level);
            parts.push(format!("{}={}", module, level.as_str()));
        }
        parts.join(",")
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

static TRACING_INIT: Once = Once::new();

pub fn init_tracing_default() {
    init_tracing(&TracingConfig::default());
}

/// Initialize tracing. `RUST_LOG` overrides the configured filters.
pub fn init_tracing(config: &TracingConfig) {
    let filter_str = config.to_env_filter_string();
    let (targets, threads, file_line) = (
        config.show_targets,
        config.show_thread_ids,
        config.show_file_line,
    );
    TRACING_INIT.call_once(move || {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(targets)
            .with_thread_ids(threads)
            .with_file(file_line)
            .with_line_number(file_line)
            .with_writer(std::io::stderr)
            .compact();

        // Ignore error if a global subscriber is already set (e.g., by Bevy)
        let _ = subscriber.try_init();
    });
}

/// Span guard that reports its elapsed time at debug level on drop
pub struct TimingSpan {
    name: &'static str,
    started: Instant,
    _span: tracing::span::EnteredSpan,
}

impl TimingSpan {
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!("timed", op = name);
        Self {
            name,
            started: Instant::now(),
            _span: span.entered(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for TimingSpan {
    fn drop(&mut self) {
        tracing::debug!(op = self.name, elapsed_ms = self.elapsed_ms(), "timed operation finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_from_verbosity() {
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Warn);
        assert_eq!(LogLevel::from_verbosity(1), LogLevel::Info);
        assert_eq!(LogLevel::from_verbosity(2), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(9), LogLevel::Trace);
    }

    #[test]
    fn test_env_filter_string() {
        let filter = TracingConfig::default().to_env_filter_string();
        assert!(filter.starts_with("info"));
        assert!(filter.contains("noir_core::scene=info"));
        assert!(filter.contains("noir_core::balance=warn"));
    }

    #[test]
    fn test_module_filter_follows_verbose_base() {
        let filter = TracingConfig::with_level(LogLevel::Trace).to_env_filter_string();
        assert!(filter.contains("noir_core::balance=trace"));
        assert!(filter.contains("noir_core::threat=trace"));
    }

    #[test]
    fn test_tracing_config_json_roundtrip() {
        let config = TracingConfig::with_level(LogLevel::Debug);
        let restored = TracingConfig::from_json(&config.to_json()).unwrap();
        assert_eq!(restored.default_level, LogLevel::Debug);
        assert_eq!(restored.module_filters, config.module_filters);
    }

    #[test]
    fn test_init_tracing_idempotent() {
        init_tracing_default();
        init_tracing_default();
        init_tracing(&TracingConfig::with_level(LogLevel::Trace));
    }

    #[test]
    fn test_timing_span_measures() {
        init_tracing_default();
        let span = TimingSpan::new("scene_place");
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(span.elapsed_ms() >= 1.0);
    }

    #[test]
    fn test_logging_plugin_builds() {
        let mut app = App::new();
        app.add_plugins(LoggingPlugin);
        app.update();
    }
}

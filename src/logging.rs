//! Debug logging
//!
//! Library code logs through the `log` facade. This module provides the
//! stderr backend the binary installs, filtered by level and category.

use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Environment variable that switches debug output on
pub const DEBUG_ENV: &str = "TRELLIS_DEBUG";

/// Debug log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// State writes and view updates
    Trace,
    /// Passage renders, directive calls, setup runs
    Debug,
    /// Output of the script `log` builtin
    Info,
    /// Ignored input such as bad highlights or unknown chain targets
    Warn,
    /// Failed renders and scripts
    Error,
}

impl LogLevel {
    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

/// Debug log category, derived from the module a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebugCategory {
    /// Navigation and the story controller
    Story,
    /// State store mutations
    State,
    /// Template rendering and directives
    Render,
    /// Script evaluation
    Script,
    /// Map, audio, and typing collaborators
    Effects,
    /// Anything else (repository, cli)
    Host,
}

impl DebugCategory {
    pub fn from_target(target: &str) -> Self {
        let module = target
            .strip_prefix("trellis::")
            .unwrap_or(target)
            .split("::")
            .next()
            .unwrap_or_default();
        match module {
            "story" => DebugCategory::Story,
            "state" | "storage" => DebugCategory::State,
            "render" | "markup" => DebugCategory::Render,
            "script" => DebugCategory::Script,
            "effects" | "presentation" => DebugCategory::Effects,
            _ => DebugCategory::Host,
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Enable debug logging
    pub enabled: bool,
    /// Minimum log level
    pub level: LogLevel,
    /// Enabled categories
    pub categories: HashSet<DebugCategory>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        let mut categories = HashSet::new();
        categories.insert(DebugCategory::Story);
        categories.insert(DebugCategory::Render);
        categories.insert(DebugCategory::Script);

        Self {
            enabled: false,
            level: LogLevel::Debug,
            categories,
        }
    }
}

impl DebugConfig {
    /// Every category at trace level
    pub fn verbose() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Trace,
            categories: [
                DebugCategory::Story,
                DebugCategory::State,
                DebugCategory::Render,
                DebugCategory::Script,
                DebugCategory::Effects,
                DebugCategory::Host,
            ]
            .into_iter()
            .collect(),
        }
    }
}

/// Stderr logger
pub struct DebugLogger {
    config: DebugConfig,
}

impl DebugLogger {
    pub fn new(config: DebugConfig) -> Self {
        Self { config }
    }

    fn accepts(&self, level: Level, target: &str) -> bool {
        // Warnings and errors always pass the category filter
        if level <= Level::Warn {
            return true;
        }
        self.config.enabled
            && level <= self.config.level.filter()
            && self
                .config
                .categories
                .contains(&DebugCategory::from_target(target))
    }
}

impl Log for DebugLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.accepts(metadata.level(), metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let category = format!("{:?}", DebugCategory::from_target(record.target()));
        eprintln!("[{}] {:10} {}", record.level(), category, record.args());
    }

    fn flush(&self) {}
}

/// Install the stderr logger as the global `log` backend
pub fn init(config: DebugConfig) -> Result<(), log::SetLoggerError> {
    let max = if config.enabled {
        config.level.filter()
    } else {
        LevelFilter::Warn
    };
    log::set_logger(Box::leak(Box::new(DebugLogger::new(config))))?;
    log::set_max_level(max);
    Ok(())
}

//! Story configuration

use crate::error::StoryError;
use crate::logging::{DEBUG_ENV, DebugConfig};
use serde::{Deserialize, Serialize};

/// Runtime configuration for a story session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    /// Name of the passage rendered once at construction for its side effects
    pub setup_passage: String,
    /// Tag marking passages whose content is a map grid
    pub map_tag: String,
    /// Tag marking the passage holding JSON map defaults
    pub map_defaults_tag: String,
    /// Defaults for the type directive
    pub typing: TypingConfig,
    /// Defaults for the audio directives
    pub audio: AudioConfig,
    /// Restore the current/last pointers when rendering a passage fails
    pub rollback_on_render_failure: bool,
    /// Debug logging
    pub debug: DebugConfig,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            setup_passage: "StorySetup".to_string(),
            map_tag: "map".to_string(),
            map_defaults_tag: "map-defaults".to_string(),
            typing: TypingConfig::default(),
            audio: AudioConfig::default(),
            rollback_on_render_failure: true,
            debug: DebugConfig::default(),
        }
    }
}

/// Type directive defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    /// Milliseconds between revealed characters
    pub speed_ms: u64,
    /// Milliseconds before typing starts
    pub delay_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            speed_ms: 40,
            delay_ms: 0,
        }
    }
}

/// Audio directive defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Volume used when the play directive gives none
    pub volume: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { volume: 1.0 }
    }
}

impl StoryConfig {
    /// Parse a JSON configuration document; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, StoryError> {
        serde_json::from_str(json)
            .map_err(|e| StoryError::configuration(format!("invalid story config: {e}")))
    }

    /// Overlay settings taken from the process environment
    pub fn with_env(self) -> Self {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay settings using a custom variable lookup
    pub fn with_env_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(DEBUG_ENV)
            && value != "0"
        {
            self.debug.enabled = true;
        }
        self
    }
}

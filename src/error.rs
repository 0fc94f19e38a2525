//! Story errors
//!
//! Construction problems (`Validation`) abort loading. Everything else is
//! raised per operation and left to the caller to present.

use thiserror::Error;

/// Errors raised while loading, navigating, or rendering a story
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoryError {
    /// Missing or inconsistent metadata, or a directive called with bad inputs
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// Unknown passage, map, or state path
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    /// Structured data that had to parse and did not
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// A script directive failed while running
    #[error("directive failed: {message}\n--- source ---\n{source_text}")]
    DirectiveExecution {
        message: String,
        source_text: String,
    },

    /// Malformed directive markup
    #[error("template error: {reason}")]
    Template { reason: String },
}

impl StoryError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn not_found(what: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            key: key.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn directive_execution(message: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self::DirectiveExecution {
            message: message.into(),
            source_text: source_text.into(),
        }
    }

    pub fn template(reason: impl Into<String>) -> Self {
        Self::Template {
            reason: reason.into(),
        }
    }
}

//! Story metadata and the validated passage collection

use crate::error::StoryError;
use crate::markup::MarkupConverter;
use crate::parser::DocumentSource;
use crate::types::passage::Passage;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;

/// Attributes of the story root element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryMetadata {
    pub name: String,
    pub ifid: String,
    /// pid of the first passage shown
    pub start_node: String,
    pub format: Option<String>,
    pub format_version: Option<String>,
    pub zoom: Option<String>,
    pub creator: Option<String>,
    pub creator_version: Option<String>,
}

/// Everything read from a story document, validated
#[derive(Debug, Clone, PartialEq)]
pub struct StoryData {
    pub metadata: StoryMetadata,
    pub passages: Vec<Passage>,
}

impl StoryData {
    /// Read and validate a story from a document source.
    ///
    /// Any missing required attribute aborts the whole load.
    pub fn from_source(
        source: &dyn DocumentSource,
        converter: &dyn MarkupConverter,
    ) -> Result<Self, StoryError> {
        let required = |attr: &str, what: &str| {
            source
                .story_attribute(attr)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| StoryError::validation(what.to_string()))
        };

        let metadata = StoryMetadata {
            name: required("name", "story is missing a name")?,
            ifid: required("ifid", "story is missing an ifid")?,
            start_node: required("startnode", "no startnode specified")?,
            format: source.story_attribute("format"),
            format_version: source.story_attribute("format-version"),
            zoom: source.story_attribute("zoom"),
            creator: source.story_attribute("creator"),
            creator_version: source.story_attribute("creator-version"),
        };

        let passages = source
            .passages()
            .into_iter()
            .map(|attrs| Passage::from_attributes(attrs, converter))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(metadata, passages)
    }

    /// Assemble story data, rejecting duplicate pids or names
    pub fn new(metadata: StoryMetadata, passages: Vec<Passage>) -> Result<Self, StoryError> {
        let mut pids = HashSet::new();
        let mut names = HashSet::new();
        for passage in &passages {
            if !pids.insert(passage.pid()) {
                return Err(StoryError::validation(format!(
                    "duplicate passage pid {}",
                    passage.pid()
                )));
            }
            if !names.insert(passage.name()) {
                return Err(StoryError::validation(format!(
                    "duplicate passage name {}",
                    passage.name()
                )));
            }
        }

        Ok(Self { metadata, passages })
    }
}

/// Read-only window onto a story, handed to directives and scripts
#[derive(Debug, Clone, Copy)]
pub struct StoryView<'a> {
    pub metadata: &'a StoryMetadata,
    pub passages: &'a [Passage],
}

impl<'a> StoryView<'a> {
    pub fn passage_by_name(&self, name: &str) -> Option<&'a Passage> {
        self.passages.iter().find(|p| p.name() == name)
    }

    /// JSON projection exposed to scripts as `story`
    pub fn to_value(&self) -> Value {
        json!({
            "name": self.metadata.name,
            "ifid": self.metadata.ifid,
            "start": self.metadata.start_node,
            "passages": self.passages.iter().map(Passage::name).collect::<Vec<_>>(),
        })
    }
}

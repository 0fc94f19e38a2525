//! # trellis
//!
//! A runtime for Twine-style interactive stories. It reads a published story
//! document, renders passages through a template layer with story
//! directives, and drives navigation, map display, typed text and audio
//! through host-provided presentation surfaces.
//!
//! ## Quick Start
//!
//! ```rust
//! use trellis::{CommonMark, HeadlessPresentation, HtmlDocument, Story, StoryData};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let html = r#"<tw-storydata name="Caves" ifid="C-1" startnode="1">
//! <tw-passagedata pid="1" name="Mouth" tags="">{{set torch=true}}Cold air. [[Tunnel]]</tw-passagedata>
//! <tw-passagedata pid="2" name="Tunnel" tags="">Torch lit: {{torch}}</tw-passagedata>
//! </tw-storydata>"#;
//!
//! let document = HtmlDocument::parse(html)?;
//! let data = StoryData::from_source(&document, &CommonMark::default())?;
//! let mut story = Story::builder(data).build()?;
//! let mut ui = HeadlessPresentation::new();
//!
//! story.display_current_passage(ui.targets())?;
//! assert_eq!(ui.links.target(0), Some("Tunnel"));
//!
//! story.follow_link("Tunnel", ui.targets())?;
//! assert_eq!(ui.passage.active().unwrap().text(), "Torch lit: true");
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! - `parser`, `types`: reading and validating the story document
//! - `state`, `storage`: the variable store and its saved form
//! - `script`, `render`: the expression language and template directives
//! - `effects`: map, typing and audio surfaces
//! - `presentation`: traits for the passage, link and compass views
//! - `story`: navigation tying everything together
//! - `repository`, `cli`: file storage and the terminal front end

pub mod cli;
pub mod config;
pub mod effects;
pub mod error;
pub mod logging;
pub mod markup;
pub mod parser;
pub mod presentation;
pub mod render;
pub mod repository;
pub mod script;
pub mod state;
pub mod storage;
pub mod story;
pub mod types;

pub use config::StoryConfig;
pub use error::StoryError;
pub use markup::{CommonMark, MarkupConverter};
pub use parser::{DocumentSource, HtmlDocument};
pub use presentation::{
    DirectionView, DisplayTargets, HeadlessPresentation, LinkView, PassageView,
};
pub use repository::{FileSystemStoryRepository, RepositoryError, StoryRepository};
pub use state::{Scope, StateStore};
pub use storage::{load, save};
pub use story::{PassageRef, Story, StoryBuilder, StorySnapshot};
pub use types::{Direction, Link, Passage, StoryData, StoryMetadata};

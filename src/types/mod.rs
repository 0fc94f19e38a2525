//! Core data types
//!
//! - Passage: one node of story content with its extracted links
//! - StoryData: story metadata plus the validated passage collection

pub mod passage;
pub mod story_data;

pub use passage::{Direction, Link, LinkKind, Passage, PassageAttributes, Point, Size};
pub use story_data::{StoryData, StoryMetadata, StoryView};

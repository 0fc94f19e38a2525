//! Presentation effects driven by directives: grid maps, audio and typing

pub mod audio;
pub mod map;
pub mod typing;

pub use audio::{AudioLibrary, AudioPlayer, Track};
pub use map::{
    DisplayedMap, GridMap, HighlightPoint, MapDefaults, MapDefaultsPatch, MapDisplay,
    PassageMap,
};
pub use typing::{Typer, TypingFrame, TypingRegistry, TypingSpec};

//! Terminal view tracking
//!
//! Remembers which map and which tracks were last shown so each step only
//! prints what changed.

use crate::effects::{DisplayedMap, Track};
use crate::presentation::{HeadlessPresentation, PassageView};
use crate::story::Story;
use std::collections::BTreeSet;

/// What the terminal last showed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    map: Option<(String, Option<(i64, i64)>)>,
    playing: BTreeSet<String>,
}

/// Changes since the previous step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderDelta {
    /// `Some(None)` when the map was hidden
    pub map: Option<Option<DisplayedMap>>,
    pub started: Vec<String>,
    pub stopped: Vec<String>,
}

impl RenderDelta {
    pub fn is_empty(&self) -> bool {
        self.map.is_none() && self.started.is_empty() && self.stopped.is_empty()
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, map: Option<&DisplayedMap>, tracks: &[Track]) -> RenderDelta {
        let mut delta = RenderDelta::default();

        let shown = map.map(|m| (m.name.clone(), m.highlight.map(|h| (h.x, h.y))));
        if shown != self.map {
            delta.map = Some(map.cloned());
            self.map = shown;
        }

        let playing: BTreeSet<String> = tracks
            .iter()
            .filter(|t| t.playing)
            .map(|t| t.name.clone())
            .collect();
        delta.started = playing.difference(&self.playing).cloned().collect();
        delta.stopped = self.playing.difference(&playing).cloned().collect();
        self.playing = playing;

        delta
    }
}

pub fn render_delta(delta: &RenderDelta) {
    if delta.is_empty() {
        return;
    }
    match &delta.map {
        Some(Some(map)) => {
            println!("[map: {}]", map.name);
            println!("{}", map.to_text());
        }
        Some(None) => println!("[map hidden]"),
        None => {}
    }
    for name in &delta.started {
        println!("[audio: {name}]");
    }
    for name in &delta.stopped {
        println!("[audio stopped: {name}]");
    }
    println!();
}

/// Print the numbered links and the open directions
pub fn show_passage(ui: &HeadlessPresentation) {
    for (i, link) in ui.links.links().iter().enumerate() {
        println!("{}. {}", i + 1, link.alias);
    }
    let directions: Vec<String> = ui
        .compass
        .enabled()
        .map(|(direction, _)| direction.to_string())
        .collect();
    if !directions.is_empty() {
        println!("Exits: {}", directions.join(", "));
    }
    if ui.links.is_marked_empty() && directions.is_empty() {
        println!("== THE END ==");
    }
    println!();
}

/// Run every typing unit to completion on a virtual clock.
///
/// Units waiting to be started are released one at a time once nothing
/// else is scheduled.
pub fn settle_typing(story: &mut Story, view: &mut dyn PassageView) {
    let mut now = 0;
    story.tick(now, view);
    loop {
        match story.typing().next_deadline() {
            Some(deadline) => now = now.max(deadline),
            None if story.start_waiting_typing(now) => {}
            None => break,
        }
        story.tick(now, view);
    }
}

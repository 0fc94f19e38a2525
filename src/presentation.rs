//! Presentation surfaces
//!
//! The story controller never touches a concrete UI. It hands rendered
//! markup to a `PassageView`, repopulates an optional `LinkView` and
//! enables controls on an optional `DirectionView`. `HeadlessPresentation`
//! implements all three in memory for terminals and tests.

use crate::markup::unescape_html;
use crate::types::{Direction, Link, Passage};
use serde::Serialize;
use std::collections::BTreeMap;

/// Container receiving rendered passages
pub trait PassageView {
    /// Insert a newly displayed passage and make it the active entry
    fn insert(&mut self, passage: &Passage, markup: &str);
    /// Replace the contents of the node `node_id`; writes to detached nodes are ignored
    fn update_fragment(&mut self, node_id: &str, markup: &str);
}

/// Container of one control per ordinary link
pub trait LinkView {
    fn clear(&mut self);
    fn add_link(&mut self, link: &Link);
    /// The passage has no ordinary links
    fn mark_empty(&mut self);
}

/// Compass controls
pub trait DirectionView {
    fn disable_all(&mut self);
    fn enable(&mut self, direction: Direction, target: &str);
}

/// Where `Story::display_passage` sends its output
pub struct DisplayTargets<'a> {
    pub passage: &'a mut dyn PassageView,
    pub links: Option<&'a mut dyn LinkView>,
    pub directions: Option<&'a mut dyn DirectionView>,
}

impl<'a> DisplayTargets<'a> {
    pub fn new(passage: &'a mut dyn PassageView) -> Self {
        Self {
            passage,
            links: None,
            directions: None,
        }
    }

    pub fn with_links(mut self, links: &'a mut dyn LinkView) -> Self {
        self.links = Some(links);
        self
    }

    pub fn with_directions(mut self, directions: &'a mut dyn DirectionView) -> Self {
        self.directions = Some(directions);
        self
    }
}

/// One displayed passage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassageEntry {
    pub pid: String,
    pub name: String,
    pub markup: String,
    pub active: bool,
    fragments: BTreeMap<String, String>,
}

impl PassageEntry {
    fn new(passage: &Passage, markup: &str) -> Self {
        Self {
            pid: passage.pid().to_string(),
            name: passage.name().to_string(),
            markup: markup.to_string(),
            active: true,
            fragments: BTreeMap::new(),
        }
    }

    fn contains_node(&self, node_id: &str) -> bool {
        self.markup.contains(&format!("id=\"{node_id}\""))
    }

    /// Markup with fragment updates applied
    pub fn rendered(&self) -> String {
        let mut rendered = self.markup.clone();
        for (node_id, fragment) in &self.fragments {
            let marker = format!("id=\"{node_id}\"");
            if let Some(start) = rendered.find(&marker)
                && let Some(end) = rendered[start..].find('>')
            {
                rendered.insert_str(start + end + 1, fragment);
            }
        }
        rendered
    }

    /// Rendered markup reduced to readable text
    pub fn text(&self) -> String {
        plain_text(&self.rendered())
    }
}

/// Append-only log of displayed passages, newest last
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassageLog {
    entries: Vec<PassageEntry>,
    history_limit: Option<usize>,
}

impl PassageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` entries; older ones are detached
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            history_limit: Some(limit.max(1)),
        }
    }

    pub fn entries(&self) -> &[PassageEntry] {
        &self.entries
    }

    pub fn active(&self) -> Option<&PassageEntry> {
        self.entries.iter().rev().find(|entry| entry.active)
    }
}

impl PassageView for PassageLog {
    fn insert(&mut self, passage: &Passage, markup: &str) {
        for entry in &mut self.entries {
            entry.active = false;
        }
        self.entries.push(PassageEntry::new(passage, markup));
        if let Some(limit) = self.history_limit
            && self.entries.len() > limit
        {
            let excess = self.entries.len() - limit;
            self.entries.drain(..excess);
        }
    }

    fn update_fragment(&mut self, node_id: &str, markup: &str) {
        match self
            .entries
            .iter_mut()
            .rev()
            .find(|entry| entry.contains_node(node_id))
        {
            Some(entry) => {
                entry
                    .fragments
                    .insert(node_id.to_string(), markup.to_string());
            }
            None => log::trace!("ignoring update for detached node {node_id}"),
        }
    }
}

/// Ordinary link controls
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkPanel {
    links: Vec<Link>,
    empty: bool,
}

impl LinkPanel {
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn is_marked_empty(&self) -> bool {
        self.empty
    }

    /// Target of the control at `index`, as activated by a click
    pub fn target(&self, index: usize) -> Option<&str> {
        self.links.get(index).map(|link| link.target.as_str())
    }
}

impl LinkView for LinkPanel {
    fn clear(&mut self) {
        self.links.clear();
        self.empty = false;
    }

    fn add_link(&mut self, link: &Link) {
        self.links.push(link.clone());
    }

    fn mark_empty(&mut self) {
        self.empty = true;
    }
}

/// Compass controls: a direction is enabled when it carries a target
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompassPanel {
    enabled: BTreeMap<Direction, String>,
}

impl CompassPanel {
    pub fn target(&self, direction: Direction) -> Option<&str> {
        self.enabled.get(&direction).map(String::as_str)
    }

    pub fn is_enabled(&self, direction: Direction) -> bool {
        self.enabled.contains_key(&direction)
    }

    pub fn enabled(&self) -> impl Iterator<Item = (Direction, &str)> {
        self.enabled.iter().map(|(d, t)| (*d, t.as_str()))
    }
}

impl DirectionView for CompassPanel {
    fn disable_all(&mut self) {
        self.enabled.clear();
    }

    fn enable(&mut self, direction: Direction, target: &str) {
        self.enabled.insert(direction, target.to_string());
    }
}

/// In-memory presentation surface
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeadlessPresentation {
    pub passage: PassageLog,
    pub links: LinkPanel,
    pub compass: CompassPanel,
}

impl HeadlessPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// All three surfaces as display targets
    pub fn targets(&mut self) -> DisplayTargets<'_> {
        DisplayTargets::new(&mut self.passage)
            .with_links(&mut self.links)
            .with_directions(&mut self.compass)
    }
}

/// Strip tags and decode entities; block ends become line breaks
pub fn plain_text(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut rest = markup;
    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('>') else {
            text.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let tag = &rest[open..open + close + 1];
        if matches!(tag, "</p>" | "<br>" | "<br/>" | "<br />" | "</li>" | "</h1>" | "</h2>" | "</h3>") {
            text.push('\n');
        }
        rest = &rest[open + close + 1..];
    }
    text.push_str(rest);
    unescape_html(text.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::CommonMark;
    use crate::types::PassageAttributes;

    fn passage(pid: &str, name: &str) -> Passage {
        Passage::from_attributes(PassageAttributes::new(pid, name, ""), &CommonMark::default())
            .unwrap()
    }

    #[test]
    fn insert_moves_the_active_marker() {
        let mut log = PassageLog::new();
        log.insert(&passage("1", "Start"), "<p>one</p>");
        log.insert(&passage("2", "End"), "<p>two</p>");

        assert_eq!(log.entries().len(), 2);
        assert!(!log.entries()[0].active);
        assert_eq!(log.active().unwrap().name, "End");
    }

    #[test]
    fn fragments_fill_typing_nodes() {
        let mut log = PassageLog::new();
        log.insert(
            &passage("1", "Start"),
            r#"<p><span id="typer-a-1" class="typer"></span>!</p>"#,
        );
        log.update_fragment("typer-a-1", "he");
        log.update_fragment("typer-a-1", "hello");

        let entry = log.active().unwrap();
        assert_eq!(
            entry.rendered(),
            r#"<p><span id="typer-a-1" class="typer">hello</span>!</p>"#
        );
        assert_eq!(entry.text(), "hello!");
    }

    #[test]
    fn updates_to_detached_nodes_are_ignored() {
        let mut log = PassageLog::with_history_limit(1);
        log.insert(&passage("1", "Start"), r#"<span id="old"></span>"#);
        log.insert(&passage("2", "End"), "<p>two</p>");
        log.update_fragment("old", "late");

        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.active().unwrap().rendered(), "<p>two</p>");
    }

    #[test]
    fn panels_track_links_and_compass() {
        let mut ui = HeadlessPresentation::new();
        {
            let targets = ui.targets();
            let links = targets.links.unwrap();
            links.clear();
            links.add_link(&Link::new("Open the door", "Hall"));
            let compass = targets.directions.unwrap();
            compass.disable_all();
            compass.enable(Direction::North, "Cellar");
        }
        assert_eq!(ui.links.target(0), Some("Hall"));
        assert!(!ui.links.is_marked_empty());
        assert_eq!(ui.compass.target(Direction::North), Some("Cellar"));
        assert!(!ui.compass.is_enabled(Direction::South));
    }

    #[test]
    fn plain_text_breaks_blocks() {
        assert_eq!(plain_text("<p>a &amp; b</p>\n<p>c</p>\n"), "a & b\n\nc");
    }
}

//! Passages: one node of authored story content

use crate::error::StoryError;
use crate::markup::{self, MarkupConverter};
use crate::parser::links::extract_links;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Raw attributes of a passage as read from the story document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassageAttributes {
    pub pid: Option<String>,
    pub name: Option<String>,
    /// Whitespace-delimited tag list
    pub tags: Option<String>,
    /// `"x,y"`
    pub position: Option<String>,
    /// `"width,height"`
    pub size: Option<String>,
    /// Inner markup, still entity-escaped
    pub content: String,
}

impl PassageAttributes {
    pub fn new(pid: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            pid: Some(pid.into()),
            name: Some(name.into()),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }
}

/// Layout position from the authoring tool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Layout size from the authoring tool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Compass vocabulary that routes a link to the directional controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Case-insensitive match of a whole link alias
    pub fn from_alias(alias: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|direction| direction.as_str().eq_ignore_ascii_case(alias))
    }

    /// Class-like name identifying the control for this direction
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which bucket a link was routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    Ordinary,
    Directional(Direction),
}

/// An outbound navigation link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Name of the passage this link navigates to
    pub target: String,
    /// Text shown for the link
    pub alias: String,
    pub kind: LinkKind,
}

impl Link {
    pub fn new(alias: impl Into<String>, target: impl Into<String>) -> Self {
        let alias = alias.into();
        let kind = match Direction::from_alias(&alias) {
            Some(direction) => LinkKind::Directional(direction),
            None => LinkKind::Ordinary,
        };
        Self {
            target: target.into(),
            alias,
            kind,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self.kind {
            LinkKind::Directional(direction) => Some(direction),
            LinkKind::Ordinary => None,
        }
    }
}

/// One passage. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pid: String,
    name: String,
    tags: BTreeSet<String>,
    position: Point,
    size: Size,
    raw_content: String,
    stripped_content: String,
    content: String,
    links: Vec<Link>,
}

impl Passage {
    /// Build a passage from document attributes.
    ///
    /// Fails when `pid` or `name` is missing or empty. Position and size
    /// fall back to `(0,0)` and `(100,100)` when absent; components that do
    /// not parse become `NaN`.
    pub fn from_attributes(
        attrs: PassageAttributes,
        converter: &dyn MarkupConverter,
    ) -> Result<Self, StoryError> {
        let name = attrs.name.filter(|name| !name.is_empty());
        let pid = match attrs.pid.filter(|pid| !pid.is_empty()) {
            Some(pid) => pid,
            None => {
                return Err(StoryError::validation(format!(
                    "a passage (name: {}) is missing a pid",
                    name.as_deref().unwrap_or("<none>")
                )));
            }
        };
        let Some(name) = name else {
            return Err(StoryError::validation(format!(
                "passage with pid {pid} is missing a name"
            )));
        };

        let tags = attrs
            .tags
            .as_deref()
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let position = parse_pair(attrs.position.as_deref())
            .map(|(x, y)| Point { x, y })
            .unwrap_or(Point { x: 0.0, y: 0.0 });
        let size = parse_pair(attrs.size.as_deref())
            .map(|(width, height)| Size { width, height })
            .unwrap_or(Size {
                width: 100.0,
                height: 100.0,
            });

        let (stripped_content, links) = extract_links(&attrs.content);
        let content = markup::render_passage_markup(&stripped_content, converter);

        Ok(Self {
            pid,
            name,
            tags,
            position,
            size,
            raw_content: attrs.content,
            stripped_content,
            content,
            links,
        })
    }

    pub fn pid(&self) -> &str {
        &self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Content exactly as authored, links included
    pub fn raw_content(&self) -> &str {
        &self.raw_content
    }

    /// Authored content with every link removed in place
    pub fn stripped_content(&self) -> &str {
        &self.stripped_content
    }

    /// Markup-rendered content, ready for the template renderer
    pub fn content(&self) -> &str {
        &self.content
    }

    /// All links in order of appearance
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn ordinary_links(&self) -> impl Iterator<Item = &Link> {
        self.links
            .iter()
            .filter(|link| link.kind == LinkKind::Ordinary)
    }

    pub fn directional_links(&self) -> impl Iterator<Item = &Link> {
        self.links
            .iter()
            .filter(|link| matches!(link.kind, LinkKind::Directional(_)))
    }
}

fn parse_pair(raw: Option<&str>) -> Option<(f64, f64)> {
    let raw = raw.filter(|raw| !raw.is_empty())?;
    let mut parts = raw.split(',').map(parse_component);
    let first = parts.next().unwrap_or(f64::NAN);
    let second = parts.next().unwrap_or(f64::NAN);
    Some((first, second))
}

fn parse_component(part: &str) -> f64 {
    part.trim().parse::<f64>().unwrap_or(f64::NAN)
}

//! Story document reader
//!
//! Reads the Twine 2 published form: one `<tw-storydata>` element holding
//! `<tw-passagedata>` children. Only attributes and passage inner text are
//! read; nothing else in the page matters.

use crate::error::StoryError;
use crate::markup::unescape_html;
use crate::types::passage::PassageAttributes;
use std::collections::HashMap;

pub mod links;


const STORY_TAG: &str = "tw-storydata";
const PASSAGE_TAG: &str = "tw-passagedata";

/// Source of story metadata and passage attributes
pub trait DocumentSource {
    /// Attribute of the story root element
    fn story_attribute(&self, name: &str) -> Option<String>;

    /// Attributes of every passage element, in document order
    fn passages(&self) -> Vec<PassageAttributes>;
}

/// A story document parsed from published HTML
#[derive(Debug, Clone, Default)]
pub struct HtmlDocument {
    story_attributes: HashMap<String, String>,
    passages: Vec<PassageAttributes>,
}

impl HtmlDocument {
    /// Parse the story element out of an HTML page
    pub fn parse(html: &str) -> Result<Self, StoryError> {
        // ASCII lowercasing keeps byte offsets identical
        let lowered = html.to_ascii_lowercase();
        let open = format!("<{STORY_TAG}");
        let start = find_tag(&lowered, &open, 0)
            .ok_or_else(|| StoryError::validation("story data is missing"))?;

        let (story_attributes, body_start) = parse_open_tag(html, start + open.len())
            .ok_or_else(|| StoryError::validation("story data element is not closed"))?;
        let body_end = lowered[body_start..]
            .find(&format!("</{STORY_TAG}>"))
            .map(|offset| body_start + offset)
            .unwrap_or(html.len());

        let mut passages = Vec::new();
        let passage_open = format!("<{PASSAGE_TAG}");
        let passage_close = format!("</{PASSAGE_TAG}>");
        let mut cursor = body_start;

        while let Some(tag_start) = find_tag(&lowered[..body_end], &passage_open, cursor) {
            let (attributes, content_start) =
                parse_open_tag(html, tag_start + passage_open.len()).ok_or_else(|| {
                    StoryError::validation("passage element is not closed")
                })?;
            let content_end = lowered[content_start..body_end]
                .find(&passage_close)
                .map(|offset| content_start + offset)
                .unwrap_or(body_end);

            passages.push(passage_attributes(
                attributes,
                &html[content_start..content_end],
            ));
            cursor = (content_end + passage_close.len()).min(body_end);
        }

        log::debug!("read story document with {} passages", passages.len());

        Ok(Self {
            story_attributes,
            passages,
        })
    }
}

impl DocumentSource for HtmlDocument {
    fn story_attribute(&self, name: &str) -> Option<String> {
        self.story_attributes.get(name).cloned()
    }

    fn passages(&self) -> Vec<PassageAttributes> {
        self.passages.clone()
    }
}

fn passage_attributes(mut attributes: HashMap<String, String>, content: &str) -> PassageAttributes {
    PassageAttributes {
        pid: attributes.remove("pid"),
        name: attributes.remove("name"),
        tags: attributes.remove("tags"),
        position: attributes.remove("position"),
        size: attributes.remove("size"),
        content: content.to_string(),
    }
}

/// Find `<tag` followed by whitespace, `>` or `/`, so `<tw-storydata` does not match a longer name
fn find_tag(lowered: &str, open: &str, from: usize) -> Option<usize> {
    let mut from = from;
    while let Some(offset) = lowered.get(from..)?.find(open) {
        let start = from + offset;
        let next = lowered.as_bytes().get(start + open.len()).copied();
        if matches!(next, Some(b) if b.is_ascii_whitespace() || b == b'>' || b == b'/') {
            return Some(start);
        }
        from = start + open.len();
    }
    None
}

/// Parse attributes from just after a tag name up to the closing `>`.
///
/// Returns the attributes (names lowercased, values unescaped) and the byte
/// offset just past the `>`.
fn parse_open_tag(html: &str, mut pos: usize) -> Option<(HashMap<String, String>, usize)> {
    let bytes = html.as_bytes();
    let mut attributes = HashMap::new();

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos)? {
            b'>' => return Some((attributes, pos + 1)),
            b'/' => {
                pos += 1;
                continue;
            }
            _ => {}
        }

        let name_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
        {
            pos += 1;
        }
        let name = html[name_start..pos].to_ascii_lowercase();

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            attributes.insert(name, String::new());
            continue;
        }
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let value = match bytes.get(pos)? {
            quote @ (b'"' | b'\'') => {
                let quote = *quote;
                let value_start = pos + 1;
                let value_end = value_start + html[value_start..].find(quote as char)?;
                pos = value_end + 1;
                &html[value_start..value_end]
            }
            _ => {
                let value_start = pos;
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>'
                {
                    pos += 1;
                }
                &html[value_start..pos]
            }
        };
        attributes.insert(name, unescape_html(value));
    }
}

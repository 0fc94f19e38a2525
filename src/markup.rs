//! Markup conversion
//!
//! Passage text is authored as Markdown with embedded `{{ }}` directives.
//! The document stores it entity-escaped, so conversion is: unescape, run
//! Markdown, then put back any quotes the Markdown step escaped inside
//! directive delimiters so the template renderer can still read them.

use pulldown_cmark::{Options, Parser, html};

/// Markdown to HTML conversion
pub trait MarkupConverter {
    fn to_html(&self, markdown: &str) -> String;
}

/// CommonMark conversion backed by pulldown-cmark
#[derive(Debug, Clone, Copy)]
pub struct CommonMark {
    options: Options,
}

impl Default for CommonMark {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        Self { options }
    }
}

impl MarkupConverter for CommonMark {
    fn to_html(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut output, parser);
        output
    }
}

/// Full conversion of a passage's link-stripped text
pub fn render_passage_markup(content: &str, converter: &dyn MarkupConverter) -> String {
    let html = converter.to_html(&unescape_html(content));
    restore_directive_quotes(&html)
}

const ENTITIES: [(&str, &str); 7] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#x27;", "'"),
    ("&#39;", "'"),
    ("&#x60;", "`"),
    ("&amp;", "&"),
];

/// Decode the entities the story document escapes
pub fn unescape_html(content: &str) -> String {
    if !content.contains('&') {
        return content.to_string();
    }
    let mut output = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(amp) = rest.find('&') {
        output.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match ENTITIES
            .iter()
            .find(|(entity, _)| tail.starts_with(*entity))
        {
            Some((entity, replacement)) => {
                output.push_str(replacement);
                rest = &tail[entity.len()..];
            }
            None => {
                output.push('&');
                rest = &tail[1..];
            }
        }
    }
    output.push_str(rest);
    output
}

/// Escape text for insertion into HTML
pub fn escape_html(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            '`' => output.push_str("&#x60;"),
            _ => output.push(c),
        }
    }
    output
}

/// Turn `&quot;` back into `"` inside `{{ ... }}`, leaving prose untouched
pub fn restore_directive_quotes(html: &str) -> String {
    rewrite_directives(html, |directive| directive.replace("&quot;", "\""))
}

/// Decode entities inside `{{ ... }}` only.
///
/// Used for source that skips Markdown conversion: block bodies keep their
/// entities for the directive that consumes them.
pub fn decode_directives(source: &str) -> String {
    rewrite_directives(source, unescape_html)
}

fn rewrite_directives(text: &str, decode: impl Fn(&str) -> String) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        output.push_str(&rest[..open]);
        let inner = &rest[open..];
        match directive_end(inner) {
            Some(end) => {
                output.push_str(&decode(&inner[..end]));
                rest = &inner[end..];
            }
            None => {
                output.push_str(inner);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    output
}

const QUOTES: [(&str, char); 5] = [
    ("\"", '"'),
    ("'", '\''),
    ("&quot;", '"'),
    ("&#39;", '\''),
    ("&#x27;", '\''),
];

/// Offset just past the `}}` closing the directive `text` opens, skipping
/// quoted arguments whether their quotes are literal or escaped
fn directive_end(text: &str) -> Option<usize> {
    let mut quote = None;
    let mut i = 2;
    while i < text.len() {
        let tail = &text[i..];
        let mark = QUOTES
            .iter()
            .find(|(form, _)| tail.starts_with(*form))
            .map(|(form, q)| (form.len(), *q));

        match (quote, mark) {
            (Some(open), Some((width, q))) if q == open => {
                quote = None;
                i += width;
                continue;
            }
            (None, Some((width, q))) => {
                quote = Some(q);
                i += width;
                continue;
            }
            (None, None) if tail.starts_with("}}") => return Some(i + 2),
            _ => {}
        }
        i += tail.chars().next().map_or(1, char::len_utf8);
    }
    None
}

//! Link extraction
//!
//! Links use `[[target]]`, `[[alias|target]]`, `[[alias->target]]` or
//! `[[target<-alias]]`. Extraction is destructive: every link is cut out of
//! the text and recorded in order of appearance. Both parts are
//! entity-decoded, matching how passage names are read from the document.

use crate::markup::unescape_html;
use crate::types::passage::Link;

/// Remove every link from `content`, returning the remaining text and the links
pub fn extract_links(content: &str) -> (String, Vec<Link>) {
    let mut remaining = String::with_capacity(content.len());
    let mut links = Vec::new();
    let mut cursor = 0;
    let mut search_from = 0;

    while let Some(offset) = content[search_from..].find("[[") {
        let start = search_from + offset;
        match match_link(&content[start..]) {
            Some((consumed, link)) => {
                remaining.push_str(&content[cursor..start]);
                links.push(link);
                cursor = start + consumed;
                search_from = cursor;
            }
            None => search_from = start + 1,
        }
    }
    remaining.push_str(&content[cursor..]);

    (remaining, links)
}

/// Match one link at the start of `text` (which begins with `[[`).
///
/// The first part runs up to a `|` or `]` and must not be empty; the second
/// part (after an optional `|`) runs up to the next `]`; then `]]` closes.
fn match_link(text: &str) -> Option<(usize, Link)> {
    let body = &text[2..];
    let first_end = body.find(['|', ']']).unwrap_or(body.len());
    if first_end == 0 {
        return None;
    }
    let first = &body[..first_end];

    let mut rest = &body[first_end..];
    let mut consumed = 2 + first_end;
    if let Some(after_pipe) = rest.strip_prefix('|') {
        rest = after_pipe;
        consumed += 1;
    }

    let second_end = rest.find(']').unwrap_or(rest.len());
    let second = &rest[..second_end];
    if !rest[second_end..].starts_with("]]") {
        return None;
    }
    consumed += second_end + 2;

    let first = unescape_html(first);
    let link = if !second.is_empty() {
        Link::new(first, unescape_html(second))
    } else if let Some((alias, target)) = first.rsplit_once("->") {
        Link::new(alias, target)
    } else if let Some((target, alias)) = first.split_once("<-") {
        Link::new(alias, target)
    } else {
        Link::new(first.clone(), first)
    };
    Some((consumed, link))
}

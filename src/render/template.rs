//! Mustache template parsing
//!
//! Turns rendered passage markup into a tree of text, interpolations and
//! directive invocations. Names are not interpreted here; the renderer
//! decides whether a mustache is a directive or a state path.

use crate::error::StoryError;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    /// `{{name args}}` or `{{{name}}}` when `raw`
    Mustache {
        name: String,
        args: Vec<Argument>,
        raw: bool,
    },
    /// `{{#name args}}body{{else}}inverse{{/name}}`
    Block {
        name: String,
        args: Vec<Argument>,
        body: Vec<Node>,
        inverse: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// `None` for positional arguments
    pub key: Option<String>,
    pub value: ArgValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Literal(Value),
    /// Combined-view path resolved at evaluation time
    Path(String),
}

struct Frame {
    name: String,
    args: Vec<Argument>,
    body: Vec<Node>,
    inverse: Option<Vec<Node>>,
}

impl Frame {
    fn target(&mut self) -> &mut Vec<Node> {
        match &mut self.inverse {
            Some(inverse) => inverse,
            None => &mut self.body,
        }
    }
}

/// Parse markup into template nodes
pub fn parse(markup: &str) -> Result<Vec<Node>, StoryError> {
    let mut root = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut rest = markup;

    while let Some(open) = rest.find("{{") {
        if open > 0 {
            push(&mut root, &mut stack, Node::Text(rest[..open].to_string()));
        }
        let tag = &rest[open..];

        if let Some(comment) = tag.strip_prefix("{{!--") {
            let end = comment
                .find("--}}")
                .ok_or_else(|| unterminated(tag))?;
            rest = &comment[end + 4..];
            continue;
        }
        if let Some(comment) = tag.strip_prefix("{{!") {
            let end = comment.find("}}").ok_or_else(|| unterminated(tag))?;
            rest = &comment[end + 2..];
            continue;
        }
        if let Some(inner) = tag.strip_prefix("{{{") {
            let end = find_close(inner, "}}}").ok_or_else(|| unterminated(tag))?;
            let (name, args) = parse_invocation(&inner[..end])?;
            if !args.is_empty() {
                return Err(StoryError::template(format!(
                    "raw interpolation {{{{{{{name}}}}}}} takes no arguments"
                )));
            }
            push(&mut root, &mut stack, Node::Mustache { name, args, raw: true });
            rest = &inner[end + 3..];
            continue;
        }

        let inner_start = &tag[2..];
        let end = find_close(inner_start, "}}").ok_or_else(|| unterminated(tag))?;
        let inner = inner_start[..end].trim();
        rest = &inner_start[end + 2..];

        if let Some(open_block) = inner.strip_prefix('#') {
            let (name, args) = parse_invocation(open_block)?;
            stack.push(Frame {
                name,
                args,
                body: Vec::new(),
                inverse: None,
            });
        } else if let Some(closer) = inner.strip_prefix('/') {
            let closer = closer.trim();
            let frame = stack.pop().ok_or_else(|| {
                StoryError::template(format!("{{{{/{closer}}}}} closes no open block"))
            })?;
            if frame.name != closer {
                return Err(StoryError::template(format!(
                    "{{{{/{closer}}}}} does not match open block {{{{#{}}}}}",
                    frame.name
                )));
            }
            let node = Node::Block {
                name: frame.name,
                args: frame.args,
                body: frame.body,
                inverse: frame.inverse.unwrap_or_default(),
            };
            push(&mut root, &mut stack, node);
        } else if inner == "else" {
            match stack.last_mut() {
                Some(frame) if frame.inverse.is_none() => frame.inverse = Some(Vec::new()),
                Some(frame) => {
                    return Err(StoryError::template(format!(
                        "second {{{{else}}}} in {{{{#{}}}}}",
                        frame.name
                    )));
                }
                None => return Err(StoryError::template("{{else}} outside of a block")),
            }
        } else {
            let (name, args) = parse_invocation(inner)?;
            push(&mut root, &mut stack, Node::Mustache { name, args, raw: false });
        }
    }

    if !rest.is_empty() {
        push(&mut root, &mut stack, Node::Text(rest.to_string()));
    }
    if let Some(frame) = stack.last() {
        return Err(StoryError::template(format!(
            "unclosed block {{{{#{}}}}}",
            frame.name
        )));
    }
    Ok(root)
}

fn push(root: &mut Vec<Node>, stack: &mut [Frame], node: Node) {
    match stack.last_mut() {
        Some(frame) => frame.target().push(node),
        None => root.push(node),
    }
}

fn unterminated(tag: &str) -> StoryError {
    let preview: String = tag.chars().take(24).collect();
    StoryError::template(format!("unterminated mustache at {preview:?}"))
}

/// Position of `close` in `text`, ignoring quoted argument values
fn find_close(text: &str, close: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if text[i..].starts_with(close) => return Some(i),
            None => {}
        }
    }
    None
}

/// Split `name key=value positional ...`
fn parse_invocation(text: &str) -> Result<(String, Vec<Argument>), StoryError> {
    let text = text.trim();
    let name_end = text.find(char::is_whitespace).unwrap_or(text.len());
    let name = &text[..name_end];
    if name.is_empty() {
        return Err(StoryError::template("empty mustache"));
    }

    let mut args = Vec::new();
    let mut rest = text[name_end..].trim_start();
    while !rest.is_empty() {
        let (key, after_key) = match rest.find(|c: char| c == '=' || c.is_whitespace()) {
            Some(i) if rest[i..].starts_with('=') && !rest.starts_with(['"', '\'']) => {
                (Some(rest[..i].to_string()), &rest[i + 1..])
            }
            _ => (None, rest),
        };
        let (value, after_value) = parse_value(after_key)?;
        args.push(Argument { key, value });
        rest = after_value.trim_start();
    }

    Ok((name.to_string(), args))
}

fn parse_value(text: &str) -> Result<(ArgValue, &str), StoryError> {
    if let Some(quote) = text.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let body = &text[1..];
        let end = body.find(quote).ok_or_else(|| {
            StoryError::template(format!("unterminated string in {text:?}"))
        })?;
        return Ok((
            ArgValue::Literal(Value::String(body[..end].to_string())),
            &body[end + 1..],
        ));
    }

    let end = text.find(char::is_whitespace).unwrap_or(text.len());
    let word = &text[..end];
    if word.is_empty() {
        return Err(StoryError::template("missing argument value"));
    }
    let value = match serde_json::from_str::<Value>(word) {
        Ok(literal) => ArgValue::Literal(literal),
        Err(_) => ArgValue::Path(word.to_string()),
    };
    Ok((value, &text[end..]))
}

//! Incremental text reveal
//!
//! `Typer` reveals a fragment of markup one visible character at a time;
//! tags are emitted whole and any element still open is closed in the
//! visible output, so every frame is well-formed.
//!
//! `TypingRegistry` holds the typing units registered by one render. It has
//! no timer of its own: the host calls `tick` with a monotonic clock in
//! milliseconds and applies the returned frames. `reset` cancels every unit,
//! which is how a new navigation stops the previous passage's animations.

use serde::Serialize;

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open { markup: String, name: String },
    Close { markup: String },
    Void(String),
    Text(String),
}

fn tokenize(markup: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = markup;

    while let Some(c) = rest.chars().next() {
        if c == '<'
            && let Some(end) = rest.find('>')
        {
            let tag = &rest[..=end];
            tokens.push(classify_tag(tag));
            rest = &rest[end + 1..];
            continue;
        }
        if c == '&'
            && let Some((end, _)) = rest.char_indices().take(12).find(|(_, c)| *c == ';')
            && end > 1
            && rest[1..end]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '#')
        {
            tokens.push(Token::Text(rest[..=end].to_string()));
            rest = &rest[end + 1..];
            continue;
        }
        tokens.push(Token::Text(c.to_string()));
        rest = &rest[c.len_utf8()..];
    }

    tokens
}

fn classify_tag(tag: &str) -> Token {
    if tag.starts_with("</") {
        return Token::Close {
            markup: tag.to_string(),
        };
    }
    if tag.starts_with("<!") || tag.ends_with("/>") {
        return Token::Void(tag.to_string());
    }
    let name: String = tag[1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase();
    if VOID_ELEMENTS.contains(&name.as_str()) {
        Token::Void(tag.to_string())
    } else {
        Token::Open {
            markup: tag.to_string(),
            name,
        }
    }
}

/// Reveals markup one character at a time
#[derive(Debug, Clone)]
pub struct Typer {
    tokens: Vec<Token>,
    cursor: usize,
    revealed: String,
    open: Vec<String>,
}

impl Typer {
    pub fn new(markup: &str) -> Self {
        Self {
            tokens: tokenize(markup),
            cursor: 0,
            revealed: String::new(),
            open: Vec::new(),
        }
    }

    /// Reveal the next character along with any tags before it.
    ///
    /// Returns `false` once there was nothing left to reveal.
    pub fn type_next(&mut self) -> bool {
        while let Some(token) = self.tokens.get(self.cursor) {
            self.cursor += 1;
            match token {
                Token::Open { markup, name } => {
                    self.revealed.push_str(markup);
                    self.open.push(name.clone());
                }
                Token::Close { markup } => {
                    self.revealed.push_str(markup);
                    self.open.pop();
                }
                Token::Void(markup) => self.revealed.push_str(markup),
                Token::Text(text) => {
                    self.revealed.push_str(text);
                    return true;
                }
            }
        }
        false
    }

    /// Reveal everything that is left
    pub fn finish(&mut self) {
        while self.type_next() {}
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    /// Revealed markup with still-open elements closed
    pub fn visible(&self) -> String {
        let mut visible = self.revealed.clone();
        for name in self.open.iter().rev() {
            visible.push_str("</");
            visible.push_str(name);
            visible.push('>');
        }
        visible
    }
}

/// Inputs of one type directive
#[derive(Debug, Clone, PartialEq)]
pub struct TypingSpec {
    pub name: Option<String>,
    pub speed_ms: u64,
    pub delay_ms: u64,
    /// Do not start until started by name
    pub wait: bool,
    /// Unit to start when this one completes
    pub next: Option<String>,
    pub body: String,
}

/// One update for the host to apply to a typing node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypingFrame {
    pub node_id: String,
    pub markup: String,
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Waiting,
    Ready,
    Delayed { until: u64 },
    Typing { next_at: u64 },
    Done,
}

#[derive(Debug, Clone)]
struct TypingUnit {
    node_id: String,
    name: Option<String>,
    speed_ms: u64,
    delay_ms: u64,
    next: Option<String>,
    typer: Typer,
    phase: Phase,
}

/// Typing units registered during the current render
#[derive(Debug, Default)]
pub struct TypingRegistry {
    units: Vec<TypingUnit>,
    generation: u64,
}

impl TypingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and forget every unit
    pub fn reset(&mut self) {
        if !self.units.is_empty() {
            log::debug!("cancelling {} typing units", self.units.len());
        }
        self.units.clear();
        self.generation += 1;
    }

    /// Register a unit and return the id of the node it types into
    pub fn register(&mut self, spec: TypingSpec) -> String {
        let digest = md5::compute(format!(
            "{}:{}:{}",
            self.generation,
            self.units.len(),
            spec.body
        ));
        let hash = format!("{digest:x}");
        let node_id = match &spec.name {
            Some(name) => format!("typer-{name}-{}", &hash[..8]),
            None => format!("typer-{}", &hash[..8]),
        };

        if let Some(name) = &spec.name
            && self.position(name).is_some()
        {
            log::warn!("duplicate typing unit name {name}; later unit is not addressable by name");
        }

        self.units.push(TypingUnit {
            node_id: node_id.clone(),
            name: spec.name,
            speed_ms: spec.speed_ms,
            delay_ms: spec.delay_ms,
            next: spec.next,
            typer: Typer::new(&spec.body),
            phase: if spec.wait {
                Phase::Waiting
            } else {
                Phase::Ready
            },
        });
        node_id
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Node id of the unit registered under `name`
    pub fn node_id(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.units[i].node_id.as_str())
    }

    /// `(node_id, next)` for every unit whose chain target is not registered
    pub fn unresolved_chains(&self) -> Vec<(&str, &str)> {
        self.units
            .iter()
            .filter_map(|unit| {
                let next = unit.next.as_deref()?;
                self.position(next)
                    .is_none()
                    .then_some((unit.node_id.as_str(), next))
            })
            .collect()
    }

    /// Start a waiting unit by name
    pub fn start(&mut self, name: &str, now_ms: u64) -> bool {
        let Some(index) = self.position(name) else {
            log::warn!("no typing unit named {name} to start");
            return false;
        };
        let unit = &mut self.units[index];
        if unit.phase != Phase::Waiting {
            log::warn!("tried to restart typing for {}", unit.node_id);
            return false;
        }
        unit.phase = Phase::Delayed {
            until: now_ms.saturating_add(unit.delay_ms),
        };
        true
    }

    /// Start the first waiting unit in document order, named or not
    pub fn start_next_waiting(&mut self, now_ms: u64) -> bool {
        let Some(unit) = self
            .units
            .iter_mut()
            .find(|unit| unit.phase == Phase::Waiting)
        else {
            return false;
        };
        unit.phase = Phase::Delayed {
            until: now_ms.saturating_add(unit.delay_ms),
        };
        true
    }

    /// Advance every running unit to `now_ms`
    pub fn tick(&mut self, now_ms: u64) -> Vec<TypingFrame> {
        let mut frames = Vec::new();
        let mut chained = Vec::new();

        for unit in &mut self.units {
            if unit.phase == Phase::Ready {
                unit.phase = Phase::Delayed {
                    until: now_ms.saturating_add(unit.delay_ms),
                };
            }
            if let Phase::Delayed { until } = unit.phase
                && now_ms >= until
            {
                unit.phase = Phase::Typing { next_at: until };
            }
            let Phase::Typing { mut next_at } = unit.phase else {
                continue;
            };

            let mut changed = false;
            let mut done = false;
            while now_ms >= next_at {
                if unit.typer.type_next() {
                    changed = true;
                    next_at = next_at.saturating_add(unit.speed_ms);
                } else {
                    done = true;
                    break;
                }
            }

            if done {
                unit.phase = Phase::Done;
                if let Some(next) = &unit.next {
                    chained.push(next.clone());
                }
            } else {
                unit.phase = Phase::Typing { next_at };
            }
            if changed || done {
                frames.push(TypingFrame {
                    node_id: unit.node_id.clone(),
                    markup: unit.typer.visible(),
                    done,
                });
            }
        }

        for name in chained {
            self.start(&name, now_ms);
        }
        frames
    }

    /// Complete every unit that is currently typing
    pub fn finish_all(&mut self, now_ms: u64) -> Vec<TypingFrame> {
        let mut frames = Vec::new();
        let mut chained = Vec::new();

        for unit in &mut self.units {
            if !matches!(unit.phase, Phase::Typing { .. }) {
                continue;
            }
            unit.typer.finish();
            unit.phase = Phase::Done;
            if let Some(next) = &unit.next {
                chained.push(next.clone());
            }
            frames.push(TypingFrame {
                node_id: unit.node_id.clone(),
                markup: unit.typer.visible(),
                done: true,
            });
        }

        for name in chained {
            self.start(&name, now_ms);
        }
        frames
    }

    /// Earliest time a tick would change something; `Some(0)` when due now
    pub fn next_deadline(&self) -> Option<u64> {
        self.units
            .iter()
            .filter_map(|unit| match unit.phase {
                Phase::Ready => Some(0),
                Phase::Delayed { until } => Some(until),
                Phase::Typing { next_at } => Some(next_at),
                Phase::Waiting | Phase::Done => None,
            })
            .min()
    }

    /// No unit is scheduled; waiting units do not count
    pub fn is_idle(&self) -> bool {
        self.next_deadline().is_none()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.units
            .iter()
            .position(|unit| unit.name.as_deref() == Some(name))
    }
}

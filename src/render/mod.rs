//! Template renderer
//!
//! Expands the mustaches in rendered passage markup in one left-to-right
//! pass. Paths and directive arguments resolve against the state store at
//! the moment they are reached, so a `set` earlier in a passage is visible
//! to everything after it. Block bodies are rendered before their
//! directive runs, except for `if`/`unless`, which render only the branch
//! they select.

pub mod directive;
pub mod template;

use crate::config::StoryConfig;
use crate::effects::audio::AudioPlayer;
use crate::effects::map::MapDisplay;
use crate::effects::typing::TypingRegistry;
use crate::error::StoryError;
use crate::markup::escape_html;
use crate::script::{Evaluator, ExpressionEvaluator, to_display};
use crate::state::StateStore;
use crate::types::{Passage, StoryView};
use directive::{Attributes, DirectiveEnv, DirectiveKind};
use serde_json::Value;
use std::fmt;
use template::{ArgValue, Argument, Node};

/// Collaborators a render reads and mutates
pub struct RenderContext<'a> {
    pub state: &'a mut StateStore,
    /// Passage being rendered; `None` for the setup passage
    pub passage: Option<&'a Passage>,
    pub story: StoryView<'a>,
    pub map: &'a mut dyn MapDisplay,
    pub audio: &'a mut dyn AudioPlayer,
}

/// Directive defaults taken from `StoryConfig`
#[derive(Debug, Clone, PartialEq)]
pub struct RenderDefaults {
    pub typing_speed_ms: u64,
    pub typing_delay_ms: u64,
    pub volume: f64,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self::from(&StoryConfig::default())
    }
}

impl From<&StoryConfig> for RenderDefaults {
    fn from(config: &StoryConfig) -> Self {
        Self {
            typing_speed_ms: config.typing.speed_ms,
            typing_delay_ms: config.typing.delay_ms,
            volume: config.audio.volume,
        }
    }
}

pub struct TemplateRenderer {
    evaluator: Box<dyn Evaluator>,
    typing: TypingRegistry,
    defaults: RenderDefaults,
}

impl fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("typing", &self.typing)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(Box::new(ExpressionEvaluator), RenderDefaults::default())
    }
}

impl TemplateRenderer {
    pub fn new(evaluator: Box<dyn Evaluator>, defaults: RenderDefaults) -> Self {
        Self {
            evaluator,
            typing: TypingRegistry::new(),
            defaults,
        }
    }

    /// Typing units registered by the last render
    pub fn typing(&self) -> &TypingRegistry {
        &self.typing
    }

    pub fn typing_mut(&mut self) -> &mut TypingRegistry {
        &mut self.typing
    }

    /// Expand every mustache in `markup`.
    ///
    /// Typing units from the previous render are cancelled first.
    pub fn render(
        &mut self,
        markup: &str,
        cx: &mut RenderContext<'_>,
    ) -> Result<String, StoryError> {
        self.typing.reset();
        let nodes = template::parse(markup)?;

        let mut output = String::with_capacity(markup.len());
        self.render_nodes(&nodes, cx, &mut output)?;

        for (node_id, next) in self.typing.unresolved_chains() {
            log::warn!("typing unit {node_id} chains to unknown unit {next}");
        }
        Ok(output)
    }

    fn render_nodes(
        &mut self,
        nodes: &[Node],
        cx: &mut RenderContext<'_>,
        output: &mut String,
    ) -> Result<(), StoryError> {
        for node in nodes {
            match node {
                Node::Text(text) => output.push_str(text),
                Node::Mustache { name, args, raw } => match DirectiveKind::from_name(name) {
                    Some(kind) if !raw => {
                        let attrs = resolve(args, cx.state);
                        let markup = self.invoke(kind, &attrs, "", cx)?;
                        output.push_str(&markup);
                    }
                    _ if !args.is_empty() => {
                        return Err(StoryError::template(format!(
                            "unknown directive {name}"
                        )));
                    }
                    _ => {
                        let text = interpolate(cx.state, name);
                        if *raw {
                            output.push_str(&text);
                        } else {
                            output.push_str(&escape_html(&text));
                        }
                    }
                },
                Node::Block {
                    name,
                    args,
                    body,
                    inverse,
                } => {
                    let kind = DirectiveKind::from_name(name).ok_or_else(|| {
                        StoryError::template(format!("unknown block directive #{name}"))
                    })?;
                    let attrs = resolve(args, cx.state);
                    if kind.is_conditional() {
                        let branch = if kind.choose_body(&attrs) { body } else { inverse };
                        self.render_nodes(branch, cx, output)?;
                    } else {
                        let mut inner = String::new();
                        self.render_nodes(body, cx, &mut inner)?;
                        let markup = self.invoke(kind, &attrs, &inner, cx)?;
                        output.push_str(&markup);
                    }
                }
            }
        }
        Ok(())
    }

    fn invoke(
        &mut self,
        kind: DirectiveKind,
        attrs: &Attributes,
        body: &str,
        cx: &mut RenderContext<'_>,
    ) -> Result<String, StoryError> {
        let mut env = DirectiveEnv {
            cx,
            evaluator: self.evaluator.as_mut(),
            typing: &mut self.typing,
            defaults: &self.defaults,
        };
        kind.evaluate(attrs, body, &mut env)
    }
}

fn resolve(args: &[Argument], state: &StateStore) -> Attributes {
    let mut attrs = Attributes::default();
    for arg in args {
        let value = match &arg.value {
            ArgValue::Literal(value) => value.clone(),
            ArgValue::Path(path) => state.lookup(path).unwrap_or(Value::Null),
        };
        match &arg.key {
            Some(key) => attrs.named.push((key.clone(), value)),
            None => attrs.positional.push(value),
        }
    }
    attrs
}

/// Text for `{{path}}`; missing values and null render empty
fn interpolate(state: &StateStore, path: &str) -> String {
    match state.lookup(path) {
        None | Some(Value::Null) => String::new(),
        Some(value) => to_display(&value),
    }
}

//! Directive catalog
//!
//! Each directive kind evaluates its resolved attributes and rendered
//! body against the render context and returns the markup that replaces
//! it. Dispatch is a plain match on the kind.

use super::{RenderContext, RenderDefaults};
use crate::effects::map::HighlightPoint;
use crate::effects::typing::{TypingRegistry, TypingSpec};
use crate::error::StoryError;
use crate::markup::{escape_html, unescape_html};
use crate::script::{Evaluator, ScriptContext, to_display, truthy};
use crate::state::{MAP_DISPLAYED_KEY, Scope};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Set,
    Script,
    Map,
    Type,
    Audio,
    Play,
    If,
    Unless,
}

impl DirectiveKind {
    pub const ALL: [DirectiveKind; 8] = [
        DirectiveKind::Set,
        DirectiveKind::Script,
        DirectiveKind::Map,
        DirectiveKind::Type,
        DirectiveKind::Audio,
        DirectiveKind::Play,
        DirectiveKind::If,
        DirectiveKind::Unless,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            DirectiveKind::Set => "set",
            DirectiveKind::Script => "script",
            DirectiveKind::Map => "map",
            DirectiveKind::Type => "type",
            DirectiveKind::Audio => "audio",
            DirectiveKind::Play => "play",
            DirectiveKind::If => "if",
            DirectiveKind::Unless => "unless",
        }
    }

    /// Conditionals choose a branch before any body is rendered
    pub fn is_conditional(self) -> bool {
        matches!(self, DirectiveKind::If | DirectiveKind::Unless)
    }

    /// Evaluate a non-conditional directive
    pub(super) fn evaluate(
        self,
        attrs: &Attributes,
        body: &str,
        env: &mut DirectiveEnv<'_, '_>,
    ) -> Result<String, StoryError> {
        log::debug!("evaluating {{{{{}}}}} directive", self.name());
        match self {
            DirectiveKind::Set => set(attrs, env),
            DirectiveKind::Script => script(body, env),
            DirectiveKind::Map => map(attrs, env),
            DirectiveKind::Type => type_text(attrs, body, env),
            DirectiveKind::Audio => audio(attrs, env),
            DirectiveKind::Play => play(attrs, env),
            DirectiveKind::If | DirectiveKind::Unless => Ok(body.to_string()),
        }
    }

    /// Which branch a conditional renders: `true` for the body
    pub(super) fn choose_body(self, attrs: &Attributes) -> bool {
        let condition = attrs.positional.first().is_some_and(is_present);
        match self {
            DirectiveKind::Unless => !condition,
            _ => condition,
        }
    }
}

/// Arguments resolved against state at evaluation time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub positional: Vec<Value>,
    pub named: Vec<(String, Value)>,
}

impl Attributes {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.named.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Text of an attribute; null renders as absent
    fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .filter(|v| !v.is_null())
            .map(to_display)
    }

    fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::String(s)) => !(s.is_empty() || s == "false" || s == "0"),
            Some(value) => truthy(value),
            None => false,
        }
    }
}

/// Everything a directive may touch while it runs
pub(super) struct DirectiveEnv<'r, 'a> {
    pub cx: &'r mut RenderContext<'a>,
    pub evaluator: &'r mut dyn Evaluator,
    pub typing: &'r mut TypingRegistry,
    pub defaults: &'r RenderDefaults,
}

/// Conditional truth: falsy values and empty lists select the inverse
fn is_present(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        other => truthy(other),
    }
}

fn set(attrs: &Attributes, env: &mut DirectiveEnv<'_, '_>) -> Result<String, StoryError> {
    for (key, value) in &attrs.named {
        let value = match value {
            Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| value.clone()),
            other => other.clone(),
        };
        env.cx.state.set(key, value, Scope::Global)?;
    }
    Ok(String::new())
}

fn script(body: &str, env: &mut DirectiveEnv<'_, '_>) -> Result<String, StoryError> {
    let source = unescape_html(body);
    let mut context = ScriptContext {
        state: &mut *env.cx.state,
        passage: env.cx.passage,
        story: env.cx.story,
    };
    env.evaluator
        .run(&source, &mut context)
        .map_err(|err| {
            log::error!("script directive failed: {err}\n{source}");
            StoryError::directive_execution(err.to_string(), source.clone())
        })?;
    Ok(String::new())
}

fn map(attrs: &Attributes, env: &mut DirectiveEnv<'_, '_>) -> Result<String, StoryError> {
    let name = attrs
        .text("name")
        .filter(|name| !name.is_empty())
        .ok_or_else(|| StoryError::validation("map directive requires a name"))?;
    let highlight = attrs.text("highlight").and_then(|raw| {
        let point = HighlightPoint::parse(&raw);
        if point.is_none() {
            log::warn!("ignoring non-numeric highlight {raw:?} on map {name}");
        }
        point
    });

    env.cx.map.display_map(&name, highlight)?;
    env.cx
        .state
        .set(MAP_DISPLAYED_KEY, Value::Bool(true), Scope::Global)?;
    Ok(String::new())
}

fn type_text(
    attrs: &Attributes,
    body: &str,
    env: &mut DirectiveEnv<'_, '_>,
) -> Result<String, StoryError> {
    let name = attrs.text("name").filter(|name| !name.is_empty());
    let spec = TypingSpec {
        name: name.clone(),
        speed_ms: attrs
            .number("speed")
            .map(|ms| ms.max(0.0) as u64)
            .unwrap_or(env.defaults.typing_speed_ms),
        delay_ms: attrs
            .number("delay")
            .map(|ms| ms.max(0.0) as u64)
            .unwrap_or(env.defaults.typing_delay_ms),
        wait: attrs.flag("wait"),
        next: attrs.text("next").filter(|next| !next.is_empty()),
        body: body.to_string(),
    };
    let node_id = env.typing.register(spec);

    let name_attr = name
        .map(|name| format!(r#" data-typer-name="{}""#, escape_html(&name)))
        .unwrap_or_default();
    Ok(format!(
        r#"<span id="{node_id}" class="typer"{name_attr}></span>"#
    ))
}

fn audio(attrs: &Attributes, env: &mut DirectiveEnv<'_, '_>) -> Result<String, StoryError> {
    let url = attrs.text("url").unwrap_or_default();
    let name = attrs.text("name").unwrap_or_default();
    if url.is_empty() || name.is_empty() {
        return Err(StoryError::validation(
            "audio directive requires a url and a name",
        ));
    }
    env.cx.audio.add(&url, &name);
    Ok(String::new())
}

fn play(attrs: &Attributes, env: &mut DirectiveEnv<'_, '_>) -> Result<String, StoryError> {
    let name = attrs
        .text("name")
        .filter(|name| !name.is_empty())
        .ok_or_else(|| StoryError::validation("play directive requires a name"))?;
    let volume = attrs.number("volume").unwrap_or(env.defaults.volume);

    if !env.cx.audio.play_audio(&name, attrs.flag("loop"), volume) {
        return Err(StoryError::validation(format!(
            "audio {name} was never registered"
        )));
    }
    Ok(String::new())
}

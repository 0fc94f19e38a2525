//! Script directive evaluation
//!
//! The script directive hands its body to an `Evaluator`. The default
//! `ExpressionEvaluator` runs a small expression language whose only
//! reach into the host is the `ScriptContext`: state access through
//! `get`/`set`/`clear`/`has`, the current passage and a read-only story.
//!
//! ```text
//! set("gold", get("gold") + 5); set("hint", "left", "temp")
//! set("seen", has("temp.hint") && passage.name != "Start")
//! ```

mod eval;
pub mod syntax;

use crate::error::StoryError;
use crate::state::StateStore;
use crate::types::{Passage, StoryView};
use thiserror::Error;

pub use eval::{to_display, truthy};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScriptError {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("{message}")]
    Runtime { message: String },

    #[error(transparent)]
    State(#[from] StoryError),
}

impl ScriptError {
    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }
}

/// Capabilities a script may use
pub struct ScriptContext<'a> {
    pub state: &'a mut StateStore,
    pub passage: Option<&'a Passage>,
    pub story: StoryView<'a>,
}

/// Runs script directive bodies for their side effects
pub trait Evaluator {
    fn run(&mut self, source: &str, context: &mut ScriptContext<'_>) -> Result<(), ScriptError>;
}

/// The built-in expression language
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionEvaluator;

impl Evaluator for ExpressionEvaluator {
    fn run(&mut self, source: &str, context: &mut ScriptContext<'_>) -> Result<(), ScriptError> {
        let program = syntax::parse_program(source)?;
        log::trace!("running script with {} expressions", program.len());
        for expr in &program {
            eval::evaluate(expr, context)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::CommonMark;
    use crate::state::Scope;
    use crate::types::{PassageAttributes, StoryMetadata};
    use serde_json::json;

    struct Fixture {
        state: StateStore,
        metadata: StoryMetadata,
        passages: Vec<Passage>,
    }

    impl Fixture {
        fn new() -> Self {
            let converter = CommonMark::default();
            let passages = vec![
                Passage::from_attributes(
                    PassageAttributes::new("1", "Start", "").with_tags("intro dark"),
                    &converter,
                )
                .unwrap(),
                Passage::from_attributes(PassageAttributes::new("2", "End", ""), &converter)
                    .unwrap(),
            ];
            Self {
                state: StateStore::new(),
                metadata: StoryMetadata {
                    name: "Caves".to_string(),
                    ifid: "ABC".to_string(),
                    start_node: "1".to_string(),
                    format: None,
                    format_version: None,
                    zoom: None,
                    creator: None,
                    creator_version: None,
                },
                passages,
            }
        }

        fn run(&mut self, source: &str) -> Result<(), ScriptError> {
            let mut context = ScriptContext {
                state: &mut self.state,
                passage: self.passages.first(),
                story: StoryView {
                    metadata: &self.metadata,
                    passages: &self.passages,
                },
            };
            ExpressionEvaluator.run(source, &mut context)
        }

        fn get(&self, path: &str) -> serde_json::Value {
            self.state.get(path, None).unwrap()
        }
    }

    #[test]
    fn arithmetic_keeps_integers() {
        let mut fx = Fixture::new();
        fx.state.set("gold", json!(10), Scope::Global).unwrap();
        fx.run(r#"set("gold", get("gold") + 5); set("half", get("gold") / 2)"#)
            .unwrap();
        assert_eq!(fx.get("gold"), json!(15));
        assert_eq!(fx.get("half"), json!(7.5));
    }

    #[test]
    fn strings_concatenate_with_display_values() {
        let mut fx = Fixture::new();
        fx.run(r#"set("greeting", "at " + passage.name + " #" + 1)"#)
            .unwrap();
        assert_eq!(fx.get("greeting"), json!("at Start #1"));
    }

    #[test]
    fn temp_scope_and_has() {
        let mut fx = Fixture::new();
        fx.run(r#"set("hint", "left", "temp"); set("seen", has("temp.hint")); set("other", has("nope"))"#)
            .unwrap();
        assert_eq!(fx.get("t.hint"), json!("left"));
        assert_eq!(fx.get("seen"), json!(true));
        assert_eq!(fx.get("other"), json!(false));

        fx.run(r#"clear(null, "temp")"#).unwrap();
        assert!(fx.state.temp().is_empty());
    }

    #[test]
    fn logical_operators_short_circuit() {
        let mut fx = Fixture::new();
        fx.run(r#"false && get("missing"); set("pick", null || "fallback")"#)
            .unwrap();
        assert_eq!(fx.get("pick"), json!("fallback"));
    }

    #[test]
    fn story_and_passage_objects() {
        let mut fx = Fixture::new();
        fx.run(
            r#"set("count", story.passages.length); set("first_tag", passage.tags[1]); set("start", story.start == passage.id)"#,
        )
        .unwrap();
        assert_eq!(fx.get("count"), json!(2));
        assert_eq!(fx.get("first_tag"), json!("intro"));
        assert_eq!(fx.get("start"), json!(true));
    }

    #[test]
    fn comparisons() {
        let mut fx = Fixture::new();
        fx.state.set("gold", json!(12), Scope::Global).unwrap();
        fx.run(r#"set("rich", get("gold") >= 10); set("same", 5 == 5.0); set("abc", "a" < "b")"#)
            .unwrap();
        assert_eq!(fx.get("rich"), json!(true));
        assert_eq!(fx.get("same"), json!(true));
        assert_eq!(fx.get("abc"), json!(true));
    }

    #[test]
    fn missing_state_is_not_found() {
        let mut fx = Fixture::new();
        let err = fx.run(r#"get("missing")"#).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::State(StoryError::NotFound { .. })
        ));
    }

    #[test]
    fn reserved_keys_are_rejected() {
        let mut fx = Fixture::new();
        let err = fx.run(r#"set("temp", 1)"#).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::State(StoryError::Validation { .. })
        ));
    }

    #[test]
    fn runtime_errors() {
        let mut fx = Fixture::new();
        assert!(matches!(
            fx.run("1 / 0"),
            Err(ScriptError::Runtime { .. })
        ));
        assert!(matches!(
            fx.run("window.location"),
            Err(ScriptError::Runtime { .. })
        ));
        assert!(matches!(
            fx.run("fetch('x')"),
            Err(ScriptError::Runtime { .. })
        ));
        assert!(matches!(
            fx.run(r#"set("x", 1, "session")"#),
            Err(ScriptError::Runtime { .. })
        ));
    }
}

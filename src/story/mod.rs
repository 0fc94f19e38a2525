//! Story controller
//!
//! Owns the passages, the state store, the renderer and the effect
//! collaborators, and performs the passage transition. The current
//! passage is never cached: it is always derived from the state store's
//! `currentPassagePid`.

mod builder;

pub use builder::StoryBuilder;

use crate::config::StoryConfig;
use crate::effects::audio::{AudioLibrary, AudioPlayer};
use crate::effects::map::{GridMap, MapDefaultsPatch, MapDisplay};
use crate::effects::typing::{TypingFrame, TypingRegistry};
use crate::error::StoryError;
use crate::markup::{decode_directives, unescape_html};
use crate::presentation::{DisplayTargets, PassageView};
use crate::render::{RenderContext, TemplateRenderer};
use crate::script::truthy;
use crate::state::{CURRENT_PASSAGE_KEY, LAST_PASSAGE_KEY, MAP_DISPLAYED_KEY, Scope, StateStore};
use crate::storage;
use crate::types::{Passage, StoryData, StoryMetadata, StoryView};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Called with every newly displayed passage
pub type PassageListener = Box<dyn FnMut(&Passage)>;

/// How a caller names the passage to display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassageRef<'a> {
    Id(&'a str),
    Name(&'a str),
}

impl fmt::Display for PassageRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassageRef::Id(pid) => write!(f, "pid {pid}"),
            PassageRef::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Serializable view of a running story
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorySnapshot {
    pub metadata: StoryMetadata,
    pub current: Option<String>,
    pub current_name: Option<String>,
    pub last: Option<String>,
    pub state: Value,
}

pub struct Story<M = GridMap, A = AudioLibrary> {
    metadata: StoryMetadata,
    passages: Vec<Passage>,
    state: StateStore,
    renderer: TemplateRenderer,
    map: M,
    audio: A,
    config: StoryConfig,
    listeners: Vec<PassageListener>,
}

impl<M: fmt::Debug, A: fmt::Debug> fmt::Debug for Story<M, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Story")
            .field("name", &self.metadata.name)
            .field("passages", &self.passages.len())
            .field("state", &self.state)
            .field("map", &self.map)
            .field("audio", &self.audio)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Story {
    /// Start building a story with the default collaborators
    pub fn builder(data: StoryData) -> StoryBuilder {
        StoryBuilder::new(data)
    }
}

impl<M: MapDisplay, A: AudioPlayer> Story<M, A> {
    pub fn metadata(&self) -> &StoryMetadata {
        &self.metadata
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateStore {
        &mut self.state
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    /// Typing units registered by the latest render
    pub fn typing(&self) -> &TypingRegistry {
        self.renderer.typing()
    }

    pub fn passage_by_name(&self, name: &str) -> Option<&Passage> {
        self.passages.iter().find(|p| p.name() == name)
    }

    pub fn passage_by_id(&self, pid: &str) -> Option<&Passage> {
        self.passages.iter().find(|p| p.pid() == pid)
    }

    /// The passage named by `currentPassagePid`
    pub fn current_passage(&self) -> Result<&Passage, StoryError> {
        let pid = self
            .state
            .lookup(CURRENT_PASSAGE_KEY)
            .and_then(|value| value.as_str().map(str::to_string))
            .ok_or_else(|| StoryError::not_found("current passage", "<unset>"))?;
        self.passage_by_id(&pid)
            .ok_or_else(|| StoryError::not_found("current passage", pid))
    }

    pub fn on_passage_changed(&mut self, listener: impl FnMut(&Passage) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Display a passage: update the pointers, render, then refresh every target.
    ///
    /// The target is resolved before any state changes, so an unknown
    /// passage leaves the store untouched. With `rollback_on_render_failure`
    /// a failed render restores the pointers and the map flag.
    pub fn display_passage(
        &mut self,
        target: PassageRef<'_>,
        targets: DisplayTargets<'_>,
    ) -> Result<(), StoryError> {
        let index = self
            .index_of(target)
            .ok_or_else(|| StoryError::not_found("passage", target.to_string()))?;
        let pid = self.passages[index].pid().to_string();
        log::debug!("displaying {} ({pid})", self.passages[index].name());

        let saved = [CURRENT_PASSAGE_KEY, LAST_PASSAGE_KEY, MAP_DISPLAYED_KEY]
            .map(|key| (key, self.state.lookup(key)));

        self.state
            .set(MAP_DISPLAYED_KEY, Value::Bool(false), Scope::Global)?;
        let previous = self.state.lookup(CURRENT_PASSAGE_KEY).unwrap_or(Value::Null);
        self.state.set(LAST_PASSAGE_KEY, previous, Scope::Global)?;
        self.state
            .set(CURRENT_PASSAGE_KEY, Value::String(pid), Scope::Global)?;

        let content = self.passages[index].content().to_string();
        let markup = match self.render(&content, Some(index)) {
            Ok(markup) => markup,
            Err(err) => {
                log::error!("rendering {} failed: {err}", self.passages[index].name());
                if self.config.rollback_on_render_failure {
                    self.restore(saved);
                }
                return Err(err);
            }
        };

        let passage = &self.passages[index];
        targets.passage.insert(passage, &markup);

        let map_displayed = self
            .state
            .lookup(MAP_DISPLAYED_KEY)
            .is_some_and(|flag| truthy(&flag));
        if !map_displayed {
            self.map.clear();
        }

        if let Some(links) = targets.links {
            links.clear();
            let mut count = 0;
            for link in passage.ordinary_links() {
                links.add_link(link);
                count += 1;
            }
            if count == 0 {
                links.mark_empty();
            }
        }

        if let Some(directions) = targets.directions {
            directions.disable_all();
            for link in passage.directional_links() {
                if let Some(direction) = link.direction() {
                    directions.enable(direction, &link.target);
                }
            }
        }

        for listener in &mut self.listeners {
            listener(passage);
        }
        Ok(())
    }

    /// Display whatever `currentPassagePid` names; nothing happens when it names nothing
    pub fn display_current_passage(&mut self, targets: DisplayTargets<'_>) -> Result<(), StoryError> {
        let pid = match self.current_passage() {
            Ok(passage) => passage.pid().to_string(),
            Err(err) => {
                log::debug!("nothing to display: {err}");
                return Ok(());
            }
        };
        self.display_passage(PassageRef::Id(&pid), targets)
    }

    /// Navigate by passage name, as a link control does
    pub fn follow_link(&mut self, name: &str, targets: DisplayTargets<'_>) -> Result<(), StoryError> {
        self.display_passage(PassageRef::Name(name), targets)
    }

    /// Advance typing animations and write their frames into `view`
    pub fn tick(&mut self, now_ms: u64, view: &mut dyn PassageView) -> Vec<TypingFrame> {
        let frames = self.renderer.typing_mut().tick(now_ms);
        apply_frames(&frames, view);
        frames
    }

    /// Complete every running typing animation
    pub fn skip_typing(&mut self, now_ms: u64, view: &mut dyn PassageView) -> Vec<TypingFrame> {
        let frames = self.renderer.typing_mut().finish_all(now_ms);
        apply_frames(&frames, view);
        frames
    }

    /// Start a typing unit that waits to be started
    pub fn start_typing(&mut self, name: &str, now_ms: u64) -> bool {
        self.renderer.typing_mut().start(name, now_ms)
    }

    /// Start the first typing unit still waiting to be started
    pub fn start_waiting_typing(&mut self, now_ms: u64) -> bool {
        self.renderer.typing_mut().start_next_waiting(now_ms)
    }

    /// Apply the JSON in the map-defaults passage, if there is one
    pub fn configure_map_defaults(&mut self) -> Result<(), StoryError> {
        let Some(passage) = self
            .passages
            .iter()
            .find(|p| p.has_tag(&self.config.map_defaults_tag))
        else {
            return Ok(());
        };
        let patch = MapDefaultsPatch::from_json(unescape_html(passage.raw_content()).trim())?;
        self.map.set_default_map_data(patch);
        Ok(())
    }

    pub fn snapshot(&self) -> StorySnapshot {
        let pointer = |key| {
            self.state
                .lookup(key)
                .and_then(|value| value.as_str().map(str::to_string))
        };
        StorySnapshot {
            metadata: self.metadata.clone(),
            current: pointer(CURRENT_PASSAGE_KEY),
            current_name: self.current_passage().ok().map(|p| p.name().to_string()),
            last: pointer(LAST_PASSAGE_KEY),
            state: self.state.combined_view(),
        }
    }

    pub fn save_state(&self) -> anyhow::Result<Vec<u8>> {
        storage::save(&self.state)
    }

    /// Replace the state from a save; call `display_current_passage` afterwards to show it
    pub fn load_state(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        storage::load_into(&mut self.state, bytes)
    }

    fn index_of(&self, target: PassageRef<'_>) -> Option<usize> {
        match target {
            PassageRef::Id(pid) => self.passages.iter().position(|p| p.pid() == pid),
            PassageRef::Name(name) => self.passages.iter().position(|p| p.name() == name),
        }
    }

    fn render(&mut self, markup: &str, passage: Option<usize>) -> Result<String, StoryError> {
        let Story {
            metadata,
            passages,
            state,
            renderer,
            map,
            audio,
            ..
        } = self;
        let passages: &[Passage] = passages;
        let mut cx = RenderContext {
            state,
            passage: passage.map(|index| &passages[index]),
            story: StoryView {
                metadata: &*metadata,
                passages,
            },
            map: &mut *map,
            audio: &mut *audio,
        };
        renderer.render(markup, &mut cx)
    }

    fn restore(&mut self, saved: [(&str, Option<Value>); 3]) {
        for (key, value) in saved {
            let result = match value {
                Some(value) => self.state.set(key, value, Scope::Global),
                None => {
                    self.state.clear(Some(key), Scope::Global);
                    Ok(())
                }
            };
            if let Err(err) = result {
                log::warn!("could not restore {key}: {err}");
            }
        }
    }

    /// Seed pointers, register maps and run the setup passage
    fn initialize(&mut self) -> Result<(), StoryError> {
        let start = self.metadata.start_node.clone();
        if self.passage_by_id(&start).is_none() {
            log::warn!("start passage {start} does not exist");
        }
        self.state
            .set(CURRENT_PASSAGE_KEY, Value::String(start), Scope::Global)?;
        self.state.set(LAST_PASSAGE_KEY, Value::Null, Scope::Global)?;
        self.state
            .set(MAP_DISPLAYED_KEY, Value::Bool(false), Scope::Global)?;

        for passage in self.passages.iter().filter(|p| p.has_tag(&self.config.map_tag)) {
            self.map.add_map(crate::effects::map::PassageMap {
                name: passage.name().to_string(),
                map: unescape_html(passage.raw_content()),
            });
        }
        if let Err(err) = self.configure_map_defaults() {
            log::error!("map defaults disabled: {err}");
        }

        if let Some(index) = self
            .passages
            .iter()
            .position(|p| p.name() == self.config.setup_passage)
        {
            log::debug!("running setup passage {}", self.config.setup_passage);
            let source = decode_directives(self.passages[index].raw_content());
            self.render(&source, Some(index))?;
        }
        Ok(())
    }
}

fn apply_frames(frames: &[TypingFrame], view: &mut dyn PassageView) {
    for frame in frames {
        view.update_fragment(&frame.node_id, &frame.markup);
    }
}

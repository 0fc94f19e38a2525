use super::Story;
use crate::config::StoryConfig;
use crate::effects::audio::{AudioLibrary, AudioPlayer};
use crate::effects::map::{GridMap, MapDisplay};
use crate::error::StoryError;
use crate::render::{RenderDefaults, TemplateRenderer};
use crate::script::{Evaluator, ExpressionEvaluator};
use crate::state::StateStore;
use crate::types::StoryData;

/// Assembles a `Story` from story data and its collaborators
pub struct StoryBuilder<M = GridMap, A = AudioLibrary> {
    data: StoryData,
    config: StoryConfig,
    map: M,
    audio: A,
    evaluator: Box<dyn Evaluator>,
    state: StateStore,
}

impl StoryBuilder {
    pub fn new(data: StoryData) -> Self {
        Self {
            data,
            config: StoryConfig::default(),
            map: GridMap::default(),
            audio: AudioLibrary::new(),
            evaluator: Box::new(ExpressionEvaluator),
            state: StateStore::new(),
        }
    }
}

impl<M: MapDisplay, A: AudioPlayer> StoryBuilder<M, A> {
    pub fn config(mut self, config: StoryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn map<N: MapDisplay>(self, map: N) -> StoryBuilder<N, A> {
        StoryBuilder {
            data: self.data,
            config: self.config,
            map,
            audio: self.audio,
            evaluator: self.evaluator,
            state: self.state,
        }
    }

    pub fn audio<B: AudioPlayer>(self, audio: B) -> StoryBuilder<M, B> {
        StoryBuilder {
            data: self.data,
            config: self.config,
            map: self.map,
            audio,
            evaluator: self.evaluator,
            state: self.state,
        }
    }

    /// Replace the script evaluator
    pub fn evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    /// Start from an existing store, e.g. one with listeners already attached
    pub fn state(mut self, state: StateStore) -> Self {
        self.state = state;
        self
    }

    /// Seed the state, register maps and run the setup passage.
    ///
    /// A failing setup passage fails the build.
    pub fn build(self) -> Result<Story<M, A>, StoryError> {
        let renderer = TemplateRenderer::new(self.evaluator, RenderDefaults::from(&self.config));
        let mut story = Story {
            metadata: self.data.metadata,
            passages: self.data.passages,
            state: self.state,
            renderer,
            map: self.map,
            audio: self.audio,
            config: self.config,
            listeners: Vec::new(),
        };
        story.initialize()?;
        log::debug!(
            "story {} ready with {} passages",
            story.metadata.name,
            story.passages.len()
        );
        Ok(story)
    }
}

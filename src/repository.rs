//! Story and save-slot storage
//!
//! Stories are Twine-style HTML documents stored as `<id>.html`; save
//! slots are state snapshots stored as `<ifid>.save.json` next to them.

use crate::error::StoryError;
use crate::markup::CommonMark;
use crate::parser::HtmlDocument;
use crate::types::StoryData;
use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Load and validate the story stored under `id`
    async fn load_story(&self, id: &str) -> Result<StoryData, RepositoryError>;

    /// Ids of every stored story, sorted
    async fn list_stories(&self) -> Result<Vec<String>, RepositoryError>;

    /// Write the save slot for the story with this ifid
    async fn save_snapshot(&self, ifid: &str, bytes: &[u8]) -> Result<(), RepositoryError>;

    /// Read the save slot for the story with this ifid, if one exists
    async fn load_snapshot(&self, ifid: &str) -> Result<Option<Vec<u8>>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Story not found: {id}")]
    NotFound { id: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Invalid story document: {0}")]
    InvalidStory(#[from] StoryError),
}

impl RepositoryError {
    fn io(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        Self::IoError {
            message: format!("{context}: {err}"),
        }
    }
}

/// File system implementation of `StoryRepository`
#[derive(Debug, Clone)]
pub struct FileSystemStoryRepository {
    base_path: PathBuf,
}

impl FileSystemStoryRepository {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn story_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{id}.html"))
    }

    pub fn snapshot_path(&self, ifid: &str) -> PathBuf {
        let slot: String = ifid
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{slot}.save.json"))
    }
}

#[async_trait]
impl StoryRepository for FileSystemStoryRepository {
    async fn load_story(&self, id: &str) -> Result<StoryData, RepositoryError> {
        let path = self.story_path(id);
        if !path.exists() {
            return Err(RepositoryError::NotFound { id: id.to_string() });
        }

        let html = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| RepositoryError::io(format!("Failed to read {}", path.display()), e))?;
        let document = HtmlDocument::parse(&html)?;
        let data = StoryData::from_source(&document, &CommonMark::default())?;
        log::debug!("loaded story {id} ({} passages)", data.passages.len());
        Ok(data)
    }

    async fn list_stories(&self) -> Result<Vec<String>, RepositoryError> {
        let mut entries = tokio::fs::read_dir(&self.base_path).await.map_err(|e| {
            RepositoryError::io(
                format!("Failed to read directory {}", self.base_path.display()),
                e,
            )
        })?;

        let mut stories = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RepositoryError::io("Failed to read directory entry", e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("html")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                stories.push(stem.to_string());
            }
        }
        stories.sort();
        Ok(stories)
    }

    async fn save_snapshot(&self, ifid: &str, bytes: &[u8]) -> Result<(), RepositoryError> {
        let path = self.snapshot_path(ifid);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| RepositoryError::io(format!("Failed to write {}", path.display()), e))?;
        log::debug!("saved {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn load_snapshot(&self, ifid: &str) -> Result<Option<Vec<u8>>, RepositoryError> {
        let path = self.snapshot_path(ifid);
        if !path.exists() {
            return Ok(None);
        }
        tokio::fs::read(&path)
            .await
            .map(Some)
            .map_err(|e| RepositoryError::io(format!("Failed to read {}", path.display()), e))
    }
}

//! Terminal front end
//!
//! - play: interactive player
//! - inspect: passage listing and scripted walkthrough dumps
//! - view: change tracking for what the terminal shows

pub mod inspect;
pub mod play;
pub mod view;

use crate::repository::FileSystemStoryRepository;
use std::path::Path;

/// Split a story file path into the repository holding it and its story id
pub fn open_story(path: &Path) -> anyhow::Result<(FileSystemStoryRepository, String)> {
    if path.extension().and_then(|ext| ext.to_str()) != Some("html") {
        anyhow::bail!("story files must end in .html: {}", path.display());
    }
    let id = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid story file name: {}", path.display()))?;
    let base = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    Ok((FileSystemStoryRepository::new(base), id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_path_splits_into_directory_and_id() {
        let (repository, id) = open_story(Path::new("stories/caves.html")).unwrap();
        assert_eq!(id, "caves");
        assert_eq!(
            repository.story_path(&id),
            Path::new("stories").join("caves.html")
        );
    }

    #[test]
    fn bare_file_name_uses_the_working_directory() {
        let (repository, id) = open_story(Path::new("caves.html")).unwrap();
        assert_eq!(repository.story_path(&id), Path::new(".").join("caves.html"));
    }

    #[test]
    fn other_extensions_are_rejected() {
        assert!(open_story(Path::new("caves.md")).is_err());
    }
}

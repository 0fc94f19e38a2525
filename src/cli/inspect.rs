//! Non-interactive inspection commands

use crate::{
    cli::open_story,
    cli::view::settle_typing,
    config::StoryConfig,
    effects::{DisplayedMap, Track},
    presentation::HeadlessPresentation,
    repository::StoryRepository,
    story::{Story, StorySnapshot},
    types::{LinkKind, StoryData},
};
use serde::Serialize;
use std::path::Path;

/// List every passage with its tags and outbound links
pub async fn run_passages(path: &Path) -> anyhow::Result<()> {
    let (repository, id) = open_story(path)?;
    let data = repository.load_story(&id).await?;
    print!("{}", passage_table(&data));
    Ok(())
}

pub fn passage_table(data: &StoryData) -> String {
    let mut out = format!(
        "{} ({}), start {}\n",
        data.metadata.name, data.metadata.ifid, data.metadata.start_node
    );
    for passage in &data.passages {
        out.push_str(&format!("{:>4}  {}", passage.pid(), passage.name()));
        if !passage.tags().is_empty() {
            let tags: Vec<&str> = passage.tags().iter().map(String::as_str).collect();
            out.push_str(&format!(" [{}]", tags.join(" ")));
        }
        out.push('\n');
        for link in passage.links() {
            let marker = match link.kind {
                LinkKind::Ordinary => "->".to_string(),
                LinkKind::Directional(direction) => format!("{direction}:"),
            };
            out.push_str(&format!("        {marker} {}\n", link.target));
        }
    }
    out
}

/// One displayed passage in a walkthrough
#[derive(Debug, Serialize)]
pub struct DumpedPassage {
    pub name: String,
    pub text: String,
    pub links: Vec<String>,
}

/// Result of walking a story through a list of passage names
#[derive(Debug, Serialize)]
pub struct Walkthrough {
    pub passages: Vec<DumpedPassage>,
    pub snapshot: StorySnapshot,
    pub map: Option<DisplayedMap>,
    pub audio: Vec<Track>,
}

/// Show the start passage, then follow `names` in order
pub fn walk(story: &mut Story, names: &[String]) -> anyhow::Result<Walkthrough> {
    let mut ui = HeadlessPresentation::new();
    let mut passages = Vec::new();

    story.display_current_passage(ui.targets())?;
    settle_typing(story, &mut ui.passage);
    passages.extend(dumped(&ui));

    for name in names {
        story.follow_link(name, ui.targets())?;
        settle_typing(story, &mut ui.passage);
        passages.extend(dumped(&ui));
    }

    Ok(Walkthrough {
        passages,
        snapshot: story.snapshot(),
        map: story.map().current().cloned(),
        audio: story.audio().tracks().to_vec(),
    })
}

fn dumped(ui: &HeadlessPresentation) -> Option<DumpedPassage> {
    let entry = ui.passage.active()?;
    Some(DumpedPassage {
        name: entry.name.clone(),
        text: entry.text(),
        links: ui
            .links
            .links()
            .iter()
            .map(|link| link.target.clone())
            .chain(ui.compass.enabled().map(|(_, target)| target.to_string()))
            .collect(),
    })
}

/// Print a walkthrough as JSON
pub async fn run_dump(path: &Path, config: StoryConfig, names: &[String]) -> anyhow::Result<()> {
    let (repository, id) = open_story(path)?;
    let data = repository.load_story(&id).await?;
    let mut story = Story::builder(data).config(config).build()?;
    let walkthrough = walk(&mut story, names)?;
    println!("{}", serde_json::to_string_pretty(&walkthrough)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::HtmlDocument;
    use crate::markup::CommonMark;

    const STORY: &str = r#"<tw-storydata name="Well" ifid="W-1" startnode="1">
<tw-passagedata pid="1" name="Top" tags="" position="0,0" size="100,100">{{set depth=&quot;0&quot;}}A well. [[Down|Bottom]] [[north]]</tw-passagedata>
<tw-passagedata pid="2" name="Bottom" tags="" position="0,0" size="100,100">{{#type name="echo" speed=5}}Echo{{/type}}</tw-passagedata>
<tw-passagedata pid="3" name="north" tags="dark" position="0,0" size="100,100">Fields.</tw-passagedata>
</tw-storydata>"#;

    fn data() -> StoryData {
        let document = HtmlDocument::parse(STORY).unwrap();
        StoryData::from_source(&document, &CommonMark::default()).unwrap()
    }

    #[test]
    fn passage_table_lists_links_by_kind() {
        let table = passage_table(&data());
        assert!(table.starts_with("Well (W-1), start 1\n"));
        assert!(table.contains("-> Bottom"));
        assert!(table.contains("north: north"));
        assert!(table.contains("north [dark]"));
    }

    #[test]
    fn walk_records_each_passage_with_typing_finished() {
        let mut story = Story::builder(data()).build().unwrap();
        let walkthrough = walk(&mut story, &["Bottom".to_string()]).unwrap();

        assert_eq!(walkthrough.passages.len(), 2);
        assert_eq!(walkthrough.passages[0].links, vec!["Bottom", "north"]);
        assert_eq!(walkthrough.passages[1].name, "Bottom");
        assert_eq!(walkthrough.passages[1].text, "Echo");
        assert_eq!(walkthrough.snapshot.current_name.as_deref(), Some("Bottom"));
    }

    #[test]
    fn walk_stops_at_an_unknown_passage() {
        let mut story = Story::builder(data()).build().unwrap();
        assert!(walk(&mut story, &["Attic".to_string()]).is_err());
    }
}

//! Navigation tests against the caves fixture
//! Walks the published story through its passages and checks what each surface shows

use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;
use trellis::{
    CommonMark, Direction, HeadlessPresentation, HtmlDocument, PassageRef, Scope, Story,
    StoryData, StoryError,
};

fn caves() -> Story {
    let html = std::fs::read_to_string("tests/fixtures/caves.html").expect("Failed to read fixture");
    let document = HtmlDocument::parse(&html).expect("Failed to parse fixture");
    let data = StoryData::from_source(&document, &CommonMark::default()).expect("Invalid fixture");
    Story::builder(data).build().expect("Failed to build story")
}

fn inline(passages: &str) -> Story {
    let html = format!(
        r#"<tw-storydata name="Inn" startnode="1" ifid="INN-1">{passages}</tw-storydata>"#
    );
    let document = HtmlDocument::parse(&html).expect("Failed to parse story");
    let data = StoryData::from_source(&document, &CommonMark::default()).expect("Invalid story");
    Story::builder(data).build().expect("Failed to build story")
}

fn text(ui: &HeadlessPresentation) -> String {
    ui.passage.active().expect("No active passage").text()
}

#[cfg(test)]
mod navigation_tests {
    use super::*;

    /// Test: the start passage shows its text, links, compass and map
    #[test]
    fn start_passage_fills_every_surface() {
        let mut story = caves();
        let mut ui = HeadlessPresentation::new();

        story.display_current_passage(ui.targets()).unwrap();

        assert_eq!(text(&ui), "The cave mouth breathes cold air.");
        assert_eq!(ui.links.links().len(), 1);
        assert_eq!(ui.links.target(0), Some("Tunnel"));
        assert_eq!(ui.compass.target(Direction::North), Some("Ridge"));
        assert!(!ui.compass.is_enabled(Direction::East));

        let map = story.map().current().expect("Map should be shown");
        assert_eq!(map.name, "caves");
        assert_eq!(map.to_text(), "#@\n##");
        assert_eq!(map.defaults.grid_cols, 10);
        assert_eq!(map.defaults.grid_rows, 5);
    }

    /// Test: setup state drives conditionals, scripts count visits, audio plays
    #[test]
    fn walking_to_the_lake_and_back() {
        let mut story = caves();
        let mut ui = HeadlessPresentation::new();
        story.display_current_passage(ui.targets()).unwrap();

        story.follow_link("Tunnel", ui.targets()).unwrap();
        assert_eq!(text(&ui), "Your torch flickers.");
        assert!(story.map().current().is_none());
        assert_eq!(ui.compass.target(Direction::East), Some("Lake"));

        story.follow_link("Lake", ui.targets()).unwrap();
        assert_eq!(text(&ui), "Visits: 1");
        let drip = story.audio().track("drip").expect("drip registered by setup");
        assert!(drip.playing);
        assert!(drip.looped);

        story.follow_link("Tunnel", ui.targets()).unwrap();
        story.follow_link("Lake", ui.targets()).unwrap();
        assert_eq!(text(&ui), "Visits: 2");
        assert_eq!(ui.passage.entries().len(), 5);

        let snapshot = story.snapshot();
        assert_eq!(snapshot.current_name.as_deref(), Some("Lake"));
        assert_eq!(snapshot.last.as_deref(), Some("2"));
    }

    /// Test: conditionals read state at render time
    #[test]
    fn tunnel_is_dark_without_a_torch() {
        let mut story = caves();
        story
            .state_mut()
            .set("torch", json!(false), Scope::Global)
            .unwrap();
        let mut ui = HeadlessPresentation::new();

        story
            .display_passage(PassageRef::Name("Tunnel"), ui.targets())
            .unwrap();
        assert_eq!(text(&ui), "It is pitch black.");
    }

    /// Test: typed text appears as the clock advances
    #[test]
    fn ridge_types_its_text() {
        let mut story = caves();
        let mut ui = HeadlessPresentation::new();
        story.display_current_passage(ui.targets()).unwrap();
        story.follow_link("Ridge", ui.targets()).unwrap();

        assert_eq!(text(&ui), "");
        story.tick(0, &mut ui.passage);
        assert_eq!(text(&ui), "T");
        story.tick(1_000, &mut ui.passage);
        assert_eq!(text(&ui), "The wind howls.");
        assert!(story.typing().is_idle());
    }

    /// Test: a missing passage is reported and nothing changes
    #[test]
    fn unknown_passage_is_not_found() {
        let mut story = caves();
        let mut ui = HeadlessPresentation::new();
        story.display_current_passage(ui.targets()).unwrap();
        let before = story.state().combined_view();

        let err = story.follow_link("Attic", ui.targets()).unwrap_err();
        assert!(matches!(err, StoryError::NotFound { .. }));
        assert_eq!(story.state().combined_view(), before);
        assert_eq!(text(&ui), "The cave mouth breathes cold air.");
    }

    /// Test: passages can be addressed by pid
    #[test]
    fn display_by_pid() {
        let mut story = caves();
        let mut ui = HeadlessPresentation::new();
        story
            .display_passage(PassageRef::Id("4"), ui.targets())
            .unwrap();
        assert_eq!(story.current_passage().unwrap().name(), "Ridge");
        assert_eq!(ui.compass.target(Direction::South), Some("Mouth"));
    }

    /// Test: listeners fire once per displayed passage
    #[test]
    fn listeners_count_displays() {
        let mut story = caves();
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        story.on_passage_changed(move |_| sink.set(sink.get() + 1));

        let mut ui = HeadlessPresentation::new();
        story.display_current_passage(ui.targets()).unwrap();
        story.follow_link("Tunnel", ui.targets()).unwrap();
        let _ = story.follow_link("Attic", ui.targets());

        assert_eq!(count.get(), 2);
    }

    /// Test: links to names holding escaped characters can be followed
    #[test]
    fn escaped_link_targets_resolve() {
        let mut story = inline(concat!(
            r#"<tw-passagedata pid="1" name="Hall">[[Tom&#39;s Room]] [[Eat|Fish &amp; Chips]] [[Up-&gt;Attic]]</tw-passagedata>"#,
            r#"<tw-passagedata pid="2" name="Tom&#39;s Room">Tidy.</tw-passagedata>"#,
            r#"<tw-passagedata pid="3" name="Fish &amp; Chips">Greasy.</tw-passagedata>"#,
            r#"<tw-passagedata pid="4" name="Attic">Dusty.</tw-passagedata>"#,
        ));
        let mut ui = HeadlessPresentation::new();
        story.display_current_passage(ui.targets()).unwrap();

        let aliases: Vec<&str> = ui.links.links().iter().map(|l| l.alias.as_str()).collect();
        assert_eq!(aliases, vec!["Tom's Room", "Eat", "Up"]);

        story.follow_link("Tom's Room", ui.targets()).unwrap();
        assert_eq!(text(&ui), "Tidy.");

        story.display_passage(PassageRef::Id("1"), ui.targets()).unwrap();
        let target = ui.links.target(1).unwrap().to_string();
        story.follow_link(&target, ui.targets()).unwrap();
        assert_eq!(text(&ui), "Greasy.");

        story.display_passage(PassageRef::Id("1"), ui.targets()).unwrap();
        let target = ui.links.target(2).unwrap().to_string();
        assert_eq!(target, "Attic");
        story.follow_link(&target, ui.targets()).unwrap();
        assert_eq!(text(&ui), "Dusty.");
    }
}

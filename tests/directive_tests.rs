//! Directive tests
//! Renders small inline stories and checks state, output and errors

use serde_json::json;
use trellis::{
    CommonMark, HeadlessPresentation, HtmlDocument, PassageRef, Scope, Story, StoryData,
    StoryError,
};

fn passage(pid: &str, name: &str, content: &str) -> String {
    format!(r#"<tw-passagedata pid="{pid}" name="{name}" tags="">{content}</tw-passagedata>"#)
}

fn story(passages: &[String]) -> Story {
    let html = format!(
        r#"<tw-storydata name="Trials" ifid="T-1" startnode="1">{}</tw-storydata>"#,
        passages.concat()
    );
    let document = HtmlDocument::parse(&html).expect("Failed to parse story");
    let data = StoryData::from_source(&document, &CommonMark::default()).expect("Invalid story");
    Story::builder(data).build().expect("Failed to build story")
}

fn show(story: &mut Story, ui: &mut HeadlessPresentation) -> Result<String, StoryError> {
    story.display_current_passage(ui.targets())?;
    Ok(ui.passage.active().map(|entry| entry.text()).unwrap_or_default())
}

#[cfg(test)]
mod directive_tests {
    use super::*;

    /// Test: quoted numbers reach scripts as numbers; other strings stay strings
    #[test]
    fn set_parses_json_values() {
        let mut story = story(&[passage(
            "1",
            "Start",
            r#"{{set count=&quot;5&quot; label=&quot;hello&quot;}}{{#script}}set(&quot;double&quot;, get(&quot;count&quot;) * 2){{/script}}{{double}} {{label}}"#,
        )]);
        let mut ui = HeadlessPresentation::new();

        assert_eq!(show(&mut story, &mut ui).unwrap(), "10 hello");
        assert_eq!(story.state().get("count", None).unwrap(), json!(5));
        assert_eq!(story.state().get("double", None).unwrap(), json!(10));
        assert_eq!(story.state().get("label", None).unwrap(), json!("hello"));
    }

    /// Test: scripts write temporary values that templates read through `t.`
    #[test]
    fn temp_scope_is_visible_to_templates() {
        let mut story = story(&[passage(
            "1",
            "Start",
            r#"{{#script}}set("mood", "calm", "temp"){{/script}}Mood: {{t.mood}}"#,
        )]);
        let mut ui = HeadlessPresentation::new();

        assert_eq!(show(&mut story, &mut ui).unwrap(), "Mood: calm");
        assert_eq!(story.state().get("mood", Some(Scope::Temp)).unwrap(), json!("calm"));
        assert!(story.state().get("mood", Some(Scope::Global)).is_err());
    }

    /// Test: scripts see the passage and story objects
    #[test]
    fn scripts_see_passage_and_story() {
        let mut story = story(&[passage(
            "1",
            "Start",
            r#"{{#script}}set("where", passage.name + "@" + story.name){{/script}}{{where}}"#,
        )]);
        let mut ui = HeadlessPresentation::new();
        assert_eq!(show(&mut story, &mut ui).unwrap(), "Start@Trials");
    }

    /// Test: unless renders its body when the value is absent
    #[test]
    fn unless_inverts_the_condition() {
        let mut story = story(&[passage(
            "1",
            "Start",
            "{{#unless key}}locked{{else}}open{{/unless}}",
        )]);
        let mut ui = HeadlessPresentation::new();
        assert_eq!(show(&mut story, &mut ui).unwrap(), "locked");

        story
            .state_mut()
            .set("key", json!("brass"), Scope::Global)
            .unwrap();
        assert_eq!(show(&mut story, &mut ui).unwrap(), "open");
    }

    /// Test: double braces escape, triple braces insert markup
    #[test]
    fn interpolation_escapes_unless_raw() {
        let mut story = story(&[passage("1", "Start", "{{html}} / {{{html}}}")]);
        story
            .state_mut()
            .set("html", json!("<b>bold</b>"), Scope::Global)
            .unwrap();
        let mut ui = HeadlessPresentation::new();

        assert_eq!(show(&mut story, &mut ui).unwrap(), "<b>bold</b> / bold");
        let markup = ui.passage.active().unwrap().rendered();
        assert!(markup.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(markup.contains("<b>bold</b>"));
    }

    /// Test: a failing script reports its source and leaves the pointers restored
    #[test]
    fn failing_script_carries_its_source() {
        let mut story = story(&[
            passage("1", "Start", ""),
            passage("2", "Trap", "{{#script}}explode(){{/script}}"),
        ]);
        let mut ui = HeadlessPresentation::new();

        let err = story
            .display_passage(PassageRef::Name("Trap"), ui.targets())
            .unwrap_err();
        match err {
            StoryError::DirectiveExecution { source_text, .. } => {
                assert_eq!(source_text, "explode()");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(story.current_passage().unwrap().name(), "Start");
    }

    /// Test: audio directives validate their inputs
    #[test]
    fn audio_requires_url_and_registration() {
        let mut story = story(&[passage("1", "Start", r#"{{audio name="drip"}}"#)]);
        let mut ui = HeadlessPresentation::new();
        assert!(matches!(
            show(&mut story, &mut ui),
            Err(StoryError::Validation { .. })
        ));

        let mut story = story_with_play();
        assert!(matches!(
            show(&mut story, &mut ui),
            Err(StoryError::Validation { .. })
        ));
    }

    fn story_with_play() -> Story {
        story(&[passage("1", "Start", r#"{{play name="drip"}}"#)])
    }

    /// Test: registered audio plays at the default volume
    #[test]
    fn audio_then_play() {
        let mut story = story(&[passage(
            "1",
            "Start",
            r#"{{audio url="wind.ogg" name="wind"}}{{play name="wind"}}"#,
        )]);
        let mut ui = HeadlessPresentation::new();
        show(&mut story, &mut ui).unwrap();

        let wind = story.audio().track("wind").unwrap();
        assert_eq!(wind.url, "wind.ogg");
        assert!(wind.playing);
        assert!(!wind.looped);
    }

    /// Test: unknown directives with arguments are template errors
    #[test]
    fn unknown_directive_is_rejected() {
        let mut story = story(&[passage("1", "Start", r#"{{shout text="hi"}}"#)]);
        let mut ui = HeadlessPresentation::new();
        assert!(matches!(
            show(&mut story, &mut ui),
            Err(StoryError::Template { .. })
        ));
    }

    /// Test: an unregistered map name is not found
    #[test]
    fn unknown_map_is_not_found() {
        let mut story = story(&[passage("1", "Start", r#"{{map name="nowhere"}}"#)]);
        let mut ui = HeadlessPresentation::new();
        assert!(matches!(
            show(&mut story, &mut ui),
            Err(StoryError::NotFound { .. })
        ));
        assert!(story.map().current().is_none());
    }

    /// Test: chained typing units run one after another
    #[test]
    fn typing_chains_to_the_next_unit() {
        let mut story = story(&[passage(
            "1",
            "Start",
            r#"{{#type name="a" speed=10 next="b"}}Hi{{/type}} {{#type name="b" speed=10 wait=true}}there{{/type}}"#,
        )]);
        let mut ui = HeadlessPresentation::new();
        show(&mut story, &mut ui).unwrap();

        story.tick(0, &mut ui.passage);
        story.tick(10, &mut ui.passage);
        assert_eq!(ui.passage.active().unwrap().text(), "Hi");

        let mut now = 10;
        while let Some(deadline) = story.typing().next_deadline() {
            now = now.max(deadline);
            story.tick(now, &mut ui.passage);
        }
        assert_eq!(ui.passage.active().unwrap().text(), "Hi there");
    }

    /// Test: extreme typing delays and speeds stay on the clock instead of wrapping
    #[test]
    fn huge_typing_values_do_not_overflow() {
        let mut story = story(&[passage(
            "1",
            "Start",
            r#"{{#type delay=1e30}}x{{/type}}{{#type speed=1e30}}yz{{/type}}"#,
        )]);
        let mut ui = HeadlessPresentation::new();
        show(&mut story, &mut ui).unwrap();

        story.tick(1, &mut ui.passage);
        assert_eq!(ui.passage.active().unwrap().text(), "y");
        assert_eq!(story.typing().next_deadline(), Some(u64::MAX));

        story.tick(1_000_000, &mut ui.passage);
        assert_eq!(ui.passage.active().unwrap().text(), "y");
    }

    /// Test: a waiting unit nothing chains to is released once the rest settles
    #[test]
    fn settling_releases_waiting_units() {
        let mut story = story(&[passage(
            "1",
            "Start",
            r#"{{#type speed=10}}Hi{{/type}} {{#type speed=10 wait=true}}there{{/type}}"#,
        )]);
        let mut ui = HeadlessPresentation::new();
        show(&mut story, &mut ui).unwrap();

        trellis::cli::view::settle_typing(&mut story, &mut ui.passage);
        assert_eq!(ui.passage.active().unwrap().text(), "Hi there");
        assert!(story.typing().is_idle());
    }

    /// Test: a quoted argument may contain the closing delimiter
    #[test]
    fn quoted_closing_braces_stay_in_the_argument() {
        let mut story = story(&[passage(
            "1",
            "Start",
            r#"{{set note=&quot;a}}b&quot;}}{{note}}"#,
        )]);
        let mut ui = HeadlessPresentation::new();
        assert_eq!(show(&mut story, &mut ui).unwrap(), "a}}b");
        assert_eq!(story.state().get("note", None).unwrap(), json!("a}}b"));
    }

    /// Test: setup scripts see each escaped character decoded exactly once
    #[test]
    fn setup_script_is_decoded_once() {
        let story = story(&[
            passage("1", "Start", "Hello"),
            passage(
                "2",
                "StorySetup",
                r#"{{set tag=&quot;&amp;amp;&quot;}}{{#script}}set(&quot;note&quot;, &quot;&amp;lt;b&amp;gt;&quot;){{/script}}"#,
            ),
        ]);
        assert_eq!(story.state().get("note", None).unwrap(), json!("&lt;b&gt;"));
        assert_eq!(story.state().get("tag", None).unwrap(), json!("&amp;"));
    }
}

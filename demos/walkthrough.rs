//! Scripted walkthrough of a story file
//! Usage: cargo run --example walkthrough -- story.html [passage...]
//!
//! Shows the start passage, then follows each named passage in order,
//! printing the text, the map and the exits after every step.

use std::env;
use std::fs;
use std::process;
use trellis::cli::view::settle_typing;
use trellis::{CommonMark, HeadlessPresentation, HtmlDocument, Story, StoryData};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <story.html> [passage...]", args[0]);
        process::exit(1);
    }

    let input_file = &args[1];
    let html = match fs::read_to_string(input_file) {
        Ok(content) => content,
        Err(err) => {
            eprintln!("Error reading file {input_file}: {err}");
            process::exit(1);
        }
    };

    let data = match HtmlDocument::parse(&html)
        .and_then(|document| StoryData::from_source(&document, &CommonMark::default()))
    {
        Ok(data) => data,
        Err(err) => {
            eprintln!("Invalid story: {err}");
            process::exit(1);
        }
    };

    let mut story = match Story::builder(data).build() {
        Ok(story) => story,
        Err(err) => {
            eprintln!("Story setup failed: {err}");
            process::exit(1);
        }
    };

    let mut ui = HeadlessPresentation::new();
    if let Err(err) = story.display_current_passage(ui.targets()) {
        eprintln!("Start passage failed: {err}");
        process::exit(1);
    }
    print_step(&mut story, &mut ui);

    for name in &args[2..] {
        println!("> {name}");
        if let Err(err) = story.follow_link(name, ui.targets()) {
            eprintln!("Could not go to {name}: {err}");
            process::exit(1);
        }
        print_step(&mut story, &mut ui);
    }
}

fn print_step(story: &mut Story, ui: &mut HeadlessPresentation) {
    settle_typing(story, &mut ui.passage);

    if let Some(entry) = ui.passage.active() {
        println!("[{}]", entry.name);
        println!("{}", entry.text());
    }
    if let Some(map) = story.map().current() {
        println!("{}", map.to_text());
    }
    let exits: Vec<String> = ui
        .links
        .links()
        .iter()
        .map(|link| link.target.clone())
        .chain(
            ui.compass
                .enabled()
                .map(|(direction, target)| format!("{direction}: {target}")),
        )
        .collect();
    println!("exits: {}", exits.join(", "));
    println!();
}

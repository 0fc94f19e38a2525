//! Interactive player mode
//!
//! Plays a story document in the terminal: numbered links, compass
//! directions, typed text animated on tokio timers, and a single save slot
//! stored next to the story file.

use crate::{
    cli::view::{ViewState, render_delta, show_passage},
    cli::open_story,
    config::StoryConfig,
    presentation::HeadlessPresentation,
    repository::StoryRepository,
    story::Story,
    types::Direction,
};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::{Duration, Instant, sleep};

type Input = Lines<BufReader<Stdin>>;

/// Run the player mode
pub async fn run_play(path: &Path, config: StoryConfig, debug: bool) -> anyhow::Result<()> {
    let (repository, id) = open_story(path)?;
    let data = repository.load_story(&id).await?;
    let ifid = data.metadata.ifid.clone();
    let mut story = Story::builder(data).config(config).build()?;

    let mut ui = HeadlessPresentation::new();
    let mut view_state = ViewState::new();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let clock = Instant::now();

    println!("=== {} ===", story.metadata().name);
    println!();
    println!("Controls:");
    println!("  1-9:      follow link");
    println!("  n/s/e/w:  move");
    println!("  save:     save progress");
    println!("  load:     restore saved progress");
    println!("  q:        quit");
    println!();

    story.display_current_passage(ui.targets())?;
    let mut redraw = true;

    loop {
        if redraw {
            if let Some(entry) = ui.passage.active() {
                println!("== {} ==", entry.name);
            }
            animate(&mut story, &mut ui, clock).await?;

            let delta = view_state.apply(story.map().current(), story.audio().tracks());
            render_delta(&delta);
            show_passage(&ui);

            if debug {
                display_debug_info(&story)?;
            }
        }
        redraw = false;

        let Some(command) = get_input(&mut input).await? else {
            println!("Goodbye!");
            return Ok(());
        };

        let target = match command.as_str() {
            "q" | "quit" => {
                println!("Goodbye!");
                return Ok(());
            }
            "save" => {
                let bytes = story.save_state()?;
                repository.save_snapshot(&ifid, &bytes).await?;
                println!("[Saved]");
                continue;
            }
            "load" => {
                match repository.load_snapshot(&ifid).await? {
                    Some(bytes) => {
                        story.load_state(&bytes)?;
                        match story.display_current_passage(ui.targets()) {
                            Ok(()) => redraw = true,
                            Err(err) => println!("[Error: {err}]"),
                        }
                    }
                    None => println!("[No saved progress]"),
                }
                continue;
            }
            other => resolve_command(other, &ui),
        };

        match target {
            Some(name) => match story.follow_link(&name, ui.targets()) {
                Ok(()) => redraw = true,
                Err(err) => println!("[Error: {err}]"),
            },
            None => println!("[Invalid command: {command}]"),
        }
    }
}

/// Map a typed command to the passage it leads to
fn resolve_command(command: &str, ui: &HeadlessPresentation) -> Option<String> {
    if let Ok(number) = command.parse::<usize>() {
        return number
            .checked_sub(1)
            .and_then(|index| ui.links.target(index))
            .map(str::to_string);
    }
    let direction = match command {
        "n" => Direction::North,
        "s" => Direction::South,
        "e" => Direction::East,
        "w" => Direction::West,
        _ => Direction::from_alias(command)?,
    };
    ui.compass.target(direction).map(str::to_string)
}

/// Print the active passage, revealing typed text as the timers fire
async fn animate(story: &mut Story, ui: &mut HeadlessPresentation, clock: Instant) -> anyhow::Result<()> {
    let mut printed = String::new();
    let mut diverged = false;
    let mut stdout = std::io::stdout();

    loop {
        let now = clock.elapsed().as_millis() as u64;
        story.tick(now, &mut ui.passage);

        let text = ui.passage.active().map(|entry| entry.text()).unwrap_or_default();
        if !diverged {
            match text.strip_prefix(printed.as_str()) {
                Some(rest) => {
                    print!("{rest}");
                    stdout.flush()?;
                }
                // Text after a typed span shifted; print the final text once typing ends
                None => diverged = true,
            }
        }
        printed = text;

        match story.typing().next_deadline() {
            Some(deadline) => sleep(Duration::from_millis(deadline.saturating_sub(now))).await,
            None if story.start_waiting_typing(now) => {}
            None => break,
        }
    }

    if diverged {
        println!();
        print!("{printed}");
    }
    println!();
    Ok(())
}

/// Read one trimmed line; `None` at end of input
async fn get_input(input: &mut Input) -> anyhow::Result<Option<String>> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

fn display_debug_info(story: &Story) -> anyhow::Result<()> {
    let snapshot = story.snapshot();
    println!("--- Debug Info ---");
    println!(
        "Passage: {} (last: {})",
        snapshot.current_name.as_deref().unwrap_or("(none)"),
        snapshot.last.as_deref().unwrap_or("(none)")
    );
    println!("State: {}", serde_json::to_string(&snapshot.state)?);
    let pending = story.typing().len();
    if pending > 0 {
        println!("Typing units: {pending}");
    }
    println!("------------------");
    println!();
    Ok(())
}

//! CLI entry point for trellis
//!
//! Plays, lists and dumps published story documents.

use std::path::PathBuf;
use std::process;
use trellis::config::StoryConfig;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "play" | "passages" | "dump" => {
            if args.len() < 3 {
                eprintln!("Error: Missing story file path");
                eprintln!();
                print_usage();
                process::exit(1);
            }
            let file_path = PathBuf::from(&args[2]);
            let rest = &args[3..];
            let debug = rest.iter().any(|arg| arg == "--debug");
            let config = load_config(rest, debug);
            init_logging(&config);

            let result = match command.as_str() {
                "play" => trellis::cli::play::run_play(&file_path, config, debug).await,
                "passages" => trellis::cli::inspect::run_passages(&file_path).await,
                _ => {
                    let names: Vec<String> = rest
                        .iter()
                        .filter(|arg| !arg.starts_with("--"))
                        .cloned()
                        .collect();
                    trellis::cli::inspect::run_dump(&file_path, config, &names).await
                }
            };

            if let Err(err) = result {
                eprintln!("Error: {} failed for '{}'", command, file_path.display());
                eprintln!("Reason: {}", err);
                process::exit(1);
            }
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Error: Unknown command '{}'", command);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("trellis - Twine story player");
    println!();
    println!("USAGE:");
    println!("    trellis <command> <story.html> [options]");
    println!();
    println!("COMMANDS:");
    println!("    play <file> [--debug]            Play the story in the terminal");
    println!("    passages <file>                  List passages, tags and links");
    println!("    dump <file> [passage...]         Follow passages in order and print JSON");
    println!("    --help, -h                       Show this help message");
    println!();
    println!("OPTIONS:");
    println!("    --debug             Show debug information and log to stderr");
    println!("    --config=<file>     Read story settings from a JSON file");
    println!();
    println!("ENVIRONMENT:");
    println!("    TRELLIS_DEBUG=1     Enable debug logging");
    println!();
    println!("EXAMPLES:");
    println!("    trellis play stories/caves.html");
    println!("    trellis dump stories/caves.html Tunnel Lake");
}

fn load_config(args: &[String], debug: bool) -> StoryConfig {
    let config = match args.iter().find_map(|arg| arg.strip_prefix("--config=")) {
        Some(path) => {
            let parsed = std::fs::read_to_string(path)
                .map_err(|err| err.to_string())
                .and_then(|json| StoryConfig::from_json(&json).map_err(|err| err.to_string()));
            match parsed {
                Ok(config) => config,
                Err(reason) => {
                    eprintln!("Error: Failed to read config '{}'", path);
                    eprintln!("Reason: {}", reason);
                    process::exit(1);
                }
            }
        }
        None => StoryConfig::default(),
    };

    let mut config = config.with_env();
    if debug {
        config.debug.enabled = true;
    }
    config
}

fn init_logging(config: &StoryConfig) {
    if let Err(err) = trellis::logging::init(config.debug.clone()) {
        eprintln!("Warning: logging unavailable: {}", err);
    }
}

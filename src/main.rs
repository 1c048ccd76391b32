use clap::{Arg, Command};
use log::LevelFilter;
use replysmith::types::{ReplyLength, ReplyTone};
use replysmith::{Config, Engine, ReplyOptions};
use std::io::Read;
use std::process;

fn main() {
    let matches = Command::new("replysmith")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Heuristic email intent extraction and reply drafting engine")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Raw email text file to process (defaults to stdin)"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("tone")
                .long("tone")
                .value_name("TONE")
                .help("Reply tone: formal, friendly, assertive, concise, persuasive")
                .default_value("friendly"),
        )
        .arg(
            Arg::new("length")
                .long("length")
                .value_name("LENGTH")
                .help("Reply length: short, medium, long")
                .default_value("medium"),
        )
        .arg(
            Arg::new("analyze-only")
                .long("analyze-only")
                .help("Print the analysis without drafting a reply")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        if let Err(e) = Config::generate_default(path) {
            eprintln!("Failed to generate config: {e}");
            process::exit(1);
        }
        println!("Default configuration written to {path}");
        return;
    }

    let config = match matches.get_one::<String>("config") {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {e}");
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    let raw = match matches.get_one::<String>("input") {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Failed to read {path}: {e}");
                process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut buffer) {
                eprintln!("Failed to read stdin: {e}");
                process::exit(1);
            }
            buffer
        }
    };

    let tone = match parse_tone(matches.get_one::<String>("tone").map(String::as_str)) {
        Some(tone) => tone,
        None => {
            eprintln!("Unknown tone; expected formal, friendly, assertive, concise or persuasive");
            process::exit(1);
        }
    };
    let length = match parse_length(matches.get_one::<String>("length").map(String::as_str)) {
        Some(length) => length,
        None => {
            eprintln!("Unknown length; expected short, medium or long");
            process::exit(1);
        }
    };

    let mut engine = Engine::new(&config);
    if matches.get_flag("analyze-only") {
        let analysis = engine.analyze(&raw);
        print_json(&analysis);
    } else {
        let options = ReplyOptions {
            tone,
            length,
            ..Default::default()
        };
        let (analysis, reply) = engine.draft_reply(&raw, &options);
        print_json(&serde_json::json!({
            "analysis": analysis,
            "reply": reply,
        }));
    }
}

fn parse_tone(value: Option<&str>) -> Option<ReplyTone> {
    match value? {
        "formal" => Some(ReplyTone::Formal),
        "friendly" => Some(ReplyTone::Friendly),
        "assertive" => Some(ReplyTone::Assertive),
        "concise" => Some(ReplyTone::Concise),
        "persuasive" => Some(ReplyTone::Persuasive),
        _ => None,
    }
}

fn parse_length(value: Option<&str>) -> Option<ReplyLength> {
    match value? {
        "short" => Some(ReplyLength::Short),
        "medium" => Some(ReplyLength::Medium),
        "long" => Some(ReplyLength::Long),
        _ => None,
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialize output: {e}");
            process::exit(1);
        }
    }
}

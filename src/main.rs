//! URL-Shield - Hybrid Phishing Classification Engine

mod api;
mod logic;
pub mod constants;

use api::commands;

fn print_usage() {
    eprintln!("URL-Shield v{}", constants::APP_VERSION);
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  url-shield train <corpus.csv|corpus.jsonl> [artifact-out]");
    eprintln!("  url-shield predict <url> [artifact-path]");
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", constants::APP_NAME, constants::APP_VERSION);

    let args: Vec<String> = std::env::args().skip(1).collect();

    let outcome = match args.first().map(String::as_str) {
        Some("train") => match args.get(1) {
            Some(corpus_path) => commands::train(corpus_path, args.get(2).map(String::as_str))
                .and_then(|outcome| {
                    serde_json::to_string_pretty(&outcome).map_err(|e| e.to_string())
                }),
            None => {
                print_usage();
                std::process::exit(2);
            }
        },
        Some("predict") => match args.get(1) {
            Some(url) => commands::predict(url, args.get(2).map(String::as_str)).and_then(
                |decision| serde_json::to_string_pretty(&decision).map_err(|e| e.to_string()),
            ),
            None => {
                print_usage();
                std::process::exit(2);
            }
        },
        _ => {
            print_usage();
            std::process::exit(2);
        }
    };

    match outcome {
        Ok(json) => println!("{}", json),
        Err(message) => {
            log::error!("{}", message);
            std::process::exit(1);
        }
    }
}

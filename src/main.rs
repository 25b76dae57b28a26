mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mnemograph::{Config, MemoryEngine, OnnxEmbedder};

use commands::Commands;

/// mnemograph - A hybrid memory-retrieval and relationship-graph engine
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(parent) = config.database_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error: cannot create data directory: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let embedder = match OnnxEmbedder::new(&config.embedding_model) {
        Ok(embedder) => embedder,
        Err(e) => {
            eprintln!("Error: failed to load embedding model: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let db_path = config.database_path.clone();
    let index_path = config.index_path.clone();
    let mut engine =
        match MemoryEngine::new(&db_path, Some(index_path.as_path()), Box::new(embedder), config) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        };

    match commands::execute(&cli.command, &mut engine, cli.json) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

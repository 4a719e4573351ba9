//! Docent CLI
//!
//! Retrieval-augmented question answering over a private lab corpus.

use anyhow::Result;
use clap::Parser;
use docent_core::{Assistant, Backends, Config, Database, DocentError};

mod app;
mod commands;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        let code = e
            .downcast_ref::<DocentError>()
            .map(DocentError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // DOCENT_DB overrides the platform cache location
    let db_path = std::env::var("DOCENT_DB")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| Database::default_path());

    let backends = Backends::from_config(&config)?;
    let assistant = Assistant::init(config, &db_path, backends)?;

    let result = match cli.command {
        Commands::Ingest(args) => commands::ingest::run(args, &assistant).await,
        Commands::Ask(args) => commands::ask::run(args, &assistant, cli.format).await,
        Commands::Status => commands::status::run(&assistant, cli.format).await,
        Commands::Rm(args) => commands::rm::run(args, &assistant).await,
    };

    assistant.shutdown().await;
    result
}

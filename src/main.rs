// src/main.rs — Flowing entry point

use clap::Parser;

use flowing::cli::{Cli, Commands};
use flowing::infra::config::Config;
use flowing::infra::logger;

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG)
    logger::init_logging("warn");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match &cli.command {
        Commands::Run(args) => flowing::cli::run::run_controller(args, &config).await,
        Commands::Discover { agents } => {
            let registry = flowing::cli::run::load_registry(agents.as_deref(), &config)?;
            flowing::cli::discover::run_discover(&registry).await
        }
        Commands::Worker {
            name,
            port,
            balance,
        } => flowing::worker::serve(name, *port, *balance).await,
        Commands::Traces { id } => {
            flowing::cli::traces::run_traces(&config.observability.trace_dir(), id.as_deref())
        }
    }
}

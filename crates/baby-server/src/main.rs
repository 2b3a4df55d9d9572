//! Web server for the baby language playground
//!
//! Loads the playground configuration, builds the compile-and-run pipeline and
//! serves `POST /compile` until Ctrl+C or SIGTERM.

use anyhow::Result;
use baby_core::{ConfigLoader, Pipeline, PlaygroundConfig};
use baby_server::{shutdown_signal, PlaygroundServer, ServerConfig};
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Baby Playground Server - compile and run baby programs over HTTP")]
struct Cli {
    #[clap(long, short, help = "Path to a YAML configuration file (defaults are used when omitted)")]
    config: Option<PathBuf>,

    #[clap(long, help = "Address to listen on, e.g. 127.0.0.1:3001")]
    bind_addr: Option<String>,

    #[clap(long, help = "Path to the baby compiler executable")]
    compiler: Option<PathBuf>,

    #[clap(long, short, help = "Log level (error, warn, info, debug, trace)")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ConfigLoader::from_file(path).await?,
        None => ConfigLoader::from_env()?,
    };
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    // Initialize logger
    let log_level_filter = config.logging.level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    match &cli.config {
        Some(path) => log::info!("Configuration loaded from file: {}", path.display()),
        None => log::info!("No configuration file given, using defaults and environment"),
    }

    run_server(config).await
}

fn apply_cli_overrides(config: &mut PlaygroundConfig, cli: &Cli) {
    if let Some(bind_addr) = &cli.bind_addr {
        config.server.bind_addr = bind_addr.clone();
    }
    if let Some(compiler) = &cli.compiler {
        config.compiler.path = compiler.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
}

async fn run_server(config: PlaygroundConfig) -> Result<()> {
    let pipeline = Pipeline::new(&config)?;
    log::info!("Workspaces are created under {}", pipeline.workspace_root().display());

    let server_config = ServerConfig::from_playground(&config)?;
    let server = PlaygroundServer::with_config(pipeline, server_config);

    server.serve_with_shutdown(shutdown_signal()).await?;
    Ok(())
}

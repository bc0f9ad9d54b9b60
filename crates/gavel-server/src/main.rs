//! Judge server binary
//!
//! Loads the YAML configuration, wires the container sandbox, the question bank
//! and the HTTP surface together and serves until Ctrl+C or SIGTERM.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gavel_core::{
    config::ConfigLoader, DockerSandbox, GavelConfig, Judge, Language, TestCaseRepository,
    YamlTestCaseRepository,
};
use gavel_http::{shutdown_signal, JudgeServer, ServerConfig};
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_CONFIG_FILE: &str = "gavel.yaml";

#[derive(Parser, Debug)]
#[clap(author, version, about = "Gavel - sandboxed code-execution judge")]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(long, short, help = "Configuration file (defaults to ./gavel.yaml, then the user config directory)")]
    config: Option<PathBuf>,

    #[clap(long, help = "Override server.bind_addr from the configuration")]
    bind_addr: Option<String>,

    #[clap(long, short, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the judge server (default command)
    Run {
        #[clap(long, short)]
        config: Option<PathBuf>,

        #[clap(long)]
        bind_addr: Option<String>,
    },
    /// List supported languages and the images they run in
    Languages,
    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    match cli.command {
        Some(Commands::Run { config, bind_addr }) => {
            let config = config.or(cli.config);
            let bind_addr = bind_addr.or(cli.bind_addr);
            run_server(config, bind_addr).await
        }
        Some(Commands::Languages) => {
            let config = load_config(cli.config.as_deref()).await?;
            print_languages(&config);
            Ok(())
        }
        Some(Commands::CheckConfig) => check_config(cli.config.as_deref()).await,
        None => run_server(cli.config, cli.bind_addr).await,
    }
}

/// Candidate configuration files, most specific first.
fn config_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }

    let mut candidates = vec![PathBuf::from(DEFAULT_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("gavel").join(DEFAULT_CONFIG_FILE));
    }
    candidates
}

async fn load_config(explicit: Option<&Path>) -> Result<GavelConfig> {
    if let Some(path) = explicit {
        log::info!("Loading configuration from file: {}", path.display());
        return Ok(ConfigLoader::from_file(path).await?);
    }

    for candidate in config_candidates(None) {
        if candidate.is_file() {
            log::info!("Loading configuration from file: {}", candidate.display());
            return Ok(ConfigLoader::from_file(&candidate).await?);
        }
    }

    log::info!("No configuration file found, using defaults");
    Ok(ConfigLoader::from_str("", None)?)
}

async fn run_server(config: Option<PathBuf>, bind_addr: Option<String>) -> Result<()> {
    let config = load_config(config.as_deref()).await?;

    let repository: Option<Arc<dyn TestCaseRepository>> = match &config.questions {
        Some(path) => Some(Arc::new(YamlTestCaseRepository::from_file(path).await?)),
        None => {
            log::warn!("No question bank configured; submissions will be answered with 404");
            None
        }
    };

    let sandbox = DockerSandbox::from_config(&config);
    let judge = Judge::new(Arc::new(sandbox));
    if !judge.executor().is_available().await {
        log::warn!(
            "Container runtime '{}' is not reachable; executions will fail until it is",
            config.sandbox.runtime
        );
    }

    let mut server_config = ServerConfig::from_settings(&config.server)?;
    if let Some(addr) = bind_addr {
        server_config = server_config.with_bind_addr_str(&addr)?;
    }
    let bind_socket_addr = server_config.bind_addr;

    let mut server = JudgeServer::new(judge)
        .with_config(server_config)
        .with_memory_mb(config.sandbox.memory_mb);
    for language in Language::ALL {
        server = server.with_language_image(language, config.image_for(language));
    }
    if let Some(repository) = repository {
        server = server.with_repository(repository);
    }

    log::info!("Starting gavel server on {}...", bind_socket_addr);

    if let Err(e) = server.serve_with_shutdown(shutdown_signal()).await {
        log::error!("Server failed: {}", e);
        return Err(e.into());
    }

    log::info!("gavel server shut down gracefully.");
    Ok(())
}

fn print_languages(config: &GavelConfig) {
    println!("{:<12} {:<30} {:<9} aliases", "language", "image", "compiled");
    for language in Language::ALL {
        println!(
            "{:<12} {:<30} {:<9} {}",
            language.name(),
            config.image_for(language),
            if language.is_compiled() { "yes" } else { "no" },
            language.aliases().join(", ")
        );
    }
}

async fn check_config(explicit: Option<&Path>) -> Result<()> {
    let config = load_config(explicit).await?;

    println!("Configuration is valid.");
    println!("  bind address:   {}", config.server.bind_addr);
    println!("  runtime:        {}", config.sandbox.runtime);
    println!("  workspace root: {}", config.sandbox.workspace_root.display());
    println!(
        "  limits:         {} MB, {} cpus, {} pids",
        config.sandbox.memory_mb, config.sandbox.cpus, config.sandbox.pids_limit
    );
    println!(
        "  timeouts:       run {} ms, compile {} ms",
        config.sandbox.run_timeout_ms, config.sandbox.compile_timeout_ms
    );

    if let Some(path) = &config.questions {
        let bank = YamlTestCaseRepository::from_file(path).await?;
        println!("  questions:      {} from {}", bank.len(), path.display());
    } else {
        println!("  questions:      none");
    }

    Ok(())
}

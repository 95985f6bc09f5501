//! CLI for the accident risk prediction service
//!
//! `serve` (the default) starts the HTTP API, `inspect` reports what a model
//! artifact contains.

use accident_risk::api;
use accident_risk::features::FEATURE_NAMES;
use accident_risk::models::XgbRegressor;
use accident_risk::risk::RiskModel;
use accident_risk::utils::{load_config, setup_logging};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "accident_risk")]
#[command(about = "Road accident risk prediction API", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, default_value = "accident_risk.toml")]
    config: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the XGBoost JSON model
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Print the contents of a model artifact
    Inspect {
        /// Path to the XGBoost JSON model
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level)?;

    let mut config = load_config(&cli.config)?;
    config.apply_env();

    match cli.command {
        None => {
            let model = RiskModel::load(&config.model.path);
            api::serve(&config, model).await?;
        }
        Some(Commands::Serve { host, port, model }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(model) = model {
                config.model.path = model;
            }
            info!("Loading model from {}", config.model.path.display());
            let model = RiskModel::load(&config.model.path);
            api::serve(&config, model).await?;
        }
        Some(Commands::Inspect { model }) => {
            let path = model.unwrap_or(config.model.path);
            inspect_model(&path)?;
        }
    }

    Ok(())
}

fn inspect_model(path: &Path) -> Result<()> {
    println!("Loading model from {}...", path.display());
    let model = XgbRegressor::from_file(path)
        .with_context(|| format!("Failed to load model from {}", path.display()))?;

    println!("Booster:    gbtree");
    println!("Objective:  {}", model.objective_name());
    println!("Trees:      {}", model.num_trees());
    println!("Base score: {}", model.base_score());
    if let Some(version) = model.version() {
        println!("Written by: XGBoost {}", version);
    }

    let names = model.feature_names();
    if names.is_empty() {
        println!("\nNo feature names stored; columns are matched by position.");
        return Ok(());
    }

    println!("\nFeature names ({}):", names.len());
    for (i, name) in names.iter().enumerate() {
        let expected = FEATURE_NAMES.get(i).copied().unwrap_or("-");
        let marker = if name == expected { " " } else { "!" };
        println!("  {} {:>2}. {:<24} (schema: {})", marker, i, name, expected);
    }

    if names.iter().map(String::as_str).eq(FEATURE_NAMES) {
        println!("\nFeature names match the request schema.");
    } else {
        println!("\nFeature names differ from the request schema.");
    }

    Ok(())
}

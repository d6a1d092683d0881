use anyhow::Result;
use clap::Parser;
use colored::*;
use medai_core::{ChatSessionManager, ClientConfig, RagClient};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};

mod app;
mod cli;
mod logging;
mod output;

use crate::cli::Args;

/// Main function - Connects to the MedAI query service and answers questions
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env before reading config
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Defaults, then config file, then environment, then flags
    let config = match ClientConfig::load(args.config.as_deref()) {
        Ok(config) => config.merge(&args.overrides()),
        Err(e) => {
            eprintln!("{}", format!("Error loading configuration: {}", e).red());
            return Err(e.into());
        }
    };

    logging::init(config.log_level.as_deref());

    let client = RagClient::new(&config);
    info!(base_url = client.base_url(), "Using query service");

    if args.check {
        match client.health_check().await {
            Ok(true) => {
                println!("{} {}", "Service reachable at".green(), client.base_url());
                return Ok(());
            }
            Ok(false) => {
                eprintln!(
                    "{}",
                    format!("Service at {} is not healthy.", client.base_url()).red()
                );
            }
            Err(e) => {
                error!("Health check failed: {}", e);
                eprintln!(
                    "{}",
                    format!("Could not reach the service at {}.", client.base_url()).red()
                );
            }
        }
        std::process::exit(1);
    }

    let expand_sources = config.expand_sources.unwrap_or(false);
    let mut manager = ChatSessionManager::new(Arc::new(client));

    if args.wants_chat() {
        let stdin = BufReader::new(tokio::io::stdin());
        if let Err(e) = app::run_interactive_chat(&mut manager, expand_sources, args.prompt, stdin).await {
            error!("Error in interactive chat: {}", e);
            eprintln!("{}", format!("Interactive chat failed: {}", e).red());
            return Err(e);
        }
    } else if let Some(prompt) = args.prompt {
        if let Err(e) = app::run_single_query(&mut manager, prompt, expand_sources).await {
            error!("Error processing prompt: {}", e);
            eprintln!("{}", format!("{}", e).red());
            return Err(e);
        }
    }

    Ok(())
}

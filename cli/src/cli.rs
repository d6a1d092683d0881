use clap::Parser;
use medai_core::ClientConfig;
use std::path::PathBuf;

/// Terminal chat client for the MedAI medical question-answering service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The question to ask. Starts an interactive chat when omitted
    #[arg(index = 1)] // Positional argument
    pub prompt: Option<String>,

    /// Stay in interactive chat mode after answering the prompt
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Base URL of the query service (overrides MEDAI_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Path to the config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show source passages expanded instead of collapsed
    #[arg(short, long, default_value_t = false)]
    pub show_sources: bool,

    /// Check that the query service is reachable, then exit
    #[arg(long, default_value_t = false)]
    pub check: bool,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Settings given on the command line, as the last config layer
    pub fn overrides(&self) -> ClientConfig {
        ClientConfig::new(
            self.api_url.clone(),
            self.verbose.then(|| "debug".to_string()),
            self.show_sources.then_some(true),
        )
    }

    /// Whether to run the chat loop rather than a single query
    pub fn wants_chat(&self) -> bool {
        self.interactive || self.prompt.is_none()
    }
}

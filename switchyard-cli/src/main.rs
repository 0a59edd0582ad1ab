use anyhow::Result;
use clap::{Parser, Subcommand};
use switchyard_models::ModelRegistry;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "switchyard", about = "Stream chat completions from any configured LLM provider")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a prompt and stream the reply
    Chat(commands::chat::ChatArgs),
    /// List available models
    Models(commands::models::ModelsArgs),
    /// Manage API keys stored in the system keyring
    Auth(commands::auth::AuthArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Streamed text owns stdout.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let registry = ModelRegistry::with_builtin_providers();

    match cli.command {
        Commands::Chat(args) => commands::chat::run(args, registry).await,
        Commands::Models(args) => commands::models::run(args, &registry),
        Commands::Auth(args) => commands::auth::run(args, &registry),
    }
}

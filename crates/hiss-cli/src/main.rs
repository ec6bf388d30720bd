//! hiss CLI - render and play filtered noise from the command line.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hiss")]
#[command(author, version, about = "Real-time noise synthesis and filtering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render noise to a WAV file
    Render(commands::render::RenderArgs),

    /// Play noise on an output device
    Play(commands::play::PlayArgs),

    /// List available processors and their parameters
    Processors(commands::processors::ProcessorsArgs),

    /// List audio output devices
    Devices,
}

fn main() -> anyhow::Result<()> {
    // Log to stderr so listings on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Play(args) => commands::play::run(args),
        Commands::Processors(args) => commands::processors::run(args),
        Commands::Devices => commands::devices::run(),
    }
}

//! Kamishibai CLI — Command-line interface for narrated video projects.
//!
//! Usage:
//!   kamishibai init <NAME>         Create a new empty project
//!   kamishibai validate <PATH>     Validate a project file
//!   kamishibai info <PATH>         Show project information
//!   kamishibai export <PATH>       Export a project to video
//!   kamishibai cache clear         Empty the narration audio cache
//!   kamishibai check               Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "kamishibai",
    about = "Narrated slideshow videos from scene scripts",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project name
        name: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Output resolution, e.g. 1080x1920
        #[arg(long, default_value = "1080x1920")]
        resolution: String,

        /// Output frame rate
        #[arg(long, default_value = "30")]
        fps: u32,
    },

    /// Validate a project file
    Validate {
        /// Path to the project JSON file
        path: PathBuf,
    },

    /// Show project information
    Info {
        /// Path to the project JSON file
        path: PathBuf,
    },

    /// Export a project to video
    Export {
        /// Path to the project JSON file
        path: PathBuf,

        /// Output file path (overrides the project's setting)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Synthesizer voice id
        #[arg(long, default_value = "1")]
        voice: u32,

        /// Subtitle font file (overrides configuration and detection)
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Manage the narration audio cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Check system capabilities
    Check,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cached narration entry
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    kamishibai_common::logging::init_logging(&kamishibai_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Init {
            name,
            output,
            resolution,
            fps,
        } => commands::init::run(name, output, resolution, fps),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Info { path } => commands::info::run(path),
        Commands::Export {
            path,
            output,
            voice,
            font,
        } => commands::export::run(path, output, voice, font).await,
        Commands::Cache { action } => match action {
            CacheAction::Clear => commands::cache::clear(),
        },
        Commands::Check => commands::check::run(),
    }
}

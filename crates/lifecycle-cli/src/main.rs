mod cmd;
mod output;
mod settings;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lifecycle",
    about = "Render chatops lifecycle messages from resolved domain events",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ./lifecycle.yaml, defaults if absent)
    #[arg(long, global = true, env = "LIFECYCLE_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the lifecycles of an event file ('-' reads stdin)
    Render {
        event: PathBuf,
        /// Render structured cards instead of chat attachments
        #[arg(long)]
        card: bool,
        /// Event timestamp in epoch milliseconds (overrides the event's)
        #[arg(long)]
        timestamp: Option<i64>,
        /// JSON file with canned enrichment results (latest tag, tags, pull requests)
        #[arg(long)]
        enrichment: Option<PathBuf>,
        /// Hand the rendered messages to the configured delivery gateway
        #[arg(long)]
        dispatch: bool,
    },

    /// Show the channels each lifecycle of an event file routes to
    Route { event: PathBuf },

    /// Run the HTTP intake service
    Serve {
        /// Port to listen on (default: server.port from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Inspect the engine configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Render {
            event,
            card,
            timestamp,
            enrichment,
            dispatch,
        } => cmd::render::run(
            config_path,
            cmd::render::RenderArgs {
                event,
                card,
                timestamp,
                enrichment,
                dispatch,
            },
            cli.json,
        ),
        Commands::Route { event } => cmd::route::run(&event, cli.json),
        Commands::Serve { port } => cmd::serve::run(config_path, port),
        Commands::Config { subcommand } => cmd::config::run(config_path, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

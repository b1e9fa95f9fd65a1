use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use yelpcamp_kernel::settings::Settings;

#[derive(Parser)]
#[command(name = "yelpcamp")]
#[command(about = "Campground listings and reviews")]
#[command(version)]
struct Cli {
    /// Directory holding base.toml and the per-environment files
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Environment overlay to load (local, staging, production)
    #[arg(long, global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Load and validate configuration, then open the database
    Check,
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    // Settings::load reads these; set before any runtime threads exist.
    if let Some(dir) = &cli.config_dir {
        std::env::set_var("YELPCAMP_CONFIG_DIR", dir);
    }
    if let Some(env) = &cli.env {
        std::env::set_var("YELPCAMP_ENV", env);
    }
    Settings::load().context("failed to load YelpCamp settings")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli)?;
    yelpcamp_telemetry::init(&settings.telemetry)?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            tokio::runtime::Runtime::new()
                .context("failed to start the async runtime")?
                .block_on(yelpcamp::run(settings))
        }
        Commands::Check => {
            yelpcamp_db::connect(&settings.database.url)
                .with_context(|| format!("failed to open database {}", settings.database.url))?;
            tracing::info!(
                env = ?settings.environment,
                db = %settings.database.url,
                port = settings.server.port,
                "configuration ok"
            );
            Ok(())
        }
    }
}

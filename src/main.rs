use anyhow::Result;
use clap::{Parser, Subcommand};

/// tripweave - road trip planning
#[derive(Parser)]
#[command(name = "tripweave")]
#[command(about = "Plan multi-stop road trips day by day", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Server host address (overrides config file)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run database migrations
    Migrate,
    /// Drop database if exists and recreate with migrations
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = tripweave::Config::load(cli.config.clone())?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    tripweave::observability::init_observability(
        "tripweave",
        env!("CARGO_PKG_VERSION"),
        &config.observability.log_level,
    )?;

    match cli.command {
        Commands::Serve { host, port } => tripweave::cli::serve(config, host, port).await,
        Commands::Migrate => tripweave::cli::migrate(config).await,
        Commands::Reset => tripweave::cli::reset(config).await,
    }
}

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "slate", about = "School report-card portal", version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "slate.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Initialize the Slate data directory and configuration
    Init {
        /// Data directory path
        #[arg(long, default_value = "/var/lib/slate")]
        data_dir: String,
    },
    /// Run a sync from the configured SIS
    Sync {
        /// Verify credentials and connectivity without syncing
        #[arg(long)]
        dry_run: bool,
        /// Sync a single entity type instead of everything
        #[arg(long)]
        entity: Option<String>,
    },
    /// Show sync status and row counts
    Status,
    /// Start the sync API web server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data_dir } => {
            commands::init::run(&cli.config, &data_dir).await?;
        }
        Commands::Sync { dry_run, entity } => {
            commands::sync::run(&cli.config, dry_run, entity.as_deref()).await?;
        }
        Commands::Status => {
            commands::status::run(&cli.config).await?;
        }
        Commands::Serve { port } => {
            commands::serve::run(&cli.config, port).await?;
        }
    }

    Ok(())
}

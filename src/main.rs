//! Advisor Store CLI - runs the database service and its maintenance tasks

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use advisor_store::config::{self, Overrides, ServiceSettings};
use advisor_store::storage::{BackupManager, SqliteStore};
use owo_colors::OwoColorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "advisor-store")]
#[command(version)]
#[command(about = "Persistence service for the AI study advisor")]
#[command(long_about = r#"
Advisor Store keeps users, profiles, chat history and usage statistics in a
single SQLite file and serves them over a JSON REST API.

Configuration is read from flags, then the environment
(ZEABUR_PERSISTENT_DIR, PORT, BACKUP_DIR), then advisor-store.toml.

Example usage:
  advisor-store serve --port 5000
  advisor-store backup --data-dir /data
  advisor-store stats
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct StorageArgs {
    /// Directory holding the database file
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Write backups to this directory instead of probing candidates
    #[arg(short, long)]
    backup_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Take one backup and rotate old ones
    Backup {
        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Show row counts of the database
    Stats {
        #[command(flatten)]
        storage: StorageArgs,
    },
}

fn resolve_settings(
    config_path: Option<&PathBuf>,
    storage: StorageArgs,
    port: Option<u16>,
) -> anyhow::Result<ServiceSettings> {
    let file = config::load_config(config_path.map(PathBuf::as_path))?;
    let overrides = Overrides {
        data_dir: storage.data_dir,
        port,
        backup_dir: storage.backup_dir,
    };
    let settings = ServiceSettings::resolve(file.as_ref(), overrides)?;
    config::ensure_db_dir(&settings.database_path)?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Serve { port, storage } => {
            let settings = resolve_settings(cli.config.as_ref(), storage, port)?;
            tracing::info!("Database path: {}", settings.database_path.display());
            println!(
                "{} listening on http://0.0.0.0:{}",
                "Advisor Store".bold(),
                settings.port
            );
            advisor_store::server::start_server(&settings).await?;
        }

        Commands::Backup { storage } => {
            let settings = resolve_settings(cli.config.as_ref(), storage, None)?;
            let store = SqliteStore::open(&settings.database_path)?;
            let manager = BackupManager::new(settings.backup_location());

            match manager.try_create_backup(&store)? {
                Some(path) => println!("{} Backup written to {}", "✓".green(), path.display()),
                None => println!("{} No writable backup directory found", "!".yellow()),
            }
        }

        Commands::Stats { storage } => {
            let settings = resolve_settings(cli.config.as_ref(), storage, None)?;
            let store = SqliteStore::open(&settings.database_path)?;
            let stats = store.stats()?;

            println!("{} ({})", "Advisor Store Statistics".bold(), settings.database_path.display());
            println!("------------------------------------");
            println!("{}", stats);
        }
    }

    Ok(())
}

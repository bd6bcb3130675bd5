//! Operational command line: scheduler health, language catalogue refresh,
//! name-index maintenance.

use clap::{Parser, Subcommand};
use relief_rest::{create_name_indexes, deploy, MessageCatalog, ResourceRegistry};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relief-admin", about = "Operational tasks for a relief-rest deployment")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the background-worker heartbeat; exits non-zero when stale.
    CheckScheduler,
    /// Reload language catalogues from a directory of <lang>.json files.
    RefreshLanguages {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, default_value = "en")]
        languages: Vec<String>,
    },
    /// Create name-search indexes for the registered resources.
    CreateIndexes,
}

async fn connect() -> Result<sqlx::PgPool, sqlx::Error> {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/relief".into());
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Command::CheckScheduler => {
            let pool = connect().await?;
            if relief_rest::scheduler_healthy(&pool).await? {
                println!("scheduler: ok");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("scheduler: no recent heartbeat");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::RefreshLanguages { dir, languages } => {
            let mut catalog = MessageCatalog::new(languages);
            let loaded = catalog.refresh_from_dir(&dir)?;
            println!("loaded {} catalogues from {}", loaded, dir.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::CreateIndexes => {
            let pool = connect().await?;
            let mut registry = ResourceRegistry::new();
            deploy::register_resources(&mut registry)?;
            let created = create_name_indexes(&pool, &registry).await?;
            println!("created {} indexes", created);
            Ok(ExitCode::SUCCESS)
        }
    }
}

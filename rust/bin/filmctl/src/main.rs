//! `filmctl`: query a film-rating store from the command line.
//!
//! Usage:
//!   filmctl [-c <config.toml>] [--backend sqlite|redb|memory] <command>
//!
//! Every command prints its result as JSON on stdout. Failures print the
//! error body on stderr and exit with status 1.

mod config;
mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use film::{FilmConfig, FilmService};
use filmrate_core::{ServiceConfig, ServiceError, StorageBackend};
use serde::Serialize;
use tracing::info;

use config::CtlConfig;

/// Film-rating store tool.
#[derive(Parser, Debug)]
#[command(name = "filmctl", about = "Film-rating store tool")]
struct Cli {
    /// Path to the config file.
    #[arg(short = 'c', long = "config", default_value = "filmctl.toml")]
    config: PathBuf,

    /// Storage engine (overrides the config file).
    #[arg(long = "backend")]
    backend: Option<StorageBackend>,

    /// Directory holding the database files (overrides the config file).
    #[arg(long = "data-dir")]
    data_dir: Option<PathBuf>,

    /// redb database file.
    #[arg(long = "db")]
    db_path: Option<PathBuf>,

    /// SQLite database file.
    #[arg(long = "sqlite")]
    sqlite_path: Option<PathBuf>,

    /// Load the demo dataset before running the command.
    #[arg(long = "with-demo")]
    with_demo: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Most liked films.
    Popular {
        #[arg(long)]
        count: Option<i64>,
    },
    /// Films of one director.
    DirectorFilms {
        director_id: i64,
        /// `year` or `likes`.
        #[arg(long = "sort-by", default_value = "year")]
        sort_by: String,
    },
    /// Friends shared by two users.
    CommonFriends { user_id: i64, other_id: i64 },
    /// Films liked by both users.
    CommonFilms { user_id: i64, other_id: i64 },
    /// Reviews, most useful first.
    Reviews {
        #[arg(long = "film")]
        film_id: Option<i64>,
        #[arg(long)]
        count: Option<i64>,
    },
    /// Write the demo dataset into the store.
    SeedDemo,
}

impl Cli {
    /// Storage settings from the file, with command-line flags on top.
    fn storage(&self, mut storage: ServiceConfig) -> ServiceConfig {
        if let Some(backend) = self.backend {
            storage.backend = backend;
        }
        if let Some(dir) = &self.data_dir {
            storage.data_dir = Some(dir.clone());
        }
        if let Some(path) = &self.db_path {
            storage.db_path = Some(path.clone());
        }
        if let Some(path) = &self.sqlite_path {
            storage.sqlite_path = Some(path.clone());
        }
        storage
    }
}

fn open_service(storage: &ServiceConfig, film: FilmConfig) -> anyhow::Result<Arc<FilmService>> {
    if let Some(dir) = &storage.data_dir {
        std::fs::create_dir_all(dir)?;
    }

    let svc = match storage.backend {
        StorageBackend::Sqlite => {
            let path = storage.resolve_sqlite_path();
            info!("Opening SQLite store at {}", path.display());
            let sql: Arc<dyn filmrate_sql::SQLStore> = Arc::new(
                filmrate_sql::SqliteStore::open(&path)
                    .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
            );
            FilmService::with_sql(sql, film)
        }
        StorageBackend::Redb => {
            let path = storage.resolve_db_path();
            info!("Opening redb store at {}", path.display());
            let kv: Arc<dyn filmrate_kv::KVStore> = Arc::new(
                filmrate_kv::RedbStore::open(&path)
                    .map_err(|e| anyhow::anyhow!("failed to open KV store: {}", e))?,
            );
            FilmService::with_kv(kv, film)
        }
        StorageBackend::Memory => {
            info!("Using in-memory store");
            FilmService::with_kv(Arc::new(filmrate_kv::MemoryKV::new()), film)
        }
    };
    svc.map_err(|e| anyhow::anyhow!("failed to initialize film service: {}", e))
}

fn to_json<T: Serialize>(value: T) -> Result<serde_json::Value, ServiceError> {
    serde_json::to_value(value).map_err(|e| ServiceError::Internal(e.to_string()))
}

fn dispatch(svc: &FilmService, command: &Command) -> Result<serde_json::Value, ServiceError> {
    match command {
        Command::Popular { count } => to_json(svc.popular_films(*count)?),
        Command::DirectorFilms { director_id, sort_by } => {
            to_json(svc.director_films(*director_id, sort_by)?)
        }
        Command::CommonFriends { user_id, other_id } => {
            to_json(svc.common_friends(*user_id, *other_id)?)
        }
        Command::CommonFilms { user_id, other_id } => {
            to_json(svc.common_films(*user_id, *other_id)?)
        }
        Command::Reviews { film_id, count } => to_json(svc.reviews(*film_id, *count)?),
        Command::SeedDemo => to_json(demo::seed(svc)?),
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    info!("Loading configuration from {}", cli.config.display());
    let file = CtlConfig::load(&cli.config)?;
    let storage = cli.storage(file.storage);
    let svc = open_service(&storage, file.film)?;

    if cli.with_demo && !matches!(cli.command, Command::SeedDemo) {
        demo::seed(&svc).map_err(|e| anyhow::anyhow!("failed to seed demo data: {}", e))?;
    }

    match dispatch(&svc, &cli.command) {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.to_json());
            std::process::exit(1);
        }
    }
}

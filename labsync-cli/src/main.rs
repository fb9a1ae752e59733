use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use labsync_core::inspect::render_summary;
use labsync_core::platform::default_config_path;
use labsync_core::{
    ApiClient, CapacityClient, Cleanup, CleanupOutcome, HttpRemoteStore, LabSyncConfig,
    LocalStore, MemoryStore, MigrationMarker, ReadPolicy, ReloadHook, SqliteStore,
    StorageClient, SyncTrigger,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Lab client storage tool - inspect, export, sync and clean the local store
#[derive(Parser)]
#[command(name = "labsync")]
#[command(about = "Migrate the lab client's local state to the backend", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend API base URL override
    #[arg(long)]
    api: Option<String>,

    /// Local store path override
    #[arg(long)]
    store: Option<PathBuf>,

    /// Use a throwaway in-memory local store
    #[arg(long)]
    dev: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a local value
    Get { key: String },

    /// Write a local value
    Set { key: String, value: String },

    /// Remove a local value
    Rm { key: String },

    /// List local keys
    Ls,

    /// Export the local store to localstorage_<date>.json
    Export {
        /// Output directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Load an exported document into the local store
    Import { file: PathBuf },

    /// Summarize local entries
    Inspect {
        /// Only keys starting with this prefix
        #[arg(long, default_value = "")]
        prefix: String,

        /// Fields to pull out of object values (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// Purge the local store down to the authentication keys
    Cleanup {
        /// Run even if cleanup already happened this session
        #[arg(long)]
        force: bool,
    },

    /// Forget that cleanup ran this session
    EndSession,

    /// Upload local state to the backend
    Sync,

    /// Backend storage operations
    Remote {
        #[command(subcommand)]
        action: RemoteCommand,
    },

    /// Ask the backend whether a test type still has capacity
    Capacity {
        type_essai: String,

        /// Date to check (YYYY-MM-DD), today by default
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum RemoteCommand {
    /// Read a value (backend first, local copy as fallback)
    Get {
        key: String,

        /// remote-then-local, remote-only or local-only
        #[arg(long)]
        policy: Option<String>,
    },

    /// Delete a backend value
    Rm { key: String },

    /// List backend keys
    Ls,
}

/// Remembers the reload request so it can run after the sync result is shown.
#[derive(Default)]
struct PendingReload {
    delay: Mutex<Option<Duration>>,
}

impl PendingReload {
    fn take(&self) -> Option<Duration> {
        self.delay.lock().ok().and_then(|mut d| d.take())
    }
}

impl ReloadHook for PendingReload {
    fn schedule_reload(&self, delay: Duration) {
        if let Ok(mut pending) = self.delay.lock() {
            *pending = Some(delay);
        }
    }
}

fn load_config(cli: &Cli) -> Result<LabSyncConfig> {
    let mut config = match &cli.config {
        Some(path) => LabSyncConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                LabSyncConfig::load(&path)?
            } else {
                info!("No config file found, using defaults");
                LabSyncConfig::default()
            }
        }
    };

    if let Some(api) = &cli.api {
        config.api_base_url = api.clone();
    }
    if let Some(store) = &cli.store {
        config.store_path = store.clone();
    }
    Ok(config)
}

fn open_store(config: &LabSyncConfig, dev: bool) -> Result<LocalStore> {
    if dev {
        info!("Running in development mode (in-memory store)");
        return Ok(match config.quota_bytes {
            Some(quota) => LocalStore::new(MemoryStore::with_quota(quota)),
            None => LocalStore::in_memory(),
        });
    }

    if let Some(parent) = config.store_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = SqliteStore::open(&config.store_path)
        .with_context(|| format!("Failed to open local store {}", config.store_path.display()))?
        .with_quota(config.quota_bytes);
    Ok(LocalStore::new(store))
}

fn storage_client(config: &LabSyncConfig, local: &LocalStore) -> Result<StorageClient> {
    let api = ApiClient::from_config(config, local.clone())?;
    Ok(StorageClient::new(Arc::new(HttpRemoteStore::new(api)), local.clone())
        .with_policy(config.read_policy))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let local = open_store(&config, cli.dev)?;

    match cli.command {
        Commands::Get { key } => match local.get(&key)? {
            Some(value) => println!("{}", value),
            None => bail!("No local value for {}", key),
        },
        Commands::Set { key, value } => {
            local.set(&key, &value)?;
            info!("Stored {}", key);
        }
        Commands::Rm { key } => {
            local.remove(&key)?;
            info!("Removed {}", key);
        }
        Commands::Ls => {
            for key in local.keys()? {
                println!("{}", key);
            }
        }
        Commands::Export { dir } => {
            let dir = dir.unwrap_or_else(|| config.export_dir.clone());
            let today = chrono::Local::now().date_naive();
            let path = labsync_core::write_export(&local, &dir, today)?;
            println!("{}", path.display());
        }
        Commands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let document: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(&content).context("Export document must be a JSON object")?;
            let count = labsync_core::import_document(&local, &document)?;
            println!("Imported {} entries", count);
        }
        Commands::Inspect { prefix, fields } => {
            let summaries = labsync_core::inspect(&local, &prefix, &fields)?;
            for summary in &summaries {
                println!("{}", render_summary(summary));
            }
            info!("{} entries matching {:?}", summaries.len(), prefix);
        }
        Commands::Cleanup { force } => {
            let cleanup = Cleanup::new(config.allow_list());
            let marker = MigrationMarker::at_path(&config.session_marker_path);
            if force {
                marker.end_session()?;
            }
            match cleanup.run_once(&local, &marker)? {
                CleanupOutcome::Completed(report) => println!(
                    "Removed {} of {} entries, kept {}",
                    report.removed(),
                    report.before,
                    report.after
                ),
                CleanupOutcome::Skipped => {
                    println!("Cleanup already performed this session (use --force to rerun)")
                }
            }
        }
        Commands::EndSession => {
            MigrationMarker::at_path(&config.session_marker_path).end_session()?;
            info!("Session ended");
        }
        Commands::Sync => {
            let client = storage_client(&config, &local)?;
            let reload = Arc::new(PendingReload::default());
            let result = SyncTrigger::new(client.clone())
                .with_reload(reload.clone(), config.reload_delay())
                .run()
                .await;

            if !result.success {
                for key in &result.failed_keys {
                    eprintln!("failed: {}", key);
                }
                bail!(
                    "Sync failed after {} entries: {}",
                    result.sync_count,
                    result.error.unwrap_or_default()
                );
            }
            println!("Synced {} entries", result.sync_count);

            if let Some(delay) = reload.take() {
                tokio::time::sleep(delay).await;
                let keys = client.list_keys().await;
                println!("Backend now holds {} keys", keys.len());
            }
        }
        Commands::Remote { action } => {
            let client = storage_client(&config, &local)?;
            match action {
                RemoteCommand::Get { key, policy } => {
                    let client = match policy {
                        Some(name) => match ReadPolicy::parse(&name) {
                            Some(policy) => client.with_policy(policy),
                            None => bail!("Unknown read policy: {}", name),
                        },
                        None => client,
                    };
                    match client.read_resolved(&key).await {
                        Some(resolved) => {
                            info!("Served from {:?} store", resolved.source);
                            println!("{}", serde_json::to_string_pretty(&resolved.value)?);
                        }
                        None => bail!("No value for {}", key),
                    }
                }
                RemoteCommand::Rm { key } => client.delete(&key).await,
                RemoteCommand::Ls => {
                    for key in client.list_keys().await {
                        println!("{}", key);
                    }
                }
            }
        }
        Commands::Capacity { type_essai, date } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let api = ApiClient::from_config(&config, local.clone())?;
            let status = CapacityClient::new(api).check(&type_essai, date).await;
            match status.remaining {
                Some(remaining) => println!(
                    "{} on {}: available={} remaining={}",
                    type_essai, date, status.available, remaining
                ),
                None => println!("{} on {}: available={}", type_essai, date, status.available),
            }
        }
    }

    Ok(())
}

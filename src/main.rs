mod config;
mod feature;
mod geometry;
mod interaction;
mod prompt;
mod routes;
mod services;
mod site;
mod state;
mod storage;
mod surface;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConfigError, DEFAULT_PORT, RemoteConfig};
use crate::prompt::{AutoPrompt, Prompt, StdinPrompt};
use crate::services::remote::{HttpRemote, RemoteError};
use crate::services::session::{MapEvent, Session, SessionError};
use crate::services::store::{FeatureStore, StoreError};
use crate::services::sync::spawn_sync_worker;
use crate::site::{SiteError, SiteId};
use crate::storage::{FileStorage, MemoryStorage, Storage, StorageError};

const EVENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Site(#[from] SiteError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("failed to open event input `{path}`: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "polymark", about = "Polygon annotation sessions for map sites")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay JSON-lines map events through an annotation session.
    Session(SessionArgs),
    /// Run the development remote endpoint.
    Serve {
        #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Print the locally stored collections for a site.
    Show(ShowArgs),
}

/// Flags that override the `POLYMARK_*` environment configuration.
#[derive(Args, Debug, Default)]
struct Overrides {
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    map_id: Option<String>,
    #[arg(long)]
    storage_dir: Option<PathBuf>,
    #[arg(long)]
    sync_delay_ms: Option<u64>,
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Page URL carrying the `siteid` query parameter.
    #[arg(long)]
    url: String,
    /// JSON-lines event file, or `-` for stdin.
    #[arg(long, default_value = "-")]
    input: String,
    /// Accept every confirmation without asking.
    #[arg(long)]
    yes: bool,
    /// Keep local storage in memory; nothing survives the process.
    #[arg(long)]
    ephemeral: bool,
    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Args, Debug)]
struct ShowArgs {
    #[arg(long)]
    url: String,
    /// Print one summary line per feature instead of JSON.
    #[arg(long)]
    summary: bool,
    #[command(flatten)]
    overrides: Overrides,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("polymark=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Session(args) => run_session(args).await,
        Command::Serve { port } => run_serve(port).await,
        Command::Show(args) => run_show(&args),
    }
}

fn load_config(overrides: &Overrides) -> Result<Config, CliError> {
    let mut config = Config::from_env()?;
    if overrides.base_url.is_some() || overrides.map_id.is_some() {
        let base_url = overrides.base_url.as_deref().unwrap_or(&config.remote.base_url);
        let map_id = overrides.map_id.as_deref().unwrap_or(&config.remote.map_id);
        config.remote = RemoteConfig::new(base_url, map_id, config.remote.timeouts)?;
    }
    if let Some(dir) = &overrides.storage_dir {
        config.storage_dir.clone_from(dir);
    }
    if let Some(ms) = overrides.sync_delay_ms {
        config.sync_delay = Duration::from_millis(ms);
    }
    Ok(config)
}

async fn run_session(args: SessionArgs) -> Result<(), CliError> {
    let config = load_config(&args.overrides)?;
    let site = SiteId::from_page_url(&args.url)?;
    let storage: Arc<dyn Storage> = if args.ephemeral {
        info!(site_id = %site, remote = %config.remote.base_url, "opening session with in-memory storage");
        Arc::new(MemoryStorage::new())
    } else {
        let file = FileStorage::open(&config.storage_dir)?;
        info!(site_id = %site, path = %file.path().display(), remote = %config.remote.base_url, "opening session");
        Arc::new(file)
    };
    let store = FeatureStore::new(storage, site);
    let remote = Arc::new(HttpRemote::new(&config.remote)?);

    let from_stdin = args.input == "-";
    let prompt: Arc<dyn Prompt> = if args.yes {
        Arc::new(AutoPrompt { answer: true })
    } else if from_stdin {
        // EDGE: stdin carries the events, so it cannot also answer dialogs.
        warn!("events read from stdin; confirmations will be declined (pass --yes to accept)");
        Arc::new(AutoPrompt { answer: false })
    } else {
        Arc::new(StdinPrompt)
    };

    let (sync, sync_task) = spawn_sync_worker(store.clone(), remote.clone(), config.sync_delay);
    let mut session = Session::start(store, remote, prompt, sync).await?;

    let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let reader = if from_stdin {
        tokio::spawn(forward_events(BufReader::new(tokio::io::stdin()), tx))
    } else {
        let path = PathBuf::from(&args.input);
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|source| CliError::Input { path, source })?;
        tokio::spawn(forward_events(BufReader::new(file), tx))
    };

    session.run(rx).await?;
    let forwarded = reader.await.unwrap_or_else(|e| {
        warn!(error = %e, "event reader task failed");
        0
    });

    info!(
        site_id = %session.site(),
        events = forwarded,
        state = ?session.submit_state(),
        rendered = session.surface().len(),
        "session finished"
    );
    drop(session);
    if let Err(e) = sync_task.await {
        warn!(error = %e, "sync worker task failed");
    }
    Ok(())
}

/// Parse one `MapEvent` per non-blank line and forward it. Malformed lines
/// are logged and skipped. Returns the number of events forwarded.
async fn forward_events<R>(reader: R, tx: mpsc::Sender<MapEvent>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    let mut line_no = 0usize;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "event input read failed; stopping");
                break;
            }
        };
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<MapEvent>(&line) {
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    break;
                }
                forwarded += 1;
            }
            Err(e) => warn!(line = line_no, error = %e, "malformed event skipped"),
        }
    }
    forwarded
}

async fn run_serve(port: u16) -> Result<(), CliError> {
    let app = routes::app(state::AppState::new());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!(%port, "polymark dev endpoint listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn run_show(args: &ShowArgs) -> Result<(), CliError> {
    let config = load_config(&args.overrides)?;
    let site = SiteId::from_page_url(&args.url)?;
    let storage = Arc::new(FileStorage::open(&config.storage_dir)?);
    let store = FeatureStore::new(storage, site);

    if args.summary {
        let merged = store.merged_view()?.unwrap_or_default();
        for feature in merged.iter() {
            println!(
                "{}\t{}\tperimeter={:.1}m",
                feature.id().map_or("-", |id| id.as_str()),
                feature.area_label().unwrap_or("-"),
                feature.geometry.length(),
            );
        }
        return Ok(());
    }

    let report = serde_json::json!({
        "site": store.site().as_str(),
        "keys": { "committed": store.keys().committed, "pending": store.keys().pending },
        "committed": store.committed()?,
        "pending": store.pending()?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

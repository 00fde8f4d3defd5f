use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use livedeck::binding::DocumentBinding;
use livedeck::client::{ClientError, SessionClient};
use livedeck::config::{ConfigError, EngineConfig};
use livedeck::drivers::{InsertRequest, SyncContext, TickReport};
use livedeck::engine::WidgetEngine;
use livedeck::error::WidgetError;
use livedeck::geometry::Size;
use livedeck::host::{DocumentHost, HostError};
use livedeck::kind::WidgetKind;
use livedeck::memory::MemoryDeck;
use livedeck::session::SessionSnapshot;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Widget(#[from] WidgetError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("no session; pass --session or run `connect` first")]
    MissingSession,
    #[error("deck has no page at index {0}")]
    PageOutOfRange(usize),
}

#[derive(Parser, Debug)]
#[command(name = "livedeck", about = "Keep live audience widgets in a deck file in sync with a session")]
struct Cli {
    #[arg(long, env = "LIVEDECK_DECK", default_value = "deck.json")]
    deck: PathBuf,

    /// Overrides `LIVEDECK_API_BASE_URL` and the deck's stored binding.
    #[arg(long)]
    api_base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty deck file.
    Init {
        #[arg(long, default_value_t = 3)]
        pages: usize,
        #[arg(long, default_value_t = 960.0)]
        width: f64,
        #[arg(long, default_value_t = 540.0)]
        height: f64,
    },
    /// Bind the whole deck to a session, by id or join code.
    Connect {
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        code: Option<String>,
    },
    /// Insert a widget on a page (the selected page by default).
    Insert {
        kind: WidgetKind,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        code: Option<String>,
        /// Style overrides as a JSON object.
        #[arg(long)]
        style: Option<String>,
    },
    /// Point a widget at a session and optionally a prompt, poll or cloud.
    Bind {
        kind: WidgetKind,
        session: String,
        #[arg(long)]
        resource: Option<String>,
        #[arg(long)]
        page: Option<usize>,
    },
    /// Fetch one snapshot and reconcile every widget.
    Sync {
        #[arg(long)]
        session: Option<String>,
    },
    /// Reconcile on every push event, polling as a fallback.
    Watch {
        #[arg(long)]
        session: Option<String>,
    },
    /// Print the deck as JSON.
    Show,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env()?;

    match cli.command {
        Command::Init { pages, width, height } => run_init(&cli.deck, pages, Size::new(width, height)),
        Command::Show => run_show(&cli.deck),
        Command::Connect { session, code } => {
            let config = resolve_config(config, cli.api_base_url.as_deref(), None)?;
            run_connect(&cli.deck, &config, session, code).await
        }
        Command::Insert { kind, page, session, code, style } => {
            let style = style.as_deref().map(serde_json::from_str::<Value>).transpose()?;
            let engine = open_engine(&cli.deck, &config, page)?;
            let binding = engine.document_binding().await;
            let session = session.or_else(|| binding.as_ref().map(|b| b.session_id.clone()));
            let code = code.or_else(|| binding.and_then(|b| b.code));
            let request = InsertRequest {
                session_id: session.as_deref(),
                code: code.as_deref(),
                style: style.as_ref(),
            };
            let page = engine.insert_widget(kind, request).await?;
            save(&engine, &cli.deck).await?;
            println!("{kind} inserted on {page}");
            Ok(())
        }
        Command::Bind { kind, session, resource, page } => {
            let engine = open_engine(&cli.deck, &config, page)?;
            let page = engine.set_binding(kind, &session, resource.as_deref()).await?;
            save(&engine, &cli.deck).await?;
            println!("{kind} on {page} bound to {session}");
            Ok(())
        }
        Command::Sync { session } => {
            let engine = open_engine(&cli.deck, &config, None)?;
            let (session_id, config) = session_and_config(&engine, config, cli.api_base_url.as_deref(), session).await?;
            let client = SessionClient::new(&config)?;
            let snapshot = client.fetch_snapshot(&session_id).await?;
            let report = tick(&engine, &cli.deck, &session_id, &snapshot).await?;
            println!("updated {} page(s), {} failed", report.updated(), report.failed());
            Ok(())
        }
        Command::Watch { session } => {
            let engine = open_engine(&cli.deck, &config, None)?;
            let (session_id, config) = session_and_config(&engine, config, cli.api_base_url.as_deref(), session).await?;
            run_watch(&engine, &cli.deck, &config, session_id).await
        }
    }
}

// =============================================================================
// DECK FILE
// =============================================================================

fn run_init(path: &Path, pages: usize, size: Size) -> Result<(), CliError> {
    MemoryDeck::with_pages(size, pages).save(path)?;
    println!("created {} with {pages} page(s)", path.display());
    Ok(())
}

fn run_show(path: &Path) -> Result<(), CliError> {
    let deck = MemoryDeck::load(path)?;
    println!("{}", serde_json::to_string_pretty(&deck)?);
    Ok(())
}

fn open_engine(path: &Path, config: &EngineConfig, page: Option<usize>) -> Result<WidgetEngine<MemoryDeck>, CliError> {
    let mut deck = MemoryDeck::load(path)?;
    if let Some(index) = page {
        let id = deck.pages().get(index).cloned().ok_or(CliError::PageOutOfRange(index))?;
        deck.select_page(&id);
    }
    Ok(WidgetEngine::new(deck, config))
}

async fn save(engine: &WidgetEngine<MemoryDeck>, path: &Path) -> Result<(), CliError> {
    engine.with_host(|deck| deck.save(path)).await?;
    Ok(())
}

// =============================================================================
// SESSION
// =============================================================================

fn resolve_config(config: EngineConfig, flag: Option<&str>, stored: Option<&str>) -> Result<EngineConfig, CliError> {
    match flag.or(stored) {
        Some(url) => Ok(config.with_api_base_url(url)?),
        None => Ok(config),
    }
}

/// Session from the flag, else from the deck binding. The deck's stored API
/// base is used unless `--api-base-url` is given.
async fn session_and_config(
    engine: &WidgetEngine<MemoryDeck>,
    config: EngineConfig,
    api_flag: Option<&str>,
    session: Option<String>,
) -> Result<(String, EngineConfig), CliError> {
    let binding = engine.document_binding().await;
    let stored_api = binding.as_ref().and_then(|b| b.api_base_url.as_deref());
    let config = resolve_config(config, api_flag, stored_api)?;
    let session_id = session.or_else(|| binding.map(|b| b.session_id)).ok_or(CliError::MissingSession)?;
    Ok((session_id, config))
}

async fn run_connect(
    path: &Path,
    config: &EngineConfig,
    session: Option<String>,
    code: Option<String>,
) -> Result<(), CliError> {
    let client = SessionClient::new(config)?;
    let (session_id, code) = match (session, code) {
        (Some(session_id), code) => (session_id, code),
        (None, Some(code)) => {
            let session = client.session_by_code(&code).await?;
            (session.id, Some(session.code))
        }
        (None, None) => return Err(CliError::MissingSession),
    };

    let engine = open_engine(path, config, None)?;
    let binding = DocumentBinding::new(session_id, code, Some(config.api_base_url.clone()));
    engine.set_document_binding(&binding).await?;
    save(&engine, path).await?;
    info!(session_id = %binding.session_id, code = ?binding.code, "deck connected");
    println!("deck bound to session {}", binding.session_id);
    Ok(())
}

// =============================================================================
// RECONCILE
// =============================================================================

async fn tick(
    engine: &WidgetEngine<MemoryDeck>,
    path: &Path,
    session_id: &str,
    snapshot: &SessionSnapshot,
) -> Result<TickReport, CliError> {
    let code = Some(snapshot.session.code.as_str()).filter(|c| !c.is_empty());
    let report = engine.sync_all(&SyncContext { session_id, code, snapshot }).await;
    save(engine, path).await?;
    info!(session_id, updated = report.updated(), failed = report.failed(), "tick complete");
    Ok(report)
}

/// Push events fold into a watched snapshot; the poll ticker refetches it.
/// Bursts coalesce because only the newest snapshot is ever read.
async fn run_watch(
    engine: &WidgetEngine<MemoryDeck>,
    path: &Path,
    config: &EngineConfig,
    session_id: String,
) -> Result<(), CliError> {
    let client = Arc::new(SessionClient::new(config)?);
    let initial = client.fetch_snapshot(&session_id).await?;
    let (tx, mut rx) = watch::channel(initial);
    let push = tokio::spawn(push_loop(Arc::clone(&client), session_id.clone(), tx.clone()));

    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(session_id, poll_interval = ?config.poll_interval, "watching");
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                match client.fetch_snapshot(&session_id).await {
                    Ok(snapshot) => {
                        tx.send_replace(snapshot);
                    }
                    Err(err) => {
                        warn!(session_id, error = %err, "snapshot poll failed");
                        continue;
                    }
                }
            }
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        }
        let snapshot = rx.borrow_and_update().clone();
        if let Err(err) = tick(engine, path, &session_id, &snapshot).await {
            warn!(session_id, error = %err, "tick failed");
        }
    }

    push.abort();
    Ok(())
}

async fn push_loop(client: Arc<SessionClient>, session_id: String, tx: watch::Sender<SessionSnapshot>) {
    let mut attempt: u32 = 0;
    loop {
        match client.connect_events(&session_id).await {
            Ok(mut events) => {
                attempt = 0;
                info!(session_id, "push channel open");
                loop {
                    match events.next_event().await {
                        Ok(event) => {
                            tx.send_if_modified(|snapshot| snapshot.apply_event(&event));
                        }
                        Err(err) => {
                            warn!(session_id, error = %err, "push channel lost");
                            break;
                        }
                    }
                }
            }
            Err(err) => warn!(session_id, attempt, error = %err, "push connect failed"),
        }
        if tx.is_closed() {
            return;
        }
        let delay = client.reconnect_delay(attempt);
        attempt = attempt.saturating_add(1);
        tokio::time::sleep(delay).await;
    }
}

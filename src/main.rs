//! A virtualized, sortable file-search result list for the terminal.
//!
//! The directory given on the command line is indexed in the background;
//! typing filters it, and only the rows on screen have their metadata
//! loaded.  Run with `--save-config` to write the effective configuration.

mod app;
mod config;
mod core;
mod ui;

use std::fs::File;
use std::io::{self, stderr, Stderr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::app::{
    backend::{Backend, BackendEvent, IndexOptions},
    event::{spawn_event_reader, AppEvent},
    handler,
    state::AppState,
};
use crate::config::AppConfig;
use crate::core::{loader::LoaderUpdate, sort::SortUpdate};

// ───────────────────────────────────────── CLI ───────────────

#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"), about = "Search a directory tree in a virtualized result list")]
struct Cli {
    /// Directory to index (defaults to `.`).
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Initial search query.
    #[arg(long, short)]
    query: Option<String>,

    /// Include hidden (dot) files.
    #[arg(long)]
    hidden: bool,

    /// Index files that `.gitignore` would exclude.
    #[arg(long = "no-ignore")]
    no_ignore: bool,

    /// Rows loaded above and below the viewport.
    #[arg(long)]
    overscan: Option<usize>,

    /// Disable sorting above this many results.
    #[arg(long = "sort-threshold")]
    sort_threshold: Option<usize>,

    /// Write logs to this file instead of stderr.
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Write the effective configuration to the config file and exit.
    #[arg(long = "save-config")]
    save_config: bool,
}

fn init_tracing(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr) // never pollute stdout
                .init();
        }
    }
    Ok(())
}

/// Forward SIGUSR1 to the loop as a request to focus the search input.
#[cfg(unix)]
fn spawn_quick_activate(tx: UnboundedSender<BackendEvent>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut usr1 = signal(SignalKind::user_defined1()).context("installing SIGUSR1 handler")?;
    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            if tx.send(BackendEvent::QuickActivate).is_err() {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_quick_activate(_tx: UnboundedSender<BackendEvent>) -> Result<()> {
    Ok(())
}

// ───────────────────────────────────────── main ─────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_ref())?;

    let mut config = AppConfig::load();
    if let Some(overscan) = cli.overscan {
        config.view.overscan = overscan;
    }
    if let Some(threshold) = cli.sort_threshold {
        config.view.sort_threshold = threshold;
    }

    if cli.save_config {
        let path = config.save()?;
        println!("{}", path.display());
        return Ok(());
    }

    let root = cli
        .path
        .canonicalize()
        .with_context(|| format!("opening {}", cli.path.display()))?;
    info!(root = %root.display(), "starting");

    // ── async channels ────────────────────────────────────────
    let (loader_tx, loader_rx) = mpsc::unbounded_channel::<LoaderUpdate>();
    let (sort_tx, sort_rx) = mpsc::unbounded_channel::<SortUpdate>();
    let (backend_tx, backend_rx) = mpsc::unbounded_channel::<BackendEvent>();

    let backend = Backend::new(
        IndexOptions {
            root: root.clone(),
            show_hidden: cli.hidden,
            respect_gitignore: !cli.no_ignore,
        },
        config.view.stream_chunk,
        backend_tx.clone(),
    );
    let mut state = AppState::new(root, config, backend.source(), loader_tx, sort_tx);
    if let Some(query) = cli.query {
        state.query = query;
        state.request_search();
    }
    spawn_quick_activate(backend_tx)?;
    backend.spawn_indexer(false);

    // ── terminal setup ────────────────────────────────────────
    enable_raw_mode()?;
    let mut stderr_handle = stderr();
    execute!(
        stderr_handle,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stderr()))?;

    let channels = Channels {
        events: spawn_event_reader(Duration::from_millis(100)),
        loader: loader_rx,
        sort: sort_rx,
        backend: backend_rx,
    };
    let outcome = run(&mut terminal, &mut state, &backend, channels).await;

    // ── teardown ──────────────────────────────────────────────
    // Restore the terminal even when the loop failed.
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    outcome
}

struct Channels {
    events: UnboundedReceiver<AppEvent>,
    loader: UnboundedReceiver<LoaderUpdate>,
    sort: UnboundedReceiver<SortUpdate>,
    backend: UnboundedReceiver<BackendEvent>,
}

// ───────────────────────────────────────── event loop ───────

async fn run(
    terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    state: &mut AppState,
    backend: &Backend,
    mut channels: Channels,
) -> Result<()> {
    loop {
        // ── draw first ─────────────────────────────────────────
        // Rows whose metadata hasn't arrived render as placeholders and
        // fill in on a later frame.
        terminal.draw(|frame| {
            ui::sync_layout(state, frame.area());
            ui::draw(frame, state);
        })?;

        // ── kick off background work AFTER draw ────────────────
        if std::mem::take(&mut state.needs_rescan) {
            backend.spawn_indexer(true);
        }
        if let Some(search) = state.next_search() {
            debug!(search_id = search.search_id, query = %search.query, "search");
            backend.spawn_search(search.search_id, search.query, search.entries);
        }

        tokio::select! {
            biased;

            Some(event) = channels.events.recv() => {
                match event {
                    AppEvent::Key(k) => handler::handle_key(state, k),
                    AppEvent::Mouse(m) => handler::handle_mouse(state, m),
                    AppEvent::Paste(text) => handler::handle_paste(state, &text),
                    AppEvent::Resize => {}
                    AppEvent::Tick => state.tick = state.tick.wrapping_add(1),
                }
            }

            Some(event) = channels.backend.recv() => {
                apply_backend_event(state, backend, event);
                while let Ok(event) = channels.backend.try_recv() {
                    apply_backend_event(state, backend, event);
                }
            }

            Some(update) = channels.loader.recv() => {
                // Batch-drain so a burst of completions costs one redraw.
                state.on_loader_update(update);
                while let Ok(update) = channels.loader.try_recv() {
                    state.on_loader_update(update);
                }
            }

            Some(update) = channels.sort.recv() => {
                state.on_sort_update(update);
            }
        }

        if state.should_quit {
            return Ok(());
        }
    }
}

fn apply_backend_event(state: &mut AppState, backend: &Backend, event: BackendEvent) {
    // The metadata source must switch to the new index in the same step
    // that the screen drops rows pointing into the old one.
    if let BackendEvent::Indexed { entries } = &event {
        backend.install(Arc::clone(entries));
    }
    state.on_backend_event(event);
}

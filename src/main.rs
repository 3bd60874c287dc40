mod app;
mod components;
mod config;
mod error;
mod event;
mod fs;
mod handler;
mod prefs;
mod render;
mod scheduler;
mod sync;
mod theme;
mod tui;
mod ui;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::{AppConfig, PersistenceConfig, WatcherConfig};
use crate::event::{Event, EventHandler};
use crate::fs::watcher::{FsWatcher, WatchBackend};
use crate::prefs::PreferenceStore;
use crate::render::SyntectRenderer;
use crate::theme::EnvProbe;
use crate::tui::{install_panic_hook, Tui};

/// A terminal markdown browser.
#[derive(Parser, Debug)]
#[command(name = "mdb", version, about)]
struct Cli {
    /// Markdown file or folder to open after restoring the last session
    path: Option<PathBuf>,

    /// Settings file to load on top of the usual locations
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preference document to read and write instead of the default
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Log file (defaults to the platform data directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Disable filesystem watcher (auto-refresh)
    #[arg(long)]
    no_watcher: bool,
}

impl Cli {
    /// Settings implied by command-line flags.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            watcher: WatcherConfig {
                enabled: self.no_watcher.then_some(false),
                ..WatcherConfig::default()
            },
            persistence: PersistenceConfig {
                prefs_path: self.prefs.clone(),
                ..PersistenceConfig::default()
            },
            ..AppConfig::default()
        }
    }
}

fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("mdbrowse")
        .join("mdbrowse.log")
}

/// Log to a file; the terminal belongs to the UI. `MDB_LOG` sets the filter.
fn init_tracing(log_path: &Path) -> error::Result<()> {
    use std::fs::File;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::options().create(true).append(true).open(log_path)?;
    let writer = tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::sync::Mutex::new(file));

    let filter = EnvFilter::try_from_env("MDB_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .with(filter)
        .try_init()
        .map_err(|e| error::AppError::Terminal(format!("logging: {e}")))?;
    Ok(())
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();

    let log_path = cli.log_file.clone().unwrap_or_else(default_log_path);
    if let Err(e) = init_tracing(&log_path) {
        eprintln!("mdb: logging disabled: {e}");
    }

    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));
    let prefs = PreferenceStore::load(config.prefs_path());
    tracing::info!(prefs = %prefs.path().display(), "starting");

    install_panic_hook();

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(50));

    let backend: Option<Box<dyn WatchBackend>> = if config.watcher_enabled() {
        match FsWatcher::new(events.sender()) {
            Ok(watcher) => Some(Box::new(watcher)),
            Err(e) => {
                tracing::warn!("watcher unavailable: {e}");
                None
            }
        }
    } else {
        None
    };
    let watcher_failed = config.watcher_enabled() && backend.is_none();

    let mut app = App::new(
        config,
        prefs,
        backend,
        Box::new(SyntectRenderer::new()),
        Box::new(EnvProbe),
        Instant::now(),
    );
    app.terminal_size = tui.size()?;
    app.restore_session(cli.path.as_deref(), Instant::now());
    if watcher_failed {
        app.set_status_message("Watcher unavailable; press F5 to refresh".into());
    }

    let outcome = run(&mut tui, &mut events, &mut app).await;
    let outcome = close_session(&mut app, outcome);
    let restored = tui.restore();
    outcome.and(restored)
}

async fn run(tui: &mut Tui, events: &mut EventHandler, app: &mut App) -> error::Result<()> {
    while !app.should_quit {
        tui.terminal_mut().draw(|frame| {
            ui::render(app, frame);
        })?;

        let now = Instant::now();
        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(app, key, now),
            Event::Tick => {}
            Event::Resize(width, height) => app.on_resize(width, height, now),
            Event::FsChange(paths) => app.handle_fs_change(&paths, now),
        }
        app.tick(Instant::now());
    }
    Ok(())
}

/// Flush deferred work however the event loop ended.
fn close_session(app: &mut App, outcome: error::Result<()>) -> error::Result<()> {
    if let Err(e) = &outcome {
        tracing::error!("event loop stopped: {e}");
    }
    app.shutdown();
    outcome
}

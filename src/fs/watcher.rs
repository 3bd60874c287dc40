use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::Watcher;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::event::Event;

/// Default patterns to ignore when watching the filesystem.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    "target",
];

/// How long the OS backend coalesces raw notifications before forwarding.
/// Kept short; the real refresh debounce happens in the scheduler.
pub const BACKEND_COALESCE_MS: u64 = 50;

/// Something that can register individual directories for change
/// notifications. Each directory is watched on its own, never recursively.
pub trait WatchBackend {
    fn watch(&mut self, dir: &Path) -> Result<()>;
    fn unwatch(&mut self, dir: &Path);
}

/// notify-backed watcher that forwards changes to the event channel.
pub struct FsWatcher {
    debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

impl FsWatcher {
    /// Create a watcher with nothing registered yet.
    ///
    /// Changed paths are sent as [`Event::FsChange`] via `event_tx`. Ignore
    /// patterns are applied by the receiver, relative to the bound root.
    pub fn new(event_tx: mpsc::UnboundedSender<Event>) -> Result<Self> {
        let debouncer = new_debouncer(
            Duration::from_millis(BACKEND_COALESCE_MS),
            move |result: std::result::Result<Vec<DebouncedEvent>, notify::Error>| {
                match result {
                    Ok(events) => {
                        let paths: Vec<PathBuf> = events
                            .iter()
                            .filter(|e| e.kind == DebouncedEventKind::Any)
                            .map(|e| e.path.clone())
                            .collect();

                        if paths.is_empty() {
                            return;
                        }
                        let _ = event_tx.send(Event::FsChange(paths));
                    }
                    Err(e) => {
                        tracing::warn!("watcher error: {e}");
                    }
                }
            },
        )?;

        Ok(Self { debouncer })
    }
}

impl WatchBackend for FsWatcher {
    fn watch(&mut self, dir: &Path) -> Result<()> {
        self.debouncer
            .watcher()
            .watch(dir, notify::RecursiveMode::NonRecursive)?;
        Ok(())
    }

    fn unwatch(&mut self, dir: &Path) {
        if let Err(e) = self.debouncer.watcher().unwatch(dir) {
            tracing::debug!(dir = %dir.display(), "unwatch failed: {e}");
        }
    }
}

/// Check if a path should be ignored based on ignore patterns.
///
/// A path is ignored if any of its components match any ignore pattern
/// exactly. Pass paths relative to the watched root so the root's own
/// location never counts.
pub fn should_ignore(path: &Path, patterns: &[String]) -> bool {
    path.components().any(|component| match component {
        std::path::Component::Normal(name) => {
            let name = name.to_string_lossy();
            patterns.iter().any(|pattern| name == *pattern)
        }
        _ => false,
    })
}

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::fs::path_key::{self, normalize_path};
use crate::fs::tree::{NodeType, TreeFilter};
use crate::fs::watcher::WatchBackend;
use crate::prefs::{Mark, PreferenceStore, ThemeMode};
use crate::render::{RenderParams, RenderedDocument, Renderer};
use crate::scheduler::{Action, Channel, Scheduler};
use crate::sync::{selected_is_dir, SyncOptions, TreeSync};
use crate::theme::{ThemeCache, ThemeColors, ThemeKind, ThemeProbe};

/// Seconds a status message stays visible.
pub const STATUS_TTL_SECS: u64 = 3;
/// Columns added or removed per splitter key press.
pub const SPLITTER_STEP: u16 = 2;
/// Narrowest tree pane, unless a third of the screen is narrower still.
pub const MIN_TREE_WIDTH: u16 = 12;

/// The kind of dialog being displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogKind {
    CreateFile { parent: PathBuf },
    CreateDirectory { parent: PathBuf },
    Rename { original: PathBuf },
    DeleteConfirm { target: PathBuf },
    OpenFile,
    OpenFolder,
    Error { message: String },
}

/// Application mode.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum AppMode {
    #[default]
    Normal,
    Dialog(DialogKind),
    /// Recent files popup with the highlighted entry.
    RecentFiles { selected: usize },
    Help { scroll_offset: usize },
}

/// Which pane receives navigation keys.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Tree,
    Preview,
}

/// State for a dialog's text input.
#[derive(Debug, Default)]
pub struct DialogState {
    pub input: String,
    /// Byte offset of the cursor in `input`.
    pub cursor_position: usize,
}

/// The document shown in the preview pane.
#[derive(Debug, Default)]
pub struct PreviewState {
    pub path: Option<PathBuf>,
    /// Markdown source, kept for re-rendering on theme changes.
    pub(crate) source: String,
    pub document: RenderedDocument,
    pub scroll_offset: usize,
    /// Rows available for content in the last frame.
    pub viewport_height: usize,
}

impl PreviewState {
    fn max_offset(&self) -> usize {
        self.document.line_count().saturating_sub(1)
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let target = self.scroll_offset.saturating_add_signed(delta);
        self.scroll_offset = target.min(self.max_offset());
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self
            .document
            .line_count()
            .saturating_sub(self.viewport_height.max(1));
    }

    fn page(&self) -> isize {
        self.viewport_height.saturating_sub(1).max(1) as isize
    }

    pub fn page_down(&mut self) {
        self.scroll_by(self.page());
    }

    pub fn page_up(&mut self) {
        self.scroll_by(-self.page());
    }
}

/// Main application state.
pub struct App {
    pub config: AppConfig,
    pub prefs: PreferenceStore,
    pub sync: TreeSync,
    pub scheduler: Scheduler,
    theme_cache: ThemeCache,
    renderer: Box<dyn Renderer>,
    pub theme_kind: ThemeKind,
    pub theme: ThemeColors,
    pub preview: PreviewState,
    pub focus: Focus,
    pub mode: AppMode,
    pub dialog_state: DialogState,
    pub status_message: Option<(String, Instant)>,
    pub should_quit: bool,
    /// Terminal size in columns and rows.
    pub terminal_size: (u16, u16),
    /// Tree pane width as requested; the layout clamps it.
    pub tree_width: u16,
}

/// Synchronizer tuning derived from the settings file.
pub fn sync_options(config: &AppConfig) -> SyncOptions {
    SyncOptions {
        watch_depth: config.watch_depth(),
        refresh_delay: config.refresh_delay(),
        restore_delay: config.restore_delay(),
        ignore: config.ignore_patterns(),
        filter: TreeFilter::new(&config.extensions()),
        show_hidden: config.show_hidden(),
    }
}

/// Width of the tree pane for a `requested` width on a `total` wide screen.
/// Never more than a third of the screen.
pub fn effective_tree_width(requested: u16, total: u16) -> u16 {
    let max = total / 3;
    requested.clamp(MIN_TREE_WIDTH.min(max), max)
}

/// Interpret user input as a path, expanding a leading `~`.
fn input_path(input: &str) -> PathBuf {
    let input = input.trim();
    if input == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(input)
}

impl App {
    pub fn new(
        config: AppConfig,
        prefs: PreferenceStore,
        backend: Option<Box<dyn WatchBackend>>,
        renderer: Box<dyn Renderer>,
        probe: Box<dyn ThemeProbe>,
        now: Instant,
    ) -> Self {
        let sync = TreeSync::new(sync_options(&config), backend);
        let mut theme_cache = ThemeCache::new(probe, config.probe_ttl());
        let theme_kind = theme_cache.resolve(prefs.theme(), now);
        let tree_width = u16::try_from(prefs.splitter_position().max(0)).unwrap_or(u16::MAX);
        Self {
            config,
            prefs,
            sync,
            scheduler: Scheduler::new(),
            theme_cache,
            renderer,
            theme_kind,
            theme: ThemeColors::for_kind(theme_kind),
            preview: PreviewState::default(),
            focus: Focus::Tree,
            mode: AppMode::Normal,
            dialog_state: DialogState::default(),
            status_message: None,
            should_quit: false,
            terminal_size: (0, 0),
            tree_width,
        }
    }

    // ── Session ──────────────────────────────────────────────────────────────

    /// Bring back the previous session, then open `cli_path` if given.
    pub fn restore_session(&mut self, cli_path: Option<&Path>, now: Instant) {
        let last_dir = self.prefs.last_dir().filter(|d| Path::new(d).is_dir());
        let dir = last_dir.or_else(|| self.prefs.recent_dirs().into_iter().next());
        if let Some(dir) = dir {
            self.sync
                .set_root(Path::new(&dir), &mut self.prefs, &mut self.scheduler, now);
        }

        if let Some(file) = self.prefs.last_file().filter(|f| Path::new(f).is_file()) {
            if let Err(e) = self.open_file_path(Path::new(&file), now) {
                tracing::warn!(file, "could not reopen last file: {e}");
            }
        }

        if let Some(path) = cli_path {
            if path.is_dir() {
                self.open_folder(path, now);
            } else if let Err(e) = self.open_file_path(path, now) {
                self.show_error(e);
            }
        }
        tracing::info!(root = ?self.sync.root_key(), file = ?self.preview.path, "session restored");
    }

    /// Run everything still scheduled, store view state and release
    /// watches.
    pub fn shutdown(&mut self) {
        for action in self.scheduler.drain() {
            self.run_action(action);
        }
        self.remember_scroll();
        self.sync.capture(&mut self.prefs);
        self.prefs.save_if_dirty();
        self.sync.shutdown();
        tracing::info!("shutdown complete");
    }

    // ── Deferred work ────────────────────────────────────────────────────────

    /// Called on every loop iteration.
    pub fn tick(&mut self, now: Instant) {
        for action in self.scheduler.take_ready(now) {
            self.run_action(action);
        }
        self.clear_expired_status(now);
        if self.prefs.theme() == ThemeMode::Auto {
            let kind = self.theme_cache.resolve(ThemeMode::Auto, now);
            if kind != self.theme_kind {
                tracing::info!(theme = kind.as_str(), "terminal theme changed");
                self.apply_theme_kind(kind);
            }
        }
    }

    fn run_action(&mut self, action: Action) {
        tracing::debug!(?action, "running deferred action");
        match action {
            Action::SaveWindowGeometry { width, height } => {
                let window = self.prefs.window();
                self.prefs.set_window_config(
                    window.x,
                    window.y,
                    i64::from(width),
                    i64::from(height),
                    window.maximized,
                );
                self.prefs.save_if_dirty();
            }
            Action::SaveSplitter { position } => {
                self.prefs.set_splitter_position(i64::from(position));
                self.prefs.save_if_dirty();
            }
            Action::RefreshTree => self.sync.refresh(&mut self.prefs, &mut self.scheduler),
            Action::RestoreExpansion { root } => {
                self.sync.apply_restore(&root);
            }
        }
    }

    /// Paths reported by the watcher.
    pub fn handle_fs_change(&mut self, paths: &[PathBuf], now: Instant) {
        self.sync.handle_fs_change(paths, &mut self.scheduler, now);
    }

    /// Terminal resized. The new size is persisted once resizing settles.
    pub fn on_resize(&mut self, width: u16, height: u16, now: Instant) {
        self.terminal_size = (width, height);
        self.scheduler.schedule(
            Channel::WindowGeometry,
            self.config.geometry_delay(),
            Action::SaveWindowGeometry { width, height },
            now,
        );
    }

    // ── Layout ───────────────────────────────────────────────────────────────

    pub fn tree_pane_width(&self, total: u16) -> u16 {
        effective_tree_width(self.tree_width, total)
    }

    pub fn widen_tree(&mut self, now: Instant) {
        let current = self.tree_pane_width(self.terminal_size.0);
        self.resize_tree(current.saturating_add(SPLITTER_STEP), now);
    }

    pub fn narrow_tree(&mut self, now: Instant) {
        let current = self.tree_pane_width(self.terminal_size.0);
        self.resize_tree(current.saturating_sub(SPLITTER_STEP).max(1), now);
    }

    fn resize_tree(&mut self, requested: u16, now: Instant) {
        self.tree_width = requested;
        self.scheduler.schedule(
            Channel::Splitter,
            self.config.splitter_delay(),
            Action::SaveSplitter { position: requested },
            now,
        );
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tree => Focus::Preview,
            Focus::Preview => Focus::Tree,
        };
    }

    // ── Opening things ───────────────────────────────────────────────────────

    /// Bind the tree to `path` and record it as the most recent folder.
    pub fn open_folder(&mut self, path: &Path, now: Instant) -> bool {
        if !self
            .sync
            .set_root(path, &mut self.prefs, &mut self.scheduler, now)
        {
            self.set_status_message(format!("Not a folder: {}", path.display()));
            return false;
        }
        let key = normalize_path(path);
        self.prefs.add_recent_dir(&key, self.config.recent_max());
        self.prefs.set_last_dir(&key);
        self.prefs.save();
        true
    }

    /// Show `path` in the preview, rebinding the tree if the file lives
    /// outside the current root.
    pub fn open_file_path(&mut self, path: &Path, now: Instant) -> Result<()> {
        if !path.is_file() {
            return Err(AppError::NotFound(path.to_path_buf()));
        }
        let source = fs::read_to_string(path)?;
        let key = normalize_path(path);
        let file = PathBuf::from(&key);

        self.remember_scroll();
        let recent_max = self.config.recent_max();
        self.prefs.add_recent_file(&key, recent_max);
        self.prefs.set_last_file(&key);

        if !self.sync.contains(&file) {
            if let Some(parent) = file.parent() {
                if self
                    .sync
                    .set_root(parent, &mut self.prefs, &mut self.scheduler, now)
                {
                    let parent_key = normalize_path(parent);
                    self.prefs.add_recent_dir(&parent_key, recent_max);
                    self.prefs.set_last_dir(&parent_key);
                }
            }
        }
        self.prefs.save();
        self.sync.reveal(&file);

        self.preview.source = source;
        self.preview.path = Some(file);
        self.render_preview();
        let saved = usize::try_from(self.prefs.scroll_position(&key)).unwrap_or(usize::MAX);
        self.preview.scroll_offset = saved.min(self.preview.max_offset());
        tracing::info!(file = %key, lines = self.preview.document.line_count(), "opened");
        Ok(())
    }

    /// Open the selected file, or expand/collapse the selected directory.
    pub fn activate_selected(&mut self, now: Instant) {
        let Some((path, node_type, expanded)) = self
            .sync
            .tree()
            .and_then(|t| t.selected())
            .map(|item| (item.path.clone(), item.node_type, item.is_expanded))
        else {
            return;
        };
        match node_type {
            NodeType::Directory if expanded => self.sync.collapse_selected(),
            NodeType::Directory => self.sync.expand_selected(),
            NodeType::File => {
                if let Err(e) = self.open_file_path(&path, now) {
                    self.show_error(e);
                }
            }
        }
    }

    /// Store the current document's scroll offset. A zero offset is never
    /// written.
    fn remember_scroll(&mut self) {
        let Some(path) = &self.preview.path else {
            return;
        };
        let offset = self.preview.scroll_offset as u64;
        if offset > 0 {
            self.prefs.set_scroll_position(&normalize_path(path), offset);
        }
    }

    fn render_preview(&mut self) {
        if self.preview.path.is_none() {
            return;
        }
        let params = RenderParams::from_prefs(&self.prefs, self.theme_kind);
        self.preview.document = self.renderer.render(&self.preview.source, &params);
        self.preview.scroll_offset = self.preview.scroll_offset.min(self.preview.max_offset());
    }

    // ── Theme ────────────────────────────────────────────────────────────────

    pub fn set_theme(&mut self, mode: ThemeMode, now: Instant) {
        self.prefs.set_theme(mode);
        self.prefs.save();
        self.theme_cache.invalidate();
        let kind = self.theme_cache.resolve(mode, now);
        self.apply_theme_kind(kind);
    }

    pub fn cycle_theme(&mut self, now: Instant) {
        let mode = self.prefs.theme().next();
        self.set_theme(mode, now);
        self.set_status_message(format!("Theme: {mode}"));
    }

    fn apply_theme_kind(&mut self, kind: ThemeKind) {
        self.theme_kind = kind;
        self.theme = ThemeColors::for_kind(kind);
        self.render_preview();
    }

    // ── Marks ────────────────────────────────────────────────────────────────

    /// Set `mark` on the selected file, or clear it if it already has that
    /// mark. `None` always clears.
    pub fn toggle_mark(&mut self, mark: Option<Mark>) {
        let Some(item) = self.sync.tree().and_then(|t| t.selected()) else {
            return;
        };
        if item.node_type != NodeType::File {
            self.set_status_message("Only files can be marked".into());
            return;
        }
        let key = normalize_path(&item.path);
        let mut marks = self.prefs.marks();
        let next = match (marks.get(&key), mark) {
            (Some(current), Some(wanted)) if current == wanted => None,
            (_, wanted) => wanted,
        };
        marks.set(&key, next);
        self.prefs.save();
    }

    /// Marks of the given paths, for rendering.
    pub fn marks_for(&mut self, paths: &[PathBuf]) -> Vec<Option<Mark>> {
        let mut marks = self.prefs.marks();
        paths
            .iter()
            .map(|p| marks.get(&normalize_path(p)))
            .collect()
    }

    // ── Recent files ─────────────────────────────────────────────────────────

    pub fn show_recent_files(&mut self) {
        if self.prefs.recent_files().is_empty() {
            self.set_status_message("No recent files".into());
            return;
        }
        self.mode = AppMode::RecentFiles { selected: 0 };
    }

    pub fn recent_select_next(&mut self) {
        let len = self.prefs.recent_files().len();
        if let AppMode::RecentFiles { selected } = &mut self.mode {
            if *selected + 1 < len {
                *selected += 1;
            }
        }
    }

    pub fn recent_select_previous(&mut self) {
        if let AppMode::RecentFiles { selected } = &mut self.mode {
            *selected = selected.saturating_sub(1);
        }
    }

    pub fn open_selected_recent(&mut self, now: Instant) {
        let AppMode::RecentFiles { selected } = self.mode else {
            return;
        };
        self.mode = AppMode::Normal;
        let Some(file) = self.prefs.recent_files().into_iter().nth(selected) else {
            return;
        };
        if let Err(e) = self.open_file_path(Path::new(&file), now) {
            self.show_error(e);
        }
    }

    // ── Help ─────────────────────────────────────────────────────────────────

    pub fn toggle_help(&mut self) {
        self.mode = match self.mode {
            AppMode::Help { .. } => AppMode::Normal,
            _ => AppMode::Help { scroll_offset: 0 },
        };
    }

    pub fn scroll_help(&mut self, delta: isize, total_lines: usize) {
        if let AppMode::Help { scroll_offset } = &mut self.mode {
            *scroll_offset = scroll_offset
                .saturating_add_signed(delta)
                .min(total_lines.saturating_sub(1));
        }
    }

    /// Reload the tree from disk now.
    pub fn refresh_tree(&mut self) {
        if !self.sync.is_bound() {
            return;
        }
        self.scheduler.cancel(Channel::DirectoryRefresh);
        self.sync.refresh(&mut self.prefs, &mut self.scheduler);
        self.set_status_message("Tree refreshed".into());
    }

    // ── Dialogs ──────────────────────────────────────────────────────────────

    /// Open a dialog of the given kind.
    pub fn open_dialog(&mut self, kind: DialogKind) {
        self.dialog_state = DialogState::default();
        let prefill = match &kind {
            DialogKind::Rename { original } => original
                .file_name()
                .map(|name| name.to_string_lossy().to_string()),
            DialogKind::OpenFile | DialogKind::OpenFolder => self
                .sync
                .root_path()
                .map(|root| format!("{}/", root.display())),
            _ => None,
        };
        if let Some(text) = prefill {
            self.dialog_state.cursor_position = text.len();
            self.dialog_state.input = text;
        }
        self.mode = AppMode::Dialog(kind);
    }

    /// Close the current dialog and return to normal mode.
    pub fn close_dialog(&mut self) {
        self.mode = AppMode::Normal;
        self.dialog_state = DialogState::default();
    }

    pub fn show_error(&mut self, err: AppError) {
        tracing::warn!("{err}");
        self.open_dialog(DialogKind::Error {
            message: err.to_string(),
        });
    }

    /// Directory that new entries go into: the selected directory, or the
    /// parent of the selected file.
    pub fn current_dir(&self) -> Option<PathBuf> {
        let tree = self.sync.tree()?;
        let item = tree.selected();
        if selected_is_dir(tree) {
            return item.map(|i| i.path.clone());
        }
        item.and_then(|i| i.path.parent().map(Path::to_path_buf))
            .or_else(|| Some(tree.root.path.clone()))
    }

    fn selected_path(&self) -> Option<PathBuf> {
        self.sync
            .tree()
            .and_then(|t| t.selected())
            .map(|item| item.path.clone())
    }

    pub fn begin_create_file(&mut self) {
        match self.current_dir() {
            Some(parent) => self.open_dialog(DialogKind::CreateFile { parent }),
            None => self.set_status_message("Open a folder first".into()),
        }
    }

    pub fn begin_create_dir(&mut self) {
        match self.current_dir() {
            Some(parent) => self.open_dialog(DialogKind::CreateDirectory { parent }),
            None => self.set_status_message("Open a folder first".into()),
        }
    }

    pub fn begin_rename(&mut self) {
        if let Some(original) = self.selected_path() {
            self.open_dialog(DialogKind::Rename { original });
        }
    }

    pub fn begin_delete(&mut self) {
        if let Some(target) = self.selected_path() {
            self.open_dialog(DialogKind::DeleteConfirm { target });
        }
    }

    /// Carry out the open dialog with the current input.
    pub fn confirm_dialog(&mut self, now: Instant) {
        let AppMode::Dialog(kind) = self.mode.clone() else {
            return;
        };
        let input = self.dialog_state.input.trim().to_string();
        self.close_dialog();

        let outcome = match kind {
            DialogKind::CreateFile { parent } => self
                .sync
                .create_file(&parent, &input, &mut self.prefs, &mut self.scheduler)
                .map(|path| self.set_status_message(format!("Created {}", path.display()))),
            DialogKind::CreateDirectory { parent } => self
                .sync
                .create_dir(&parent, &input, &mut self.prefs, &mut self.scheduler)
                .map(|path| self.set_status_message(format!("Created {}", path.display()))),
            DialogKind::Rename { original } => self.rename(&original, &input),
            DialogKind::DeleteConfirm { target } => self.delete(&target),
            DialogKind::OpenFile => self.open_file_path(&input_path(&input), now),
            DialogKind::OpenFolder => {
                self.open_folder(&input_path(&input), now);
                Ok(())
            }
            DialogKind::Error { .. } => Ok(()),
        };
        if let Err(e) = outcome {
            self.show_error(e);
        }
    }

    fn rename(&mut self, original: &Path, new_name: &str) -> Result<()> {
        let old_key = path_key::entry_key(original);
        let new_path = self
            .sync
            .rename(original, new_name, &mut self.prefs, &mut self.scheduler)?;
        let new_key = path_key::entry_key(&new_path);
        if let Some(open) = &self.preview.path {
            let open_key = path_key::entry_key(open);
            if let Some(moved) = path_key::relocate(&open_key, &old_key, &new_key) {
                self.preview.path = Some(PathBuf::from(&moved));
                if self.prefs.last_file().as_deref() == Some(open_key.as_str()) {
                    self.prefs.set_last_file(&moved);
                    self.prefs.save();
                }
            }
        }
        self.set_status_message(format!("Renamed to {new_name}"));
        Ok(())
    }

    fn delete(&mut self, target: &Path) -> Result<()> {
        let key = path_key::entry_key(target);
        self.sync
            .delete(target, &mut self.prefs, &mut self.scheduler)?;
        let open_deleted = self
            .preview
            .path
            .as_ref()
            .is_some_and(|open| path_key::is_same_or_descendant(&path_key::entry_key(open), &key));
        if open_deleted {
            self.preview = PreviewState::default();
        }
        self.set_status_message(format!("Deleted {}", target.display()));
        Ok(())
    }

    /// Insert a character at the current cursor position.
    pub fn dialog_input_char(&mut self, c: char) {
        self.dialog_state
            .input
            .insert(self.dialog_state.cursor_position, c);
        self.dialog_state.cursor_position += c.len_utf8();
    }

    /// Delete the character before the cursor (backspace).
    pub fn dialog_delete_char(&mut self) {
        let state = &mut self.dialog_state;
        if let Some(prev) = state.input[..state.cursor_position].chars().next_back() {
            state.cursor_position -= prev.len_utf8();
            state.input.remove(state.cursor_position);
        }
    }

    /// Move cursor left by one character.
    pub fn dialog_move_cursor_left(&mut self) {
        let state = &mut self.dialog_state;
        if let Some(prev) = state.input[..state.cursor_position].chars().next_back() {
            state.cursor_position -= prev.len_utf8();
        }
    }

    /// Move cursor right by one character.
    pub fn dialog_move_cursor_right(&mut self) {
        let state = &mut self.dialog_state;
        if let Some(next) = state.input[state.cursor_position..].chars().next() {
            state.cursor_position += next.len_utf8();
        }
    }

    pub fn dialog_cursor_home(&mut self) {
        self.dialog_state.cursor_position = 0;
    }

    pub fn dialog_cursor_end(&mut self) {
        self.dialog_state.cursor_position = self.dialog_state.input.len();
    }

    // ── Status ───────────────────────────────────────────────────────────────

    /// Set a status message with current timestamp.
    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Clear the status message once it has been shown long enough.
    pub fn clear_expired_status(&mut self, now: Instant) {
        if let Some((_, created)) = &self.status_message {
            if now.saturating_duration_since(*created).as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
            }
        }
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

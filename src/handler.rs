use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, AppMode, DialogKind, Focus};
use crate::components::help::HelpOverlay;
use crate::fs::tree::NodeType;
use crate::prefs::Mark;

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent, now: Instant) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }
    let mode = app.mode.clone();
    match mode {
        AppMode::Normal => handle_normal(app, key, now),
        AppMode::Dialog(DialogKind::DeleteConfirm { .. }) => handle_confirm(app, key, now),
        AppMode::Dialog(DialogKind::Error { .. }) => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                app.close_dialog();
            }
        }
        AppMode::Dialog(_) => handle_input(app, key, now),
        AppMode::RecentFiles { .. } => handle_recent(app, key, now),
        AppMode::Help { .. } => handle_help(app, key),
    }
}

fn handle_normal(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('?') => app.toggle_help(),
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Char('o') => app.open_dialog(DialogKind::OpenFile),
        KeyCode::Char('O') => app.open_dialog(DialogKind::OpenFolder),
        KeyCode::Char('R') => app.show_recent_files(),
        KeyCode::Char('t') => app.cycle_theme(now),
        KeyCode::Char('<') => app.narrow_tree(now),
        KeyCode::Char('>') => app.widen_tree(now),
        KeyCode::F(5) => app.refresh_tree(),
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => app.refresh_tree(),
        _ => match app.focus {
            Focus::Tree => handle_tree(app, key, now),
            Focus::Preview => handle_preview(app, key),
        },
    }
}

fn handle_tree(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Enter => app.activate_selected(now),
        KeyCode::Char('l') | KeyCode::Right => {
            let is_file = app
                .sync
                .tree()
                .and_then(|t| t.selected())
                .is_some_and(|item| item.node_type == NodeType::File);
            if is_file {
                app.activate_selected(now);
            } else {
                app.sync.expand_selected();
            }
        }
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => app.sync.collapse_selected(),
        KeyCode::Char('.') => app.sync.toggle_hidden(),
        KeyCode::Char('m') => app.toggle_mark(Some(Mark::Green)),
        KeyCode::Char('M') => app.toggle_mark(Some(Mark::Red)),
        KeyCode::Char('u') => app.toggle_mark(None),
        KeyCode::Char('a') => app.begin_create_file(),
        KeyCode::Char('A') => app.begin_create_dir(),
        KeyCode::Char('r') => app.begin_rename(),
        KeyCode::Char('d') | KeyCode::Delete => app.begin_delete(),
        _ => {
            if let Some(tree) = app.sync.tree_mut() {
                match key.code {
                    KeyCode::Char('j') | KeyCode::Down => tree.select_next(),
                    KeyCode::Char('k') | KeyCode::Up => tree.select_previous(),
                    KeyCode::Char('g') | KeyCode::Home => tree.select_first(),
                    KeyCode::Char('G') | KeyCode::End => tree.select_last(),
                    _ => {}
                }
            }
        }
    }
}

fn handle_preview(app: &mut App, key: KeyEvent) {
    let preview = &mut app.preview;
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => preview.scroll_by(1),
        KeyCode::Char('k') | KeyCode::Up => preview.scroll_by(-1),
        KeyCode::Char(' ') | KeyCode::PageDown => preview.page_down(),
        KeyCode::PageUp => preview.page_up(),
        KeyCode::Char('g') | KeyCode::Home => preview.scroll_to_top(),
        KeyCode::Char('G') | KeyCode::End => preview.scroll_to_bottom(),
        KeyCode::Char('h') | KeyCode::Left => app.focus = Focus::Tree,
        _ => {}
    }
}

fn handle_input(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Esc => app.close_dialog(),
        KeyCode::Enter => app.confirm_dialog(now),
        KeyCode::Backspace => app.dialog_delete_char(),
        KeyCode::Left => app.dialog_move_cursor_left(),
        KeyCode::Right => app.dialog_move_cursor_right(),
        KeyCode::Home => app.dialog_cursor_home(),
        KeyCode::End => app.dialog_cursor_end(),
        KeyCode::Char(c) => app.dialog_input_char(c),
        _ => {}
    }
}

fn handle_confirm(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_dialog(now),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.close_dialog(),
        _ => {}
    }
}

fn handle_recent(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.recent_select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.recent_select_previous(),
        KeyCode::Enter => app.open_selected_recent(now),
        KeyCode::Esc | KeyCode::Char('q') => app.mode = AppMode::Normal,
        _ => {}
    }
}

fn handle_help(app: &mut App, key: KeyEvent) {
    let total = HelpOverlay::total_lines();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.scroll_help(1, total),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_help(-1, total),
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => app.toggle_help(),
        _ => {}
    }
}

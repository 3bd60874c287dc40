use std::path::PathBuf;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::{Block, Borders},
    Frame,
};

use crate::app::{App, AppMode, Focus};
use crate::components::dialog::DialogWidget;
use crate::components::help::HelpOverlay;
use crate::components::preview::PreviewWidget;
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::TreeWidget;

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let tree_width = app.tree_pane_width(rows[0].width);
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(tree_width), Constraint::Min(1)])
        .split(rows[0]);

    // Keep the selection visible and look up marks for the rows on screen.
    let visible_height = panes[0].height.saturating_sub(2) as usize;
    let visible_paths: Vec<PathBuf> = match app.sync.tree_mut() {
        Some(tree) => {
            tree.update_scroll(visible_height);
            tree.flat_items
                .iter()
                .skip(tree.scroll_offset)
                .take(visible_height)
                .map(|item| item.path.clone())
                .collect()
        }
        None => Vec::new(),
    };
    let marks = app.marks_for(&visible_paths);
    app.preview.viewport_height = panes[1].height.saturating_sub(2) as usize;

    let border = |focused: bool| {
        let color = if focused {
            app.theme.border_focused_fg
        } else {
            app.theme.border_fg
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
    };

    let tree_focused = app.focus == Focus::Tree;
    match app.sync.tree() {
        Some(tree) => {
            let block = border(tree_focused).title(format!(" {} ", tree.root.name));
            let widget = TreeWidget::new(tree, &app.theme, &marks)
                .focused(tree_focused)
                .block(block);
            frame.render_widget(widget, panes[0]);
        }
        None => frame.render_widget(border(tree_focused).title(" No folder "), panes[0]),
    }

    let preview_title = app
        .preview
        .path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| format!(" {} ", n.to_string_lossy()))
        .unwrap_or_else(|| " Preview ".to_string());
    let preview = PreviewWidget::new(&app.preview, &app.theme)
        .block(border(app.focus == Focus::Preview).title(preview_title));
    frame.render_widget(preview, panes[1]);

    let path_str = app
        .preview
        .path
        .as_deref()
        .or(app.sync.root_path())
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let mut file_info = if app.preview.path.is_some() {
        format!(
            "{} | {}/{}",
            app.prefs.theme(),
            app.preview.scroll_offset + 1,
            app.preview.document.line_count()
        )
    } else {
        app.prefs.theme().to_string()
    };
    let marked = app.prefs.marks().len();
    if marked > 0 {
        file_info.push_str(&format!(" | {marked} marked"));
    }
    let watched = app.sync.watched().len();
    let watcher_status = format!("watching {watched}");
    let mut status = StatusBarWidget::new(&path_str, &file_info, &app.theme);
    if watched > 0 {
        status = status.watcher_status(&watcher_status);
    }
    if let Some((msg, _)) = &app.status_message {
        status = status.status_message(msg, false);
    }
    frame.render_widget(status, rows[1]);

    match &app.mode {
        AppMode::Normal => {}
        AppMode::Help { scroll_offset } => {
            frame.render_widget(HelpOverlay::new(&app.theme, *scroll_offset), area);
        }
        AppMode::Dialog(_) | AppMode::RecentFiles { .. } => {
            let recent = app.prefs.recent_files();
            let dialog = DialogWidget::new(&app.mode, &app.dialog_state, &app.theme).recent(&recent);
            frame.render_widget(dialog, area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::prefs::PreferenceStore;
    use crate::render::SyntectRenderer;
    use crate::theme::{ThemeKind, ThemeProbe};
    use ratatui::{backend::TestBackend, Terminal};
    use std::fs::{self, File};
    use std::time::Instant;
    use tempfile::TempDir;

    struct Dark;

    impl ThemeProbe for Dark {
        fn probe(&self) -> ThemeKind {
            ThemeKind::Dark
        }
    }

    fn app_in(dir: &TempDir) -> App {
        App::new(
            AppConfig::default(),
            PreferenceStore::load(dir.path().join("app.json")),
            None,
            Box::new(SyntectRenderer::new()),
            Box::new(Dark),
            Instant::now(),
        )
    }

    fn screen(app: &mut App, width: u16, height: u16) -> (String, Terminal<TestBackend>) {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buf = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..height {
            for x in 0..width {
                text.push_str(buf[(x, y)].symbol());
            }
            text.push('\n');
        }
        (text, terminal)
    }

    #[test]
    fn draws_tree_preview_and_status() {
        let dir = TempDir::new().unwrap();
        let notes = dir.path().join("notes");
        fs::create_dir(&notes).unwrap();
        fs::write(notes.join("intro.md"), "# Welcome\n\nHello there.\n").unwrap();
        let mut app = app_in(&dir);
        app.open_file_path(&notes.join("intro.md"), Instant::now()).unwrap();

        let (text, _) = screen(&mut app, 90, 20);
        assert!(text.contains(" notes "));
        assert!(text.contains("intro.md"));
        assert!(text.contains("Welcome"));
        assert!(text.contains("Hello there."));
        assert!(!text.contains("marked"));
        assert_eq!(app.preview.viewport_height, 17);

        app.toggle_mark(Some(crate::prefs::Mark::Green));
        let (text, _) = screen(&mut app, 90, 20);
        assert!(text.contains("1 marked"));
    }

    #[test]
    fn tree_pane_is_at_most_a_third() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.tree_width = 500;
        let (_, terminal) = screen(&mut app, 90, 10);
        let buf = terminal.backend().buffer();
        // Top-right corner of the tree block sits at column 29.
        assert_eq!(buf[(29, 0)].symbol(), "┐");
        assert_eq!(buf[(30, 0)].symbol(), "┌");
    }

    #[test]
    fn dialog_overlays_panes() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("x.md")).unwrap();
        let mut app = app_in(&dir);
        app.open_dialog(crate::app::DialogKind::OpenFolder);
        let (text, _) = screen(&mut app, 90, 20);
        assert!(text.contains("Open Folder"));
    }
}

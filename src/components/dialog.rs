use std::path::Path;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::app::{AppMode, DialogKind, DialogState};
use crate::theme::ThemeColors;

/// Dialog widget that renders a centered modal overlay.
pub struct DialogWidget<'a> {
    mode: &'a AppMode,
    dialog_state: &'a DialogState,
    theme: &'a ThemeColors,
    recent: &'a [String],
}

/// Calculate a centered rectangle within the given area.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + area.width.saturating_sub(w) / 2;
    let y = area.y + area.height.saturating_sub(h) / 2;
    Rect::new(x, y, w, h)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

impl<'a> DialogWidget<'a> {
    pub fn new(mode: &'a AppMode, dialog_state: &'a DialogState, theme: &'a ThemeColors) -> Self {
        Self {
            mode,
            dialog_state,
            theme,
            recent: &[],
        }
    }

    /// Entries for the recent files popup.
    pub fn recent(mut self, recent: &'a [String]) -> Self {
        self.recent = recent;
        self
    }

    fn framed(&self, title: &str, border: ratatui::style::Color, rect: Rect, buf: &mut Buffer) -> Rect {
        Clear.render(rect, buf);
        let block = Block::default()
            .title(format!(" {title} "))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(self.theme.dialog_bg))
            .padding(Padding::horizontal(1));
        let inner = block.inner(rect);
        block.render(rect, buf);
        inner
    }

    fn hint(&self, text: &str, inner: Rect, buf: &mut Buffer) {
        if inner.height > 1 {
            let style = Style::default()
                .fg(self.theme.dim_fg)
                .add_modifier(Modifier::DIM);
            let line = Line::from(Span::styled(text.to_string(), style));
            buf.set_line(inner.x, inner.y + inner.height - 1, &line, inner.width);
        }
    }

    fn render_input(&self, title: &str, area: Rect, buf: &mut Buffer) {
        let width = 60.min(area.width.saturating_sub(4));
        let rect = centered_rect(width, 5, area);
        let inner = self.framed(title, self.theme.dialog_border_fg, rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let input = &self.dialog_state.input;
        let cursor = self.dialog_state.cursor_position.min(input.len());
        let (before, rest) = input.split_at(cursor);
        let mut rest_chars = rest.chars();
        let cursor_char = rest_chars.next().map_or(" ".to_string(), String::from);
        let after: String = rest_chars.collect();

        // Keep the cursor visible by dropping characters from the left.
        let room = (inner.width as usize).saturating_sub(1);
        let before_len = before.chars().count();
        let before_display: String = before.chars().skip(before_len.saturating_sub(room)).collect();

        let input_style = Style::default().fg(self.theme.preview_fg);
        let cursor_style = Style::default()
            .bg(self.theme.preview_fg)
            .fg(self.theme.dialog_bg)
            .add_modifier(Modifier::BOLD);
        let line = Line::from(vec![
            Span::styled(before_display, input_style),
            Span::styled(cursor_char, cursor_style),
            Span::styled(after, input_style),
        ]);
        buf.set_line(inner.x, inner.y + inner.height / 2, &line, inner.width);
        self.hint("[Enter] Confirm  [Esc] Cancel", inner, buf);
    }

    fn render_confirm(&self, target: &Path, area: Rect, buf: &mut Buffer) {
        let name = display_name(target);
        let width = (name.chars().count() as u16 + 10)
            .max(40)
            .min(area.width.saturating_sub(4));
        let rect = centered_rect(width, 6, area);
        let inner = self.framed("Delete", self.theme.error_fg, rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let header = Line::from(Span::styled(
            "Delete this entry?",
            Style::default()
                .fg(self.theme.error_fg)
                .add_modifier(Modifier::BOLD),
        ));
        buf.set_line(inner.x, inner.y, &header, inner.width);
        if inner.height > 2 {
            let line = Line::from(Span::styled(
                format!("  • {name}"),
                Style::default().fg(self.theme.preview_fg),
            ));
            buf.set_line(inner.x, inner.y + 1, &line, inner.width);
        }
        self.hint("[y] Yes  [n/Esc] Cancel", inner, buf);
    }

    fn render_error(&self, message: &str, area: Rect, buf: &mut Buffer) {
        let width = (message.chars().count() as u16 + 6)
            .max(30)
            .min(area.width.saturating_sub(4));
        let rect = centered_rect(width, 5, area);
        let inner = self.framed("Error", self.theme.error_fg, rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }
        let line = Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(self.theme.error_fg),
        ));
        buf.set_line(inner.x, inner.y + inner.height / 2, &line, inner.width);
        self.hint("[Enter/Esc] Dismiss", inner, buf);
    }

    fn render_recent(&self, selected: usize, area: Rect, buf: &mut Buffer) {
        let longest = self
            .recent
            .iter()
            .map(|p| p.chars().count())
            .max()
            .unwrap_or(20) as u16;
        let width = (longest + 8).max(40).min(area.width.saturating_sub(4));
        let height = (self.recent.len() as u16 + 4).min(area.height.saturating_sub(2));
        let rect = centered_rect(width, height, area);
        let inner = self.framed("Recent Files", self.theme.dialog_border_fg, rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let rows = inner.height.saturating_sub(2) as usize;
        let first = (selected + 1).saturating_sub(rows);
        for (row, (idx, path)) in self
            .recent
            .iter()
            .enumerate()
            .skip(first)
            .take(rows)
            .enumerate()
        {
            let style = if idx == selected {
                Style::default()
                    .bg(self.theme.tree_selected_bg)
                    .fg(self.theme.tree_selected_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.tree_file_fg)
            };
            let line = Line::from(Span::styled(path.clone(), style));
            buf.set_line(inner.x, inner.y + row as u16, &line, inner.width);
        }
        self.hint("[Enter] Open  [Esc] Close", inner, buf);
    }
}

impl<'a> Widget for DialogWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.mode {
            AppMode::Dialog(kind) => match kind {
                DialogKind::CreateFile { .. } => self.render_input("New File", area, buf),
                DialogKind::CreateDirectory { .. } => self.render_input("New Folder", area, buf),
                DialogKind::Rename { .. } => self.render_input("Rename", area, buf),
                DialogKind::OpenFile => self.render_input("Open File", area, buf),
                DialogKind::OpenFolder => self.render_input("Open Folder", area, buf),
                DialogKind::DeleteConfirm { target } => self.render_confirm(target, area, buf),
                DialogKind::Error { message } => self.render_error(message, area, buf),
            },
            AppMode::RecentFiles { selected } => self.render_recent(*selected, area, buf),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::dark_theme;
    use std::path::PathBuf;

    fn buffer_to_string(buf: &Buffer, area: Rect) -> String {
        let mut s = String::new();
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                s.push_str(buf[(x, y)].symbol());
            }
            s.push('\n');
        }
        s
    }

    fn render(mode: &AppMode, state: &DialogState, recent: &[String]) -> String {
        let theme = dark_theme();
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        DialogWidget::new(mode, state, &theme)
            .recent(recent)
            .render(area, &mut buf);
        buffer_to_string(&buf, area)
    }

    #[test]
    fn test_input_dialog_renders() {
        let mode = AppMode::Dialog(DialogKind::CreateFile {
            parent: PathBuf::from("/notes"),
        });
        let state = DialogState {
            input: "todo".to_string(),
            cursor_position: 4,
        };
        let content = render(&mode, &state, &[]);
        assert!(content.contains("New File"));
        assert!(content.contains("todo"));
    }

    #[test]
    fn test_rename_dialog_with_multibyte_cursor() {
        let mode = AppMode::Dialog(DialogKind::Rename {
            original: PathBuf::from("/notes/über.md"),
        });
        let state = DialogState {
            input: "über.md".to_string(),
            cursor_position: 0,
        };
        let content = render(&mode, &state, &[]);
        assert!(content.contains("Rename"));
        assert!(content.contains("über.md"));
    }

    #[test]
    fn test_confirm_dialog_renders() {
        let mode = AppMode::Dialog(DialogKind::DeleteConfirm {
            target: PathBuf::from("/notes/old.md"),
        });
        let content = render(&mode, &DialogState::default(), &[]);
        assert!(content.contains("Delete this entry?"));
        assert!(content.contains("old.md"));
    }

    #[test]
    fn test_error_dialog_renders() {
        let mode = AppMode::Dialog(DialogKind::Error {
            message: "Already exists: /notes/b.md".to_string(),
        });
        let content = render(&mode, &DialogState::default(), &[]);
        assert!(content.contains("Error"));
        assert!(content.contains("Already exists: /notes/b.md"));
    }

    #[test]
    fn test_recent_popup_lists_entries() {
        let mode = AppMode::RecentFiles { selected: 1 };
        let recent = vec!["/notes/b.md".to_string(), "/notes/a.md".to_string()];
        let content = render(&mode, &DialogState::default(), &recent);
        assert!(content.contains("Recent Files"));
        assert!(content.contains("/notes/b.md"));
        assert!(content.contains("/notes/a.md"));
    }

    #[test]
    fn test_normal_mode_is_noop() {
        let content = render(&AppMode::Normal, &DialogState::default(), &[]);
        assert!(content.trim().is_empty());
    }

    #[test]
    fn test_centered_rect_fits_small_area() {
        let rect = centered_rect(50, 10, Rect::new(0, 0, 20, 5));
        assert_eq!(rect, Rect::new(0, 0, 20, 5));
    }
}

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

const KEY_HINTS: &str = " o:open  R:recent  m/M:mark  ?:keys ";

/// Status bar widget that displays the document path, position info, key
/// hints, or a transient status message.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    file_info: &'a str,
    theme: &'a ThemeColors,
    status_message: Option<&'a str>,
    is_error: bool,
    watcher_status: Option<&'a str>,
}

/// Keep the last `max` characters of `s`, marking the cut with `...`.
fn truncate_left(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }
    let tail: String = s.chars().skip(len - (max - 3)).collect();
    format!("...{tail}")
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, file_info: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            path_str,
            file_info,
            theme,
            status_message: None,
            is_error: false,
            watcher_status: None,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    pub fn watcher_status(mut self, status: &'a str) -> Self {
        self.watcher_status = Some(status);
        self
    }
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;
        let base = Style::default().bg(self.theme.status_bg);

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                base.bg(self.theme.error_fg).fg(self.theme.status_fg)
            } else {
                base.fg(self.theme.success_fg)
            };
            let msg: String = msg.chars().take(width).collect();
            let display = format!("{msg:<width$}");
            buf.set_line(area.x, area.y, &Line::from(Span::styled(display, style)), area.width);
            return;
        }

        let hints_len = KEY_HINTS.chars().count();
        let watcher = self
            .watcher_status
            .map(|w| format!(" {w}"))
            .unwrap_or_default();
        let remaining = width
            .saturating_sub(hints_len)
            .saturating_sub(watcher.chars().count());

        let info_display: String = self.file_info.chars().take(remaining).collect();
        let info_len = info_display.chars().count();
        let path_budget = remaining.saturating_sub(info_len).saturating_sub(1);
        let path_display = truncate_left(self.path_str, path_budget);
        let gap = remaining
            .saturating_sub(path_display.chars().count())
            .saturating_sub(info_len);

        let spans = vec![
            Span::styled(path_display, base.fg(self.theme.status_fg)),
            Span::styled(" ".repeat(gap), base),
            Span::styled(info_display, base.fg(self.theme.accent_fg)),
            Span::styled(
                watcher,
                base.fg(self.theme.dim_fg).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                KEY_HINTS,
                base.fg(self.theme.dim_fg).add_modifier(Modifier::DIM),
            ),
        ];
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;

    fn test_theme() -> ThemeColors {
        theme::dark_theme()
    }

    fn row(buf: &Buffer) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_status_message_success() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("/path", "info", &tc).status_message("Renamed to b.md", false);

        let area = Rect::new(0, 0, 80, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);

        assert!(row(&buf).contains("Renamed to b.md"));
        assert_eq!(buf[(0, 0)].fg, tc.success_fg);
    }

    #[test]
    fn test_status_message_error() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("/path", "info", &tc).status_message("Permission denied", true);

        let area = Rect::new(0, 0, 80, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);

        assert!(row(&buf).contains("Permission denied"));
        assert_eq!(buf[(0, 0)].bg, tc.error_fg);
        assert_eq!(buf[(0, 0)].fg, tc.status_fg);
    }

    #[test]
    fn test_normal_bar_rendering() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("/home/user/notes/a.md", "dark | 12/340", &tc)
            .watcher_status("watching 4");

        let area = Rect::new(0, 0, 100, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);

        let content = row(&buf);
        assert!(content.contains("/home/user/notes/a.md"));
        assert!(content.contains("dark | 12/340"));
        assert!(content.contains("watching 4"));
        assert!(content.contains("R:recent"));
    }

    #[test]
    fn test_long_path_is_cut_from_the_left() {
        let tc = test_theme();
        let path = format!("/very/{}/deep/doc.md", "nested/".repeat(20));
        let widget = StatusBarWidget::new(&path, "", &tc);

        let area = Rect::new(0, 0, 60, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);

        let content = row(&buf);
        assert!(content.starts_with("..."));
        assert!(content.contains("deep/doc.md"));
    }

    #[test]
    fn test_truncate_left_multibyte() {
        assert_eq!(truncate_left("ñññññ", 4), "...ñ");
        assert_eq!(truncate_left("abc", 10), "abc");
        assert_eq!(truncate_left("abcdef", 2), "ab");
    }

    #[test]
    fn test_zero_area_does_not_panic() {
        let tc = test_theme();
        let widget = StatusBarWidget::new("/path", "info", &tc);
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
    }
}

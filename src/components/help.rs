use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

use crate::theme::ThemeColors;

/// A single keybinding entry for display.
struct KeyEntry {
    key: &'static str,
    description: &'static str,
}

/// A category of keybindings.
struct KeyCategory {
    name: &'static str,
    entries: &'static [KeyEntry],
}

const fn entry(key: &'static str, description: &'static str) -> KeyEntry {
    KeyEntry { key, description }
}

const TREE_KEYS: &[KeyEntry] = &[
    entry("j / ↓", "Move down"),
    entry("k / ↑", "Move up"),
    entry("g / Home", "Jump to first item"),
    entry("G / End", "Jump to last item"),
    entry("Enter", "Open file, toggle folder"),
    entry("l / →", "Expand folder or open file"),
    entry("h / ← / Backspace", "Collapse folder or go to parent"),
    entry(".", "Toggle hidden entries"),
    entry("m", "Toggle green mark"),
    entry("M", "Toggle red mark"),
    entry("u", "Clear mark"),
];

const FILE_OPS_KEYS: &[KeyEntry] = &[
    entry("a", "New markdown file"),
    entry("A", "New folder"),
    entry("r", "Rename"),
    entry("d / Delete", "Delete"),
    entry("F5 / Ctrl+r", "Reload tree from disk"),
];

const PREVIEW_KEYS: &[KeyEntry] = &[
    entry("j / k", "Scroll one line"),
    entry("Space / PgDn", "Page down"),
    entry("PgUp", "Page up"),
    entry("g / G", "Top / bottom"),
    entry("h / ←", "Back to tree"),
];

const GENERAL_KEYS: &[KeyEntry] = &[
    entry("o", "Open file by path"),
    entry("O", "Open folder by path"),
    entry("R", "Recent files"),
    entry("t", "Cycle theme (light, dark, auto)"),
    entry("< / >", "Narrow / widen tree pane"),
    entry("Tab", "Switch pane"),
    entry("?", "Toggle this help"),
    entry("q / Ctrl+c", "Quit"),
];

const CATEGORIES: &[KeyCategory] = &[
    KeyCategory {
        name: "Tree",
        entries: TREE_KEYS,
    },
    KeyCategory {
        name: "Files",
        entries: FILE_OPS_KEYS,
    },
    KeyCategory {
        name: "Preview",
        entries: PREVIEW_KEYS,
    },
    KeyCategory {
        name: "General",
        entries: GENERAL_KEYS,
    },
];

/// Help overlay widget showing all keybindings.
pub struct HelpOverlay<'a> {
    theme: &'a ThemeColors,
    scroll_offset: usize,
}

impl<'a> HelpOverlay<'a> {
    pub fn new(theme: &'a ThemeColors, scroll_offset: usize) -> Self {
        Self {
            theme,
            scroll_offset,
        }
    }

    fn build_content_lines(&self) -> Vec<Line<'static>> {
        let heading = Style::default()
            .fg(self.theme.accent_fg)
            .add_modifier(Modifier::BOLD);
        let mut lines: Vec<Line<'static>> = Vec::new();

        for category in CATEGORIES {
            lines.push(Line::from(vec![
                Span::styled(format!("── {} ", category.name), heading),
                Span::styled("─".repeat(30), Style::default().fg(self.theme.dim_fg)),
            ]));
            for entry in category.entries {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("  {:<20}", entry.key),
                        Style::default()
                            .fg(self.theme.heading_fg)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(entry.description, Style::default().fg(self.theme.tree_file_fg)),
                ]));
            }
            lines.push(Line::from(""));
        }

        lines.push(Line::from(Span::styled(
            " Press ? or Esc to close ",
            Style::default().fg(self.theme.dim_fg),
        )));
        lines
    }

    /// Number of content lines, for scroll bounds.
    pub fn total_lines() -> usize {
        CATEGORIES
            .iter()
            .map(|category| category.entries.len() + 2)
            .sum::<usize>()
            + 1
    }
}

impl<'a> Widget for HelpOverlay<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let overlay_width = (area.width as f32 * 0.70).min(64.0) as u16;
        let overlay_height = (area.height as f32 * 0.80).min(48.0) as u16;
        let x = area.x + area.width.saturating_sub(overlay_width) / 2;
        let y = area.y + area.height.saturating_sub(overlay_height) / 2;
        let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

        Clear.render(overlay_area, buf);

        let block = Block::default()
            .title(" Keys ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border_focused_fg))
            .style(Style::default().bg(self.theme.dialog_bg));
        let inner = block.inner(overlay_area);
        block.render(overlay_area, buf);

        let content_lines = self.build_content_lines();
        let visible_height = inner.height as usize;
        for (i, line) in content_lines
            .iter()
            .skip(self.scroll_offset)
            .take(visible_height)
            .enumerate()
        {
            buf.set_line(
                inner.x + 1,
                inner.y + i as u16,
                line,
                inner.width.saturating_sub(2),
            );
        }

        if content_lines.len() > visible_height && overlay_area.height > 0 {
            let total = content_lines.len();
            let indicator = format!(" {}/{} ", (self.scroll_offset + 1).min(total), total);
            let span = Span::styled(indicator, Style::default().fg(self.theme.dim_fg));
            let width = span.width() as u16;
            let ind_x = overlay_area.x + overlay_area.width.saturating_sub(width + 1);
            let ind_y = overlay_area.y + overlay_area.height - 1;
            buf.set_span(ind_x, ind_y, &span, width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_lines_match_total() {
        let theme = crate::theme::dark_theme();
        let overlay = HelpOverlay::new(&theme, 0);
        assert_eq!(overlay.build_content_lines().len(), HelpOverlay::total_lines());
    }

    #[test]
    fn all_categories_have_entries() {
        for cat in CATEGORIES {
            assert!(!cat.entries.is_empty(), "category '{}' has no entries", cat.name);
        }
    }

    #[test]
    fn renders_first_category() {
        let theme = crate::theme::dark_theme();
        let area = Rect::new(0, 0, 80, 40);
        let mut buf = Buffer::empty(area);
        HelpOverlay::new(&theme, 0).render(area, &mut buf);
        let text: String = (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|pos| buf[pos].symbol().to_string())
            .collect();
        assert!(text.contains("Keys"));
        assert!(text.contains("Move down"));
    }
}

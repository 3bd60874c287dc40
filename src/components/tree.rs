use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::fs::tree::{FlatItem, NodeType, TreeState};
use crate::prefs::Mark;
use crate::theme::ThemeColors;

/// Tree widget that renders the document tree with box-drawing characters.
pub struct TreeWidget<'a> {
    tree_state: &'a TreeState,
    theme: &'a ThemeColors,
    /// Marks of the visible rows, starting at the scroll offset.
    marks: &'a [Option<Mark>],
    focused: bool,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(tree_state: &'a TreeState, theme: &'a ThemeColors, marks: &'a [Option<Mark>]) -> Self {
        Self {
            tree_state,
            theme,
            marks,
            focused: true,
            block: None,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    /// Build the prefix string for tree indentation using box-drawing characters.
    ///
    /// Continuation lines depend on whether each ancestor was the last of
    /// its siblings, found by walking back to the nearest row at that depth.
    fn build_prefix(item: &FlatItem, items: &[FlatItem], item_index: usize) -> String {
        if item.depth == 0 {
            return String::new();
        }

        let mut prefix = String::new();
        for d in 1..item.depth {
            let ancestor_is_last = items[..item_index]
                .iter()
                .rev()
                .take_while(|other| other.depth >= d)
                .find(|other| other.depth == d)
                .is_some_and(|ancestor| ancestor.is_last_sibling);
            prefix.push_str(if ancestor_is_last { "   " } else { "│  " });
        }
        prefix.push_str(if item.is_last_sibling { "└──" } else { "├──" });
        prefix
    }

    fn item_indicator(item: &FlatItem) -> &'static str {
        match item.node_type {
            NodeType::Directory if item.is_expanded => "▾ ",
            NodeType::Directory => "▸ ",
            NodeType::File => "  ",
        }
    }

    fn item_style(&self, item: &FlatItem, mark: Option<Mark>, is_selected: bool) -> Style {
        if is_selected && self.focused {
            return Style::default()
                .bg(self.theme.tree_selected_bg)
                .fg(self.theme.tree_selected_fg)
                .add_modifier(Modifier::BOLD);
        }
        let base = if let Some(mark) = mark {
            Style::default().fg(self.theme.mark_fg(mark))
        } else if item.is_hidden {
            Style::default().fg(self.theme.tree_hidden_fg)
        } else {
            match item.node_type {
                NodeType::Directory => Style::default()
                    .fg(self.theme.tree_dir_fg)
                    .add_modifier(Modifier::BOLD),
                NodeType::File => Style::default().fg(self.theme.tree_file_fg),
            }
        };
        if is_selected {
            base.add_modifier(Modifier::REVERSED)
        } else {
            base
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let items = &self.tree_state.flat_items;
        let selected = self.tree_state.selected_index;
        let visible_height = inner_area.height as usize;

        if items.is_empty() || visible_height == 0 {
            return;
        }

        let scroll = self.tree_state.scroll_offset;
        let visible_items = items.iter().enumerate().skip(scroll).take(visible_height);

        for (row, (idx, item)) in visible_items.enumerate() {
            let y = inner_area.y + row as u16;
            let mark = self.marks.get(row).copied().flatten();
            let style = self.item_style(item, mark, idx == selected);

            let badge = match mark {
                Some(_) => "● ",
                None => "",
            };
            let line_content = format!(
                "{}{}{}{}",
                Self::build_prefix(item, items, idx),
                Self::item_indicator(item),
                badge,
                item.name
            );
            let line = Line::from(Span::styled(line_content, style));
            buf.set_line(inner_area.x, y, &line, inner_area.width);
        }
    }
}

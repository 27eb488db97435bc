use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::palette;
use crate::view::TreeRow;

/// Folder tree pane drawn with box-drawing connectors.
pub struct FolderTreeWidget<'a> {
    rows: &'a [TreeRow],
    cursor: usize,
    scroll: usize,
    focused: bool,
    block: Option<Block<'a>>,
}

impl<'a> FolderTreeWidget<'a> {
    pub fn new(rows: &'a [TreeRow], cursor: usize, scroll: usize) -> Self {
        Self {
            rows,
            cursor,
            scroll,
            focused: false,
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

    /// Indentation for a row. Every level takes three cells, so the
    /// expand marker of a row at depth `d` sits at column `3 * d`.
    fn build_prefix(rows: &[TreeRow], index: usize) -> String {
        let node = &rows[index].node;
        if node.depth == 0 {
            return String::new();
        }

        let mut prefix = String::new();
        for d in 1..node.depth {
            // Nearest earlier row at depth d is this row's ancestor.
            let ancestor_is_last = rows[..index]
                .iter()
                .rev()
                .take_while(|r| r.node.depth >= d)
                .find(|r| r.node.depth == d)
                .map(|r| r.node.is_last_sibling)
                .unwrap_or(false);
            prefix.push_str(if ancestor_is_last { "   " } else { "│  " });
        }
        prefix.push_str(if node.is_last_sibling { "└──" } else { "├──" });
        prefix
    }

    fn marker(row: &TreeRow) -> &'static str {
        let node = &row.node;
        if node.is_file {
            "· "
        } else if !node.is_expandable {
            "  "
        } else if node.is_open {
            "▾ "
        } else {
            "▸ "
        }
    }

    fn row_style(&self, index: usize, row: &TreeRow) -> Style {
        if self.focused && index == self.cursor {
            return Style::default()
                .bg(palette::SURFACE)
                .fg(palette::TEXT)
                .add_modifier(Modifier::BOLD);
        }
        if row.highlighted {
            return Style::default()
                .fg(palette::ACCENT)
                .add_modifier(Modifier::BOLD);
        }
        if row.node.is_file {
            Style::default().fg(palette::TEXT)
        } else {
            Style::default().fg(palette::FOLDER)
        }
    }
}

impl<'a> Widget for FolderTreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let visible_height = inner_area.height as usize;
        if self.rows.is_empty() || visible_height == 0 {
            return;
        }

        let visible = self
            .rows
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(visible_height);
        for (i, (idx, row)) in visible.enumerate() {
            let y = inner_area.y + i as u16;
            let prefix = Self::build_prefix(self.rows, idx);
            let style = self.row_style(idx, row);
            let line = Line::from(vec![
                Span::styled(prefix, Style::default().fg(palette::BORDER)),
                Span::styled(Self::marker(row), style),
                Span::styled(row.node.label.clone(), style),
            ]);
            buf.set_line(inner_area.x, y, &line, inner_area.width);
        }
    }
}

use genpage_browser::browser::{DisplayFormat, PageButton};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::palette;
use crate::view::ContentRow;

/// Screen rows one entry takes in the given format.
pub fn entry_height(format: DisplayFormat) -> u16 {
    match format {
        DisplayFormat::List | DisplayFormat::SmallThumbnails => 1,
        DisplayFormat::Cards | DisplayFormat::SmallCards | DisplayFormat::Thumbnails => 2,
        DisplayFormat::BigCards | DisplayFormat::BigThumbnails | DisplayFormat::GiantThumbnails => 3,
    }
}

/// Render the pagination strip, e.g. `‹ 1 … 4 [5] 6 … 12 ›`.
pub fn page_strip(buttons: &[PageButton]) -> String {
    buttons
        .iter()
        .map(|b| match *b {
            PageButton::Prev { .. } => "‹".to_string(),
            PageButton::Next { .. } => "›".to_string(),
            PageButton::Ellipsis => "…".to_string(),
            PageButton::Page { number, active: true } => format!("[{}]", number),
            PageButton::Page { number, .. } => number.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// What the last line of the pane shows, if anything.
pub enum Footer {
    None,
    Pages(Vec<PageButton>),
    Deferred(usize),
}

/// Item list pane.
pub struct ContentWidget<'a> {
    entries: &'a [ContentRow],
    format: DisplayFormat,
    cursor: usize,
    scroll: usize,
    focused: bool,
    footer: Footer,
    block: Option<Block<'a>>,
}

impl<'a> ContentWidget<'a> {
    pub fn new(entries: &'a [ContentRow], format: DisplayFormat, cursor: usize, scroll: usize) -> Self {
        Self {
            entries,
            format,
            cursor,
            scroll,
            focused: false,
            footer: Footer::None,
            block: None,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn footer(mut self, footer: Footer) -> Self {
        self.footer = footer;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    fn entry_lines(&self, entry: &ContentRow, style: Style) -> Vec<Line<'static>> {
        let glyph = if self.format.is_thumbnails() { "▣ " } else { "" };
        let title = Line::from(vec![
            Span::styled(glyph, Style::default().fg(palette::ACCENT)),
            Span::styled(entry.label.clone(), style.add_modifier(Modifier::BOLD)),
        ]);
        let buttons = entry
            .buttons
            .iter()
            .enumerate()
            .map(|(i, label)| format!("[{}:{}]", i + 1, label))
            .collect::<Vec<_>>()
            .join(" ");
        let dim = Style::default().fg(palette::DIM);

        match entry_height(self.format) {
            1 => {
                let mut spans = title.spans;
                if self.format == DisplayFormat::List && !entry.description.is_empty() {
                    spans.push(Span::styled(format!("  {}", entry.description), dim));
                }
                vec![Line::from(spans).style(style)]
            }
            2 => vec![
                title.style(style),
                Line::from(Span::styled(format!("  {}", entry.description), dim)).style(style),
            ],
            _ => vec![
                title.style(style),
                Line::from(Span::styled(format!("  {}", entry.description), dim)).style(style),
                Line::from(Span::styled(format!("  {}", buttons), dim)).style(style),
            ],
        }
    }
}

impl<'a> Widget for ContentWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };
        if inner_area.height == 0 || inner_area.width == 0 {
            return;
        }

        let footer = match &self.footer {
            Footer::None => None,
            Footer::Pages(buttons) => Some(page_strip(buttons)),
            Footer::Deferred(n) => Some(format!("{} more, press m to load", n)),
        };
        if let Some(text) = footer {
            inner_area.height -= 1;
            let line = Line::from(Span::styled(text, Style::default().fg(palette::WARNING)));
            buf.set_line(inner_area.x, inner_area.y + inner_area.height, &line, inner_area.width);
        }

        if self.entries.is_empty() {
            if inner_area.height > 0 {
                let line = Line::from(Span::styled("No items", Style::default().fg(palette::DIM)));
                buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
            }
            return;
        }

        let height = entry_height(self.format);
        let bottom = inner_area.y + inner_area.height;
        let mut y = inner_area.y;
        for (idx, entry) in self.entries.iter().enumerate().skip(self.scroll) {
            if y + height > bottom {
                break;
            }
            let style = if self.focused && idx == self.cursor {
                Style::default().bg(palette::SURFACE).fg(palette::TEXT)
            } else if entry.selected {
                Style::default().fg(palette::SUCCESS)
            } else {
                Style::default().fg(palette::TEXT)
            };
            for line in self.entry_lines(entry, style) {
                buf.set_style(Rect::new(inner_area.x, y, inner_area.width, 1), style);
                buf.set_line(inner_area.x, y, &line, inner_area.width);
                y += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genpage_browser::browser::paging::page_buttons;

    fn entry(name: &str, selected: bool) -> ContentRow {
        ContentRow {
            name: name.to_string(),
            label: name.to_string(),
            description: "2.00 KB".to_string(),
            buttons: vec!["Open folder".to_string()],
            selected,
        }
    }

    fn line(buf: &Buffer, y: u16, width: u16) -> String {
        (0..width)
            .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
            .collect()
    }

    #[test]
    fn test_page_strip() {
        assert_eq!(page_strip(&page_buttons(5, 12)), "‹ 1 … 4 [5] 6 … 12 ›");
        assert_eq!(page_strip(&page_buttons(1, 2)), "‹ [1] 2 ›");
    }

    #[test]
    fn test_list_format_one_line_per_entry() {
        let entries = vec![entry("a.png", false), entry("b.png", true)];
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        ContentWidget::new(&entries, DisplayFormat::List, 0, 0).render(area, &mut buf);

        assert!(line(&buf, 0, 30).starts_with("a.png  2.00 KB"));
        assert!(line(&buf, 1, 30).starts_with("b.png"));
        assert_eq!(buf.cell((0, 1)).unwrap().fg, palette::SUCCESS);
    }

    #[test]
    fn test_big_cards_show_buttons() {
        let entries = vec![entry("a.png", false)];
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        ContentWidget::new(&entries, DisplayFormat::BigCards, 0, 0).render(area, &mut buf);
        assert!(line(&buf, 2, 30).contains("[1:Open folder]"));
    }

    #[test]
    fn test_footer_takes_last_line() {
        let entries = vec![entry("a.png", false)];
        let area = Rect::new(0, 0, 30, 2);
        let mut buf = Buffer::empty(area);
        ContentWidget::new(&entries, DisplayFormat::List, 0, 0)
            .footer(Footer::Deferred(40))
            .render(area, &mut buf);
        assert!(line(&buf, 1, 30).starts_with("40 more"));
    }

    #[test]
    fn test_empty_shows_placeholder() {
        let area = Rect::new(0, 0, 20, 2);
        let mut buf = Buffer::empty(area);
        ContentWidget::new(&[], DisplayFormat::Cards, 0, 0).render(area, &mut buf);
        assert!(line(&buf, 0, 20).starts_with("No items"));
    }
}

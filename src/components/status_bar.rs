use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::palette;

/// Status bar: folder and counts, or a transient message, or the input line.
pub struct StatusBarWidget<'a> {
    folder: &'a str,
    info: &'a str,
    status_message: Option<&'a str>,
    is_error: bool,
    prompt: Option<(&'a str, &'a str)>,
    watcher_status: Option<&'a str>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(folder: &'a str, info: &'a str) -> Self {
        Self {
            folder,
            info,
            status_message: None,
            is_error: false,
            prompt: None,
            watcher_status: None,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    /// Show an input line, e.g. `("/", "cat")` while filtering.
    pub fn prompt(mut self, label: &'a str, input: &'a str) -> Self {
        self.prompt = Some((label, input));
        self
    }

    pub fn watcher_status(mut self, status: &'a str) -> Self {
        self.watcher_status = Some(status);
        self
    }
}

/// Pad or truncate to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let truncated: String = text.chars().take(width).collect();
    format!("{:<width$}", truncated, width = width)
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;

        if let Some((label, input)) = self.prompt {
            let style = Style::default().fg(palette::TEXT).bg(palette::SURFACE);
            let line = Line::from(Span::styled(fit(&format!("{}{}█", label, input), width), style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default().bg(palette::ERROR).fg(palette::TEXT)
            } else {
                Style::default().fg(palette::SUCCESS)
            };
            let line = Line::from(Span::styled(fit(msg, width), style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        // Normal bar: [folder] [info] [watcher] [key_hints]
        let key_hints = " /:filter f:format s:sort r:refresh q:quit ";
        let hints_len = key_hints.len();
        let remaining = width.saturating_sub(hints_len);

        let folder = if self.folder.is_empty() { "/" } else { self.folder };
        let info_len = self.info.chars().count();
        let folder_budget = remaining.saturating_sub(info_len).saturating_sub(1);
        let folder_len = folder.chars().count();
        let folder_display: String = if folder_len > folder_budget {
            if folder_budget > 3 {
                let tail: String = folder.chars().skip(folder_len - (folder_budget - 3)).collect();
                format!("...{}", tail)
            } else {
                folder.chars().take(folder_budget).collect()
            }
        } else {
            folder.to_string()
        };

        let gap = remaining
            .saturating_sub(folder_display.chars().count())
            .saturating_sub(info_len);

        let mut spans = vec![
            Span::styled(folder_display, Style::default().fg(palette::TEXT)),
            Span::raw(" ".repeat(gap)),
            Span::styled(self.info.to_string(), Style::default().fg(palette::FOLDER)),
        ];

        if let Some(watcher) = self.watcher_status {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                watcher.to_string(),
                Style::default()
                    .fg(palette::WARNING)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let pad = width.saturating_sub(used).saturating_sub(hints_len);
        if pad > 0 {
            spans.push(Span::raw(" ".repeat(pad)));
        }
        spans.push(Span::styled(
            key_hints,
            Style::default().fg(palette::DIM).add_modifier(Modifier::DIM),
        ));

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

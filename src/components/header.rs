use genpage_browser::browser::path::{Crumb, ROOT_LABEL};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::palette;
use crate::view::Snapshot;

const SEPARATOR: &str = " › ";

/// Column span `[start, end)` and route of every crumb when the trail is
/// drawn from column `x`.
pub fn crumb_spans(crumbs: &[Crumb], x: u16) -> Vec<(u16, u16, String)> {
    let mut spans = Vec::with_capacity(crumbs.len());
    let mut col = x.saturating_add(1);
    for (i, crumb) in crumbs.iter().enumerate() {
        if i > 0 {
            col = col.saturating_add(width_of(SEPARATOR));
        }
        let end = col.saturating_add(width_of(&crumb.label));
        spans.push((col, end, crumb.route.clone()));
        col = end;
    }
    spans
}

fn width_of(text: &str) -> u16 {
    u16::try_from(text.chars().count()).unwrap_or(u16::MAX)
}

/// Top line: clickable path trail on the left, view settings on the right.
pub struct HeaderWidget<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> HeaderWidget<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    fn settings(&self) -> String {
        let s = self.snapshot;
        let mut parts = vec![
            s.format.label().to_string(),
            format!("depth {}", s.depth),
            s.sort.label().to_string(),
        ];
        if !s.filter.is_empty() {
            parts.push(format!("filter: {}", s.filter));
        }
        if s.is_loading {
            parts.push("loading".to_string());
        }
        format!("{} ", parts.join(" · "))
    }
}

impl<'a> Widget for HeaderWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let crumb_style = Style::default()
            .fg(palette::FOLDER)
            .add_modifier(Modifier::BOLD);
        let sep_style = Style::default().fg(palette::DIM);

        let mut spans = vec![Span::raw(" ")];
        if self.snapshot.crumbs.is_empty() {
            spans.push(Span::styled(ROOT_LABEL, crumb_style));
        }
        for (i, crumb) in self.snapshot.crumbs.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(SEPARATOR, sep_style));
            }
            let style = if i + 1 == self.snapshot.crumbs.len() {
                Style::default().fg(palette::TEXT).add_modifier(Modifier::BOLD)
            } else {
                crumb_style
            };
            spans.push(Span::styled(crumb.label.clone(), style));
        }

        let settings = self.settings();
        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let width = area.width as usize;
        let pad = width
            .saturating_sub(used)
            .saturating_sub(settings.chars().count());
        if pad > 0 {
            spans.push(Span::raw(" ".repeat(pad)));
            spans.push(Span::styled(settings, Style::default().fg(palette::ACCENT)));
        }

        let line = Line::from(spans);
        buf.set_style(area, Style::default().bg(palette::BASE));
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

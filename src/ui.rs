use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders},
    Frame,
};

use crate::app::{App, Focus, InputMode};
use crate::components::content::{entry_height, ContentWidget, Footer};
use crate::components::header::{crumb_spans, HeaderWidget};
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::FolderTreeWidget;
use crate::palette;

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let color = if focused {
        palette::BORDER_FOCUSED
    } else {
        palette::BORDER
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);
    let (header, body, status) = (rows[0], rows[1], rows[2]);

    let (tree_area, content_area) = if app.is_mobile() {
        (Rect::default(), body)
    } else {
        let pane = app.pane_width();
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(pane),
                Constraint::Percentage(100 - pane),
            ])
            .split(body);
        (cols[0], cols[1])
    };

    app.layout.header_row = header.y;
    app.layout.crumbs = crumb_spans(&app.renderer().snapshot.crumbs, header.x);
    app.layout.tree = tree_area;
    app.layout.content = content_area;

    frame.render_widget(HeaderWidget::new(&app.renderer().snapshot), header);

    let focus = app.effective_focus();
    if !app.is_mobile() {
        app.update_scroll(Focus::Tree, tree_area.height.saturating_sub(2) as usize);
        let tree = FolderTreeWidget::new(app.tree_rows(), app.tree_cursor, app.tree_scroll)
            .focused(focus == Focus::Tree)
            .block(pane_block(" Folders ".to_string(), focus == Focus::Tree));
        frame.render_widget(tree, tree_area);
    }

    let snapshot = &app.renderer().snapshot;
    let footer = if app.is_mobile() && snapshot.total_pages > 1 {
        Footer::Pages(snapshot.page_buttons.clone())
    } else if snapshot.deferred > 0 {
        Footer::Deferred(snapshot.deferred)
    } else {
        Footer::None
    };
    let footer_rows = u16::from(!matches!(footer, Footer::None));
    let format = snapshot.format;
    let visible = content_area.height.saturating_sub(2 + footer_rows) / entry_height(format);
    app.update_scroll(Focus::Content, visible as usize);

    let snapshot = &app.renderer().snapshot;
    let title = format!(" {} ", if snapshot.folder.is_empty() { "/" } else { &snapshot.folder });
    let content = ContentWidget::new(&snapshot.entries, format, app.content_cursor, app.content_scroll)
        .focused(focus == Focus::Content)
        .footer(footer)
        .block(pane_block(title, focus == Focus::Content));
    frame.render_widget(content, content_area);

    let mut info = format!("{} of {} items", snapshot.filtered_len, snapshot.total_items);
    if app.is_mobile() && snapshot.total_pages > 0 {
        info.push_str(&format!(" · page {}/{}", snapshot.current_page, snapshot.total_pages));
    }
    let mut bar = StatusBarWidget::new(&snapshot.folder, &info);
    if !app.watcher_active {
        bar = bar.watcher_status("[watch off]");
    }
    if let Some(msg) = &app.renderer().status {
        bar = bar.status_message(&msg.text, msg.is_error);
    }
    match app.input_mode {
        InputMode::Filter => bar = bar.prompt("/", &app.input),
        InputMode::PageJump => bar = bar.prompt("page: ", &app.input),
        InputMode::Normal => {}
    }
    frame.render_widget(bar, status);
}

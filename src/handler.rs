use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{App, InputMode};

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_key(app, key),
        InputMode::Filter | InputMode::PageJump => handle_input_key(app, key),
    }
}

fn handle_normal_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Tab => app.switch_focus(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::PageDown => app.move_cursor(10),
        KeyCode::PageUp => app.move_cursor(-10),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.activate_selected(),
        KeyCode::Char(' ') => app.toggle_selected(),
        KeyCode::Backspace | KeyCode::Char('u') | KeyCode::Char('h') | KeyCode::Left => app.go_up(),
        KeyCode::Char('r') | KeyCode::F(5) => app.refresh(),
        KeyCode::Char('/') => app.begin_filter(),
        KeyCode::Char('s') => app.cycle_sort(),
        KeyCode::Char('R') => app.reverse_items(),
        KeyCode::Char('f') => app.cycle_format(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_depth(1),
        KeyCode::Char('-') => app.adjust_depth(-1),
        KeyCode::Char('n') => app.next_page(),
        KeyCode::Char('p') => app.prev_page(),
        KeyCode::Char('g') => app.begin_page_jump(),
        KeyCode::Char('m') => app.load_more(),
        KeyCode::Char('L') => app.toggle_layout(),
        KeyCode::Char('w') => app.toggle_watcher(),
        KeyCode::Char('[') => app.adjust_pane_width(-5),
        KeyCode::Char(']') => app.adjust_pane_width(5),
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            app.press_button(index);
        }
        _ => {}
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.confirm_input(),
        KeyCode::Esc => app.cancel_input(),
        KeyCode::Backspace => app.input_backspace(),
        KeyCode::Char(c) => app.input_char(c),
        _ => {}
    }
}

/// Handle a mouse event.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.click(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.move_cursor(3),
        MouseEventKind::ScrollUp => app.move_cursor(-3),
        _ => {}
    }
}

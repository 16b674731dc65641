//! Console pane: prompt, scrollback log, input line and completion
//! dropdown.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use tdconsole_util::shell_lexing::tokenize;
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Effect, LifecycleOp};
use crate::theme;

/// Handle a key event while the console pane has focus.
pub fn handle_key(app: &mut App, key: KeyEvent) -> Vec<Effect> {
    match key.code {
        KeyCode::Char(ch) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            app.insert_char(ch);
            Vec::new()
        }
        KeyCode::Backspace => {
            app.backspace();
            Vec::new()
        }
        KeyCode::Left => {
            app.move_cursor_left();
            Vec::new()
        }
        KeyCode::Right => {
            app.move_cursor_right();
            Vec::new()
        }
        KeyCode::Down => {
            app.select_next();
            Vec::new()
        }
        KeyCode::Up => {
            app.select_previous();
            Vec::new()
        }
        KeyCode::Tab => {
            if app.popup_open {
                app.accept_selected();
            } else {
                app.rebuild_suggestions();
            }
            Vec::new()
        }
        KeyCode::Esc => {
            app.clear_input();
            Vec::new()
        }
        KeyCode::Enter => submit(app),
        _ => Vec::new(),
    }
}

/// Execute the current input line: built-ins inline, anything else as a
/// streamed subprocess.
fn submit(app: &mut App) -> Vec<Effect> {
    let command = app.input.trim().to_string();
    app.clear_input();
    if command.is_empty() {
        return Vec::new();
    }
    app.push_log(format!("$ {command}"));

    match command.as_str() {
        "clear" => {
            app.log.clear();
            app.dirty = true;
            return Vec::new();
        }
        "exit" | "quit" => return vec![Effect::Exit],
        _ => {}
    }

    let words: Vec<String> = tokenize(&command).into_iter().map(|token| token.text).collect();
    if words.is_empty() {
        return Vec::new();
    }
    app.executing = true;
    vec![Effect::Run(LifecycleOp::Command(words))]
}

/// Render the console pane: log above, input line below, dropdown overlaid
/// under the input.
pub fn render(frame: &mut Frame, area: Rect, app: &App, focused: bool) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::border_style(focused))
        .title(Span::styled(" Console ", theme::title_style()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let splits = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    render_log(frame, splits[0], app);
    render_input(frame, splits[1], app, focused);

    if focused && app.popup_open && !app.suggestions.is_empty() {
        render_dropdown(frame, splits[1], area, app);
    }
}

fn render_log(frame: &mut Frame, area: Rect, app: &App) {
    let height = area.height as usize;
    let start = app.log.len().saturating_sub(height);
    let lines: Vec<Line> = app.log[start..]
        .iter()
        .map(|entry| {
            if entry.starts_with("$ ") {
                Line::from(Span::styled(entry.clone(), theme::title_style()))
            } else {
                Line::from(Span::styled(entry.clone(), theme::text_style()))
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App, focused: bool) {
    let mut spans: Vec<Span> = Vec::new();
    if app.executing {
        let frames = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        let symbol = frames[app.throbber_idx % frames.len()];
        spans.push(Span::styled(format!("{symbol} "), theme::title_style()));
    } else {
        spans.push(Span::styled("> ", theme::title_style()));
    }
    spans.push(Span::styled(app.input.as_str(), theme::text_style()));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);

    if focused {
        let column = UnicodeWidthStr::width(&app.input[..app.cursor]) as u16 + 2;
        frame.set_cursor_position((area.x.saturating_add(column), area.y));
    }
}

fn render_dropdown(frame: &mut Frame, input_area: Rect, pane_area: Rect, app: &App) {
    let max_rows = 8usize;
    let rows = app.suggestions.len().min(max_rows) as u16;
    if rows == 0 {
        return;
    }

    // Prefer opening below the input; flip above when there is no room.
    let below_space = pane_area.bottom().saturating_sub(input_area.y + 1);
    let y = if below_space >= rows {
        input_area.y + 1
    } else {
        input_area.y.saturating_sub(rows)
    };
    let width = pane_area.width.saturating_sub(2).min(40).max(10);
    let popup = Rect::new(input_area.x, y, width, rows);

    let items: Vec<ListItem> = app
        .suggestions
        .iter()
        .map(|candidate| ListItem::new(candidate.clone()).style(theme::text_style()))
        .collect();
    let list = List::new(items)
        .highlight_style(theme::list_highlight_style())
        .highlight_symbol("► ");
    let mut state = ListState::default();
    state.select(Some(app.selected.min(app.suggestions.len() - 1)));

    frame.render_widget(ratatui::widgets::Clear, popup);
    frame.render_stateful_widget(list, popup, &mut state);
}

//! Instances panel: discovered instances with lifecycle keybindings.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};
use tdconsole_types::InstanceRecord;

use crate::app::{App, Effect, LifecycleOp};
use crate::theme;

/// Handle a key event while the instances panel has focus.
///
/// Bindings: Up/Down select, `r` re-sync from disk, `b`/Enter bind the
/// working instance, `s` start, `x` stop, `i` status, `d` delete, `l`
/// login, `o` logout.
pub fn handle_key(app: &mut App, key: KeyEvent) -> Vec<Effect> {
    match key.code {
        KeyCode::Down => {
            if !app.instances.is_empty() {
                app.instance_selected = (app.instance_selected + 1) % app.instances.len();
                app.dirty = true;
            }
            Vec::new()
        }
        KeyCode::Up => {
            if !app.instances.is_empty() {
                app.instance_selected =
                    (app.instance_selected + app.instances.len() - 1) % app.instances.len();
                app.dirty = true;
            }
            Vec::new()
        }
        KeyCode::Char('r') => vec![Effect::SyncInstances],
        KeyCode::Char('b') | KeyCode::Enter => match app.selected_instance() {
            Some(record) => vec![Effect::BindWorking(record.name.clone())],
            None => Vec::new(),
        },
        KeyCode::Char('s') => run_on_selected(app, |record| LifecycleOp::Start(record.name.clone())),
        KeyCode::Char('x') => run_on_selected(app, |record| LifecycleOp::Stop(record.name.clone())),
        KeyCode::Char('i') => run_on_selected(app, |record| LifecycleOp::Status(record.name.clone())),
        KeyCode::Char('d') => run_on_selected(app, |record| LifecycleOp::Delete(record.clone())),
        KeyCode::Char('l') => run_on_selected(app, |record| LifecycleOp::Login(record.clone())),
        KeyCode::Char('o') => {
            app.executing = true;
            app.dirty = true;
            vec![Effect::Run(LifecycleOp::Logout)]
        }
        _ => Vec::new(),
    }
}

fn run_on_selected<F>(app: &mut App, build: F) -> Vec<Effect>
where
    F: FnOnce(&InstanceRecord) -> LifecycleOp,
{
    match app.selected_instance() {
        Some(record) => {
            let op = build(record);
            app.executing = true;
            app.dirty = true;
            vec![Effect::Run(op)]
        }
        None => Vec::new(),
    }
}

/// Render the panel as one line per instance.
pub fn render(frame: &mut Frame, area: Rect, app: &App, focused: bool) {
    let title = match app.working_instance() {
        Some(record) => format!(" Instances (working: {}) ", record.name),
        None => " Instances (no working instance) ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::border_style(focused))
        .title(Span::styled(title, theme::title_style()));

    let items: Vec<ListItem> = if app.instances.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No instances found under ~/.tabsdata/instances — press 'r' to re-scan",
            theme::text_muted(),
        )))]
    } else {
        app.instances.iter().map(instance_line).collect()
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(theme::list_highlight_style())
        .highlight_symbol("► ");
    let mut state = ListState::default();
    if !app.instances.is_empty() {
        state.select(Some(app.instance_selected.min(app.instances.len() - 1)));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn instance_line(record: &InstanceRecord) -> ListItem<'static> {
    let marker = if record.working { "*" } else { " " };
    let pid = record.pid.map(|pid| pid.to_string()).unwrap_or_else(|| "-".to_string());
    let text = format!(
        "{marker} {:<18} {:<12} pid {:<8} ext {:<21} int {}",
        record.name,
        record.status.to_string(),
        pid,
        record.ext_socket(),
        record.int_socket(),
    );
    ListItem::new(Line::from(Span::styled(text, theme::text_style())))
}

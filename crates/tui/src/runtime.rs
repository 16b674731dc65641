//! Runtime: terminal lifecycle, event loop and effect execution.
//!
//! A dedicated task blocks on `crossterm::event::read()` and forwards
//! events over a channel; the main loop multiplexes terminal input,
//! subprocess output and the animation ticker with `tokio::select!` and
//! renders only when the app marks itself dirty. Lifecycle subprocesses
//! and catalog refreshes run in spawned tasks and report back through the
//! shared exec-event channel, so the loop never blocks on I/O.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    layout::{Constraint, Direction, Layout},
    prelude::CrosstermBackend,
};
use tdconsole_api::TabsdataClient;
use tdconsole_engine::catalog::CatalogCache;
use tdconsole_engine::instances::{InstanceStore, lifecycle};
use tdconsole_types::{Credentials, ExecEvent};
use tokio::{
    signal,
    sync::mpsc,
    time::{self, MissedTickBehavior},
};

use crate::app::{App, Effect, LifecycleOp, Pane};
use crate::{console, instances};

/// Spawn the task that owns terminal input and forwards events.
///
/// Keeping `poll()` and `read()` together avoids lost or delayed events in
/// some terminals; the 16 ms poll keeps shutdown responsive.
fn spawn_input_task() -> mpsc::Receiver<Event> {
    let (sender, receiver) = mpsc::channel(500);
    tokio::spawn(async move {
        let poll_interval = Duration::from_millis(16);
        loop {
            if matches!(event::poll(poll_interval), Ok(true)) {
                match event::read() {
                    Ok(event) => {
                        if sender.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!("failed to read terminal event: {error}");
                        break;
                    }
                }
            }
        }
    });
    receiver
}

/// Put the terminal into raw mode and enter the alternate screen.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<std::io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal settings and leave the alternate screen.
fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn render(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| {
        let instance_rows = app.instances.len().clamp(1, 8) as u16 + 2;
        let splits = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(instance_rows), Constraint::Min(5)])
            .split(frame.area());
        instances::render(frame, splits[0], app, app.pane == Pane::Instances);
        console::render(frame, splits[1], app, app.pane == Pane::Console);
    })?;
    Ok(())
}

fn handle_input_event(app: &mut App, input_event: Event) -> Vec<Effect> {
    match input_event {
        Event::Key(key_event) => handle_key_event(app, key_event),
        Event::Resize(..) => {
            app.dirty = true;
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn handle_key_event(app: &mut App, key: KeyEvent) -> Vec<Effect> {
    // Pane toggle is global so it works regardless of focus.
    if key.code == KeyCode::Char('t') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.pane = match app.pane {
            Pane::Console => Pane::Instances,
            Pane::Instances => Pane::Console,
        };
        app.dirty = true;
        return Vec::new();
    }
    match app.pane {
        Pane::Console => console::handle_key(app, key),
        Pane::Instances => instances::handle_key(app, key),
    }
}

/// Entry point: set up the terminal, run the event loop, tear down.
pub async fn run_app(store: Arc<InstanceStore>) -> Result<()> {
    let mut input_receiver = spawn_input_task();
    let (exec_sender, mut exec_receiver) = mpsc::unbounded_channel::<ExecEvent>();

    let mut app = App::new(store);
    app.reload_instances();
    let mut terminal = setup_terminal()?;

    let mut effects: Vec<Effect> = vec![Effect::RefreshCatalog];

    let mut ticker = time::interval(Duration::from_millis(100));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    render(&mut terminal, &mut app)?;
    app.dirty = false;

    loop {
        if !effects.is_empty() {
            let batch: Vec<Effect> = effects.drain(..).collect();
            execute_effects(&mut app, batch, &exec_sender, &mut effects);
        }
        if app.should_exit {
            break;
        }

        tokio::select! {
            maybe_event = input_receiver.recv() => {
                let Some(input_event) = maybe_event else { break };
                if let Event::Key(key_event) = &input_event
                    && key_event.code == KeyCode::Char('c')
                    && key_event.modifiers.contains(KeyModifiers::CONTROL)
                {
                    break;
                }
                effects.extend(handle_input_event(&mut app, input_event));
            }
            maybe_exec = exec_receiver.recv() => {
                if let Some(exec_event) = maybe_exec {
                    let finished = matches!(exec_event, ExecEvent::Exited(_));
                    app.on_exec_event(exec_event);
                    if finished {
                        // Lifecycle commands change on-disk state.
                        app.reload_instances();
                    }
                }
            }
            _ = ticker.tick() => {
                if app.executing {
                    app.throbber_idx = app.throbber_idx.wrapping_add(1);
                    app.dirty = true;
                }
            }
            _ = signal::ctrl_c() => { break; }
        }

        if app.dirty {
            render(&mut terminal, &mut app)?;
            app.dirty = false;
        }
    }

    cleanup_terminal(&mut terminal)?;
    Ok(())
}

fn execute_effects(app: &mut App, batch: Vec<Effect>, exec_sender: &lifecycle::EventSender, queued: &mut Vec<Effect>) {
    for effect in batch {
        match effect {
            Effect::Exit => app.should_exit = true,
            Effect::SyncInstances => app.reload_instances(),
            Effect::BindWorking(name) => {
                match app.store.set_working(&name) {
                    Ok(true) => {
                        app.push_log(format!("Bound working instance: {name}"));
                        app.catalog.clear();
                        queued.push(Effect::RefreshCatalog);
                    }
                    Ok(false) => app.push_log(format!("Unknown instance: {name}")),
                    Err(error) => app.push_log(format!("Failed to bind {name}: {error}")),
                }
                app.reload_instances();
            }
            Effect::RefreshCatalog => {
                if let Some(working) = app.working_instance() {
                    spawn_catalog_refresh(working.server_url(), app.credentials.clone(), app.catalog.clone(), exec_sender.clone());
                }
            }
            Effect::Run(op) => {
                spawn_lifecycle(op, app.credentials.clone(), exec_sender.clone());
            }
        }
    }
}

fn spawn_lifecycle(op: LifecycleOp, credentials: Credentials, sender: lifecycle::EventSender) {
    tokio::spawn(async move {
        let result = match &op {
            LifecycleOp::Start(name) => lifecycle::start_instance(name, &sender).await,
            LifecycleOp::Stop(name) => lifecycle::stop_instance(name, &sender).await,
            LifecycleOp::Status(name) => lifecycle::status_instance(name, &sender).await,
            LifecycleOp::Delete(record) => lifecycle::delete_instance(record, &sender).await,
            LifecycleOp::Login(record) => lifecycle::login(record, &credentials, &sender).await,
            LifecycleOp::Logout => lifecycle::logout(&sender).await,
            LifecycleOp::Command(words) => {
                let args: Vec<&str> = words.iter().skip(1).map(String::as_str).collect();
                lifecycle::run_streamed(&words[0], &args, &sender).await
            }
        };
        if let Err(error) = result {
            let _ = sender.send(ExecEvent::Line(format!("Command failed: {error}")));
            let _ = sender.send(ExecEvent::Exited(-1));
        }
    });
}

fn spawn_catalog_refresh(server_url: String, credentials: Credentials, catalog: Arc<CatalogCache>, sender: lifecycle::EventSender) {
    tokio::spawn(async move {
        let refreshed = async {
            let client = TabsdataClient::connect(&server_url, &credentials).await?;
            client.auth_info().await?;
            client.fetch_catalog().await
        }
        .await;
        match refreshed {
            Ok(snapshot) => {
                let count = snapshot.collections.len();
                catalog.replace(snapshot);
                let _ = sender.send(ExecEvent::Line(format!("Catalog refreshed ({count} collections)")));
            }
            Err(error) => {
                // Completion degrades to the previous snapshot; just log.
                tracing::warn!(%error, "catalog refresh failed");
                let _ = sender.send(ExecEvent::Line(format!("Catalog refresh failed: {error}")));
            }
        }
    });
}

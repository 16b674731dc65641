//! Application state shared by both panes.

use std::sync::Arc;

use tdconsole_engine::catalog::{CatalogCache, CatalogResolver};
use tdconsole_engine::complete::CompletionEngine;
use tdconsole_engine::instances::InstanceStore;
use tdconsole_types::{Credentials, ExecEvent, InstanceRecord};
use tracing::warn;

/// Which pane has focus.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Pane {
    Console,
    Instances,
}

/// Lifecycle work the runtime executes off the event loop.
#[derive(Clone, Debug)]
pub enum LifecycleOp {
    Start(String),
    Stop(String),
    Status(String),
    Delete(InstanceRecord),
    Login(InstanceRecord),
    Logout,
    /// Ad-hoc command typed into the console, already tokenized.
    Command(Vec<String>),
}

/// Side effects returned by key handlers for the runtime to execute.
#[derive(Clone, Debug)]
pub enum Effect {
    Run(LifecycleOp),
    SyncInstances,
    RefreshCatalog,
    BindWorking(String),
    Exit,
}

/// Mutable state of the whole TUI.
pub struct App {
    pub pane: Pane,
    pub input: String,
    /// Byte offset of the cursor within `input`.
    pub cursor: usize,
    pub suggestions: Vec<String>,
    pub selected: usize,
    pub popup_open: bool,
    pub log: Vec<String>,
    pub instances: Vec<InstanceRecord>,
    pub instance_selected: usize,
    pub executing: bool,
    pub throbber_idx: usize,
    pub dirty: bool,
    pub should_exit: bool,
    pub engine: CompletionEngine,
    pub store: Arc<InstanceStore>,
    pub catalog: Arc<CatalogCache>,
    pub credentials: Credentials,
}

impl App {
    pub fn new(store: Arc<InstanceStore>) -> Self {
        let catalog = Arc::new(CatalogCache::new());
        let resolver = CatalogResolver::new(catalog.clone(), store.clone());
        let engine = CompletionEngine::new(Arc::new(resolver));
        Self {
            pane: Pane::Console,
            input: String::new(),
            cursor: 0,
            suggestions: Vec::new(),
            selected: 0,
            popup_open: false,
            log: vec!["Built-ins: clear, exit".to_string()],
            instances: Vec::new(),
            instance_selected: 0,
            executing: false,
            throbber_idx: 0,
            dirty: true,
            should_exit: false,
            engine,
            store,
            catalog,
            credentials: Credentials::default(),
        }
    }

    /// Recompute the dropdown from the full input text.
    pub fn rebuild_suggestions(&mut self) {
        self.suggestions = self.engine.complete(&self.input);
        if self.selected >= self.suggestions.len() {
            self.selected = 0;
        }
        self.popup_open = !self.suggestions.is_empty();
        self.dirty = true;
    }

    pub fn insert_char(&mut self, ch: char) {
        self.input.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        self.rebuild_suggestions();
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let previous = self.input[..self.cursor].chars().next_back();
        if let Some(ch) = previous {
            self.cursor -= ch.len_utf8();
            self.input.remove(self.cursor);
        }
        self.rebuild_suggestions();
    }

    pub fn move_cursor_left(&mut self) {
        if let Some(ch) = self.input[..self.cursor].chars().next_back() {
            self.cursor -= ch.len_utf8();
            self.dirty = true;
        }
    }

    pub fn move_cursor_right(&mut self) {
        if let Some(ch) = self.input[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
            self.dirty = true;
        }
    }

    /// Replace the trailing token with the selected suggestion and rebuild
    /// so the dropdown advances to the next level.
    pub fn accept_selected(&mut self) {
        let Some(chosen) = self.suggestions.get(self.selected).cloned() else {
            return;
        };
        self.input = CompletionEngine::apply_completion(&self.input, &chosen);
        self.cursor = self.input.len();
        self.selected = 0;
        self.rebuild_suggestions();
    }

    pub fn select_next(&mut self) {
        if !self.suggestions.is_empty() {
            self.selected = (self.selected + 1) % self.suggestions.len();
            self.dirty = true;
        }
    }

    pub fn select_previous(&mut self) {
        if !self.suggestions.is_empty() {
            self.selected = (self.selected + self.suggestions.len() - 1) % self.suggestions.len();
            self.dirty = true;
        }
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
        self.suggestions.clear();
        self.selected = 0;
        self.popup_open = false;
        self.dirty = true;
    }

    pub fn push_log(&mut self, line: String) {
        self.log.push(line);
        // Bound scrollback.
        if self.log.len() > 1000 {
            let excess = self.log.len() - 1000;
            self.log.drain(..excess);
        }
        self.dirty = true;
    }

    pub fn on_exec_event(&mut self, event: ExecEvent) {
        match event {
            ExecEvent::Line(line) => self.push_log(line),
            ExecEvent::Exited(code) => {
                if code != 0 {
                    self.push_log(format!("[exit code: {code}]"));
                }
                self.executing = false;
                self.dirty = true;
            }
        }
    }

    /// Reload the instances panel from the store, clamping the selection.
    pub fn reload_instances(&mut self) {
        match self.store.sync_from_filesystem() {
            Ok(records) => self.instances = records,
            Err(error) => {
                warn!(%error, "instance sync failed");
                self.push_log(format!("Instance sync failed: {error}"));
                self.instances = self.store.list();
            }
        }
        if self.instance_selected >= self.instances.len() {
            self.instance_selected = self.instances.len().saturating_sub(1);
        }
        self.dirty = true;
    }

    pub fn selected_instance(&self) -> Option<&InstanceRecord> {
        self.instances.get(self.instance_selected)
    }

    pub fn working_instance(&self) -> Option<InstanceRecord> {
        self.store.working()
    }
}

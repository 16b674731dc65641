//! # tdconsole TUI
//!
//! Terminal user interface for administering Tabsdata instances. Two
//! panes: a console with a shell-like input box, completion dropdown and
//! scrollback log, and an instances panel listing discovered instances
//! with lifecycle keybindings.
//!
//! The TUI follows a small message-free variant of the component pattern:
//! each pane exposes `handle_key` returning [`app::Effect`]s and a
//! `render` function; the runtime owns the terminal, routes input, and
//! executes effects (subprocess spawns, catalog refreshes) off the event
//! loop.

mod app;
mod console;
mod instances;
mod runtime;
mod theme;

use std::sync::Arc;

use anyhow::Result;
use tdconsole_engine::instances::InstanceStore;

/// Run the TUI until the user exits. Owns terminal setup and teardown.
pub async fn run(store: Arc<InstanceStore>) -> Result<()> {
    runtime::run_app(store).await
}

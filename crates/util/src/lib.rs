//! Utility helpers shared across the tdconsole workspace: shell-like
//! lexing for the console input, YAML instance-config editing, tabsdata
//! filesystem path resolution, and input validation.

pub mod paths;
pub mod shell_lexing;
pub mod validate;
pub mod yaml_config;

use std::path::PathBuf;

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs_next::home_dir()
    {
        return home.join(rest);
    }
    if path == "~"
        && let Some(home) = dirs_next::home_dir()
    {
        return home;
    }
    PathBuf::from(path)
}

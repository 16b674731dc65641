//! Well-known tabsdata filesystem locations.
//!
//! Instances live under `~/.tabsdata/instances/<name>`; each instance keeps
//! its apiserver pid and config at fixed relative paths inside its
//! workspace. Callers are expected to handle missing files — a path being
//! resolvable does not imply it exists.

use std::path::PathBuf;

/// Relative path from an instance directory to the apiserver pid file.
const PID_RELATIVE: &str = "workspace/work/proc/regular/apiserver/work/pid";
/// Relative path from an instance directory to the apiserver config file.
const CONFIG_RELATIVE: &str = "workspace/config/proc/regular/apiserver/config/config.yaml";

/// Root of all tabsdata state (`~/.tabsdata`).
pub fn tabsdata_root() -> PathBuf {
    dirs_next::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".tabsdata")
}

/// Directory containing all instance directories.
pub fn instances_dir() -> PathBuf {
    tabsdata_root().join("instances")
}

/// Directory of a single named instance.
pub fn instance_dir(name: &str) -> PathBuf {
    instances_dir().join(name)
}

/// Pid file of the instance's apiserver process.
pub fn instance_pid_path(name: &str) -> PathBuf {
    instance_dir(name).join(PID_RELATIVE)
}

/// The instance's apiserver `config.yaml`.
pub fn instance_config_path(name: &str) -> PathBuf {
    instance_dir(name).join(CONFIG_RELATIVE)
}

//! Filesystem discovery of tabsdata instances.
//!
//! An instance is a directory under `~/.tabsdata/instances/` whose subtree
//! contains a `tabsdata.db` marker file. Liveness is judged from the
//! apiserver pid file plus a zero-signal probe; the effective listen
//! sockets come from the running process's arguments when available,
//! falling back to the configured addresses in `config.yaml`.

use std::fs;
use std::path::Path;

use tdconsole_types::{DEFAULT_EXTERNAL_PORT, DEFAULT_INTERNAL_PORT, InstanceRecord, InstanceStatus, LOOPBACK_HOST};
use tdconsole_util::{paths, yaml_config};
use tracing::debug;

/// File that marks a directory subtree as an instance.
pub const INSTANCE_MARKER_FILE: &str = "tabsdata.db";

/// Names of every instance found on disk, sorted.
pub fn discover_instance_names() -> Vec<String> {
    let root = paths::instances_dir();
    let entries = match fs::read_dir(&root) {
        Ok(entries) => entries,
        Err(error) => {
            debug!(root = %root.display(), %error, "no instances directory");
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter(|entry| subtree_contains_marker(&entry.path()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

fn subtree_contains_marker(dir: &Path) -> bool {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return false,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && entry.file_name() == INSTANCE_MARKER_FILE {
            return true;
        }
        if path.is_dir() && subtree_contains_marker(&path) {
            return true;
        }
    }
    false
}

/// Pid recorded for the instance's apiserver, if the pid file exists and
/// parses.
pub fn read_instance_pid(name: &str) -> Option<u32> {
    let raw = fs::read_to_string(paths::instance_pid_path(name)).ok()?;
    raw.trim().parse().ok()
}

fn pid_alive(pid: u32) -> bool {
    // Signal 0 performs the permission/existence check without delivering
    // anything.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

/// Argument value the running process was started with, read from
/// `/proc/<pid>/cmdline`.
fn process_arg(pid: u32, flag: &str) -> Option<String> {
    let raw = fs::read(format!("/proc/{pid}/cmdline")).ok()?;
    let args: Vec<&str> = raw
        .split(|byte| *byte == 0)
        .filter_map(|part| std::str::from_utf8(part).ok())
        .collect();
    let position = args.iter().position(|arg| *arg == flag)?;
    args.get(position + 1).map(|value| value.to_string())
}

/// Build a record for a named instance from filesystem state only; no
/// store interaction.
pub fn inspect_instance(name: &str) -> InstanceRecord {
    let config = paths::instance_config_path(name);
    let cfg_ext = yaml_config::get_value(&config, "addresses").ok().flatten();
    let cfg_int = yaml_config::get_value(&config, "internal_addresses").ok().flatten();

    let pid = read_instance_pid(name);
    let running = pid.is_some_and(pid_alive);
    let status = if running {
        InstanceStatus::Running
    } else {
        InstanceStatus::NotRunning
    };

    // A running process may have been started with explicit addresses that
    // override its config.
    let arg_ext_socket = pid
        .filter(|_| running)
        .and_then(|pid| process_arg(pid, "--address"))
        .or_else(|| cfg_ext.clone());
    let arg_int_socket = pid
        .filter(|_| running)
        .and_then(|pid| process_arg(pid, "--internal-address"))
        .or_else(|| cfg_int.clone());

    let (public_ip, arg_ext) = split_socket(arg_ext_socket.as_deref(), DEFAULT_EXTERNAL_PORT);
    let (private_ip, arg_int) = split_socket(arg_int_socket.as_deref(), DEFAULT_INTERNAL_PORT);

    InstanceRecord {
        name: name.to_string(),
        pid,
        working: false,
        status,
        cfg_ext,
        cfg_int,
        arg_ext,
        arg_int,
        public_ip,
        private_ip,
        use_https: false,
    }
}

/// Full filesystem sweep: one record per discovered instance.
pub fn discover_all() -> Vec<InstanceRecord> {
    discover_instance_names().iter().map(|name| inspect_instance(name)).collect()
}

fn split_socket(socket: Option<&str>, default_port: &str) -> (String, String) {
    match socket {
        Some(socket) if socket.contains(':') => {
            let mut parts = socket.rsplitn(2, ':');
            let port = parts.next().unwrap_or(default_port).to_string();
            let host = parts.next().unwrap_or(LOOPBACK_HOST).to_string();
            (host, port)
        }
        Some(port) if !port.is_empty() => (LOOPBACK_HOST.to_string(), port.to_string()),
        _ => (LOOPBACK_HOST.to_string(), default_port.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn split_socket_handles_all_shapes() {
        assert_eq!(split_socket(Some("10.0.0.5:9000"), "2457"), ("10.0.0.5".into(), "9000".into()));
        assert_eq!(split_socket(Some("9000"), "2457"), ("127.0.0.1".into(), "9000".into()));
        assert_eq!(split_socket(None, "2457"), ("127.0.0.1".into(), "2457".into()));
        assert_eq!(split_socket(Some(""), "2458"), ("127.0.0.1".into(), "2458".into()));
    }

    #[test]
    fn marker_is_found_anywhere_in_the_subtree() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("workspace").join("data");
        fs::create_dir_all(&nested).unwrap();
        assert!(!subtree_contains_marker(dir.path()));
        fs::write(nested.join(INSTANCE_MARKER_FILE), b"").unwrap();
        assert!(subtree_contains_marker(dir.path()));
    }

    #[test]
    fn own_pid_is_alive() {
        assert!(pid_alive(std::process::id()));
        // Pid far beyond pid_max cannot exist.
        assert!(!pid_alive(999_999_999));
    }
}

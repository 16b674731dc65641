//! Shared type definitions for the tdconsole workspace.
//!
//! These types cross crate boundaries: instance records flow between the
//! filesystem discovery code, the local instance store, the TUI panels and
//! the CLI; the catalog snapshot flows from the API client into the
//! completion engine's resolver.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default external API port for a freshly created instance.
pub const DEFAULT_EXTERNAL_PORT: &str = "2457";
/// Default internal API port for a freshly created instance.
pub const DEFAULT_INTERNAL_PORT: &str = "2458";
/// Loopback address used for locally managed instances.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Lifecycle state of a managed server instance.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum InstanceStatus {
    /// The instance directory exists and its apiserver process is alive.
    Running,
    /// The instance directory exists but no live apiserver process was found.
    #[default]
    NotRunning,
    /// The instance has a name but no directory on disk yet.
    NotCreated,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstanceStatus::Running => "Running",
            InstanceStatus::NotRunning => "Not Running",
            InstanceStatus::NotCreated => "Not Created",
        };
        f.write_str(label)
    }
}

/// A server instance as cached in the local store.
///
/// `cfg_ext`/`cfg_int` hold the addresses configured in the instance's
/// `config.yaml`; `arg_ext`/`arg_int` hold the ports the running process was
/// actually started with (they differ when the process was launched with
/// explicit `--address` arguments). `working` marks the single instance the
/// console is currently bound to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub name: String,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub working: bool,
    #[serde(default)]
    pub status: InstanceStatus,
    #[serde(default)]
    pub cfg_ext: Option<String>,
    #[serde(default)]
    pub cfg_int: Option<String>,
    pub arg_ext: String,
    pub arg_int: String,
    pub public_ip: String,
    pub private_ip: String,
    #[serde(default)]
    pub use_https: bool,
}

impl InstanceRecord {
    /// Record for an instance that only exists as a pending name.
    pub fn not_created(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pid: None,
            working: false,
            status: InstanceStatus::NotCreated,
            cfg_ext: Some(DEFAULT_EXTERNAL_PORT.to_string()),
            cfg_int: Some(DEFAULT_INTERNAL_PORT.to_string()),
            arg_ext: DEFAULT_EXTERNAL_PORT.to_string(),
            arg_int: DEFAULT_INTERNAL_PORT.to_string(),
            public_ip: LOOPBACK_HOST.to_string(),
            private_ip: LOOPBACK_HOST.to_string(),
            use_https: false,
        }
    }

    /// Socket the public API listens on.
    pub fn ext_socket(&self) -> String {
        format!("{}:{}", self.public_ip, self.arg_ext)
    }

    /// Socket the internal supervisor API listens on.
    pub fn int_socket(&self) -> String {
        format!("{}:{}", self.private_ip, self.arg_int)
    }

    /// Base URL of the public API, honoring the https toggle.
    pub fn server_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        format!("{}://{}", scheme, self.ext_socket())
    }
}

/// Coarse grouping of a typed command, used to pick the live data source a
/// flag value should be resolved against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommandScope {
    /// `td table ...` — names resolve against tables.
    Table,
    /// `td fn ...` — names resolve against functions.
    Function,
    /// `tdserver ...` — instance lifecycle commands.
    Server,
}

/// Point-in-time view of the entities known to the bound server.
///
/// Collection names are stored sorted; per-collection table and function
/// lists are keyed by collection name in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub collections: Vec<String>,
    pub tables: IndexMap<String, Vec<String>>,
    pub functions: IndexMap<String, Vec<String>>,
}

impl CatalogSnapshot {
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

/// Credentials used to authenticate against an instance's apiserver, both
/// over HTTP and through `td login`.
#[derive(Clone, Debug, PartialEq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub role: String,
}

impl Default for Credentials {
    /// The administrative identity a freshly created instance ships with.
    fn default() -> Self {
        Self {
            user: "admin".to_string(),
            password: "tabsdata".to_string(),
            role: "sys_admin".to_string(),
        }
    }
}

/// One event emitted by a streamed subprocess execution.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecEvent {
    /// A line of combined stdout/stderr output.
    Line(String),
    /// The process exited with the given code (-1 when killed by a signal).
    Exited(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sockets_join_host_and_port() {
        let record = InstanceRecord::not_created("demo");
        assert_eq!(record.ext_socket(), "127.0.0.1:2457");
        assert_eq!(record.int_socket(), "127.0.0.1:2458");
        assert_eq!(record.server_url(), "http://127.0.0.1:2457");
    }

    #[test]
    fn https_toggle_changes_scheme() {
        let mut record = InstanceRecord::not_created("demo");
        record.use_https = true;
        assert_eq!(record.server_url(), "https://127.0.0.1:2457");
    }

    #[test]
    fn record_roundtrips_through_json() {
        let record = InstanceRecord::not_created("demo");
        let json = serde_json::to_string(&record).unwrap();
        let back: InstanceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn status_display_matches_store_labels() {
        assert_eq!(InstanceStatus::Running.to_string(), "Running");
        assert_eq!(InstanceStatus::NotRunning.to_string(), "Not Running");
        assert_eq!(InstanceStatus::NotCreated.to_string(), "Not Created");
    }
}

//! Instance lifecycle through the external `tdserver` and `td` binaries.
//!
//! Every operation spawns a subprocess and streams its combined
//! stdout/stderr line by line over an unbounded channel, so the console's
//! log pane (or the CLI) can render output as it arrives. The final
//! [`ExecEvent::Exited`] carries the exit code, which each task also
//! returns.

use anyhow::{Context, Result, bail};
use tdconsole_types::{Credentials, ExecEvent, InstanceRecord, InstanceStatus};
use tdconsole_util::{paths, validate, yaml_config};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

/// Server management binary.
pub const TDSERVER_BIN: &str = "tdserver";
/// Client binary used for login/logout.
pub const TD_BIN: &str = "td";

/// Channel end the lifecycle tasks stream their output into.
pub type EventSender = mpsc::UnboundedSender<ExecEvent>;

/// Which of the two port bindings the user edited.
#[derive(Clone, Copy, Debug, Default)]
pub struct PortChanges {
    pub external: bool,
    pub internal: bool,
}

impl PortChanges {
    pub fn any(&self) -> bool {
        self.external || self.internal
    }
}

/// Run `program args...`, forwarding each output line as an event.
/// Returns the exit code (-1 when the process died to a signal).
pub async fn run_streamed(program: &str, args: &[&str], events: &EventSender) -> Result<i32> {
    debug!(%program, ?args, "spawning subprocess");
    let mut child = Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn {program}"))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_task = stdout.map(|reader| tokio::spawn(forward_lines(reader, events.clone())));
    let err_task = stderr.map(|reader| tokio::spawn(forward_lines(reader, events.clone())));

    let status = child.wait().await.with_context(|| format!("wait for {program}"))?;
    if let Some(task) = out_task {
        let _ = task.await;
    }
    if let Some(task) = err_task {
        let _ = task.await;
    }

    let code = status.code().unwrap_or(-1);
    let _ = events.send(ExecEvent::Exited(code));
    Ok(code)
}

async fn forward_lines<R>(reader: R, events: EventSender)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if events.send(ExecEvent::Line(line)).is_err() {
            break;
        }
    }
}

fn checked_name(name: &str) -> Result<&str> {
    if !validate::is_valid_instance_name(name) {
        bail!("invalid instance name '{name}'");
    }
    Ok(name)
}

/// `tdserver create --instance <name>`.
pub async fn create_instance(name: &str, events: &EventSender) -> Result<i32> {
    let name = checked_name(name)?;
    let _ = events.send(ExecEvent::Line(format!("Creating instance {name}...")));
    run_streamed(TDSERVER_BIN, &["create", "--instance", name], events).await
}

/// `tdserver start --instance <name>`.
pub async fn start_instance(name: &str, events: &EventSender) -> Result<i32> {
    let name = checked_name(name)?;
    let _ = events.send(ExecEvent::Line(format!("Starting instance {name}...")));
    run_streamed(TDSERVER_BIN, &["start", "--instance", name], events).await
}

/// `tdserver stop --instance <name>`.
pub async fn stop_instance(name: &str, events: &EventSender) -> Result<i32> {
    let name = checked_name(name)?;
    let _ = events.send(ExecEvent::Line(format!("Stopping instance {name}...")));
    run_streamed(TDSERVER_BIN, &["stop", "--instance", name], events).await
}

/// `tdserver status --instance <name>`.
pub async fn status_instance(name: &str, events: &EventSender) -> Result<i32> {
    let name = checked_name(name)?;
    run_streamed(TDSERVER_BIN, &["status", "--instance", name], events).await
}

/// `tdserver delete --instance <name> --force`, stopping the instance
/// first when it is still running.
pub async fn delete_instance(record: &InstanceRecord, events: &EventSender) -> Result<i32> {
    let name = checked_name(&record.name)?;
    let _ = events.send(ExecEvent::Line(format!("Deleting instance {name}...")));
    if record.status == InstanceStatus::Running {
        stop_instance(name, events).await?;
    }
    run_streamed(TDSERVER_BIN, &["delete", "--instance", name, "--force"], events).await
}

/// `td login` against the instance's public socket.
pub async fn login(record: &InstanceRecord, credentials: &Credentials, events: &EventSender) -> Result<i32> {
    let server = record.server_url();
    let _ = events.send(ExecEvent::Line(format!("Logging in to {}...", record.name)));
    run_streamed(
        TD_BIN,
        &[
            "login",
            "--server",
            &server,
            "--user",
            &credentials.user,
            "--role",
            &credentials.role,
            "--password",
            &credentials.password,
        ],
        events,
    )
    .await
}

/// `td logout`.
pub async fn logout(events: &EventSender) -> Result<i32> {
    run_streamed(TD_BIN, &["logout"], events).await
}

/// Rewrite the instance's configured listen addresses for the ports the
/// user actually changed.
pub fn bind_ports(record: &InstanceRecord, changes: PortChanges, events: &EventSender) -> Result<()> {
    let config = paths::instance_config_path(&record.name);
    let _ = events.send(ExecEvent::Line(format!("Updating port config at {}", config.display())));

    if changes.external {
        let socket = format!("127.0.0.1:{}", record.arg_ext);
        yaml_config::set_list(&config, "addresses", &socket).context("set external address")?;
        let _ = events.send(ExecEvent::Line(format!("Set external address -> {socket}")));
    }
    if changes.internal {
        let socket = format!("127.0.0.1:{}", record.arg_int);
        yaml_config::set_list(&config, "internal_addresses", &socket).context("set internal address")?;
        let _ = events.send(ExecEvent::Line(format!("Set internal address -> {socket}")));
    }
    Ok(())
}

/// Prepare an instance for a config change, based on its status:
/// not-created instances are created, running instances are stopped first
/// when a port changed, anything else needs nothing.
pub async fn prepare_instance(record: &InstanceRecord, changes: PortChanges, events: &EventSender) -> Result<i32> {
    if record.status == InstanceStatus::NotCreated {
        return create_instance(&record.name, events).await;
    }
    if !changes.any() {
        let _ = events.send(ExecEvent::Line(format!(
            "No server preparation steps required (status={}).",
            record.status
        )));
        return Ok(0);
    }
    if record.status == InstanceStatus::Running {
        return stop_instance(&record.name, events).await;
    }
    let _ = events.send(ExecEvent::Line(format!(
        "No server preparation steps required (status={}).",
        record.status
    )));
    Ok(0)
}

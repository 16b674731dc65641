//! tdconsole binary: the TUI by default, plus non-interactive subcommands
//! for instance listing and server lifecycle passthrough.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tdconsole_engine::instances::{InstanceStore, lifecycle};
use tdconsole_types::ExecEvent;
use tdconsole_util::validate;
use tracing::Level;

#[derive(Parser)]
#[command(name = "tdconsole", about = "Interactive console for Tabsdata server instances")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect locally discovered instances.
    Instance {
        #[command(subcommand)]
        action: InstanceAction,
    },
    /// Run a server lifecycle operation and stream its output.
    Server {
        #[command(subcommand)]
        action: ServerAction,
    },
}

#[derive(Subcommand)]
enum InstanceAction {
    /// Sync from the filesystem and print the instance table.
    List,
}

#[derive(Subcommand)]
enum ServerAction {
    Create {
        #[arg(long)]
        instance: String,
    },
    Start {
        #[arg(long)]
        instance: String,
    },
    Stop {
        #[arg(long)]
        instance: String,
    },
    Status {
        #[arg(long)]
        instance: String,
    },
    Delete {
        #[arg(long)]
        instance: String,
    },
    /// Rebind the instance's listen ports and restart it.
    Bind {
        #[arg(long)]
        instance: String,
        /// New external API port.
        #[arg(long)]
        ext_port: Option<String>,
        /// New internal supervisor port.
        #[arg(long)]
        int_port: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let store = Arc::new(InstanceStore::new().unwrap_or_else(|error| {
        tracing::warn!(%error, "instance store unavailable; falling back to in-memory");
        InstanceStore::ephemeral()
    }));

    // No subcommand => TUI
    let Some(command) = cli.command else {
        return tdconsole_tui::run(store).await;
    };

    match command {
        Command::Instance { action } => match action {
            InstanceAction::List => list_instances(&store),
        },
        Command::Server { action } => run_server_action(&store, action).await,
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .try_init();
}

fn list_instances(store: &InstanceStore) -> Result<()> {
    let records = store.sync_from_filesystem().context("sync instances from filesystem")?;
    if records.is_empty() {
        println!("No instances found under ~/.tabsdata/instances");
        return Ok(());
    }
    println!("{:<2}{:<18} {:<12} {:<8} {:<21} {}", "", "NAME", "STATUS", "PID", "EXTERNAL", "INTERNAL");
    for record in records {
        let marker = if record.working { "*" } else { " " };
        let pid = record.pid.map(|pid| pid.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "{marker} {:<18} {:<12} {:<8} {:<21} {}",
            record.name,
            record.status.to_string(),
            pid,
            record.ext_socket(),
            record.int_socket(),
        );
    }
    Ok(())
}

async fn run_server_action(store: &InstanceStore, action: ServerAction) -> Result<()> {
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel::<ExecEvent>();
    let printer = tokio::spawn(async move {
        let mut last_code = 0;
        while let Some(event) = receiver.recv().await {
            match event {
                ExecEvent::Line(line) => println!("{line}"),
                ExecEvent::Exited(code) => last_code = code,
            }
        }
        last_code
    });

    let result = match action {
        ServerAction::Create { instance } => {
            let records = store.sync_from_filesystem().context("sync instances from filesystem")?;
            if validate::name_in_use(&records, &instance) {
                bail!("instance '{instance}' already exists");
            }
            lifecycle::create_instance(&instance, &sender).await
        }
        ServerAction::Start { instance } => lifecycle::start_instance(&instance, &sender).await,
        ServerAction::Stop { instance } => lifecycle::stop_instance(&instance, &sender).await,
        ServerAction::Status { instance } => lifecycle::status_instance(&instance, &sender).await,
        ServerAction::Delete { instance } => {
            // Delete consults the cached status so a running instance is
            // stopped first.
            store.sync_from_filesystem().context("sync instances from filesystem")?;
            let record = store
                .get(&instance)
                .with_context(|| format!("unknown instance '{instance}'"))?;
            lifecycle::delete_instance(&record, &sender).await
        }
        ServerAction::Bind {
            instance,
            ext_port,
            int_port,
        } => bind_instance_ports(store, &instance, ext_port, int_port, &sender).await,
    };
    drop(sender);
    let last_code = printer.await.unwrap_or(0);

    let code = result?;
    if code != 0 || last_code != 0 {
        bail!("server command exited with code {}", if code != 0 { code } else { last_code });
    }
    Ok(())
}

/// Rewrite an instance's configured listen ports and bring it back up:
/// validate the new ports, stop (or create) the instance as needed, edit
/// its config, start it, and report status.
async fn bind_instance_ports(
    store: &InstanceStore,
    instance: &str,
    ext_port: Option<String>,
    int_port: Option<String>,
    sender: &lifecycle::EventSender,
) -> Result<i32> {
    let records = store.sync_from_filesystem().context("sync instances from filesystem")?;
    let mut record = store
        .get(instance)
        .with_context(|| format!("unknown instance '{instance}'"))?;

    let mut changes = lifecycle::PortChanges::default();
    if let Some(port) = ext_port {
        let port = validate::parse_port(&port).with_context(|| format!("invalid external port '{port}'"))?;
        if let Some(owner) = validate::port_in_use(&records, port, instance) {
            bail!("port {port} is already in use by instance '{owner}'");
        }
        changes.external = record.arg_ext != port.to_string();
        record.arg_ext = port.to_string();
    }
    if let Some(port) = int_port {
        let port = validate::parse_port(&port).with_context(|| format!("invalid internal port '{port}'"))?;
        if port.to_string() == record.arg_ext {
            bail!("internal port must differ from the external port");
        }
        if let Some(owner) = validate::port_in_use(&records, port, instance) {
            bail!("port {port} is already in use by instance '{owner}'");
        }
        changes.internal = record.arg_int != port.to_string();
        record.arg_int = port.to_string();
    }
    if !changes.any() {
        println!("Ports unchanged; nothing to do");
        return Ok(0);
    }

    let code = lifecycle::prepare_instance(&record, changes, sender).await?;
    if code != 0 {
        return Ok(code);
    }
    lifecycle::bind_ports(&record, changes, sender)?;
    let code = lifecycle::start_instance(instance, sender).await?;
    if code != 0 {
        return Ok(code);
    }
    lifecycle::status_instance(instance, sender).await
}

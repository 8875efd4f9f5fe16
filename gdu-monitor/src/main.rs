// SPDX-License-Identifier: GPL-3.0-only

mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use gdu_pool::{OperationResult, Pool, PoolEvent, PresentableTree, notify, tree};
use gdu_types::Operation;
use gdu_udisks::{DeviceEventStream, DiskManager};
use tokio::sync::oneshot;
use tracing::info;

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "gdu-monitor")]
#[command(about = "Show and follow the drives, volumes and free space UDisks2 reports")]
struct Cli {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/gdu-monitor/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the presentable tree once
    Tree {
        /// Print every presentable as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Print every change notification until interrupted
    Watch,
    /// Cancel the job running on a device
    CancelJob { device: String },
    /// Start the RAID array the given components belong to
    MdStart {
        #[arg(required = true)]
        components: Vec<String>,
    },
}

impl Command {
    /// Commands that keep following the daemon after the initial read.
    fn follows_changes(&self) -> bool {
        matches!(self, Command::Watch)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    logging::init(&config);

    let manager = DiskManager::new().await.context("connect to UDisks2")?;
    // Subscribe before the initial read; changes made during it queue up.
    let events = if cli.command.follows_changes() {
        Some(
            manager
                .device_event_stream()
                .await
                .context("subscribe to UDisks2 signals")?,
        )
    } else {
        None
    };
    let pool = Pool::connect(Arc::new(manager.source()), config.pool.clone())
        .await
        .context("read devices from UDisks2")?
        .with_backend(Arc::new(manager.backend()));

    match cli.command {
        Command::Tree { json } => print_tree(&pool, json),
        Command::Watch => watch(pool, events).await,
        Command::CancelJob { device } => {
            let device = resolve_device(&pool, &device)?;
            let result = request(&pool, Operation::CancelJob { device }).await?;
            print_result(result)
        }
        Command::MdStart { components } => {
            let components = components
                .iter()
                .map(|component| resolve_device(&pool, component))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let (sender, receiver) = oneshot::channel();
            pool.md_start(components, move |result| {
                let _ = sender.send(result);
            });
            print_result(receiver.await.context("operation task ended early")?)
        }
    }
}

fn print_tree(pool: &Pool, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&pool.list_all())?);
    } else {
        print!("{}", PresentableTree::from_pool(pool).render(pool));
    }
    Ok(())
}

async fn watch(mut pool: Pool, events: Option<DeviceEventStream>) -> anyhow::Result<()> {
    let mut events = events.context("not subscribed to device events")?;
    let (listener, mut notifications) = notify::channel();
    pool.add_listener(Box::new(listener));

    print_tree(&pool, false)?;
    info!("Watching for device changes, press Ctrl-C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else {
                    break;
                };
                pool.handle_event(event).await;
            }
            _ = &mut ctrl_c => break,
        }

        while let Ok(notification) = notifications.try_recv() {
            println!("{}", describe(&pool, &notification));
        }
    }
    Ok(())
}

fn describe(pool: &Pool, event: &PoolEvent) -> String {
    match event {
        PoolEvent::DeviceAdded(id) => format!("device added     {id}"),
        PoolEvent::DeviceRemoved(id) => format!("device removed   {id}"),
        PoolEvent::DeviceChanged(id) => format!("device changed   {id}"),
        PoolEvent::DeviceJobChanged(id) => {
            let job = pool
                .device(id)
                .map(|record| &record.job)
                .filter(|job| job.in_progress)
                .map(|job| format!(" ({})", job.id))
                .unwrap_or_default();
            format!("job changed      {id}{job}")
        }
        PoolEvent::PresentableAdded(p) => {
            format!("added            {} {}", p.id(), tree::title(pool, p))
        }
        PoolEvent::PresentableRemoved(p) => format!("removed          {}", p.id()),
        PoolEvent::PresentableChanged(p) => {
            format!("changed          {} {}", p.id(), tree::title(pool, p))
        }
        PoolEvent::PresentableJobChanged(p) => format!("job changed      {}", p.id()),
    }
}

/// Accept a device id or a device file such as `/dev/sda1`.
fn resolve_device(pool: &Pool, name: &str) -> anyhow::Result<String> {
    if pool.device(name).is_some() {
        return Ok(name.to_string());
    }
    pool.devices()
        .into_iter()
        .find(|record| record.device_file == name)
        .map(|record| record.id.clone())
        .with_context(|| format!("unknown device {name}"))
}

async fn request(pool: &Pool, operation: Operation) -> anyhow::Result<OperationResult> {
    let (sender, receiver) = oneshot::channel();
    pool.request_operation(operation, move |result| {
        let _ = sender.send(result);
    });
    receiver.await.context("operation task ended early")
}

fn print_result(result: OperationResult) -> anyhow::Result<()> {
    let output = result?;
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_watch_subscribes_to_changes() {
        let watch = Cli::try_parse_from(["gdu-monitor", "watch"]).expect("watch parses");
        assert!(watch.command.follows_changes());

        let tree = Cli::try_parse_from(["gdu-monitor", "tree", "--json"]).expect("tree parses");
        assert!(!tree.command.follows_changes());
    }

    #[test]
    fn md_start_needs_components() {
        assert!(Cli::try_parse_from(["gdu-monitor", "md-start"]).is_err());
        let cli = Cli::try_parse_from(["gdu-monitor", "md-start", "sdb", "sdc"])
            .expect("md-start parses");
        assert!(matches!(cli.command, Command::MdStart { components } if components.len() == 2));
    }
}

//! workbench binary
//!
//! Command-line dispatch over the file system providers.
//!
//! ## Usage
//!
//! ```bash
//! workbench backends
//! workbench ls /src
//! workbench --backend container cat /app/Dockerfile
//! workbench create /notes/todo.md --content "# todo"
//! workbench create /notes/archive --folder
//! workbench rm /notes
//! workbench --backend remote connect
//! ```
//!
//! Configuration comes from the environment (`WORKSPACE_ROOT`,
//! `TARGET_CONTAINER`, `CONTAINER_RUNTIME`, `REMOTE_HOST`, ...). Set
//! `RUST_LOG=debug` for per-operation traces.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use workbench_vfs::{FsError, ItemKind, ProviderRegistry, WorkbenchConfig};

#[derive(Debug, Parser)]
#[command(name = "workbench", version, about = "Browse and edit files across storage backends")]
struct Cli {
    /// Backend to operate on
    #[arg(short, long, global = true, default_value = "local")]
    backend: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List registered backends and their capabilities
    Backends,
    /// List a folder (or describe a single file)
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Print a file's contents
    Cat { path: String },
    /// Create a file or folder
    Create {
        path: String,
        /// Create a folder instead of a file
        #[arg(long)]
        folder: bool,
        /// Initial file content
        #[arg(long, default_value = "", conflicts_with = "folder")]
        content: String,
    },
    /// Recursively delete a file or folder
    Rm { path: String },
    /// Open a session with the remote backend
    Connect,
    /// Close the session with the remote backend
    Disconnect,
    /// Show the container backend's liveness and running containers
    ContainerStatus,
}

#[derive(Debug, Serialize)]
struct ContainerStatus {
    container: String,
    liveness: String,
    running: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<FsError>() {
                Some(fs) => eprintln!("error [{}]: {e:#}", fs.kind()),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = WorkbenchConfig::from_env().context("reading configuration")?;
    let registry = ProviderRegistry::from_config(&config);

    match cli.command {
        Command::Backends => print_json(&registry.descriptors()),
        Command::Ls { path } => {
            let provider = registry.require(&cli.backend)?;
            print_json(&provider.list_files(&path).await?)
        }
        Command::Cat { path } => {
            let provider = registry.require(&cli.backend)?;
            print!("{}", provider.get_file_content(&path).await?);
            Ok(())
        }
        Command::Create {
            path,
            folder,
            content,
        } => {
            let provider = registry.require(&cli.backend)?;
            let kind = if folder { ItemKind::Folder } else { ItemKind::File };
            print_json(&provider.create_item(&path, kind, &content).await?)
        }
        Command::Rm { path } => {
            let provider = registry.require(&cli.backend)?;
            print_json(&provider.delete_item(&path).await?)
        }
        Command::Connect => {
            let remote = registry.remote().context("no remote backend registered")?;
            print_json(&remote.connect().await?)
        }
        Command::Disconnect => {
            let remote = registry.remote().context("no remote backend registered")?;
            print_json(&remote.disconnect().await?)
        }
        Command::ContainerStatus => {
            let container = registry
                .container()
                .context("no container backend registered")?;
            let liveness = container.check_container().await?;
            let running = if liveness.is_running() {
                container.running_containers().await?
            } else {
                Vec::new()
            };
            print_json(&ContainerStatus {
                container: container.container().to_string(),
                liveness: liveness.to_string(),
                running,
            })
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

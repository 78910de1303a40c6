//! kubequeue CLI tool.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "kubequeue")]
#[command(about = "Admit and reap Kubernetes jobs for a work queue", long_about = None)]
struct Cli {
    /// Settings file
    #[arg(long, env = "KUBEQUEUE_CONFIG")]
    config: Option<String>,

    /// Environment this host runs in, checked against the settings allow-list
    #[arg(long, env = "KUBEQUEUE_ENV")]
    environment: Option<String>,

    /// Override the per-group job cap
    #[arg(long, env = "KUBEQUEUE_MAX_WORKERS")]
    max_workers: Option<u32>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one enqueue: sweep, admit, and submit a job from a manifest
    Enqueue {
        /// Path to a Job manifest (YAML, or JSON with a .json extension)
        manifest: String,
    },
    /// Delete finished managed jobs and pods
    Reap,
    /// Validate a settings file
    Validate {
        /// Path to the settings file
        #[arg(default_value = "kubequeue.kdl")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Commands::Enqueue { manifest } => {
            let settings = commands::settings(cli.config.as_deref(), cli.max_workers)?;
            commands::enqueue::enqueue(settings, cli.environment.as_deref(), &manifest).await?;
        }
        Commands::Reap => {
            let settings = commands::settings(cli.config.as_deref(), cli.max_workers)?;
            commands::reap::reap(settings).await?;
        }
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
    }

    Ok(())
}

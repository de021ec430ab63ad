use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use dashsync::config::{CliOverrides, DashConfig};
use dashsync::logging::init_logging;

mod cmd;

#[derive(Parser)]
#[command(name = "dashsync")]
#[command(version, about = "Live client for the pipeline operations dashboard")]
pub struct Cli {
    /// Log at debug level (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Config file to use instead of the discovered dashsync.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Dashboard server base URL. Overrides dashsync.toml and DASHSYNC_SERVER_URL.
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Project to operate on. Overrides dashsync.toml and DASHSYNC_PROJECT.
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    /// Emit JSON instead of styled text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow the event stream and keep a live view of the project
    Watch {
        /// Also show subtasks of this feature
        #[arg(short, long)]
        feature: Option<String>,
        /// Follow the step log of a legacy task
        #[arg(long)]
        task: Option<String>,
        /// Append frames instead of clearing the screen
        #[arg(long)]
        no_clear: bool,
    },
    /// List projects and whether anything is running in them
    Projects,
    /// List the features of the project with blocked markers
    Features {
        /// Show subtasks of this feature
        #[arg(short, long)]
        feature: Option<String>,
    },
    /// Ask the server to start the next runnable feature
    ExecuteNext,
    /// Ask the server to stop the running feature after its current step
    Stop,
    /// Reorder the project's B/C features
    Reorder {
        /// New order of feature ids, first to last
        ids: Vec<String>,
        /// Move a single feature instead of giving the full order
        #[arg(long = "move", value_name = "ID", conflicts_with = "ids")]
        move_id: Option<String>,
        /// Place the moved feature above this one
        #[arg(long, requires = "move_id", conflicts_with = "below")]
        above: Option<String>,
        /// Place the moved feature below this one
        #[arg(long, requires = "move_id")]
        below: Option<String>,
    },
    /// Retry a failed feature
    RetryFeature { id: String },
    /// Retry a failed subtask
    RetrySubtask { id: String },
    /// View, create or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and list any problems
    Validate,
    /// Create a default .dashsync/dashsync.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let overrides = CliOverrides {
        server_url: cli.server.clone(),
        project: cli.project.clone(),
    };

    // Config commands must work even when the file does not validate.
    if let Commands::Config { command } = &cli.command {
        return cmd::cmd_config(&project_dir, cli.config.as_deref(), &overrides, command.clone());
    }

    let mut config = DashConfig::resolve(&project_dir, cli.config.as_deref(), &overrides)?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    let _log_guard = init_logging(&config.logging);
    config.ensure_valid().context("Invalid configuration")?;

    match &cli.command {
        Commands::Watch {
            feature,
            task,
            no_clear,
        } => {
            cmd::cmd_watch(&config, feature.as_deref(), task.as_deref(), cli.json, !*no_clear).await?
        }
        Commands::Projects => cmd::cmd_projects(&config, cli.json).await?,
        Commands::Features { feature } => {
            cmd::cmd_features(&config, feature.as_deref(), cli.json).await?
        }
        Commands::ExecuteNext => cmd::cmd_execute_next(&config).await?,
        Commands::Stop => cmd::cmd_stop(&config).await?,
        Commands::Reorder {
            ids,
            move_id,
            above,
            below,
        } => {
            let request = match move_id {
                Some(id) => cmd::ReorderRequest::Move {
                    id: id.clone(),
                    above: above.clone(),
                    below: below.clone(),
                },
                None => cmd::ReorderRequest::Order(ids.clone()),
            };
            cmd::cmd_reorder(&config, request).await?
        }
        Commands::RetryFeature { id } => cmd::cmd_retry_feature(&config, id).await?,
        Commands::RetrySubtask { id } => cmd::cmd_retry_subtask(&config, id).await?,
        Commands::Config { .. } => unreachable!("handled above"),
    }

    Ok(())
}

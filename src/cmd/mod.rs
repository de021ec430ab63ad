//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled                                         |
//! |------------|----------------------------------------------------------|
//! | `watch`    | `Watch`                                                  |
//! | `list`     | `Projects`, `Features`                                   |
//! | `control`  | `ExecuteNext`, `Stop`, `RetryFeature`, `RetrySubtask`    |
//! | `reorder`  | `Reorder`                                                |
//! | `config`   | `Config`                                                 |

pub mod config;
pub mod control;
pub mod list;
pub mod reorder;
pub mod watch;

pub use config::cmd_config;
pub use control::{cmd_execute_next, cmd_retry_feature, cmd_retry_subtask, cmd_stop};
pub use list::{cmd_features, cmd_projects};
pub use reorder::{ReorderRequest, cmd_reorder};
pub use watch::cmd_watch;

use std::sync::Arc;

use anyhow::{Context, Result};

use dashsync::config::DashConfig;
use dashsync::sync::DashboardSession;
use dashsync::sync::api::HttpApi;
use dashsync::sync::render::RenderSink;

/// Build a session talking to the configured server.
pub fn open_session(config: &DashConfig, sink: Box<dyn RenderSink>) -> Result<DashboardSession> {
    let api = HttpApi::new(&config.server.url, config.request_timeout())
        .context("Failed to create HTTP client")?;
    Ok(DashboardSession::new(Arc::new(api), sink))
}

/// Build a session with the configured project selected and its features
/// loaded.
pub async fn open_project_session(config: &DashConfig, sink: Box<dyn RenderSink>) -> Result<DashboardSession> {
    let project = require_project(config)?;
    let mut session = open_session(config, sink)?;
    session
        .load_projects()
        .await
        .context("Failed to load projects")?;
    if !session.store().cache.projects.is_empty() && session.store().cache.project(project).is_none() {
        anyhow::bail!("Unknown project '{}'", project);
    }
    session
        .select_project(project)
        .await
        .with_context(|| format!("Failed to load features of project '{}'", project))?;
    Ok(session)
}

pub fn require_project(config: &DashConfig) -> Result<&str> {
    config.session.project.as_deref().context(
        "No project selected. Pass --project, set DASHSYNC_PROJECT or add [session] project to dashsync.toml",
    )
}

//! Live view: `dashsync watch`.

use anyhow::{Context, Result};
use tracing::info;

use dashsync::config::DashConfig;
use dashsync::sync::render::{ConsoleSink, JsonSink, RenderSink};
use dashsync::sync::stream::EventStreamClient;

pub async fn cmd_watch(
    config: &DashConfig,
    feature: Option<&str>,
    task: Option<&str>,
    json: bool,
    clear: bool,
) -> Result<()> {
    let sink: Box<dyn RenderSink> = if json {
        Box::new(JsonSink)
    } else {
        Box::new(ConsoleSink::new(clear))
    };

    let mut session = super::open_session(config, sink)?;
    session
        .load_projects()
        .await
        .context("Failed to load projects")?;
    if let Some(project) = config.session.project.as_deref() {
        session
            .select_project(project)
            .await
            .with_context(|| format!("Failed to load features of project '{}'", project))?;
    }
    if feature.is_some() {
        session
            .select_feature(feature)
            .await
            .context("Failed to load subtasks")?;
    }
    session.watch_task(task);

    let client = EventStreamClient::new(config.stream_settings())?;
    session.connect(client);
    info!(session = %session.id(), url = %config.stream_url(), "watching");

    tokio::select! {
        result = session.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
        }
    }

    Ok(())
}

//! One-shot listings: `dashsync projects`, `dashsync features`.

use anyhow::{Context, Result};
use console::style;

use dashsync::config::DashConfig;
use dashsync::sync::render::{NullSink, render_lines};

pub async fn cmd_projects(config: &DashConfig, json: bool) -> Result<()> {
    let mut session = super::open_session(config, Box::new(NullSink))?;
    let projects = session
        .load_projects()
        .await
        .context("Failed to load projects")?
        .to_vec();

    if json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects.");
        return Ok(());
    }
    for project in &projects {
        println!(
            "  {}  {} {}",
            style(&project.id).dim(),
            style(&project.name).bold(),
            style(format!("[{}]", project.status)).dim()
        );
    }
    Ok(())
}

pub async fn cmd_features(config: &DashConfig, feature: Option<&str>, json: bool) -> Result<()> {
    let mut session = super::open_project_session(config, Box::new(NullSink)).await?;
    if feature.is_some() {
        session
            .select_feature(feature)
            .await
            .context("Failed to load subtasks")?;
    }

    if json {
        let project = super::require_project(config)?;
        let cache = &session.store().cache;
        let doc = serde_json::json!({
            "features": cache.display_order(project),
            "blocked": cache.blocked_summary(project),
            "subtasks": feature.map(|f| cache.subtasks_for(f)),
            "control": session.store().control.state(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    for line in render_lines(session.store()) {
        println!("{}", line);
    }
    Ok(())
}

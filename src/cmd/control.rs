//! Execution commands: `dashsync execute-next | stop | retry-feature | retry-subtask`.

use anyhow::{Context, Result};
use console::style;

use dashsync::config::DashConfig;
use dashsync::sync::models::ExecuteOutcome;
use dashsync::sync::render::NullSink;

pub async fn cmd_execute_next(config: &DashConfig) -> Result<()> {
    let mut session = super::open_project_session(config, Box::new(NullSink)).await?;

    match session.execute_next().await? {
        ExecuteOutcome::Started {
            feature_id,
            feature_name,
        } => {
            println!(
                "{} {}",
                style("Started").green().bold(),
                feature_name.as_deref().unwrap_or(&feature_id)
            );
        }
        ExecuteOutcome::Blocked { message, blocked } => {
            println!("{}", style(message).yellow());
            for feature in blocked {
                println!(
                    "  {} waiting on {}",
                    feature.name,
                    style(feature.depends_on.join(", ")).dim()
                );
            }
        }
        // Rejections come back as errors.
        ExecuteOutcome::Rejected { message } => println!("{}", message),
    }
    Ok(())
}

pub async fn cmd_stop(config: &DashConfig) -> Result<()> {
    let mut session = super::open_project_session(config, Box::new(NullSink)).await?;
    let feature_id = session.request_stop().await?;
    println!(
        "{} {} (stops after the current step)",
        style("Stop requested for").yellow(),
        feature_id
    );
    Ok(())
}

pub async fn cmd_retry_feature(config: &DashConfig, feature_id: &str) -> Result<()> {
    let mut session = super::open_project_session(config, Box::new(NullSink)).await?;
    session
        .retry_feature(feature_id)
        .await
        .with_context(|| format!("Failed to retry feature '{}'", feature_id))?;
    println!("{} {}", style("Retrying").green(), feature_id);
    Ok(())
}

pub async fn cmd_retry_subtask(config: &DashConfig, subtask_id: &str) -> Result<()> {
    let mut session = super::open_session(config, Box::new(NullSink))?;
    session
        .retry_subtask(subtask_id)
        .await
        .with_context(|| format!("Failed to retry subtask '{}'", subtask_id))?;
    println!("{} {}", style("Retrying subtask").green(), subtask_id);
    Ok(())
}

//! Render sinks.
//!
//! The session hands the sink a read-only `&Store` after every mutation and
//! forwards notices. Sinks never write back into the store.

use console::{Emoji, Term, style};

use crate::sync::cache::{PlanningStage, ProjectActivity, StepStatus, Store};
use crate::sync::control::{ControlAction, ControlState};
use crate::sync::models::{FeatureStatus, SubtaskStatus};
use crate::sync::reconciler::{Notice, NoticeLevel};

static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
static RUNNING: Emoji<'_, '_> = Emoji("▶️  ", "[>] ");
static PAUSED: Emoji<'_, '_> = Emoji("⏸️  ", "[||] ");
static BLOCKER: Emoji<'_, '_> = Emoji("🚧 ", "[BLOCK] ");
static TESTING: Emoji<'_, '_> = Emoji("🧪 ", "[TEST] ");
static PENDING: Emoji<'_, '_> = Emoji("⏳ ", "[ ] ");

pub trait RenderSink: Send {
    fn render(&mut self, store: &Store);

    fn notify(&mut self, _notice: &Notice) {}
}

/// Discards everything. Used by one-shot commands.
pub struct NullSink;

impl RenderSink for NullSink {
    fn render(&mut self, _store: &Store) {}
}

/// Redraws a text dashboard on the terminal.
pub struct ConsoleSink {
    term: Term,
    clear: bool,
}

impl ConsoleSink {
    pub fn new(clear: bool) -> Self {
        Self {
            term: Term::stdout(),
            clear,
        }
    }
}

impl RenderSink for ConsoleSink {
    fn render(&mut self, store: &Store) {
        if self.clear {
            let _ = self.term.clear_screen();
        }
        for line in render_lines(store) {
            let _ = self.term.write_line(&line);
        }
    }

    fn notify(&mut self, notice: &Notice) {
        let _ = self.term.write_line(&render_notice(notice));
    }
}

/// Emits one JSON document per render, for piping into other tools.
pub struct JsonSink;

impl RenderSink for JsonSink {
    fn render(&mut self, store: &Store) {
        let doc = serde_json::json!({
            "control": store.control.state(),
            "action": store.control.available_action(),
            "cache": &store.cache,
        });
        println!("{}", doc);
    }

    fn notify(&mut self, notice: &Notice) {
        println!("{}", serde_json::json!({ "notice": notice }));
    }
}

pub fn render_notice(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Info => style("info").cyan(),
        NoticeLevel::Success => style("done").green(),
        NoticeLevel::Warning => style("warn").yellow(),
        NoticeLevel::Error => style("fail").red(),
    };
    format!(
        "{} [{}] {}",
        style(notice.at.format("%H:%M:%S")).dim(),
        tag,
        notice.message
    )
}

fn status_icon(status: FeatureStatus, blocked: bool) -> &'static Emoji<'static, 'static> {
    match status {
        FeatureStatus::Pending if blocked => &BLOCKER,
        FeatureStatus::Pending => &PENDING,
        FeatureStatus::Running => &RUNNING,
        FeatureStatus::Paused => &PAUSED,
        FeatureStatus::Completed | FeatureStatus::Verified => &CHECK,
        FeatureStatus::Failed => &CROSS,
        FeatureStatus::HumanTesting => &TESTING,
    }
}

fn control_line(store: &Store) -> String {
    let state = match store.control.state() {
        ControlState::Idle => style("idle".to_string()).dim(),
        ControlState::Running(id) => style(format!("running {}", id)).green(),
        ControlState::Stopping(id) => style(format!("stopping {}", id)).yellow(),
    };
    let action = match store.control.available_action() {
        ControlAction::Stopping => style(ControlAction::Stopping.label()).dim(),
        other => style(other.label()).bold(),
    };
    format!("Execution: {}  [{}]", state, action)
}

/// The dashboard as text lines.
pub fn render_lines(store: &Store) -> Vec<String> {
    let cache = &store.cache;
    let mut lines = Vec::new();

    for project in &cache.projects {
        let marker = if cache.is_active_project(&project.id) {
            ">"
        } else {
            " "
        };
        let dot = match cache.activity(&project.id) {
            ProjectActivity::Running(_) => style("●").green(),
            ProjectActivity::Idle => style("○").dim(),
        };
        lines.push(format!("{} {} {} ({})", marker, dot, project.name, project.status));
    }

    let Some(project_id) = cache.active_project_id.as_deref() else {
        lines.push(style("No project selected").dim().to_string());
        return lines;
    };

    lines.push(String::new());
    lines.push(control_line(store));
    lines.push(String::new());

    let blocked: Vec<&str> = cache
        .blocked_features(project_id)
        .iter()
        .map(|f| f.id.as_str())
        .collect();
    for feature in cache.display_order(project_id) {
        let is_blocked = blocked.contains(&feature.id.as_str());
        let mut line = format!(
            "  {}{} {} {}",
            status_icon(feature.status, is_blocked),
            style(feature.priority).bold(),
            feature.name,
            style(format!("[{}]", feature.status)).dim()
        );
        if is_blocked {
            line.push_str(&format!(
                " {}",
                style(format!("waiting on {}", feature.depends_on.join(", "))).yellow()
            ));
        }
        if let Some(progress) = cache.planning.get(&feature.id) {
            let stage = match progress.stage {
                PlanningStage::Planning => "planning",
                PlanningStage::Planned => "planned",
            };
            let steps = match (progress.step, progress.total) {
                (Some(step), Some(total)) => format!(" {}/{}", step, total),
                _ => String::new(),
            };
            line.push_str(&format!(" {}", style(format!("({}{})", stage, steps)).cyan()));
            if let Some(message) = &progress.message {
                line.push_str(&format!(" {}", style(message).dim()));
            }
        }
        lines.push(line);

        if cache.is_active_feature(&feature.id) {
            if let Some(vote) = cache.votes.get(&feature.id)
                && let Some(winner) = &vote.winner
            {
                lines.push(format!("      vote winner: {}", winner));
            }
            for subtask in cache.subtasks_for(&feature.id) {
                let mark = match subtask.status {
                    SubtaskStatus::Pending => style("·").dim(),
                    SubtaskStatus::Running => style("›").cyan(),
                    SubtaskStatus::Completed => style("✓").green(),
                    SubtaskStatus::Failed => style("✗").red(),
                };
                let mut line = format!("      {} {}", mark, subtask.intent);
                if let Some(error) = &subtask.error {
                    line.push_str(&format!(" {}", style(error).red()));
                }
                lines.push(line);
            }
        }
    }

    if let Some(log) = &cache.task_log {
        lines.push(String::new());
        let done = if log.completed { " (completed)" } else { "" };
        lines.push(format!("Task {}{}", log.task_id, done));
        for step in &log.steps {
            let mark = match step.status {
                StepStatus::Running => style("›").cyan(),
                StepStatus::Completed => style("✓").green(),
                StepStatus::Failed => style("✗").red(),
            };
            let title = step.title.as_deref().unwrap_or(&step.step_id);
            lines.push(format!("  {} {}", mark, title));
        }
        for line in log.lines.iter().rev().take(5).rev() {
            lines.push(format!("  {} {}", style(&line.level).dim(), line.message));
        }
    }

    lines
}

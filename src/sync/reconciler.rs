//! Event stream reconciler.
//!
//! [`reduce`] is a pure reducer: it applies one [`StreamEvent`] to the
//! [`Store`] and returns the [`Effect`]s the session must perform (re-fetches
//! and notices). It never does I/O, so every rule here is testable without
//! a server or a rendering surface.
//!
//! Scoping rules:
//! - an event carrying a `projectId` other than the active project only
//!   updates background bookkeeping (sidebar activity);
//! - an event without a `projectId` is taken to concern the active project;
//! - legacy step events are filtered on `taskId` equality instead.
//!
//! Re-fetch is the tie-breaker for races between command responses and
//! stream events: the last full fetch to complete wins.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::sync::cache::{
    LogLine, PlanningProgress, PlanningStage, ProjectActivity, StepStatus, Store, VoteSummary,
};
use crate::sync::events::{FeatureEvent, StreamEvent, SubtaskEvent};
use crate::sync::models::{FeatureStatus, SubtaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing notification (toast).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    RefetchProjects,
    RefetchFeatures { project_id: String },
    RefetchSubtasks { feature_id: String },
    Notify(Notice),
}

/// Parse and apply a raw stream payload. Malformed payloads are logged and
/// discarded; the stream carries on.
pub fn reduce_raw(store: &mut Store, raw: &str) -> Vec<Effect> {
    match StreamEvent::parse(raw) {
        Ok(event) => reduce(store, &event),
        Err(e) => {
            warn!(error = %e, "discarding stream message");
            Vec::new()
        }
    }
}

/// Apply one event to the store.
pub fn reduce(store: &mut Store, event: &StreamEvent) -> Vec<Effect> {
    debug!(kind = event.kind(), project = ?event.project_id(), feature = ?event.feature_id(), "stream event");

    if event.is_task_scoped() {
        return reduce_task_event(store, event);
    }

    if let Some(project_id) = event.project_id()
        && !store.cache.is_active_project(project_id)
    {
        track_background(store, project_id, event);
        return Vec::new();
    }

    match event {
        StreamEvent::FeatureStarted(e) => on_feature_started(store, e),
        StreamEvent::FeaturePlanning(e) => {
            if let Some(feature_id) = &e.feature_id {
                store.cache.planning.insert(
                    feature_id.clone(),
                    PlanningProgress {
                        stage: PlanningStage::Planning,
                        message: e.message.clone(),
                        step: None,
                        total: None,
                    },
                );
            }
            Vec::new()
        }
        StreamEvent::PlannerProgress(e) => {
            if let Some(feature_id) = &e.feature_id {
                let progress = store
                    .cache
                    .planning
                    .entry(feature_id.clone())
                    .or_insert_with(|| PlanningProgress {
                        stage: PlanningStage::Planning,
                        message: None,
                        step: None,
                        total: None,
                    });
                progress.stage = PlanningStage::Planning;
                if e.message.is_some() {
                    progress.message = e.message.clone();
                }
                progress.step = e.step.or(progress.step);
                progress.total = e.total.or(progress.total);
            }
            Vec::new()
        }
        StreamEvent::FeaturePlanned(e) => {
            let mut effects = Vec::new();
            if let Some(feature_id) = &e.feature_id {
                if let Some(progress) = store.cache.planning.get_mut(feature_id) {
                    progress.stage = PlanningStage::Planned;
                }
                effects.extend(refetch_subtasks_if_viewed(store, feature_id));
            }
            effects
        }
        StreamEvent::FeatureCompleted(e) => on_terminal(
            store,
            e,
            FeatureStatus::Completed,
            Notice::new(NoticeLevel::Success, format!("{} completed", label(e))),
        ),
        StreamEvent::FeatureAwaitingTest(e) => on_terminal(
            store,
            e,
            FeatureStatus::HumanTesting,
            Notice::new(NoticeLevel::Info, format!("{} is ready for testing", label(e))),
        ),
        StreamEvent::FeaturePaused(e) => on_terminal(
            store,
            e,
            FeatureStatus::Paused,
            Notice::new(NoticeLevel::Info, format!("{} paused", label(e))),
        ),
        StreamEvent::FeatureFailed(e) => {
            let reason = e.error.as_deref().or(e.message.as_deref()).unwrap_or("unknown error");
            on_terminal(
                store,
                e,
                FeatureStatus::Failed,
                Notice::new(NoticeLevel::Error, format!("{} failed: {}", label(e), reason)),
            )
        }
        StreamEvent::FeatureManuallyCompleted(e) => {
            if let Some(feature_id) = &e.feature_id {
                store.cache.set_feature_status(feature_id, FeatureStatus::Completed);
            }
            let mut effects = refetch_active_features(store);
            effects.push(Effect::Notify(Notice::new(
                NoticeLevel::Success,
                format!("{} marked complete", label(e)),
            )));
            effects
        }
        StreamEvent::FeaturePauseRequested(e) => {
            store.control.mark_stopping(e.feature_id.as_deref());
            Vec::new()
        }
        StreamEvent::VoteSummary(e) => {
            if let Some(feature_id) = &e.feature_id {
                store.cache.votes.insert(
                    feature_id.clone(),
                    VoteSummary {
                        winner: e.winner.clone(),
                        summary: e.summary.clone(),
                        votes: e.votes.clone(),
                    },
                );
            }
            Vec::new()
        }
        StreamEvent::SubtaskStarted(e) => on_subtask(store, e, SubtaskStatus::Running),
        StreamEvent::SubtaskCompleted(e) => on_subtask(store, e, SubtaskStatus::Completed),
        StreamEvent::SubtaskFailed(e) => {
            let mut effects = on_subtask(store, e, SubtaskStatus::Failed);
            if let Some(error) = &e.error {
                effects.push(Effect::Notify(Notice::new(
                    NoticeLevel::Warning,
                    format!("Subtask failed: {}", error),
                )));
            }
            effects
        }
        StreamEvent::Unknown => {
            debug!("ignoring unknown stream event");
            Vec::new()
        }
        // Task-scoped events were handled above.
        StreamEvent::StepStart(_)
        | StreamEvent::StepResult(_)
        | StreamEvent::StepCompleted(_)
        | StreamEvent::StepError(_)
        | StreamEvent::TaskCompleted(_)
        | StreamEvent::Log(_)
        | StreamEvent::CommandOutput(_) => Vec::new(),
    }
}

/// Effects to run after the stream reconnects: nothing is assumed to have
/// survived the gap, so everything in view is fetched again.
pub fn on_reconnect(store: &mut Store) -> Vec<Effect> {
    store.resync_pending = true;
    let mut effects = vec![Effect::RefetchProjects];
    if let Some(project_id) = &store.cache.active_project_id {
        effects.push(Effect::RefetchFeatures {
            project_id: project_id.clone(),
        });
    }
    if let Some(feature_id) = &store.cache.active_feature_id {
        effects.push(Effect::RefetchSubtasks {
            feature_id: feature_id.clone(),
        });
    }
    effects
}

fn label(e: &FeatureEvent) -> String {
    e.feature_name
        .clone()
        .or_else(|| e.feature_id.as_ref().map(|id| format!("Feature {}", id)))
        .unwrap_or_else(|| "Feature".to_string())
}

fn track_background(store: &mut Store, project_id: &str, event: &StreamEvent) {
    match event {
        StreamEvent::FeatureStarted(e) => {
            let feature_id = e.feature_id.clone().unwrap_or_default();
            store
                .cache
                .set_activity(project_id, ProjectActivity::Running(feature_id));
        }
        _ if event.is_terminal() => {
            store.cache.set_activity(project_id, ProjectActivity::Idle);
        }
        _ => {}
    }
}

fn refetch_active_features(store: &Store) -> Vec<Effect> {
    match &store.cache.active_project_id {
        Some(project_id) => vec![Effect::RefetchFeatures {
            project_id: project_id.clone(),
        }],
        None => Vec::new(),
    }
}

fn refetch_subtasks_if_viewed(store: &Store, feature_id: &str) -> Option<Effect> {
    store
        .cache
        .is_active_feature(feature_id)
        .then(|| Effect::RefetchSubtasks {
            feature_id: feature_id.to_string(),
        })
}

fn on_feature_started(store: &mut Store, e: &FeatureEvent) -> Vec<Effect> {
    store.control.on_feature_started(e.feature_id.as_deref());
    if let Some(project_id) = store.cache.active_project_id.clone() {
        let activity = ProjectActivity::Running(e.feature_id.clone().unwrap_or_default());
        store.cache.set_activity(&project_id, activity);
    }
    if let Some(feature_id) = &e.feature_id {
        store.cache.set_feature_status(feature_id, FeatureStatus::Running);
    }
    refetch_active_features(store)
}

/// Terminal events reset execution control whatever `featureId` they carry.
fn on_terminal(
    store: &mut Store,
    e: &FeatureEvent,
    status: FeatureStatus,
    notice: Notice,
) -> Vec<Effect> {
    if let (Some(event_id), Some(running)) = (e.feature_id.as_deref(), store.control.running_feature_id())
        && event_id != running
    {
        debug!(event_id, running, "terminal event for a different feature, resetting anyway");
    }
    store.control.on_terminal();
    if let Some(project_id) = store.cache.active_project_id.clone() {
        store.cache.set_activity(&project_id, ProjectActivity::Idle);
    }

    let mut effects = Vec::new();
    if let Some(feature_id) = &e.feature_id {
        store.cache.set_feature_status(feature_id, status);
        store.cache.planning.remove(feature_id);
        effects.extend(refetch_subtasks_if_viewed(store, feature_id));
    }
    effects.extend(refetch_active_features(store));
    effects.push(Effect::Notify(notice));
    effects
}

/// Subtask changes are never merged: the authoritative list for the
/// feature is fetched again if it is in view.
fn on_subtask(store: &mut Store, e: &SubtaskEvent, status: SubtaskStatus) -> Vec<Effect> {
    let Some(feature_id) = &e.feature_id else {
        debug!("subtask event without featureId");
        return Vec::new();
    };
    if let Some(subtask_id) = &e.subtask_id {
        store.cache.set_subtask_status(feature_id, subtask_id, status);
    }
    refetch_subtasks_if_viewed(store, feature_id)
        .into_iter()
        .collect()
}

fn reduce_task_event(store: &mut Store, event: &StreamEvent) -> Vec<Effect> {
    let Some(log) = store.cache.task_log.as_mut() else {
        return Vec::new();
    };
    if event.task_id() != Some(log.task_id.as_str()) {
        return Vec::new();
    }

    match event {
        StreamEvent::StepStart(e) => {
            if let Some(step_id) = &e.step_id {
                let step = log.step_mut(step_id);
                step.status = StepStatus::Running;
                if e.title.is_some() {
                    step.title = e.title.clone();
                }
            }
        }
        StreamEvent::StepResult(e) => {
            if let Some(step_id) = &e.step_id {
                log.step_mut(step_id).result = e.result.clone();
            }
        }
        StreamEvent::StepCompleted(e) => {
            if let Some(step_id) = &e.step_id {
                let step = log.step_mut(step_id);
                step.status = StepStatus::Completed;
                if e.result.is_some() {
                    step.result = e.result.clone();
                }
            }
        }
        StreamEvent::StepError(e) => {
            let error = e.error.clone().unwrap_or_else(|| "step failed".to_string());
            match &e.step_id {
                Some(step_id) => {
                    let step = log.step_mut(step_id);
                    step.status = StepStatus::Failed;
                    step.error = Some(error);
                }
                None => log.lines.push(LogLine {
                    at: Utc::now(),
                    level: "error".to_string(),
                    message: error,
                }),
            }
        }
        StreamEvent::TaskCompleted(_) => {
            log.completed = true;
        }
        StreamEvent::Log(e) => {
            if let Some(message) = &e.message {
                log.lines.push(LogLine {
                    at: Utc::now(),
                    level: e.level.clone().unwrap_or_else(|| "info".to_string()),
                    message: message.clone(),
                });
            }
        }
        StreamEvent::CommandOutput(e) => {
            if let Some(output) = &e.message {
                log.command_output.push_str(output);
            }
        }
        _ => {}
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::control::ControlState;
    use crate::sync::models::{Feature, Priority, Subtask};

    fn store_for(project_id: &str) -> Store {
        let mut store = Store::new();
        store.select_project(project_id);
        store.apply_features(
            project_id,
            vec![Feature {
                id: "f1".to_string(),
                project_id: project_id.to_string(),
                name: "Auth".to_string(),
                description: String::new(),
                priority: Priority::B,
                status: FeatureStatus::Pending,
                depends_on: vec![],
                order_index: 1,
            }],
        );
        store
    }

    fn apply(store: &mut Store, raw: &str) -> Vec<Effect> {
        reduce_raw(store, raw)
    }

    fn refetches(effects: &[Effect]) -> Vec<&Effect> {
        effects
            .iter()
            .filter(|e| !matches!(e, Effect::Notify(_)))
            .collect()
    }

    #[test]
    fn test_feature_started_sets_running() {
        let mut store = store_for("p1");
        let effects = apply(
            &mut store,
            r#"{"type":"feature-started","projectId":"p1","featureId":"f1"}"#,
        );
        assert_eq!(store.control.state(), ControlState::Running("f1".to_string()));
        assert_eq!(store.cache.feature("f1").unwrap().status, FeatureStatus::Running);
        assert_eq!(
            effects,
            vec![Effect::RefetchFeatures {
                project_id: "p1".to_string()
            }]
        );
    }

    #[test]
    fn test_paused_without_feature_id_resets_control() {
        let mut store = store_for("p1");
        apply(&mut store, r#"{"type":"feature-started","projectId":"p1","featureId":"f1"}"#);
        apply(&mut store, r#"{"type":"feature-paused","projectId":"p1"}"#);
        assert_eq!(store.control.state(), ControlState::Idle);
    }

    #[test]
    fn test_terminal_for_other_feature_still_resets() {
        let mut store = store_for("p1");
        apply(&mut store, r#"{"type":"feature-started","projectId":"p1","featureId":"f1"}"#);
        apply(&mut store, r#"{"type":"feature-pause-requested","projectId":"p1","featureId":"f1"}"#);
        assert_eq!(store.control.state(), ControlState::Stopping("f1".to_string()));
        let effects = apply(
            &mut store,
            r#"{"type":"feature-failed","projectId":"p1","featureId":"f7","error":"oom"}"#,
        );
        assert_eq!(store.control.state(), ControlState::Idle);
        match effects.last() {
            Some(Effect::Notify(notice)) => {
                assert_eq!(notice.level, NoticeLevel::Error);
                assert!(notice.message.contains("oom"));
            }
            other => panic!("Expected notice, got {:?}", other),
        }
    }

    #[test]
    fn test_awaiting_test_is_terminal() {
        let mut store = store_for("p1");
        apply(&mut store, r#"{"type":"feature-started","projectId":"p1","featureId":"f1"}"#);
        apply(&mut store, r#"{"type":"feature-awaiting-test","projectId":"p1","featureId":"f1"}"#);
        assert!(store.control.is_idle());
        assert_eq!(store.cache.feature("f1").unwrap().status, FeatureStatus::HumanTesting);
    }

    #[test]
    fn test_other_project_only_updates_background() {
        let mut store = store_for("p1");
        let effects = apply(
            &mut store,
            r#"{"type":"feature-started","projectId":"p2","featureId":"f9"}"#,
        );
        assert!(effects.is_empty());
        assert!(store.control.is_idle());
        assert_eq!(store.cache.activity("p2"), ProjectActivity::Running("f9".to_string()));

        apply(&mut store, r#"{"type":"feature-completed","projectId":"p2","featureId":"f9"}"#);
        assert_eq!(store.cache.activity("p2"), ProjectActivity::Idle);
        assert!(store.control.is_idle());
    }

    #[test]
    fn test_other_project_terminal_does_not_reset_active_run() {
        let mut store = store_for("p1");
        apply(&mut store, r#"{"type":"feature-started","projectId":"p1","featureId":"f1"}"#);
        apply(&mut store, r#"{"type":"feature-completed","projectId":"p2","featureId":"f9"}"#);
        assert_eq!(store.control.state(), ControlState::Running("f1".to_string()));
    }

    #[test]
    fn test_terminal_event_leaves_previously_viewed_project_alone() {
        let mut store = store_for("p2");
        let p1_features = store_for("p1").cache.features_for("p1").to_vec();
        store.select_project("p1");
        store.apply_features("p1", p1_features);

        apply(
            &mut store,
            r#"{"type":"feature-failed","projectId":"p1","featureId":"f1"}"#,
        );
        assert_eq!(store.cache.features_for("p1")[0].status, FeatureStatus::Failed);
        assert_eq!(store.cache.features_for("p2")[0].status, FeatureStatus::Pending);
    }

    #[test]
    fn test_terminal_with_structured_error_still_resets_control() {
        let mut store = store_for("p1");
        apply(&mut store, r#"{"type":"feature-started","projectId":"p1","featureId":"f1"}"#);
        let effects = apply(
            &mut store,
            r#"{"type":"feature-failed","projectId":"p1","featureId":"f1","error":{"message":"oom"}}"#,
        );
        assert_eq!(store.control.state(), ControlState::Idle);
        let notice = effects
            .iter()
            .find_map(|e| match e {
                Effect::Notify(n) => Some(n),
                _ => None,
            })
            .unwrap();
        assert!(notice.message.ends_with("failed: oom"));
    }

    #[test]
    fn test_step_result_with_object_payload_is_recorded() {
        let mut store = store_for("p1");
        store.watch_task(Some("t1"));
        apply(
            &mut store,
            r#"{"type":"step-result","taskId":"t1","stepId":"s1","result":{"files":2}}"#,
        );
        let log = store.cache.task_log.as_ref().unwrap();
        assert_eq!(log.steps.len(), 1);
        assert_eq!(log.steps[0].result.as_deref(), Some(r#"{"files":2}"#));
    }

    #[test]
    fn test_subtask_completed_refetches_only_when_viewed() {
        let mut store = store_for("p1");
        let raw = r#"{"type":"subtask-completed","projectId":"p1","featureId":"f1","subtaskId":"s1"}"#;
        assert!(apply(&mut store, raw).is_empty());

        store.select_feature(Some("f1"));
        let expected = vec![Effect::RefetchSubtasks {
            feature_id: "f1".to_string(),
        }];
        assert_eq!(apply(&mut store, raw), expected);
    }

    #[test]
    fn test_subtask_completed_twice_is_idempotent() {
        let mut store = store_for("p1");
        store.select_feature(Some("f1"));
        store.cache.replace_subtasks(
            "f1",
            vec![Subtask {
                id: "s1".to_string(),
                feature_id: "f1".to_string(),
                intent: "write tests".to_string(),
                status: SubtaskStatus::Running,
                apply_path: None,
                apply_type: None,
                error: None,
                completed_at: None,
            }],
        );
        let raw = r#"{"type":"subtask-completed","projectId":"p1","featureId":"f1","subtaskId":"s1"}"#;
        let first = apply(&mut store, raw);
        let after_first = store.cache.clone().subtasks;
        let second = apply(&mut store, raw);
        assert_eq!(first, second);
        assert_eq!(store.cache.subtasks, after_first);
        assert_eq!(store.cache.subtasks_for("f1")[0].status, SubtaskStatus::Completed);
    }

    #[test]
    fn test_applying_same_event_twice_keeps_state() {
        let mut store = store_for("p1");
        let raw = r#"{"type":"feature-started","projectId":"p1","featureId":"f1"}"#;
        apply(&mut store, raw);
        let control = store.control.clone();
        apply(&mut store, raw);
        assert_eq!(store.control, control);
    }

    #[test]
    fn test_malformed_and_unknown_are_discarded() {
        let mut store = store_for("p1");
        assert!(apply(&mut store, "{{{").is_empty());
        assert!(apply(&mut store, r#"{"featureId":"f1"}"#).is_empty());
        assert!(apply(&mut store, r#"{"type":"brand-new-event","projectId":"p1"}"#).is_empty());
        assert!(store.control.is_idle());
    }

    #[test]
    fn test_event_without_project_applies_to_active() {
        let mut store = store_for("p1");
        apply(&mut store, r#"{"type":"feature-started","featureId":"f1"}"#);
        assert_eq!(store.control.running_feature_id(), Some("f1"));
    }

    #[test]
    fn test_planning_progress_lifecycle() {
        let mut store = store_for("p1");
        store.select_feature(Some("f1"));
        apply(&mut store, r#"{"type":"feature-planning","projectId":"p1","featureId":"f1"}"#);
        apply(
            &mut store,
            r#"{"type":"planner-progress","projectId":"p1","featureId":"f1","message":"voting","step":2,"total":5}"#,
        );
        let progress = &store.cache.planning["f1"];
        assert_eq!(progress.stage, PlanningStage::Planning);
        assert_eq!(progress.message.as_deref(), Some("voting"));
        assert_eq!((progress.step, progress.total), (Some(2), Some(5)));

        let effects = apply(&mut store, r#"{"type":"feature-planned","projectId":"p1","featureId":"f1"}"#);
        assert_eq!(store.cache.planning["f1"].stage, PlanningStage::Planned);
        assert_eq!(
            effects,
            vec![Effect::RefetchSubtasks {
                feature_id: "f1".to_string()
            }]
        );

        apply(&mut store, r#"{"type":"feature-completed","projectId":"p1","featureId":"f1"}"#);
        assert!(!store.cache.planning.contains_key("f1"));
    }

    #[test]
    fn test_vote_summary_is_recorded() {
        let mut store = store_for("p1");
        apply(
            &mut store,
            r#"{"type":"vote-summary","projectId":"p1","featureId":"f1","winner":"plan-2","votes":[1,2]}"#,
        );
        assert_eq!(store.cache.votes["f1"].winner.as_deref(), Some("plan-2"));
    }

    #[test]
    fn test_manual_completion_refetches_features() {
        let mut store = store_for("p1");
        let effects = apply(
            &mut store,
            r#"{"type":"feature-manually-completed","projectId":"p1","featureId":"f1"}"#,
        );
        assert_eq!(store.cache.feature("f1").unwrap().status, FeatureStatus::Completed);
        assert_eq!(
            refetches(&effects),
            vec![&Effect::RefetchFeatures {
                project_id: "p1".to_string()
            }]
        );
    }

    #[test]
    fn test_task_events_filtered_by_task_id() {
        let mut store = store_for("p1");
        store.watch_task(Some("t1"));
        apply(&mut store, r#"{"type":"step-start","taskId":"t1","stepId":"s1","title":"Build"}"#);
        apply(&mut store, r#"{"type":"step-start","taskId":"t2","stepId":"s9"}"#);
        apply(&mut store, r#"{"type":"step-result","taskId":"t1","stepId":"s1","result":"ok"}"#);
        apply(&mut store, r#"{"type":"step-completed","taskId":"t1","stepId":"s1"}"#);
        apply(&mut store, r#"{"type":"step-error","taskId":"t1","stepId":"s2","error":"lint"}"#);
        apply(&mut store, r#"{"type":"log","taskId":"t1","message":"hello","level":"warn"}"#);
        apply(&mut store, r#"{"type":"command-output","taskId":"t1","output":"a"}"#);
        apply(&mut store, r#"{"type":"command-output","taskId":"t1","data":"b"}"#);
        apply(&mut store, r#"{"type":"task-completed","taskId":"t1"}"#);

        let log = store.cache.task_log.as_ref().unwrap();
        assert_eq!(log.steps.len(), 2);
        assert_eq!(log.steps[0].title.as_deref(), Some("Build"));
        assert_eq!(log.steps[0].status, StepStatus::Completed);
        assert_eq!(log.steps[0].result.as_deref(), Some("ok"));
        assert_eq!(log.steps[1].status, StepStatus::Failed);
        assert_eq!(log.lines.len(), 1);
        assert_eq!(log.lines[0].level, "warn");
        assert_eq!(log.command_output, "ab");
        assert!(log.completed);
    }

    #[test]
    fn test_task_events_ignored_without_watched_task() {
        let mut store = store_for("p1");
        let effects = apply(&mut store, r#"{"type":"log","taskId":"t1","message":"x"}"#);
        assert!(effects.is_empty());
        assert!(store.cache.task_log.is_none());
    }

    #[test]
    fn test_on_reconnect_refetches_everything_in_view() {
        let mut store = store_for("p1");
        store.select_feature(Some("f1"));
        let effects = on_reconnect(&mut store);
        assert!(store.resync_pending);
        assert_eq!(
            effects,
            vec![
                Effect::RefetchProjects,
                Effect::RefetchFeatures {
                    project_id: "p1".to_string()
                },
                Effect::RefetchSubtasks {
                    feature_id: "f1".to_string()
                },
            ]
        );
    }
}

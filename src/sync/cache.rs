//! Entity cache and the store that owns it.
//!
//! The cache holds the last-known snapshot of projects, features and
//! subtasks. It has no behavior of its own beyond lookups and derived
//! views; every write goes through the reconciler or the reorder
//! confirmation path, both of which hold `&mut Store`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sync::control::ExecutionControl;
use crate::sync::models::{
    BlockedFeature, Feature, FeatureStatus, Project, Subtask, SubtaskStatus, ids_match,
};

/// Sidebar status for a project, maintained from stream events even when
/// the project is not the one being viewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "activity", content = "featureId", rename_all = "snake_case")]
pub enum ProjectActivity {
    Idle,
    Running(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningStage {
    Planning,
    Planned,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanningProgress {
    pub stage: PlanningStage,
    pub message: Option<String>,
    pub step: Option<u32>,
    pub total: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteSummary {
    pub winner: Option<String>,
    pub summary: Option<String>,
    pub votes: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepState {
    pub step_id: String,
    pub title: Option<String>,
    pub status: StepStatus,
    pub result: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogLine {
    pub at: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

/// Output of a single legacy task, fed by `taskId`-scoped events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskLog {
    pub task_id: String,
    pub steps: Vec<StepState>,
    pub lines: Vec<LogLine>,
    pub command_output: String,
    pub completed: bool,
}

impl TaskLog {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            steps: Vec::new(),
            lines: Vec::new(),
            command_output: String::new(),
            completed: false,
        }
    }

    /// Find or append the step with `step_id`.
    pub fn step_mut(&mut self, step_id: &str) -> &mut StepState {
        let idx = match self.steps.iter().position(|s| s.step_id == step_id) {
            Some(idx) => idx,
            None => {
                self.steps.push(StepState {
                    step_id: step_id.to_string(),
                    title: None,
                    status: StepStatus::Running,
                    result: None,
                    error: None,
                });
                self.steps.len() - 1
            }
        };
        &mut self.steps[idx]
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityCache {
    pub projects: Vec<Project>,
    pub active_project_id: Option<String>,
    pub active_feature_id: Option<String>,
    /// Features per project, in server order.
    pub features: HashMap<String, Vec<Feature>>,
    /// Subtasks per feature, in server order.
    pub subtasks: HashMap<String, Vec<Subtask>>,
    pub project_activity: HashMap<String, ProjectActivity>,
    pub planning: HashMap<String, PlanningProgress>,
    pub votes: HashMap<String, VoteSummary>,
    pub task_log: Option<TaskLog>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active_project(&self, project_id: &str) -> bool {
        self.active_project_id.as_deref() == Some(project_id)
    }

    pub fn is_active_feature(&self, feature_id: &str) -> bool {
        self.active_feature_id
            .as_deref()
            .is_some_and(|active| ids_match(active, feature_id))
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == project_id)
    }

    pub fn features_for(&self, project_id: &str) -> &[Feature] {
        self.features
            .get(project_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn active_features(&self) -> &[Feature] {
        match self.active_project_id.as_deref() {
            Some(project_id) => self.features_for(project_id),
            None => &[],
        }
    }

    pub fn subtasks_for(&self, feature_id: &str) -> &[Subtask] {
        self.subtasks
            .get(feature_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Look a feature up in the active project, accepting short or
    /// fully-qualified ids.
    pub fn feature(&self, feature_id: &str) -> Option<&Feature> {
        self.active_features()
            .iter()
            .find(|f| f.matches_id(feature_id))
    }

    pub fn replace_projects(&mut self, projects: Vec<Project>) {
        self.projects = projects;
    }

    /// Authoritative feature list for a project. Always wins over any
    /// locally inferred status.
    pub fn replace_features(&mut self, project_id: &str, features: Vec<Feature>) {
        self.features.insert(project_id.to_string(), features);
    }

    pub fn replace_subtasks(&mut self, feature_id: &str, subtasks: Vec<Subtask>) {
        self.subtasks.insert(feature_id.to_string(), subtasks);
    }

    /// Local status hint applied ahead of the next fetch. Only the active
    /// project's features are considered. Returns whether a cached feature
    /// was touched.
    pub fn set_feature_status(&mut self, feature_id: &str, status: FeatureStatus) -> bool {
        let Some(features) = self
            .active_project_id
            .as_deref()
            .and_then(|project_id| self.features.get_mut(project_id))
        else {
            return false;
        };
        let mut touched = false;
        for feature in features.iter_mut() {
            if feature.matches_id(feature_id) && feature.status != status {
                feature.status = status;
                touched = true;
            }
        }
        touched
    }

    pub fn set_subtask_status(&mut self, feature_id: &str, subtask_id: &str, status: SubtaskStatus) -> bool {
        let Some(subtasks) = self.subtasks.get_mut(feature_id) else {
            return false;
        };
        match subtasks.iter_mut().find(|s| s.id == subtask_id) {
            Some(subtask) if subtask.status != status => {
                subtask.status = status;
                true
            }
            _ => false,
        }
    }

    pub fn set_activity(&mut self, project_id: &str, activity: ProjectActivity) {
        self.project_activity.insert(project_id.to_string(), activity);
    }

    pub fn activity(&self, project_id: &str) -> ProjectActivity {
        self.project_activity
            .get(project_id)
            .cloned()
            .unwrap_or(ProjectActivity::Idle)
    }

    /// Whether every dependency of `feature` is completed or verified.
    /// A dependency that is not in the cache counts as unmet.
    pub fn dependencies_met(&self, feature: &Feature) -> bool {
        let siblings = self.features_for(&feature.project_id);
        feature.depends_on.iter().all(|dep| {
            siblings
                .iter()
                .find(|f| f.matches_id(dep))
                .is_some_and(|f| f.status.satisfies_dependents())
        })
    }

    /// Pending features of `project_id` whose dependencies are not met.
    pub fn blocked_features(&self, project_id: &str) -> Vec<&Feature> {
        self.features_for(project_id)
            .iter()
            .filter(|f| f.status == FeatureStatus::Pending && !self.dependencies_met(f))
            .collect()
    }

    /// Pending features that could start now, highest tier first and then
    /// by order index.
    pub fn runnable_features(&self, project_id: &str) -> Vec<&Feature> {
        let mut runnable: Vec<&Feature> = self
            .features_for(project_id)
            .iter()
            .filter(|f| f.status == FeatureStatus::Pending && self.dependencies_met(f))
            .collect();
        runnable.sort_by_key(|f| (f.priority, f.order_index));
        runnable
    }

    pub fn blocked_summary(&self, project_id: &str) -> Vec<BlockedFeature> {
        self.blocked_features(project_id)
            .into_iter()
            .map(|f| BlockedFeature {
                name: f.name.clone(),
                depends_on: f.depends_on.clone(),
            })
            .collect()
    }

    /// Features in display order: tier first, then order index. This is
    /// an independent sort and does not depend on drag position.
    pub fn display_order(&self, project_id: &str) -> Vec<&Feature> {
        let mut features: Vec<&Feature> = self.features_for(project_id).iter().collect();
        features.sort_by_key(|f| (f.priority, f.order_index));
        features
    }
}

/// Explicitly constructed state shared by the reconciler, the reorder
/// confirmation path and the render sink.
#[derive(Debug, Clone, Default)]
pub struct Store {
    pub cache: EntityCache,
    pub control: ExecutionControl,
    /// Set when the stream reconnects; cleared once the next feature fetch
    /// has re-derived execution control.
    pub resync_pending: bool,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the detailed view to another project. Feature and task views
    /// are cleared; control state is re-derived on the next fetch.
    pub fn select_project(&mut self, project_id: &str) {
        if self.cache.is_active_project(project_id) {
            return;
        }
        self.cache.active_project_id = Some(project_id.to_string());
        self.cache.active_feature_id = None;
        self.control = ExecutionControl::new();
        self.resync_pending = true;
    }

    pub fn select_feature(&mut self, feature_id: Option<&str>) {
        self.cache.active_feature_id = feature_id.map(str::to_string);
    }

    pub fn watch_task(&mut self, task_id: Option<&str>) {
        self.cache.task_log = task_id.map(TaskLog::new);
    }

    /// Apply a fetched feature list; re-derives execution control when a
    /// resync is pending for the active project.
    pub fn apply_features(&mut self, project_id: &str, features: Vec<Feature>) {
        let is_active = self.cache.is_active_project(project_id);
        if is_active && self.resync_pending {
            self.control.reconcile_with(&features);
            self.resync_pending = false;
        }
        let activity = match features.iter().find(|f| f.status == FeatureStatus::Running) {
            Some(f) => ProjectActivity::Running(f.id.clone()),
            None => ProjectActivity::Idle,
        };
        self.cache.set_activity(project_id, activity);
        self.cache.replace_features(project_id, features);
    }
}

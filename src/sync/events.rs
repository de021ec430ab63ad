//! Push-channel event types.
//!
//! Every message on the stream is a JSON object with a `type` discriminator.
//! The set of tags is closed here as [`StreamEvent`]; tags this client does
//! not know deserialize to [`StreamEvent::Unknown`] and are ignored.

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::SyncError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    // Feature lifecycle
    FeatureStarted(FeatureEvent),
    FeaturePlanning(FeatureEvent),
    PlannerProgress(PlannerProgressEvent),
    FeaturePlanned(FeatureEvent),
    FeatureCompleted(FeatureEvent),
    FeatureAwaitingTest(FeatureEvent),
    FeatureManuallyCompleted(FeatureEvent),
    FeaturePaused(FeatureEvent),
    FeatureFailed(FeatureEvent),
    FeaturePauseRequested(FeatureEvent),
    VoteSummary(VoteSummaryEvent),

    // Subtask lifecycle
    SubtaskStarted(SubtaskEvent),
    SubtaskCompleted(SubtaskEvent),
    SubtaskFailed(SubtaskEvent),

    // Legacy per-task step events, scoped by `taskId`
    StepStart(StepEvent),
    StepResult(StepEvent),
    StepCompleted(StepEvent),
    StepError(StepEvent),
    TaskCompleted(StepEvent),
    Log(TaskOutputEvent),
    CommandOutput(TaskOutputEvent),

    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureEvent {
    #[serde(default, deserialize_with = "opt_id")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub feature_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub feature_name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlannerProgressEvent {
    #[serde(default, deserialize_with = "opt_id")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub feature_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "opt_count")]
    pub step: Option<u32>,
    #[serde(default, deserialize_with = "opt_count")]
    pub total: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoteSummaryEvent {
    #[serde(default, deserialize_with = "opt_id")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub feature_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub winner: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub summary: Option<String>,
    #[serde(default)]
    pub votes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskEvent {
    #[serde(default, deserialize_with = "opt_id")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub feature_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub subtask_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepEvent {
    #[serde(default, deserialize_with = "opt_id")]
    pub task_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub step_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub result: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutputEvent {
    #[serde(default, deserialize_with = "opt_id")]
    pub task_id: Option<String>,
    #[serde(default, alias = "output", alias = "data", deserialize_with = "opt_text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub level: Option<String>,
}

/// Ids arrive as strings from the current server and as integers from
/// older builds; both normalize to `String`.
fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Display fields never fail an event. A string is taken as is, an object
/// with a string `message` yields that message, and anything else is kept
/// as compact JSON.
fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Object(map)) if map.get("message").is_some_and(|m| m.is_string()) => {
            map.get("message").and_then(|m| m.as_str()).map(str::to_string)
        }
        Some(other) => Some(other.to_string()),
    })
}

/// Progress counters: integers or numeric strings; anything else is dropped.
fn opt_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl StreamEvent {
    /// Parse a raw stream payload. Bad JSON and a missing `type` are both
    /// reported as [`SyncError::MalformedEvent`].
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        serde_json::from_str(raw).map_err(|e| SyncError::MalformedEvent {
            reason: e.to_string(),
        })
    }

    /// Tag name as it appears on the wire, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FeatureStarted(_) => "feature-started",
            Self::FeaturePlanning(_) => "feature-planning",
            Self::PlannerProgress(_) => "planner-progress",
            Self::FeaturePlanned(_) => "feature-planned",
            Self::FeatureCompleted(_) => "feature-completed",
            Self::FeatureAwaitingTest(_) => "feature-awaiting-test",
            Self::FeatureManuallyCompleted(_) => "feature-manually-completed",
            Self::FeaturePaused(_) => "feature-paused",
            Self::FeatureFailed(_) => "feature-failed",
            Self::FeaturePauseRequested(_) => "feature-pause-requested",
            Self::VoteSummary(_) => "vote-summary",
            Self::SubtaskStarted(_) => "subtask-started",
            Self::SubtaskCompleted(_) => "subtask-completed",
            Self::SubtaskFailed(_) => "subtask-failed",
            Self::StepStart(_) => "step-start",
            Self::StepResult(_) => "step-result",
            Self::StepCompleted(_) => "step-completed",
            Self::StepError(_) => "step-error",
            Self::TaskCompleted(_) => "task-completed",
            Self::Log(_) => "log",
            Self::CommandOutput(_) => "command-output",
            Self::Unknown => "unknown",
        }
    }

    /// Project the event belongs to, if it says.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::FeatureStarted(e)
            | Self::FeaturePlanning(e)
            | Self::FeaturePlanned(e)
            | Self::FeatureCompleted(e)
            | Self::FeatureAwaitingTest(e)
            | Self::FeatureManuallyCompleted(e)
            | Self::FeaturePaused(e)
            | Self::FeatureFailed(e)
            | Self::FeaturePauseRequested(e) => e.project_id.as_deref(),
            Self::PlannerProgress(e) => e.project_id.as_deref(),
            Self::VoteSummary(e) => e.project_id.as_deref(),
            Self::SubtaskStarted(e) | Self::SubtaskCompleted(e) | Self::SubtaskFailed(e) => {
                e.project_id.as_deref()
            }
            _ => None,
        }
    }

    pub fn feature_id(&self) -> Option<&str> {
        match self {
            Self::FeatureStarted(e)
            | Self::FeaturePlanning(e)
            | Self::FeaturePlanned(e)
            | Self::FeatureCompleted(e)
            | Self::FeatureAwaitingTest(e)
            | Self::FeatureManuallyCompleted(e)
            | Self::FeaturePaused(e)
            | Self::FeatureFailed(e)
            | Self::FeaturePauseRequested(e) => e.feature_id.as_deref(),
            Self::PlannerProgress(e) => e.feature_id.as_deref(),
            Self::VoteSummary(e) => e.feature_id.as_deref(),
            Self::SubtaskStarted(e) | Self::SubtaskCompleted(e) | Self::SubtaskFailed(e) => {
                e.feature_id.as_deref()
            }
            _ => None,
        }
    }

    /// Task id for the legacy step events; `None` for everything else.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::StepStart(e)
            | Self::StepResult(e)
            | Self::StepCompleted(e)
            | Self::StepError(e)
            | Self::TaskCompleted(e) => e.task_id.as_deref(),
            Self::Log(e) | Self::CommandOutput(e) => e.task_id.as_deref(),
            _ => None,
        }
    }

    /// Events that end a feature's active execution.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::FeatureCompleted(_)
                | Self::FeatureFailed(_)
                | Self::FeaturePaused(_)
                | Self::FeatureAwaitingTest(_)
        )
    }

    /// Legacy step events are filtered by task id rather than project id.
    pub fn is_task_scoped(&self) -> bool {
        matches!(
            self,
            Self::StepStart(_)
                | Self::StepResult(_)
                | Self::StepCompleted(_)
                | Self::StepError(_)
                | Self::TaskCompleted(_)
                | Self::Log(_)
                | Self::CommandOutput(_)
        )
    }
}

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Created,
    Bootstrapping,
    Active,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Bootstrapping => "bootstrapping",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "bootstrapping" => Ok(Self::Bootstrapping),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid project status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub created_at: String,
}

/// Priority tier. `A` is fixed-order; `B` and `C` are user-reorderable.
///
/// The derived `Ord` follows declaration order, so `A < B < C` and sorting
/// ascending yields the highest tier first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    A,
    B,
    C,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }

    /// Whether features of this tier can be moved by a drag gesture.
    pub fn is_reorderable(&self) -> bool {
        !matches!(self, Self::A)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            "C" | "c" => Ok(Self::C),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Verified,
    Failed,
    HumanTesting,
}

impl FeatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Verified => "verified",
            Self::Failed => "failed",
            Self::HumanTesting => "human_testing",
        }
    }

    /// Completed or verified features satisfy the dependencies of others.
    pub fn satisfies_dependents(&self) -> bool {
        matches!(self, Self::Completed | Self::Verified)
    }
}

impl std::fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "verified" => Ok(Self::Verified),
            "failed" => Ok(Self::Failed),
            "human_testing" => Ok(Self::HumanTesting),
            _ => Err(format!("Invalid feature status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    pub status: FeatureStatus,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub order_index: i64,
}

impl Feature {
    /// Whether `dep` (short or fully-qualified) refers to this feature.
    pub fn matches_id(&self, dep: &str) -> bool {
        ids_match(&self.id, dep)
    }
}

/// Compare two feature ids, tolerating one side being fully qualified
/// (`project/feature` or `project:feature`) and the other short.
pub fn ids_match(a: &str, b: &str) -> bool {
    a == b || short_id(a) == short_id(b)
}

fn short_id(id: &str) -> &str {
    id.rsplit(['/', ':']).next().unwrap_or(id)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl SubtaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubtaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid subtask status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub feature_id: String,
    pub intent: String,
    pub status: SubtaskStatus,
    #[serde(default)]
    pub apply_path: Option<String>,
    #[serde(default)]
    pub apply_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

// Wire types for the command surface

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsResponse {
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesResponse {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtasksResponse {
    pub subtasks: Vec<Subtask>,
}

/// A feature the server (or the local precheck) refused to start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockedFeature {
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Raw reply to `start-execution`. Older servers answer with `ok`, newer
/// ones with `started`; both are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExecutionResponse {
    #[serde(default)]
    pub started: Option<bool>,
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub feature_id: Option<String>,
    #[serde(default)]
    pub feature_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub blocked: Vec<BlockedFeature>,
}

/// Outcome of an "execute next" request. `Blocked` is a normal result.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteOutcome {
    Started {
        feature_id: String,
        feature_name: Option<String>,
    },
    Blocked {
        message: String,
        blocked: Vec<BlockedFeature>,
    },
    Rejected {
        message: String,
    },
}

impl From<StartExecutionResponse> for ExecuteOutcome {
    fn from(resp: StartExecutionResponse) -> Self {
        let started = resp.started.or(resp.ok).unwrap_or(false);
        match (started, resp.feature_id) {
            (true, Some(feature_id)) => Self::Started {
                feature_id,
                feature_name: resp.feature_name,
            },
            _ if !resp.blocked.is_empty() => Self::Blocked {
                message: resp
                    .message
                    .unwrap_or_else(|| "All remaining features are blocked".to_string()),
                blocked: resp.blocked,
            },
            _ => Self::Rejected {
                message: resp
                    .message
                    .unwrap_or_else(|| "Server did not start a feature".to_string()),
            },
        }
    }
}

/// Generic `{ok, message?, error?}` acknowledgment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandAck {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CommandAck {
    /// Best human-readable reason for a rejection.
    pub fn reason(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "no reason given".to_string())
    }
}

/// One entry of a reorder proposal; `order_index` is 1-based.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderEntry {
    pub id: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub ordering: Vec<OrderEntry>,
}

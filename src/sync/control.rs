//! Execution control state machine.
//!
//! ```text
//!            start ack / feature-started
//!   Idle ───────────────────────────────> Running(f)
//!    ^                                        │
//!    │ terminal event            stop ack /   │
//!    │                 feature-pause-requested│
//!    │                                        v
//!    └──────────── terminal event ─────── Stopping(f)
//! ```
//!
//! Terminal events reset to `Idle` whatever feature id they carry. The push
//! stream is the event of record, so local state must never stay attached
//! to a stale running id.

use serde::Serialize;
use tracing::debug;

use crate::errors::{SyncError, SyncResult};
use crate::sync::models::{Feature, FeatureStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "featureId", rename_all = "snake_case")]
pub enum ControlState {
    Idle,
    Running(String),
    Stopping(String),
}

/// The single enabled action of the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    RequestStop,
    /// A stop is outstanding; nothing can be issued.
    Stopping,
}

impl ControlAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::RequestStop => "request stop",
            Self::Stopping => "stopping",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionControl {
    running_feature_id: Option<String>,
    stopping_feature_id: Option<String>,
}

impl ExecutionControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running_feature_id(&self) -> Option<&str> {
        self.running_feature_id.as_deref()
    }

    pub fn stopping_feature_id(&self) -> Option<&str> {
        self.stopping_feature_id.as_deref()
    }

    pub fn state(&self) -> ControlState {
        match (&self.running_feature_id, &self.stopping_feature_id) {
            (None, _) => ControlState::Idle,
            (Some(running), Some(_)) => ControlState::Stopping(running.clone()),
            (Some(running), None) => ControlState::Running(running.clone()),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.running_feature_id.is_none()
    }

    pub fn available_action(&self) -> ControlAction {
        match self.state() {
            ControlState::Idle => ControlAction::Start,
            ControlState::Running(_) => ControlAction::RequestStop,
            ControlState::Stopping(_) => ControlAction::Stopping,
        }
    }

    /// Refuse a start unless the control surface currently offers it.
    pub fn ensure_can_start(&self) -> SyncResult<()> {
        match self.state() {
            ControlState::Idle => Ok(()),
            ControlState::Running(feature_id) => Err(SyncError::ExecutionInProgress { feature_id }),
            ControlState::Stopping(feature_id) => Err(SyncError::StopPending { feature_id }),
        }
    }

    /// Refuse a stop unless a feature is running and no stop is outstanding.
    /// Returns the feature to stop.
    pub fn ensure_can_stop(&self) -> SyncResult<String> {
        match self.state() {
            ControlState::Idle => Err(SyncError::NotRunning),
            ControlState::Running(feature_id) => Ok(feature_id),
            ControlState::Stopping(feature_id) => Err(SyncError::StopPending { feature_id }),
        }
    }

    /// Server acknowledged a start command. A repeat for the already
    /// running id is a no-op, so whichever of ack and `feature-started`
    /// arrives second changes nothing.
    pub fn start_acknowledged(&mut self, feature_id: &str) -> bool {
        if self.running_feature_id.as_deref() == Some(feature_id) {
            return false;
        }
        self.running_feature_id = Some(feature_id.to_string());
        self.stopping_feature_id = None;
        true
    }

    /// `feature-started` from the stream: running is set and any stop flag
    /// cleared regardless of the prior value.
    pub fn on_feature_started(&mut self, feature_id: Option<&str>) -> bool {
        let Some(feature_id) = feature_id else {
            debug!("feature-started without featureId, control unchanged");
            return false;
        };
        let changed = self.running_feature_id.as_deref() != Some(feature_id)
            || self.stopping_feature_id.is_some();
        self.running_feature_id = Some(feature_id.to_string());
        self.stopping_feature_id = None;
        changed
    }

    /// Move `Running(f)` to `Stopping(f)`. Used both for an acknowledged
    /// user stop and for a server-originated `feature-pause-requested`.
    /// An event without an id applies to the running feature; a
    /// mismatched id or an idle machine is ignored.
    pub fn mark_stopping(&mut self, feature_id: Option<&str>) -> bool {
        let Some(running) = self.running_feature_id.as_deref() else {
            return false;
        };
        if feature_id.is_some_and(|id| id != running) {
            debug!(running, requested = ?feature_id, "pause request for another feature ignored");
            return false;
        }
        if self.stopping_feature_id.is_some() {
            return false;
        }
        self.stopping_feature_id = Some(running.to_string());
        true
    }

    /// Any terminal event resets to idle.
    pub fn on_terminal(&mut self) -> bool {
        let changed = self.running_feature_id.is_some() || self.stopping_feature_id.is_some();
        self.running_feature_id = None;
        self.stopping_feature_id = None;
        changed
    }

    /// Re-derive from an authoritative feature list after a reconnect.
    /// A stop flag survives only if the same feature is still running.
    pub fn reconcile_with(&mut self, features: &[Feature]) -> bool {
        let before = self.clone();
        match features.iter().find(|f| f.status == FeatureStatus::Running) {
            Some(running) => {
                if self.running_feature_id.as_deref() != Some(running.id.as_str()) {
                    self.running_feature_id = Some(running.id.clone());
                    self.stopping_feature_id = None;
                }
            }
            None => {
                self.running_feature_id = None;
                self.stopping_feature_id = None;
            }
        }
        *self != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::models::Priority;

    fn feature(id: &str, status: FeatureStatus) -> Feature {
        Feature {
            id: id.to_string(),
            project_id: "p1".to_string(),
            name: id.to_string(),
            description: String::new(),
            priority: Priority::B,
            status,
            depends_on: vec![],
            order_index: 0,
        }
    }

    #[test]
    fn test_new_machine_is_idle_and_offers_start() {
        let control = ExecutionControl::new();
        assert_eq!(control.state(), ControlState::Idle);
        assert_eq!(control.available_action(), ControlAction::Start);
        assert!(control.ensure_can_start().is_ok());
        assert!(matches!(control.ensure_can_stop(), Err(SyncError::NotRunning)));
    }

    #[test]
    fn test_start_ack_then_event_is_single_transition() {
        let mut control = ExecutionControl::new();
        assert!(control.start_acknowledged("f1"));
        assert!(!control.on_feature_started(Some("f1")));
        assert_eq!(control.state(), ControlState::Running("f1".to_string()));
    }

    #[test]
    fn test_event_then_start_ack_is_single_transition() {
        let mut control = ExecutionControl::new();
        assert!(control.on_feature_started(Some("f1")));
        assert!(!control.start_acknowledged("f1"));
        assert_eq!(control.available_action(), ControlAction::RequestStop);
    }

    #[test]
    fn test_stop_flow_reaches_idle_on_terminal() {
        let mut control = ExecutionControl::new();
        control.start_acknowledged("f1");
        assert_eq!(control.ensure_can_stop().unwrap(), "f1");
        assert!(control.mark_stopping(Some("f1")));
        assert_eq!(control.state(), ControlState::Stopping("f1".to_string()));
        assert_eq!(control.available_action(), ControlAction::Stopping);
        assert!(matches!(
            control.ensure_can_start(),
            Err(SyncError::StopPending { .. })
        ));
        assert!(matches!(
            control.ensure_can_stop(),
            Err(SyncError::StopPending { .. })
        ));
        assert!(control.on_terminal());
        assert_eq!(control.state(), ControlState::Idle);
    }

    #[test]
    fn test_stopping_only_reachable_from_running() {
        let mut control = ExecutionControl::new();
        assert!(!control.mark_stopping(Some("f1")));
        assert!(!control.mark_stopping(None));
        assert_eq!(control.state(), ControlState::Idle);
    }

    #[test]
    fn test_pause_request_for_other_feature_is_ignored() {
        let mut control = ExecutionControl::new();
        control.on_feature_started(Some("f1"));
        assert!(!control.mark_stopping(Some("f2")));
        assert_eq!(control.state(), ControlState::Running("f1".to_string()));
    }

    #[test]
    fn test_pause_request_without_id_applies_to_running() {
        let mut control = ExecutionControl::new();
        control.on_feature_started(Some("f1"));
        assert!(control.mark_stopping(None));
        assert_eq!(control.stopping_feature_id(), Some("f1"));
    }

    #[test]
    fn test_feature_started_clears_stop_flag() {
        let mut control = ExecutionControl::new();
        control.on_feature_started(Some("f1"));
        control.mark_stopping(Some("f1"));
        assert!(control.on_feature_started(Some("f2")));
        assert_eq!(control.state(), ControlState::Running("f2".to_string()));
        assert_eq!(control.stopping_feature_id(), None);
    }

    #[test]
    fn test_feature_started_without_id_is_ignored() {
        let mut control = ExecutionControl::new();
        assert!(!control.on_feature_started(None));
        assert!(control.is_idle());
    }

    #[test]
    fn test_running_refuses_second_start() {
        let mut control = ExecutionControl::new();
        control.start_acknowledged("f1");
        match control.ensure_can_start() {
            Err(SyncError::ExecutionInProgress { feature_id }) => assert_eq!(feature_id, "f1"),
            other => panic!("Expected ExecutionInProgress, got {:?}", other),
        }
    }

    #[test]
    fn test_reconcile_adopts_running_feature() {
        let mut control = ExecutionControl::new();
        let features = vec![
            feature("f1", FeatureStatus::Completed),
            feature("f2", FeatureStatus::Running),
        ];
        assert!(control.reconcile_with(&features));
        assert_eq!(control.state(), ControlState::Running("f2".to_string()));
    }

    #[test]
    fn test_reconcile_keeps_stop_flag_for_same_feature() {
        let mut control = ExecutionControl::new();
        control.start_acknowledged("f2");
        control.mark_stopping(Some("f2"));
        let features = vec![feature("f2", FeatureStatus::Running)];
        assert!(!control.reconcile_with(&features));
        assert_eq!(control.state(), ControlState::Stopping("f2".to_string()));
    }

    #[test]
    fn test_reconcile_resets_when_nothing_runs() {
        let mut control = ExecutionControl::new();
        control.start_acknowledged("f1");
        let features = vec![feature("f1", FeatureStatus::Paused)];
        assert!(control.reconcile_with(&features));
        assert!(control.is_idle());
    }

    #[derive(Clone, Copy, Debug)]
    enum Step {
        Started(&'static str),
        PauseRequested(&'static str),
        Terminal,
    }

    fn sequences(len: usize) -> Vec<Vec<Step>> {
        let alphabet = [
            Step::Started("f1"),
            Step::Started("f2"),
            Step::PauseRequested("f1"),
            Step::Terminal,
        ];
        let mut out = vec![vec![]];
        for _ in 0..len {
            out = out
                .into_iter()
                .flat_map(|seq| {
                    alphabet.iter().map(move |s| {
                        let mut next = seq.clone();
                        next.push(*s);
                        next
                    })
                })
                .collect();
        }
        out
    }

    #[test]
    fn test_running_is_none_iff_last_lifecycle_event_was_terminal() {
        for len in 1..=5 {
            for seq in sequences(len) {
                let mut control = ExecutionControl::new();
                let mut last_was_terminal = true;
                for step in &seq {
                    match step {
                        Step::Started(id) => {
                            control.on_feature_started(Some(id));
                            last_was_terminal = false;
                        }
                        Step::PauseRequested(id) => {
                            control.mark_stopping(Some(id));
                        }
                        Step::Terminal => {
                            control.on_terminal();
                            last_was_terminal = true;
                        }
                    }
                    if let Some(stopping) = control.stopping_feature_id() {
                        assert_eq!(Some(stopping), control.running_feature_id(), "{:?}", seq);
                    }
                }
                assert_eq!(control.running_feature_id().is_none(), last_was_terminal, "{:?}", seq);
            }
        }
    }

    #[test]
    fn test_stopping_never_returns_to_running_without_start() {
        for seq in sequences(5) {
            let mut control = ExecutionControl::new();
            for step in &seq {
                let was_stopping = matches!(control.state(), ControlState::Stopping(_));
                match step {
                    Step::Started(id) => {
                        control.on_feature_started(Some(id));
                    }
                    Step::PauseRequested(id) => {
                        control.mark_stopping(Some(id));
                        if was_stopping {
                            assert!(matches!(control.state(), ControlState::Stopping(_)));
                        }
                    }
                    Step::Terminal => {
                        control.on_terminal();
                        assert_eq!(control.state(), ControlState::Idle);
                    }
                }
            }
        }
    }
}

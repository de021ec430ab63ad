//! Dashboard session.
//!
//! A [`DashboardSession`] owns the [`Store`], the command API and the render
//! sink. It is the single writer: stream signals, effects and user commands
//! are all applied here, one at a time, and the sink is handed the store
//! after each of them.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::errors::{SyncError, SyncResult};
use crate::sync::api::DashboardApi;
use crate::sync::cache::Store;
use crate::sync::models::{ExecuteOutcome, OrderEntry, Project};
use crate::sync::reconciler::{self, Effect, Notice, NoticeLevel};
use crate::sync::render::RenderSink;
use crate::sync::reorder;
use crate::sync::stream::{EventStreamClient, StreamSignal};

const SIGNAL_BUFFER: usize = 256;

pub struct DashboardSession {
    id: Uuid,
    store: Store,
    api: Arc<dyn DashboardApi>,
    sink: Box<dyn RenderSink>,
    signals: Option<mpsc::Receiver<StreamSignal>>,
    stream_task: Option<JoinHandle<()>>,
    /// Set initially and by every disconnect. The next `Connected` then
    /// triggers a resync, which also covers events published before the
    /// first subscription was live.
    resync_on_connect: bool,
}

impl DashboardSession {
    pub fn new(api: Arc<dyn DashboardApi>, sink: Box<dyn RenderSink>) -> Self {
        Self {
            id: Uuid::new_v4(),
            store: Store::new(),
            api,
            sink,
            signals: None,
            stream_task: None,
            resync_on_connect: true,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Open the push channel. Only one subscription ever exists per session;
    /// later calls return `false` and leave the running one alone.
    pub fn connect(&mut self, client: EventStreamClient) -> bool {
        if self.stream_task.is_some() || self.signals.is_some() {
            debug!(session = %self.id, "stream already connected");
            return false;
        }
        let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);
        self.stream_task = Some(client.spawn(tx));
        self.signals = Some(rx);
        info!(session = %self.id, "stream subscription opened");
        true
    }

    /// Feed the session from an arbitrary signal source. Refused once any
    /// source is in place, including a stream opened by [`Self::connect`].
    pub fn attach(&mut self, signals: mpsc::Receiver<StreamSignal>) -> bool {
        if self.signals.is_some() || self.stream_task.is_some() {
            debug!(session = %self.id, "signal source already attached");
            return false;
        }
        self.signals = Some(signals);
        true
    }

    /// Process stream signals until the channel closes.
    pub async fn run(&mut self) -> SyncResult<()> {
        let Some(mut signals) = self.signals.take() else {
            return Err(SyncError::Other(anyhow::anyhow!("session has no stream attached")));
        };
        let span = info_span!("session", id = %self.id);
        async {
            while let Some(signal) = signals.recv().await {
                self.handle_signal(signal).await;
            }
            info!("stream channel closed");
        }
        .instrument(span)
        .await;
        Ok(())
    }

    pub async fn handle_signal(&mut self, signal: StreamSignal) {
        match signal {
            StreamSignal::Connected => {
                if self.resync_on_connect {
                    info!(session = %self.id, "stream connected, resyncing");
                    self.resync().await;
                }
                self.resync_on_connect = false;
            }
            StreamSignal::Message(raw) => {
                let effects = reconciler::reduce_raw(&mut self.store, &raw);
                self.run_effects(effects).await;
            }
            StreamSignal::Disconnected(reason) => {
                warn!(session = %self.id, reason = %reason, "stream disconnected");
                self.resync_on_connect = true;
            }
        }
        self.sink.render(&self.store);
    }

    /// Perform the reducer's effects. Fetch failures are logged; the view
    /// stays stale until the next successful fetch.
    pub async fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::RefetchProjects => match self.api.list_projects().await {
                    Ok(projects) => self.store.cache.replace_projects(projects),
                    Err(e) => warn!(error = %e, "project re-fetch failed"),
                },
                Effect::RefetchFeatures { project_id } => {
                    match self.api.fetch_features(&project_id).await {
                        Ok(features) => self.store.apply_features(&project_id, features),
                        Err(e) => warn!(project_id = %project_id, error = %e, "feature re-fetch failed"),
                    }
                }
                Effect::RefetchSubtasks { feature_id } => {
                    match self.api.fetch_subtasks(&feature_id).await {
                        Ok(subtasks) => self.store.cache.replace_subtasks(&feature_id, subtasks),
                        Err(e) => warn!(feature_id = %feature_id, error = %e, "subtask re-fetch failed"),
                    }
                }
                Effect::Notify(notice) => self.sink.notify(&notice),
            }
        }
    }

    pub async fn load_projects(&mut self) -> SyncResult<&[Project]> {
        let projects = self.api.list_projects().await?;
        self.store.cache.replace_projects(projects);
        self.sink.render(&self.store);
        Ok(&self.store.cache.projects)
    }

    /// Switch to `project_id` and fetch its features. Execution control is
    /// re-derived from the fetched statuses.
    pub async fn select_project(&mut self, project_id: &str) -> SyncResult<()> {
        self.store.select_project(project_id);
        self.refresh_features().await
    }

    pub async fn select_feature(&mut self, feature_id: Option<&str>) -> SyncResult<()> {
        let active = self.store.cache.active_features();
        if let Some(id) = feature_id
            && !active.is_empty()
            && !active.iter().any(|f| f.matches_id(id))
        {
            return Err(SyncError::UnknownFeature { id: id.to_string() });
        }
        self.store.select_feature(feature_id);
        if let Some(feature_id) = feature_id {
            let subtasks = self.api.fetch_subtasks(feature_id).await?;
            self.store.cache.replace_subtasks(feature_id, subtasks);
        }
        self.sink.render(&self.store);
        Ok(())
    }

    pub fn watch_task(&mut self, task_id: Option<&str>) {
        self.store.watch_task(task_id);
    }

    pub async fn refresh_features(&mut self) -> SyncResult<()> {
        let project_id = self.active_project()?;
        let features = self.api.fetch_features(&project_id).await?;
        self.store.apply_features(&project_id, features);
        self.sink.render(&self.store);
        Ok(())
    }

    /// Full refresh of everything in view. Execution control is re-derived
    /// from the fetched feature statuses.
    async fn resync(&mut self) {
        let effects = reconciler::on_reconnect(&mut self.store);
        self.run_effects(effects).await;
    }

    /// Ask the server to start the next runnable feature.
    ///
    /// A blocked project is a normal outcome. When the cached feature list
    /// already shows every pending feature blocked, nothing is sent.
    pub async fn execute_next(&mut self) -> SyncResult<ExecuteOutcome> {
        let project_id = self.active_project()?;
        self.store.control.ensure_can_start()?;

        let cache = &self.store.cache;
        if !cache.features_for(&project_id).is_empty() && cache.runnable_features(&project_id).is_empty() {
            let blocked = cache.blocked_summary(&project_id);
            if !blocked.is_empty() {
                debug!(project_id = %project_id, blocked = blocked.len(), "all pending features blocked");
                let outcome = ExecuteOutcome::Blocked {
                    message: "All remaining features are blocked by unmet dependencies".to_string(),
                    blocked,
                };
                self.notify_outcome(&outcome);
                return Ok(outcome);
            }
        }

        let outcome = ExecuteOutcome::from(self.api.start_execution(&project_id).await?);
        self.notify_outcome(&outcome);
        match &outcome {
            ExecuteOutcome::Started { feature_id, .. } => {
                info!(project_id = %project_id, feature_id = %feature_id, "execution started");
                self.store.control.start_acknowledged(feature_id);
                self.store.cache.set_activity(
                    &project_id,
                    crate::sync::cache::ProjectActivity::Running(feature_id.clone()),
                );
            }
            ExecuteOutcome::Blocked { .. } => {}
            ExecuteOutcome::Rejected { message } => {
                return Err(SyncError::CommandRejected {
                    command: "execute-next".to_string(),
                    message: message.clone(),
                });
            }
        }
        self.sink.render(&self.store);
        Ok(outcome)
    }

    /// Ask the server to stop the running feature after its current unit
    /// of work. Control moves to `Stopping` once the server accepts; the
    /// terminal event brings it back to `Idle`.
    pub async fn request_stop(&mut self) -> SyncResult<String> {
        let feature_id = self.store.control.ensure_can_stop()?;
        let ack = self.api.request_pause(&feature_id).await?;
        if !ack.ok {
            return Err(self.rejected("stop", ack.reason()));
        }
        self.store.control.mark_stopping(Some(&feature_id));
        info!(feature_id = %feature_id, "stop requested");
        self.sink.render(&self.store);
        Ok(feature_id)
    }

    /// Submit a reorder of the active project. The feature list is
    /// re-fetched whatever the answer.
    pub async fn reorder(&mut self, emitted: &[OrderEntry]) -> SyncResult<Vec<OrderEntry>> {
        let project_id = self.active_project()?;
        let result = reorder::submit(self.api.as_ref(), &mut self.store, &project_id, emitted).await;
        match &result {
            Ok(proposal) => self.sink.notify(&Notice::new(
                NoticeLevel::Success,
                format!("Saved order of {} features", proposal.len()),
            )),
            Err(e) => self.sink.notify(&Notice::new(NoticeLevel::Error, e.to_string())),
        }
        self.sink.render(&self.store);
        result
    }

    pub async fn retry_feature(&mut self, feature_id: &str) -> SyncResult<()> {
        let ack = self.api.retry_feature(feature_id).await?;
        if !ack.ok {
            return Err(self.rejected("retry-feature", ack.reason()));
        }
        let mut effects = Vec::new();
        if let Some(project_id) = self.store.cache.active_project_id.clone() {
            effects.push(Effect::RefetchFeatures { project_id });
        }
        if self.store.cache.is_active_feature(feature_id) {
            effects.push(Effect::RefetchSubtasks {
                feature_id: feature_id.to_string(),
            });
        }
        self.run_effects(effects).await;
        self.sink.render(&self.store);
        Ok(())
    }

    pub async fn retry_subtask(&mut self, subtask_id: &str) -> SyncResult<()> {
        let ack = self.api.retry_subtask(subtask_id).await?;
        if !ack.ok {
            return Err(self.rejected("retry-subtask", ack.reason()));
        }
        let owner = self
            .store
            .cache
            .subtasks
            .iter()
            .find(|(_, subtasks)| subtasks.iter().any(|s| s.id == subtask_id))
            .map(|(feature_id, _)| feature_id.clone())
            .or_else(|| self.store.cache.active_feature_id.clone());
        if let Some(feature_id) = owner {
            self.run_effects(vec![Effect::RefetchSubtasks { feature_id }]).await;
        }
        self.sink.render(&self.store);
        Ok(())
    }

    fn active_project(&self) -> SyncResult<String> {
        self.store
            .cache
            .active_project_id
            .clone()
            .ok_or(SyncError::NoActiveProject)
    }

    /// Surface a rejection to the user and build the error. Local state is
    /// left as it was.
    fn rejected(&mut self, command: &str, message: String) -> SyncError {
        warn!(command, message = %message, "command rejected");
        let err = SyncError::CommandRejected {
            command: command.to_string(),
            message,
        };
        self.sink.notify(&Notice::new(NoticeLevel::Error, err.to_string()));
        err
    }

    fn notify_outcome(&mut self, outcome: &ExecuteOutcome) {
        let notice = match outcome {
            ExecuteOutcome::Started { feature_id, feature_name } => Notice::new(
                NoticeLevel::Success,
                format!("Started {}", feature_name.as_deref().unwrap_or(feature_id)),
            ),
            ExecuteOutcome::Blocked { message, blocked } => Notice::new(
                NoticeLevel::Warning,
                format!("{} ({} blocked)", message, blocked.len()),
            ),
            ExecuteOutcome::Rejected { message } => Notice::new(NoticeLevel::Error, message.clone()),
        };
        self.sink.notify(&notice);
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
    }
}

//! Command surface consumed by the synchronization core.
//!
//! [`DashboardApi`] abstracts the server's HTTP endpoints so the session can
//! be driven by a test double. [`HttpApi`] is the reqwest implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::errors::{SyncError, SyncResult};
use crate::sync::models::{
    CommandAck, Feature, FeaturesResponse, OrderEntry, Project, ProjectsResponse,
    ReorderRequest, StartExecutionResponse, Subtask, SubtasksResponse,
};

/// Abstraction over the dashboard server for testability.
/// Real implementation: `HttpApi`. Test double: `mock::MockApi`.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn list_projects(&self) -> SyncResult<Vec<Project>>;

    async fn fetch_features(&self, project_id: &str) -> SyncResult<Vec<Feature>>;

    async fn fetch_subtasks(&self, feature_id: &str) -> SyncResult<Vec<Subtask>>;

    async fn start_execution(&self, project_id: &str) -> SyncResult<StartExecutionResponse>;

    async fn request_pause(&self, feature_id: &str) -> SyncResult<CommandAck>;

    async fn reorder(&self, project_id: &str, ordering: &[OrderEntry]) -> SyncResult<CommandAck>;

    async fn retry_feature(&self, feature_id: &str) -> SyncResult<CommandAck>;

    async fn retry_subtask(&self, subtask_id: &str) -> SyncResult<CommandAck>;
}

pub struct HttpApi {
    client: Client,
    base_url: Url,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dashsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| SyncError::Http {
                endpoint: base_url.to_string(),
                source,
            })?;
        let base_url = Url::parse(base_url)
            .map_err(|e| SyncError::Config(format!("server url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::Config(format!(
                "server url '{}' cannot carry a path",
                base_url
            )));
        }
        Ok(Self { client, base_url })
    }

    /// Endpoint URL under the base. Each segment is percent-encoded on its
    /// own, so an id containing `/` or `#` stays a single segment.
    fn url(&self, segments: &[&str]) -> SyncResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::Config(format!("server url '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON document; any non-success status is a transport error.
    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> SyncResult<T> {
        let url = self.url(segments)?;
        let path = url.path().to_string();
        debug!(path = %path, "GET");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| http_error(&path, source))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Status {
                endpoint: path,
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<T>().await.map_err(|source| http_error(&path, source))
    }

    /// POST a command. Rejections often come back as 4xx with an
    /// `{ok:false, error}` body, so the body is parsed before the status
    /// is judged.
    async fn post_command<B, T>(&self, segments: &[&str], body: Option<&B>) -> SyncResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(segments)?;
        let path = url.path().to_string();
        debug!(path = %path, "POST");
        let mut req = self.client.request(Method::POST, url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await.map_err(|source| http_error(&path, source))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|source| http_error(&path, source))?;
        match serde_json::from_str::<T>(&text) {
            Ok(parsed) if status.is_success() || status.is_client_error() => Ok(parsed),
            _ if status == StatusCode::NO_CONTENT || (status.is_success() && text.is_empty()) => {
                serde_json::from_str("{\"ok\":true}").map_err(|e| SyncError::Other(e.into()))
            }
            _ => Err(SyncError::Status {
                endpoint: path,
                status: status.as_u16(),
                body: text,
            }),
        }
    }
}

fn http_error(path: &str, source: reqwest::Error) -> SyncError {
    SyncError::Http {
        endpoint: path.to_string(),
        source,
    }
}

#[async_trait]
impl DashboardApi for HttpApi {
    async fn list_projects(&self) -> SyncResult<Vec<Project>> {
        let resp: ProjectsResponse = self.get_json(&["api", "projects"]).await?;
        Ok(resp.projects)
    }

    async fn fetch_features(&self, project_id: &str) -> SyncResult<Vec<Feature>> {
        let resp: FeaturesResponse = self
            .get_json(&["api", "projects", project_id, "features"])
            .await?;
        Ok(resp.features)
    }

    async fn fetch_subtasks(&self, feature_id: &str) -> SyncResult<Vec<Subtask>> {
        let resp: SubtasksResponse = self
            .get_json(&["api", "features", feature_id, "subtasks"])
            .await?;
        Ok(resp.subtasks)
    }

    async fn start_execution(&self, project_id: &str) -> SyncResult<StartExecutionResponse> {
        self.post_command::<(), _>(&["api", "projects", project_id, "execute"], None)
            .await
    }

    async fn request_pause(&self, feature_id: &str) -> SyncResult<CommandAck> {
        self.post_command::<(), _>(&["api", "features", feature_id, "pause"], None)
            .await
    }

    async fn reorder(&self, project_id: &str, ordering: &[OrderEntry]) -> SyncResult<CommandAck> {
        let body = ReorderRequest {
            ordering: ordering.to_vec(),
        };
        self.post_command(
            &["api", "projects", project_id, "features", "reorder"],
            Some(&body),
        )
        .await
    }

    async fn retry_feature(&self, feature_id: &str) -> SyncResult<CommandAck> {
        self.post_command::<(), _>(&["api", "features", feature_id, "retry"], None)
            .await
    }

    async fn retry_subtask(&self, subtask_id: &str) -> SyncResult<CommandAck> {
        self.post_command::<(), _>(&["api", "subtasks", subtask_id, "retry"], None)
            .await
    }
}

#[cfg(test)]
pub mod mock {
    //! In-memory `DashboardApi` that records every call.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        ListProjects,
        FetchFeatures(String),
        FetchSubtasks(String),
        StartExecution(String),
        RequestPause(String),
        Reorder(String, Vec<OrderEntry>),
        RetryFeature(String),
        RetrySubtask(String),
    }

    #[derive(Default)]
    pub struct MockApi {
        pub calls: Mutex<Vec<Call>>,
        pub projects: Mutex<Vec<Project>>,
        pub features: Mutex<HashMap<String, Vec<Feature>>>,
        pub subtasks: Mutex<HashMap<String, Vec<Subtask>>>,
        pub start_response: Mutex<StartExecutionResponse>,
        pub ack: Mutex<CommandAck>,
        pub fail_fetches: Mutex<bool>,
    }

    impl MockApi {
        pub fn new() -> Self {
            Self {
                ack: Mutex::new(CommandAck {
                    ok: true,
                    message: None,
                    error: None,
                }),
                ..Default::default()
            }
        }

        pub fn with_features(self, project_id: &str, features: Vec<Feature>) -> Self {
            self.features
                .lock()
                .unwrap()
                .insert(project_id.to_string(), features);
            self
        }

        pub fn set_features(&self, project_id: &str, features: Vec<Feature>) {
            self.features
                .lock()
                .unwrap()
                .insert(project_id.to_string(), features);
        }

        pub fn set_subtasks(&self, feature_id: &str, subtasks: Vec<Subtask>) {
            self.subtasks
                .lock()
                .unwrap()
                .insert(feature_id.to_string(), subtasks);
        }

        pub fn reject_commands(&self, error: &str) {
            *self.ack.lock().unwrap() = CommandAck {
                ok: false,
                message: None,
                error: Some(error.to_string()),
            };
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn clear_calls(&self) {
            self.calls.lock().unwrap().clear();
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn check_fetch(&self, endpoint: &str) -> SyncResult<()> {
            if *self.fail_fetches.lock().unwrap() {
                return Err(SyncError::Status {
                    endpoint: endpoint.to_string(),
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DashboardApi for MockApi {
        async fn list_projects(&self) -> SyncResult<Vec<Project>> {
            self.record(Call::ListProjects);
            self.check_fetch("/api/projects")?;
            Ok(self.projects.lock().unwrap().clone())
        }

        async fn fetch_features(&self, project_id: &str) -> SyncResult<Vec<Feature>> {
            self.record(Call::FetchFeatures(project_id.to_string()));
            self.check_fetch("features")?;
            Ok(self
                .features
                .lock()
                .unwrap()
                .get(project_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn fetch_subtasks(&self, feature_id: &str) -> SyncResult<Vec<Subtask>> {
            self.record(Call::FetchSubtasks(feature_id.to_string()));
            self.check_fetch("subtasks")?;
            Ok(self
                .subtasks
                .lock()
                .unwrap()
                .get(feature_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn start_execution(&self, project_id: &str) -> SyncResult<StartExecutionResponse> {
            self.record(Call::StartExecution(project_id.to_string()));
            Ok(self.start_response.lock().unwrap().clone())
        }

        async fn request_pause(&self, feature_id: &str) -> SyncResult<CommandAck> {
            self.record(Call::RequestPause(feature_id.to_string()));
            Ok(self.ack.lock().unwrap().clone())
        }

        async fn reorder(&self, project_id: &str, ordering: &[OrderEntry]) -> SyncResult<CommandAck> {
            self.record(Call::Reorder(project_id.to_string(), ordering.to_vec()));
            Ok(self.ack.lock().unwrap().clone())
        }

        async fn retry_feature(&self, feature_id: &str) -> SyncResult<CommandAck> {
            self.record(Call::RetryFeature(feature_id.to_string()));
            Ok(self.ack.lock().unwrap().clone())
        }

        async fn retry_subtask(&self, subtask_id: &str) -> SyncResult<CommandAck> {
            self.record(Call::RetrySubtask(subtask_id.to_string()));
            Ok(self.ack.lock().unwrap().clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::Path,
        http::{StatusCode as AxumStatus, Uri},
        routing::{get, post},
    };
    use serde_json::{Value, json};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn api(base: &str) -> HttpApi {
        HttpApi::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_features_parses_envelope() {
        let router = Router::new().route(
            "/api/projects/{id}/features",
            get(|Path(id): Path<String>| async move {
                Json(json!({"features": [{
                    "id": "f1", "projectId": id, "name": "Auth",
                    "priority": "A", "status": "pending", "dependsOn": [], "orderIndex": 1
                }]}))
            }),
        );
        let base = serve(router).await;
        let features = api(&base).fetch_features("p1").await.unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].project_id, "p1");
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_transport_error() {
        let router = Router::new().route(
            "/api/features/{id}/subtasks",
            get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "db down") }),
        );
        let base = serve(router).await;
        let err = api(&base).fetch_subtasks("f1").await.unwrap_err();
        match err {
            SyncError::Status { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "db down");
            }
            other => panic!("Expected Status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reorder_posts_camel_case_ordering() {
        let router = Router::new().route(
            "/api/projects/{id}/features/reorder",
            post(|Json(body): Json<Value>| async move {
                let first = &body["ordering"][0];
                let ok = first["id"] == "a1" && first["orderIndex"] == 1;
                Json(json!({"ok": ok}))
            }),
        );
        let base = serve(router).await;
        let ack = api(&base)
            .reorder(
                "p1",
                &[OrderEntry {
                    id: "a1".to_string(),
                    order_index: 1,
                }],
            )
            .await
            .unwrap();
        assert!(ack.ok);
    }

    #[tokio::test]
    async fn test_command_rejection_body_is_returned_on_client_error() {
        let router = Router::new().route(
            "/api/features/{id}/retry",
            post(|| async {
                (
                    AxumStatus::CONFLICT,
                    Json(json!({"ok": false, "error": "feature is running"})),
                )
            }),
        );
        let base = serve(router).await;
        let ack = api(&base).retry_feature("f1").await.unwrap();
        assert!(!ack.ok);
        assert_eq!(ack.reason(), "feature is running");
    }

    #[tokio::test]
    async fn test_start_execution_blocked_reply() {
        let router = Router::new().route(
            "/api/projects/{id}/execute",
            post(|| async {
                Json(json!({"message": "blocked", "blocked": [{"name": "Billing", "dependsOn": ["f1"]}]}))
            }),
        );
        let base = serve(router).await;
        let resp = api(&base).start_execution("p1").await.unwrap();
        assert_eq!(resp.blocked.len(), 1);
        assert_eq!(resp.started, None);
    }

    #[test]
    fn test_url_joins_segments_under_base() {
        let api = api("http://localhost:3000/");
        assert_eq!(
            api.url(&["api", "projects"]).unwrap().as_str(),
            "http://localhost:3000/api/projects"
        );
        let prefixed = HttpApi::new("http://localhost:3000/dash/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            prefixed.url(&["api", "projects"]).unwrap().path(),
            "/dash/api/projects"
        );
    }

    #[test]
    fn test_unparseable_base_url_is_config_error() {
        let err = HttpApi::new("not a url", Duration::from_secs(5)).err().unwrap();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[tokio::test]
    async fn test_ids_are_sent_as_single_path_segments() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();
        let router = Router::new().fallback(move |uri: Uri| {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push(uri.path().to_string());
                Json(json!({"subtasks": []}))
            }
        });
        let base = serve(router).await;
        let api = api(&base);
        api.fetch_subtasks("p1/f1").await.unwrap();
        api.fetch_subtasks("f#1").await.unwrap();
        api.retry_subtask("s?1").await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "/api/features/p1%2Ff1/subtasks".to_string(),
                "/api/features/f%231/subtasks".to_string(),
                "/api/subtasks/s%3F1/retry".to_string(),
            ]
        );
    }
}

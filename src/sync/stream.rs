//! Push-channel transport.
//!
//! The server pushes events as Server-Sent Events. [`SseDecoder`] turns raw
//! bytes into complete `data` payloads; [`EventStreamClient`] owns the HTTP
//! connection, reconnects with backoff and reports everything to the
//! session as [`StreamSignal`]s over an mpsc channel.

use std::time::Duration;

use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{SyncError, SyncResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSignal {
    Connected,
    Message(String),
    Disconnected(String),
}

/// Longest line the decoder buffers while waiting for a newline.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental SSE decoder. Only `data` fields matter; `event`, `id` and
/// `retry` fields and comment lines are skipped.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
    max_line: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            data: Vec::new(),
            max_line,
        }
    }

    /// Feed bytes; returns every payload completed by this chunk. A line
    /// longer than the cap is an error and the buffered input is dropped.
    pub fn push(&mut self, chunk: &[u8]) -> SyncResult<Vec<String>> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                if !self.data.is_empty() {
                    payloads.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            if field == "data" {
                self.data.push(value.to_string());
            }
        }
        if self.buffer.len() > self.max_line {
            let len = self.buffer.len();
            self.buffer.clear();
            self.data.clear();
            return Err(SyncError::MalformedEvent {
                reason: format!("line exceeds {} bytes without a newline ({} buffered)", self.max_line, len),
            });
        }
        Ok(payloads)
    }
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub url: String,
    pub idle_timeout: Duration,
    pub reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
}

pub struct EventStreamClient {
    client: Client,
    settings: StreamSettings,
}

impl EventStreamClient {
    pub fn new(settings: StreamSettings) -> SyncResult<Self> {
        // No overall request timeout: the response body is open-ended.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("dashsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| SyncError::Http {
                endpoint: settings.url.clone(),
                source,
            })?;
        Ok(Self { client, settings })
    }

    /// Run the connection loop on a background task. The task ends when the
    /// receiving side of `tx` is dropped.
    pub fn spawn(self, tx: mpsc::Sender<StreamSignal>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(tx).await })
    }

    async fn run(self, tx: mpsc::Sender<StreamSignal>) {
        let mut delay = self.settings.reconnect_delay;
        loop {
            let reason = match self.connect_once(&tx, &mut delay).await {
                Ok(()) => "stream ended".to_string(),
                Err(e) => e.to_string(),
            };
            if tx.is_closed() {
                return;
            }
            warn!(reason = %reason, retry_in_ms = delay.as_millis() as u64, "event stream disconnected");
            if tx.send(StreamSignal::Disconnected(reason)).await.is_err() {
                return;
            }
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(self.settings.max_reconnect_delay);
        }
    }

    /// One connection: returns when the body ends or fails.
    async fn connect_once(
        &self,
        tx: &mpsc::Sender<StreamSignal>,
        delay: &mut Duration,
    ) -> SyncResult<()> {
        let endpoint = self.settings.url.as_str();
        let mut resp = self
            .client
            .get(endpoint)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|source| SyncError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;
        if !resp.status().is_success() {
            return Err(SyncError::Status {
                endpoint: endpoint.to_string(),
                status: resp.status().as_u16(),
                body: String::new(),
            });
        }

        info!(url = endpoint, "event stream connected");
        *delay = self.settings.reconnect_delay;
        if tx.send(StreamSignal::Connected).await.is_err() {
            return Ok(());
        }

        let mut decoder = SseDecoder::new();
        loop {
            let chunk = tokio::time::timeout(self.settings.idle_timeout, resp.chunk())
                .await
                .map_err(|_| {
                    SyncError::Other(anyhow::anyhow!(
                        "no data for {}s",
                        self.settings.idle_timeout.as_secs()
                    ))
                })?
                .map_err(|source| SyncError::Http {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
            let Some(chunk) = chunk else {
                return Ok(());
            };
            for payload in decoder.push(&chunk)? {
                debug!(bytes = payload.len(), "stream message");
                if tx.send(StreamSignal::Message(payload)).await.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

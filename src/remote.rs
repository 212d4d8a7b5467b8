use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::app::Action;
use crate::model::task::{NewTask, Task, TaskStatus};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
const WAKE_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("task store unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
    #[error("task not found")]
    NotFound,
}

/// Response of `POST /tasks`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAck {
    pub id: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Client for the task store HTTP API. The store is the system of record for
/// tasks but may be parked cold between uses; callers are expected to fall
/// back to the local cache whenever a call reports failure.
#[derive(Clone)]
pub struct RemoteStore {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteStore {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Bounded liveness probe. Collapses every failure to `false`.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Poll the store until it answers, reporting each failed attempt on the
    /// action channel. The store cannot tell "still booting" from "down", so
    /// the loop has no attempt cap; the token is the only way out. Probes
    /// never overlap: the next tick waits for the previous probe to resolve.
    ///
    /// Returns `true` once awake (after emitting a single `BackendAwake`),
    /// `false` if cancelled first.
    pub async fn wake_up(&self, cancel: CancellationToken, tx: mpsc::UnboundedSender<Action>) -> bool {
        let mut tick = tokio::time::interval(WAKE_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempts = 0u32;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tick.tick() => {
                    attempts += 1;
                    if self.health_check().await {
                        let _ = tx.send(Action::BackendAwake);
                        return true;
                    }
                    let _ = tx.send(Action::WakeProbe(attempts));
                }
            }
        }
    }

    /// Full or status-filtered task list. Empty on any failure.
    pub async fn list_tasks(&self, filter: Option<TaskStatus>) -> Vec<Task> {
        let mut req = self.client.get(format!("{}/tasks", self.base_url));
        if let Some(status) = filter {
            req = req.query(&[("status", status.as_str())]);
        }
        match req.send().await {
            Ok(resp) if resp.status().is_success() => {
                resp.json::<Vec<Task>>().await.unwrap_or_else(|err| {
                    warn!(error = %err, "task list parse failed");
                    Vec::new()
                })
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "task list fetch rejected");
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, "task list fetch failed");
                Vec::new()
            }
        }
    }

    pub async fn get_task(&self, id: &str) -> Option<Task> {
        match self.fetch_task(id).await {
            Ok(task) => Some(task),
            Err(RemoteError::NotFound) => None,
            Err(err) => {
                warn!(%id, error = %err, "task fetch failed");
                None
            }
        }
    }

    async fn fetch_task(&self, id: &str) -> Result<Task, RemoteError> {
        let resp = self
            .client
            .get(format!("{}/tasks/{id}", self.base_url))
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            Err(reject(status, &resp.text().await.unwrap_or_default()))
        }
    }

    pub async fn create_task(&self, new: &NewTask) -> Result<CreateAck, RemoteError> {
        let resp = self
            .client
            .post(format!("{}/tasks", self.base_url))
            .json(new)
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            Err(reject(status, &resp.text().await.unwrap_or_default()))
        }
    }

    /// Idempotent delete: a record that is already gone counts as deleted.
    pub async fn delete_task(&self, id: &str) -> bool {
        let url = format!("{}/tasks/{id}", self.base_url);
        match self.client.delete(&url).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() || status == StatusCode::NOT_FOUND {
                    true
                } else {
                    warn!(%id, %status, "task delete rejected");
                    false
                }
            }
            Err(err) => {
                warn!(%id, error = %err, "task delete failed");
                false
            }
        }
    }

    pub async fn mark_sent(&self, id: &str, jira_key: &str, jira_url: &str) -> bool {
        let body = serde_json::json!({ "jiraKey": jira_key, "jiraUrl": jira_url });
        self.transition(id, "send", Some(body)).await
    }

    pub async fn decline(&self, id: &str) -> bool {
        self.transition(id, "decline", None).await
    }

    pub async fn restore(&self, id: &str) -> bool {
        self.transition(id, "restore", None).await
    }

    async fn transition(&self, id: &str, verb: &str, body: Option<serde_json::Value>) -> bool {
        let url = format!("{}/tasks/{id}/{verb}", self.base_url);
        let mut req = self.client.post(&url);
        if let Some(body) = &body {
            req = req.json(body);
        }
        match req.send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(%id, verb, status = %resp.status(), "task transition rejected");
                false
            }
            Err(err) => {
                warn!(%id, verb, error = %err, "task transition failed");
                false
            }
        }
    }
}

fn reject(status: StatusCode, body: &str) -> RemoteError {
    if status == StatusCode::NOT_FOUND {
        return RemoteError::NotFound;
    }
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message));
    RemoteError::Rejected(message.unwrap_or_else(|| format!("task store returned {status}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Draft;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// One-endpoint server that answers every request with a canned response.
    async fn serve(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let response = response.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = stream.read(&mut buf).await;
                    let _ = stream.write_all(response.as_bytes()).await;
                });
            }
        });
        format!("http://{addr}")
    }

    async fn dead_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn health_check_false_when_unreachable() {
        let store = RemoteStore::new(dead_url().await);
        assert!(!store.health_check().await);
    }

    #[tokio::test]
    async fn health_check_true_on_200() {
        let store = RemoteStore::new(serve(http_response("200 OK", "{}")).await);
        assert!(store.health_check().await);
    }

    #[tokio::test]
    async fn list_tasks_empty_on_failure() {
        let store = RemoteStore::new(dead_url().await);
        assert!(store.list_tasks(Some(TaskStatus::Pending)).await.is_empty());
    }

    #[tokio::test]
    async fn delete_treats_404_as_success() {
        let store = RemoteStore::new(serve(http_response("404 Not Found", "")).await);
        assert!(store.delete_task("gone").await);
    }

    #[tokio::test]
    async fn create_surfaces_server_error_message() {
        let response = http_response("400 Bad Request", r#"{"error":"title required"}"#);
        let store = RemoteStore::new(serve(response).await);
        let draft = Draft::new("x", None, None);
        let err = store
            .create_task(&NewTask::from_draft(&draft, "test"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(ref msg) if msg == "title required"));
    }

    #[tokio::test]
    async fn create_falls_back_to_status_message() {
        let response = http_response("500 Internal Server Error", "boom");
        let store = RemoteStore::new(serve(response).await);
        let draft = Draft::new("x", None, None);
        let err = store
            .create_task(&NewTask::from_draft(&draft, "test"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(ref msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn get_task_absent_on_404() {
        let store = RemoteStore::new(serve(http_response("404 Not Found", "")).await);
        assert!(store.get_task("missing").await.is_none());
    }

    #[tokio::test]
    async fn wake_up_resolves_exactly_once() {
        let store = RemoteStore::new(serve(http_response("200 OK", "{}")).await);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        assert!(store.wake_up(cancel, tx).await);

        assert!(matches!(rx.recv().await, Some(Action::BackendAwake)));
        // Nothing after the single awake signal; the sender side is dropped.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn wake_up_reports_attempts_and_honors_cancellation() {
        let store = RemoteStore::new(dead_url().await);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let handle = {
            let store = store.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { store.wake_up(cancel, tx).await })
        };

        match rx.recv().await {
            Some(Action::WakeProbe(n)) => assert_eq!(n, 1),
            other => panic!("expected first probe report, got {other:?}"),
        }
        cancel.cancel();
        assert!(!handle.await.unwrap());
    }
}

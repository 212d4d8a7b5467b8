use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use tracing::warn;

use crate::cache::TaskCache;
use crate::config::AppConfig;
use crate::model::task::{Draft, NewTask, Priority, Task, TaskStatus};
use crate::remote::{RemoteError, RemoteStore};
use crate::tracker::{self, IssueDraft, IssueRef, Tracker};

/// The one lifecycle service every surface goes through: capture submission,
/// send/decline/restore/delete, the backend merge and the tracker mirror.
/// The remote store is the system of record when reachable; the cache file is
/// the mirror every list render reads.
pub struct Lifecycle {
    pub remote: RemoteStore,
    pub tracker: Option<Box<dyn Tracker>>,
    pub cache: TaskCache,
    default_assignee: Option<String>,
}

impl Lifecycle {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            remote: RemoteStore::new(config.backend_url()),
            tracker: tracker::create_tracker(config),
            cache: TaskCache::new(),
            default_assignee: config
                .jira
                .as_ref()
                .and_then(|j| j.default_assignee.clone()),
        }
    }

    #[cfg(test)]
    pub fn with_parts(
        remote: RemoteStore,
        tracker: Option<Box<dyn Tracker>>,
        cache: TaskCache,
    ) -> Self {
        Self {
            remote,
            tracker,
            cache,
            default_assignee: None,
        }
    }

    /// Submit a confirmed capture. The store gets first refusal; if it is
    /// unreachable the task is kept locally under a minted id so the capture
    /// is never lost. A structured rejection (bad payload) is surfaced.
    pub async fn submit_draft(&self, draft: &Draft, captured_via: &str) -> Result<Task> {
        let new = NewTask::from_draft(draft, captured_via);
        let task = match self.remote.create_task(&new).await {
            Ok(ack) => {
                tracing::debug!(id = %ack.id, status = %ack.status, "task stored");
                new.into_task(ack.id)
            }
            Err(RemoteError::Unreachable(err)) => {
                warn!(error = %err, "task store unreachable, keeping capture locally");
                new.into_task(Task::local_id())
            }
            Err(err) => return Err(err).context("Task store rejected the capture"),
        };

        let mut tasks = self.cache.get();
        tasks.insert(0, task.clone());
        self.cache.set(&tasks)?;
        Ok(task)
    }

    /// Materialize a pending task as a tracker issue, then write the key back
    /// and flip the status. Issue-creation failure aborts before any flip;
    /// later failures are not rolled back (the issue exists) but leave the
    /// out-of-sync marker or a warning behind.
    pub async fn send_task(&self, task_id: &str, assignee: Option<&str>) -> Result<IssueRef> {
        let Some(tracker) = &self.tracker else {
            bail!("Jira is not configured; add a [jira] section to ~/.snag/config.toml");
        };

        let mut tasks = self.cache.get();
        let mirror_idx = tasks.iter().position(|t| t.id == task_id);

        // Canonical record: the store's copy when it has one, else the mirror.
        let task = match self.remote.get_task(task_id).await {
            Some(task) => task,
            None => mirror_idx
                .map(|i| tasks[i].clone())
                .with_context(|| format!("Task {task_id} not found"))?,
        };

        if let Some(key) = &task.jira_key {
            bail!("Task already sent as {key}");
        }
        if !task.status.can_transition(TaskStatus::Sent) {
            bail!("Cannot send a {} task", task.status);
        }

        let assignee_id = assignee
            .map(str::to_string)
            .or_else(|| self.default_assignee.clone());
        let provenance = provenance_note(&task);
        let issue_draft = IssueDraft {
            summary: task.title.clone(),
            body: format!("{}\n\n{provenance}", task.description),
            priority: task.priority,
            due_date: task.deadline,
            assignee_id: assignee_id.clone(),
        };

        let issue = tracker.create_issue(&issue_draft).await?;

        if let Err(err) = tracker.add_comment(&issue.key, &provenance).await {
            warn!(key = %issue.key, error = %err, "provenance comment failed");
        }

        let mut out_of_sync = false;
        if !task.is_local() {
            out_of_sync = !self.remote.mark_sent(&task.id, &issue.key, &issue.url).await;
        }

        if let Some(i) = mirror_idx {
            let mirrored = &mut tasks[i];
            mirrored.status = TaskStatus::Sent;
            mirrored.jira_key = Some(issue.key.clone());
            mirrored.jira_url = Some(issue.url.clone());
            mirrored.assignee = assignee_id;
            mirrored.out_of_sync = out_of_sync;
            if let Err(err) = self.cache.set(&tasks) {
                warn!(error = %err, "cache write after send failed");
            }
        }

        Ok(issue)
    }

    pub async fn decline_task(&self, task_id: &str) -> Result<()> {
        let mut tasks = self.cache.get();
        let idx = tasks
            .iter()
            .position(|t| t.id == task_id)
            .with_context(|| format!("Task {task_id} not found"))?;

        if !tasks[idx].status.can_transition(TaskStatus::Declined) {
            bail!("Cannot decline a {} task", tasks[idx].status);
        }

        tasks[idx].status = TaskStatus::Declined;
        if !tasks[idx].is_local() {
            // Best effort against the store; divergence is flagged, not dropped.
            tasks[idx].out_of_sync = !self.remote.decline(task_id).await;
        }
        self.cache.set(&tasks)
    }

    pub async fn restore_task(&self, task_id: &str) -> Result<()> {
        let mut tasks = self.cache.get();
        let idx = tasks
            .iter()
            .position(|t| t.id == task_id)
            .with_context(|| format!("Task {task_id} not found"))?;

        if !tasks[idx].status.can_transition(TaskStatus::Pending) {
            bail!("Cannot restore a {} task", tasks[idx].status);
        }

        tasks[idx].status = TaskStatus::Pending;
        if !tasks[idx].is_local() {
            tasks[idx].out_of_sync = !self.remote.restore(task_id).await;
        }
        self.cache.set(&tasks)
    }

    /// Permanent removal from whichever store holds the record.
    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        let mut tasks = self.cache.get();
        let idx = tasks
            .iter()
            .position(|t| t.id == task_id)
            .with_context(|| format!("Task {task_id} not found"))?;

        let task = tasks.remove(idx);
        if !task.is_local() && !self.remote.delete_task(&task.id).await {
            warn!(id = %task.id, "store delete failed; record removed locally only");
        }
        self.cache.set(&tasks)
    }

    /// Destructive bulk delete. The caller is responsible for confirming.
    pub async fn clear_all(&self) -> Result<usize> {
        let tasks = self.cache.get();
        let count = tasks.len();
        for task in &tasks {
            if !task.is_local() && !self.remote.delete_task(&task.id).await {
                warn!(id = %task.id, "store delete failed during clear");
            }
        }
        self.cache.set(&[])?;
        Ok(count)
    }

    /// Pull pending tasks from the store and merge unseen ids into the
    /// mirror. Returns how many records were new. Never errors; an
    /// unreachable store merges nothing.
    pub async fn sync_from_backend(&self) -> usize {
        let remote = self.remote.list_tasks(Some(TaskStatus::Pending)).await;
        if remote.is_empty() {
            return 0;
        }
        let local = self.cache.get();
        let (merged, added) = merge_by_id(local, remote);
        if added > 0 {
            if let Err(err) = self.cache.set(&merged) {
                warn!(error = %err, "cache write after backend sync failed");
            }
        }
        added
    }

    /// Overlay tracker-side status/assignee/priority/due-date onto each sent
    /// task. Tasks are synced independently; one failure never aborts the
    /// batch.
    pub async fn mirror_tracker_status(&self, tasks: &mut [Task]) {
        let Some(tracker) = &self.tracker else {
            return;
        };
        for task in tasks
            .iter_mut()
            .filter(|t| t.status == TaskStatus::Sent)
        {
            let Some(key) = task.jira_key.clone() else {
                continue;
            };
            match tracker.fetch_issue(&key).await {
                Ok(snapshot) => {
                    task.jira_status = snapshot.status;
                    task.assignee = snapshot.assignee;
                    if let Some(p) = snapshot.priority.as_deref().and_then(Priority::parse) {
                        task.priority = p;
                    }
                    if snapshot.due_date.is_some() {
                        task.deadline = snapshot.due_date;
                    }
                }
                Err(err) => {
                    warn!(%key, error = %err, "tracker status sync failed");
                }
            }
        }
    }

    /// Full refresh: backend merge, then the tracker overlay, then persist.
    /// This is what every review action triggers afterwards.
    pub async fn refresh(&self) -> Vec<Task> {
        self.sync_from_backend().await;
        let mut tasks = self.cache.get();
        self.mirror_tracker_status(&mut tasks).await;
        if let Err(err) = self.cache.set(&tasks) {
            warn!(error = %err, "cache write after refresh failed");
        }
        tasks
    }
}

fn provenance_note(task: &Task) -> String {
    match &task.url {
        Some(url) => format!("Captured with snag from a {} page: {url}", task.source),
        None => format!("Captured with snag from a {} page", task.source),
    }
}

/// Set-membership merge: store records whose id the mirror already knows are
/// skipped; unseen ones go ahead of the existing list (newest first).
fn merge_by_id(local: Vec<Task>, remote: Vec<Task>) -> (Vec<Task>, usize) {
    let seen: HashSet<&str> = local.iter().map(|t| t.id.as_str()).collect();
    let mut merged: Vec<Task> = remote
        .into_iter()
        .filter(|t| !seen.contains(t.id.as_str()))
        .collect();
    let added = merged.len();
    merged.extend(local);
    (merged, added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::tests::MockTracker;
    use crate::tracker::IssueSnapshot;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    /// A base URL nothing listens on, so every store call fails fast.
    async fn dead_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    struct Fixture {
        lifecycle: Lifecycle,
        created: Arc<Mutex<Vec<IssueDraft>>>,
        comments: Arc<Mutex<Vec<(String, String)>>>,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        fixture_with(MockTracker::new()).await
    }

    async fn fixture_with(tracker: MockTracker) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let created = tracker.created.clone();
        let comments = tracker.comments.clone();
        let lifecycle = Lifecycle::with_parts(
            RemoteStore::new(dead_url().await),
            Some(Box::new(tracker)),
            TaskCache::with_path(dir.path().join("tasks.json")),
        );
        Fixture {
            lifecycle,
            created,
            comments,
            _dir: dir,
        }
    }

    fn chat_draft(text: &str) -> Draft {
        Draft::new(text, Some("https://app.slack.com/client/T1/C2".into()), None)
    }

    #[tokio::test]
    async fn capture_falls_back_to_local_when_store_is_down() {
        let fx = fixture().await;
        let task = fx
            .lifecycle
            .submit_draft(&chat_draft("Book flight by Friday"), "test")
            .await
            .unwrap();

        assert!(task.is_local());
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.source, crate::model::task::Source::Chat);

        let cached = fx.lifecycle.cache.get();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, task.id);
    }

    #[tokio::test]
    async fn send_creates_issue_and_flips_status() {
        let fx = fixture().await;
        let task = fx
            .lifecycle
            .submit_draft(&chat_draft("Book flight by Friday"), "test")
            .await
            .unwrap();

        let issue = fx.lifecycle.send_task(&task.id, None).await.unwrap();
        assert_eq!(issue.key, "MOCK-1");

        let drafts = fx.created.lock().unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].summary, "Book flight by Friday");
        assert_eq!(drafts[0].priority, Priority::Medium);
        assert!(drafts[0].body.contains("chat page"));
        drop(drafts);

        // Provenance comment carries the originating URL.
        let comments = fx.comments.lock().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].0, "MOCK-1");
        assert!(comments[0].1.contains("app.slack.com"));
        drop(comments);

        let cached = fx.lifecycle.cache.get();
        assert_eq!(cached[0].status, TaskStatus::Sent);
        assert_eq!(cached[0].jira_key.as_deref(), Some("MOCK-1"));
    }

    #[tokio::test]
    async fn send_is_refused_twice() {
        let fx = fixture().await;
        let task = fx
            .lifecycle
            .submit_draft(&chat_draft("once only"), "test")
            .await
            .unwrap();

        fx.lifecycle.send_task(&task.id, None).await.unwrap();
        let err = fx.lifecycle.send_task(&task.id, None).await.unwrap_err();
        assert!(err.to_string().contains("already sent"));
        assert_eq!(fx.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn declined_task_cannot_be_sent() {
        let fx = fixture().await;
        let task = fx
            .lifecycle
            .submit_draft(&chat_draft("not this one"), "test")
            .await
            .unwrap();

        fx.lifecycle.decline_task(&task.id).await.unwrap();
        let err = fx.lifecycle.send_task(&task.id, None).await.unwrap_err();
        assert!(err.to_string().contains("declined"));
        assert!(fx.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_issue_creation_leaves_task_pending() {
        let fx = fixture_with(MockTracker::new().failing_create()).await;
        let task = fx
            .lifecycle
            .submit_draft(&chat_draft("stays pending"), "test")
            .await
            .unwrap();

        assert!(fx.lifecycle.send_task(&task.id, None).await.is_err());
        let cached = fx.lifecycle.cache.get();
        assert_eq!(cached[0].status, TaskStatus::Pending);
        assert!(cached[0].jira_key.is_none());
    }

    #[tokio::test]
    async fn decline_then_restore_round_trips() {
        let fx = fixture().await;
        let task = fx
            .lifecycle
            .submit_draft(&chat_draft("waffling"), "test")
            .await
            .unwrap();

        fx.lifecycle.decline_task(&task.id).await.unwrap();
        assert_eq!(fx.lifecycle.cache.get()[0].status, TaskStatus::Declined);

        fx.lifecycle.restore_task(&task.id).await.unwrap();
        assert_eq!(fx.lifecycle.cache.get()[0].status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let fx = fixture().await;
        let task = fx
            .lifecycle
            .submit_draft(&chat_draft("short lived"), "test")
            .await
            .unwrap();

        fx.lifecycle.delete_task(&task.id).await.unwrap();
        assert!(fx.lifecycle.cache.get().is_empty());
        assert!(fx.lifecycle.delete_task(&task.id).await.is_err());
    }

    #[tokio::test]
    async fn clear_all_empties_the_mirror() {
        let fx = fixture().await;
        for text in ["one", "two", "three"] {
            fx.lifecycle.submit_draft(&chat_draft(text), "test").await.unwrap();
        }
        let cleared = fx.lifecycle.clear_all().await.unwrap();
        assert_eq!(cleared, 3);
        assert!(fx.lifecycle.cache.get().is_empty());
    }

    #[tokio::test]
    async fn mirror_overlays_tracker_fields_per_task() {
        let snapshot = IssueSnapshot {
            status: Some("In Progress".into()),
            assignee: Some("Ada Lovelace".into()),
            priority: Some("High".into()),
            due_date: None,
        };
        let fx = fixture_with(MockTracker::new().with_snapshot(snapshot)).await;
        let task = fx
            .lifecycle
            .submit_draft(&chat_draft("track me"), "test")
            .await
            .unwrap();
        fx.lifecycle.send_task(&task.id, None).await.unwrap();

        let mut tasks = fx.lifecycle.cache.get();
        fx.lifecycle.mirror_tracker_status(&mut tasks).await;

        assert_eq!(tasks[0].jira_status.as_deref(), Some("In Progress"));
        assert_eq!(tasks[0].assignee.as_deref(), Some("Ada Lovelace"));
        assert_eq!(tasks[0].priority, Priority::High);
    }

    #[tokio::test]
    async fn mirror_failure_on_one_task_does_not_abort_the_batch() {
        let fx = fixture_with(MockTracker::new().failing_fetch()).await;
        let first = fx
            .lifecycle
            .submit_draft(&chat_draft("first"), "test")
            .await
            .unwrap();
        fx.lifecycle.send_task(&first.id, None).await.unwrap();
        let second = fx
            .lifecycle
            .submit_draft(&chat_draft("second"), "test")
            .await
            .unwrap();

        let mut tasks = fx.lifecycle.cache.get();
        fx.lifecycle.mirror_tracker_status(&mut tasks).await;

        // The failing sent task keeps its old fields; the pending one is untouched.
        assert!(tasks.iter().any(|t| t.id == second.id));
        assert!(tasks
            .iter()
            .find(|t| t.id == first.id)
            .unwrap()
            .jira_status
            .is_none());
    }

    fn mk(id: &str) -> Task {
        NewTask::from_draft(&Draft::new(id, None, None), "test").into_task(id.to_string())
    }

    #[test]
    fn merge_skips_ids_already_present() {
        let local = vec![mk("a"), mk("b")];
        let remote = vec![mk("b"), mk("c")];
        let (merged, added) = merge_by_id(local, remote);
        assert_eq!(added, 1);
        let ids: Vec<&str> = merged.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn merge_is_idempotent_across_repeated_syncs() {
        let local = vec![mk("a")];
        let remote = vec![mk("a"), mk("b")];
        let (merged, added) = merge_by_id(local, remote.clone());
        assert_eq!(added, 1);
        let (merged_again, added_again) = merge_by_id(merged, remote);
        assert_eq!(added_again, 0);
        assert_eq!(merged_again.len(), 2);
    }
}

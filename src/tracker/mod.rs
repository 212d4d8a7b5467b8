pub mod jira;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::AppConfig;
use crate::model::task::Priority;

/// Everything the issue-creation step needs, assembled by the lifecycle
/// service from the canonical task record. Provenance is already folded into
/// the body by the time a draft reaches a tracker.
#[derive(Debug, Clone)]
pub struct IssueDraft {
    pub summary: String,
    pub body: String,
    pub priority: Priority,
    pub due_date: Option<chrono::NaiveDate>,
    pub assignee_id: Option<String>,
}

/// Cross-reference written back onto the task after creation.
#[derive(Debug, Clone)]
pub struct IssueRef {
    pub key: String,
    pub url: String,
}

/// Tracker-side fields mirrored onto sent tasks for display.
#[derive(Debug, Clone, Default)]
pub struct IssueSnapshot {
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct TrackerUser {
    pub account_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait Tracker: Send + Sync {
    fn name(&self) -> &str;
    async fn create_issue(&self, draft: &IssueDraft) -> Result<IssueRef>;
    async fn add_comment(&self, key: &str, body: &str) -> Result<()>;
    async fn fetch_issue(&self, key: &str) -> Result<IssueSnapshot>;
    async fn list_transitions(&self, key: &str) -> Result<Vec<Transition>>;
    async fn transition(&self, key: &str, transition_id: &str) -> Result<()>;
    async fn assign(&self, key: &str, account_id: &str) -> Result<()>;
    /// Users assignable in the configured project; empty query lists them all.
    async fn search_users(&self, query: &str) -> Result<Vec<TrackerUser>>;
}

pub fn create_tracker(config: &AppConfig) -> Option<Box<dyn Tracker>> {
    config.jira.as_ref().map(|cfg| {
        Box::new(jira::JiraTracker::new(
            cfg.domain.clone(),
            cfg.email.clone(),
            cfg.api_token.clone(),
            cfg.project_key.clone(),
        )) as Box<dyn Tracker>
    })
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a snippet was captured from, guessed from the page URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Email,
    Chat,
    Jira,
    #[default]
    Web,
}

/// Ordered domain fragments. Earlier entries win when a URL matches several
/// (an inbox URL that embeds a jira link still counts as email).
const SOURCE_FRAGMENTS: &[(&str, Source)] = &[
    ("mail.google.com", Source::Email),
    ("outlook.", Source::Email),
    ("mail.yahoo.", Source::Email),
    ("proton.me", Source::Email),
    ("slack.com", Source::Chat),
    ("teams.microsoft.com", Source::Chat),
    ("discord.com", Source::Chat),
    ("chat.google.com", Source::Chat),
    ("atlassian.net", Source::Jira),
    ("jira.", Source::Jira),
];

impl Source {
    pub fn classify(url: Option<&str>) -> Source {
        let Some(url) = url else {
            return Source::Web;
        };
        let url = url.to_lowercase();
        SOURCE_FRAGMENTS
            .iter()
            .find(|(fragment, _)| url.contains(fragment))
            .map(|(_, source)| *source)
            .unwrap_or(Source::Web)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Email => "email",
            Source::Chat => "chat",
            Source::Jira => "jira",
            Source::Web => "web",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Highest,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Jira priority ids are stringly-typed numbers, 1 = highest.
    pub fn jira_id(&self) -> &'static str {
        match self {
            Priority::Highest => "1",
            Priority::High => "2",
            Priority::Medium => "3",
            Priority::Low => "4",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Highest => "highest",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Priority> {
        match s.to_lowercase().as_str() {
            "highest" => Some(Priority::Highest),
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }

    /// Next value in display order, wrapping. Used by the capture form.
    pub fn cycle(&self) -> Priority {
        match self {
            Priority::Highest => Priority::High,
            Priority::High => Priority::Medium,
            Priority::Medium => Priority::Low,
            Priority::Low => Priority::Highest,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Sent,
    Declined,
}

impl TaskStatus {
    /// The lifecycle graph: pending→sent, pending→declined, declined→pending.
    /// Notably there is no declined→sent; a declined task must be restored first.
    pub fn can_transition(self, to: TaskStatus) -> bool {
        matches!(
            (self, to),
            (TaskStatus::Pending, TaskStatus::Sent)
                | (TaskStatus::Pending, TaskStatus::Declined)
                | (TaskStatus::Declined, TaskStatus::Pending)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Sent => "sent",
            TaskStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of captured work, as stored in the cache file and returned by the
/// task store. Field names match the store's JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jira_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jira_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jira_url: Option<String>,
    /// Tracker-side assignee, mirrored for display once sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Set when a store write-back failed and the two stores may disagree.
    #[serde(default)]
    pub out_of_sync: bool,
}

impl Task {
    /// Ids minted on this device use the `task-<millis>` scheme; the store
    /// assigns its own shape. The prefix is how origin is told apart.
    pub fn local_id() -> String {
        format!("task-{}", chrono::Utc::now().timestamp_millis())
    }

    pub fn is_local(&self) -> bool {
        self.id.starts_with("task-")
    }

    /// Sending happens exactly once: only a pending task without an issue key.
    pub fn can_send(&self) -> bool {
        self.status == TaskStatus::Pending && self.jira_key.is_none()
    }
}

/// A capture in flight: built from a selection, confirmed by the user, then
/// submitted. Travels over the capture socket and the fallback stash file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<chrono::NaiveDate>,
}

impl Draft {
    pub fn new(text: &str, url: Option<String>, page_title: Option<String>) -> Self {
        Self {
            text: text.trim().to_string(),
            url,
            page_title,
            title: None,
            priority: Priority::default(),
            deadline: None,
        }
    }

    pub fn source(&self) -> Source {
        Source::classify(self.url.as_deref())
    }

    /// Explicit title if the user set one, else derived from the text.
    pub fn effective_title(&self) -> String {
        match &self.title {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => derive_title(&self.text),
        }
    }
}

/// Titles are the snippet itself, cut to 50 characters with an ellipsis when
/// longer.
pub fn derive_title(description: &str) -> String {
    let trimmed = description.trim();
    if trimmed.chars().count() > 50 {
        let head: String = trimmed.chars().take(50).collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    }
}

/// Body of `POST /tasks`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub text: String,
    pub title: String,
    pub description: String,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<chrono::NaiveDate>,
    pub created_at: String,
    pub metadata: TaskMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    pub user_approved: bool,
    pub captured_via: String,
}

impl NewTask {
    pub fn from_draft(draft: &Draft, captured_via: &str) -> Self {
        Self {
            text: draft.text.clone(),
            title: draft.effective_title(),
            description: draft.text.clone(),
            source: draft.source(),
            url: draft.url.clone(),
            priority: draft.priority,
            deadline: draft.deadline,
            created_at: chrono::Utc::now().to_rfc3339(),
            metadata: TaskMetadata {
                user_approved: true,
                captured_via: captured_via.to_string(),
            },
        }
    }

    /// The local mirror record for a successful create (remote id) or an
    /// offline fallback (freshly minted local id).
    pub fn into_task(self, id: String) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            source: self.source,
            url: self.url,
            priority: self.priority,
            deadline: self.deadline,
            status: TaskStatus::Pending,
            created_at: self.created_at,
            jira_key: None,
            jira_status: None,
            jira_url: None,
            assignee: None,
            out_of_sync: false,
        }
    }
}

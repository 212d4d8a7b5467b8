use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use super::{IssueDraft, IssueRef, IssueSnapshot, Tracker, TrackerUser, Transition};
use crate::util::adf::text_doc;

pub struct JiraTracker {
    base_url: String,
    auth_header: String,
    project_key: String,
    client: reqwest::Client,
}

impl JiraTracker {
    pub fn new(domain: String, email: String, api_token: String, project_key: String) -> Self {
        let creds = format!("{email}:{api_token}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        Self {
            base_url: format!("https://{domain}.atlassian.net"),
            auth_header: format!("Basic {encoded}"),
            project_key,
            client: reqwest::Client::new(),
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
    }
}

#[derive(Deserialize)]
struct CreatedIssue {
    key: String,
}

#[derive(Deserialize)]
struct IssueResponse {
    fields: IssueFields,
}

#[derive(Deserialize)]
struct IssueFields {
    status: Option<NamedField>,
    assignee: Option<AssigneeField>,
    priority: Option<NamedField>,
    duedate: Option<chrono::NaiveDate>,
}

#[derive(Deserialize)]
struct NamedField {
    name: String,
}

#[derive(Deserialize)]
struct AssigneeField {
    #[serde(rename = "displayName")]
    display_name: String,
}

#[derive(Deserialize)]
struct TransitionsResponse {
    transitions: Vec<JiraTransition>,
}

#[derive(Deserialize)]
struct JiraTransition {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct JiraUser {
    #[serde(rename = "accountId")]
    account_id: String,
    #[serde(rename = "displayName")]
    display_name: String,
}

#[async_trait]
impl Tracker for JiraTracker {
    fn name(&self) -> &str {
        "Jira"
    }

    async fn create_issue(&self, draft: &IssueDraft) -> Result<IssueRef> {
        let mut fields = json!({
            "project": { "key": self.project_key },
            "issuetype": { "name": "Task" },
            "summary": draft.summary,
            "description": text_doc(&draft.body),
            "priority": { "id": draft.priority.jira_id() },
        });
        if let Some(due) = draft.due_date {
            fields["duedate"] = json!(due);
        }
        if let Some(assignee) = &draft.assignee_id {
            fields["assignee"] = json!({ "id": assignee });
        }

        let url = format!("{}/rest/api/3/issue", self.base_url);
        let resp = self
            .post(&url)
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .context("Jira issue creation request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("Jira rejected issue creation ({status}): {text}");
        }

        let created: CreatedIssue = resp
            .json()
            .await
            .context("Failed to parse Jira create response")?;
        let url = format!("{}/browse/{}", self.base_url, created.key);
        Ok(IssueRef {
            key: created.key,
            url,
        })
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<()> {
        let url = format!("{}/rest/api/3/issue/{key}/comment", self.base_url);
        let resp = self
            .post(&url)
            .json(&json!({ "body": text_doc(body) }))
            .send()
            .await
            .context("Jira comment request failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("Jira rejected comment on {key} ({status})");
        }
        Ok(())
    }

    async fn fetch_issue(&self, key: &str) -> Result<IssueSnapshot> {
        let url = format!(
            "{}/rest/api/3/issue/{key}?fields=status,assignee,priority,duedate",
            self.base_url
        );
        let resp = self
            .get(&url)
            .send()
            .await
            .context("Jira issue fetch failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("Jira issue fetch for {key} rejected ({status})");
        }

        let issue: IssueResponse = resp
            .json()
            .await
            .context("Failed to parse Jira issue response")?;
        Ok(IssueSnapshot {
            status: issue.fields.status.map(|s| s.name),
            assignee: issue.fields.assignee.map(|a| a.display_name),
            priority: issue.fields.priority.map(|p| p.name),
            due_date: issue.fields.duedate,
        })
    }

    async fn list_transitions(&self, key: &str) -> Result<Vec<Transition>> {
        let url = format!("{}/rest/api/3/issue/{key}/transitions", self.base_url);
        let resp: TransitionsResponse = self
            .get(&url)
            .send()
            .await
            .context("Jira transitions fetch failed")?
            .json()
            .await
            .context("Failed to parse Jira transitions")?;

        Ok(resp
            .transitions
            .into_iter()
            .map(|t| Transition {
                id: t.id,
                name: t.name,
            })
            .collect())
    }

    async fn transition(&self, key: &str, transition_id: &str) -> Result<()> {
        let url = format!("{}/rest/api/3/issue/{key}/transitions", self.base_url);
        let resp = self
            .post(&url)
            .json(&json!({ "transition": { "id": transition_id } }))
            .send()
            .await
            .context("Jira transition request failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("Jira rejected transition on {key} ({status})");
        }
        Ok(())
    }

    async fn assign(&self, key: &str, account_id: &str) -> Result<()> {
        let url = format!("{}/rest/api/3/issue/{key}/assignee", self.base_url);
        let resp = self
            .client
            .put(&url)
            .header("Authorization", &self.auth_header)
            .json(&json!({ "accountId": account_id }))
            .send()
            .await
            .context("Jira assignee request failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("Jira rejected assignee update on {key} ({status})");
        }
        Ok(())
    }

    async fn search_users(&self, query: &str) -> Result<Vec<TrackerUser>> {
        let url = format!(
            "{}/rest/api/3/user/assignable/search?project={}&query={}&maxResults=20",
            self.base_url,
            self.project_key,
            urlencoding::encode(query)
        );
        let users: Vec<JiraUser> = self
            .get(&url)
            .send()
            .await
            .context("Jira user search failed")?
            .json()
            .await
            .context("Failed to parse Jira user search response")?;

        Ok(users
            .into_iter()
            .map(|u| TrackerUser {
                account_id: u.account_id,
                display_name: u.display_name,
            })
            .collect())
    }
}

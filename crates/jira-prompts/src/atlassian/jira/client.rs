use jira_prompts_core::atlassian::jira::{
    epic_children_jql, JiraComment, JiraCommentsResponse, JiraIssueResponse, JiraRelatedIssue,
    JiraSearchResponse,
};
use jira_prompts_core::users::{ResolvedUser, UserLookup};
use jira_prompts_core::LookupError;
use serde::de::DeserializeOwned;

use crate::atlassian::{create_jira_client, JiraConfig};
use crate::error::Error;

/// Fields requested for the brief and full issue views
pub const ISSUE_FIELDS: &str =
    "summary,description,status,priority,issuetype,assignee,reporter,parent,labels,created,updated,issuelinks,subtasks";

/// Upper bound on epic children fetched for the full view
const MAX_EPIC_CHILDREN: usize = 100;

/// Thin async client over the Jira REST API v2
#[derive(Debug, Clone)]
pub struct JiraClient {
    base_url: String,
    http: reqwest::Client,
}

impl JiraClient {
    pub fn new(config: &JiraConfig) -> color_eyre::eyre::Result<Self> {
        Ok(Self {
            base_url: config.base_url.clone(),
            http: create_jira_client(config)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/rest/api/2/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        log::debug!("GET {url}");

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to send request to Jira: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Decode(e.to_string()))
    }

    /// GET /rest/api/2/issue/{key}
    pub async fn get_issue(&self, issue_key: &str) -> Result<JiraIssueResponse, Error> {
        let url = self.api_url(&format!("issue/{}", urlencoding::encode(issue_key)));
        self.get_json(&url, &[("fields", ISSUE_FIELDS)]).await
    }

    /// GET /rest/api/2/issue/{key}/comment
    pub async fn get_comments(&self, issue_key: &str) -> Result<Vec<JiraComment>, Error> {
        let url = self.api_url(&format!("issue/{}/comment", urlencoding::encode(issue_key)));
        let response: JiraCommentsResponse = self.get_json(&url, &[]).await?;
        Ok(response.comments)
    }

    /// Issues whose parent is `epic_key`
    pub async fn get_epic_children(&self, epic_key: &str) -> Result<Vec<JiraRelatedIssue>, Error> {
        let url = self.api_url("search");
        let jql = epic_children_jql(epic_key);
        let max_results = MAX_EPIC_CHILDREN.to_string();

        let response: JiraSearchResponse = self
            .get_json(
                &url,
                &[
                    ("jql", jql.as_str()),
                    ("fields", "summary,status"),
                    ("maxResults", max_results.as_str()),
                ],
            )
            .await?;

        if let Some(total) = response.total {
            if total as usize > response.issues.len() {
                log::warn!(
                    "Epic {epic_key} has {total} children, only {} fetched",
                    response.issues.len()
                );
            }
        }

        Ok(response.issues)
    }

    /// GET /rest/api/2/user?accountId={id}
    pub async fn get_user(&self, account_id: &str) -> Result<ResolvedUser, Error> {
        let url = self.api_url("user");
        self.get_json(&url, &[("accountId", account_id)]).await
    }
}

/// [`UserLookup`] backed by the Jira user endpoint
///
/// Blocks on the async request, so it must only be driven from a blocking
/// thread (`tokio::task::spawn_blocking`), never from a runtime worker.
pub struct JiraUserLookup {
    client: JiraClient,
    handle: tokio::runtime::Handle,
}

impl JiraUserLookup {
    pub fn new(client: JiraClient, handle: tokio::runtime::Handle) -> Self {
        Self { client, handle }
    }
}

impl UserLookup for JiraUserLookup {
    fn lookup_user(&self, account_id: &str) -> Result<ResolvedUser, LookupError> {
        self.handle
            .block_on(self.client.get_user(account_id))
            .map_err(|e| lookup_error(account_id, e))
    }
}

fn lookup_error(account_id: &str, error: Error) -> LookupError {
    match error {
        Error::Api { status: 404, .. } => LookupError::NotFound(account_id.to_string()),
        other => LookupError::Unavailable(other.to_string()),
    }
}

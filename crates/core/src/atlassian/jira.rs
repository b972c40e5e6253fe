//! Transformation functions for Jira API responses
//!
//! Models the REST API v2 payloads the prompts need and turns them into the
//! "brief" and "full" issue views. Every free-text field (description, comment
//! bodies) goes through [`Engine::clean_text`].

use serde::{Deserialize, Serialize};

use crate::engine::Engine;

/// Placeholder for unset user fields
pub const NOT_AVAILABLE: &str = "N/A";

/// Issue type name that switches subtasks to epic children
pub const EPIC_ISSUE_TYPE: &str = "Epic";

/// Jira issue response from API
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraIssueResponse {
    pub key: String,
    pub fields: JiraIssueFields,
}

/// Core fields requested for every issue
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraIssueFields {
    pub summary: String,
    /// Wiki markup in API v2
    #[serde(default)]
    pub description: Option<String>,
    pub status: JiraStatus,
    #[serde(default)]
    pub priority: Option<JiraPriority>,
    #[serde(default)]
    pub issuetype: Option<JiraIssueType>,
    #[serde(default)]
    pub assignee: Option<JiraUser>,
    #[serde(default)]
    pub reporter: Option<JiraUser>,
    #[serde(default)]
    pub parent: Option<JiraRelatedIssue>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub issuelinks: Vec<JiraIssueLink>,
    #[serde(default)]
    pub subtasks: Vec<JiraRelatedIssue>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraStatus {
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraPriority {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraIssueType {
    pub name: String,
}

/// A user as embedded in issue and comment payloads
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JiraUser {
    #[serde(rename = "accountId", default)]
    pub account_id: Option<String>,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "emailAddress", default)]
    pub email_address: Option<String>,
}

/// Parent, subtask, linked issue or search hit: key plus a few fields
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraRelatedIssue {
    pub key: String,
    pub fields: JiraRelatedFields,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraRelatedFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: Option<JiraStatus>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraLinkType {
    pub name: String,
    #[serde(default)]
    pub inward: String,
    #[serde(default)]
    pub outward: String,
}

/// One entry of `fields.issuelinks`; exactly one side is set
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraIssueLink {
    #[serde(rename = "type")]
    pub link_type: JiraLinkType,
    #[serde(rename = "inwardIssue", default)]
    pub inward_issue: Option<JiraRelatedIssue>,
    #[serde(rename = "outwardIssue", default)]
    pub outward_issue: Option<JiraRelatedIssue>,
}

/// Comment on a Jira issue
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JiraComment {
    pub id: String,
    #[serde(default)]
    pub author: Option<JiraUser>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created: String,
}

/// GET /rest/api/2/issue/{key}/comment
#[derive(Debug, Deserialize, Clone)]
pub struct JiraCommentsResponse {
    #[serde(default)]
    pub comments: Vec<JiraComment>,
}

/// GET /rest/api/2/search
#[derive(Debug, Deserialize, Clone)]
pub struct JiraSearchResponse {
    #[serde(default)]
    pub issues: Vec<JiraRelatedIssue>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ParentSummary {
    pub key: String,
    pub summary: String,
    pub status: Option<String>,
}

/// The `jira-issue-brief` view
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IssueBrief {
    pub issue_key: String,
    pub summary: String,
    pub description: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuetype: Option<String>,
    pub assignee: String,
    pub reporter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentSummary>,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RelatedIssue {
    pub key: String,
    pub summary: String,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IssueLinkOutput {
    #[serde(rename = "type")]
    pub link_type: String,
    /// `inward` or `outward`, seen from the issue being described
    pub direction: String,
    /// Human phrasing of the relation, e.g. `is blocked by`
    pub relation: String,
    pub key: String,
    pub summary: String,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CommentOutput {
    pub author: String,
    pub created: String,
    pub body: String,
}

/// The `jira-issue-full` view: the brief plus relations and comments
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IssueFull {
    #[serde(flatten)]
    pub brief: IssueBrief,
    pub links: Vec<IssueLinkOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<RelatedIssue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_tasks: Option<Vec<RelatedIssue>>,
    pub comments: Vec<CommentOutput>,
}

/// Display name, then email, then [`NOT_AVAILABLE`]
pub fn user_display(user: Option<&JiraUser>) -> String {
    user.and_then(|u| u.display_name.clone().or_else(|| u.email_address.clone()))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn is_epic(issue: &JiraIssueResponse) -> bool {
    issue
        .fields
        .issuetype
        .as_ref()
        .is_some_and(|t| t.name == EPIC_ISSUE_TYPE)
}

/// JQL selecting the children of an epic
pub fn epic_children_jql(epic_key: &str) -> String {
    format!("parent = {epic_key} ORDER BY key ASC")
}

fn status_name(status: Option<&JiraStatus>) -> Option<String> {
    status.map(|s| s.name.clone())
}

/// Convert an issue response into the brief view
///
/// # Arguments
/// * `issue` - The raw issue response from Jira API
/// * `engine` - Cleans the wiki markup description into Markdown
///
/// # Returns
/// * `IssueBrief` - Core fields with names flattened to strings
pub fn transform_issue_brief(issue: &JiraIssueResponse, engine: &Engine) -> IssueBrief {
    let fields = &issue.fields;

    IssueBrief {
        issue_key: issue.key.clone(),
        summary: fields.summary.clone(),
        description: engine.clean_text(fields.description.as_deref().unwrap_or_default()),
        status: fields.status.name.clone(),
        priority: fields
            .priority
            .as_ref()
            .map(|p| p.name.clone())
            .filter(|n| !n.is_empty()),
        issuetype: fields.issuetype.as_ref().map(|t| t.name.clone()),
        assignee: user_display(fields.assignee.as_ref()),
        reporter: user_display(fields.reporter.as_ref()),
        parent: fields.parent.as_ref().map(|parent| ParentSummary {
            key: parent.key.clone(),
            summary: parent.fields.summary.clone(),
            status: status_name(parent.fields.status.as_ref()),
        }),
        labels: fields.labels.clone(),
        created: fields.created.clone(),
        updated: fields.updated.clone(),
    }
}

pub fn transform_related_issues(issues: &[JiraRelatedIssue]) -> Vec<RelatedIssue> {
    issues
        .iter()
        .map(|issue| RelatedIssue {
            key: issue.key.clone(),
            summary: issue.fields.summary.clone(),
            status: status_name(issue.fields.status.as_ref()),
        })
        .collect()
}

/// Flatten issue links; links with neither side set are dropped
pub fn transform_issue_links(links: &[JiraIssueLink]) -> Vec<IssueLinkOutput> {
    links
        .iter()
        .filter_map(|link| {
            let (direction, relation, other) = match (&link.outward_issue, &link.inward_issue) {
                (Some(other), _) => ("outward", &link.link_type.outward, other),
                (None, Some(other)) => ("inward", &link.link_type.inward, other),
                (None, None) => return None,
            };

            Some(IssueLinkOutput {
                link_type: link.link_type.name.clone(),
                direction: direction.to_string(),
                relation: relation.clone(),
                key: other.key.clone(),
                summary: other.fields.summary.clone(),
                status: status_name(other.fields.status.as_ref()),
            })
        })
        .collect()
}

pub fn transform_comments(comments: &[JiraComment], engine: &Engine) -> Vec<CommentOutput> {
    comments
        .iter()
        .map(|comment| CommentOutput {
            author: user_display(comment.author.as_ref()),
            created: comment.created.clone(),
            body: engine.clean_text(&comment.body),
        })
        .collect()
}

/// Convert an issue plus its comments (and epic children) into the full view
///
/// Epics list `child_tasks` taken from `epic_children`; every other issue
/// type lists its own `subtasks` and ignores `epic_children`.
pub fn transform_issue_full(
    issue: &JiraIssueResponse,
    epic_children: &[JiraRelatedIssue],
    comments: &[JiraComment],
    engine: &Engine,
) -> IssueFull {
    let (subtasks, child_tasks) = if is_epic(issue) {
        (None, Some(transform_related_issues(epic_children)))
    } else {
        (Some(transform_related_issues(&issue.fields.subtasks)), None)
    };

    IssueFull {
        brief: transform_issue_brief(issue, engine),
        links: transform_issue_links(&issue.fields.issuelinks),
        subtasks,
        child_tasks,
        comments: transform_comments(comments, engine),
    }
}

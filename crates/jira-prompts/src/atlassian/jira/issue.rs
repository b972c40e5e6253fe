use jira_prompts_core::atlassian::jira::{
    is_epic, transform_issue_brief, transform_issue_full, IssueBrief, IssueFull,
};
use serde::{Deserialize, Serialize};

use super::JiraContext;
use crate::prelude::{println, *};

/// Options for the issue views
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct IssueOptions {
    /// Issue key (e.g., "PROJ-123")
    #[clap(env = "JIRA_ISSUE_KEY")]
    pub issue_key: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Reject keys that cannot name an issue before hitting the network
pub fn validate_issue_key(issue_key: &str) -> Result<String> {
    let key = issue_key.trim();

    if key.is_empty() {
        return Err(eyre!("issue_key must not be empty"));
    }

    if key.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(eyre!("Invalid issue key: {}", key));
    }

    Ok(key.to_string())
}

/// Fetch an issue and build its brief view - used by both CLI and MCP
///
/// Description cleaning may resolve mentions over HTTP, so the transform
/// runs on the blocking pool.
pub async fn issue_brief_data(ctx: &JiraContext, issue_key: &str) -> Result<IssueBrief> {
    let key = validate_issue_key(issue_key)?;
    let issue = ctx.client.get_issue(&key).await?;

    let engine = ctx.engine.clone();
    let brief = tokio::task::spawn_blocking(move || transform_issue_brief(&issue, &engine)).await?;

    Ok(brief)
}

/// Fetch an issue with comments (and children when it is an epic) and build
/// its full view - used by both CLI and MCP
pub async fn issue_full_data(ctx: &JiraContext, issue_key: &str) -> Result<IssueFull> {
    let key = validate_issue_key(issue_key)?;
    let issue = ctx.client.get_issue(&key).await?;

    let children = async {
        if is_epic(&issue) {
            ctx.client.get_epic_children(&issue.key).await
        } else {
            Ok(Vec::new())
        }
    };
    let (comments, children) = futures::join!(ctx.client.get_comments(&issue.key), children);

    let comments = comments.unwrap_or_else(|e| {
        log::warn!("Failed to fetch comments for {}: {}", issue.key, e);
        Vec::new()
    });
    let children = children.unwrap_or_else(|e| {
        log::warn!("Failed to fetch children of epic {}: {}", issue.key, e);
        Vec::new()
    });

    let engine = ctx.engine.clone();
    let full = tokio::task::spawn_blocking(move || {
        transform_issue_full(&issue, &children, &comments, &engine)
    })
    .await?;

    Ok(full)
}

/// Handle the brief command
pub async fn brief_handler(ctx: &JiraContext, options: IssueOptions) -> Result<()> {
    let brief = issue_brief_data(ctx, &options.issue_key).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&brief)?);
    } else {
        super::display_brief(&brief);
    }

    Ok(())
}

/// Handle the full command
pub async fn full_handler(ctx: &JiraContext, options: IssueOptions) -> Result<()> {
    let full = issue_full_data(ctx, &options.issue_key).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&full)?);
    } else {
        super::display_full(&full);
    }

    Ok(())
}

use crate::atlassian::jira::issue::{issue_brief_data, issue_full_data};
use crate::mcp::prompts::required_issue_key;
use crate::prelude::eprintln;

use super::{text_result, JsonRpcError, ServerState};

fn tool_error(e: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError::internal(format!("Tool execution error: {e}"))
}

/// Handle `jira_issue_brief` via MCP
pub async fn handle_issue_brief(
    arguments: Option<serde_json::Value>,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let issue_key = required_issue_key(arguments)?;

    if state.global.verbose {
        eprintln!("Calling jira_issue_brief: issue_key={issue_key}");
    }

    let ctx = state.jira()?;
    let brief = issue_brief_data(ctx, &issue_key).await.map_err(tool_error)?;
    let json_string = serde_json::to_string_pretty(&brief).map_err(tool_error)?;

    text_result(json_string)
}

/// Handle `jira_issue_full` via MCP
pub async fn handle_issue_full(
    arguments: Option<serde_json::Value>,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let issue_key = required_issue_key(arguments)?;

    if state.global.verbose {
        eprintln!("Calling jira_issue_full: issue_key={issue_key}");
    }

    let ctx = state.jira()?;
    let full = issue_full_data(ctx, &issue_key).await.map_err(tool_error)?;
    let json_string = serde_json::to_string_pretty(&full).map_err(tool_error)?;

    text_result(json_string)
}

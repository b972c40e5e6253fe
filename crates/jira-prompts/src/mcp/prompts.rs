//! MCP prompts: `jira-issue-brief` and `jira-issue-full`
//!
//! Each prompt takes an `issue_key` argument and answers with a single user
//! message whose text is the pretty-printed JSON of the issue view.

use serde::{Deserialize, Serialize};

use super::{parse_arguments, to_result, JsonRpcError, ServerState};
use crate::atlassian::jira::issue::{issue_brief_data, issue_full_data};
use crate::prelude::eprintln;

pub const ISSUE_BRIEF: &str = "jira-issue-brief";
pub const ISSUE_FULL: &str = "jira-issue-full";

#[derive(Debug, Serialize)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Serialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Serialize)]
pub struct PromptsList {
    pub prompts: Vec<Prompt>,
}

#[derive(Debug, Deserialize)]
pub struct GetPromptParams {
    pub name: String,
    pub arguments: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct IssueArgs {
    issue_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GetPromptResult {
    pub description: String,
    pub messages: Vec<PromptMessage>,
}

#[derive(Debug, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: super::tools::Content,
}

fn issue_prompt(name: &str, description: &str) -> Prompt {
    Prompt {
        name: name.to_string(),
        description: description.to_string(),
        arguments: vec![PromptArgument {
            name: "issue_key".to_string(),
            description: "The key/ID of the issue".to_string(),
            required: true,
        }],
    }
}

fn prompts() -> Vec<Prompt> {
    vec![
        issue_prompt(
            ISSUE_BRIEF,
            "Get the core information about a Jira issue, including its description, parent, status, type, priority, and assignee.",
        ),
        issue_prompt(
            ISSUE_FULL,
            "Get the full information about a Jira issue, including core information, linked issues, child tasks/sub tasks, and comments.",
        ),
    ]
}

pub fn handle_prompts_list() -> Result<serde_json::Value, JsonRpcError> {
    to_result(PromptsList { prompts: prompts() })
}

/// `issue_key` from prompt or tool arguments; missing or blank is invalid
pub fn required_issue_key(arguments: Option<serde_json::Value>) -> Result<String, JsonRpcError> {
    let args: IssueArgs =
        parse_arguments(Some(arguments.unwrap_or_else(|| serde_json::json!({}))))?;

    args.issue_key
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| JsonRpcError::invalid_params("Argument `issue_key` is required"))
}

pub async fn handle_prompts_get(
    params: Option<serde_json::Value>,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: GetPromptParams = serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {e}")))?;

    let prompt = prompts()
        .into_iter()
        .find(|p| p.name == params.name)
        .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown prompt: {}", params.name)))?;

    let issue_key = required_issue_key(params.arguments)?;

    if state.global.verbose {
        eprintln!("Rendering prompt {}: issue_key={}", prompt.name, issue_key);
    }

    let ctx = state.jira()?;
    let text = match prompt.name.as_str() {
        ISSUE_BRIEF => issue_brief_data(ctx, &issue_key)
            .await
            .and_then(|brief| Ok(serde_json::to_string_pretty(&brief)?)),
        _ => issue_full_data(ctx, &issue_key)
            .await
            .and_then(|full| Ok(serde_json::to_string_pretty(&full)?)),
    }
    .map_err(|e| JsonRpcError::internal(format!("Failed to fetch issue {issue_key}: {e}")))?;

    to_result(GetPromptResult {
        description: prompt.description,
        messages: vec![PromptMessage {
            role: "user".to_string(),
            content: super::tools::Content::Text { text },
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tests::offline_state;

    #[test]
    fn test_prompts_list() {
        let value = handle_prompts_list().unwrap();

        let names: Vec<&str> = value["prompts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec![ISSUE_BRIEF, ISSUE_FULL]);
        assert_eq!(value["prompts"][0]["arguments"][0]["name"], "issue_key");
        assert_eq!(value["prompts"][0]["arguments"][0]["required"], true);
    }

    #[test]
    fn test_required_issue_key() {
        assert_eq!(
            required_issue_key(Some(serde_json::json!({"issue_key": " PROJ-9 "}))).unwrap(),
            "PROJ-9"
        );

        let missing = required_issue_key(None).unwrap_err();
        assert_eq!(missing.code, -32602);

        let blank = required_issue_key(Some(serde_json::json!({"issue_key": ""}))).unwrap_err();
        assert_eq!(blank.code, -32602);
    }

    #[tokio::test]
    async fn test_get_unknown_prompt() {
        let params = serde_json::json!({"name": "jira-issue-everything", "arguments": {"issue_key": "P-1"}});

        let error = handle_prompts_get(Some(params), &offline_state())
            .await
            .unwrap_err();

        assert_eq!(error.code, -32602);
        assert!(error.message.contains("jira-issue-everything"));
    }

    #[tokio::test]
    async fn test_get_prompt_requires_issue_key() {
        let params = serde_json::json!({"name": ISSUE_FULL});

        let error = handle_prompts_get(Some(params), &offline_state())
            .await
            .unwrap_err();

        assert_eq!(error.code, -32602);
        assert!(error.message.contains("issue_key"));
    }
}

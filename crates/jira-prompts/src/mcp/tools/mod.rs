mod jira;
mod markup;

use serde::{Deserialize, Serialize};

// Re-export types needed by tool handlers
pub use super::{parse_arguments, to_result, JsonRpcError, ServerState};

// MCP Protocol types
#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub prompts: Option<PromptsCapability>,
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Serialize)]
pub struct PromptsCapability {}

#[derive(Debug, Serialize)]
pub struct ToolsCapability {}

#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ToolsList {
    pub tools: Vec<Tool>,
}

#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

/// Wrap `text` as a successful tool result
pub fn text_result(text: String) -> Result<serde_json::Value, JsonRpcError> {
    to_result(CallToolResult {
        content: vec![Content::Text { text }],
        is_error: None,
    })
}

pub fn handle_initialize() -> Result<serde_json::Value, JsonRpcError> {
    to_result(InitializeResult {
        protocol_version: "2024-11-05".to_string(),
        capabilities: ServerCapabilities {
            prompts: Some(PromptsCapability {}),
            tools: Some(ToolsCapability {}),
        },
        server_info: ServerInfo {
            name: super::SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    })
}

fn issue_key_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "issue_key": {
                "type": "string",
                "description": "The key/ID of the issue (e.g., 'PROJ-123')"
            }
        },
        "required": ["issue_key"]
    })
}

fn text_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "text": {
                "type": "string",
                "description": description
            }
        },
        "required": ["text"]
    })
}

pub fn handle_tools_list() -> Result<serde_json::Value, JsonRpcError> {
    let tools = vec![
        Tool {
            name: "jira_issue_brief".to_string(),
            description: "Get the core information about a Jira issue: summary, description converted to Markdown, status, priority, type, assignee, reporter, parent, labels and timestamps. Requires JIRA_URL and Jira credentials in the environment.".to_string(),
            input_schema: issue_key_schema(),
        },
        Tool {
            name: "jira_issue_full".to_string(),
            description: "Get the full information about a Jira issue: the brief view plus linked issues, subtasks (or child tasks for epics) and comments with bodies converted to Markdown. Requires JIRA_URL and Jira credentials in the environment.".to_string(),
            input_schema: issue_key_schema(),
        },
        Tool {
            name: "jira_to_markdown".to_string(),
            description: "Convert Jira wiki markup to Markdown. User mentions are resolved to display names when Jira is configured and smart links are rewritten as Markdown links.".to_string(),
            input_schema: {
                let mut schema = text_schema("Jira wiki markup to convert");
                schema["properties"]["resolve_mentions"] = serde_json::json!({
                    "type": "boolean",
                    "description": "Resolve [~accountid:...] mentions and smart links before converting (default: true)"
                });
                schema
            },
        },
        Tool {
            name: "markdown_to_jira".to_string(),
            description: "Convert Markdown to Jira wiki markup. Code spans and fenced code blocks are preserved verbatim.".to_string(),
            input_schema: text_schema("Markdown to convert"),
        },
        Tool {
            name: "resolve_html_mentions".to_string(),
            description: "Replace user mention links in Confluence/Jira storage-format HTML with readable text. Returns the rewritten HTML and its Markdown rendering.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "html": {
                        "type": "string",
                        "description": "Storage-format HTML containing <ac:link><ri:user .../></ac:link> mentions"
                    }
                },
                "required": ["html"]
            }),
        },
    ];

    to_result(ToolsList { tools })
}

pub async fn handle_tools_call(
    params: Option<serde_json::Value>,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {e}")))?;

    match params.name.as_str() {
        "jira_issue_brief" => jira::handle_issue_brief(params.arguments, state).await,
        "jira_issue_full" => jira::handle_issue_full(params.arguments, state).await,
        "jira_to_markdown" => markup::handle_jira_to_markdown(params.arguments, state).await,
        "markdown_to_jira" => markup::handle_markdown_to_jira(params.arguments, state).await,
        "resolve_html_mentions" => {
            markup::handle_resolve_html_mentions(params.arguments, state).await
        }
        _ => Err(JsonRpcError::invalid_params(format!(
            "Unknown tool: {}",
            params.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tests::offline_state;

    #[test]
    fn test_tools_list_names() {
        let value = handle_tools_list().unwrap();

        let names: Vec<&str> = value["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "jira_issue_brief",
                "jira_issue_full",
                "jira_to_markdown",
                "markdown_to_jira",
                "resolve_html_mentions"
            ]
        );
        assert_eq!(
            value["tools"][2]["inputSchema"]["properties"]["resolve_mentions"]["type"],
            "boolean"
        );
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let params = serde_json::json!({"name": "md_fetch", "arguments": {}});

        let error = handle_tools_call(Some(params), &offline_state())
            .await
            .unwrap_err();

        assert_eq!(error.code, -32602);
    }

    #[tokio::test]
    async fn test_missing_params() {
        let error = handle_tools_call(None, &offline_state()).await.unwrap_err();

        assert_eq!(error.code, -32602);
    }
}

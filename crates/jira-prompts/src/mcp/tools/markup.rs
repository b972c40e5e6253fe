use serde::{Deserialize, Serialize};

use crate::prelude::eprintln;

use super::{parse_arguments, text_result, JsonRpcError, ServerState};

#[derive(Deserialize)]
struct JiraToMarkdownArgs {
    text: String,
    resolve_mentions: Option<bool>,
}

#[derive(Deserialize)]
struct TextArgs {
    text: String,
}

#[derive(Deserialize)]
struct HtmlArgs {
    html: String,
}

#[derive(Debug, Serialize)]
struct HtmlMentionsOutput {
    html: String,
    markdown: String,
}

/// Handle `jira_to_markdown` via MCP
///
/// Mention resolution may call the Jira user endpoint, so it runs on the
/// blocking pool.
pub async fn handle_jira_to_markdown(
    arguments: Option<serde_json::Value>,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: JiraToMarkdownArgs = parse_arguments(arguments)?;
    let resolve = args.resolve_mentions.unwrap_or(true);

    if state.global.verbose {
        eprintln!(
            "Calling jira_to_markdown: {} chars, resolve_mentions={}",
            args.text.len(),
            resolve
        );
    }

    let engine = state.engine.clone();
    let markdown = tokio::task::spawn_blocking(move || {
        if resolve {
            engine.clean_text(&args.text)
        } else {
            engine.convert_to_markdown(&args.text)
        }
    })
    .await
    .map_err(|e| JsonRpcError::internal(format!("Tool execution error: {e}")))?;

    text_result(markdown)
}

/// Handle `markdown_to_jira` via MCP
pub async fn handle_markdown_to_jira(
    arguments: Option<serde_json::Value>,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: TextArgs = parse_arguments(arguments)?;

    if state.global.verbose {
        eprintln!("Calling markdown_to_jira: {} chars", args.text.len());
    }

    text_result(state.engine.convert_to_dialect(&args.text))
}

/// Handle `resolve_html_mentions` via MCP
pub async fn handle_resolve_html_mentions(
    arguments: Option<serde_json::Value>,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: HtmlArgs = parse_arguments(arguments)?;

    if state.global.verbose {
        eprintln!("Calling resolve_html_mentions: {} chars", args.html.len());
    }

    let engine = state.engine.clone();
    let (html, markdown) = tokio::task::spawn_blocking(move || engine.resolve_html_mentions(&args.html))
        .await
        .map_err(|e| JsonRpcError::internal(format!("Tool execution error: {e}")))?
        .map_err(|e| JsonRpcError::internal(format!("Tool execution error: {e}")))?;

    let json_string = serde_json::to_string_pretty(&HtmlMentionsOutput { html, markdown })
        .map_err(|e| JsonRpcError::internal(format!("Serialization error: {e}")))?;

    text_result(json_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tests::offline_state;

    fn text_of(value: &serde_json::Value) -> String {
        value["content"][0]["text"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_jira_to_markdown() {
        // Arrange
        let state = offline_state();
        let arguments = serde_json::json!({"text": "h1. Title\n*bold* by [~accountid:7]"});

        // Act
        let value = handle_jira_to_markdown(Some(arguments), &state).await.unwrap();

        // Assert
        let text = text_of(&value);
        assert_eq!(value["content"][0]["type"], "text");
        assert!(text.contains("# Title"));
        assert!(text.contains("**bold**"));
        assert!(text.contains("[~accountid:7]"));
    }

    #[tokio::test]
    async fn test_jira_to_markdown_without_resolution() {
        let state = offline_state();
        let arguments = serde_json::json!({
            "text": "[Docs|https://jira.example/browse/DOC-1|smart-link]",
            "resolve_mentions": false
        });

        let value = handle_jira_to_markdown(Some(arguments), &state).await.unwrap();

        assert!(!text_of(&value).contains("[DOC-1](https://jira.example/browse/DOC-1)"));
    }

    #[tokio::test]
    async fn test_markdown_to_jira() {
        let state = offline_state();

        let value = handle_markdown_to_jira(Some(serde_json::json!({"text": "## Plan"})), &state)
            .await
            .unwrap();

        assert_eq!(text_of(&value), "h2. Plan");
    }

    #[tokio::test]
    async fn test_markdown_to_jira_requires_text() {
        let error = handle_markdown_to_jira(Some(serde_json::json!({})), &offline_state())
            .await
            .unwrap_err();

        assert_eq!(error.code, -32602);
    }

    #[tokio::test]
    async fn test_resolve_html_mentions() {
        let state = offline_state();
        let arguments = serde_json::json!({
            "html": r#"<p>ping <ac:link><ri:user ri:account-id="42"/></ac:link></p>"#
        });

        let value = handle_resolve_html_mentions(Some(arguments), &state)
            .await
            .unwrap();

        let output: serde_json::Value = serde_json::from_str(&text_of(&value)).unwrap();
        assert_eq!(output["html"], "<p>ping @user_42</p>");
        assert!(output["markdown"].as_str().unwrap().contains("ping"));
    }

    #[tokio::test]
    async fn test_resolve_html_mentions_parse_failure() {
        let arguments = serde_json::json!({"html": "<p><b>unclosed</p>"});

        let error = handle_resolve_html_mentions(Some(arguments), &offline_state())
            .await
            .unwrap_err();

        assert_eq!(error.code, -32603);
    }
}

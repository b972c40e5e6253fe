mod cli;
mod prompts;
mod sse;
mod stdio;
mod tools;

pub use cli::App;

use std::sync::Arc;

use jira_prompts_core::Engine;
use serde::{Deserialize, Serialize};

use crate::atlassian::jira::JiraContext;
use crate::prelude::*;

/// Name reported in `initialize`
pub const SERVER_NAME: &str = "jira-prompts-mcp";

// JSON-RPC 2.0 types
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<serde_json::Value>,
    method: String,
    params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
            data: None,
        }
    }
}

/// Serialize a protocol result, mapping failures to an internal error
pub fn to_result<T: Serialize>(value: T) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal(format!("Internal error: {e}")))
}

/// Decode call arguments into `T`, mapping failures to invalid params
pub fn parse_arguments<T: serde::de::DeserializeOwned>(
    arguments: Option<serde_json::Value>,
) -> Result<T, JsonRpcError> {
    serde_json::from_value(arguments.unwrap_or(serde_json::Value::Null))
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid arguments: {e}")))
}

/// State shared by every request a server handles
///
/// The markup tools only need the engine. Jira-backed prompts and tools need
/// the Jira context, which is absent when the environment does not configure
/// one; those requests fail with the configuration error instead.
pub struct ServerState {
    pub global: crate::Global,
    pub engine: Arc<Engine>,
    jira: std::result::Result<JiraContext, String>,
}

impl ServerState {
    pub fn from_env(global: crate::Global) -> Self {
        match JiraContext::from_env() {
            Ok(ctx) => Self {
                global,
                engine: ctx.engine.clone(),
                jira: Ok(ctx),
            },
            Err(e) => {
                log::warn!("Jira is not configured, issue prompts are unavailable: {e}");
                let engine = Engine::builder()
                    .base_url(std::env::var("JIRA_URL").unwrap_or_default())
                    .build();
                Self::without_jira(global, Arc::new(engine), e.to_string())
            }
        }
    }

    pub fn without_jira(global: crate::Global, engine: Arc<Engine>, reason: String) -> Self {
        Self {
            global,
            engine,
            jira: Err(reason),
        }
    }

    pub fn jira(&self) -> Result<&JiraContext, JsonRpcError> {
        self.jira
            .as_ref()
            .map_err(|reason| JsonRpcError::internal(format!("Jira is not configured: {reason}")))
    }
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let state = Arc::new(ServerState::from_env(global));

    match app.command {
        cli::Commands::Stdio => stdio::run_stdio(state).await,
        cli::Commands::Sse(options) => sse::run_sse(options, state).await,
    }
}

pub async fn handle_request(request_str: &str, state: &ServerState) -> JsonRpcResponse {
    let request: JsonRpcRequest = match serde_json::from_str(request_str) {
        Ok(req) => req,
        Err(e) => {
            return JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: None,
                result: None,
                error: Some(JsonRpcError {
                    code: -32700,
                    message: format!("Parse error: {e}"),
                    data: None,
                }),
            };
        }
    };

    let result = match request.method.as_str() {
        "initialize" => tools::handle_initialize(),
        "prompts/list" => prompts::handle_prompts_list(),
        "prompts/get" => prompts::handle_prompts_get(request.params, state).await,
        "tools/list" => tools::handle_tools_list(),
        "tools/call" => tools::handle_tools_call(request.params, state).await,
        method => Err(JsonRpcError {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }),
    };

    match result {
        Ok(value) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: Some(value),
            error: None,
        },
        Err(error) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: None,
            error: Some(error),
        },
    }
}

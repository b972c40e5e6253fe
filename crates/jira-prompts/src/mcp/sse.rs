use crate::prelude::{eprintln, *};
use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::{JsonRpcError, JsonRpcResponse, ServerState};

const SSE_PATH: &str = "/sse";
const MESSAGE_PATH: &str = "/message";

pub async fn run_sse(options: super::cli::SseOptions, state: Arc<ServerState>) -> Result<()> {
    let verbose = state.global.verbose;
    let addr = format!("{}:{}", options.host, options.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    if verbose {
        eprintln!("MCP server listening on http://{addr}");
        eprintln!("SSE endpoint: http://{addr}{SSE_PATH}");
        eprintln!("Message endpoint: http://{addr}{MESSAGE_PATH}");
    }

    axum::serve(listener, router(state))
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(SSE_PATH, get(sse_handler))
        .route(MESSAGE_PATH, post(message_handler))
        .layer(cors)
        .with_state(state)
}

/// Tell the client where to post its requests
async fn sse_handler(
    State(_state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = stream::once(async { Ok(Event::default().event("endpoint").data(MESSAGE_PATH)) });
    Sse::new(stream)
}

async fn message_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let request_str = request.to_string();

    if state.global.verbose {
        eprintln!("Received: {request_str}");
    }

    let response = super::handle_request(&request_str, &state).await;
    Json(response_value(response))
}

fn response_value(response: JsonRpcResponse) -> serde_json::Value {
    serde_json::to_value(response).unwrap_or_else(|e| {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": JsonRpcError::internal(format!("Internal error: {e}")),
        })
    })
}

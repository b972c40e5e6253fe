use std::sync::Arc;

use crate::prelude::{eprintln, *};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::ServerState;

pub async fn run_stdio(state: Arc<ServerState>) -> Result<()> {
    if state.global.verbose {
        eprintln!("Starting MCP server with stdio transport...");
        eprintln!();
    }

    let reader = BufReader::new(tokio::io::stdin());
    serve_lines(reader, tokio::io::stdout(), &state).await
}

/// Answer one JSON-RPC request per input line until EOF
///
/// Blank lines are skipped; every other line gets exactly one response line.
pub async fn serve_lines<R, W>(mut reader: R, mut writer: W, state: &ServerState) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let verbose = state.global.verbose;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if verbose {
            eprintln!("Received: {trimmed}");
        }

        let response = super::handle_request(trimmed, state).await;
        let response_json = serde_json::to_string(&response)?;

        if verbose {
            eprintln!("Sending: {response_json}");
        }

        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

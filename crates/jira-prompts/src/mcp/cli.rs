#[derive(Debug, clap::Parser)]
#[command(name = "mcp")]
#[command(about = "Serve the Jira issue prompts and markup tools over the Model Context Protocol")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Serve line-delimited JSON-RPC on stdin/stdout
    #[clap(name = "stdio")]
    Stdio,

    /// Serve JSON-RPC over HTTP with an SSE endpoint
    #[clap(name = "sse")]
    Sse(SseOptions),
}

#[derive(Debug, clap::Args)]
pub struct SseOptions {
    /// Port to listen on
    #[arg(short, long, env = "JIRA_PROMPTS_PORT", default_value = "3000")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, env = "JIRA_PROMPTS_HOST", default_value = "127.0.0.1")]
    pub host: String,
}

use crate::prelude::*;
use clap::Parser;

mod atlassian;
mod convert;
mod error;
mod mcp;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Jira issues as LLM-ready prompts, plus Jira wiki markup <-> Markdown conversion"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(
        long,
        env = "JIRA_PROMPTS_VERBOSE",
        global = true,
        default_value = "false"
    )]
    pub verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Fetch a Jira issue as a brief or full view
    #[command(subcommand)]
    Issue(crate::atlassian::jira::Commands),

    /// Convert markup between Jira wiki markup, Markdown and HTML
    Convert(crate::convert::App),

    /// Model Context Protocol server
    MCP(crate::mcp::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Issue(cmd) => crate::atlassian::jira::run(cmd, app.global).await,
        SubCommands::Convert(sub_app) => crate::convert::run(sub_app, app.global).await,
        SubCommands::MCP(sub_app) => crate::mcp::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}

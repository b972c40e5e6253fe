pub mod client;
pub mod issue;

use std::sync::Arc;

use colored::Colorize;
use jira_prompts_core::atlassian::jira::{IssueBrief, IssueFull, RelatedIssue, NOT_AVAILABLE};
use jira_prompts_core::Engine;

use crate::atlassian::JiraConfig;
use crate::prelude::{println, *};

pub use client::{JiraClient, JiraUserLookup};

/// Issue commands
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Core fields of an issue with its description cleaned to Markdown
    #[clap(name = "brief")]
    Brief(issue::IssueOptions),

    /// The brief view plus links, subtasks or epic children, and comments
    #[clap(name = "full")]
    Full(issue::IssueOptions),
}

/// Everything a Jira request needs: the HTTP client and the engine whose user
/// cache resolves mentions through that client
#[derive(Clone)]
pub struct JiraContext {
    pub client: JiraClient,
    pub engine: Arc<Engine>,
}

impl JiraContext {
    /// Build a context from environment variables
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn from_env() -> Result<Self> {
        Self::new(&JiraConfig::from_env()?)
    }

    pub fn new(config: &JiraConfig) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| eyre!("Jira context requires a Tokio runtime: {}", e))?;
        let client = JiraClient::new(config)?;
        let lookup = JiraUserLookup::new(client.clone(), handle);

        let engine = Engine::builder()
            .lookup(Arc::new(lookup))
            .base_url(config.base_url.clone())
            .cache_capacity(config.user_cache_size)
            .build();

        Ok(Self {
            client,
            engine: Arc::new(engine),
        })
    }
}

/// Run issue commands
pub async fn run(cmd: Commands, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("Running issue command...");
    }

    let ctx = JiraContext::from_env()?;

    match cmd {
        Commands::Brief(options) => issue::brief_handler(&ctx, options).await,
        Commands::Full(options) => issue::full_handler(&ctx, options).await,
    }
}

fn colored_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "done" | "closed" | "resolved" => status.green().to_string(),
        "in progress" | "in review" => status.yellow().to_string(),
        _ => status.bright_white().to_string(),
    }
}

fn colored_user(user: &str) -> String {
    if user == NOT_AVAILABLE {
        user.bright_black().to_string()
    } else {
        user.bright_magenta().to_string()
    }
}

/// Display the brief view as a formatted CLI table
fn display_brief(brief: &IssueBrief) {
    std::println!(
        "\n{} - {}\n",
        brief.issue_key.bold().cyan(),
        brief.summary.bright_white()
    );

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Status".bold().cyan(),
        colored_status(&brief.status)
    ]);

    if let Some(priority) = &brief.priority {
        table.add_row(prettytable::row![
            "Priority".bold().cyan(),
            priority.bright_yellow().to_string()
        ]);
    }

    if let Some(issuetype) = &brief.issuetype {
        table.add_row(prettytable::row![
            "Type".bold().cyan(),
            issuetype.bright_blue().to_string()
        ]);
    }

    table.add_row(prettytable::row![
        "Assignee".bold().cyan(),
        colored_user(&brief.assignee)
    ]);
    table.add_row(prettytable::row![
        "Reporter".bold().cyan(),
        colored_user(&brief.reporter)
    ]);

    if let Some(parent) = &brief.parent {
        table.add_row(prettytable::row![
            "Parent".bold().cyan(),
            format!("{} - {}", parent.key.cyan(), parent.summary)
        ]);
    }

    for (label, value) in [("Created", &brief.created), ("Updated", &brief.updated)] {
        if let Some(value) = value {
            table.add_row(prettytable::row![
                label.bold().cyan(),
                value.bright_black().to_string()
            ]);
        }
    }

    table.printstd();

    if !brief.labels.is_empty() {
        std::println!(
            "\n{}: {}",
            "Labels".bold().cyan(),
            brief.labels.join(", ").bright_green()
        );
    }

    if !brief.description.is_empty() {
        std::println!("\n{}:", "Description".bold().cyan());
        std::println!("{}\n", brief.description);
    }
}

fn display_related(title: &str, issues: &[RelatedIssue]) {
    if issues.is_empty() {
        return;
    }

    std::println!("\n{} ({}):", title.bold().cyan(), issues.len());

    let mut table = new_table();
    table.add_row(prettytable::row!["Key", "Summary", "Status"]);
    for issue in issues {
        table.add_row(prettytable::row![
            issue.key.cyan().to_string(),
            issue.summary,
            colored_status(issue.status.as_deref().unwrap_or(NOT_AVAILABLE))
        ]);
    }
    table.printstd();
}

/// Display the full view: the brief followed by relations and comments
fn display_full(full: &IssueFull) {
    display_brief(&full.brief);

    if !full.links.is_empty() {
        std::println!("\n{} ({}):", "Links".bold().cyan(), full.links.len());

        let mut table = new_table();
        table.add_row(prettytable::row!["Relation", "Key", "Summary", "Status"]);
        for link in &full.links {
            table.add_row(prettytable::row![
                link.relation,
                link.key.cyan().to_string(),
                link.summary,
                colored_status(link.status.as_deref().unwrap_or(NOT_AVAILABLE))
            ]);
        }
        table.printstd();
    }

    if let Some(subtasks) = &full.subtasks {
        display_related("Subtasks", subtasks);
    }

    if let Some(children) = &full.child_tasks {
        display_related("Child tasks", children);
    }

    if !full.comments.is_empty() {
        std::println!("\n{} ({}):", "Comments".bold().cyan(), full.comments.len());

        for (index, comment) in full.comments.iter().enumerate() {
            std::println!(
                "\n{} {} {} {}",
                format!("#{}", index + 1).bright_black(),
                comment.author.bright_magenta(),
                "at".bright_black(),
                comment.created.bright_black()
            );
            std::println!("{}", comment.body);
        }
        std::println!();
    }
}

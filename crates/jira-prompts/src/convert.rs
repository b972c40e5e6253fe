use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jira_prompts_core::{Dialect, Engine, MarkupText};

use crate::atlassian::jira::JiraContext;
use crate::prelude::{eprintln, println, *};

/// Markup dialects accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DialectArg {
    /// Jira wiki markup
    Jira,
    /// Markdown
    Markdown,
    /// Storage-format HTML (input only)
    Html,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Jira => Dialect::Wiki,
            DialectArg::Markdown => Dialect::Markdown,
            DialectArg::Html => Dialect::Html,
        }
    }
}

#[derive(Debug, clap::Parser)]
#[command(name = "convert")]
#[command(about = "Convert between Jira wiki markup, Markdown and storage-format HTML")]
pub struct App {
    /// Dialect of the input
    #[arg(long, value_enum)]
    pub from: DialectArg,

    /// Dialect to produce
    #[arg(long, value_enum)]
    pub to: DialectArg,

    /// Resolve user mentions and smart links through Jira (needs JIRA_URL and
    /// credentials); only applies to Jira to Markdown
    #[arg(long)]
    pub resolve_mentions: bool,

    /// Input file; reads stdin when omitted
    pub file: Option<PathBuf>,
}

/// Read the whole input from `file`, or stdin when there is none
pub fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e)),
        None => {
            let mut stdin = std::io::stdin();
            if stdin.is_terminal() {
                eprintln!("Reading from stdin, finish with Ctrl-D");
            }

            let mut input = String::new();
            stdin
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

/// Convert `input` - used by the CLI
///
/// With `resolve_mentions`, Jira to Markdown runs the full issue-text
/// pipeline, whose user lookups may block, so it moves to the blocking pool.
pub async fn convert_data(
    engine: Arc<Engine>,
    input: String,
    from: Dialect,
    to: Dialect,
    resolve_mentions: bool,
) -> Result<String> {
    if resolve_mentions && from == Dialect::Wiki && to == Dialect::Markdown {
        let markdown = tokio::task::spawn_blocking(move || engine.clean_text(&input)).await?;
        return Ok(markdown);
    }

    let output = engine.convert(&MarkupText::new(from, input), to)?;
    Ok(output.text)
}

fn offline_engine() -> Arc<Engine> {
    let base_url = std::env::var("JIRA_URL").unwrap_or_default();
    Arc::new(Engine::builder().base_url(base_url).build())
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let from = Dialect::from(app.from);
    let to = Dialect::from(app.to);

    if global.verbose {
        eprintln!("Converting {from} to {to}...");
    }

    let engine = if app.resolve_mentions {
        JiraContext::from_env()?.engine
    } else {
        offline_engine()
    };

    let input = read_input(app.file.as_deref())?;
    let output = convert_data(engine, input, from, to, app.resolve_mentions).await?;

    println!("{output}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn engine() -> Arc<Engine> {
        Arc::new(Engine::builder().base_url("https://jira.example").build())
    }

    #[test]
    fn test_dialect_arg_mapping() {
        assert_eq!(Dialect::from(DialectArg::Jira), Dialect::Wiki);
        assert_eq!(Dialect::from(DialectArg::Markdown), Dialect::Markdown);
        assert_eq!(Dialect::from(DialectArg::Html), Dialect::Html);
    }

    #[test]
    fn test_read_input_from_file() {
        // Arrange
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "h1. From a file").unwrap();

        // Act
        let input = read_input(Some(file.path())).unwrap();

        // Assert
        assert_eq!(input, "h1. From a file");
    }

    #[test]
    fn test_read_input_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let error = read_input(Some(&dir.path().join("missing.txt"))).unwrap_err();

        assert!(error.to_string().contains("missing.txt"));
    }

    #[tokio::test]
    async fn test_convert_data_both_directions() {
        let markdown = convert_data(
            engine(),
            "h3. Notes".to_string(),
            Dialect::Wiki,
            Dialect::Markdown,
            false,
        )
        .await
        .unwrap();
        let wiki = convert_data(
            engine(),
            "### Notes".to_string(),
            Dialect::Markdown,
            Dialect::Wiki,
            false,
        )
        .await
        .unwrap();

        assert_eq!(markdown, "### Notes");
        assert_eq!(wiki, "h3. Notes");
    }

    #[tokio::test]
    async fn test_convert_data_resolves_smart_links() {
        let markdown = convert_data(
            engine(),
            "See [x|https://other/browse/OPS-4|smart-link]".to_string(),
            Dialect::Wiki,
            Dialect::Markdown,
            true,
        )
        .await
        .unwrap();

        assert_eq!(markdown, "See [OPS-4](https://jira.example/browse/OPS-4)");
    }

    #[tokio::test]
    async fn test_convert_data_html_input() {
        let html = r#"<p><ac:link><ri:user ri:account-id="5"/></ac:link></p>"#.to_string();

        let output = convert_data(engine(), html, Dialect::Html, Dialect::Html, false)
            .await
            .unwrap();

        assert_eq!(output, "<p>@user_5</p>");
    }

    #[tokio::test]
    async fn test_convert_data_into_html_is_unsupported() {
        let result = convert_data(
            engine(),
            "# x".to_string(),
            Dialect::Markdown,
            Dialect::Html,
            false,
        )
        .await;

        assert!(result.is_err());
    }
}

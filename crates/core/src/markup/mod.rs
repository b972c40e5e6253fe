//! Bidirectional Jira wiki markup <-> Markdown conversion
//!
//! Each direction is an explicit, ordered list of [`Stage`]s. A stage is a
//! total `&str -> String` rewrite; later stages see the output of earlier
//! ones, so the order of each list is part of its contract. Code content is
//! shielded from every stage by the protect/restore pair in [`code`].

pub mod code;
pub mod to_markdown;
pub mod to_wiki;

use std::fmt;

use serde::{Deserialize, Serialize};

/// The markup languages the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Wiki,
    Markdown,
    Html,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::Wiki => "wiki",
            Dialect::Markdown => "markdown",
            Dialect::Html => "html",
        };
        write!(f, "{name}")
    }
}

/// A string tagged with the dialect it is written in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupText {
    pub dialect: Dialect,
    pub text: String,
}

impl MarkupText {
    pub fn new(dialect: Dialect, text: impl Into<String>) -> Self {
        Self {
            dialect,
            text: text.into(),
        }
    }

    pub fn wiki(text: impl Into<String>) -> Self {
        Self::new(Dialect::Wiki, text)
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self::new(Dialect::Markdown, text)
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self::new(Dialect::Html, text)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// One named rewrite in a conversion pipeline
#[derive(Clone, Copy)]
pub struct Stage {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Stage").field(&self.name).finish()
    }
}

/// Run `stages` in order over `input`
pub fn run_stages(stages: &[Stage], input: &str) -> String {
    stages.iter().fold(input.to_string(), |text, stage| {
        let output = (stage.apply)(&text);
        if output != text {
            log::debug!("stage '{}' rewrote text", stage.name);
        }
        output
    })
}

/// Text between two emphasis markers must hug them
///
/// It may open with the other marker (`*_x_*`) but never with its own, so
/// `**` is not read as an empty span.
fn is_emphasis_content(content: &str, marker: &str) -> bool {
    let (Some(first), Some(last)) = (content.chars().next(), content.chars().last()) else {
        return false;
    };
    !first.is_whitespace() && !marker.starts_with(first) && !last.is_whitespace()
}

/// Find where an emphasis span opened just before `start` closes
///
/// Looks for `marker` on the rest of the current line and returns the byte
/// offset of the first occurrence that encloses valid content.
pub(crate) fn find_span_close(text: &str, start: usize, marker: &str) -> Option<usize> {
    let line_end = text[start..]
        .find('\n')
        .map_or(text.len(), |offset| start + offset);

    text[start..line_end]
        .match_indices(marker)
        .map(|(offset, _)| start + offset)
        .find(|&close| close > start && is_emphasis_content(&text[start..close], marker))
}

/// Convert Jira wiki markup to Markdown
pub fn wiki_to_markdown(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let (protected, spans) = code::protect_wiki(input);
    let converted = run_stages(to_markdown::STAGES, &protected);
    code::restore(&converted, &spans, code::Target::Markdown)
}

/// Convert Markdown to Jira wiki markup
pub fn markdown_to_wiki(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let (protected, spans) = code::protect_markdown(input);
    let converted = run_stages(to_wiki::STAGES, &protected);
    code::restore(&converted, &spans, code::Target::Wiki)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(wiki_to_markdown(""), "");
        assert_eq!(markdown_to_wiki(""), "");
    }

    #[test]
    fn test_run_stages_applies_in_order() {
        fn append_a(s: &str) -> String {
            format!("{s}a")
        }
        fn double(s: &str) -> String {
            s.repeat(2)
        }
        let stages = [
            Stage {
                name: "append",
                apply: append_a,
            },
            Stage {
                name: "double",
                apply: double,
            },
        ];

        assert_eq!(run_stages(&stages, "x"), "xaxa");
    }

    #[test]
    fn test_wiki_code_block_content_preserved() {
        let content = "let x = *ptr;\nh1. not a header\n|| not || a table ||\n-- [link|url] _x_";
        let input = format!("{{code:rust}}\n{content}\n{{code}}");

        let output = wiki_to_markdown(&input);

        assert_eq!(output, format!("```rust\n{content}\n```"));
    }

    #[test]
    fn test_markdown_code_content_preserved() {
        let block = "# not a header\n**not bold** - [a](b) <x>";
        let input = format!("Intro with `a_b_c` inline\n```python\n{block}\n```\n");

        let output = markdown_to_wiki(&input);

        assert!(output.contains("{{a_b_c}}"));
        assert!(output.contains(&format!("{{code:python}}\n{block}\n{{code}}")));
    }

    #[test]
    fn test_plain_text_is_idempotent() {
        let input = "Just some plain words.\nAnother line with numbers 42 and punctuation, too.";

        let once = wiki_to_markdown(input);

        assert_eq!(once, input);
        assert_eq!(wiki_to_markdown(&once), input);
    }

    #[test]
    fn test_round_trip_headers_emphasis_and_code() {
        let input = "h1. Title\nSome *bold* and _italic_ text\nh3. Details\n{code:java}\nint a = b * c;\n{code}";

        let markdown = wiki_to_markdown(input);
        let back = markdown_to_wiki(&markdown);

        assert_eq!(back, input);
    }

    #[test]
    fn test_nested_emphasis_keeps_both_styles() {
        assert_eq!(wiki_to_markdown("*_both_*"), "***both***");
        assert_eq!(markdown_to_wiki("**_both_**"), "*_both_*");
    }

    #[test]
    fn test_round_trip_keeps_list_nesting() {
        let input = "* first\n** nested\n* second";

        let markdown = wiki_to_markdown(input);
        assert_eq!(markdown, "- first\n  - nested\n- second");

        assert_eq!(markdown_to_wiki(&markdown), input);
    }

    #[test]
    fn test_round_trip_keeps_table_structure() {
        let input = "||Col1||Col2||\n|a|b|";

        let markdown = wiki_to_markdown(input);
        assert_eq!(markdown, "|Col1|Col2|\n|---|---|\n|a|b|");

        assert_eq!(markdown_to_wiki(&markdown), input);
    }

    #[test]
    fn test_find_span_close() {
        assert_eq!(find_span_close("*bold* rest", 1, "*"), Some(5));
        assert_eq!(find_span_close("* spaced*", 1, "*"), None);
        assert_eq!(find_span_close("*a\nb*", 1, "*"), None);
        assert_eq!(find_span_close("**x** y**", 2, "**"), Some(3));
        assert_eq!(find_span_close("*_x_*", 1, "*"), Some(4));
        assert_eq!(find_span_close("**x*", 1, "*"), None);
    }

    #[test]
    fn test_markup_text_constructors() {
        let text = MarkupText::wiki("h1. x");
        assert_eq!(text.dialect, Dialect::Wiki);
        assert_eq!(text.as_str(), "h1. x");
        assert_eq!(MarkupText::html("<p/>").dialect, Dialect::Html);
        assert_eq!(Dialect::Markdown.to_string(), "markdown");
    }
}

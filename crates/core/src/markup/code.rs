//! Code span protection
//!
//! Code blocks and inline code are lifted out of the text before any other
//! rewrite runs and swapped back in once every stage is done. In between they
//! are represented by a placeholder made of NUL delimiters and an index, which
//! no rewrite rule matches. NULs already present in the input are escaped as
//! `NUL SOH` first so they can never read as a placeholder.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    /// `{code}` or a fenced Markdown block
    Block,
    /// `{noformat}`
    NoFormat,
    /// `{{...}}` or a backtick span
    Inline,
}

/// A piece of code extracted verbatim from the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeSpan {
    pub kind: CodeKind,
    pub language: Option<String>,
    pub content: String,
}

/// Dialect a protected text is restored into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Markdown,
    Wiki,
}

impl CodeSpan {
    pub fn render(&self, target: Target) -> String {
        match (target, self.kind) {
            (Target::Markdown, CodeKind::Block) => format!(
                "```{}\n{}\n```",
                self.language.as_deref().unwrap_or_default(),
                self.content
            ),
            (Target::Markdown, CodeKind::NoFormat) => format!("```\n{}\n```", self.content),
            (Target::Markdown, CodeKind::Inline) => format!("`{}`", self.content),
            (Target::Wiki, CodeKind::Block) => match &self.language {
                Some(language) => format!("{{code:{language}}}\n{}\n{{code}}", self.content),
                None => format!("{{code}}\n{}\n{{code}}", self.content),
            },
            (Target::Wiki, CodeKind::NoFormat) => {
                format!("{{noformat}}\n{}\n{{noformat}}", self.content)
            }
            (Target::Wiki, CodeKind::Inline) => format!("{{{{{}}}}}", self.content),
        }
    }
}

fn placeholder(index: usize) -> String {
    format!("\x00CODE{index}\x00")
}

const NUL: &str = "\x00";
const ESCAPED_NUL: &str = "\x00\x01";

fn escape_nul(input: &str) -> Cow<'_, str> {
    if input.contains(NUL) {
        Cow::Owned(input.replace(NUL, ESCAPED_NUL))
    } else {
        Cow::Borrowed(input)
    }
}

fn unescape_nul(text: String) -> String {
    if text.contains(ESCAPED_NUL) {
        text.replace(ESCAPED_NUL, NUL)
    } else {
        text
    }
}

/// Drop the newlines that belong to the delimiter lines around a block
fn strip_delimiter_newlines(content: &str) -> &str {
    let content = content
        .strip_prefix("\r\n")
        .or_else(|| content.strip_prefix('\n'))
        .unwrap_or(content);
    content
        .strip_suffix("\r\n")
        .or_else(|| content.strip_suffix('\n'))
        .unwrap_or(content)
}

/// Pick the language out of `{code:...}` parameters
///
/// Parameters are `|` separated; the language is the first bare value, the
/// rest are `key=value` options such as `title=Foo.java`.
fn code_language(params: Option<&str>) -> Option<String> {
    params?
        .split('|')
        .map(str::trim)
        .find(|param| !param.is_empty() && !param.contains('='))
        .map(str::to_string)
}

/// Lift `{code}`, `{noformat}` and `{{inline}}` spans out of wiki markup
pub fn protect_wiki(input: &str) -> (String, Vec<CodeSpan>) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"\{code(?::([^}]*))?\}([\s\S]*?)\{code\}|\{noformat\}([\s\S]*?)\{noformat\}|\{\{([^}]+)\}\}",
        )
        .unwrap()
    });

    let input = escape_nul(input);
    let mut spans = Vec::new();
    let protected = re.replace_all(&input, |caps: &Captures| {
        let span = if let Some(body) = caps.get(2) {
            CodeSpan {
                kind: CodeKind::Block,
                language: code_language(caps.get(1).map(|m| m.as_str())),
                content: strip_delimiter_newlines(body.as_str()).to_string(),
            }
        } else if let Some(body) = caps.get(3) {
            CodeSpan {
                kind: CodeKind::NoFormat,
                language: None,
                content: strip_delimiter_newlines(body.as_str()).to_string(),
            }
        } else {
            CodeSpan {
                kind: CodeKind::Inline,
                language: None,
                content: caps[4].to_string(),
            }
        };
        spans.push(span);
        placeholder(spans.len() - 1)
    });

    (protected.into_owned(), spans)
}

/// Lift fenced blocks and backtick spans out of Markdown
pub fn protect_markdown(input: &str) -> (String, Vec<CodeSpan>) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"```(\w*)\n([\s\S]+?)```|`([^`]+)`").unwrap());

    let input = escape_nul(input);
    let mut spans = Vec::new();
    let protected = re.replace_all(&input, |caps: &Captures| {
        let span = if let Some(body) = caps.get(2) {
            let language = caps.get(1).map(|m| m.as_str()).filter(|l| !l.is_empty());
            CodeSpan {
                kind: CodeKind::Block,
                language: language.map(str::to_string),
                content: strip_delimiter_newlines(body.as_str()).to_string(),
            }
        } else {
            CodeSpan {
                kind: CodeKind::Inline,
                language: None,
                content: caps[3].to_string(),
            }
        };
        spans.push(span);
        placeholder(spans.len() - 1)
    });

    (protected.into_owned(), spans)
}

/// Put protected spans back, rendered for `target`
///
/// Placeholders whose index is unknown are left as they are.
pub fn restore(text: &str, spans: &[CodeSpan], target: Target) -> String {
    if spans.is_empty() {
        return unescape_nul(text.to_string());
    }

    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x00CODE(\d+)\x00").unwrap());

    let restored = re.replace_all(text, |caps: &Captures| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|index| spans.get(index))
            .map(|span| span.render(target))
            .unwrap_or_else(|| caps[0].to_string())
    });

    unescape_nul(restored.into_owned())
}

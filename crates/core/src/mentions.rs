//! Mention and smart-link resolution over raw wiki text
//!
//! Runs before dialect conversion. `[~accountid:<id>]` tokens are swapped for
//! `@<Display Name>` through the [`UserCache`]; `[text|url|smart-link]` tokens
//! become plain Markdown links.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::LookupError;
use crate::users::UserCache;

/// A mention left in place because its lookup failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedMention {
    pub account_id: String,
    pub error: LookupError,
}

/// Outcome of a mention pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionReport {
    pub resolved: usize,
    pub unresolved: Vec<UnresolvedMention>,
}

impl MentionReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

fn mention_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[~accountid:(.*?)\]").unwrap())
}

/// Replace every `[~accountid:<id>]` by `@<displayName>`
///
/// Each occurrence is resolved on its own. A failed lookup leaves that token
/// untouched and is recorded in the report; the remaining tokens are still
/// processed. Tokens with an empty id are malformed and skipped silently.
pub fn resolve_mentions(text: &str, cache: &UserCache) -> (String, MentionReport) {
    let mut report = MentionReport::default();

    let output = mention_regex().replace_all(text, |caps: &Captures| {
        let account_id = caps[1].trim();
        if account_id.is_empty() {
            return caps[0].to_string();
        }

        match cache.resolve(account_id) {
            Ok(user) => {
                report.resolved += 1;
                format!("@<{}>", user.display_name)
            }
            Err(error) => {
                log::warn!("Error processing mention for {account_id}: {error}");
                report.unresolved.push(UnresolvedMention {
                    account_id: account_id.to_string(),
                    error,
                });
                caps[0].to_string()
            }
        }
    });

    (output.into_owned(), report)
}

/// What a smart link points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmartLink {
    /// A tracker issue, e.g. `.../browse/PROJ-7`
    Issue { key: String },
    /// A wiki space page; `title` is already human readable
    SpacePage { title: String },
    Generic,
}

impl SmartLink {
    pub fn classify(url: &str) -> Self {
        static ISSUE: OnceLock<Regex> = OnceLock::new();
        static PAGE: OnceLock<Regex> = OnceLock::new();

        let issue = ISSUE.get_or_init(|| Regex::new(r"browse/([A-Z][A-Z0-9_]*-\d+)").unwrap());
        let page = PAGE
            .get_or_init(|| Regex::new(r"wiki/spaces/.+?/pages/\d+/(.+?)(?:\?|$)").unwrap());

        if let Some(caps) = issue.captures(url) {
            return SmartLink::Issue {
                key: caps[1].to_string(),
            };
        }
        if let Some(caps) = page.captures(url) {
            return SmartLink::SpacePage {
                title: readable_page_title(&caps[1]),
            };
        }
        SmartLink::Generic
    }
}

/// `PROJ-12+Release+Notes%3A+Q3` -> `Release Notes: Q3`
fn readable_page_title(segment: &str) -> String {
    static KEY_PREFIX: OnceLock<Regex> = OnceLock::new();
    let key_prefix = KEY_PREFIX.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_]*-\d+\s+").unwrap());

    let spaced = segment.replace('+', " ");
    let decoded = urlencoding::decode(&spaced)
        .map(|title| title.into_owned())
        .unwrap_or(spaced);

    key_prefix.replace(&decoded, "").into_owned()
}

/// Render one smart link as a Markdown link
pub fn render_smart_link(text: &str, url: &str, base_url: &str) -> String {
    match SmartLink::classify(url) {
        SmartLink::Issue { key } => {
            format!("[{key}]({}/browse/{key})", base_url.trim_end_matches('/'))
        }
        SmartLink::SpacePage { title } => format!("[{title}]({url})"),
        SmartLink::Generic => {
            let target = url.split_once('?').map_or(url, |(path, _)| path);
            format!("[{text}]({target})")
        }
    }
}

/// Rewrite every `[text|url|smart-link]` token
pub fn resolve_smart_links(text: &str, base_url: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"\[([^\[\]|\n]*?)\|([^\[\]|\n]*?)\|smart-link\]").unwrap()
    });

    re.replace_all(text, |caps: &Captures| {
        render_smart_link(&caps[1], caps[2].trim(), base_url)
    })
    .into_owned()
}

/// Mentions first, then smart links
pub fn resolve_mentions_and_smart_links(
    text: &str,
    cache: &UserCache,
    base_url: &str,
) -> (String, MentionReport) {
    let (text, report) = resolve_mentions(text, cache);
    (resolve_smart_links(&text, base_url), report)
}

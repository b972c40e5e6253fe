//! User mentions in storage-format HTML
//!
//! Bodies fetched as storage XHTML carry user mentions as `ac:link` elements.
//! The document is parsed with `roxmltree`, every mention element is replaced
//! by plain text and the rewritten markup is rendered to Markdown with
//! `html2md`.

use std::ops::Range;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use roxmltree::{Document, Node};

use crate::error::MarkupError;
use crate::users::UserCache;

const AC_NS: &str = "http://www.atlassian.com/schema/confluence/4/ac/";
const RI_NS: &str = "http://www.atlassian.com/schema/confluence/4/ri/";

const WRAPPER_OPEN: &str = r#"<jira-prompts-root xmlns:ac="http://www.atlassian.com/schema/confluence/4/ac/" xmlns:ri="http://www.atlassian.com/schema/confluence/4/ri/">"#;
const WRAPPER_CLOSE: &str = "</jira-prompts-root>";

/// Fallback text for a mention, used whenever no display name is available
pub fn fallback_mention(account_id: &str) -> String {
    format!("@user_{account_id}")
}

/// Rewrite HTML named entities as numeric references
///
/// XML only knows `amp`, `lt`, `gt`, `quot` and `apos`. Unknown names get
/// their ampersand escaped so the parse does not fail on them.
fn numeric_entities(html: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").unwrap());

    re.replace_all(html, |caps: &Captures| {
        let name = &caps[1];
        if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
            return caps[0].to_string();
        }

        let decoded = html_escape::decode_html_entities(&caps[0]);
        if decoded == caps[0] {
            format!("&amp;{name};")
        } else {
            decoded.chars().map(|c| format!("&#{};", c as u32)).collect()
        }
    })
    .into_owned()
}

/// Close HTML void elements (`<br>` -> `<br/>`) so they parse as XML
fn close_void_elements(html: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"(?i)<(area|base|br|col|embed|hr|img|input|link|meta|param|source|track|wbr)(\s[^<>]*?)?\s*/?>",
        )
        .unwrap()
    });

    re.replace_all(html, "<${1}${2}/>").into_owned()
}

fn is_element(node: &Node, namespace: &str, name: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(namespace)
        && node.tag_name().name() == name
}

fn is_link_body(node: &Node) -> bool {
    is_element(node, AC_NS, "link-body") || is_element(node, AC_NS, "plain-text-link-body")
}

fn text_of(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn account_id(user: Node) -> Option<String> {
    user.attribute((RI_NS, "account-id"))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn user_child(parent: Node) -> Option<String> {
    parent
        .children()
        .filter(|n| is_element(n, RI_NS, "user"))
        .find_map(account_id)
}

/// Account id of an `ac:link` that is a user mention
///
/// A `ri:user` child with an account id makes a direct mention whatever the
/// link body says. Failing that, a link body whose text contains `@` next to
/// such a `ri:user` is an at-mention. Anything else is not a mention.
fn mention_account_id(link: Node) -> Option<String> {
    if let Some(id) = user_child(link) {
        return Some(id);
    }

    let body = link
        .descendants()
        .find(|n| is_link_body(n) && text_of(*n).trim().contains('@'))?;
    body.parent().and_then(user_child)
}

fn mention_text(account_id: &str, names: Option<&UserCache>) -> String {
    let Some(cache) = names else {
        return fallback_mention(account_id);
    };

    match cache.resolve(account_id) {
        Ok(user) => format!("@{}", user.display_name),
        Err(e) => {
            log::warn!("Error processing user mention: {e}");
            fallback_mention(account_id)
        }
    }
}

/// Replace user mentions in `html`, returning `(rewritten_html, markdown)`
///
/// With `names` unset every mention becomes [`fallback_mention`]. With a cache
/// the display name is tried first and any lookup failure falls back.
/// Elements that are not user mentions are left byte-for-byte as they were,
/// apart from void elements, which come back self-closed.
pub fn resolve_html_mentions(
    html: &str,
    names: Option<&UserCache>,
) -> Result<(String, String), MarkupError> {
    let xml = close_void_elements(&numeric_entities(html));
    let wrapped = format!("{WRAPPER_OPEN}{xml}{WRAPPER_CLOSE}");
    let document = Document::parse(&wrapped).map_err(|e| MarkupError::Parse(e.to_string()))?;

    let mut replacements: Vec<(Range<usize>, String)> = Vec::new();
    for link in document
        .descendants()
        .filter(|n| is_element(n, AC_NS, "link"))
    {
        let range = link.range();
        if replacements
            .last()
            .is_some_and(|(previous, _)| range.start < previous.end)
        {
            continue;
        }
        if let Some(account_id) = mention_account_id(link) {
            let text = mention_text(&account_id, names);
            replacements.push((range, html_escape::encode_text(&text).into_owned()));
        }
    }

    log::debug!("Resolved {} user mentions in HTML", replacements.len());

    let mut rewritten = String::with_capacity(wrapped.len());
    let mut cursor = WRAPPER_OPEN.len();
    for (range, text) in &replacements {
        rewritten.push_str(&wrapped[cursor..range.start]);
        rewritten.push_str(text);
        cursor = range.end;
    }
    rewritten.push_str(&wrapped[cursor..wrapped.len() - WRAPPER_CLOSE.len()]);

    let markdown = html2md::parse_html(&rewritten);
    Ok((rewritten, markdown))
}

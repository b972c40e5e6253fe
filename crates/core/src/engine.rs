//! The conversion engine
//!
//! An [`Engine`] owns one [`UserCache`] and the base URL used to rebuild issue
//! links. It is `Send + Sync`; share it behind an `Arc` and every conversion
//! sees the same cache.

use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};

use crate::error::MarkupError;
use crate::html;
use crate::markup::{self, Dialect, MarkupText};
use crate::mentions::{self, MentionReport};
use crate::users::{NoLookup, UserCache, UserLookup, DEFAULT_CAPACITY};

pub struct EngineBuilder {
    lookup: Arc<dyn UserLookup>,
    base_url: String,
    cache_capacity: usize,
    html_display_names: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            lookup: Arc::new(NoLookup),
            base_url: String::new(),
            cache_capacity: DEFAULT_CAPACITY,
            html_display_names: false,
        }
    }
}

impl EngineBuilder {
    pub fn lookup(mut self, lookup: Arc<dyn UserLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Resolve display names for HTML mentions instead of always writing
    /// the `@user_<id>` fallback
    pub fn html_display_names(mut self, enabled: bool) -> Self {
        self.html_display_names = enabled;
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            cache: UserCache::with_capacity(self.lookup, self.cache_capacity),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            html_display_names: self.html_display_names,
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    cache: UserCache,
    base_url: String,
    html_display_names: bool,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn new(lookup: Arc<dyn UserLookup>, base_url: impl Into<String>) -> Self {
        Self::builder().lookup(lookup).base_url(base_url).build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> &UserCache {
        &self.cache
    }

    pub fn convert_to_markdown(&self, wiki: &str) -> String {
        markup::wiki_to_markdown(wiki)
    }

    pub fn convert_to_dialect(&self, markdown: &str) -> String {
        markup::markdown_to_wiki(markdown)
    }

    pub fn resolve_html_mentions(&self, html: &str) -> Result<(String, String), MarkupError> {
        let names = self.html_display_names.then_some(&self.cache);
        html::resolve_html_mentions(html, names)
    }

    pub fn resolve_mentions_and_smart_links(&self, wiki: &str, base_url: &str) -> String {
        self.resolve_mentions_with_report(wiki, base_url).0
    }

    pub fn resolve_mentions_with_report(
        &self,
        wiki: &str,
        base_url: &str,
    ) -> (String, MentionReport) {
        mentions::resolve_mentions_and_smart_links(wiki, &self.cache, base_url)
    }

    /// Raw issue text to Markdown
    ///
    /// Mentions and smart links are resolved against the engine's base URL,
    /// the result is converted to Markdown and any HTML left embedded in it is
    /// rendered as Markdown too. Mention text is kept away from both
    /// converters so that `@<Name>` is not mistaken for a tag.
    pub fn clean_text(&self, wiki: &str) -> String {
        if wiki.is_empty() {
            return String::new();
        }

        let (resolved, report) = self.resolve_mentions_with_report(wiki, &self.base_url);
        if !report.is_complete() {
            log::debug!("{} mentions left unresolved", report.unresolved.len());
        }

        let (masked, tokens) = mask_mentions(&resolved);
        let markdown = markup::wiki_to_markdown(&masked);
        let markdown = if has_html_tags(&markdown) {
            html2md::parse_html(&markdown)
        } else {
            markdown
        };

        unmask_mentions(&markdown, &tokens).trim().to_string()
    }

    /// Convert `input` into `to`
    ///
    /// HTML input goes through the mention resolver first. Nothing converts
    /// into HTML.
    pub fn convert(&self, input: &MarkupText, to: Dialect) -> Result<MarkupText, MarkupError> {
        let text = match (input.dialect, to) {
            (from, to) if from == to && from != Dialect::Html => input.text.clone(),
            (Dialect::Wiki, Dialect::Markdown) => self.convert_to_markdown(&input.text),
            (Dialect::Markdown, Dialect::Wiki) => self.convert_to_dialect(&input.text),
            (Dialect::Html, Dialect::Html) => self.resolve_html_mentions(&input.text)?.0,
            (Dialect::Html, Dialect::Markdown) => self.resolve_html_mentions(&input.text)?.1,
            (Dialect::Html, Dialect::Wiki) => {
                let (_, markdown) = self.resolve_html_mentions(&input.text)?;
                self.convert_to_dialect(&markdown)
            }
            (from, to) => return Err(MarkupError::UnsupportedConversion { from, to }),
        };

        Ok(MarkupText::new(to, text))
    }
}

fn has_html_tags(text: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
        .is_match(text)
}

fn mask_mentions(text: &str) -> (String, Vec<String>) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"@<[^<>\n]+>|\[~accountid:[^\]\n]*\]").unwrap());

    let mut tokens = Vec::new();
    let masked = re.replace_all(text, |caps: &Captures| {
        tokens.push(caps[0].to_string());
        format!("\u{E000}{}\u{E001}", tokens.len() - 1)
    });

    (masked.into_owned(), tokens)
}

fn unmask_mentions(text: &str, tokens: &[String]) -> String {
    if tokens.is_empty() {
        return text.to_string();
    }

    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x{E000}(\d+)\x{E001}").unwrap());

    re.replace_all(text, |caps: &Captures| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|index| tokens.get(index))
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::users::ResolvedUser;

    fn ada_lookup() -> Arc<dyn UserLookup> {
        Arc::new(|id: &str| -> Result<ResolvedUser, LookupError> {
            if id == "42" {
                Ok(ResolvedUser {
                    account_id: id.to_string(),
                    display_name: "Ada".to_string(),
                })
            } else {
                Err(LookupError::Unavailable("timeout".to_string()))
            }
        })
    }

    fn engine() -> Engine {
        Engine::new(ada_lookup(), "https://host/")
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn test_builder_defaults() {
        let engine = Engine::builder().base_url("https://jira.example/").build();

        assert_eq!(engine.base_url(), "https://jira.example");
        assert_eq!(engine.cache().capacity(), DEFAULT_CAPACITY);
        assert!(engine.cache().resolve("42").is_err());
    }

    #[test]
    fn test_convert_both_directions() {
        let engine = engine();

        assert_eq!(engine.convert_to_markdown("h2. Plan"), "## Plan");
        assert_eq!(engine.convert_to_dialect("## Plan"), "h2. Plan");
    }

    #[test]
    fn test_resolve_mentions_and_smart_links() {
        let engine = engine();

        let output = engine.resolve_mentions_and_smart_links(
            "[~accountid:42] see [Bug Report|https://host/browse/PROJ-7|smart-link]",
            "https://host",
        );

        assert_eq!(output, "@<Ada> see [PROJ-7](https://host/browse/PROJ-7)");
    }

    #[test]
    fn test_clean_text_full_pipeline() {
        // Arrange
        let engine = engine();
        let input = "[~accountid:42] fixed *it* in [x|https://h/browse/P-1|smart-link]\n";

        // Act
        let output = engine.clean_text(input);

        // Assert
        assert_eq!(output, "@<Ada> fixed **it** in [P-1](https://host/browse/P-1)");
    }

    #[test]
    fn test_clean_text_keeps_unresolved_mentions() {
        let engine = engine();

        let output = engine.clean_text("[~accountid:nobody] said hi");

        assert_eq!(output, "[~accountid:nobody] said hi");
    }

    #[test]
    fn test_clean_text_renders_embedded_html() {
        let engine = engine();

        let output = engine.clean_text("{color:red}hot{color} by [~accountid:42]");

        assert!(output.contains("hot"));
        assert!(output.contains("@<Ada>"));
        assert!(!output.contains("{color"));
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(engine().clean_text(""), "");
    }

    #[test]
    fn test_html_mentions_fallback_first() {
        let engine = engine();
        let html = r#"<p><ac:link><ri:user ri:account-id="42"/></ac:link></p>"#;

        let (rewritten, _) = engine.resolve_html_mentions(html).unwrap();

        assert_eq!(rewritten, "<p>@user_42</p>");
        assert_eq!(engine.cache().stats().misses, 0);
    }

    #[test]
    fn test_html_mentions_with_display_names() {
        let engine = Engine::builder()
            .lookup(ada_lookup())
            .html_display_names(true)
            .build();
        let html = r#"<p><ac:link><ri:user ri:account-id="42"/></ac:link></p>"#;

        let (rewritten, _) = engine.resolve_html_mentions(html).unwrap();

        assert_eq!(rewritten, "<p>@Ada</p>");
    }

    #[test]
    fn test_convert_dispatch() {
        let engine = engine();

        let markdown = engine.convert(&MarkupText::wiki("*bold*"), Dialect::Markdown).unwrap();
        assert_eq!(markdown, MarkupText::markdown("**bold**"));

        let wiki = engine.convert(&markdown, Dialect::Wiki).unwrap();
        assert_eq!(wiki, MarkupText::wiki("*bold*"));

        let same = engine.convert(&MarkupText::markdown("x"), Dialect::Markdown).unwrap();
        assert_eq!(same.text, "x");
    }

    #[test]
    fn test_convert_html_and_unsupported() {
        let engine = engine();
        let html = MarkupText::html(r#"<ac:link><ri:user ri:account-id="7"/></ac:link>"#);

        let rewritten = engine.convert(&html, Dialect::Html).unwrap();
        assert_eq!(rewritten.text, "@user_7");

        let error = engine
            .convert(&MarkupText::wiki("x"), Dialect::Html)
            .unwrap_err();
        assert!(matches!(
            error,
            MarkupError::UnsupportedConversion {
                from: Dialect::Wiki,
                to: Dialect::Html
            }
        ));

        let broken = engine.convert(&MarkupText::html("<p>"), Dialect::Markdown);
        assert!(matches!(broken, Err(MarkupError::Parse(_))));
    }

    #[test]
    fn test_mask_round_trip() {
        let (masked, tokens) = mask_mentions("@<Ada> and [~accountid:9]");

        assert_eq!(tokens, vec!["@<Ada>", "[~accountid:9]"]);
        assert!(!has_html_tags(&masked));
        assert_eq!(unmask_mentions(&masked, &tokens), "@<Ada> and [~accountid:9]");
    }
}

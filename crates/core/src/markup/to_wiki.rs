//! Markdown -> Jira wiki markup stages

use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::Stage;

pub const STAGES: &[Stage] = &[
    Stage {
        name: "setext_headers",
        apply: setext_headers,
    },
    Stage {
        name: "atx_headers",
        apply: atx_headers,
    },
    Stage {
        name: "emphasis",
        apply: emphasis,
    },
    Stage {
        name: "bullets",
        apply: bullets,
    },
    Stage {
        name: "numbered",
        apply: numbered,
    },
    Stage {
        name: "html_tags",
        apply: html_tags,
    },
    Stage {
        name: "colors",
        apply: colors,
    },
    Stage {
        name: "strikethrough",
        apply: strikethrough,
    },
    Stage {
        name: "images",
        apply: images,
    },
    Stage {
        name: "links",
        apply: links,
    },
    Stage {
        name: "tables",
        apply: tables,
    },
];

/// `Title\n===` -> `h1. Title`, `Title\n---` -> `h2. Title`
pub fn setext_headers(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^(.*?)\n([=-])+$").unwrap());

    re.replace_all(input, |caps: &Captures| {
        let level = if &caps[2] == "=" { 1 } else { 2 };
        format!("h{level}. {}", &caps[1])
    })
    .into_owned()
}

/// `### Title` -> `h3. Title`
pub fn atx_headers(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^(#+)(.*?)$").unwrap());

    re.replace_all(input, |caps: &Captures| {
        format!("h{}.{}", caps[1].len(), &caps[2])
    })
    .into_owned()
}

/// `**bold**` -> `*bold*`, `*italic*` / `_italic_` -> `_italic_`
///
/// At each run of `*`/`_` the longest prefix that closes later on the same
/// line wins. A single-character marker is italic, anything longer is bold.
pub fn emphasis(input: &str) -> String {
    let is_marker = |b: u8| b == b'*' || b == b'_';
    let bytes = input.as_bytes();
    let mut output = String::with_capacity(input.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if !is_marker(bytes[i]) {
            i += 1;
            continue;
        }

        let run_end = i + bytes[i..].iter().take_while(|&&b| is_marker(b)).count();
        let span = (i + 1..=run_end).rev().find_map(|open_end| {
            let marker = &input[i..open_end];
            super::find_span_close(input, open_end, marker).map(|close| (open_end, close))
        });

        match span {
            Some((open_end, close)) => {
                let marker_len = open_end - i;
                let wrap = if marker_len == 1 { "_" } else { "*" };
                output.push_str(&input[copied..i]);
                output.push_str(wrap);
                output.push_str(&emphasis(&input[open_end..close]));
                output.push_str(wrap);
                i = close + marker_len;
                copied = i;
            }
            None => i += 1,
        }
    }

    output.push_str(&input[copied..]);
    output
}

/// `- item` -> `* item`, two spaces of indent per nesting level
pub fn bullets(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^([ \t]*)- (.*)$").unwrap());

    re.replace_all(input, |caps: &Captures| {
        let depth = caps[1].len() / 2 + 1;
        format!("{} {}", "*".repeat(depth), &caps[2])
    })
    .into_owned()
}

/// `1. item` -> `# item`; indented items nest one `#` deeper per level
pub fn numbered(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^([ \t]*)\d+\. (.*)$").unwrap());

    re.replace_all(input, |caps: &Captures| {
        let indent = caps[1].len();
        let depth = if indent == 0 { 1 } else { indent / 4 + 2 };
        format!("{} {}", "#".repeat(depth), &caps[2])
    })
    .into_owned()
}

const TAG_MARKERS: [(&str, &str); 5] = [
    ("cite", "??"),
    ("del", "-"),
    ("ins", "+"),
    ("sup", "^"),
    ("sub", "~"),
];

/// `<cite>`, `<del>`, `<ins>`, `<sup>`, `<sub>` -> wiki inline markers
pub fn html_tags(input: &str) -> String {
    static RES: OnceLock<Vec<(Regex, String)>> = OnceLock::new();
    let res = RES.get_or_init(|| {
        TAG_MARKERS
            .iter()
            .map(|(tag, marker)| {
                (
                    Regex::new(&format!("<{tag}>(.*?)</{tag}>")).unwrap(),
                    format!("{marker}${{1}}{marker}"),
                )
            })
            .collect()
    });

    res.iter().fold(input.to_string(), |text, (re, replacement)| {
        re.replace_all(&text, replacement.as_str()).into_owned()
    })
}

/// Inline color spans -> `{color:...}`; any CSS color value is carried over
pub fn colors(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"<span style="color:\s*([^";]+);?">([\s\S]*?)</span>"#).unwrap()
    });
    re.replace_all(input, "{color:${1}}${2}{color}").into_owned()
}

pub fn strikethrough(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"~~(.*?)~~").unwrap());
    re.replace_all(input, "-${1}-").into_owned()
}

/// `![](url)` -> `!url!`, `![alt](url)` -> `!url|alt=alt!`
pub fn images(input: &str) -> String {
    static BARE: OnceLock<Regex> = OnceLock::new();
    static WITH_ALT: OnceLock<Regex> = OnceLock::new();

    let bare = BARE.get_or_init(|| Regex::new(r"!\[\]\(([^)\n\s]+)\)").unwrap());
    let with_alt =
        WITH_ALT.get_or_init(|| Regex::new(r"!\[([^\]\n]+)\]\(([^)\n\s]+)\)").unwrap());

    let output = bare.replace_all(input, "!${1}!");
    with_alt.replace_all(&output, "!${2}|alt=${1}!").into_owned()
}

/// `[text](url)` -> `[text|url]`, `<url>` -> `[url]`
pub fn links(input: &str) -> String {
    static INLINE: OnceLock<Regex> = OnceLock::new();
    static AUTOLINK: OnceLock<Regex> = OnceLock::new();

    let inline = INLINE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
    let autolink = AUTOLINK.get_or_init(|| Regex::new(r"<([^>]+)>").unwrap());

    let output = inline.replace_all(input, "[${1}|${2}]");
    autolink.replace_all(&output, "[${1}]").into_owned()
}

/// A header row followed by a `|---|` separator becomes a `||` header row
pub fn tables(input: &str) -> String {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    let separator =
        SEPARATOR.get_or_init(|| Regex::new(r"^\|(?:\s*:?-+:?\s*\|)+\s*$").unwrap());

    let lines: Vec<&str> = input.split('\n').collect();
    let mut output = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let is_header = lines
            .get(i + 1)
            .is_some_and(|next| separator.is_match(next));

        if is_header {
            output.push(line.replace('|', "||"));
            i += 2;
        } else {
            output.push(line.to_string());
            i += 1;
        }
    }

    output.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::markdown_to_wiki;

    #[test]
    fn test_setext_headers() {
        assert_eq!(setext_headers("Title\n====="), "h1. Title");
        assert_eq!(setext_headers("Sub\n---\nbody"), "h2. Sub\nbody");
        assert_eq!(setext_headers("- item\n- other"), "- item\n- other");
    }

    #[test]
    fn test_atx_headers() {
        assert_eq!(atx_headers("# Title"), "h1. Title");
        assert_eq!(atx_headers("text\n### Deep"), "text\nh3. Deep");
        assert_eq!(atx_headers("not # a header"), "not # a header");
    }

    #[test]
    fn test_emphasis_bold_and_italic() {
        assert_eq!(emphasis("**bold**"), "*bold*");
        assert_eq!(emphasis("__bold__"), "*bold*");
        assert_eq!(emphasis("*italic*"), "_italic_");
        assert_eq!(emphasis("_italic_"), "_italic_");
        assert_eq!(emphasis("a **b** c *d* e"), "a *b* c _d_ e");
    }

    #[test]
    fn test_emphasis_nested_markers() {
        assert_eq!(emphasis("**_both_**"), "*_both_*");
        assert_eq!(emphasis("**b _c_ d**"), "*b _c_ d*");
    }

    #[test]
    fn test_emphasis_unmatched_markers_pass_through() {
        assert_eq!(emphasis("2 * 3 = 6"), "2 * 3 = 6");
        assert_eq!(emphasis("**open\nclose**"), "**open\nclose**");
        assert_eq!(emphasis("* item"), "* item");
    }

    #[test]
    fn test_bullets_nesting() {
        assert_eq!(bullets("- one"), "* one");
        assert_eq!(bullets("  - two"), "** two");
        assert_eq!(bullets("    - three"), "*** three");
        assert_eq!(bullets("a - b"), "a - b");
    }

    #[test]
    fn test_numbered_lists() {
        assert_eq!(numbered("1. first"), "# first");
        assert_eq!(numbered("12. twelfth"), "# twelfth");
        assert_eq!(numbered("  1. nested"), "## nested");
        assert_eq!(numbered("    1. deeper"), "### deeper");
        assert_eq!(numbered("1.5 is not a list"), "1.5 is not a list");
    }

    #[test]
    fn test_html_tags() {
        assert_eq!(html_tags("<cite>Ada</cite>"), "??Ada??");
        assert_eq!(html_tags("<del>old</del> <ins>new</ins>"), "-old- +new+");
        assert_eq!(html_tags("x<sup>2</sup> H<sub>2</sub>O"), "x^2^ H~2~O");
    }

    #[test]
    fn test_colors() {
        assert_eq!(
            colors(r#"<span style="color:#ff0000">red</span>"#),
            "{color:#ff0000}red{color}"
        );
        assert_eq!(
            colors(r#"<span style="color: blue;">blue</span>"#),
            "{color:blue}blue{color}"
        );
    }

    #[test]
    fn test_strikethrough() {
        assert_eq!(strikethrough("~~gone~~ stays"), "-gone- stays");
    }

    #[test]
    fn test_images() {
        assert_eq!(images("![](a.png)"), "!a.png!");
        assert_eq!(images("![logo](b.png)"), "!b.png|alt=logo!");
    }

    #[test]
    fn test_links() {
        assert_eq!(links("[site](https://x.io)"), "[site|https://x.io]");
        assert_eq!(links("<https://y.io>"), "[https://y.io]");
    }

    #[test]
    fn test_tables() {
        assert_eq!(tables("|A|B|\n|---|---|\n|1|2|"), "||A||B||\n|1|2|");
        assert_eq!(
            tables("| A | B |\n| :-- | --: |\n| 1 | 2 |"),
            "|| A || B ||\n| 1 | 2 |"
        );
        assert_eq!(tables("|1|2|\n|3|4|"), "|1|2|\n|3|4|");
    }

    #[test]
    fn test_full_document() {
        let input = "# Title\n\n\
                     Some **bold**, *italic* and ~~gone~~.\n\n\
                     - one\n  \
                     - two\n\
                     1. first\n  \
                     1. sub\n\n\
                     ![](a.png) ![logo](b.png)\n\
                     [site](https://x.io) <https://y.io>\n\
                     <span style=\"color:red\">hot</span>";
        let expected = "h1. Title\n\n\
                        Some *bold*, _italic_ and -gone-.\n\n\
                        * one\n\
                        ** two\n\
                        # first\n\
                        ## sub\n\n\
                        !a.png! !b.png|alt=logo!\n\
                        [site|https://x.io] [https://y.io]\n\
                        {color:red}hot{color}";

        assert_eq!(markdown_to_wiki(input), expected);
    }
}

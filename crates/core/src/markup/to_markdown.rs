//! Jira wiki markup -> Markdown stages
//!
//! Inline code (`{{...}}`), `{code}` and `{noformat}` blocks never reach these
//! stages; they are protected beforehand and rendered as backtick spans and
//! fences on restore.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::Stage;

pub const STAGES: &[Stage] = &[
    Stage {
        name: "blockquote",
        apply: blockquote,
    },
    Stage {
        name: "emphasis",
        apply: emphasis,
    },
    Stage {
        name: "lists",
        apply: lists,
    },
    Stage {
        name: "headers",
        apply: headers,
    },
    Stage {
        name: "citation",
        apply: citation,
    },
    Stage {
        name: "inserted",
        apply: inserted,
    },
    Stage {
        name: "superscript",
        apply: superscript,
    },
    Stage {
        name: "subscript",
        apply: subscript,
    },
    Stage {
        name: "strikeout",
        apply: strikeout,
    },
    Stage {
        name: "quote_blocks",
        apply: quote_blocks,
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
        name: "colors",
        apply: colors,
    },
    Stage {
        name: "tables",
        apply: tables,
    },
];

/// `bq. text` -> `> text`, followed by a blank line
pub fn blockquote(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^bq\.[ \t]*(.*?)$").unwrap());
    re.replace_all(input, "> ${1}\n").into_owned()
}

/// `*bold*` -> `**bold**`, `_italic_` -> `*italic*`
///
/// The opening marker must not follow an ASCII letter or digit, and the span
/// must close on the same line.
pub fn emphasis(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut output = String::with_capacity(input.len() + 8);
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        let marker = bytes[i];
        let opens = (marker == b'*' || marker == b'_')
            && (i == 0 || !bytes[i - 1].is_ascii_alphanumeric());

        if opens {
            let marker_str = &input[i..i + 1];
            if let Some(close) = super::find_span_close(input, i + 1, marker_str) {
                let wrap = if marker == b'*' { "**" } else { "*" };
                output.push_str(&input[copied..i]);
                output.push_str(wrap);
                output.push_str(&emphasis(&input[i + 1..close]));
                output.push_str(wrap);
                i = close + 1;
                copied = i;
                continue;
            }
        }
        i += 1;
    }

    output.push_str(&input[copied..]);
    output
}

/// Leading `#`, `-`, `+`, `*` runs -> nested Markdown list items
pub fn lists(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^([#*+-]+) (.*)$").unwrap());

    re.replace_all(input, |caps: &Captures| {
        let bullets = &caps[1];
        let indent = "  ".repeat(bullets.len() - 1);
        let prefix = if bullets.ends_with('#') { "1." } else { "-" };
        format!("{indent}{prefix} {}", &caps[2])
    })
    .into_owned()
}

/// `hN.text` -> N hashes followed by `text`
pub fn headers(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^h([0-6])\.(.*)$").unwrap());

    re.replace_all(input, |caps: &Captures| {
        let level = caps[1].parse::<usize>().unwrap_or(0);
        format!("{}{}", "#".repeat(level), &caps[2])
    })
    .into_owned()
}

pub fn citation(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\?\?((?:.[^?]|[^?].)+)\?\?").unwrap());
    re.replace_all(input, "<cite>${1}</cite>").into_owned()
}

pub fn inserted(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\+([^+\n]+)\+").unwrap());
    re.replace_all(input, "<ins>${1}</ins>").into_owned()
}

pub fn superscript(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\^([^^\n]+)\^").unwrap());
    re.replace_all(input, "<sup>${1}</sup>").into_owned()
}

pub fn subscript(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"~([^~\n]+)~").unwrap());
    re.replace_all(input, "<sub>${1}</sub>").into_owned()
}

/// `-strike-` is left alone: both dialects spell it with dashes
pub fn strikeout(input: &str) -> String {
    input.to_string()
}

/// `{quote}...{quote}` -> every interior line prefixed with `> `
pub fn quote_blocks(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\{quote\}([\s\S]*?)\{quote\}").unwrap());

    re.replace_all(input, |caps: &Captures| {
        let body = caps[1].strip_prefix('\n').unwrap_or(&caps[1]);
        let body = body.strip_suffix('\n').unwrap_or(body);
        body.split('\n')
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n")
    })
    .into_owned()
}

/// `!url|alt=text!` -> `![text](url)`; other parameters are dropped
pub fn images(input: &str) -> String {
    static WITH_ALT: OnceLock<Regex> = OnceLock::new();
    static WITH_PARAMS: OnceLock<Regex> = OnceLock::new();
    static BARE: OnceLock<Regex> = OnceLock::new();

    let with_alt = WITH_ALT.get_or_init(|| {
        Regex::new(r"!([^|\n\s]+)\|([^\n!]*)alt=([^\n!,]+?)(,([^\n!]*))?!").unwrap()
    });
    let with_params = WITH_PARAMS.get_or_init(|| Regex::new(r"!([^|\n\s]+)\|([^\n!]*)!").unwrap());
    let bare = BARE.get_or_init(|| Regex::new(r"!([^\n\s!]+)!").unwrap());

    let output = with_alt.replace_all(input, "![${3}](${1})");
    let output = with_params.replace_all(&output, "![](${1})");
    bare.replace_all(&output, "![](${1})").into_owned()
}

/// `[text|url]` -> `[text](url)`; `[url]x` -> `<url>x`
pub fn links(input: &str) -> String {
    static PIPED: OnceLock<Regex> = OnceLock::new();
    static BARE: OnceLock<Regex> = OnceLock::new();

    let piped = PIPED.get_or_init(|| Regex::new(r"\[([^|\[\]\n]+)\|([^\]\n]+)\]").unwrap());
    let bare = BARE.get_or_init(|| Regex::new(r"\[([^\[\]\n]+)\]([^(])").unwrap());

    let output = piped.replace_all(input, "[${1}](${2})");
    bare.replace_all(&output, "<${1}>${2}").into_owned()
}

/// `{color:red}text{color}` -> inline styled span
pub fn colors(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re =
        RE.get_or_init(|| Regex::new(r"\{color:([^}]+)\}([\s\S]*?)\{color\}").unwrap());
    re.replace_all(input, r#"<span style="color:${1}">${2}</span>"#)
        .into_owned()
}

/// `||` header rows -> Markdown header row plus a `|---|` separator
pub fn tables(input: &str) -> String {
    let mut lines = Vec::new();

    for line in input.split('\n') {
        if !line.contains("||") {
            lines.push(line.to_string());
            continue;
        }

        let header = line.replace("||", "|");
        let cells = header.matches('|').count().saturating_sub(1);
        lines.push(header);
        if cells > 0 {
            lines.push(format!("|{}", "---|".repeat(cells)));
        }
    }

    lines.join("\n")
}

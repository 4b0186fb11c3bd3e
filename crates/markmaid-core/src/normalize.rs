//! Diagram source normalization.
//!
//! Diagram code extracted from a rendered Markdown code block goes through three pure stages
//! before it reaches the diagram engine:
//!
//! 1. HTML character references are decoded (`&lt;br/&gt;` becomes `<br/>`).
//! 2. Line-break tags become newline characters (flag: `convert_br_to_newline`).
//! 3. Quoted bracket labels that span several lines are wrapped in the engine's backtick
//!    "markdown string" delimiter so the line breaks survive its parser
//!    (flag: `auto_backtick_labels`).
//!
//! Known limitation: labels containing nested brackets or literal `"` characters are left
//! alone by stage 3.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NormalizeOptions {
    pub convert_br_to_newline: bool,
    pub auto_backtick_labels: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            convert_br_to_newline: true,
            auto_backtick_labels: true,
        }
    }
}

fn line_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?\s*>").expect("valid regex"))
}

fn square_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\["([^"]*)"\]"#).expect("valid regex"))
}

fn round_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\("([^"]*)"\)"#).expect("valid regex"))
}

fn curly_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\{"([^"]*)"\}"#).expect("valid regex"))
}

/// Decodes HTML character references (`&lt;`, `&#60;`, `&nbsp;`, ...).
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }
    htmlize::unescape(input)
}

/// Replaces every `<br>`, `<br/>`, `<BR />` style tag with `\n`.
pub fn convert_line_breaks(input: &str) -> Cow<'_, str> {
    line_break_regex().replace_all(input, "\n")
}

fn is_backtick_wrapped(content: &str) -> bool {
    content.len() >= 2 && content.starts_with('`') && content.ends_with('`')
}

fn wrap_multiline_labels<'a>(input: &'a str, re: &Regex, open: char, close: char) -> Cow<'a, str> {
    re.replace_all(input, |caps: &Captures| {
        let content = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if content.contains('\n') && !is_backtick_wrapped(content) {
            format!("{open}\"`{content}`\"{close}")
        } else {
            caps[0].to_string()
        }
    })
}

/// Wraps multi-line quoted labels of `[..]`, `(..)` and `{..}` nodes in backticks.
///
/// Labels that are already backtick-delimited are left untouched, so applying this twice is
/// the same as applying it once.
pub fn backtick_multiline_labels(input: &str) -> Cow<'_, str> {
    if !input.contains('"') {
        return Cow::Borrowed(input);
    }
    let s = wrap_multiline_labels(input, square_label_regex(), '[', ']');
    let s = wrap_multiline_labels(&s, round_label_regex(), '(', ')').into_owned();
    let s = wrap_multiline_labels(&s, curly_label_regex(), '{', '}').into_owned();
    Cow::Owned(s)
}

/// Runs the full normalization pipeline.
pub fn normalize(raw: &str, options: NormalizeOptions) -> String {
    let mut code = decode_entities(raw).into_owned();
    if options.convert_br_to_newline {
        code = convert_line_breaks(&code).into_owned();
    }
    if options.auto_backtick_labels {
        code = backtick_multiline_labels(&code).into_owned();
    }
    code
}

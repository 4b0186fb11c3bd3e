//! DOMPurify-style HTML sanitization on top of `lol_html`.
//!
//! Default rules: HTML, SVG and SVG filter profiles (no MathML), `data-*` and `aria-*`
//! attributes allowed, `href`/`url` and every `on*` event handler forbidden, and
//! `script`/`iframe`/`object`/`param`/`source`/`video` removed together with their content.

use lol_html::{RewriteStrSettings, element, rewrite_str};
use regex::Regex;
use rustc_hash::FxHashSet;
use std::borrow::Cow;
use std::sync::OnceLock;

const HTML_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "address", "area", "article", "aside", "audio", "b", "bdi", "bdo",
    "big", "blink", "blockquote", "body", "br", "button", "canvas", "caption", "center", "cite",
    "code", "col", "colgroup", "content", "data", "datalist", "dd", "decorator", "del",
    "details", "dfn", "dialog", "dir", "div", "dl", "dt", "element", "em", "fieldset",
    "figcaption", "figure", "font", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "head",
    "header", "hgroup", "hr", "html", "i", "img", "input", "ins", "kbd", "label", "legend", "li",
    "main", "map", "mark", "marquee", "menu", "menuitem", "meter", "nav", "nobr", "ol",
    "optgroup", "option", "output", "p", "picture", "pre", "progress", "q", "rp", "rt", "ruby",
    "s", "samp", "section", "select", "shadow", "small", "source", "spacer", "span", "strike",
    "strong", "style", "sub", "summary", "sup", "table", "tbody", "td", "template", "textarea",
    "tfoot", "th", "thead", "time", "tr", "track", "tt", "u", "ul", "var", "video", "wbr",
];

const SVG_TAGS: &[&str] = &[
    "svg", "a", "altglyph", "altglyphdef", "altglyphitem", "animatecolor", "animatemotion",
    "animatetransform", "circle", "clippath", "defs", "desc", "ellipse", "filter", "font", "g",
    "glyph", "glyphref", "hkern", "image", "line", "lineargradient", "marker", "mask",
    "metadata", "mpath", "path", "pattern", "polygon", "polyline", "radialgradient", "rect",
    "stop", "style", "switch", "symbol", "text", "textpath", "title", "tref", "tspan", "view",
    "vkern",
];

const SVG_FILTER_TAGS: &[&str] = &[
    "feblend", "fecolormatrix", "fecomponenttransfer", "fecomposite", "feconvolvematrix",
    "fediffuselighting", "fedisplacementmap", "fedistantlight", "fedropshadow", "feflood",
    "fefunca", "fefuncb", "fefuncg", "fefuncr", "fegaussianblur", "feimage", "femerge",
    "femergenode", "femorphology", "feoffset", "fepointlight", "fespecularlighting",
    "fespotlight", "fetile", "feturbulence",
];

const HTML_ATTRS: &[&str] = &[
    "accept", "action", "align", "alt", "autocapitalize", "autocomplete", "autoplay",
    "background", "bgcolor", "border", "capture", "cellpadding", "cellspacing", "checked",
    "cite", "class", "clear", "color", "cols", "colspan", "controls", "controlslist", "coords",
    "crossorigin", "datetime", "decoding", "default", "dir", "disabled", "download",
    "draggable", "enctype", "enterkeyhint", "face", "for", "headers", "height", "hidden", "high",
    "href", "hreflang", "id", "inputmode", "integrity", "ismap", "kind", "label", "lang", "list",
    "loading", "loop", "low", "max", "maxlength", "media", "method", "min", "minlength",
    "multiple", "muted", "name", "nonce", "noshade", "novalidate", "nowrap", "open", "optimum",
    "pattern", "placeholder", "playsinline", "poster", "preload", "pubdate", "radiogroup",
    "readonly", "rel", "required", "rev", "reversed", "role", "rows", "rowspan", "spellcheck",
    "scope", "selected", "shape", "size", "sizes", "span", "srclang", "start", "src", "srcset",
    "step", "style", "summary", "tabindex", "title", "translate", "type", "usemap", "valign",
    "value", "width", "wrap", "xmlns", "slot",
];

const SVG_ATTRS: &[&str] = &[
    "accent-height", "accumulate", "additive", "alignment-baseline", "ascent", "attributename",
    "attributetype", "azimuth", "basefrequency", "baseline-shift", "begin", "bias", "by",
    "class", "clip", "clippathunits", "clip-path", "clip-rule", "color", "color-interpolation",
    "color-interpolation-filters", "color-profile", "color-rendering", "cx", "cy", "d", "dx",
    "dy", "diffuseconstant", "direction", "display", "divisor", "dominant-baseline", "dur",
    "edgemode", "elevation", "end", "exponent", "fill", "fill-opacity", "fill-rule", "filter",
    "filterunits", "flood-color", "flood-opacity", "font-family", "font-size",
    "font-size-adjust", "font-stretch", "font-style", "font-variant", "font-weight", "fx", "fy",
    "g1", "g2", "glyph-name", "glyphref", "gradientunits", "gradienttransform", "height", "href",
    "id", "image-rendering", "in", "in2", "intercept", "k", "k1", "k2", "k3", "k4", "kerning",
    "keypoints", "keysplines", "keytimes", "lang", "lengthadjust", "letter-spacing",
    "kernelmatrix", "kernelunitlength", "lighting-color", "local", "marker-end", "marker-mid",
    "marker-start", "markerheight", "markerunits", "markerwidth", "maskcontentunits",
    "maskunits", "max", "mask", "media", "method", "mode", "min", "name", "numoctaves", "offset",
    "operator", "opacity", "order", "orient", "orientation", "origin", "overflow", "paint-order",
    "path", "pathlength", "patterncontentunits", "patterntransform", "patternunits", "points",
    "preservealpha", "preserveaspectratio", "primitiveunits", "r", "rx", "ry", "radius", "refx",
    "refy", "repeatcount", "repeatdur", "restart", "result", "rotate", "scale", "seed",
    "shape-rendering", "slope", "specularconstant", "specularexponent", "spreadmethod",
    "startoffset", "stddeviation", "stitchtiles", "stop-color", "stop-opacity",
    "stroke-dasharray", "stroke-dashoffset", "stroke-linecap", "stroke-linejoin",
    "stroke-miterlimit", "stroke-opacity", "stroke", "stroke-width", "style", "surfacescale",
    "systemlanguage", "tabindex", "tablevalues", "targetx", "targety", "transform",
    "transform-origin", "text-anchor", "text-decoration", "text-rendering", "textlength",
    "type", "u1", "u2", "unicode", "values", "viewbox", "visibility", "version", "vert-adv-y",
    "vert-origin-x", "vert-origin-y", "width", "word-spacing", "wrap", "writing-mode",
    "xchannelselector", "ychannelselector", "x", "x1", "x2", "xmlns", "y", "y1", "y2", "z",
    "zoomandpan", "xlink:href", "xml:id", "xlink:title", "xml:space", "xmlns:xlink",
];

const FORBIDDEN_TAGS: &[&str] = &["script", "iframe", "object", "param", "source", "video"];

const FORBIDDEN_ATTRS: &[&str] = &["href", "url"];

/// Tags whose content is dropped together with the tag when they are not allowed.
const FORBIDDEN_CONTENTS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "video", "audio", "noscript", "noembed",
    "noframes", "template", "xmp", "title", "math",
];

const URI_ATTRS: &[&str] = &["src", "xlink:href", "href", "action", "background", "poster"];

const DATA_URI_TAGS: &[&str] = &["img", "image", "audio", "track"];

fn data_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^data-[\-\w.\u{00B7}-\u{FFFF}]+$").expect("valid regex"))
}

fn aria_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^aria-[\-\w]+$").expect("valid regex"))
}

fn attr_whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\u{0000}-\u{0020}\u{00A0}\u{1680}\u{180E}\u{2000}-\u{2029}\u{205F}\u{3000}]")
            .expect("valid regex")
    })
}

fn allowed_uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:(?:(?:f|ht)tps?|mailto|tel|callto|sms|cid|xmpp):|[^a-z]|[a-z+.\-]+(?:[^a-z+.\-:]|$))")
            .expect("valid regex")
    })
}

fn colon_entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)&colon;|&#0*58;?|&#x0*3a;?").expect("valid regex"))
}

fn set_of(items: &[&[&str]]) -> FxHashSet<String> {
    items
        .iter()
        .flat_map(|list| list.iter())
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeRules {
    allowed_tags: FxHashSet<String>,
    allowed_attrs: FxHashSet<String>,
    forbidden_tags: FxHashSet<String>,
    forbidden_attrs: FxHashSet<String>,
    forbidden_contents: FxHashSet<String>,
    pub allow_data_attrs: bool,
    pub allow_aria_attrs: bool,
    pub forbid_event_handlers: bool,
}

impl Default for SanitizeRules {
    fn default() -> Self {
        Self {
            allowed_tags: set_of(&[HTML_TAGS, SVG_TAGS, SVG_FILTER_TAGS]),
            allowed_attrs: set_of(&[HTML_ATTRS, SVG_ATTRS]),
            forbidden_tags: set_of(&[FORBIDDEN_TAGS]),
            forbidden_attrs: set_of(&[FORBIDDEN_ATTRS]),
            forbidden_contents: set_of(&[FORBIDDEN_CONTENTS]),
            allow_data_attrs: true,
            allow_aria_attrs: true,
            forbid_event_handlers: true,
        }
    }
}

impl SanitizeRules {
    /// Rules for engine-produced diagram graphics: the defaults plus `foreignObject`, which
    /// HTML labels are rendered into.
    pub fn for_diagrams() -> Self {
        Self::default().add_tags(["foreignobject"])
    }

    pub fn add_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for t in tags {
            self.allowed_tags.insert(t.as_ref().to_ascii_lowercase());
        }
        self
    }

    pub fn forbid_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for t in tags {
            self.forbidden_tags.insert(t.as_ref().to_ascii_lowercase());
        }
        self
    }

    pub fn forbid_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for a in attrs {
            self.forbidden_attrs.insert(a.as_ref().to_ascii_lowercase());
        }
        self
    }

    fn is_tag_allowed(&self, lc_tag: &str) -> bool {
        self.allowed_tags.contains(lc_tag) && !self.forbidden_tags.contains(lc_tag)
    }

    fn is_attr_allowed(&self, lc_tag: &str, lc_name: &str, value: &str) -> bool {
        if self.forbidden_attrs.contains(lc_name) {
            return false;
        }
        if self.forbid_event_handlers && lc_name.starts_with("on") {
            return false;
        }
        if self.allow_data_attrs && data_attr_regex().is_match(lc_name) {
            return true;
        }
        if self.allow_aria_attrs && aria_attr_regex().is_match(lc_name) {
            return true;
        }
        if !self.allowed_attrs.contains(lc_name) {
            return false;
        }
        if !URI_ATTRS.contains(&lc_name) {
            return true;
        }
        is_safe_uri(lc_tag, value)
    }
}

fn is_safe_uri(lc_tag: &str, value: &str) -> bool {
    if value.is_empty() {
        return true;
    }
    let decoded = colon_entity_regex().replace_all(value, ":");
    let compact = attr_whitespace_regex().replace_all(&decoded, "");
    if allowed_uri_regex().is_match(&compact) {
        return true;
    }
    compact.to_ascii_lowercase().starts_with("data:") && DATA_URI_TAGS.contains(&lc_tag)
}

/// Elements whose content the tokenizer reads as raw text.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title", "xmp"];

fn raw_text_tag(after_lt: &[u8]) -> Option<&'static str> {
    RAW_TEXT_TAGS.iter().copied().find(|tag| {
        after_lt.len() > tag.len()
            && after_lt[..tag.len()].eq_ignore_ascii_case(tag.as_bytes())
            && matches!(after_lt[tag.len()], b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
    })
}

/// Escapes `<` characters that cannot start a tag, the way a browser would treat them.
///
/// The content of raw-text elements such as `<style>` is left untouched.
fn escape_stray_lt(input: &str) -> Cow<'_, str> {
    fn opens_tag(next: Option<u8>) -> bool {
        next.is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?'))
    }

    let bytes = input.as_bytes();
    let mut lower: Option<String> = None;
    let mut out: Option<String> = None;
    let mut last = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        if !opens_tag(bytes.get(i + 1).copied()) {
            let out = out.get_or_insert_with(|| String::with_capacity(input.len() + 8));
            out.push_str(&input[last..i]);
            out.push_str("&lt;");
            i += 1;
            last = i;
            continue;
        }
        i += 1;
        if let Some(tag) = raw_text_tag(&bytes[i..]) {
            let lower = lower.get_or_insert_with(|| input.to_ascii_lowercase());
            let close = format!("</{tag}");
            i = match lower[i..].find(&close) {
                Some(at) => i + at + close.len(),
                None => bytes.len(),
            };
        }
    }

    match out {
        None => Cow::Borrowed(input),
        Some(mut out) => {
            out.push_str(&input[last..]);
            Cow::Owned(out)
        }
    }
}

/// Sanitizes an HTML fragment according to `rules`.
///
/// If the rewriter rejects the input, the whole fragment is returned escaped as text.
pub fn sanitize_html(html: &str, rules: &SanitizeRules) -> String {
    if html.is_empty() || !html.contains('<') {
        return html.to_string();
    }
    let html = escape_stray_lt(html);

    let handlers = vec![element!("*", |el| {
        let lc_tag = el.tag_name().to_ascii_lowercase();

        if !rules.is_tag_allowed(&lc_tag) {
            if rules.forbidden_tags.contains(&lc_tag) || rules.forbidden_contents.contains(&lc_tag)
            {
                el.remove();
            } else {
                el.remove_and_keep_content();
            }
            return Ok(());
        }

        let attrs: Vec<(String, String)> = el
            .attributes()
            .iter()
            .map(|a| (a.name(), a.value()))
            .collect();
        for (name, value) in attrs {
            let lc_name = name.to_ascii_lowercase();
            if !rules.is_attr_allowed(&lc_tag, &lc_name, &value) {
                el.remove_attribute(&name);
            }
        }
        Ok(())
    })];

    rewrite_str(
        html.as_ref(),
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::new()
        },
    )
    .unwrap_or_else(|err| {
        tracing::warn!(%err, "sanitizer rejected input; escaping it as text");
        htmlize::escape_text(html.as_ref()).into_owned()
    })
}

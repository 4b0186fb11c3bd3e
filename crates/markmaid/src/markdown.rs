//! Markdown to run-model conversion.
//!
//! `pulldown-cmark` renders the HTML skeleton. Every searchable text event is swapped for a
//! placeholder first, so the rendered HTML can be cut back into text runs and opaque markup
//! anchors afterwards.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};

const TEXT_SLOT: char = '\u{E000}';
pub(crate) const BLOCK_SLOT: char = '\u{E002}';
const SLOT_END: char = '\u{E001}';

/// Elements whose content is raw text rather than markup.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title", "xmp"];

/// A fenced code block the viewer does not render as plain code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FencedBlock {
    /// Diagram source exactly as written in the fence.
    Diagram(String),
    /// A non-blank stylesheet, injected as a `<style>` element.
    Style(String),
}

/// Opaque, non-searchable pieces of the rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Markup(String),
    /// Index into [`Parsed::blocks`].
    Block(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parsed {
    pub runs: Vec<Piece>,
    pub blocks: Vec<FencedBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    Chunk(Chunk),
}

pub fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

fn has_language_prefix(info: &str, prefix: &str) -> bool {
    let lang = info.split_whitespace().next().unwrap_or_default();
    lang.len() >= prefix.len()
        && lang.is_char_boundary(prefix.len())
        && lang[..prefix.len()].eq_ignore_ascii_case(prefix)
}

enum Fence {
    Block(FencedBlock),
    /// A blank stylesheet; nothing is emitted.
    Omitted,
    Plain,
}

fn classify(info: &str, body: String) -> Fence {
    if has_language_prefix(info, "mermaid") {
        Fence::Block(FencedBlock::Diagram(body))
    } else if has_language_prefix(info, "style") {
        if body.trim().is_empty() {
            Fence::Omitted
        } else {
            Fence::Block(FencedBlock::Style(body))
        }
    } else {
        Fence::Plain
    }
}

/// A placeholder that cannot occur in parsed input: the marker characters are stripped first.
pub(crate) fn slot(kind: char, index: usize) -> String {
    format!("{kind}{index}{SLOT_END}")
}

/// Byte length of the tag, comment or raw-text element at the start of `html`, or `None` when
/// the leading `<` is plain text.
fn markup_len(html: &str) -> Option<usize> {
    let bytes = html.as_bytes();
    let next = *bytes.get(1)?;
    if html.starts_with("<!--") {
        return Some(html.find("-->").map_or(html.len(), |end| end + 3));
    }
    if !(next.is_ascii_alphabetic() || matches!(next, b'/' | b'!' | b'?')) {
        return None;
    }

    let mut quote = None;
    let mut end = html.len();
    for (i, &b) in bytes.iter().enumerate().skip(1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if matches!(b, b'"' | b'\'') => quote = Some(b),
            None if b == b'>' => {
                end = i + 1;
                break;
            }
            None => {}
        }
    }

    let name = html[1..end]
        .split(|c: char| !c.is_ascii_alphanumeric())
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if !RAW_TEXT_TAGS.contains(&name.as_str()) {
        return Some(end);
    }
    let close = format!("</{name}");
    let lower = html.to_ascii_lowercase();
    Some(match lower[end..].find(&close) {
        Some(at) => {
            let tail = end + at;
            html[tail..].find('>').map_or(html.len(), |gt| tail + gt + 1)
        }
        None => html.len(),
    })
}

struct Collector {
    texts: Vec<String>,
    blocks: Vec<FencedBlock>,
    image_depth: usize,
    /// Raw HTML of the block being read, if any.
    html_block: Option<String>,
}

impl Collector {
    fn text_slot(&mut self, text: &str) -> Event<'static> {
        self.texts.push(text.to_string());
        Event::InlineHtml(CowStr::from(slot(TEXT_SLOT, self.texts.len() - 1)))
    }

    fn block_slot(&mut self, block: FencedBlock) -> Event<'static> {
        self.blocks.push(block);
        Event::Html(CowStr::from(format!(
            "{}\n",
            slot(BLOCK_SLOT, self.blocks.len() - 1)
        )))
    }

    /// Splits a raw HTML block into markup and searchable text between the tags.
    fn split_html_block<'a>(&mut self, raw: &str, out: &mut Vec<Event<'a>>) {
        let mut text_from = 0;
        let mut i = 0;
        while let Some(at) = raw[i..].find('<') {
            let start = i + at;
            match markup_len(&raw[start..]) {
                Some(len) => {
                    self.html_text(&raw[text_from..start], out);
                    out.push(Event::Html(CowStr::from(raw[start..start + len].to_string())));
                    i = start + len;
                    text_from = i;
                }
                None => i = start + 1,
            }
        }
        self.html_text(&raw[text_from..], out);
    }

    fn html_text<'a>(&mut self, text: &str, out: &mut Vec<Event<'a>>) {
        if text.trim().is_empty() {
            if !text.is_empty() {
                out.push(Event::Html(CowStr::from(text.to_string())));
            }
        } else {
            out.push(self.text_slot(&htmlize::unescape(text)));
        }
    }

    fn map<'a>(&mut self, event: Event<'a>, out: &mut Vec<Event<'a>>) {
        match event {
            Event::Start(Tag::HtmlBlock) => {
                self.html_block = Some(String::new());
                out.push(event);
            }
            Event::Html(raw) => match self.html_block.as_mut() {
                Some(buf) => buf.push_str(&raw),
                None => out.push(Event::Html(raw)),
            },
            Event::End(TagEnd::HtmlBlock) => {
                let raw = self.html_block.take().unwrap_or_default();
                self.split_html_block(&raw, out);
                out.push(event);
            }
            Event::Start(Tag::Image { .. }) => {
                self.image_depth += 1;
                out.push(event);
            }
            Event::End(TagEnd::Image) => {
                self.image_depth = self.image_depth.saturating_sub(1);
                out.push(event);
            }
            // Alt text is written into an attribute; it stays plain.
            _ if self.image_depth > 0 => out.push(event),
            Event::Text(text) => out.push(self.text_slot(&text)),
            Event::Code(text) => {
                out.push(Event::InlineHtml("<code>".into()));
                out.push(self.text_slot(&text));
                out.push(Event::InlineHtml("</code>".into()));
            }
            Event::Start(Tag::Link {
                dest_url, title, ..
            }) => {
                let mut open = format!(
                    "<a data-href=\"{}\"",
                    htmlize::escape_attribute(&*dest_url)
                );
                if !title.is_empty() {
                    open.push_str(&format!(
                        " title=\"{}\"",
                        htmlize::escape_attribute(&*title)
                    ));
                }
                open.push('>');
                out.push(Event::InlineHtml(open.into()));
            }
            Event::End(TagEnd::Link) => out.push(Event::InlineHtml("</a>".into())),
            other => out.push(other),
        }
    }
}

/// Parses `markdown` into text runs, markup chunks and special fenced blocks.
pub fn parse(markdown: &str) -> Parsed {
    let source: String = markdown
        .chars()
        .filter(|c| !matches!(*c, TEXT_SLOT | BLOCK_SLOT | SLOT_END))
        .collect();

    let mut collector = Collector {
        texts: Vec::new(),
        blocks: Vec::new(),
        image_depth: 0,
        html_block: None,
    };
    let mut events = Vec::new();
    let mut parser = Parser::new_ext(&source, parser_options());

    while let Some(event) = parser.next() {
        let kind = match event {
            Event::Start(Tag::CodeBlock(kind)) => kind,
            other => {
                collector.map(other, &mut events);
                continue;
            }
        };
        let mut inner = Vec::new();
        for e in parser.by_ref() {
            if matches!(e, Event::End(TagEnd::CodeBlock)) {
                break;
            }
            inner.push(e);
        }
        let info = match &kind {
            CodeBlockKind::Fenced(info) => info.to_string(),
            CodeBlockKind::Indented => String::new(),
        };
        let body: String = inner
            .iter()
            .filter_map(|e| match e {
                Event::Text(t) => Some(&**t),
                _ => None,
            })
            .collect();
        match classify(&info, body) {
            Fence::Block(block) => {
                events.push(collector.block_slot(block));
                continue;
            }
            Fence::Omitted => continue,
            Fence::Plain => {}
        }
        collector.map(Event::Start(Tag::CodeBlock(kind)), &mut events);
        for e in inner {
            collector.map(e, &mut events);
        }
        collector.map(Event::End(TagEnd::CodeBlock), &mut events);
    }

    let mut rendered = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut rendered, events.into_iter());

    Parsed {
        runs: split_slots(&rendered, &collector.texts),
        blocks: collector.blocks,
    }
}

fn push_markup(runs: &mut Vec<Piece>, markup: &str) {
    if markup.is_empty() {
        return;
    }
    if let Some(Piece::Chunk(Chunk::Markup(prev))) = runs.last_mut() {
        prev.push_str(markup);
    } else {
        runs.push(Piece::Chunk(Chunk::Markup(markup.to_string())));
    }
}

fn split_slots(rendered: &str, texts: &[String]) -> Vec<Piece> {
    let mut runs = Vec::new();
    let mut rest = rendered;
    while let Some(start) = rest.find([TEXT_SLOT, BLOCK_SLOT]) {
        push_markup(&mut runs, &rest[..start]);
        let kind = rest[start..].chars().next().unwrap_or(TEXT_SLOT);
        let after = &rest[start + kind.len_utf8()..];
        let Some(end) = after.find(SLOT_END) else {
            push_markup(&mut runs, &rest[start..]);
            return runs;
        };
        let index = after[..end].parse::<usize>().ok();
        match (kind, index) {
            (TEXT_SLOT, Some(i)) if i < texts.len() => match runs.last_mut() {
                Some(Piece::Text(prev)) => prev.push_str(&texts[i]),
                _ if texts[i].is_empty() => {}
                _ => runs.push(Piece::Text(texts[i].clone())),
            },
            (BLOCK_SLOT, Some(i)) => runs.push(Piece::Chunk(Chunk::Block(i))),
            _ => {}
        }
        rest = &after[end + SLOT_END.len_utf8()..];
    }
    push_markup(&mut runs, rest);
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(parsed: &Parsed) -> Vec<&str> {
        parsed
            .runs
            .iter()
            .filter_map(|p| match p {
                Piece::Text(t) => Some(t.as_str()),
                Piece::Chunk(_) => None,
            })
            .collect()
    }

    #[test]
    fn paragraph_becomes_markup_around_text() {
        let parsed = parse("Hello *world*");
        assert_eq!(
            parsed.runs,
            vec![
                Piece::Chunk(Chunk::Markup("<p>".into())),
                Piece::Text("Hello ".into()),
                Piece::Chunk(Chunk::Markup("<em>".into())),
                Piece::Text("world".into()),
                Piece::Chunk(Chunk::Markup("</em></p>\n".into())),
            ]
        );
    }

    #[test]
    fn mermaid_fence_is_lifted_out() {
        let parsed = parse("before\n\n```mermaid\ngraph TD\nA-->B\n```\n\nafter");
        assert_eq!(
            parsed.blocks,
            vec![FencedBlock::Diagram("graph TD\nA-->B\n".into())]
        );
        assert!(parsed.runs.contains(&Piece::Chunk(Chunk::Block(0))));
        assert_eq!(texts(&parsed), vec!["before", "after"]);
    }

    #[test]
    fn language_prefix_is_case_insensitive() {
        let parsed = parse("```Mermaid\nflowchart LR\n```\n\n```STYLE\np { color: red }\n```");
        assert_eq!(
            parsed.blocks,
            vec![
                FencedBlock::Diagram("flowchart LR\n".into()),
                FencedBlock::Style("p { color: red }\n".into()),
            ]
        );
    }

    #[test]
    fn blank_style_fence_is_omitted() {
        let parsed = parse("```style\n   \n```\n\nafter");
        assert!(parsed.blocks.is_empty());
        assert_eq!(
            parsed.runs,
            vec![
                Piece::Chunk(Chunk::Markup("<p>".into())),
                Piece::Text("after".into()),
                Piece::Chunk(Chunk::Markup("</p>\n".into())),
            ]
        );
    }

    #[test]
    fn other_languages_stay_plain_code() {
        let parsed = parse("```stylus\n```\n\n```js\nlet x;\n```");
        assert!(parsed.blocks.is_empty());
        let Piece::Chunk(Chunk::Markup(markup)) = &parsed.runs[0] else {
            panic!("unexpected runs {:?}", parsed.runs);
        };
        assert!(markup.starts_with("<pre><code class=\"language-stylus\">"), "{markup}");
    }

    #[test]
    fn plain_code_and_inline_code_are_searchable() {
        let parsed = parse("Use `cargo` here\n\n```rust\nfn main() {}\n```");
        assert_eq!(texts(&parsed), vec!["Use ", "cargo", " here", "fn main() {}\n"]);
    }

    #[test]
    fn links_keep_target_out_of_href() {
        let parsed = parse("[docs](https://example.com/a?b=1&c=2 \"Title\")");
        let Piece::Chunk(Chunk::Markup(open)) = &parsed.runs[0] else {
            panic!("unexpected runs {:?}", parsed.runs);
        };
        assert_eq!(
            open,
            "<p><a data-href=\"https://example.com/a?b=1&amp;c=2\" title=\"Title\">"
        );
        assert_eq!(texts(&parsed), vec!["docs"]);
    }

    #[test]
    fn image_alt_text_is_not_split() {
        let parsed = parse("![a cat](cat.png)");
        assert!(texts(&parsed).is_empty());
        let Piece::Chunk(Chunk::Markup(markup)) = &parsed.runs[0] else {
            panic!("unexpected runs {:?}", parsed.runs);
        };
        assert!(markup.contains("alt=\"a cat\""), "{markup}");
    }

    #[test]
    fn html_block_text_is_searchable() {
        let parsed = parse("<div class=\"note\">\nhello &amp; world\n</div>\n\nhello again");
        assert_eq!(
            parsed.runs,
            vec![
                Piece::Chunk(Chunk::Markup("<div class=\"note\">".into())),
                Piece::Text("\nhello & world\n".into()),
                Piece::Chunk(Chunk::Markup("</div>\n<p>".into())),
                Piece::Text("hello again".into()),
                Piece::Chunk(Chunk::Markup("</p>\n".into())),
            ]
        );
    }

    #[test]
    fn html_block_keeps_comments_and_raw_text_as_markup() {
        let parsed = parse("<div>\n<!-- a > b -->\n<script>let x = 1 < 2;</script>\nkept\n</div>");
        assert_eq!(texts(&parsed), vec!["\nkept\n"]);
        let markup: String = parsed
            .runs
            .iter()
            .filter_map(|p| match p {
                Piece::Chunk(Chunk::Markup(m)) => Some(m.as_str()),
                _ => None,
            })
            .collect();
        assert!(markup.contains("<!-- a > b -->"), "{markup}");
        assert!(markup.contains("<script>let x = 1 < 2;</script>"), "{markup}");
    }

    #[test]
    fn placeholder_characters_in_input_are_dropped() {
        let parsed = parse("a\u{E000}0\u{E001}b");
        assert_eq!(texts(&parsed), vec!["a0b"]);
    }
}

//! A parsed Markdown document: searchable text, markup, and mounted diagram blocks.

use crate::diagram::{DiagramEngine, DiagramView, RenderOptions};
use crate::markdown::{self, Chunk, FencedBlock, Piece};
use markmaid_core::{
    DebugKind, DebugLog, MatchSurface, MermaidSettings, NormalizeOptions, RichText, Run,
    SanitizeRules, ScrollRequest, normalize, sanitize_html,
};
use std::fmt::Write as _;

/// Non-text runs of a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    Markup(String),
    Style(String),
    /// Index into [`Document::diagrams`].
    Diagram(usize),
}

#[derive(Debug, Clone)]
pub struct DiagramBlock {
    /// Fence body as written.
    pub raw: String,
    /// Normalized source handed to the engine.
    pub source: String,
    pub view: DiagramView,
}

pub fn diagram_id(index: usize) -> String {
    format!("mermaid-{index}")
}

/// Marks where a diagram goes in the HTML handed to the sanitizer. Markdown input can never
/// contain it.
fn diagram_slot(index: usize) -> String {
    markdown::slot(markdown::BLOCK_SLOT, index)
}

#[derive(Debug, Clone)]
pub struct Document {
    body: RichText<Anchor>,
    diagrams: Vec<DiagramBlock>,
    options: RenderOptions,
    scroll: Option<ScrollRequest>,
}

impl Default for Document {
    fn default() -> Self {
        Self::parse("", &MermaidSettings::default())
    }
}

impl Document {
    pub fn parse(markdown: &str, settings: &MermaidSettings) -> Self {
        let parsed = markdown::parse(markdown);
        let normalize_options = settings.normalize_options();

        let mut diagrams = Vec::new();
        let mut slots = Vec::with_capacity(parsed.blocks.len());
        for block in parsed.blocks {
            slots.push(match block {
                FencedBlock::Diagram(raw) => {
                    diagrams.push(new_block(diagrams.len(), raw, normalize_options));
                    Anchor::Diagram(diagrams.len() - 1)
                }
                FencedBlock::Style(css) => Anchor::Style(css),
            });
        }

        let mut body = RichText::new();
        for piece in parsed.runs {
            match piece {
                Piece::Text(text) => body.push_text(&text),
                Piece::Chunk(Chunk::Markup(markup)) => body.push_anchor(Anchor::Markup(markup)),
                Piece::Chunk(Chunk::Block(i)) => {
                    if let Some(anchor) = slots.get(i) {
                        body.push_anchor(anchor.clone());
                    }
                }
            }
        }

        tracing::debug!(
            diagrams = diagrams.len(),
            runs = body.runs().len(),
            "parsed markdown document"
        );

        Self {
            body,
            diagrams,
            options: RenderOptions::from_settings(settings),
            scroll: None,
        }
    }

    /// Re-parses in place, keeping the mounted state of diagrams that still exist at the same
    /// position so unchanged ones are not rendered again.
    pub fn update(&mut self, markdown: &str, settings: &MermaidSettings) {
        let mut next = Self::parse(markdown, settings);
        let mut old = std::mem::take(&mut self.diagrams).into_iter();
        for block in next.diagrams.iter_mut() {
            match old.next() {
                Some(prev) => block.view = prev.view,
                None => break,
            }
        }
        for mut removed in old {
            removed.view.unmount();
        }
        *self = next;
    }

    pub fn body(&self) -> &RichText<Anchor> {
        &self.body
    }

    pub fn diagrams(&self) -> &[DiagramBlock] {
        &self.diagrams
    }

    pub fn diagram_mut(&mut self, index: usize) -> Option<&mut DiagramView> {
        self.diagrams.get_mut(index).map(|b| &mut b.view)
    }

    pub fn render_options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn is_blank(&self) -> bool {
        self.diagrams.is_empty() && self.body.text_content().trim().is_empty()
    }

    /// Renders every diagram whose source or options changed since its last render.
    ///
    /// Blocks are isolated from each other: a failing or panicking render only turns its own
    /// block into a source fallback. Returns the number of blocks that received new content.
    pub async fn render_diagrams<E: DiagramEngine + ?Sized>(
        &mut self,
        engine: &E,
        debug: &mut DebugLog,
    ) -> usize {
        let mut applied = 0;
        for block in &mut self.diagrams {
            if block.source.trim().is_empty()
                || !block.view.needs_render(&block.source, &self.options)
            {
                continue;
            }
            debug.log(DebugKind::Code, "Raw mermaid code", &block.raw);
            debug.log(DebugKind::Code, "Processed mermaid code", &block.source);
            if block
                .view
                .render(engine, &block.source, &self.options, debug)
                .await
            {
                applied += 1;
            }
        }
        applied
    }

    /// Stops accepting renders for every block.
    pub fn unmount(&mut self) {
        for block in &mut self.diagrams {
            block.view.unmount();
        }
    }

    /// Where the last navigation asked the surface to scroll, if it has not been consumed yet.
    pub fn take_scroll_request(&mut self) -> Option<ScrollRequest> {
        self.scroll.take()
    }

    /// Sanitized HTML for the whole document.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for run in self.body.runs() {
            match run {
                Run::Text(text) => html.push_str(&htmlize::escape_text(text.as_str())),
                Run::Mark(mark) => {
                    let _ = write!(
                        html,
                        "<mark class=\"search-highlight{}\" data-match=\"{}\">{}</mark>",
                        if mark.current { " current" } else { "" },
                        mark.index,
                        htmlize::escape_text(mark.text.as_str()),
                    );
                }
                Run::Anchor(Anchor::Markup(markup)) => html.push_str(markup),
                Run::Anchor(Anchor::Style(css)) => {
                    let _ = write!(
                        html,
                        "<style class=\"language-style style\" data-name=\"style\">{css}</style>"
                    );
                }
                Run::Anchor(Anchor::Diagram(i)) => html.push_str(&diagram_slot(*i)),
            }
        }

        let mut clean = sanitize_html(&html, &SanitizeRules::default());
        for (i, block) in self.diagrams.iter().enumerate() {
            clean = clean.replacen(&diagram_slot(i), &block.view.to_html(&block.source), 1);
        }
        clean
    }
}

fn new_block(index: usize, raw: String, options: NormalizeOptions) -> DiagramBlock {
    DiagramBlock {
        source: normalize(&raw, options),
        view: DiagramView::new(diagram_id(index)),
        raw,
    }
}

impl MatchSurface for Document {
    fn clear_highlights(&mut self) {
        self.body.clear_highlights();
    }

    fn highlight(&mut self, query: &str) -> usize {
        self.body.highlight(query).len()
    }

    fn set_current(&mut self, index: usize, current: bool) {
        self.body.set_current(index, current);
    }

    fn scroll_into_view(&mut self, request: ScrollRequest) {
        self.scroll = Some(request);
    }
}

#![forbid(unsafe_code)]

//! `markmaid` turns Markdown with embedded Mermaid diagrams into sanitized, searchable HTML.
//!
//! The headless engines live in [`markmaid_core`] and are re-exported here. This crate adds the
//! document pipeline ([`Document`]), the diagram engine seam ([`DiagramEngine`]) and the viewer
//! state a host embeds ([`Viewer`]).
//!
//! Rendering is runtime-agnostic: diagram engines are `async` and are driven by the caller.

pub use markmaid_core::*;

pub mod diagram;
pub mod document;
pub mod error;
pub mod markdown;
pub mod viewer;

pub use diagram::{DiagramContent, DiagramEngine, DiagramError, DiagramView, RenderOptions};
pub use document::{Anchor, DiagramBlock, Document};
pub use error::{Error, Result};
pub use viewer::{Host, Key, KeyEvent, SearchBar, Viewer, Viewport};

/// Renders `markdown` to sanitized HTML without running any diagram engine.
///
/// Diagram blocks come out as `<pre class="mermaid">` containers holding normalized source,
/// ready for a client-side engine.
pub fn render_markdown(markdown: &str, settings: &MermaidSettings) -> String {
    Document::parse(markdown, settings).to_html()
}

#[cfg(test)]
mod tests;

//! Mounted diagram blocks: engine seam, render suppression, fallback and zoom/pan.

use futures::FutureExt;
use markmaid_core::view::{Cursor, EventOutcome, PointerEvent, WheelEvent, fit_graphic_to_container};
use markmaid_core::{
    DebugKind, DebugLog, EngineConfig, MermaidSettings, RenderGate, RenderKey, RenderTicket,
    SanitizeRules, ViewController, sanitize_html,
};
use serde_json::json;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Failure reported by a [`DiagramEngine`] for one diagram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Diagram render failed: {message}")]
pub struct DiagramError {
    pub message: String,
}

impl DiagramError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A diagram renderer producing a vector graphic (SVG markup) from diagram source.
///
/// Implementations may be `async fn` in their `impl` blocks. The caller never runs two renders of
/// the same block concurrently.
pub trait DiagramEngine {
    fn render(
        &self,
        id: &str,
        source: &str,
        config: &EngineConfig,
    ) -> impl Future<Output = Result<String, DiagramError>>;
}

/// Everything besides the source that changes what a render produces.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub engine: EngineConfig,
    pub preserve_line_breaks: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from_settings(&MermaidSettings::default())
    }
}

impl RenderOptions {
    pub fn from_settings(settings: &MermaidSettings) -> Self {
        Self {
            engine: settings.engine_config(),
            preserve_line_breaks: settings.preserve_line_breaks_css,
        }
    }

    /// Stable serialization, used as the configuration half of a [`RenderKey`].
    pub fn serialized(&self) -> String {
        json!({
            "engine": self.engine.as_value(),
            "preserveLineBreaksCSS": self.preserve_line_breaks,
        })
        .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DiagramContent {
    /// Not rendered yet; shown as a `<pre class="mermaid">` block for client-side engines.
    #[default]
    Pending,
    /// Sanitized graphic markup.
    Graphic(String),
    /// The engine failed; the source is shown verbatim.
    Fallback(String),
}

/// One mounted diagram: what it shows, how it is zoomed, and whether a render is due.
#[derive(Debug, Clone)]
pub struct DiagramView {
    id: String,
    content: DiagramContent,
    controller: ViewController,
    gate: RenderGate,
}

impl DiagramView {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: DiagramContent::Pending,
            controller: ViewController::new(),
            gate: RenderGate::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &DiagramContent {
        &self.content
    }

    pub fn controller(&self) -> &ViewController {
        &self.controller
    }

    pub fn zoom_in(&mut self) {
        self.controller.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.controller.zoom_out();
    }

    pub fn reset_view(&mut self) {
        self.controller.reset();
    }

    pub fn on_pointer(&mut self, event: PointerEvent) -> EventOutcome {
        self.controller.on_pointer(event)
    }

    pub fn on_wheel(&mut self, event: WheelEvent) -> EventOutcome {
        self.controller.on_wheel(event)
    }

    pub fn cursor(&self) -> Cursor {
        self.controller.cursor()
    }

    /// Whether `source` with `options` differs from the last render request.
    pub fn needs_render(&self, source: &str, options: &RenderOptions) -> bool {
        self.gate
            .last_key()
            .is_none_or(|key| key.source != source || key.config != options.serialized())
    }

    /// Starts a render of `source` unless the last request had the same source and options.
    pub fn begin_render(&mut self, source: &str, options: &RenderOptions) -> Option<RenderTicket> {
        self.gate.request(RenderKey::new(source, options.serialized()))
    }

    /// Applies a finished render. Returns `false` when the ticket was superseded or the view was
    /// unmounted in the meantime.
    pub fn complete_render(
        &mut self,
        ticket: &RenderTicket,
        result: Result<String, DiagramError>,
        options: &RenderOptions,
    ) -> bool {
        if !self.gate.accepts(ticket) {
            tracing::debug!(
                id = %self.id,
                generation = ticket.generation(),
                "dropping stale render"
            );
            return false;
        }
        self.content = match result {
            Ok(svg) => {
                let fitted = fit_graphic_to_container(&svg, options.preserve_line_breaks);
                DiagramContent::Graphic(sanitize_html(&fitted, &SanitizeRules::for_diagrams()))
            }
            Err(err) => {
                tracing::warn!(id = %self.id, %err, "diagram render failed; showing source");
                DiagramContent::Fallback(ticket.key().source.clone())
            }
        };
        true
    }

    /// Renders `source` through `engine` unless nothing changed since the last render.
    ///
    /// A panicking engine is treated like a failing one. Returns whether new content was applied.
    pub async fn render<E: DiagramEngine + ?Sized>(
        &mut self,
        engine: &E,
        source: &str,
        options: &RenderOptions,
        debug: &mut DebugLog,
    ) -> bool {
        let Some(ticket) = self.begin_render(source, options) else {
            return false;
        };
        let outcome = AssertUnwindSafe(engine.render(&self.id, source, &options.engine))
            .catch_unwind()
            .await;
        let result = outcome.unwrap_or_else(|panic| {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "diagram engine panicked".to_string());
            Err(DiagramError::new(message))
        });
        if let Err(err) = &result {
            debug.log(DebugKind::Error, "Mermaid render error", &err.message);
        }
        self.complete_render(&ticket, result, options)
    }

    /// Forces the next render request to run even if nothing changed.
    pub fn invalidate(&mut self) {
        self.gate.invalidate();
    }

    /// Rejects every outstanding render from now on.
    pub fn unmount(&mut self) {
        self.gate.detach();
    }

    /// Markup for this block. `source` is what a pending block hands to a client-side engine.
    pub fn to_html(&self, source: &str) -> String {
        let id = htmlize::escape_attribute(&self.id);
        match &self.content {
            DiagramContent::Pending => format!(
                "<pre class=\"mermaid\" id=\"{id}\" data-name=\"mermaid\">{}</pre>",
                htmlize::escape_text(source)
            ),
            DiagramContent::Fallback(text) => format!(
                "<pre class=\"mermaid-fallback\" id=\"{id}\" data-name=\"mermaid\">{}</pre>",
                htmlize::escape_text(text.as_str())
            ),
            DiagramContent::Graphic(svg) => {
                let transform = self.controller.transform();
                let cursor = match self.controller.cursor() {
                    Cursor::Default => "default",
                    Cursor::Grab => "grab",
                    Cursor::Grabbing => "grabbing",
                };
                format!(
                    "<div class=\"mermaid-container\" id=\"{id}\" data-name=\"mermaid\" data-zoom=\"{}\">\
<div class=\"mermaid-viewport\" style=\"transform: {}; transform-origin: 0 0; cursor: {cursor}\">{svg}</div>\
</div>",
                    transform.zoom_percent(),
                    transform.css_transform(),
                )
            }
        }
    }
}

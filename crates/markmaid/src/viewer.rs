//! Viewer application state: host data, settings, search bar, keyboard and links.

use crate::diagram::DiagramEngine;
use crate::document::Document;
use crate::error::{Error, Result};
use markmaid_core::view::EventOutcome;
use markmaid_core::{
    DataView, DebugKind, DebugLog, MarkmaidSettings, MatchNavigator, extract_content,
};
use std::fmt::Write as _;

const LINK_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Services provided by the embedding host.
pub trait Host {
    fn launch_url(&self, url: &str);
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            shift: false,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    fn is_find_shortcut(&self) -> bool {
        (self.ctrl || self.meta) && matches!(self.key, Key::Char('f' | 'F'))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchBar {
    open: bool,
    query: String,
    navigator: MatchNavigator,
}

impl SearchBar {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn current(&self) -> usize {
        self.navigator.current()
    }

    pub fn count(&self) -> usize {
        self.navigator.count()
    }

    /// `"current/count"`, or `"0 results"`; `None` while the query is empty.
    pub fn status(&self) -> Option<String> {
        if self.query.is_empty() {
            return None;
        }
        Some(if self.count() > 0 {
            format!("{}/{}", self.current(), self.count())
        } else {
            "0 results".to_string()
        })
    }
}

pub struct Viewer {
    settings: MarkmaidSettings,
    viewport: Viewport,
    content: String,
    document: Document,
    search: SearchBar,
    debug: DebugLog,
    host: Option<Box<dyn Host>>,
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("settings", &self.settings)
            .field("viewport", &self.viewport)
            .field("content_len", &self.content.len())
            .field("search", &self.search)
            .field("has_host", &self.host.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new(MarkmaidSettings::default())
    }
}

impl Viewer {
    pub fn new(settings: MarkmaidSettings) -> Self {
        let mut debug = DebugLog::new();
        debug.set_enabled(settings.view.show_debug_panel);
        Self {
            document: Document::parse("", &settings.mermaid),
            settings,
            viewport: Viewport::default(),
            content: String::new(),
            search: SearchBar::default(),
            debug,
            host: None,
        }
    }

    pub fn settings(&self) -> &MarkmaidSettings {
        &self.settings
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn search(&self) -> &SearchBar {
        &self.search
    }

    pub fn debug_log(&self) -> &DebugLog {
        &self.debug
    }

    pub fn debug_log_mut(&mut self) -> &mut DebugLog {
        &mut self.debug
    }

    /// Content is blank after trimming.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    pub fn set_host(&mut self, host: impl Host + 'static) {
        self.host = Some(Box::new(host));
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_data_view(&mut self, data_view: Option<&DataView>) {
        let content = extract_content(data_view);
        if content == self.content {
            return;
        }
        self.debug.log(
            DebugKind::Info,
            "Markdown content",
            &format!("{} characters", content.chars().count()),
        );
        self.content = content;
        self.reload();
    }

    pub fn set_settings(&mut self, settings: MarkmaidSettings) {
        if settings == self.settings {
            return;
        }
        if settings.view.show_debug_panel != self.debug.is_enabled() {
            self.debug.set_enabled(settings.view.show_debug_panel);
        }
        self.settings = settings;
        self.reload();
    }

    fn reload(&mut self) {
        self.document.update(&self.content, &self.settings.mermaid);
        if self.search.open && !self.search.query.is_empty() {
            let query = self.search.query.clone();
            self.search.navigator.search(&mut self.document, &query);
        } else {
            self.search.navigator = MatchNavigator::new();
        }
    }

    /// Renders pending or changed diagrams; see [`Document::render_diagrams`].
    pub async fn render_diagrams<E: DiagramEngine + ?Sized>(&mut self, engine: &E) -> usize {
        self.document.render_diagrams(engine, &mut self.debug).await
    }

    pub fn open_search(&mut self) {
        self.search.open = true;
    }

    /// Closes the search bar, dropping every highlight and the query.
    pub fn close_search(&mut self) {
        self.search.navigator.close(&mut self.document);
        self.search.query.clear();
        self.search.open = false;
    }

    pub fn set_query(&mut self, query: &str) -> usize {
        self.search.query = query.to_string();
        self.search.navigator.search(&mut self.document, query)
    }

    pub fn search_next(&mut self) {
        self.search.navigator.next(&mut self.document);
    }

    pub fn search_prev(&mut self) {
        self.search.navigator.prev(&mut self.document);
    }

    pub fn on_key(&mut self, event: KeyEvent) -> EventOutcome {
        if event.is_find_shortcut() {
            self.open_search();
            return EventOutcome::HandledPreventDefault;
        }
        if !self.search.open {
            return EventOutcome::Ignored;
        }
        match event.key {
            Key::Enter if event.shift => self.search_prev(),
            Key::Enter => self.search_next(),
            Key::Escape => self.close_search(),
            Key::Backspace => {
                let mut query = self.search.query.clone();
                if query.pop().is_none() {
                    return EventOutcome::Handled;
                }
                self.set_query(&query);
            }
            Key::Char(c) if !(event.ctrl || event.meta) => {
                let query = format!("{}{c}", self.search.query);
                self.set_query(&query);
            }
            Key::Char(_) => return EventOutcome::Ignored,
        }
        EventOutcome::Handled
    }

    /// Forwards a clicked link target to the host.
    ///
    /// Returns `Ok(false)` when no host is attached.
    pub fn on_link_click(&self, href: &str) -> Result<bool> {
        let url = url::Url::parse(href.trim()).map_err(|err| Error::InvalidLink {
            url: href.to_string(),
            message: err.to_string(),
        })?;
        if !LINK_SCHEMES.contains(&url.scheme()) {
            return Err(Error::UnsupportedLink {
                url: href.to_string(),
            });
        }
        let Some(host) = &self.host else {
            tracing::debug!(%url, "link click without host");
            return Ok(false);
        };
        host.launch_url(url.as_str());
        Ok(true)
    }

    /// Full viewer markup: tutorial message, or the document plus search bar and debug panel.
    pub fn render_html(&self) -> String {
        let mut html = String::new();
        if self.is_empty() {
            if self.settings.view.show_empty_message {
                html.push_str(
                    "<div class=\"tutorial\"><h4>No Markdown Content</h4>\
<p>Add a column or measure containing Markdown text to the \"Markdown Content\" field.</p></div>",
                );
            }
        } else {
            if self.search.open {
                html.push_str(&self.search_bar_html());
            }
            let _ = write!(
                html,
                "<div class=\"markmaid-viewer\" data-color-mode=\"light\" \
style=\"width: {}px; height: {}px; overflow-y: auto\">{}</div>",
                self.viewport.width,
                self.viewport.height,
                self.document.to_html(),
            );
        }
        if self.debug.is_enabled() {
            html.push_str(&self.debug_panel_html());
        }
        html
    }

    fn search_bar_html(&self) -> String {
        let mut html = format!(
            "<div class=\"search-bar\"><input type=\"text\" placeholder=\"Search...\" value=\"{}\">",
            htmlize::escape_attribute(self.search.query.as_str())
        );
        if let Some(status) = self.search.status() {
            let _ = write!(html, "<span class=\"search-status\">{status}</span>");
        }
        html.push_str("</div>");
        html
    }

    fn debug_panel_html(&self) -> String {
        let mut html = String::from("<div class=\"debug-panel\"><div class=\"debug-logs\">");
        if self.debug.entries().len() == 0 {
            html.push_str("<p class=\"debug-empty\">No debug logs yet.</p>");
        }
        for entry in self.debug.entries() {
            let _ = write!(
                html,
                "<div class=\"debug-entry debug-{}\"><span class=\"debug-time\">{}</span> \
<strong>{}</strong><pre>{}</pre></div>",
                entry.kind,
                entry.timestamp,
                htmlize::escape_text(entry.label.as_str()),
                htmlize::escape_text(entry.content.as_str()),
            );
        }
        let raw = if self.content.is_empty() {
            "(No markdown content)"
        } else {
            self.content.as_str()
        };
        let _ = write!(
            html,
            "</div><div class=\"debug-raw\"><pre>{}</pre></div></div>",
            htmlize::escape_text(raw)
        );
        html
    }

    /// Detaches every diagram and stops the debug log.
    pub fn unmount(&mut self) {
        self.document.unmount();
        self.debug.shutdown();
    }
}

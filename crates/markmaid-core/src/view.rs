//! Zoom/pan state for a mounted diagram, plus render suppression.

use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use std::cell::Cell;

pub type Unit = euclid::UnknownUnit;
pub type Point = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

pub fn vector(x: f64, y: f64) -> Vector {
    euclid::vec2(x, y)
}

pub const ZOOM_STEP: f64 = 0.25;
pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f64,
    pub pan: Vector,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vector::zero(),
        }
    }
}

impl ViewTransform {
    pub fn is_zoomed_in(&self) -> bool {
        self.zoom > 1.0
    }

    /// CSS `transform` value for the graphic wrapper.
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.pan.x, self.pan.y, self.zoom
        )
    }

    /// Zoom percentage shown next to the zoom buttons.
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down {
        button: PointerButton,
        position: Point,
    },
    Move {
        position: Point,
    },
    Up,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    /// Positive values scroll down (zoom out), negative values scroll up (zoom in).
    pub delta_y: f64,
    /// Ctrl (or Cmd) held while scrolling.
    pub modifier: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored,
    Handled,
    /// Handled, and the surface's native behavior (page scroll) must be suppressed.
    HandledPreventDefault,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum PanState {
    #[default]
    Idle,
    Panning {
        anchor: Point,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Default,
    Grab,
    Grabbing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewController {
    transform: ViewTransform,
    pan_state: PanState,
}

impl ViewController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn pan_state(&self) -> PanState {
        self.pan_state
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.pan_state, PanState::Panning { .. })
    }

    pub fn cursor(&self) -> Cursor {
        match self.pan_state {
            PanState::Panning { .. } => Cursor::Grabbing,
            PanState::Idle if self.transform.is_zoomed_in() => Cursor::Grab,
            PanState::Idle => Cursor::Default,
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.transform.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.transform.zoom - ZOOM_STEP);
    }

    pub fn reset(&mut self) {
        self.transform = ViewTransform::default();
        self.pan_state = PanState::Idle;
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.transform.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        // Panning is only available while zoomed in.
        if !self.transform.is_zoomed_in() {
            self.transform.pan = Vector::zero();
            self.pan_state = PanState::Idle;
        }
    }

    pub fn on_pointer(&mut self, event: PointerEvent) -> EventOutcome {
        match (self.pan_state, event) {
            (
                PanState::Idle,
                PointerEvent::Down {
                    button: PointerButton::Primary,
                    position,
                },
            ) if self.transform.is_zoomed_in() => {
                self.pan_state = PanState::Panning {
                    anchor: position - self.transform.pan,
                };
                EventOutcome::HandledPreventDefault
            }
            (PanState::Panning { anchor }, PointerEvent::Move { position }) => {
                self.transform.pan = position - anchor;
                EventOutcome::Handled
            }
            (PanState::Panning { .. }, PointerEvent::Up | PointerEvent::Leave) => {
                self.pan_state = PanState::Idle;
                EventOutcome::Handled
            }
            _ => EventOutcome::Ignored,
        }
    }

    pub fn on_wheel(&mut self, event: WheelEvent) -> EventOutcome {
        if !event.modifier || event.delta_y == 0.0 {
            return EventOutcome::Ignored;
        }
        if event.delta_y < 0.0 {
            self.zoom_in();
        } else {
            self.zoom_out();
        }
        EventOutcome::HandledPreventDefault
    }
}

/// Equality key of a diagram render: the source plus the serialized engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub source: String,
    pub config: String,
}

impl RenderKey {
    pub fn new(source: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            config: config.into(),
        }
    }
}

/// Handed out for a render that must run; checked again when the render completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTicket {
    generation: u64,
    key: RenderKey,
}

impl RenderTicket {
    pub fn key(&self) -> &RenderKey {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Suppresses redundant renders and drops superseded results.
#[derive(Debug, Clone, Default)]
pub struct RenderGate {
    last: Option<RenderKey>,
    generation: u64,
    detached: bool,
}

impl RenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_key(&self) -> Option<&RenderKey> {
        self.last.as_ref()
    }

    /// Returns a ticket when `key` differs from the previous request, `None` otherwise.
    pub fn request(&mut self, key: RenderKey) -> Option<RenderTicket> {
        if self.detached || self.last.as_ref() == Some(&key) {
            return None;
        }
        self.generation += 1;
        self.last = Some(key.clone());
        Some(RenderTicket {
            generation: self.generation,
            key,
        })
    }

    /// Whether a completed render may still be applied.
    pub fn accepts(&self, ticket: &RenderTicket) -> bool {
        !self.detached
            && ticket.generation == self.generation
            && self.last.as_ref() == Some(&ticket.key)
    }

    /// Forgets the last key so the next request renders again.
    pub fn invalidate(&mut self) {
        self.last = None;
        self.generation += 1;
    }

    /// Marks the owner as unmounted; every outstanding and future ticket is rejected.
    pub fn detach(&mut self) {
        self.detached = true;
        self.generation += 1;
    }
}

const PRESERVE_LINE_BREAKS_CSS: &str = ".nodeLabel, .edgeLabel, .label, foreignObject div { white-space: pre-line; }";

fn with_max_width(style: Option<&str>) -> String {
    let mut decls: Vec<&str> = style
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .filter(|d| {
            let name = d.split(':').next().unwrap_or_default().trim();
            !name.eq_ignore_ascii_case("max-width")
        })
        .collect();
    decls.push("max-width: 100%");
    let mut out = decls.join("; ");
    out.push(';');
    out
}

/// Constrains a rendered graphic to its container width.
///
/// Only the outermost `<svg>` is touched. With `preserve_line_breaks` a style rule keeping
/// newline characters in labels is injected into it.
pub fn fit_graphic_to_container(svg: &str, preserve_line_breaks: bool) -> String {
    if !svg.contains("<svg") {
        return svg.to_string();
    }

    let seen_root = Cell::new(false);
    let handlers = vec![element!("svg", |el| {
        if seen_root.replace(true) {
            return Ok(());
        }
        let style = with_max_width(el.get_attribute("style").as_deref());
        el.set_attribute("style", &style)?;
        if preserve_line_breaks {
            el.prepend(
                &format!("<style>{PRESERVE_LINE_BREAKS_CSS}</style>"),
                ContentType::Html,
            );
        }
        Ok(())
    })];

    rewrite_str(
        svg,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::new()
        },
    )
    .unwrap_or_else(|err| {
        tracing::warn!(%err, "failed to rewrite diagram graphic; leaving it untouched");
        svg.to_string()
    })
}

#![forbid(unsafe_code)]

//! Headless engines behind a Markdown + Mermaid viewer.
//!
//! Nothing in this crate depends on a UI toolkit:
//! - [`highlight`] and [`navigator`] implement in-document search over a rich-text run model
//! - [`normalize`] prepares diagram code for the diagram engine
//! - [`view`] holds zoom/pan state and render suppression for mounted diagrams
//! - [`sanitize`] cleans rendered HTML
//! - [`content`], [`config`] and [`debug_log`] cover host data, settings and diagnostics

pub mod config;
pub mod content;
pub mod debug_log;
pub mod error;
pub mod highlight;
pub mod navigator;
pub mod normalize;
pub mod sanitize;
pub mod view;

pub use config::{EngineConfig, MarkmaidSettings, MermaidSettings, SecurityLevel, ViewSettings};
pub use content::{DataView, extract_content};
pub use debug_log::{DebugEntry, DebugKind, DebugLog};
pub use error::{Error, Result};
pub use highlight::{Mark, MatchRef, RichText, Run};
pub use navigator::{MatchNavigator, MatchSurface, ScrollBehavior, ScrollRequest};
pub use normalize::{NormalizeOptions, normalize};
pub use sanitize::{SanitizeRules, sanitize_html};
pub use view::{RenderGate, RenderKey, RenderTicket, ViewController, ViewTransform};

//! Typed viewer settings.
//!
//! Settings arrive from the host as (possibly partial) JSON objects. Every field has a
//! default, so `{}` is a valid settings document.

use crate::normalize::NormalizeOptions;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkmaidSettings {
    pub view: ViewSettings,
    pub mermaid: MermaidSettings,
}

impl MarkmaidSettings {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidSettingsJson {
            message: e.to_string(),
        })
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::InvalidSettingsJson {
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewSettings {
    pub show_empty_message: bool,
    pub show_debug_panel: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            show_empty_message: true,
            show_debug_panel: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SecurityLevel {
    #[default]
    Loose,
    Strict,
    Sandbox,
}

impl SecurityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loose => "loose",
            Self::Strict => "strict",
            Self::Sandbox => "sandbox",
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loose" => Ok(Self::Loose),
            "strict" => Ok(Self::Strict),
            "sandbox" => Ok(Self::Sandbox),
            _ => Err(Error::UnknownSecurityLevel {
                value: s.to_string(),
            }),
        }
    }
}

impl Serialize for SecurityLevel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SecurityLevel {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MermaidSettings {
    pub html_labels: bool,
    pub markdown_auto_wrap: bool,
    pub security_level: SecurityLevel,
    pub max_edges: u32,
    pub convert_br_to_newline: bool,
    pub auto_backtick_labels: bool,
    #[serde(rename = "preserveLineBreaksCSS")]
    pub preserve_line_breaks_css: bool,
}

impl Default for MermaidSettings {
    fn default() -> Self {
        Self {
            html_labels: true,
            markdown_auto_wrap: true,
            security_level: SecurityLevel::Loose,
            max_edges: 30_000,
            convert_br_to_newline: true,
            auto_backtick_labels: true,
            preserve_line_breaks_css: true,
        }
    }
}

impl MermaidSettings {
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            convert_br_to_newline: self.convert_br_to_newline,
            auto_backtick_labels: self.auto_backtick_labels,
        }
    }

    /// The configuration object handed to the diagram engine.
    ///
    /// Keys are inserted in a fixed order so the compact serialization is stable and can be
    /// used as half of a render cache key.
    pub fn engine_config(&self) -> EngineConfig {
        let mut value = json!({
            "startOnLoad": false,
            "securityLevel": self.security_level.as_str(),
            "maxEdges": self.max_edges,
            "htmlLabels": self.html_labels,
            "markdownAutoWrap": self.markdown_auto_wrap,
            "flowchart": { "htmlLabels": self.html_labels },
        });
        if let Value::Object(map) = &mut value {
            map.insert(
                "secure".to_string(),
                Value::Array(
                    ["secure", "securityLevel", "startOnLoad", "maxTextSize"]
                        .into_iter()
                        .map(|s| Value::String(s.to_string()))
                        .collect(),
                ),
            );
        }
        EngineConfig(value)
    }
}

/// JSON configuration passed to a diagram engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig(Value);

impl Default for EngineConfig {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl EngineConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.lookup(dotted_path)?.as_str()
    }

    pub fn get_bool(&self, dotted_path: &str) -> Option<bool> {
        self.lookup(dotted_path)?.as_bool()
    }

    pub fn get_u64(&self, dotted_path: &str) -> Option<u64> {
        self.lookup(dotted_path)?.as_u64()
    }

    fn lookup(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    /// Compact, deterministic serialization.
    pub fn serialized(&self) -> String {
        self.0.to_string()
    }
}

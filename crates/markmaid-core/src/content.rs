//! Host data extraction.
//!
//! The host hands the viewer a small tabular payload. Either a single scalar (a measure) or a
//! single column (one string per row) carries the Markdown text.

use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// Separator placed between rows when a column of documents is concatenated.
pub const ROW_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DataView {
    pub single: Option<SingleValue>,
    pub column: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SingleValue {
    pub value: Value,
}

impl DataView {
    pub fn single(value: impl Into<Value>) -> Self {
        Self {
            single: Some(SingleValue {
                value: value.into(),
            }),
            column: None,
        }
    }

    pub fn column<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            single: None,
            column: Some(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidDataViewJson {
            message: e.to_string(),
        })
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        // Nested values are kept as JSON text.
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Returns the Markdown text carried by `data_view`, or `""` when there is none.
pub fn extract_content(data_view: Option<&DataView>) -> String {
    let Some(dv) = data_view else {
        return String::new();
    };

    if let Some(single) = &dv.single {
        if let Some(text) = scalar_text(&single.value) {
            return text;
        }
    }

    let Some(rows) = &dv.column else {
        return String::new();
    };

    rows.iter()
        .filter_map(scalar_text)
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(ROW_SEPARATOR)
}

use crate::*;
use std::cell::RefCell;

mod viewer;

/// Renders every diagram to a tiny SVG echoing its source, and records each call.
#[derive(Default)]
struct EchoEngine {
    calls: RefCell<Vec<(String, String)>>,
    fail_on: Option<&'static str>,
}

impl EchoEngine {
    fn failing_on(needle: &'static str) -> Self {
        Self {
            fail_on: Some(needle),
            ..Self::default()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn sources(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(_, s)| s.clone()).collect()
    }
}

impl DiagramEngine for EchoEngine {
    async fn render(
        &self,
        id: &str,
        source: &str,
        config: &EngineConfig,
    ) -> std::result::Result<String, DiagramError> {
        self.calls
            .borrow_mut()
            .push((id.to_string(), source.to_string()));
        if self.fail_on.is_some_and(|needle| source.contains(needle)) {
            return Err(DiagramError::new(format!("cannot parse {id}")));
        }
        Ok(format!(
            "<svg id=\"{id}\" style=\"max-width: 320px;\" data-security=\"{}\"><g class=\"node\"><text>{}</text></g></svg>",
            config.get_str("securityLevel").unwrap_or_default(),
            htmlize::escape_text(source),
        ))
    }
}

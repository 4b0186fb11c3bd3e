//! Rich-text run model and in-document text highlighting.
//!
//! A rendered document is flattened into an ordered list of runs. `Text` runs are the
//! searchable text nodes, `Mark` runs are highlighted occurrences of a query, and `Anchor`
//! runs are opaque, non-text items owned by the adapter that renders the runs (markup,
//! embedded graphics, ...). Anchors separate text nodes: a match never spans one.
//!
//! Invariant: the concatenated text of all `Text` and `Mark` runs between two anchors is
//! unchanged by [`RichText::highlight`] and [`RichText::clear_highlights`].

use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    /// 1-based position in document order.
    pub index: usize,
    pub text: String,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run<A> {
    Text(String),
    Mark(Mark),
    Anchor(A),
}

/// Location of a mark run inside a [`RichText`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchRef {
    pub index: usize,
    pub run: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichText<A> {
    runs: Vec<Run<A>>,
}

impl<A> Default for RichText<A> {
    fn default() -> Self {
        Self { runs: Vec::new() }
    }
}

/// Builds the case-insensitive literal pattern for `query`.
///
/// Returns `None` for empty or whitespace-only queries.
pub fn query_pattern(query: &str) -> Option<Regex> {
    if query.trim().is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Splits `text` into alternating `(segment, is_match)` pieces.
fn split_matches<'t>(re: &Regex, text: &'t str) -> Vec<(&'t str, bool)> {
    let mut out = Vec::new();
    let mut last = 0usize;
    for m in re.find_iter(text) {
        if m.start() == m.end() {
            continue;
        }
        if m.start() > last {
            out.push((&text[last..m.start()], false));
        }
        out.push((m.as_str(), true));
        last = m.end();
    }
    if last < text.len() {
        out.push((&text[last..], false));
    }
    out
}

impl<A> RichText<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> &[Run<A>] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Appends text, merging into a trailing text run.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Run::Text(last)) = self.runs.last_mut() {
            last.push_str(text);
            return;
        }
        self.runs.push(Run::Text(text.to_string()));
    }

    pub fn push_anchor(&mut self, anchor: A) {
        self.runs.push(Run::Anchor(anchor));
    }

    pub fn anchors(&self) -> impl Iterator<Item = &A> {
        self.runs.iter().filter_map(|r| match r {
            Run::Anchor(a) => Some(a),
            _ => None,
        })
    }

    pub fn anchors_mut(&mut self) -> impl Iterator<Item = &mut A> {
        self.runs.iter_mut().filter_map(|r| match r {
            Run::Anchor(a) => Some(a),
            _ => None,
        })
    }

    /// Text content of every text-bearing run, anchors contributing nothing.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            match run {
                Run::Text(t) => out.push_str(t),
                Run::Mark(m) => out.push_str(&m.text),
                Run::Anchor(_) => {}
            }
        }
        out
    }

    /// Text content split at anchors (one entry per text node group).
    pub fn text_nodes(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur: Option<String> = None;
        for run in &self.runs {
            match run {
                Run::Text(t) => cur.get_or_insert_with(String::new).push_str(t),
                Run::Mark(m) => cur.get_or_insert_with(String::new).push_str(&m.text),
                Run::Anchor(_) => out.extend(cur.take()),
            }
        }
        out.extend(cur);
        out
    }

    pub fn marks(&self) -> impl Iterator<Item = &Mark> {
        self.runs.iter().filter_map(|r| match r {
            Run::Mark(m) => Some(m),
            _ => None,
        })
    }

    pub fn mark_count(&self) -> usize {
        self.marks().count()
    }

    /// Wraps every case-insensitive, literal occurrence of `query` in a mark.
    ///
    /// Existing highlights are cleared first, so calling this repeatedly never nests marks.
    /// Empty or whitespace-only queries return an empty set and leave the runs untouched.
    pub fn highlight(&mut self, query: &str) -> Vec<MatchRef> {
        let Some(re) = query_pattern(query) else {
            return Vec::new();
        };
        self.clear_highlights();

        let old = std::mem::take(&mut self.runs);
        let mut refs = Vec::new();
        for run in old {
            let Run::Text(text) = run else {
                self.runs.push(run);
                continue;
            };
            if !re.is_match(&text) {
                self.runs.push(Run::Text(text));
                continue;
            }
            for (segment, is_match) in split_matches(&re, &text) {
                if is_match {
                    let index = refs.len() + 1;
                    refs.push(MatchRef {
                        index,
                        run: self.runs.len(),
                    });
                    self.runs.push(Run::Mark(Mark {
                        index,
                        text: segment.to_string(),
                        current: false,
                    }));
                } else {
                    self.runs.push(Run::Text(segment.to_string()));
                }
            }
        }
        refs
    }

    /// Replaces every mark with its plain text and merges adjacent text runs.
    ///
    /// A no-op on runs without marks.
    pub fn clear_highlights(&mut self) {
        if !self.runs.iter().any(|r| matches!(r, Run::Mark(_))) {
            return;
        }
        let old = std::mem::take(&mut self.runs);
        for run in old {
            match run {
                Run::Mark(m) => self.push_text(&m.text),
                Run::Text(t) => self.push_text(&t),
                Run::Anchor(a) => self.runs.push(Run::Anchor(a)),
            }
        }
    }

    fn mark_mut(&mut self, index: usize) -> Option<&mut Mark> {
        self.runs.iter_mut().find_map(|r| match r {
            Run::Mark(m) if m.index == index => Some(m),
            _ => None,
        })
    }

    /// Sets or clears the "current" flag of the mark with 1-based `index`.
    pub fn set_current(&mut self, index: usize, current: bool) -> bool {
        match self.mark_mut(index) {
            Some(m) => {
                m.current = current;
                true
            }
            None => false,
        }
    }

    pub fn current_mark(&self) -> Option<&Mark> {
        self.marks().find(|m| m.current)
    }
}

//! Bounded, de-duplicating diagnostic log with subscribers.
//!
//! Backs the viewer's debug panel, which is useful where browser developer tools are not
//! available. Entries are only recorded while the service is enabled.

use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

pub const MAX_ENTRIES: usize = 100;
pub const MAX_CONTENT_CHARS: usize = 5000;
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(2);

const TRUNCATION_SUFFIX: &str = "\n... (truncated)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugKind {
    Info,
    Code,
    Error,
}

impl DebugKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Code => "code",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for DebugKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEntry {
    /// Local wall-clock time, `HH:MM:SS`.
    pub timestamp: String,
    pub kind: DebugKind,
    pub label: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&[DebugEntry])>;

pub struct DebugLog {
    enabled: bool,
    entries: VecDeque<DebugEntry>,
    recent_keys: FxHashSet<String>,
    recent_until: Option<Instant>,
    dedup_window: Duration,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for DebugLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugLog")
            .field("enabled", &self.enabled)
            .field("entries", &self.entries.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::with_dedup_window(DEFAULT_DEDUP_WINDOW)
    }
}

fn truncate_content(content: &str) -> String {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((cut, _)) => format!("{}{TRUNCATION_SUFFIX}", &content[..cut]),
        None => content.to_string(),
    }
}

impl DebugLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dedup_window(dedup_window: Duration) -> Self {
        Self {
            enabled: false,
            entries: VecDeque::with_capacity(MAX_ENTRIES),
            recent_keys: FxHashSet::default(),
            recent_until: None,
            dedup_window,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enabling starts from an empty history.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.entries.clear();
            self.recent_keys.clear();
            self.recent_until = None;
        }
        self.enabled = enabled;
    }

    pub fn entries(&self) -> impl ExactSizeIterator<Item = &DebugEntry> {
        self.entries.iter()
    }

    pub fn snapshot(&self) -> Vec<DebugEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn log(&mut self, kind: DebugKind, label: &str, content: &str) -> bool {
        self.log_at(Instant::now(), kind, label, content)
    }

    /// Records an entry observed at `now`; returns whether it was accepted.
    pub fn log_at(&mut self, now: Instant, kind: DebugKind, label: &str, content: &str) -> bool {
        if !self.enabled {
            return false;
        }

        if self.recent_until.is_some_and(|until| now >= until) {
            self.recent_keys.clear();
        }
        let content = truncate_content(content);
        if !self.recent_keys.insert(format!("{label}:{content}")) {
            return false;
        }
        self.recent_until = Some(now + self.dedup_window);

        tracing::debug!(kind = %kind, label, "debug log entry");

        if self.entries.len() == MAX_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(DebugEntry {
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            kind,
            label: label.to_string(),
            content,
        });
        self.publish();
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.publish();
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&[DebugEntry]) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Drops every listener and entry; the service stays usable but disabled.
    pub fn shutdown(&mut self) {
        self.listeners.clear();
        self.entries.clear();
        self.recent_keys.clear();
        self.recent_until = None;
        self.enabled = false;
    }

    fn publish(&mut self) {
        let snapshot: Vec<DebugEntry> = self.entries.iter().cloned().collect();
        for (_, listener) in &mut self.listeners {
            listener(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn enabled() -> DebugLog {
        let mut log = DebugLog::new();
        log.set_enabled(true);
        log
    }

    #[test]
    fn disabled_log_records_nothing() {
        let mut log = DebugLog::new();
        assert!(!log.log(DebugKind::Info, "a", "b"));
        assert_eq!(log.entries().len(), 0);
    }

    #[test]
    fn ring_buffer_keeps_the_newest_entries() {
        let mut log = enabled();
        for i in 0..(MAX_ENTRIES + 5) {
            log.log(DebugKind::Info, "n", &i.to_string());
        }
        let snap = log.snapshot();
        assert_eq!(snap.len(), MAX_ENTRIES);
        assert_eq!(snap[0].content, "5");
        assert_eq!(snap.last().unwrap().content, (MAX_ENTRIES + 4).to_string());
    }

    #[test]
    fn repeated_entries_inside_the_window_are_skipped() {
        let mut log = enabled();
        let t0 = Instant::now();
        assert!(log.log_at(t0, DebugKind::Code, "mermaid", "graph TD"));
        assert!(!log.log_at(t0 + Duration::from_millis(500), DebugKind::Code, "mermaid", "graph TD"));
        assert!(log.log_at(t0 + Duration::from_millis(600), DebugKind::Code, "other", "graph TD"));
        // Window restarted at +600ms, so it ends at +2600ms.
        assert!(!log.log_at(t0 + Duration::from_millis(2500), DebugKind::Code, "mermaid", "graph TD"));
        assert!(log.log_at(t0 + Duration::from_millis(2700), DebugKind::Code, "mermaid", "graph TD"));
        assert_eq!(log.entries().len(), 3);
    }

    #[test]
    fn long_content_is_truncated() {
        let mut log = enabled();
        let long = "x".repeat(MAX_CONTENT_CHARS + 10);
        log.log(DebugKind::Info, "big", &long);
        let entry = &log.snapshot()[0];
        assert!(entry.content.ends_with(TRUNCATION_SUFFIX));
        assert_eq!(
            entry.content.chars().count(),
            MAX_CONTENT_CHARS + TRUNCATION_SUFFIX.chars().count()
        );
    }

    #[test]
    fn dedup_compares_the_recorded_content() {
        let mut log = enabled();
        let t0 = Instant::now();
        let base = "y".repeat(MAX_CONTENT_CHARS);
        assert!(log.log_at(t0, DebugKind::Code, "src", &format!("{base}tail one")));
        assert!(!log.log_at(t0, DebugKind::Code, "src", &format!("{base}tail two")));
        assert!(log.log_at(t0, DebugKind::Code, "src", "short"));
        assert_eq!(log.recent_keys.len(), 2);
        let longest = "src:".len() + MAX_CONTENT_CHARS + TRUNCATION_SUFFIX.chars().count();
        assert!(log.recent_keys.iter().all(|k| k.chars().count() <= longest));
    }

    #[test]
    fn enabling_clears_previous_history() {
        let mut log = enabled();
        log.log(DebugKind::Info, "a", "1");
        log.set_enabled(false);
        log.set_enabled(true);
        assert_eq!(log.entries().len(), 0);
        assert!(log.log(DebugKind::Info, "a", "1"));
    }

    #[test]
    fn subscribers_receive_snapshots_until_unsubscribed() {
        let mut log = enabled();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = log.subscribe(move |entries| sink.borrow_mut().push(entries.len()));

        log.log(DebugKind::Info, "a", "1");
        log.log(DebugKind::Error, "b", "2");
        log.clear();
        assert_eq!(*seen.borrow(), vec![1, 2, 0]);

        assert!(log.unsubscribe(id));
        assert!(!log.unsubscribe(id));
        log.log(DebugKind::Info, "c", "3");
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn entries_carry_a_wall_clock_timestamp() {
        let mut log = enabled();
        log.log(DebugKind::Info, "t", "x");
        let ts = &log.snapshot()[0].timestamp;
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.matches(':').count(), 2);
    }
}

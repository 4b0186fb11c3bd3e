//! Cursor over the highlighted matches of a search.

use crate::highlight::RichText;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrollBehavior {
    #[default]
    Instant,
    Smooth,
}

/// A request to bring a match into view, vertically centered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub index: usize,
    pub behavior: ScrollBehavior,
}

/// Something that can be highlighted and scrolled by a [`MatchNavigator`].
pub trait MatchSurface {
    fn clear_highlights(&mut self);

    /// Highlights `query` and returns the number of matches.
    fn highlight(&mut self, query: &str) -> usize;

    /// Toggles the "current" flag of the 1-based match `index`.
    fn set_current(&mut self, index: usize, current: bool);

    fn scroll_into_view(&mut self, request: ScrollRequest) {
        let _ = request;
    }
}

impl<A> MatchSurface for RichText<A> {
    fn clear_highlights(&mut self) {
        RichText::clear_highlights(self);
    }

    fn highlight(&mut self, query: &str) -> usize {
        RichText::highlight(self, query).len()
    }

    fn set_current(&mut self, index: usize, current: bool) {
        RichText::set_current(self, index, current);
    }
}

/// 1-based cursor; `0` means "no current match".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchNavigator {
    current: usize,
    count: usize,
}

impl MatchNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn search<S: MatchSurface + ?Sized>(&mut self, surface: &mut S, query: &str) -> usize {
        surface.clear_highlights();
        self.count = if query.trim().is_empty() {
            0
        } else {
            surface.highlight(query)
        };
        self.current = 0;
        if self.count > 0 {
            self.focus(surface, 1, ScrollBehavior::Instant);
        }
        self.count
    }

    pub fn next<S: MatchSurface + ?Sized>(&mut self, surface: &mut S) {
        if self.count == 0 {
            return;
        }
        let target = if self.current >= self.count {
            1
        } else {
            self.current + 1
        };
        self.focus(surface, target, ScrollBehavior::Smooth);
    }

    pub fn prev<S: MatchSurface + ?Sized>(&mut self, surface: &mut S) {
        if self.count == 0 {
            return;
        }
        let target = if self.current <= 1 {
            self.count
        } else {
            self.current - 1
        };
        self.focus(surface, target, ScrollBehavior::Smooth);
    }

    pub fn close<S: MatchSurface + ?Sized>(&mut self, surface: &mut S) {
        surface.clear_highlights();
        self.current = 0;
        self.count = 0;
    }

    fn focus<S: MatchSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        index: usize,
        behavior: ScrollBehavior,
    ) {
        if self.current > 0 {
            surface.set_current(self.current, false);
        }
        self.current = index;
        surface.set_current(index, true);
        surface.scroll_into_view(ScrollRequest { index, behavior });
    }
}

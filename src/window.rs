//! Windowing over a chat's ordered message list.
//!
//! The chat screen never materializes the whole conversation. It shows a
//! contiguous slice, the window, that starts as the most recent page and
//! grows backward one page at a time as the user scrolls up.

use std::{num::NonZeroUsize, ops::Range};

/// Contiguous slice `offset..offset + len` of a chat's messages, oldest first.
///
/// Always holds `offset + len <= total`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageWindow {
    total: usize,
    offset: usize,
    length: usize,
}

/// How the window changed after the store's message count moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TailChange {
    /// The count didn't change.
    Unchanged,
    /// This many rows were appended at the end of the window.
    Appended(usize),
    /// This many rows no longer fit and were dropped from the window.
    Truncated(usize),
}

impl MessageWindow {
    /// Window over the most recent `page_size` messages out of `total`.
    pub fn new(total: usize, page_size: NonZeroUsize) -> Self {
        let length = total.min(page_size.get());

        Self {
            total,
            offset: total - length,
            length,
        }
    }

    /// Grow the window backward by at most one page.
    ///
    /// Returns the new window and how many rows were added at its front.
    /// Once `offset` is zero this is a no-op returning `0`.
    #[must_use]
    pub fn expand_backward(self, page_size: NonZeroUsize) -> (Self, usize) {
        let delta = page_size.get().min(self.offset);

        let window = Self {
            total: self.total,
            offset: self.offset - delta,
            length: self.length + delta,
        };

        (window, delta)
    }

    /// Follow a new message count for the backing list.
    ///
    /// Messages arriving at the tail are always brought into the window, so a
    /// grown list grows the window by the same amount. A shrunk list keeps the
    /// window on the most recent messages: the offset moves back by the number
    /// of removed messages and the length only shrinks once the offset hits zero.
    #[must_use]
    pub fn sync_total(self, total: usize) -> (Self, TailChange) {
        match total.cmp(&self.total) {
            std::cmp::Ordering::Equal => (self, TailChange::Unchanged),
            std::cmp::Ordering::Greater => {
                let grown = total - self.total;
                let window = Self {
                    total,
                    offset: self.offset,
                    length: self.length + grown,
                };

                (window, TailChange::Appended(grown))
            }
            std::cmp::Ordering::Less => {
                let length = self.length.min(total);
                let offset = total - length;
                let window = Self {
                    total,
                    offset,
                    length,
                };

                (window, TailChange::Truncated(self.length - length))
            }
        }
    }

    /// Number of messages in the backing list when the window was last synced.
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Position of the first windowed message in the backing list.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Number of windowed messages.
    pub const fn len(&self) -> usize {
        self.length
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whether there is nothing older left to page in.
    pub const fn is_exhausted(&self) -> bool {
        self.offset == 0
    }

    /// Positions in the backing list covered by the window.
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.length
    }

    /// Backing list position of the window's `row`-th message.
    pub const fn position_of(&self, row: usize) -> Option<usize> {
        if row < self.length {
            Some(self.offset + row)
        } else {
            None
        }
    }
}

/// Latch guarding against overlapping backward expansions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadingState {
    #[default]
    Idle,
    Expanding,
}

impl LoadingState {
    /// Take the latch. Returns `false` if an expansion is already running.
    pub fn try_begin(&mut self) -> bool {
        match self {
            Self::Idle => {
                *self = Self::Expanding;
                true
            }
            Self::Expanding => false,
        }
    }

    /// Release the latch, whatever the expansion did.
    pub fn finish(&mut self) {
        *self = Self::Idle;
    }

    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Expanding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn starts_at_most_recent_page() {
        for total in [0, 1, 5, 19, 20, 21, 50, 1000] {
            for size in [1, 7, 20, 64] {
                let window = MessageWindow::new(total, page(size));
                assert_eq!(window.len(), total.min(size));
                assert_eq!(window.offset() + window.len(), total);
            }
        }
    }

    #[test]
    fn pages_backward_until_exhausted() {
        let size = page(20);
        let window = MessageWindow::new(50, size);
        assert_eq!((window.offset(), window.len()), (30, 20));

        let (window, added) = window.expand_backward(size);
        assert_eq!((window.offset(), window.len(), added), (10, 40, 20));

        let (window, added) = window.expand_backward(size);
        assert_eq!((window.offset(), window.len(), added), (0, 50, 10));
        assert!(window.is_exhausted());

        let (again, added) = window.expand_backward(size);
        assert_eq!(again, window);
        assert_eq!(added, 0);
    }

    #[test]
    fn short_list_never_expands() {
        let size = page(20);
        let window = MessageWindow::new(5, size);
        assert_eq!((window.offset(), window.len()), (0, 5));

        let (expanded, added) = window.expand_backward(size);
        assert_eq!(expanded, window);
        assert_eq!(added, 0);
    }

    #[test]
    fn expansion_is_monotonic_and_gapless() {
        for size in [1, 3, 20] {
            let size = page(size);
            let mut window = MessageWindow::new(97, size);

            loop {
                assert_eq!(window.offset() + window.len(), window.total());

                let (next, added) = window.expand_backward(size);
                assert!(next.offset() <= window.offset());
                assert!(next.len() >= window.len());
                assert_eq!(added, window.offset() - next.offset());
                assert_eq!(added, next.len() - window.len());

                if added == 0 {
                    break;
                }
                window = next;
            }

            assert!(window.is_exhausted());
            assert_eq!(window.len(), 97);
        }
    }

    #[test]
    fn tail_growth_extends_window() {
        let size = page(20);
        let (window, _) = MessageWindow::new(50, size).expand_backward(size);

        let (grown, change) = window.sync_total(53);
        assert_eq!(change, TailChange::Appended(3));
        assert_eq!((grown.offset(), grown.len(), grown.total()), (10, 43, 53));

        let (same, change) = grown.sync_total(53);
        assert_eq!(change, TailChange::Unchanged);
        assert_eq!(same, grown);
    }

    #[test]
    fn shrinking_keeps_the_tail() {
        let size = page(20);
        let window = MessageWindow::new(50, size);

        // Older messages went away: same number of rows, still ending at the tail.
        let (shifted, change) = window.sync_total(45);
        assert_eq!(change, TailChange::Truncated(0));
        assert_eq!((shifted.offset(), shifted.len()), (25, 20));

        let (shrunk, change) = shifted.sync_total(12);
        assert_eq!(change, TailChange::Truncated(8));
        assert_eq!((shrunk.offset(), shrunk.len()), (0, 12));

        let (emptied, change) = shrunk.sync_total(0);
        assert_eq!(change, TailChange::Truncated(12));
        assert!(emptied.is_empty());
        assert!(emptied.is_exhausted());
    }

    #[test]
    fn maps_rows_to_positions() {
        let window = MessageWindow::new(50, page(20));
        assert_eq!(window.range(), 30..50);
        assert_eq!(window.position_of(0), Some(30));
        assert_eq!(window.position_of(19), Some(49));
        assert_eq!(window.position_of(20), None);
    }

    #[test]
    fn latch_rejects_reentry() {
        let mut state = LoadingState::default();
        assert!(!state.is_loading());

        assert!(state.try_begin());
        assert!(state.is_loading());
        assert!(!state.try_begin());

        state.finish();
        assert!(!state.is_loading());
        assert!(state.try_begin());
    }
}

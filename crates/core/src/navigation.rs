//! Slide-index state machine.
//!
//! Owns the current position and the notes-panel flag. Every transition keeps
//! `1 <= current <= total`; requests that would break this are ignored and
//! reported back as [`Transition::Ignored`] rather than as errors.

use crate::types::NavigationState;

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The position changed (or was re-selected) to `to`.
    Moved { from: usize, to: usize },
    /// The request was out of range and left the state untouched.
    Ignored,
}

impl Transition {
    pub fn is_moved(&self) -> bool {
        matches!(self, Transition::Moved { .. })
    }
}

/// Navigation state machine over `1..=total_slides`.
#[derive(Debug, Clone)]
pub struct Navigator {
    state: NavigationState,
}

impl Navigator {
    /// Start at slide 1 with notes hidden. `total_slides` is raised to 1 if zero.
    pub fn new(total_slides: usize) -> Self {
        Self {
            state: NavigationState {
                current_index: 1,
                total_slides: total_slides.max(1),
                notes_visible: false,
            },
        }
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn current(&self) -> usize {
        self.state.current_index
    }

    pub fn total(&self) -> usize {
        self.state.total_slides
    }

    pub fn notes_visible(&self) -> bool {
        self.state.notes_visible
    }

    pub fn is_first(&self) -> bool {
        self.state.current_index == 1
    }

    pub fn is_last(&self) -> bool {
        self.state.current_index == self.state.total_slides
    }

    /// Whether `index` names an existing slide.
    pub fn in_range(&self, index: usize) -> bool {
        (1..=self.state.total_slides).contains(&index)
    }

    /// Move to slide `index` if it exists.
    pub fn go_to(&mut self, index: usize) -> Transition {
        if !self.in_range(index) {
            log::debug!(
                "Ignoring navigation to slide {} (deck has {})",
                index,
                self.state.total_slides
            );
            return Transition::Ignored;
        }

        let from = self.state.current_index;
        self.state.current_index = index;
        Transition::Moved { from, to: index }
    }

    /// Advance one slide unless already on the last.
    pub fn next(&mut self) -> Transition {
        if self.is_last() {
            return Transition::Ignored;
        }
        self.go_to(self.state.current_index + 1)
    }

    /// Go back one slide unless already on the first.
    pub fn prev(&mut self) -> Transition {
        if self.is_first() {
            return Transition::Ignored;
        }
        self.go_to(self.state.current_index - 1)
    }

    /// Flip notes visibility, returning the new value.
    pub fn toggle_notes(&mut self) -> bool {
        self.state.notes_visible = !self.state.notes_visible;
        self.state.notes_visible
    }
}

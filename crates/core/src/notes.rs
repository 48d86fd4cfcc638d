//! Speaker notes cache, keyed by slide position.

use crate::repository::SlideRepository;
use std::collections::HashMap;

/// Shown in the notes panel for slides without notes.
pub const NOTES_PLACEHOLDER: &str = "<p>No speaker notes for this slide.</p>";

/// Notes markup for every slide, captured once at load time.
#[derive(Debug, Clone, Default)]
pub struct NotesCache {
    entries: HashMap<usize, String>,
}

impl NotesCache {
    /// Populate the cache from a repository in position order.
    pub fn build<R: SlideRepository + ?Sized>(repository: &R) -> Self {
        let mut entries = HashMap::with_capacity(repository.len());

        for slide in repository.slides() {
            let notes = if slide.has_notes() {
                slide.notes_html.clone()
            } else {
                NOTES_PLACEHOLDER.to_string()
            };
            entries.insert(slide.index, notes);
        }

        log::debug!(
            "Cached notes for {} slides ({} with speaker notes)",
            entries.len(),
            entries.values().filter(|n| n.as_str() != NOTES_PLACEHOLDER).count()
        );

        Self { entries }
    }

    /// Notes for `index`, or the placeholder when none were cached.
    pub fn get(&self, index: usize) -> &str {
        self.entries
            .get(&index)
            .map(String::as_str)
            .unwrap_or(NOTES_PLACEHOLDER)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

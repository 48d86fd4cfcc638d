//! Read-only access to slides by position.

use crate::types::{Deck, SlideRecord};

/// Query-by-position access to an ordered slide sequence.
///
/// Positions are 1-based and dense. Implementations are read-only after load.
pub trait SlideRepository {
    /// Number of slides.
    fn len(&self) -> usize;

    /// Look up the slide at 1-based position `index`.
    fn find_slide_by_index(&self, index: usize) -> Option<&SlideRecord>;

    /// Document title, if any.
    fn title(&self) -> Option<&str> {
        None
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slides in position order.
    fn slides(&self) -> Box<dyn Iterator<Item = &SlideRecord> + '_> {
        Box::new((1..=self.len()).filter_map(move |i| self.find_slide_by_index(i)))
    }
}

impl SlideRepository for Deck {
    fn len(&self) -> usize {
        self.slides.len()
    }

    fn find_slide_by_index(&self, index: usize) -> Option<&SlideRecord> {
        index.checked_sub(1).and_then(|i| self.slides.get(i))
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn slides(&self) -> Box<dyn Iterator<Item = &SlideRecord> + '_> {
        Box::new(self.slides.iter())
    }
}

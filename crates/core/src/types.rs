//! Domain types for a loaded slide deck and its exported snapshot.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One slide of a deck, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// 1-based slide position.
    pub index: usize,

    /// Heading text; empty when the slide has none.
    pub title: String,

    /// Body text lines in document order.
    pub content_lines: Vec<String>,

    /// Speaker notes markup, possibly empty.
    pub notes_html: String,
}

impl SlideRecord {
    /// Create an empty slide at the given position.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            title: String::new(),
            content_lines: Vec::new(),
            notes_html: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.content_lines.push(line.into());
        self
    }

    pub fn with_notes(mut self, notes_html: impl Into<String>) -> Self {
        self.notes_html = notes_html.into();
        self
    }

    /// Add a body line.
    pub fn add_line(&mut self, line: impl Into<String>) {
        self.content_lines.push(line.into());
    }

    /// Whether this slide carries any speaker notes.
    pub fn has_notes(&self) -> bool {
        !self.notes_html.trim().is_empty()
    }
}

/// An ordered, dense sequence of slides plus the document title.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deck {
    /// Document title, if the source declared one.
    pub title: Option<String>,

    /// Slides in presentation order; `slides[i].index == i + 1`.
    pub slides: Vec<SlideRecord>,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Append a slide, renumbering it to the next dense position.
    pub fn add_slide(&mut self, mut slide: SlideRecord) {
        slide.index = self.slides.len() + 1;
        self.slides.push(slide);
    }

    pub fn with_slide(mut self, slide: SlideRecord) -> Self {
        self.add_slide(slide);
        self
    }
}

/// The source format of a deck file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeckFormat {
    /// HTML slide document.
    Html,
    /// Modern PPTX (Office Open XML).
    Pptx,
}

impl DeckFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "html" | "htm" | "xhtml" => Some(Self::Html),
            "pptx" => Some(Self::Pptx),
            _ => None,
        }
    }

    /// Detect format from the first bytes of the file.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'<') => Some(Self::Html),
            _ => None,
        }
    }

    /// Detect format from content, falling back to the extension of `filename`.
    pub fn detect(bytes: &[u8], filename: &str) -> Result<Self> {
        Self::from_magic(bytes)
            .or_else(|| {
                std::path::Path::new(filename)
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(Self::from_extension)
            })
            .ok_or_else(|| Error::UnsupportedFormat(filename.to_string()))
    }
}

/// Navigation position and notes-panel visibility.
///
/// `1 <= current_index <= total_slides` holds for every value handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub current_index: usize,
    pub total_slides: usize,
    pub notes_visible: bool,
}

/// A point-in-time, serializable copy of the whole deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub title: String,

    #[serde(rename = "date")]
    pub generated_at: DateTime<Utc>,

    pub total_slides: usize,

    pub current_slide: usize,

    pub slides: Vec<ExportedSlide>,

    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// One slide inside an [`ExportSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSlide {
    pub slide_number: usize,
    pub title: String,
    pub content: Vec<String>,
    /// Notes as plain text, markup removed.
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DeckFormat::from_extension("HTML"), Some(DeckFormat::Html));
        assert_eq!(DeckFormat::from_extension("htm"), Some(DeckFormat::Html));
        assert_eq!(DeckFormat::from_extension("pptx"), Some(DeckFormat::Pptx));
        assert_eq!(DeckFormat::from_extension("ppt"), None);
    }

    #[test]
    fn test_format_detect() {
        assert_eq!(DeckFormat::detect(b"PK\x03\x04rest", "talk.html").unwrap(), DeckFormat::Pptx);
        assert_eq!(DeckFormat::detect(b"\x00\x01", "talk.HTM").unwrap(), DeckFormat::Html);
        assert!(matches!(
            DeckFormat::detect(b"plain text", "notes.txt"),
            Err(Error::UnsupportedFormat(name)) if name == "notes.txt"
        ));
    }

    #[test]
    fn test_format_from_magic() {
        assert_eq!(
            DeckFormat::from_magic(&[0x50, 0x4B, 0x03, 0x04, 0, 0]),
            Some(DeckFormat::Pptx)
        );
        assert_eq!(
            DeckFormat::from_magic(b"\xEF\xBB\xBF  <!DOCTYPE html>"),
            Some(DeckFormat::Html)
        );
        assert_eq!(DeckFormat::from_magic(b"\n<html>"), Some(DeckFormat::Html));
        assert_eq!(DeckFormat::from_magic(b"plain text"), None);
        assert_eq!(DeckFormat::from_magic(b""), None);
    }

    #[test]
    fn test_add_slide_renumbers_densely() {
        let deck = Deck::new()
            .with_slide(SlideRecord::new(7).with_title("A"))
            .with_slide(SlideRecord::new(3).with_title("B"));

        assert_eq!(deck.slides[0].index, 1);
        assert_eq!(deck.slides[1].index, 2);
    }

    #[test]
    fn test_has_notes_ignores_whitespace() {
        assert!(!SlideRecord::new(1).with_notes("  \n ").has_notes());
        assert!(SlideRecord::new(1).with_notes("<p>x</p>").has_notes());
    }

    #[test]
    fn test_snapshot_serializes_wire_keys() {
        let snapshot = ExportSnapshot {
            title: "Deck".to_string(),
            generated_at: DateTime::parse_from_rfc3339("2025-07-28T09:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            total_slides: 1,
            current_slide: 1,
            slides: vec![ExportedSlide {
                slide_number: 1,
                title: "Intro".to_string(),
                content: vec!["Hello".to_string()],
                notes: String::new(),
            }],
            metadata: BTreeMap::new(),
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["date"], "2025-07-28T09:00:00Z");
        assert_eq!(value["totalSlides"], 1);
        assert_eq!(value["currentSlide"], 1);
        assert_eq!(value["slides"][0]["slideNumber"], 1);
        assert!(value.get("metadata").is_some());
        assert!(value.get("generatedAt").is_none());
    }
}

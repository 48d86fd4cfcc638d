//! Snapshot extraction for export.
//!
//! Reads every slide of a repository, together with its cached notes, into an
//! [`ExportSnapshot`]. Extraction is total: missing titles, content or notes
//! fall back to defaults instead of failing.

use crate::notes::NotesCache;
use crate::repository::SlideRepository;
use crate::types::{ExportSnapshot, ExportedSlide, NavigationState};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Matches any markup tag.
static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Runs of characters that are not allowed in a file slug.
static SLUG_SEPARATOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Title used when neither the options nor the deck name one.
pub const DEFAULT_TITLE: &str = "Presentation";

/// Slug used when the topic has no usable characters.
const DEFAULT_SLUG: &str = "deck";

/// Export settings that do not come from the deck itself.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    title: Option<String>,
    topic: Option<String>,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the snapshot title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Topic used to name the export file.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Add one descriptive metadata entry.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Resolve the snapshot title against the deck title.
    pub fn resolve_title<R: SlideRepository + ?Sized>(&self, repository: &R) -> String {
        self.title
            .as_deref()
            .or_else(|| repository.title())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string()
    }

    /// File name for the export, `<topic-slug>-presentation.json`.
    pub fn file_name<R: SlideRepository + ?Sized>(&self, repository: &R) -> String {
        let topic = match &self.topic {
            Some(topic) => topic.clone(),
            None => self.resolve_title(repository),
        };
        format!("{}-presentation.json", slugify(&topic))
    }
}

/// Builds export snapshots from a repository and its notes.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExportOptions,
}

impl Extractor {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Extract all slides, stamped with the current time.
    pub fn extract_all<R: SlideRepository + ?Sized>(
        &self,
        repository: &R,
        notes: &NotesCache,
        state: NavigationState,
    ) -> ExportSnapshot {
        self.extract_all_at(repository, notes, state, Utc::now())
    }

    /// Extract all slides with an explicit timestamp.
    pub fn extract_all_at<R: SlideRepository + ?Sized>(
        &self,
        repository: &R,
        notes: &NotesCache,
        state: NavigationState,
        generated_at: DateTime<Utc>,
    ) -> ExportSnapshot {
        let total = repository.len();
        let mut slides = Vec::with_capacity(total);

        // Iterate positions rather than records so the output stays dense
        // even for a repository with holes.
        for number in 1..=total {
            let slide = match repository.find_slide_by_index(number) {
                Some(record) => ExportedSlide {
                    slide_number: number,
                    title: slide_title(&record.title, number),
                    content: record
                        .content_lines
                        .iter()
                        .map(|l| l.trim())
                        .filter(|l| !l.is_empty())
                        .map(str::to_string)
                        .collect(),
                    notes: strip_tags(notes.get(number)),
                },
                None => {
                    log::warn!("Slide {} missing from repository during export", number);
                    ExportedSlide {
                        slide_number: number,
                        title: slide_title("", number),
                        content: Vec::new(),
                        notes: strip_tags(notes.get(number)),
                    }
                }
            };
            slides.push(slide);
        }

        ExportSnapshot {
            title: self.options.resolve_title(repository),
            generated_at,
            total_slides: state.total_slides,
            current_slide: state.current_index,
            slides,
            metadata: self.options.metadata.clone(),
        }
    }

    /// Export file name for this repository.
    pub fn file_name<R: SlideRepository + ?Sized>(&self, repository: &R) -> String {
        self.options.file_name(repository)
    }
}

fn slide_title(title: &str, number: usize) -> String {
    let title = title.trim();
    if title.is_empty() {
        format!("Slide {}", number)
    } else {
        title.to_string()
    }
}

/// Remove every markup tag and trim the remainder.
pub fn strip_tags(html: &str) -> String {
    TAG_REGEX.replace_all(html, "").trim().to_string()
}

/// Lowercase ASCII slug for file names.
///
/// Diacritics are dropped through NFKD decomposition; any other run of
/// non-alphanumerics becomes a single `-`.
pub fn slugify(text: &str) -> String {
    let folded: String = text
        .nfkd()
        .filter(|c| c.is_ascii())
        .collect::<String>()
        .to_lowercase();

    let slug = SLUG_SEPARATOR_REGEX
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string();

    if slug.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        slug
    }
}

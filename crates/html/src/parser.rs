//! HTML slide document parser.
//!
//! Slides are elements whose class list contains `slide`. Within a slide,
//! headings, paragraphs and list items become content lines, `.slide-title`
//! or `.main-title` names the slide, and `.slide-notes` holds speaker notes.
//! The scanner is tolerant: void elements, unclosed tags and unknown
//! entities do not stop parsing.

use deck_core::{Deck, Error, Result, SlideRecord};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::borrow::Cow;
use std::io::Read;
use std::sync::LazyLock;

/// Script and style blocks, which may contain unescaped `<`.
static SCRIPT_STYLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").unwrap()
});

/// Regex to collapse whitespace runs, including line breaks.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Elements that never have a closing tag in HTML.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text becomes a content line.
const CONTENT_ELEMENTS: &[&str] = &["h1", "h2", "h3", "h4", "p", "li"];

const HEADING_ELEMENTS: &[&str] = &["h1", "h2", "h3", "h4"];

/// Elements whose boundaries separate words in collected text.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "div", "section", "article",
    "table", "tr", "td", "th", "blockquote",
];

const SLIDE_CLASS: &str = "slide";
const NOTES_CLASS: &str = "slide-notes";
const TITLE_CLASSES: &[&str] = &["slide-title", "main-title"];

/// Parser for HTML slide documents.
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse an HTML document from a reader.
    pub fn parse<R: Read>(&self, mut reader: R, filename: &str) -> Result<Deck> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let html = String::from_utf8_lossy(&bytes);
        self.parse_str(&html, filename)
    }

    /// Parse an HTML document held in memory.
    pub fn parse_str(&self, html: &str, filename: &str) -> Result<Deck> {
        let stripped = SCRIPT_STYLE_REGEX.replace_all(html, "");
        let source = escape_stray_lt(&stripped);
        let mut reader = Reader::from_str(&source);
        reader.trim_text(false);
        reader.check_end_names(false);

        let mut builder = DeckBuilder::default();
        let mut last_error_at: Option<usize> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let name = tag_name(e);
                    if VOID_ELEMENTS.contains(&name.as_str()) {
                        if name == "br" {
                            builder.text(" ");
                        }
                        continue;
                    }
                    builder.open(name, e, reader.buffer_position(), &source);
                }
                Ok(Event::Empty(ref e)) => {
                    if tag_name(e) == "br" {
                        builder.text(" ");
                    }
                }
                Ok(Event::Text(ref e)) => {
                    let text = e
                        .unescape_with(resolve_entity)
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(e).into_owned());
                    builder.text(&text);
                }
                Ok(Event::CData(ref e)) => {
                    builder.text(&String::from_utf8_lossy(e));
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(local_name(e.name().as_ref()))
                        .to_ascii_lowercase();
                    let end = reader.buffer_position();
                    let tag_start = source[..end].rfind("</").unwrap_or(end);
                    builder.close(&name, tag_start, &source);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    let position = reader.buffer_position();
                    log::warn!("HTML parsing error at byte {} (continuing): {}", position, e);
                    if last_error_at == Some(position) {
                        break;
                    }
                    last_error_at = Some(position);
                }
                _ => {}
            }
        }

        let deck = builder.finish(&source);

        if deck.slides.is_empty() {
            return Err(Error::EmptyDeck(filename.to_string()));
        }

        log::debug!(
            "Parsed {} slides from '{}' (title: {:?})",
            deck.slides.len(),
            filename,
            deck.title
        );

        Ok(deck)
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// One element on the open-element stack.
#[derive(Debug, Default)]
struct OpenElement {
    name: String,
    slide: bool,
    heading: bool,
    /// Holds the slide's marked title, reserved when the element opened.
    title_marked: bool,
    document_title: bool,
    /// Byte offset of the notes' inner markup.
    notes_start: Option<usize>,
    /// Reserved line slot in the current slide.
    content_slot: Option<usize>,
    /// Text collected for slots, titles and the document title.
    text: Option<String>,
}

/// A slide under construction.
#[derive(Debug, Default)]
struct SlideBuilder {
    declared: Option<usize>,
    title_reserved: bool,
    marked_title: Option<String>,
    heading_title: Option<String>,
    lines: Vec<Option<String>>,
    notes: Option<String>,
}

#[derive(Debug, Default)]
struct DeckBuilder {
    deck: Deck,
    stack: Vec<OpenElement>,
    slide: Option<SlideBuilder>,
}

impl DeckBuilder {
    fn in_notes(&self) -> bool {
        self.stack.iter().any(|e| e.notes_start.is_some())
    }

    fn open(&mut self, name: String, e: &BytesStart, inner_start: usize, source: &str) {
        if let Some(position) = self.implicitly_closed_by(&name) {
            while self.stack.len() > position {
                if let Some(element) = self.stack.pop() {
                    self.finish_element(element, inner_start, source);
                }
            }
        }
        if BLOCK_ELEMENTS.contains(&name.as_str()) {
            self.text(" ");
        }

        let classes = attribute(e, "class").unwrap_or_default();
        let has_class = |wanted: &str| classes.split_whitespace().any(|c| c == wanted);
        let in_notes = self.in_notes();

        let mut element = OpenElement {
            name,
            ..Default::default()
        };

        if self.slide.is_none() {
            if has_class(SLIDE_CLASS) {
                element.slide = true;
                self.slide = Some(SlideBuilder {
                    declared: attribute(e, "data-slide").and_then(|v| v.trim().parse().ok()),
                    ..Default::default()
                });
            } else if element.name == "title" {
                element.document_title = true;
                element.text = Some(String::new());
            }
        } else if has_class(NOTES_CLASS) && !in_notes {
            element.notes_start = Some(inner_start);
        } else if !in_notes {
            if let Some(slide) = self.slide.as_mut() {
                if CONTENT_ELEMENTS.contains(&element.name.as_str()) {
                    element.content_slot = Some(slide.lines.len());
                    slide.lines.push(None);
                }
            }
            element.heading = HEADING_ELEMENTS.contains(&element.name.as_str());
            if let Some(slide) = self.slide.as_mut() {
                if !slide.title_reserved && TITLE_CLASSES.iter().any(|c| has_class(c)) {
                    slide.title_reserved = true;
                    element.title_marked = true;
                }
            }
            if element.content_slot.is_some() || element.heading || element.title_marked {
                element.text = Some(String::new());
            }
        }

        self.stack.push(element);
    }

    /// Stack position of an element that opening `name` closes in HTML
    /// (`<p>` ends an open paragraph, `<li>` an open item in the same list).
    fn implicitly_closed_by(&self, name: &str) -> Option<usize> {
        let closes: &[&str] = match name {
            "p" | "h1" | "h2" | "h3" | "h4" | "ul" | "ol" | "div" | "section" => &["p"],
            "li" => &["li"],
            _ => return None,
        };

        let position = self
            .stack
            .iter()
            .rposition(|e| closes.contains(&e.name.as_str()))?;

        let crosses_boundary = self.stack[position + 1..]
            .iter()
            .any(|e| e.slide || e.notes_start.is_some() || e.name == "ul" || e.name == "ol");

        (!crosses_boundary).then_some(position)
    }

    fn text(&mut self, text: &str) {
        for element in self.stack.iter_mut() {
            if let Some(buffer) = element.text.as_mut() {
                buffer.push_str(text);
            }
        }
    }

    /// Close `name`, implicitly closing anything left open inside it.
    fn close(&mut self, name: &str, tag_start: usize, source: &str) {
        let Some(position) = self.stack.iter().rposition(|e| e.name == name) else {
            log::debug!("Ignoring stray closing tag </{}>", name);
            return;
        };

        while self.stack.len() > position {
            if let Some(element) = self.stack.pop() {
                self.finish_element(element, tag_start, source);
            }
        }
    }

    fn finish_element(&mut self, element: OpenElement, end: usize, source: &str) {
        let text = element.text.as_deref().map(collapse_whitespace);

        if element.document_title {
            if let Some(title) = text.filter(|t| !t.is_empty()) {
                self.deck.title.get_or_insert(title);
            }
            return;
        }

        if element.slide {
            if let Some(slide) = self.slide.take() {
                self.push_slide(slide);
            }
            return;
        }

        let Some(slide) = self.slide.as_mut() else {
            return;
        };

        if let Some(start) = element.notes_start {
            let inner = source.get(start..end).unwrap_or_default().trim();
            if slide.notes.is_none() {
                slide.notes = Some(inner.to_string());
            }
            return;
        }

        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return;
        };

        if element.title_marked {
            slide.marked_title = Some(text.clone());
        }
        if element.heading && slide.heading_title.is_none() {
            slide.heading_title = Some(text.clone());
        }
        if let Some(slot) = element.content_slot {
            slide.lines[slot] = Some(text);
        }
    }

    fn push_slide(&mut self, slide: SlideBuilder) {
        let position = self.deck.slides.len() + 1;
        if let Some(declared) = slide.declared.filter(|d| *d != position) {
            log::warn!(
                "Slide declares data-slide={} but is at position {}; using position",
                declared,
                position
            );
        }

        let mut record = SlideRecord::new(position);
        record.title = slide
            .marked_title
            .or(slide.heading_title)
            .unwrap_or_default();
        record.content_lines = slide.lines.into_iter().flatten().collect();
        record.notes_html = slide.notes.unwrap_or_default();

        self.deck.add_slide(record);
    }

    fn finish(mut self, source: &str) -> Deck {
        let end = source.len();
        while let Some(element) = self.stack.pop() {
            self.finish_element(element, end, source);
        }
        if let Some(slide) = self.slide.take() {
            self.push_slide(slide);
        }
        self.deck
    }
}

/// Lowercased local name of a start tag.
fn tag_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(local_name(e.name().as_ref())).to_ascii_lowercase()
}

/// Value of an attribute, matched case-insensitively.
fn attribute(e: &BytesStart, wanted: &str) -> Option<String> {
    e.html_attributes()
        .flatten()
        .find(|attr| attr.key.as_ref().eq_ignore_ascii_case(wanted.as_bytes()))
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

/// Extract the local name from a potentially namespaced element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Escape `<` that cannot open a tag; HTML reads it as text.
fn escape_stray_lt(html: &str) -> Cow<'_, str> {
    let bytes = html.as_bytes();
    let is_stray = |i: usize| match bytes.get(i + 1) {
        Some(b) => !(b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?')),
        None => true,
    };

    if !html.match_indices('<').any(|(i, _)| is_stray(i)) {
        return Cow::Borrowed(html);
    }

    let mut escaped = String::with_capacity(html.len() + 16);
    let mut last = 0;
    for (i, _) in html.match_indices('<') {
        if is_stray(i) {
            escaped.push_str(&html[last..i]);
            escaped.push_str("&lt;");
            last = i + 1;
        }
    }
    escaped.push_str(&html[last..]);
    Cow::Owned(escaped)
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_COLLAPSE_REGEX
        .replace_all(text, " ")
        .trim()
        .to_string()
}

/// Named HTML entities beyond the XML built-ins.
fn resolve_entity(entity: &str) -> Option<&'static str> {
    let resolved = match entity {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "ndash" => "–",
        "mdash" => "—",
        "hellip" => "…",
        "lsquo" => "‘",
        "rsquo" => "’",
        "ldquo" => "“",
        "rdquo" => "”",
        "laquo" => "«",
        "raquo" => "»",
        "bull" => "•",
        "middot" => "·",
        "rarr" => "→",
        "larr" => "←",
        "times" => "×",
        "deg" => "°",
        "copy" => "©",
        "reg" => "®",
        "trade" => "™",
        "euro" => "€",
        _ => return None,
    };
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::SlideRepository;

    const DECK: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Staffing Crisis &mdash; Briefing</title>
  <style>.slide > p { color: red; }</style>
</head>
<body>
  <div class="presentation-header"><h1>Not a slide</h1></div>
  <div class="slide-container">
    <section class="slide active" data-slide="1">
      <h1 class="main-title">Staffing Crisis</h1>
      <p>150 contract staff at risk</p>
      <div class="slide-notes">
        <p>Open with the <strong>headline</strong> number.</p>
      </div>
    </section>
    <section class="slide" data-slide="2">
      <h2>Background</h2>
      <h3 class="slide-title">Why now</h3>
      <ul>
        <li>Deadline: 1&nbsp;October</li>
        <li>Budget <em>frozen</em></li>
      </ul>
      <img src="chart.png" alt="chart">
      <p>Line one<br>line two</p>
    </section>
    <section class="slide" data-slide="3">
      <div class="stat">42%</div>
    </section>
  </div>
  <nav class="slide-navigation"><div class="dot" data-slide="1"></div></nav>
  <script>if (a < b && c) { go(); }</script>
</body>
</html>"#;

    fn parse(html: &str) -> Deck {
        HtmlParser::new().parse_str(html, "deck.html").unwrap()
    }

    #[test]
    fn test_parse_slides_in_order() {
        let deck = parse(DECK);
        assert_eq!(deck.len(), 3);
        let indices: Vec<usize> = deck.slides.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_document_title() {
        let deck = parse(DECK);
        assert_eq!(deck.title.as_deref(), Some("Staffing Crisis — Briefing"));
    }

    #[test]
    fn test_titles() {
        let deck = parse(DECK);
        assert_eq!(deck.slides[0].title, "Staffing Crisis");
        // Marked title wins over an earlier plain heading.
        assert_eq!(deck.slides[1].title, "Why now");
        assert_eq!(deck.slides[2].title, "");
    }

    #[test]
    fn test_content_excludes_notes() {
        let deck = parse(DECK);
        assert_eq!(
            deck.slides[0].content_lines,
            vec!["Staffing Crisis", "150 contract staff at risk"]
        );
    }

    #[test]
    fn test_content_document_order_and_inline_text() {
        let deck = parse(DECK);
        assert_eq!(
            deck.slides[1].content_lines,
            vec![
                "Background",
                "Why now",
                "Deadline: 1 October",
                "Budget frozen",
                "Line one line two",
            ]
        );
        assert!(deck.slides[2].content_lines.is_empty());
    }

    #[test]
    fn test_notes_inner_markup() {
        let deck = parse(DECK);
        assert_eq!(
            deck.slides[0].notes_html,
            "<p>Open with the <strong>headline</strong> number.</p>"
        );
        assert_eq!(deck.slides[1].notes_html, "");
    }

    #[test]
    fn test_unclosed_paragraphs() {
        let deck = parse(
            r#"<div class="slide"><p>First<p>Second</div><div class="slide"><li>Third</div>"#,
        );
        assert_eq!(deck.len(), 2);
        assert_eq!(deck.slides[0].content_lines, vec!["First", "Second"]);
        assert_eq!(deck.slides[1].content_lines, vec!["Third"]);
    }

    #[test]
    fn test_bare_less_than_is_text() {
        let deck = parse(
            r#"<div class="slide"><h2>R&D budget</h2><p>a < b holds</p><p>3<4 and x <= y</p><p>after</p></div>"#,
        );
        assert_eq!(
            deck.slides[0].content_lines,
            vec!["R&D budget", "a < b holds", "3<4 and x <= y", "after"]
        );
    }

    #[test]
    fn test_escape_stray_lt() {
        assert_eq!(escape_stray_lt("<p>a</p>"), "<p>a</p>");
        assert!(matches!(escape_stray_lt("<p>a</p>"), Cow::Borrowed(_)));
        assert_eq!(escape_stray_lt("a < b<<i>"), "a &lt; b&lt;<i>");
        assert_eq!(escape_stray_lt("end <"), "end &lt;");
    }

    #[test]
    fn test_outer_marked_title_wins() {
        let deck = parse(
            r#"<div class="slide"><div class="main-title">Outer <span class="slide-title">Inner</span></div><h2>Heading</h2></div>"#,
        );
        assert_eq!(deck.slides[0].title, "Outer Inner");
    }

    #[test]
    fn test_nested_list_items_repeat_text() {
        let deck = parse(r#"<div class="slide"><ul><li>Outer<ul><li>Inner</li></ul></li></ul></div>"#);
        assert_eq!(deck.slides[0].content_lines, vec!["Outer Inner", "Inner"]);
    }

    #[test]
    fn test_mismatched_data_slide_uses_position() {
        let deck = parse(r#"<div class="slide" data-slide="7"><p>Only</p></div>"#);
        assert_eq!(deck.slides[0].index, 1);
    }

    #[test]
    fn test_unclosed_slide_at_eof() {
        let deck = parse(r#"<div class="slide"><h2>Dangling"#);
        assert_eq!(deck.len(), 1);
        assert_eq!(deck.slides[0].title, "Dangling");
    }

    #[test]
    fn test_no_slides_is_an_error() {
        let result = HtmlParser::new().parse_str("<html><body><p>Hi</p></body></html>", "empty.html");
        assert!(matches!(result, Err(Error::EmptyDeck(_))));
    }

    #[test]
    fn test_parse_from_reader() {
        let deck = HtmlParser::new()
            .parse(DECK.as_bytes(), "deck.html")
            .unwrap();
        assert_eq!(deck.len(), 3);
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("mdash"), Some("—"));
        assert_eq!(resolve_entity("bogus"), None);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
    }
}

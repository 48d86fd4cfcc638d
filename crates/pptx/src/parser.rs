//! PPTX deck parser implementation.

use deck_core::{Deck, Error, Result, SlideRecord};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

const PRESENTATION_PATH: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";
const CORE_PROPERTIES_PATH: &str = "docProps/core.xml";

/// Placeholder types that name a slide.
const TITLE_PLACEHOLDERS: &[&str] = &["title", "ctrTitle"];

/// Parser for PPTX (Office Open XML) decks.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX file from a reader.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Deck> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut deck = Deck::new();
        deck.title = self.document_title(&mut archive);

        let slide_paths = self.slide_order(&mut archive)?;
        for (idx, slide_path) in slide_paths.iter().enumerate() {
            let slide = self.parse_slide(&mut archive, slide_path, idx + 1)?;
            deck.add_slide(slide);
        }

        if deck.slides.is_empty() {
            return Err(Error::EmptyDeck(filename.to_string()));
        }

        log::debug!(
            "Parsed {} slides from '{}' ({} with notes)",
            deck.slides.len(),
            filename,
            deck.slides.iter().filter(|s| s.has_notes()).count()
        );

        Ok(deck)
    }

    /// Slide part paths in presentation order.
    ///
    /// Uses `sldIdLst` from presentation.xml; if that is unusable, falls back
    /// to the numeric order of the relationship ids.
    fn slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = self.read_file_from_archive(archive, PRESENTATION_RELS_PATH)?;
        let relationships = parse_relationships(&rels_content, "ppt")?;

        let slide_rels: HashMap<&str, &Relationship> = relationships
            .iter()
            .filter(|r| r.is_type("slide"))
            .map(|r| (r.id.as_str(), r))
            .collect();

        match self.read_file_from_archive(archive, PRESENTATION_PATH) {
            Ok(presentation) => {
                let ordered: Vec<String> = slide_id_list(&presentation)?
                    .iter()
                    .filter_map(|id| slide_rels.get(id.as_str()))
                    .map(|r| r.target.clone())
                    .collect();
                if !ordered.is_empty() {
                    return Ok(ordered);
                }
                log::warn!("presentation.xml lists no slides; ordering by relationship id");
            }
            Err(e) => {
                log::warn!("Could not read presentation.xml ({}); ordering by relationship id", e);
            }
        }

        let mut slides: Vec<(String, Option<usize>)> = slide_rels
            .values()
            .map(|r| {
                let order = extract_slide_number(&r.id).or_else(|| extract_slide_number(&r.target));
                (r.target.clone(), order)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse a single slide and its notes from the archive.
    fn parse_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
        slide_number: usize,
    ) -> Result<SlideRecord> {
        let content = self.read_file_from_archive(archive, slide_path)?;
        let mut shapes = extract_shapes_from_xml(&content)?;

        // Sort by position (top-to-bottom, left-to-right)
        shapes.sort_by(|a, b| {
            a.y.partial_cmp(&b.y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut slide = SlideRecord::new(slide_number);

        if let Some(title_shape) = shapes.iter().find(|s| s.is_title()) {
            slide.title = title_shape.paragraphs.join(" ");
        }

        for shape in &shapes {
            for paragraph in &shape.paragraphs {
                slide.add_line(paragraph.as_str());
            }
        }

        slide.notes_html = self.notes_for_slide(archive, slide_path).unwrap_or_default();

        Ok(slide)
    }

    /// Speaker notes for a slide as paragraph markup, if it has a notes part.
    fn notes_for_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
    ) -> Option<String> {
        let (dir, file) = slide_path.rsplit_once('/')?;
        let rels_path = format!("{}/_rels/{}.rels", dir, file);

        let rels_content = self.read_file_from_archive(archive, &rels_path).ok()?;
        let relationships = match parse_relationships(&rels_content, dir) {
            Ok(relationships) => relationships,
            Err(e) => {
                log::warn!("Skipping notes for {}: {}", slide_path, e);
                return None;
            }
        };
        let notes_rel = relationships.iter().find(|r| r.is_type("notesSlide"))?;

        let notes_xml = match self.read_file_from_archive(archive, &notes_rel.target) {
            Ok(xml) => xml,
            Err(e) => {
                log::warn!("Missing notes part for {}: {}", slide_path, e);
                return None;
            }
        };

        let shapes = extract_shapes_from_xml(&notes_xml).ok()?;
        let paragraphs: Vec<String> = shapes
            .iter()
            .filter(|s| s.placeholder.as_deref() == Some("body"))
            .flat_map(|s| s.paragraphs.iter())
            .map(|p| format!("<p>{}</p>", quick_xml::escape::escape(p.as_str())))
            .collect();

        if paragraphs.is_empty() {
            None
        } else {
            Some(paragraphs.join("\n"))
        }
    }

    /// `dc:title` from the core document properties.
    fn document_title<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Option<String> {
        let content = self
            .read_file_from_archive(archive, CORE_PROPERTIES_PATH)
            .ok()?;

        let mut reader = Reader::from_str(&content);
        reader.trim_text(true);
        let mut in_title = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == b"title" => {
                    in_title = true;
                }
                Ok(Event::Text(ref e)) if in_title => {
                    let title = e.unescape().ok()?.trim().to_string();
                    return (!title.is_empty()).then_some(title);
                }
                Ok(Event::End(_)) if in_title => return None,
                Ok(Event::Eof) | Err(_) => return None,
                _ => {}
            }
        }
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A package relationship with its target resolved to an archive path.
#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

impl Relationship {
    /// Whether the relationship type URI ends in `/{kind}`.
    fn is_type(&self, kind: &str) -> bool {
        self.rel_type
            .rsplit('/')
            .next()
            .is_some_and(|last| last == kind)
    }
}

/// Information about a text-bearing shape.
#[derive(Debug, Default)]
struct ShapeInfo {
    paragraphs: Vec<String>,
    placeholder: Option<String>,
    x: f64,
    y: f64,
}

impl ShapeInfo {
    fn is_title(&self) -> bool {
        self.placeholder
            .as_deref()
            .is_some_and(|p| TITLE_PLACEHOLDERS.contains(&p))
    }
}

/// Parse a `.rels` part, resolving targets against `base_dir`.
fn parse_relationships(xml: &str, base_dir: &str) -> Result<Vec<Relationship>> {
    let mut relationships = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut relationship = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                };
                let mut external = false;

                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => relationship.id = value,
                        b"Type" => relationship.rel_type = value,
                        b"Target" => relationship.target = value,
                        b"TargetMode" => external = value == "External",
                        _ => {}
                    }
                }

                if !external {
                    relationship.target = resolve_target(base_dir, &relationship.target);
                    relationships.push(relationship);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Relationship ids from `p:sldIdLst`, in presentation order.
fn slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                let rel_id = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref().ends_with(b":id"))
                    .map(|a| String::from_utf8_lossy(&a.value).to_string());
                if let Some(rel_id) = rel_id {
                    ids.push(rel_id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::PptxParseError(format!(
                    "Error parsing presentation.xml: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Extract text shapes with their paragraphs, position and placeholder type.
fn extract_shapes_from_xml(xml_content: &str) -> Result<Vec<ShapeInfo>> {
    let mut shapes = Vec::new();
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(false);

    let mut current_shape: Option<ShapeInfo> = None;
    let mut shape_depth = 0usize;
    let mut in_text_body = false;
    let mut in_run_text = false;
    let mut paragraph: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" | b"graphicFrame" => {
                    if current_shape.is_none() {
                        current_shape = Some(ShapeInfo::default());
                        shape_depth = 0;
                    }
                    shape_depth += 1;
                }
                b"off" => apply_offset(current_shape.as_mut(), e),
                b"txBody" => in_text_body = true,
                b"p" if in_text_body => paragraph = Some(String::new()),
                b"t" => in_run_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"off" => apply_offset(current_shape.as_mut(), e),
                b"ph" => {
                    if let Some(shape) = current_shape.as_mut() {
                        let ph_type = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"type")
                            .map(|a| String::from_utf8_lossy(&a.value).to_string());
                        // An untyped placeholder is a body placeholder.
                        shape.placeholder = Some(ph_type.unwrap_or_else(|| "body".to_string()));
                    }
                }
                b"br" => {
                    if let Some(text) = paragraph.as_mut() {
                        text.push(' ');
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_run_text => {
                if let Some(text) = paragraph.as_mut() {
                    text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" | b"graphicFrame" => {
                    shape_depth = shape_depth.saturating_sub(1);
                    if shape_depth == 0 {
                        if let Some(shape) = current_shape.take() {
                            if !shape.paragraphs.is_empty() {
                                shapes.push(shape);
                            }
                        }
                        in_text_body = false;
                        paragraph = None;
                    }
                }
                b"txBody" => in_text_body = false,
                b"t" => in_run_text = false,
                b"p" => {
                    let text = paragraph.take().unwrap_or_default();
                    let text = text.trim();
                    if let Some(shape) = current_shape.as_mut().filter(|_| !text.is_empty()) {
                        shape.paragraphs.push(text.to_string());
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing slide: {}", e)));
            }
            _ => {}
        }
    }

    Ok(shapes)
}

/// Record an `a:off` position on the shape, unless it already has one.
fn apply_offset(shape: Option<&mut ShapeInfo>, e: &BytesStart) {
    let Some(shape) = shape else {
        return;
    };
    if shape.x != 0.0 || shape.y != 0.0 {
        return;
    }
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value);
        match attr.key.as_ref() {
            b"x" => shape.x = value.parse().unwrap_or(shape.x),
            b"y" => shape.y = value.parse().unwrap_or(shape.y),
            _ => {}
        }
    }
}

/// Resolve a relationship target relative to the part's directory.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    // Remove common extensions first
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    // Try to find digits at the end
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::SlideRepository;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const REL_SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    const REL_NOTES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";

    fn shape(ph: Option<&str>, x: i64, y: i64, paragraphs: &[&str]) -> String {
        let ph = match ph {
            Some(t) => format!(r#"<p:ph type="{}"/>"#, t),
            None => String::new(),
        };
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", p))
            .collect();
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Shape"/><p:cNvSpPr/><p:nvPr>{ph}</p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="100" cy="100"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/>{body}</p:txBody></p:sp>"#
        )
    }

    fn slide_xml(shapes: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>{}</p:spTree></p:cSld></p:sld>"#,
            shapes.concat()
        )
    }

    fn build_pptx(with_presentation_xml: bool) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        let add = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, body: &str| {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        };

        add(
            &mut zip,
            "docProps/core.xml",
            r#"<cp:coreProperties xmlns:cp="cp" xmlns:dc="dc"><dc:title>Budget &amp; Staffing</dc:title></cp:coreProperties>"#,
        );
        add(
            &mut zip,
            "ppt/_rels/presentation.xml.rels",
            &format!(
                r#"<Relationships><Relationship Id="rId2" Type="{REL_SLIDE}" Target="slides/slide1.xml"/><Relationship Id="rId3" Type="{REL_SLIDE}" Target="slides/slide2.xml"/><Relationship Id="rId9" Type="http://x/slideMaster" Target="slideMasters/slideMaster1.xml"/></Relationships>"#
            ),
        );
        if with_presentation_xml {
            // Second slide part is shown first.
            add(
                &mut zip,
                "ppt/presentation.xml",
                r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst><p:sldId id="256" r:id="rId3"/><p:sldId id="257" r:id="rId2"/></p:sldIdLst></p:presentation>"#,
            );
        }
        add(
            &mut zip,
            "ppt/slides/slide1.xml",
            &slide_xml(&[
                shape(None, 100, 2000, &["Second bullet row"]),
                shape(Some("title"), 100, 100, &["Numbers"]),
                shape(None, 100, 1000, &["Wages up 4%", "Headcount flat"]),
            ]),
        );
        add(
            &mut zip,
            "ppt/slides/slide2.xml",
            &slide_xml(&[shape(Some("ctrTitle"), 0, 0, &["Welcome"])]),
        );
        add(
            &mut zip,
            "ppt/slides/_rels/slide1.xml.rels",
            &format!(
                r#"<Relationships><Relationship Id="rId1" Type="{REL_NOTES}" Target="../notesSlides/notesSlide1.xml"/></Relationships>"#
            ),
        );
        add(
            &mut zip,
            "ppt/notesSlides/notesSlide1.xml",
            &slide_xml(&[
                shape(Some("sldImg"), 0, 0, &["ignored"]),
                shape(Some("body"), 0, 500, &["Mention the &lt;freeze&gt;", "Pause for questions"]),
            ]),
        );

        zip.finish().unwrap().into_inner()
    }

    fn parse(bytes: Vec<u8>) -> Deck {
        PptxParser::new()
            .parse(Cursor::new(bytes), "budget.pptx")
            .unwrap()
    }

    #[test]
    fn test_slide_order_from_presentation_xml() {
        let deck = parse(build_pptx(true));
        assert_eq!(deck.len(), 2);
        assert_eq!(deck.slides[0].title, "Welcome");
        assert_eq!(deck.slides[1].title, "Numbers");
        assert_eq!(deck.slides[1].index, 2);
    }

    #[test]
    fn test_slide_order_fallback_to_relationship_ids() {
        let deck = parse(build_pptx(false));
        assert_eq!(deck.slides[0].title, "Numbers");
        assert_eq!(deck.slides[1].title, "Welcome");
    }

    #[test]
    fn test_content_lines_in_position_order() {
        let deck = parse(build_pptx(true));
        assert_eq!(
            deck.slides[1].content_lines,
            vec!["Numbers", "Wages up 4%", "Headcount flat", "Second bullet row"]
        );
    }

    #[test]
    fn test_notes_from_notes_slide() {
        let deck = parse(build_pptx(true));
        assert_eq!(
            deck.slides[1].notes_html,
            "<p>Mention the &lt;freeze&gt;</p>\n<p>Pause for questions</p>"
        );
        assert!(!deck.slides[0].has_notes());
    }

    #[test]
    fn test_document_title() {
        let deck = parse(build_pptx(true));
        assert_eq!(deck.title.as_deref(), Some("Budget & Staffing"));
    }

    #[test]
    fn test_not_a_zip() {
        let result = PptxParser::new().parse(Cursor::new(b"<html></html>".to_vec()), "x.pptx");
        assert!(matches!(result, Err(Error::ZipError(_))));
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt", "slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(
            resolve_target("ppt/slides", "../notesSlides/notesSlide1.xml"),
            "ppt/notesSlides/notesSlide1.xml"
        );
        assert_eq!(resolve_target("ppt", "/ppt/slides/slide9.xml"), "ppt/slides/slide9.xml");
    }

    #[test]
    fn test_relationship_type() {
        let rel = Relationship {
            id: "rId1".to_string(),
            rel_type: REL_SLIDE.to_string(),
            target: String::new(),
        };
        assert!(rel.is_type("slide"));
        assert!(!rel.is_type("slideLayout"));
    }

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }
}

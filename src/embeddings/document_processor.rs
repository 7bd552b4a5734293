//! Document text extraction
//!
//! Turns uploaded PDF and DOCX bytes into plain text ready for embedding.
//!
//! Extraction never fails with an error: anything the extractor cannot turn
//! into usable text comes back as a sentinel variant of [`Extraction`], and the
//! caller decides whether that aborts ingestion.
//!
//! PDF text streams from scanned or binary-heavy files tend to carry object
//! dictionaries, coordinate arrays and file markers; [`clean_pdf_text`] strips
//! those before the minimum-length check.

use std::io::Cursor;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;

use docx_rust::document::BodyContent;
use docx_rust::DocxFile;
use lopdf::Document;
use regex::Regex;
use tracing::{debug, warn};

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const DOC_MIME: &str = "application/msword";

/// Default lower bound on cleaned PDF text length.
pub const MIN_READABLE_CHARS: usize = 50;

/// Lines where fewer than this share of characters are printable are dropped.
const MIN_PRINTABLE_RATIO: f64 = 0.1;

/// Outcome of one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Usable text
    Text(String),
    /// Cleaned PDF text was shorter than the readable threshold
    Unreadable { chars: usize },
    /// Declared MIME type is not handled
    Unsupported { mime_type: String },
    /// Legacy binary Word document; only the size is known
    LegacyBinary { byte_len: usize },
    /// The byte stream could not be parsed
    Failed { reason: String },
}

impl Extraction {
    pub fn is_text(&self) -> bool {
        matches!(self, Extraction::Text(_))
    }

    /// Textual stand-in for a sentinel, or the text itself.
    pub fn sentinel_text(&self) -> String {
        match self {
            Extraction::Text(text) => text.clone(),
            Extraction::Unreadable { chars } => format!(
                "Unreadable document: only {} characters of text after cleaning",
                chars
            ),
            Extraction::Unsupported { .. } => "Unsupported file type".to_string(),
            Extraction::LegacyBinary { byte_len } => format!(
                "Unsupported .doc file type for full parsing. Raw bytes length: {}",
                byte_len
            ),
            Extraction::Failed { reason } => format!("Error parsing document: {}", reason),
        }
    }
}

impl std::fmt::Display for Extraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sentinel_text())
    }
}

/// Stateless extractor; `min_chars` is the only knob.
#[derive(Debug, Clone, Copy)]
pub struct DocumentProcessor {
    min_chars: usize,
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::new(MIN_READABLE_CHARS)
    }
}

impl DocumentProcessor {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// Extract text from `bytes` according to the declared MIME type.
    pub fn extract(&self, bytes: &[u8], declared_mime_type: &str) -> Extraction {
        let mime_type = match normalize_mime(declared_mime_type) {
            Some(m) => m,
            None => {
                return Extraction::Unsupported {
                    mime_type: declared_mime_type.to_string(),
                }
            }
        };

        match mime_type.as_str() {
            PDF_MIME => self.extract_pdf(bytes),
            DOCX_MIME => match guarded(|| extract_docx_text(bytes)) {
                Ok(text) => Extraction::Text(text),
                Err(reason) => {
                    warn!(bytes = bytes.len(), %reason, "DOCX extraction failed");
                    Extraction::Failed { reason }
                }
            },
            DOC_MIME => Extraction::LegacyBinary {
                byte_len: bytes.len(),
            },
            _ => Extraction::Unsupported { mime_type },
        }
    }

    fn extract_pdf(&self, bytes: &[u8]) -> Extraction {
        let raw = match guarded(|| extract_pdf_text(bytes)) {
            Ok(raw) => raw,
            Err(reason) => {
                warn!(bytes = bytes.len(), %reason, "PDF extraction failed");
                return Extraction::Failed { reason };
            }
        };

        let cleaned = clean_pdf_text(&raw);
        let chars = cleaned.chars().count();
        debug!(raw_chars = raw.chars().count(), cleaned_chars = chars, "PDF text cleaned");

        if chars < self.min_chars {
            Extraction::Unreadable { chars }
        } else {
            Extraction::Text(cleaned)
        }
    }
}

/// Lowercased `type/subtype` without parameters, or `None` if unparseable.
fn normalize_mime(declared: &str) -> Option<String> {
    declared
        .trim()
        .parse::<mime::Mime>()
        .ok()
        .map(|m| m.essence_str().to_ascii_lowercase())
}

/// Runs a parser over untrusted bytes, turning a panic into an error.
fn guarded<F>(parse: F) -> Result<String, String>
where
    F: FnOnce() -> Result<String, String>,
{
    catch_unwind(AssertUnwindSafe(parse))
        .unwrap_or_else(|_| Err("parser panicked on malformed input".to_string()))
}

/// Page-by-page text in page order, each page ending a line. Pages that fail
/// to decode contribute nothing.
fn extract_pdf_text(bytes: &[u8]) -> Result<String, String> {
    let document = Document::load_mem(bytes).map_err(|e| format!("invalid PDF: {}", e))?;

    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                if !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Err(e) => debug!(page = page_number, error = %e, "Skipping undecodable PDF page"),
        }
    }
    Ok(text)
}

/// Top-level paragraphs in document order, each terminated by a newline.
fn extract_docx_text(bytes: &[u8]) -> Result<String, String> {
    let file = DocxFile::from_reader(Cursor::new(bytes))
        .map_err(|e| format!("invalid DOCX container: {}", e))?;
    let docx = file
        .parse()
        .map_err(|e| format!("invalid DOCX document: {}", e))?;

    let mut text = String::new();
    for content in &docx.document.body.content {
        if let BodyContent::Paragraph(paragraph) = content {
            for run_text in paragraph.iter_text() {
                text.push_str(run_text);
            }
            text.push('\n');
        }
    }
    Ok(text)
}

// =============================================================================
// PDF cleaning
// =============================================================================

fn dictionary_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Innermost dictionaries first; the caller loops until nothing matches.
    RE.get_or_init(|| Regex::new(r"<<[^<>]*>>").expect("valid dictionary regex"))
}

fn numeric_array_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[\s*-?\d+(?:\.\d+)?(?:\s+(?:-?\d+(?:\.\d+)?|R))*\s*\]")
            .expect("valid numeric array regex")
    })
}

fn structural_line_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:%PDF-\d+(?:\.\d+)?.*|%%EOF|\d+\s+\d+\s+obj\b.*|endobj|stream|endstream|xref|trailer|startxref)$",
        )
        .expect("valid structural line regex")
    })
}

fn horizontal_space_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\S\n]+").expect("valid whitespace regex"))
}

fn is_printable(c: char) -> bool {
    c == ' ' || (!c.is_control() && !c.is_whitespace() && c != char::REPLACEMENT_CHARACTER)
}

fn printable_ratio(line: &str) -> f64 {
    let total = line.chars().count();
    if total == 0 {
        return 0.0;
    }
    let printable = line.chars().filter(|c| is_printable(*c)).count();
    printable as f64 / total as f64
}

/// Strip PDF structural noise and normalize whitespace.
///
/// Deterministic: the same input always yields the same output.
pub fn clean_pdf_text(raw: &str) -> String {
    let mut text = raw.replace("\r\n", "\n").replace('\r', "\n");

    loop {
        let stripped = dictionary_pattern().replace_all(&text, " ").into_owned();
        if stripped == text {
            break;
        }
        text = stripped;
    }
    let text = numeric_array_pattern().replace_all(&text, " ");

    let mut lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let line = horizontal_space_pattern().replace_all(line, " ");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if structural_line_pattern().is_match(line) {
            continue;
        }
        if printable_ratio(line) < MIN_PRINTABLE_RATIO {
            continue;
        }
        lines.push(line.to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rust::document::Paragraph;
    use docx_rust::Docx;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("resume.docx");
        let mut docx = Docx::default();
        for text in paragraphs {
            docx.document.push(Paragraph::default().push_text(*text));
        }
        docx.write_file(&path).unwrap();
        std::fs::read(&path).unwrap()
    }

    fn pdf_bytes(page_text: &str) -> Vec<u8> {
        pdf_pages(&[page_text])
    }

    /// One Courier text line per page.
    fn pdf_pages(page_texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for page_text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*page_text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_docx_paragraphs_joined_with_newlines() {
        let bytes = docx_bytes(&["Senior Engineer", "5 years Go experience"]);
        let extraction = DocumentProcessor::default().extract(&bytes, DOCX_MIME);
        assert_eq!(
            extraction,
            Extraction::Text("Senior Engineer\n5 years Go experience\n".to_string())
        );
    }

    #[test]
    fn test_short_pdf_is_unreadable() {
        let bytes = pdf_bytes("Hi");
        let extraction = DocumentProcessor::default().extract(&bytes, PDF_MIME);
        assert!(
            matches!(extraction, Extraction::Unreadable { chars } if chars < MIN_READABLE_CHARS),
            "got {:?}",
            extraction
        );
    }

    #[test]
    fn test_readable_pdf_yields_cleaned_text() {
        let line = "Experienced backend engineer with Rust, Go and Kubernetes across eight years";
        let extraction = DocumentProcessor::default().extract(&pdf_bytes(line), PDF_MIME);
        assert_eq!(extraction, Extraction::Text(line.to_string()));
    }

    #[test]
    fn test_pdf_pages_kept_in_order() {
        let bytes = pdf_pages(&[
            "Page one: Staff Engineer at Example Corp",
            "Page two: Education, BSc Computer Science",
        ]);
        let extraction = DocumentProcessor::default().extract(&bytes, PDF_MIME);
        assert_eq!(
            extraction,
            Extraction::Text(
                "Page one: Staff Engineer at Example Corp\nPage two: Education, BSc Computer Science"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let processor = DocumentProcessor::default();
        let pdf = pdf_bytes("Hi");
        assert_eq!(processor.extract(&pdf, PDF_MIME), processor.extract(&pdf, PDF_MIME));

        let docx = docx_bytes(&["Data Analyst", "SQL, Python"]);
        assert_eq!(processor.extract(&docx, DOCX_MIME), processor.extract(&docx, DOCX_MIME));
    }

    #[test]
    fn test_corrupt_bytes_become_failed_sentinel() {
        let processor = DocumentProcessor::default();
        let garbage = b"definitely not a document".to_vec();

        let pdf = processor.extract(&garbage, PDF_MIME);
        assert!(matches!(pdf, Extraction::Failed { .. }), "got {:?}", pdf);
        assert!(pdf.sentinel_text().starts_with("Error parsing document"));

        let docx = processor.extract(&garbage, DOCX_MIME);
        assert!(matches!(docx, Extraction::Failed { .. }), "got {:?}", docx);
    }

    #[test]
    fn test_legacy_word_reports_byte_length() {
        let extraction = DocumentProcessor::default().extract(&[0u8; 1234], DOC_MIME);
        assert_eq!(extraction, Extraction::LegacyBinary { byte_len: 1234 });
        assert_eq!(
            extraction.sentinel_text(),
            "Unsupported .doc file type for full parsing. Raw bytes length: 1234"
        );
    }

    #[test]
    fn test_unknown_mime_is_unsupported() {
        let processor = DocumentProcessor::default();
        let extraction = processor.extract(b"hello", "image/png");
        assert_eq!(
            extraction,
            Extraction::Unsupported {
                mime_type: "image/png".to_string()
            }
        );
        assert_eq!(extraction.sentinel_text(), "Unsupported file type");
        assert!(matches!(
            processor.extract(b"hello", "not a mime"),
            Extraction::Unsupported { .. }
        ));
    }

    #[test]
    fn test_mime_parameters_and_case_ignored() {
        let bytes = docx_bytes(&["Line"]);
        let declared = format!("{}; charset=binary", DOCX_MIME.to_uppercase());
        assert!(DocumentProcessor::default().extract(&bytes, &declared).is_text());
    }

    #[test]
    fn test_clean_strips_dictionaries_and_arrays() {
        let raw = "Jane Doe << /Type /Page /Resources << /Font 5 0 R >> >> Engineer\n\
                   MediaBox [0 0 612 792] Kids [3 0 R 4 0 R]";
        let cleaned = clean_pdf_text(raw);
        assert_eq!(cleaned, "Jane Doe Engineer\nMediaBox Kids");
    }

    #[test]
    fn test_clean_drops_structural_lines() {
        let raw = "%PDF-1.7\n1 0 obj\nExperienced backend developer\nendobj\nstream\n\
                   endstream\nxref\ntrailer\nstartxref\n%%EOF";
        assert_eq!(clean_pdf_text(raw), "Experienced backend developer");
    }

    #[test]
    fn test_clean_drops_unprintable_lines_and_collapses_whitespace() {
        let raw = "Skills:   Rust,\t\tGo\n\n\n\u{0}\u{1}\u{2}\u{3}\u{4}\u{5}\u{6}\u{7}\u{8}\u{e}\n   Kubernetes   ";
        assert_eq!(clean_pdf_text(raw), "Skills: Rust, Go\nKubernetes");
    }

    #[test]
    fn test_clean_keeps_ordinary_brackets() {
        assert_eq!(clean_pdf_text("Projects [open source]"), "Projects [open source]");
    }
}

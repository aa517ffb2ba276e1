//! Plain-text extraction for documents in the corpus.
//!
//! [`Extractor::extract_text`] never fails: unsupported formats, oversized
//! files and parser errors all yield `""`, which callers read as "no text
//! available". [`Extractor::try_extract_text`] keeps the reason for
//! diagnostics.
//!
//! Format is chosen by file extension:
//!
//! | Extension | Handling |
//! |-----------|----------|
//! | `txt`, `md`, `csv`, `json` | lossy UTF-8 decode |
//! | `pdf` | per-page text, concatenated in page order |
//! | `docx` | `word/document.xml` text runs, one line per paragraph |

use std::io::Read;
use std::path::Path;

/// Cap on the decompressed size of `word/document.xml` (zip-bomb guard).
const MAX_DOCX_XML_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "md" | "csv" | "json" => Some(DocumentFormat::PlainText),
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported document format: {0}")]
    Unsupported(String),
    #[error("document is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Document text extractor with an optional input size cap.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    max_bytes: Option<u64>,
}

impl Extractor {
    pub fn new(max_bytes: Option<u64>) -> Self {
        Self { max_bytes }
    }

    /// Extracted text, or `""` when none is available for any reason.
    pub fn extract_text(&self, path: &Path) -> String {
        match self.try_extract_text(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "no text extracted");
                String::new()
            }
        }
    }

    pub fn try_extract_text(&self, path: &Path) -> Result<String, ExtractError> {
        let format = DocumentFormat::from_path(path).ok_or_else(|| {
            ExtractError::Unsupported(
                path.extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_else(|| "(no extension)".to_string()),
            )
        })?;

        if let Some(limit) = self.max_bytes {
            let size = std::fs::metadata(path)?.len();
            if size > limit {
                return Err(ExtractError::TooLarge { size, limit });
            }
        }

        let bytes = std::fs::read(path)?;
        match format {
            DocumentFormat::PlainText => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            DocumentFormat::Pdf => extract_pdf(&bytes),
            DocumentFormat::Docx => extract_docx(&bytes),
        }
    }
}

/// [`Extractor::extract_text`] with no size cap.
pub fn extract_text(path: &Path) -> String {
    Extractor::default().extract_text(path)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract can panic on malformed input. The default panic hook still
    // prints the panic message to stderr; the file is then treated as having
    // no text.
    let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    match outcome {
        Ok(Ok(pages)) => Ok(pages.concat()),
        Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf("parser panicked".to_string())),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_DOCX_XML_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if xml.len() as u64 >= MAX_DOCX_XML_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    docx_body_text(&xml)
}

fn docx_body_text(xml: &[u8]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_run_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" if !out.is_empty() && !out.ends_with('\n') => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_run_text => {
                let text = t.unescape().map_err(|e| ExtractError::Docx(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end().to_string())
}

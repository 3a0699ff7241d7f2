//! Multi-format text extraction
//!
//! Converts uploaded bytes into normalized text. Stateless: the extension is
//! checked before any parsing, parser faults are converted to `CorruptFile`,
//! and an extraction that yields no visible text is reported as
//! `EmptyExtraction` rather than silently producing an empty document.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::{Error, Result};
use crate::types::document::FileType;

/// Extract normalized text from raw document bytes.
///
/// Page and paragraph boundaries become whitespace; document structure is
/// deliberately not preserved.
pub fn extract(filename: &str, data: &[u8]) -> Result<String> {
    let file_type = FileType::from_filename(filename).ok_or_else(|| {
        let ext = filename
            .rsplit('.')
            .next()
            .filter(|e| e.len() < filename.len())
            .unwrap_or("(none)");
        Error::UnsupportedExtension(ext.to_string())
    })?;

    let content = match file_type {
        FileType::Pdf => extract_pdf(data)?,
        FileType::Docx => extract_docx(data)?,
        FileType::Txt => String::from_utf8_lossy(data).to_string(),
    };

    let normalized = normalize(&content);
    if normalized.is_empty() {
        return Err(Error::EmptyExtraction);
    }

    Ok(normalized)
}

/// Strip NUL bytes, trim each line, drop blank lines
fn normalize(content: &str) -> String {
    content
        .replace('\0', "")
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract PDF text, falling back to a raw lopdf walk when pdf-extract fails.
///
/// pdf-extract can panic on malformed fonts; the panic is caught and reported
/// as CorruptFile so a bad upload never aborts the request.
fn extract_pdf(data: &[u8]) -> Result<String> {
    let primary = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(data)));

    match primary {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => {
            tracing::warn!("pdf-extract failed: {}, trying lopdf fallback", e);
            extract_pdf_fallback(data)
        }
        Err(_) => {
            tracing::warn!("pdf-extract panicked, trying lopdf fallback");
            extract_pdf_fallback(data)
        }
    }
}

/// Fallback PDF text extraction using lopdf directly
fn extract_pdf_fallback(data: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| Error::CorruptFile(format!("Failed to load PDF: {}", e)))?;

    let mut all_text = String::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => {
                all_text.push_str(&text);
                all_text.push('\n');
            }
            Err(e) => {
                tracing::debug!("Could not extract text from page {}: {}", page_num, e);
            }
        }
    }

    Ok(all_text)
}

/// Extract DOCX text by walking paragraphs in document order
fn extract_docx(data: &[u8]) -> Result<String> {
    let parsed = catch_unwind(AssertUnwindSafe(|| docx_rs::read_docx(data)));

    let doc = match parsed {
        Ok(Ok(doc)) => doc,
        Ok(Err(e)) => return Err(Error::CorruptFile(format!("Failed to read DOCX: {}", e))),
        Err(_) => return Err(Error::CorruptFile("DOCX parser fault".to_string())),
    };

    let mut content = String::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            for child in p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            content.push_str(&t.text);
                        }
                    }
                }
            }
            content.push('\n');
        }
    }

    Ok(content)
}

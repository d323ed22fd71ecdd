//! Text extraction from PDF bytes.
//!
//! The entry point is [`extract`]: give it the raw bytes of a PDF file
//! and get back the document's text, pages in order, one `\n` between
//! pages. [`extract_with_warnings`] additionally reports the
//! recoverable problems encountered on the way (skipped pages,
//! unsupported stream filters, character codes with no Unicode
//! mapping).
//!
//! Parsing is self-contained and performs no I/O. Damaged files are
//! handled as far as possible: a broken cross-reference table falls
//! back to scanning the file for object markers, and a page that fails
//! to decode contributes empty text instead of failing the document.

pub mod core;

use crate::core::content::TextInterpreter;
use crate::core::filters;
use crate::core::object::PdfObject;

pub use crate::core::document::Document;
pub use crate::core::error::{PdfError, PdfResult, Warning};
pub use crate::core::page::Page;

/// Extraction output: the document text plus any recoverable problems.
pub struct Extraction {
    pub text: String,
    pub warnings: Vec<Warning>,
}

/// Extracts the text of a PDF document.
///
/// Fails only when the document structure is beyond recovery (no
/// parseable objects, or no page tree). Per-page problems degrade to
/// empty page text.
pub fn extract(bytes: Vec<u8>) -> Result<String, PdfError> {
    extract_with_warnings(bytes).map(|e| e.text)
}

/// Like [`extract`], but also returns the warnings collected while
/// parsing and decoding.
pub fn extract_with_warnings(bytes: Vec<u8>) -> Result<Extraction, PdfError> {
    let mut doc = Document::open(bytes)?;
    let mut warnings = doc.take_warnings();
    let mut page_texts: Vec<String> = Vec::with_capacity(doc.page_count());

    let (pages, xref) = doc.parts_mut();
    for page in pages {
        let (text, mut page_warnings) = extract_page(page, xref);
        warnings.append(&mut page_warnings);
        page_texts.push(text);
    }

    Ok(Extraction {
        text: page_texts.join("\n"),
        warnings,
    })
}

/// Extracts and normalizes one page. Failures are reported as warnings
/// and yield empty text so the page keeps its slot in the output.
fn extract_page(page: &Page, xref: &mut crate::core::XRef) -> (String, Vec<Warning>) {
    let index = page.index();
    let streams = match page.content_streams(xref) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("page {index}: skipped: {e}");
            return (
                String::new(),
                vec![Warning::PageSkipped {
                    page: index,
                    reason: e.to_string(),
                }],
            );
        }
    };

    let resources = page.resources().cloned();
    let mut interp = TextInterpreter::new(xref, index);
    let mut warnings = Vec::new();
    for stream in &streams {
        let (dict, data) = match &**stream {
            PdfObject::Stream { dict, data } => (dict, data),
            _ => continue,
        };
        match filters::decode_stream(dict, data) {
            Ok(decoded) => interp.process(decoded, resources.clone()),
            Err(PdfError::UnsupportedFilter(filter)) => {
                warnings.push(Warning::UnsupportedFilter {
                    page: index,
                    filter,
                });
            }
            Err(e) => {
                log::warn!("page {index}: content stream undecodable: {e}");
                warnings.push(Warning::PageSkipped {
                    page: index,
                    reason: e.to_string(),
                });
            }
        }
    }

    let (raw, mut interp_warnings) = interp.finish();
    warnings.append(&mut interp_warnings);
    (normalize(&raw), warnings)
}

/// Cleans up interpreter output: per line, runs of whitespace collapse
/// to single spaces and surrounding whitespace is trimmed; blank lines
/// are dropped.
fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for line in raw.lines() {
        let mut words = line.split_whitespace();
        let first = match words.next() {
            Some(w) => w,
            None => continue,
        };
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(first);
        for word in words {
            out.push(' ');
            out.push_str(word);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn normalize_collapses_internal_whitespace() {
        assert_eq!(normalize("a  b\t c"), "a b c");
    }

    #[test]
    fn normalize_trims_line_edges() {
        assert_eq!(normalize("  hello \nworld  "), "hello\nworld");
    }

    #[test]
    fn normalize_drops_blank_lines() {
        assert_eq!(normalize("one\n\n   \ntwo"), "one\ntwo");
    }

    #[test]
    fn normalize_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n \n"), "");
    }
}

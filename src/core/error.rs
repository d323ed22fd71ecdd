use thiserror::Error;

/// Errors produced while parsing PDF structure or decoding streams.
///
/// Only `MalformedStructure` escapes to callers of the top-level
/// extraction API; the other variants describe internal faults that
/// either get recovered from (per page, per stream) or are wrapped
/// into `MalformedStructure` when nothing at all can be salvaged.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("malformed structure: {0}")]
    MalformedStructure(String),

    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("invalid position {pos} (data length {length})")]
    InvalidPosition { pos: usize, length: usize },

    #[error("invalid byte range {begin}..{end}")]
    InvalidByteRange { begin: usize, end: usize },

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("invalid cross-reference entry for object {num}")]
    InvalidXRefEntry { num: u32 },

    #[error("object {num} {gen} not found")]
    ObjectNotFound { num: u32, gen: u16 },

    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("stream decode failed: {0}")]
    Decode(String),
}

pub type PdfResult<T> = Result<T, PdfError>;

/// Recoverable conditions recorded during extraction.
///
/// Warnings never interrupt the pipeline; they are accumulated on the
/// extraction result and logged through the `log` facade as they occur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A content stream declared a compression filter this crate does not
    /// decode; the stream contributed no text.
    UnsupportedFilter { page: usize, filter: String },
    /// A character code had no mapping in the active font's encoding;
    /// U+FFFD was substituted.
    EncodingGap { page: usize, code: u32 },
    /// A page (or page subtree) could not be resolved and was skipped.
    PageSkipped { page: usize, reason: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnsupportedFilter { page, filter } => {
                write!(f, "page {page}: unsupported filter {filter}")
            }
            Warning::EncodingGap { page, code } => {
                write!(f, "page {page}: no encoding for character code {code:#x}")
            }
            Warning::PageSkipped { page, reason } => {
                write!(f, "page {page}: skipped ({reason})")
            }
        }
    }
}

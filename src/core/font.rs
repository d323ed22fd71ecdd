use super::cmap::CMap;
use super::encoding::{self, EncodingTable};
use super::error::PdfResult;
use super::filters;
use super::object::{Dict, PdfObject};
use super::xref::XRef;
use rustc_hash::FxHashSet;

const REPLACEMENT: char = '\u{FFFD}';

/// A font as seen by text extraction: a mapping from the character
/// codes in show-operator strings to Unicode text.
///
/// Simple fonts (Type1, TrueType, Type3) use one-byte codes decoded
/// through a `/ToUnicode` CMap when present, else through a base
/// encoding table with `/Differences` applied. Composite (Type0) fonts
/// use two-byte codes and rely on `/ToUnicode`; without one, every code
/// is an encoding gap.
pub struct Font {
    composite: bool,
    to_unicode: Option<CMap>,
    table: Option<EncodingTable>,
}

impl Font {
    pub fn load(dict: &Dict, xref: &mut XRef) -> PdfResult<Font> {
        let subtype = dict.get("Subtype").and_then(PdfObject::as_name);
        let composite = subtype == Some("Type0");

        let to_unicode = load_to_unicode(dict, xref);
        let table = if composite {
            None
        } else {
            Some(build_simple_encoding(dict, xref))
        };

        Ok(Font {
            composite,
            to_unicode,
            table,
        })
    }

    /// Whether show-string bytes are consumed in two-byte units.
    pub fn is_composite(&self) -> bool {
        self.composite
    }

    /// Decodes a show string, appending text to `out`. Codes with no
    /// mapping contribute U+FFFD and are recorded in `gaps`.
    pub fn decode_into(&self, bytes: &[u8], out: &mut String, gaps: &mut FxHashSet<u32>) {
        if self.composite {
            let mut chunks = bytes.chunks_exact(2);
            for pair in &mut chunks {
                let code = u16::from_be_bytes([pair[0], pair[1]]) as u32;
                self.push_code(code, out, gaps);
            }
            if let Some(&last) = chunks.remainder().first() {
                self.push_code(last as u32, out, gaps);
            }
        } else {
            for &b in bytes {
                self.push_code(b as u32, out, gaps);
            }
        }
    }

    fn push_code(&self, code: u32, out: &mut String, gaps: &mut FxHashSet<u32>) {
        if let Some(text) = self.to_unicode.as_ref().and_then(|c| c.lookup(code)) {
            out.push_str(text);
            return;
        }
        if let Some(ch) = self
            .table
            .as_ref()
            .and_then(|t| t.get(code as usize).copied().flatten())
        {
            out.push(ch);
            return;
        }
        out.push(REPLACEMENT);
        gaps.insert(code);
    }
}

fn load_to_unicode(dict: &Dict, xref: &mut XRef) -> Option<CMap> {
    let obj = xref.resolve_entry(dict, "ToUnicode")?;
    let (sdict, data) = match &*obj {
        PdfObject::Stream { dict, data } => (dict, data),
        _ => {
            log::warn!("/ToUnicode is not a stream");
            return None;
        }
    };
    let decoded = match filters::decode_stream(sdict, data) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("/ToUnicode stream undecodable: {e}");
            return None;
        }
    };
    match CMap::parse(&decoded) {
        Ok(cmap) if !cmap.is_empty() => Some(cmap),
        Ok(_) => None,
        Err(e) => {
            log::warn!("/ToUnicode CMap unparsable: {e}");
            None
        }
    }
}

/// Builds the one-byte code table: base encoding (named, or Standard)
/// overlaid with the `/Differences` array if the encoding is a
/// dictionary.
fn build_simple_encoding(dict: &Dict, xref: &mut XRef) -> EncodingTable {
    let enc = match xref.resolve_entry(dict, "Encoding") {
        Some(obj) => obj,
        None => return encoding::standard(),
    };
    match &*enc {
        PdfObject::Name(name) => encoding::by_name(name).unwrap_or_else(|| {
            log::warn!("unknown encoding /{name}, falling back to Standard");
            encoding::standard()
        }),
        PdfObject::Dictionary(enc_dict) => {
            let mut table = enc_dict
                .get("BaseEncoding")
                .and_then(PdfObject::as_name)
                .and_then(encoding::by_name)
                .unwrap_or_else(encoding::standard);
            if let Some(diffs) = enc_dict.get("Differences").and_then(PdfObject::as_array) {
                apply_differences(&mut table, diffs);
            }
            table
        }
        other => {
            log::warn!("unexpected /Encoding value: {other:?}");
            encoding::standard()
        }
    }
}

/// `/Differences` alternates code indices and runs of glyph names:
/// `[32 /space /exclam 65 /A ...]`.
fn apply_differences(table: &mut EncodingTable, diffs: &[PdfObject]) {
    let mut code: usize = 0;
    for item in diffs {
        match item {
            PdfObject::Number(n) if *n >= 0.0 && *n < 256.0 => code = *n as usize,
            PdfObject::Name(glyph) => {
                if code < 256 {
                    let ch = encoding::glyph_to_char(glyph);
                    if ch.is_none() {
                        log::warn!("unknown glyph name /{glyph} in /Differences");
                    }
                    table[code] = ch;
                    code += 1;
                }
            }
            other => log::warn!("unexpected /Differences item: {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stream::ByteStream;

    fn empty_xref() -> XRef {
        XRef::new(ByteStream::new(Vec::new()))
    }

    fn decode(font: &Font, bytes: &[u8]) -> (String, usize) {
        let mut out = String::new();
        let mut gaps = FxHashSet::default();
        font.decode_into(bytes, &mut out, &mut gaps);
        (out, gaps.len())
    }

    #[test]
    fn simple_font_defaults_to_standard_encoding() {
        let dict = Dict::default();
        let font = Font::load(&dict, &mut empty_xref()).unwrap();
        assert!(!font.is_composite());
        let (text, gaps) = decode(&font, b"Hello World");
        assert_eq!(text, "Hello World");
        assert_eq!(gaps, 0);
    }

    #[test]
    fn named_encoding_is_used() {
        let mut dict = Dict::default();
        dict.insert("Encoding".into(), PdfObject::Name("WinAnsiEncoding".into()));
        let font = Font::load(&dict, &mut empty_xref()).unwrap();
        let (text, _) = decode(&font, &[0x93, b'q', 0x94]);
        assert_eq!(text, "\u{201C}q\u{201D}");
    }

    #[test]
    fn unmapped_code_yields_replacement_and_gap() {
        let dict = Dict::default();
        let font = Font::load(&dict, &mut empty_xref()).unwrap();
        // 0x7F is unassigned in StandardEncoding
        let (text, gaps) = decode(&font, &[b'a', 0x7F]);
        assert_eq!(text, "a\u{FFFD}");
        assert_eq!(gaps, 1);
    }

    #[test]
    fn differences_override_base() {
        let mut enc = Dict::default();
        enc.insert(
            "BaseEncoding".into(),
            PdfObject::Name("WinAnsiEncoding".into()),
        );
        enc.insert(
            "Differences".into(),
            PdfObject::Array(vec![
                PdfObject::Number(65.0),
                PdfObject::Name("eacute".into()),
                PdfObject::Name("zero".into()),
            ]),
        );
        let mut dict = Dict::default();
        dict.insert("Encoding".into(), PdfObject::Dictionary(enc));
        let font = Font::load(&dict, &mut empty_xref()).unwrap();
        let (text, _) = decode(&font, b"AB C");
        assert_eq!(text, "é0 C");
    }

    #[test]
    fn composite_font_without_tounicode_is_all_gaps() {
        let mut dict = Dict::default();
        dict.insert("Subtype".into(), PdfObject::Name("Type0".into()));
        let font = Font::load(&dict, &mut empty_xref()).unwrap();
        assert!(font.is_composite());
        let (text, gaps) = decode(&font, &[0x00, 0x41, 0x00, 0x42]);
        assert_eq!(text, "\u{FFFD}\u{FFFD}");
        assert_eq!(gaps, 2);
    }
}

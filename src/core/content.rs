use super::error::Warning;
use super::font::Font;
use super::lexer::Lexer;
use super::object::{ObjRef, PdfObject};
use super::parser::Parser;
use super::stream::ByteStream;
use super::xref::XRef;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::rc::Rc;

/// TJ adjustments below this (thousandths of an em, negative moves the
/// pen right) are treated as word spaces.
const TJ_SPACE_THRESHOLD: f64 = -100.0;
/// Recursion limit for form XObjects.
const MAX_FORM_DEPTH: usize = 8;
/// Operand stack bound; conforming content never needs more.
const MAX_OPERANDS: usize = 32;

/// The content operators text extraction reacts to. Everything else
/// (path construction, color, graphics state) only consumes operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpCode {
    BeginText,
    EndText,
    SetFont,
    MoveText,
    MoveTextSetLeading,
    SetTextMatrix,
    NextLine,
    ShowText,
    ShowSpacedText,
    NextLineShowText,
    NextLineSetSpacingShowText,
    PaintXObject,
    BeginInlineImage,
}

impl OpCode {
    fn from_command(cmd: &str) -> Option<OpCode> {
        Some(match cmd {
            "BT" => OpCode::BeginText,
            "ET" => OpCode::EndText,
            "Tf" => OpCode::SetFont,
            "Td" => OpCode::MoveText,
            "TD" => OpCode::MoveTextSetLeading,
            "Tm" => OpCode::SetTextMatrix,
            "T*" => OpCode::NextLine,
            "Tj" => OpCode::ShowText,
            "TJ" => OpCode::ShowSpacedText,
            "'" => OpCode::NextLineShowText,
            "\"" => OpCode::NextLineSetSpacingShowText,
            "Do" => OpCode::PaintXObject,
            "BI" => OpCode::BeginInlineImage,
            _ => return None,
        })
    }
}

type Operands = SmallVec<[PdfObject; 8]>;

/// Interprets a page's content streams and accumulates their text.
///
/// Only the state text extraction needs is tracked: whether a text
/// object is open, the active font, and the last vertical position (to
/// turn line moves into line breaks). Show strings are decoded through
/// the active font; unmapped codes become U+FFFD and are reported once
/// per code as an `EncodingGap` warning.
pub struct TextInterpreter<'a> {
    xref: &'a mut XRef,
    page: usize,
    fonts: FxHashMap<ObjRef, Rc<Font>>,
    font: Option<Rc<Font>>,
    in_text: bool,
    last_baseline: Option<f64>,
    out: String,
    gaps: FxHashSet<u32>,
    warnings: Vec<Warning>,
}

impl<'a> TextInterpreter<'a> {
    pub fn new(xref: &'a mut XRef, page: usize) -> TextInterpreter<'a> {
        TextInterpreter {
            xref,
            page,
            fonts: FxHashMap::default(),
            font: None,
            in_text: false,
            last_baseline: None,
            out: String::new(),
            gaps: FxHashSet::default(),
            warnings: Vec::new(),
        }
    }

    /// Runs one decoded content stream. Multiple calls accumulate, so a
    /// page's `/Contents` array behaves as one logical stream.
    pub fn process(&mut self, data: Vec<u8>, resources: Option<Rc<PdfObject>>) {
        self.execute(data, &resources, 0);
    }

    /// The accumulated text and per-page warnings.
    pub fn finish(self) -> (String, Vec<Warning>) {
        let mut warnings = self.warnings;
        let mut gaps: Vec<u32> = self.gaps.into_iter().collect();
        gaps.sort_unstable();
        let page = self.page;
        warnings.extend(
            gaps.into_iter()
                .map(|code| Warning::EncodingGap { page, code }),
        );
        (self.out, warnings)
    }

    fn execute(&mut self, data: Vec<u8>, resources: &Option<Rc<PdfObject>>, depth: usize) {
        let mut parser = Parser::new(Lexer::new(ByteStream::new(data)));
        let mut operands = Operands::new();
        loop {
            match parser.next_object() {
                Ok(PdfObject::Eof) => break,
                Ok(PdfObject::Command(cmd)) => {
                    if let Some(op) = OpCode::from_command(&cmd) {
                        if op == OpCode::BeginInlineImage {
                            if let Err(e) = parser.skip_inline_image() {
                                log::warn!("page {}: unterminated inline image: {e}", self.page);
                                break;
                            }
                        } else {
                            self.apply(op, &operands, resources, depth);
                        }
                    }
                    operands.clear();
                }
                Ok(obj) => {
                    if operands.len() < MAX_OPERANDS {
                        operands.push(obj);
                    }
                }
                Err(e) => {
                    // salvage whatever was decoded before the fault
                    log::warn!("page {}: content stream error: {e}", self.page);
                    break;
                }
            }
        }
    }

    fn apply(
        &mut self,
        op: OpCode,
        operands: &Operands,
        resources: &Option<Rc<PdfObject>>,
        depth: usize,
    ) {
        match op {
            OpCode::BeginText => {
                self.in_text = true;
                self.last_baseline = None;
            }
            OpCode::EndText => {
                self.in_text = false;
            }
            OpCode::SetFont => {
                if let Some(name) = operands.first().and_then(PdfObject::as_name) {
                    self.font = self.resolve_font(name, resources);
                }
            }
            OpCode::MoveText | OpCode::MoveTextSetLeading => {
                if self.in_text {
                    let ty = operands.get(1).and_then(PdfObject::as_number).unwrap_or(0.0);
                    if ty != 0.0 {
                        self.line_break();
                    }
                }
            }
            OpCode::SetTextMatrix => {
                if self.in_text {
                    let f = operands.get(5).and_then(PdfObject::as_number);
                    if let Some(f) = f {
                        if let Some(prev) = self.last_baseline {
                            if (f - prev).abs() > f64::EPSILON {
                                self.line_break();
                            }
                        }
                        self.last_baseline = Some(f);
                    }
                }
            }
            OpCode::NextLine => {
                if self.in_text {
                    self.line_break();
                }
            }
            OpCode::ShowText => {
                if self.in_text {
                    if let Some(bytes) = operands.first().and_then(PdfObject::as_string_bytes) {
                        self.show(bytes);
                    }
                }
            }
            OpCode::ShowSpacedText => {
                if self.in_text {
                    if let Some(items) = operands.first().and_then(PdfObject::as_array) {
                        for item in items {
                            if let Some(bytes) = item.as_string_bytes() {
                                self.show(bytes);
                            } else if let Some(adjust) = item.as_number() {
                                if adjust < TJ_SPACE_THRESHOLD && !self.out.ends_with(' ') {
                                    self.out.push(' ');
                                }
                            }
                        }
                    }
                }
            }
            OpCode::NextLineShowText => {
                if self.in_text {
                    self.line_break();
                    if let Some(bytes) = operands.first().and_then(PdfObject::as_string_bytes) {
                        self.show(bytes);
                    }
                }
            }
            OpCode::NextLineSetSpacingShowText => {
                // operands: word-spacing, char-spacing, string
                if self.in_text {
                    self.line_break();
                    if let Some(bytes) = operands.get(2).and_then(PdfObject::as_string_bytes) {
                        self.show(bytes);
                    }
                }
            }
            OpCode::PaintXObject => {
                if let Some(name) = operands.first().and_then(PdfObject::as_name) {
                    self.run_form_xobject(name, resources, depth);
                }
            }
            OpCode::BeginInlineImage => {}
        }
    }

    fn line_break(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn show(&mut self, bytes: &[u8]) {
        match &self.font {
            Some(font) => {
                let font = font.clone();
                font.decode_into(bytes, &mut self.out, &mut self.gaps);
            }
            // no font set: pass the bytes through as text
            None => self.out.push_str(&String::from_utf8_lossy(bytes)),
        }
    }

    /// Looks up `/Resources -> /Font -> name`, caching loaded fonts by
    /// their object reference.
    fn resolve_font(
        &mut self,
        name: &str,
        resources: &Option<Rc<PdfObject>>,
    ) -> Option<Rc<Font>> {
        let res_dict = resources.as_deref()?.as_dict()?;
        let fonts = self.xref.resolve_entry(res_dict, "Font")?;
        let fonts_dict = fonts.as_dict()?;
        let entry = fonts_dict.get(name)?;

        if let Some(r) = entry.as_reference() {
            if let Some(cached) = self.fonts.get(&r) {
                return Some(cached.clone());
            }
        }
        let resolved = match self.xref.fetch_if_ref(entry) {
            Ok(obj) => obj,
            Err(e) => {
                log::warn!("page {}: font /{name} unresolvable: {e}", self.page);
                return None;
            }
        };
        let dict = resolved.as_dict()?;
        match Font::load(dict, self.xref) {
            Ok(font) => {
                let font = Rc::new(font);
                if let Some(r) = entry.as_reference() {
                    self.fonts.insert(r, font.clone());
                }
                Some(font)
            }
            Err(e) => {
                log::warn!("page {}: font /{name} unusable: {e}", self.page);
                None
            }
        }
    }

    /// Executes a `/Subtype /Form` XObject, which may carry its own
    /// resources and nested text.
    fn run_form_xobject(
        &mut self,
        name: &str,
        resources: &Option<Rc<PdfObject>>,
        depth: usize,
    ) {
        if depth >= MAX_FORM_DEPTH {
            log::warn!("page {}: form nesting too deep at /{name}", self.page);
            return;
        }
        let res_dict = match resources.as_deref().and_then(PdfObject::as_dict) {
            Some(d) => d,
            None => return,
        };
        let xobjects = match self.xref.resolve_entry(res_dict, "XObject") {
            Some(x) => x,
            None => return,
        };
        let entry = match xobjects.as_dict().and_then(|d| d.get(name)) {
            Some(e) => e.clone(),
            None => return,
        };
        let form = match self.xref.fetch_if_ref(&entry) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("page {}: XObject /{name} unresolvable: {e}", self.page);
                return;
            }
        };
        let (dict, data) = match &*form {
            PdfObject::Stream { dict, data } => (dict, data),
            _ => return,
        };
        if dict.get("Subtype").and_then(PdfObject::as_name) != Some("Form") {
            return;
        }
        let decoded = match super::filters::decode_stream(dict, data) {
            Ok(d) => d,
            Err(super::error::PdfError::UnsupportedFilter(filter)) => {
                self.warnings.push(Warning::UnsupportedFilter {
                    page: self.page,
                    filter,
                });
                return;
            }
            Err(e) => {
                log::warn!("page {}: XObject /{name} undecodable: {e}", self.page);
                return;
            }
        };
        // a form's own resources shadow the page's
        let form_resources = dict
            .get("Resources")
            .and_then(|r| self.xref.fetch_if_ref(r).ok())
            .or_else(|| resources.clone());
        self.execute(decoded, &form_resources, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stream::ByteStream;

    fn run(content: &[u8]) -> String {
        let mut xref = XRef::new(ByteStream::new(Vec::new()));
        let mut interp = TextInterpreter::new(&mut xref, 0);
        interp.process(content.to_vec(), None);
        interp.finish().0
    }

    #[test]
    fn show_text_without_font_passes_through() {
        assert_eq!(run(b"BT (Hello World) Tj ET"), "Hello World");
    }

    #[test]
    fn show_outside_text_object_is_ignored() {
        assert_eq!(run(b"(stray) Tj"), "");
    }

    #[test]
    fn line_moves_break_lines() {
        assert_eq!(
            run(b"BT 0 -14 Td (one) Tj 0 -14 Td (two) Tj ET"),
            "one\ntwo"
        );
        assert_eq!(run(b"BT (a) Tj T* (b) Tj ET"), "a\nb");
    }

    #[test]
    fn horizontal_move_does_not_break() {
        assert_eq!(run(b"BT (a) Tj 20 0 Td (b) Tj ET"), "ab");
    }

    #[test]
    fn text_matrix_vertical_change_breaks() {
        assert_eq!(
            run(b"BT 1 0 0 1 72 700 Tm (x) Tj 1 0 0 1 72 686 Tm (y) Tj ET"),
            "x\ny"
        );
        // same baseline: no break
        assert_eq!(
            run(b"BT 1 0 0 1 72 700 Tm (x) Tj 1 0 0 1 200 700 Tm (y) Tj ET"),
            "xy"
        );
    }

    #[test]
    fn spaced_show_inserts_word_spaces() {
        assert_eq!(
            run(b"BT [(Hel) 10 (lo) -250 (World)] TJ ET"),
            "Hello World"
        );
    }

    #[test]
    fn quote_operators_break_then_show() {
        assert_eq!(run(b"BT (first) Tj (second) ' ET"), "first\nsecond");
        assert_eq!(run(b"BT (a) Tj 1 2 (b) \" ET"), "a\nb");
    }

    #[test]
    fn hex_show_strings_work() {
        assert_eq!(run(b"BT <48 65 6C 6C 6F> Tj ET"), "Hello");
    }

    #[test]
    fn inline_images_are_skipped() {
        assert_eq!(
            run(b"BT (a) Tj ET BI /W 1 /H 1 /BPC 8 ID \xde\xad\xbe\xef EI BT (b) Tj ET"),
            "ab"
        );
    }

    #[test]
    fn garbage_tail_keeps_earlier_text() {
        assert_eq!(run(b"BT (kept) Tj ET \xff\xfe\xfd"), "kept");
    }
}

use super::error::{PdfError, PdfResult};
use super::lexer::{Lexer, Token};
use super::object::{Dict, ObjRef, PdfObject};

/// Token-to-object parser.
///
/// Works with one token of lookahead, implemented as lexer
/// checkpoint/restore rather than a token buffer: after a candidate
/// prefix (`N G` possibly followed by `R`, or a dictionary possibly
/// followed by `stream`) the lexer is rewound if the continuation does
/// not materialize. Stream payloads are sliced straight out of the
/// underlying byte stream, bypassing the lexer.
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Parser {
        Parser { lexer }
    }

    pub fn next_object(&mut self) -> PdfResult<PdfObject> {
        let tok = self.lexer.next_token()?;
        self.object_from(tok)
    }

    fn object_from(&mut self, tok: Token) -> PdfResult<PdfObject> {
        match tok {
            Token::Eof => Ok(PdfObject::Eof),
            Token::Null => Ok(PdfObject::Null),
            Token::Boolean(b) => Ok(PdfObject::Boolean(b)),
            Token::Number(n) => self.number_or_reference(n),
            Token::String(s) => Ok(PdfObject::String(s)),
            Token::HexString(s) => Ok(PdfObject::HexString(s)),
            Token::Name(n) => Ok(PdfObject::Name(n)),
            Token::Command(c) => Ok(PdfObject::Command(c)),
            Token::ArrayStart => self.parse_array(),
            Token::DictStart => self.parse_dictionary(),
            Token::ArrayEnd => Err(PdfError::Syntax("unexpected ']'".into())),
            Token::DictEnd => Err(PdfError::Syntax("unexpected '>>'".into())),
        }
    }

    /// Distinguishes a plain number from the head of an `N G R` indirect
    /// reference.
    fn number_or_reference(&mut self, n: f64) -> PdfResult<PdfObject> {
        if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
            let save = self.lexer.checkpoint();
            if let Ok(Token::Number(g)) = self.lexer.next_token() {
                if g >= 0.0 && g.fract() == 0.0 && g <= u16::MAX as f64 {
                    if let Ok(Token::Command(c)) = self.lexer.next_token() {
                        if c == "R" {
                            return Ok(PdfObject::Reference(ObjRef {
                                num: n as u32,
                                gen: g as u16,
                            }));
                        }
                    }
                }
            }
            self.lexer.seek(save)?;
        }
        Ok(PdfObject::Number(n))
    }

    fn parse_array(&mut self) -> PdfResult<PdfObject> {
        let mut items = Vec::new();
        loop {
            let tok = self.lexer.next_token()?;
            match tok {
                Token::ArrayEnd => break,
                Token::Eof => return Err(PdfError::Syntax("unterminated array".into())),
                other => items.push(self.object_from(other)?),
            }
        }
        Ok(PdfObject::Array(items))
    }

    fn parse_dictionary(&mut self) -> PdfResult<PdfObject> {
        let mut dict = Dict::default();
        loop {
            let tok = self.lexer.next_token()?;
            match tok {
                Token::DictEnd => break,
                Token::Eof => return Err(PdfError::Syntax("unterminated dictionary".into())),
                Token::Name(key) => {
                    let value = self.next_object()?;
                    if value == PdfObject::Eof {
                        return Err(PdfError::Syntax("unterminated dictionary".into()));
                    }
                    dict.insert(key, value);
                }
                other => {
                    // key must be a name; skip the stray token and keep going
                    log::warn!("skipping non-name dictionary key: {other:?}");
                }
            }
        }
        // a dictionary directly followed by the `stream` keyword is a
        // stream object
        let save = self.lexer.checkpoint();
        match self.lexer.next_token() {
            Ok(Token::Command(ref c)) if c == "stream" => self.read_stream(dict),
            _ => {
                self.lexer.seek(save)?;
                Ok(PdfObject::Dictionary(dict))
            }
        }
    }

    /// Slices the raw payload of a stream object.
    ///
    /// The declared `/Length` is trusted only if `endstream` actually
    /// follows it; otherwise (wrong value, or an indirect `/Length`) the
    /// payload boundary is recovered by scanning for the `endstream`
    /// keyword.
    fn read_stream(&mut self, dict: Dict) -> PdfResult<PdfObject> {
        let stream = self.lexer.stream();
        // data begins after the EOL that terminates the `stream` keyword
        let mut start = self.lexer.pos();
        if stream.byte_at(start) == Some(b'\r') {
            start += 1;
        }
        if stream.byte_at(start) == Some(b'\n') {
            start += 1;
        }

        let declared = dict
            .get("Length")
            .and_then(PdfObject::as_int)
            .and_then(|v| usize::try_from(v).ok());

        let mut end = None;
        if let Some(len) = declared {
            let candidate = start.checked_add(len).unwrap_or(usize::MAX);
            if candidate <= stream.end_pos() && self.endstream_follows(candidate) {
                end = Some(candidate);
            }
        }

        let (end, keyword_at) = match end {
            Some(e) => {
                let at = stream
                    .find(b"endstream", e)
                    .ok_or_else(|| PdfError::Syntax("missing endstream".into()))?;
                (e, at)
            }
            None => {
                let at = stream
                    .find(b"endstream", start)
                    .ok_or_else(|| PdfError::Syntax("missing endstream".into()))?;
                // drop the EOL the producer wrote before the keyword
                let mut e = at;
                if e > start && stream.byte_at(e - 1) == Some(b'\n') {
                    e -= 1;
                }
                if e > start && stream.byte_at(e - 1) == Some(b'\r') {
                    e -= 1;
                }
                (e, at)
            }
        };

        let data = stream.slice(start, end)?.to_vec();
        self.lexer.seek(keyword_at + b"endstream".len())?;
        Ok(PdfObject::Stream { dict, data })
    }

    fn endstream_follows(&self, mut pos: usize) -> bool {
        let stream = self.lexer.stream();
        while matches!(stream.byte_at(pos), Some(b' ' | b'\r' | b'\n' | b'\t')) {
            pos += 1;
        }
        stream
            .slice(pos, (pos + 9).min(stream.end_pos()))
            .map(|s| s == b"endstream")
            .unwrap_or(false)
    }

    /// Reads an `N G obj` header at the current position.
    pub fn read_object_header(&mut self) -> PdfResult<(u32, u16)> {
        let t1 = self.lexer.next_token()?;
        let t2 = self.lexer.next_token()?;
        let t3 = self.lexer.next_token()?;
        match (&t1, &t2, &t3) {
            (Token::Number(n), Token::Number(g), Token::Command(c))
                if c == "obj" && n.fract() == 0.0 && g.fract() == 0.0 && *n >= 0.0 && *g >= 0.0 =>
            {
                Ok((*n as u32, *g as u16))
            }
            _ => Err(PdfError::Syntax(format!(
                "expected object header, found {t1:?} {t2:?} {t3:?}"
            ))),
        }
    }

    /// Skips an inline image (`BI ... ID <binary> EI`) in a content
    /// stream. The binary payload cannot be tokenized, so the `EI`
    /// terminator is found by raw scan.
    pub fn skip_inline_image(&mut self) -> PdfResult<()> {
        loop {
            match self.lexer.next_token()? {
                Token::Eof => return Ok(()),
                Token::Command(ref c) if c == "ID" => break,
                _ => {}
            }
        }
        let mut from = self.lexer.pos();
        loop {
            let stream = self.lexer.stream();
            match stream.find(b"EI", from) {
                Some(at) => {
                    let before = at
                        .checked_sub(1)
                        .and_then(|p| stream.byte_at(p))
                        .map(i32::from)
                        .unwrap_or(-1);
                    let after = stream.byte_at(at + 2).map(i32::from).unwrap_or(-1);
                    if super::lexer::is_whitespace(before)
                        && (after == -1
                            || super::lexer::is_whitespace(after)
                            || super::lexer::is_delimiter(after))
                    {
                        return self.lexer.seek(at + 2);
                    }
                    from = at + 2;
                }
                None => {
                    let end = self.lexer.stream().end_pos();
                    return self.lexer.seek(end);
                }
            }
        }
    }

    pub fn lexer_mut(&mut self) -> &mut Lexer {
        &mut self.lexer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stream::ByteStream;

    fn parser_for(input: &[u8]) -> Parser {
        Parser::new(Lexer::new(ByteStream::new(input.to_vec())))
    }

    #[test]
    fn scalar_objects() {
        let mut p = parser_for(b"42 (str) /Name true null");
        assert_eq!(p.next_object().unwrap(), PdfObject::Number(42.0));
        assert_eq!(p.next_object().unwrap(), PdfObject::String(b"str".to_vec()));
        assert_eq!(p.next_object().unwrap(), PdfObject::Name("Name".into()));
        assert_eq!(p.next_object().unwrap(), PdfObject::Boolean(true));
        assert_eq!(p.next_object().unwrap(), PdfObject::Null);
        assert_eq!(p.next_object().unwrap(), PdfObject::Eof);
    }

    #[test]
    fn indirect_reference() {
        let mut p = parser_for(b"12 0 R");
        assert_eq!(
            p.next_object().unwrap(),
            PdfObject::Reference(ObjRef { num: 12, gen: 0 })
        );
    }

    #[test]
    fn two_numbers_are_not_a_reference() {
        let mut p = parser_for(b"1 2 3");
        assert_eq!(p.next_object().unwrap(), PdfObject::Number(1.0));
        assert_eq!(p.next_object().unwrap(), PdfObject::Number(2.0));
        assert_eq!(p.next_object().unwrap(), PdfObject::Number(3.0));
    }

    #[test]
    fn number_gen_pair_before_command() {
        // `1 0 obj` must not be eaten as a reference
        let mut p = parser_for(b"1 0 obj");
        assert_eq!(p.next_object().unwrap(), PdfObject::Number(1.0));
        assert_eq!(p.next_object().unwrap(), PdfObject::Number(0.0));
        assert_eq!(p.next_object().unwrap(), PdfObject::Command("obj".into()));
    }

    #[test]
    fn arrays_nest() {
        let mut p = parser_for(b"[1 [2 3] /N]");
        assert_eq!(
            p.next_object().unwrap(),
            PdfObject::Array(vec![
                PdfObject::Number(1.0),
                PdfObject::Array(vec![PdfObject::Number(2.0), PdfObject::Number(3.0)]),
                PdfObject::Name("N".into()),
            ])
        );
    }

    #[test]
    fn dictionaries() {
        let mut p = parser_for(b"<< /Type /Page /Count 2 /Kids [4 0 R] >>");
        let obj = p.next_object().unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("Type").unwrap().as_name(), Some("Page"));
        assert_eq!(dict.get("Count").unwrap().as_int(), Some(2));
        assert_eq!(
            dict.get("Kids").unwrap().as_array().unwrap()[0],
            PdfObject::Reference(ObjRef { num: 4, gen: 0 })
        );
    }

    #[test]
    fn stream_with_declared_length() {
        let mut p = parser_for(b"<< /Length 5 >>\nstream\nhello\nendstream");
        match p.next_object().unwrap() {
            PdfObject::Stream { dict, data } => {
                assert_eq!(dict.get("Length").unwrap().as_int(), Some(5));
                assert_eq!(data, b"hello");
            }
            other => panic!("expected stream, got {other:?}"),
        }
    }

    #[test]
    fn stream_with_wrong_length_recovers_by_scan() {
        let mut p = parser_for(b"<< /Length 2 >>\nstream\nhello world\nendstream");
        match p.next_object().unwrap() {
            PdfObject::Stream { data, .. } => assert_eq!(data, b"hello world"),
            other => panic!("expected stream, got {other:?}"),
        }
    }

    #[test]
    fn stream_with_indirect_length_recovers_by_scan() {
        let mut p = parser_for(b"<< /Length 9 0 R >>\nstream\npayload\nendstream");
        match p.next_object().unwrap() {
            PdfObject::Stream { data, .. } => assert_eq!(data, b"payload"),
            other => panic!("expected stream, got {other:?}"),
        }
    }

    #[test]
    fn parsing_continues_after_stream() {
        let mut p = parser_for(b"<< /Length 2 >>\nstream\nab\nendstream\nendobj 7");
        assert!(matches!(
            p.next_object().unwrap(),
            PdfObject::Stream { .. }
        ));
        assert_eq!(
            p.next_object().unwrap(),
            PdfObject::Command("endobj".into())
        );
        assert_eq!(p.next_object().unwrap(), PdfObject::Number(7.0));
    }

    #[test]
    fn object_header() {
        let mut p = parser_for(b"12 0 obj << >> endobj");
        assert_eq!(p.read_object_header().unwrap(), (12, 0));
        assert!(matches!(
            p.next_object().unwrap(),
            PdfObject::Dictionary(_)
        ));
    }

    #[test]
    fn inline_image_is_skipped() {
        let mut p = parser_for(b"BI /W 1 /H 1 ID \x00\xff\xfe EI Tj");
        assert_eq!(p.next_object().unwrap(), PdfObject::Command("BI".into()));
        p.skip_inline_image().unwrap();
        assert_eq!(p.next_object().unwrap(), PdfObject::Command("Tj".into()));
    }
}

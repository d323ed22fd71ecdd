use super::error::{PdfError, PdfResult};
use super::stream::ByteStream;

/// A lexical token of PDF object syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Eof,
    Boolean(bool),
    Null,
    Number(f64),
    /// Literal string `(...)`, raw bytes after escape processing.
    String(Vec<u8>),
    /// Hex string `<...>`, decoded bytes.
    HexString(Vec<u8>),
    /// Name `/...` with `#XX` escapes resolved.
    Name(String),
    /// Bare keyword: operators, `obj`, `stream`, `R`, ...
    Command(String),
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
}

/// Sentinel for "no current character" (end of data).
const EOF_CHAR: i32 = -1;

pub fn is_whitespace(c: i32) -> bool {
    matches!(c, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

pub fn is_delimiter(c: i32) -> bool {
    matches!(
        c,
        0x28 | 0x29 | 0x3C | 0x3E | 0x5B | 0x5D | 0x7B | 0x7D | 0x2F | 0x25
    )
}

fn is_regular(c: i32) -> bool {
    c != EOF_CHAR && !is_whitespace(c) && !is_delimiter(c)
}

fn hex_value(c: i32) -> Option<u8> {
    match c {
        0x30..=0x39 => Some((c - 0x30) as u8),
        0x41..=0x46 => Some((c - 0x41 + 10) as u8),
        0x61..=0x66 => Some((c - 0x61 + 10) as u8),
        _ => None,
    }
}

/// Byte-level tokenizer for PDF syntax.
///
/// The lexer keeps one character of context: `current` is the byte at
/// `pos()`, not yet consumed into any token. `checkpoint`/`seek` save
/// and restore that state exactly, which is what the parser leans on for
/// its one-token lookahead (indirect references, `stream` detection).
pub struct Lexer {
    stream: ByteStream,
    current: i32,
}

impl Lexer {
    pub fn new(mut stream: ByteStream) -> Lexer {
        let current = stream.next_byte().map(i32::from).unwrap_or(EOF_CHAR);
        Lexer { stream, current }
    }

    fn next_char(&mut self) -> i32 {
        self.current = self.stream.next_byte().map(i32::from).unwrap_or(EOF_CHAR);
        self.current
    }

    /// Absolute position of the current (unconsumed) character.
    pub fn pos(&self) -> usize {
        if self.current == EOF_CHAR {
            self.stream.pos()
        } else {
            self.stream.pos() - 1
        }
    }

    pub fn checkpoint(&self) -> usize {
        self.pos()
    }

    pub fn seek(&mut self, pos: usize) -> PdfResult<()> {
        self.stream.seek(pos)?;
        self.next_char();
        Ok(())
    }

    pub fn stream(&self) -> &ByteStream {
        &self.stream
    }

    /// Skips whitespace and `%` comments (which run to end of line).
    fn skip_whitespace(&mut self) {
        loop {
            if is_whitespace(self.current) {
                self.next_char();
            } else if self.current == b'%' as i32 {
                while self.current != EOF_CHAR
                    && self.current != 0x0A
                    && self.current != 0x0D
                {
                    self.next_char();
                }
            } else {
                return;
            }
        }
    }

    pub fn next_token(&mut self) -> PdfResult<Token> {
        loop {
            self.skip_whitespace();
            let c = self.current;
            return match c {
                EOF_CHAR => Ok(Token::Eof),
                _ if (0x30..=0x39).contains(&c) || c == b'+' as i32 || c == b'-' as i32
                    || c == b'.' as i32 =>
                {
                    self.get_number()
                }
                _ if c == b'/' as i32 => self.get_name(),
                _ if c == b'(' as i32 => self.get_string(),
                _ if c == b'<' as i32 => {
                    if self.next_char() == b'<' as i32 {
                        self.next_char();
                        Ok(Token::DictStart)
                    } else {
                        self.get_hex_string()
                    }
                }
                _ if c == b'>' as i32 => {
                    if self.next_char() == b'>' as i32 {
                        self.next_char();
                        Ok(Token::DictEnd)
                    } else {
                        log::warn!("stray '>' in input, skipping");
                        continue;
                    }
                }
                _ if c == b'[' as i32 => {
                    self.next_char();
                    Ok(Token::ArrayStart)
                }
                _ if c == b']' as i32 => {
                    self.next_char();
                    Ok(Token::ArrayEnd)
                }
                _ if c == b')' as i32 => {
                    log::warn!("stray ')' in input, skipping");
                    self.next_char();
                    continue;
                }
                _ if c == b'{' as i32 || c == b'}' as i32 => {
                    // PostScript procedure braces; not part of the object
                    // syntax this crate consumes.
                    self.next_char();
                    continue;
                }
                _ => self.get_command(),
            };
        }
    }

    /// Parses a numeric token. Sign, integer part, fractional part;
    /// malformed digits degrade to 0 rather than aborting the parse.
    fn get_number(&mut self) -> PdfResult<Token> {
        let mut buf = String::new();
        if self.current == b'+' as i32 || self.current == b'-' as i32 {
            if self.current == b'-' as i32 {
                buf.push('-');
            }
            self.next_char();
        }
        let mut seen_dot = false;
        while (0x30..=0x39).contains(&self.current)
            || (self.current == b'.' as i32 && !seen_dot)
        {
            if self.current == b'.' as i32 {
                seen_dot = true;
            }
            buf.push(self.current as u8 as char);
            self.next_char();
        }
        let value = buf.parse::<f64>().unwrap_or_else(|_| {
            log::warn!("malformed number {buf:?}, treating as 0");
            0.0
        });
        Ok(Token::Number(value))
    }

    /// Parses a literal string. Handles nested parentheses, the standard
    /// backslash escapes, octal escapes, and line continuations.
    fn get_string(&mut self) -> PdfResult<Token> {
        debug_assert_eq!(self.current, b'(' as i32);
        let mut depth = 1usize;
        let mut out = Vec::new();
        loop {
            let c = self.next_char();
            match c {
                EOF_CHAR => {
                    log::warn!("unterminated string literal");
                    break;
                }
                _ if c == b'(' as i32 => {
                    depth += 1;
                    out.push(b'(');
                }
                _ if c == b')' as i32 => {
                    depth -= 1;
                    if depth == 0 {
                        self.next_char();
                        break;
                    }
                    out.push(b')');
                }
                _ if c == b'\\' as i32 => {
                    let e = self.next_char();
                    match e {
                        EOF_CHAR => {}
                        _ if e == b'n' as i32 => out.push(b'\n'),
                        _ if e == b'r' as i32 => out.push(b'\r'),
                        _ if e == b't' as i32 => out.push(b'\t'),
                        _ if e == b'b' as i32 => out.push(0x08),
                        _ if e == b'f' as i32 => out.push(0x0C),
                        _ if e == b'(' as i32 => out.push(b'('),
                        _ if e == b')' as i32 => out.push(b')'),
                        _ if e == b'\\' as i32 => out.push(b'\\'),
                        // line continuation: backslash before EOL drops both
                        0x0D => {
                            if self.stream.peek_byte() == Some(0x0A) {
                                self.next_char();
                            }
                        }
                        0x0A => {}
                        // octal escape, one to three digits
                        0x30..=0x37 => {
                            let mut v = (e - 0x30) as u32;
                            for _ in 0..2 {
                                let d = self.stream.peek_byte().map(i32::from).unwrap_or(EOF_CHAR);
                                if (0x30..=0x37).contains(&d) {
                                    self.next_char();
                                    v = v * 8 + (d - 0x30) as u32;
                                } else {
                                    break;
                                }
                            }
                            out.push((v & 0xFF) as u8);
                        }
                        // unknown escape: the character stands for itself
                        _ => out.push(e as u8),
                    }
                }
                _ => out.push(c as u8),
            }
        }
        Ok(Token::String(out))
    }

    /// Parses a hex string. Whitespace is ignored; an odd digit count
    /// gets an implicit trailing zero.
    fn get_hex_string(&mut self) -> PdfResult<Token> {
        let mut out = Vec::new();
        let mut pending: Option<u8> = None;
        loop {
            let c = self.current;
            if c == EOF_CHAR {
                log::warn!("unterminated hex string");
                break;
            }
            if c == b'>' as i32 {
                self.next_char();
                break;
            }
            if let Some(v) = hex_value(c) {
                match pending.take() {
                    Some(hi) => out.push((hi << 4) | v),
                    None => pending = Some(v),
                }
            } else if !is_whitespace(c) {
                log::warn!("invalid character {c:#x} in hex string");
            }
            self.next_char();
        }
        if let Some(hi) = pending {
            out.push(hi << 4);
        }
        Ok(Token::HexString(out))
    }

    fn get_name(&mut self) -> PdfResult<Token> {
        debug_assert_eq!(self.current, b'/' as i32);
        self.next_char();
        let mut out = Vec::new();
        while is_regular(self.current) {
            if self.current == b'#' as i32 {
                let h1 = self.next_char();
                let h2 = self.next_char();
                match (hex_value(h1), hex_value(h2)) {
                    (Some(a), Some(b)) => out.push((a << 4) | b),
                    _ => {
                        // not a valid escape; keep the literal characters
                        out.push(b'#');
                        if h1 != EOF_CHAR {
                            out.push(h1 as u8);
                        }
                        if h2 != EOF_CHAR {
                            out.push(h2 as u8);
                        }
                    }
                }
                self.next_char();
            } else {
                out.push(self.current as u8);
                self.next_char();
            }
        }
        Ok(Token::Name(String::from_utf8_lossy(&out).into_owned()))
    }

    fn get_command(&mut self) -> PdfResult<Token> {
        let mut buf = String::new();
        while is_regular(self.current) {
            buf.push(self.current as u8 as char);
            self.next_char();
        }
        if buf.is_empty() {
            // an unclassifiable byte; consume it so lexing makes progress
            let c = self.current;
            self.next_char();
            return Err(PdfError::Syntax(format!("unexpected byte {c:#x}")));
        }
        Ok(match buf.as_str() {
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "null" => Token::Null,
            _ => Token::Command(buf),
        })
    }
}

use super::error::PdfResult;
use super::lexer::{Lexer, Token};
use super::stream::ByteStream;
use rustc_hash::FxHashMap;

/// Caps how many codes a single `bfrange` entry may expand to.
const MAX_RANGE: u32 = 0x10000;

/// A `/ToUnicode` character map: character code to replacement text.
///
/// Destinations are strings rather than single characters because a
/// code may map to several code points (ligature expansions) or to a
/// non-BMP character written as a UTF-16 surrogate pair.
#[derive(Debug, Default)]
pub struct CMap {
    map: FxHashMap<u32, String>,
}

impl CMap {
    /// Parses the `bfchar`/`bfrange` sections out of a decoded
    /// `/ToUnicode` stream. Everything else in the CMap program
    /// (codespace ranges, CID system info) is irrelevant to text
    /// replacement and is skipped.
    pub fn parse(data: &[u8]) -> PdfResult<CMap> {
        let mut lexer = Lexer::new(ByteStream::new(data.to_vec()));
        let mut cmap = CMap::default();
        loop {
            match lexer.next_token()? {
                Token::Eof => break,
                Token::Command(ref c) if c == "beginbfchar" => {
                    cmap.parse_bfchar(&mut lexer)?;
                }
                Token::Command(ref c) if c == "beginbfrange" => {
                    cmap.parse_bfrange(&mut lexer)?;
                }
                _ => {}
            }
        }
        Ok(cmap)
    }

    fn parse_bfchar(&mut self, lexer: &mut Lexer) -> PdfResult<()> {
        loop {
            let src = match lexer.next_token()? {
                Token::HexString(s) => s,
                Token::Command(ref c) if c == "endbfchar" => return Ok(()),
                Token::Eof => return Ok(()),
                other => {
                    log::warn!("unexpected token in bfchar: {other:?}");
                    continue;
                }
            };
            match lexer.next_token()? {
                Token::HexString(dst) => {
                    self.map.insert(code_of(&src), utf16_of(&dst));
                }
                Token::Command(ref c) if c == "endbfchar" => return Ok(()),
                Token::Eof => return Ok(()),
                other => log::warn!("unexpected bfchar destination: {other:?}"),
            }
        }
    }

    fn parse_bfrange(&mut self, lexer: &mut Lexer) -> PdfResult<()> {
        loop {
            let lo = match lexer.next_token()? {
                Token::HexString(s) => code_of(&s),
                Token::Command(ref c) if c == "endbfrange" => return Ok(()),
                Token::Eof => return Ok(()),
                other => {
                    log::warn!("unexpected token in bfrange: {other:?}");
                    continue;
                }
            };
            let hi = match lexer.next_token()? {
                Token::HexString(s) => code_of(&s),
                Token::Eof => return Ok(()),
                other => {
                    log::warn!("unexpected bfrange bound: {other:?}");
                    continue;
                }
            };
            if hi < lo || hi - lo >= MAX_RANGE {
                log::warn!("ignoring degenerate bfrange {lo:#x}..{hi:#x}");
            }
            match lexer.next_token()? {
                // <lo> <hi> <dst>: destination increments across the range
                Token::HexString(dst) => {
                    if hi >= lo && hi - lo < MAX_RANGE {
                        let mut units = utf16_units(&dst);
                        for code in lo..=hi {
                            self.map.insert(code, String::from_utf16_lossy(&units));
                            if let Some(last) = units.last_mut() {
                                *last = last.wrapping_add(1);
                            }
                        }
                    }
                }
                // <lo> <hi> [<d0> <d1> ...]: one destination per code
                Token::ArrayStart => {
                    let mut code = lo;
                    loop {
                        match lexer.next_token()? {
                            Token::ArrayEnd | Token::Eof => break,
                            Token::HexString(dst) => {
                                if code <= hi {
                                    self.map.insert(code, utf16_of(&dst));
                                }
                                code += 1;
                            }
                            other => log::warn!("unexpected bfrange array item: {other:?}"),
                        }
                    }
                }
                Token::Eof => return Ok(()),
                other => log::warn!("unexpected bfrange destination: {other:?}"),
            }
        }
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

/// Big-endian code value of a hex string (at most four bytes matter).
fn code_of(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|c| {
            if c.len() == 2 {
                u16::from_be_bytes([c[0], c[1]])
            } else {
                c[0] as u16
            }
        })
        .collect()
}

fn utf16_of(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0041> <0048>
<0042> <0065>
endbfchar
1 beginbfrange
<0050> <0052> <006C>
endbfrange
endcmap
end
end";

    #[test]
    fn bfchar_entries() {
        let cmap = CMap::parse(SAMPLE).unwrap();
        assert_eq!(cmap.lookup(0x41), Some("H"));
        assert_eq!(cmap.lookup(0x42), Some("e"));
        assert_eq!(cmap.lookup(0x43), None);
    }

    #[test]
    fn bfrange_increments() {
        let cmap = CMap::parse(SAMPLE).unwrap();
        assert_eq!(cmap.lookup(0x50), Some("l"));
        assert_eq!(cmap.lookup(0x51), Some("m"));
        assert_eq!(cmap.lookup(0x52), Some("n"));
        assert_eq!(cmap.lookup(0x53), None);
    }

    #[test]
    fn bfrange_array_form() {
        let src = b"1 beginbfrange <01> <03> [<0058> <0059> <005A>] endbfrange";
        let cmap = CMap::parse(src).unwrap();
        assert_eq!(cmap.lookup(1), Some("X"));
        assert_eq!(cmap.lookup(2), Some("Y"));
        assert_eq!(cmap.lookup(3), Some("Z"));
    }

    #[test]
    fn surrogate_pair_destination() {
        // U+1D11E (musical G clef) as a UTF-16BE pair
        let src = b"1 beginbfchar <0001> <D834DD1E> endbfchar";
        let cmap = CMap::parse(src).unwrap();
        assert_eq!(cmap.lookup(1), Some("\u{1D11E}"));
    }

    #[test]
    fn multi_char_destination() {
        // one code expanding to an "ffi" ligature replacement
        let src = b"1 beginbfchar <0002> <006600660069> endbfchar";
        let cmap = CMap::parse(src).unwrap();
        assert_eq!(cmap.lookup(2), Some("ffi"));
    }

    #[test]
    fn empty_cmap() {
        let cmap = CMap::parse(b"begincmap endcmap").unwrap();
        assert!(cmap.is_empty());
        assert_eq!(cmap.len(), 0);
    }
}

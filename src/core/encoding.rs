//! Built-in simple-font encodings and glyph-name lookup.
//!
//! Tables map a one-byte character code to a Unicode scalar; `None`
//! marks codes with no assignment (an `EncodingGap` when text actually
//! uses them). The printable ASCII range is shared by all three base
//! encodings; only the deviations are spelled out.

/// A 256-entry code-to-character table.
pub type EncodingTable = [Option<char>; 256];

fn ascii_base() -> EncodingTable {
    let mut table: EncodingTable = [None; 256];
    for code in 0x20..=0x7E {
        table[code as usize] = char::from_u32(code);
    }
    table
}

/// Adobe StandardEncoding.
pub fn standard() -> EncodingTable {
    let mut t = ascii_base();
    // typographic quotes replace the ASCII apostrophe and grave
    t[0x27] = Some('\u{2019}');
    t[0x60] = Some('\u{2018}');
    const HIGH: &[(u8, char)] = &[
        (0xA1, '¡'),
        (0xA2, '¢'),
        (0xA3, '£'),
        (0xA4, '\u{2044}'),
        (0xA5, '¥'),
        (0xA6, '\u{0192}'),
        (0xA7, '§'),
        (0xA8, '¤'),
        (0xA9, '\''),
        (0xAA, '\u{201C}'),
        (0xAB, '«'),
        (0xAC, '\u{2039}'),
        (0xAD, '\u{203A}'),
        (0xAE, '\u{FB01}'),
        (0xAF, '\u{FB02}'),
        (0xB1, '\u{2013}'),
        (0xB2, '\u{2020}'),
        (0xB3, '\u{2021}'),
        (0xB4, '·'),
        (0xB6, '¶'),
        (0xB7, '\u{2022}'),
        (0xB8, '\u{201A}'),
        (0xB9, '\u{201E}'),
        (0xBA, '\u{201D}'),
        (0xBB, '»'),
        (0xBC, '\u{2026}'),
        (0xBD, '\u{2030}'),
        (0xBF, '¿'),
        (0xC1, '`'),
        (0xC2, '´'),
        (0xC3, '\u{02C6}'),
        (0xC4, '\u{02DC}'),
        (0xC5, '¯'),
        (0xC6, '\u{02D8}'),
        (0xC7, '\u{02D9}'),
        (0xC8, '¨'),
        (0xCA, '\u{02DA}'),
        (0xCB, '¸'),
        (0xCD, '\u{02DD}'),
        (0xCE, '\u{02DB}'),
        (0xCF, '\u{02C7}'),
        (0xD0, '\u{2014}'),
        (0xE1, 'Æ'),
        (0xE3, 'ª'),
        (0xE8, 'Ł'),
        (0xE9, 'Ø'),
        (0xEA, 'Œ'),
        (0xEB, 'º'),
        (0xF1, 'æ'),
        (0xF5, '\u{0131}'),
        (0xF8, 'ł'),
        (0xF9, 'ø'),
        (0xFA, 'œ'),
        (0xFB, 'ß'),
    ];
    for &(code, ch) in HIGH {
        t[code as usize] = Some(ch);
    }
    t
}

/// WinAnsiEncoding (Windows code page 1252).
pub fn win_ansi() -> EncodingTable {
    let mut t = ascii_base();
    // 0xA0..=0xFF coincides with Latin-1
    for code in 0xA0u32..=0xFF {
        t[code as usize] = char::from_u32(code);
    }
    const C1: &[(u8, char)] = &[
        (0x80, '\u{20AC}'),
        (0x82, '\u{201A}'),
        (0x83, '\u{0192}'),
        (0x84, '\u{201E}'),
        (0x85, '\u{2026}'),
        (0x86, '\u{2020}'),
        (0x87, '\u{2021}'),
        (0x88, '\u{02C6}'),
        (0x89, '\u{2030}'),
        (0x8A, '\u{0160}'),
        (0x8B, '\u{2039}'),
        (0x8C, '\u{0152}'),
        (0x8E, '\u{017D}'),
        (0x91, '\u{2018}'),
        (0x92, '\u{2019}'),
        (0x93, '\u{201C}'),
        (0x94, '\u{201D}'),
        (0x95, '\u{2022}'),
        (0x96, '\u{2013}'),
        (0x97, '\u{2014}'),
        (0x98, '\u{02DC}'),
        (0x99, '\u{2122}'),
        (0x9A, '\u{0161}'),
        (0x9B, '\u{203A}'),
        (0x9C, '\u{0153}'),
        (0x9E, '\u{017E}'),
        (0x9F, '\u{0178}'),
    ];
    for &(code, ch) in C1 {
        t[code as usize] = Some(ch);
    }
    t
}

/// MacRomanEncoding.
pub fn mac_roman() -> EncodingTable {
    let mut t = ascii_base();
    const HIGH: [char; 128] = [
        'Ä', 'Å', 'Ç', 'É', 'Ñ', 'Ö', 'Ü', 'á', 'à', 'â', 'ä', 'ã', 'å', 'ç', 'é', 'è',
        'ê', 'ë', 'í', 'ì', 'î', 'ï', 'ñ', 'ó', 'ò', 'ô', 'ö', 'õ', 'ú', 'ù', 'û', 'ü',
        '\u{2020}', '°', '¢', '£', '§', '\u{2022}', '¶', 'ß', '®', '©', '\u{2122}', '´',
        '¨', '\u{2260}', 'Æ', 'Ø', '\u{221E}', '±', '\u{2264}', '\u{2265}', '¥', 'µ',
        '\u{2202}', '\u{2211}', '\u{220F}', '\u{03C0}', '\u{222B}', 'ª', 'º', '\u{03A9}',
        'æ', 'ø', '¿', '¡', '¬', '\u{221A}', '\u{0192}', '\u{2248}', '\u{2206}', '«',
        '»', '\u{2026}', '\u{00A0}', 'À', 'Ã', 'Õ', 'Œ', 'œ', '\u{2013}', '\u{2014}',
        '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '÷', '\u{25CA}', 'ÿ', 'Ÿ',
        '\u{2044}', '\u{20AC}', '\u{2039}', '\u{203A}', '\u{FB01}', '\u{FB02}',
        '\u{2021}', '·', '\u{201A}', '\u{201E}', '\u{2030}', 'Â', 'Ê', 'Á', 'Ë', 'È',
        'Í', 'Î', 'Ï', 'Ì', 'Ó', 'Ô', '\u{F8FF}', 'Ò', 'Ú', 'Û', 'Ù', '\u{0131}',
        '\u{02C6}', '\u{02DC}', '¯', '\u{02D8}', '\u{02D9}', '\u{02DA}', '¸',
        '\u{02DD}', '\u{02DB}', '\u{02C7}',
    ];
    for (i, &ch) in HIGH.iter().enumerate() {
        t[0x80 + i] = Some(ch);
    }
    t
}

pub fn by_name(name: &str) -> Option<EncodingTable> {
    match name {
        "StandardEncoding" => Some(standard()),
        "WinAnsiEncoding" => Some(win_ansi()),
        "MacRomanEncoding" => Some(mac_roman()),
        _ => None,
    }
}

/// Resolves an Adobe glyph name (as used in `/Differences` arrays) to a
/// character. Covers the glyph list entries that actually occur in text
/// fonts, plus the `uniXXXX`/`uXXXX` conventions; single-character
/// names stand for themselves.
pub fn glyph_to_char(name: &str) -> Option<char> {
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() == 4 {
            if let Ok(v) = u32::from_str_radix(hex, 16) {
                return char::from_u32(v);
            }
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            if let Ok(v) = u32::from_str_radix(hex, 16) {
                return char::from_u32(v);
            }
        }
    }
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c);
    }
    let ch = match name {
        "space" => ' ',
        "exclam" => '!',
        "quotedbl" => '"',
        "numbersign" => '#',
        "dollar" => '$',
        "percent" => '%',
        "ampersand" => '&',
        "quotesingle" => '\'',
        "parenleft" => '(',
        "parenright" => ')',
        "asterisk" => '*',
        "plus" => '+',
        "comma" => ',',
        "hyphen" => '-',
        "period" => '.',
        "slash" => '/',
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        "colon" => ':',
        "semicolon" => ';',
        "less" => '<',
        "equal" => '=',
        "greater" => '>',
        "question" => '?',
        "at" => '@',
        "bracketleft" => '[',
        "backslash" => '\\',
        "bracketright" => ']',
        "asciicircum" => '^',
        "underscore" => '_',
        "grave" => '`',
        "braceleft" => '{',
        "bar" => '|',
        "braceright" => '}',
        "asciitilde" => '~',
        "quoteleft" => '\u{2018}',
        "quoteright" => '\u{2019}',
        "quotedblleft" => '\u{201C}',
        "quotedblright" => '\u{201D}',
        "quotesinglbase" => '\u{201A}',
        "quotedblbase" => '\u{201E}',
        "guillemotleft" => '«',
        "guillemotright" => '»',
        "guilsinglleft" => '\u{2039}',
        "guilsinglright" => '\u{203A}',
        "endash" => '\u{2013}',
        "emdash" => '\u{2014}',
        "bullet" => '\u{2022}',
        "ellipsis" => '\u{2026}',
        "dagger" => '\u{2020}',
        "daggerdbl" => '\u{2021}',
        "periodcentered" => '·',
        "paragraph" => '¶',
        "section" => '§',
        "copyright" => '©',
        "registered" => '®',
        "trademark" => '\u{2122}',
        "degree" => '°',
        "plusminus" => '±',
        "exclamdown" => '¡',
        "questiondown" => '¿',
        "cent" => '¢',
        "sterling" => '£',
        "yen" => '¥',
        "currency" => '¤',
        "Euro" => '\u{20AC}',
        "florin" => '\u{0192}',
        "fraction" => '\u{2044}',
        "perthousand" => '\u{2030}',
        "minus" => '\u{2212}',
        "multiply" => '×',
        "divide" => '÷',
        "brokenbar" => '¦',
        "mu" => 'µ',
        "nbspace" => '\u{00A0}',
        "fi" => '\u{FB01}',
        "fl" => '\u{FB02}',
        "AE" => 'Æ',
        "ae" => 'æ',
        "OE" => 'Œ',
        "oe" => 'œ',
        "oslash" => 'ø',
        "Oslash" => 'Ø',
        "germandbls" => 'ß',
        "dotlessi" => '\u{0131}',
        "Lslash" => 'Ł',
        "lslash" => 'ł',
        "Aring" => 'Å',
        "aring" => 'å',
        "Agrave" => 'À',
        "agrave" => 'à',
        "Aacute" => 'Á',
        "aacute" => 'á',
        "Acircumflex" => 'Â',
        "acircumflex" => 'â',
        "Atilde" => 'Ã',
        "atilde" => 'ã',
        "Adieresis" => 'Ä',
        "adieresis" => 'ä',
        "Ccedilla" => 'Ç',
        "ccedilla" => 'ç',
        "Egrave" => 'È',
        "egrave" => 'è',
        "Eacute" => 'É',
        "eacute" => 'é',
        "Ecircumflex" => 'Ê',
        "ecircumflex" => 'ê',
        "Edieresis" => 'Ë',
        "edieresis" => 'ë',
        "Igrave" => 'Ì',
        "igrave" => 'ì',
        "Iacute" => 'Í',
        "iacute" => 'í',
        "Icircumflex" => 'Î',
        "icircumflex" => 'î',
        "Idieresis" => 'Ï',
        "idieresis" => 'ï',
        "Ntilde" => 'Ñ',
        "ntilde" => 'ñ',
        "Ograve" => 'Ò',
        "ograve" => 'ò',
        "Oacute" => 'Ó',
        "oacute" => 'ó',
        "Ocircumflex" => 'Ô',
        "ocircumflex" => 'ô',
        "Otilde" => 'Õ',
        "otilde" => 'õ',
        "Odieresis" => 'Ö',
        "odieresis" => 'ö',
        "Ugrave" => 'Ù',
        "ugrave" => 'ù',
        "Uacute" => 'Ú',
        "uacute" => 'ú',
        "Ucircumflex" => 'Û',
        "ucircumflex" => 'û',
        "Udieresis" => 'Ü',
        "udieresis" => 'ü',
        "Yacute" => 'Ý',
        "yacute" => 'ý',
        "ydieresis" => 'ÿ',
        "Ydieresis" => 'Ÿ',
        "Thorn" => 'Þ',
        "thorn" => 'þ',
        "Eth" => 'Ð',
        "eth" => 'ð',
        "Scaron" => '\u{0160}',
        "scaron" => '\u{0161}',
        "Zcaron" => '\u{017D}',
        "zcaron" => '\u{017E}',
        "circumflex" => '\u{02C6}',
        "tilde" => '\u{02DC}',
        "macron" => '¯',
        "breve" => '\u{02D8}',
        "dotaccent" => '\u{02D9}',
        "ring" => '\u{02DA}',
        "cedilla" => '¸',
        "hungarumlaut" => '\u{02DD}',
        "ogonek" => '\u{02DB}',
        "caron" => '\u{02C7}',
        "dieresis" => '¨',
        "acute" => '´',
        "ordfeminine" => 'ª',
        "ordmasculine" => 'º',
        "logicalnot" => '¬',
        "onequarter" => '¼',
        "onehalf" => '½',
        "threequarters" => '¾',
        "onesuperior" => '¹',
        "twosuperior" => '²',
        "threesuperior" => '³',
        _ => return None,
    };
    Some(ch)
}

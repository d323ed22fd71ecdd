//! Stream filter decoding.
//!
//! Supported: FlateDecode (with PNG predictors), ASCIIHexDecode,
//! ASCII85Decode. A filter outside this set raises
//! `PdfError::UnsupportedFilter`, which page-level extraction treats as
//! recoverable.

use super::error::{PdfError, PdfResult};
use super::object::{Dict, PdfObject};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Decodes a stream's payload through its declared `/Filter` chain.
///
/// Filters are applied in the order they are listed; `/DecodeParms`
/// entries (dictionary, or array parallel to the filter array) supply
/// predictor parameters per filter.
pub fn decode_stream(dict: &Dict, data: &[u8]) -> PdfResult<Vec<u8>> {
    let filter = match dict.get("Filter").or_else(|| dict.get("F")) {
        Some(f) => f,
        None => return Ok(data.to_vec()),
    };

    let names: Vec<&str> = match filter {
        PdfObject::Name(n) => vec![n.as_str()],
        PdfObject::Array(items) => items.iter().filter_map(PdfObject::as_name).collect(),
        PdfObject::Null => return Ok(data.to_vec()),
        other => {
            return Err(PdfError::Decode(format!(
                "invalid /Filter entry: {other:?}"
            )));
        }
    };

    let parms = dict.get("DecodeParms").or_else(|| dict.get("DP"));

    let mut current = data.to_vec();
    for (i, name) in names.iter().enumerate() {
        let filter_parms = parms_for(parms, i);
        current = apply_filter(name, filter_parms, &current)?;
    }
    Ok(current)
}

fn parms_for<'a>(parms: Option<&'a PdfObject>, index: usize) -> Option<&'a Dict> {
    match parms? {
        PdfObject::Dictionary(d) if index == 0 => Some(d),
        PdfObject::Array(items) => items.get(index).and_then(PdfObject::as_dict),
        _ => None,
    }
}

fn apply_filter(name: &str, parms: Option<&Dict>, data: &[u8]) -> PdfResult<Vec<u8>> {
    match name {
        "FlateDecode" | "Fl" => {
            let inflated = decode_flate(data)?;
            apply_predictor(parms, inflated)
        }
        "ASCIIHexDecode" | "AHx" => decode_ascii_hex(data),
        "ASCII85Decode" | "A85" => decode_ascii85(data),
        other => Err(PdfError::UnsupportedFilter(other.to_string())),
    }
}

pub fn decode_flate(data: &[u8]) -> PdfResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => Ok(out),
        // salvage whatever inflated before the error; truncated streams
        // are common in the wild
        Err(e) if !out.is_empty() => {
            log::warn!("flate stream ended early ({e}), keeping {} bytes", out.len());
            Ok(out)
        }
        Err(e) => Err(PdfError::Decode(format!("flate: {e}"))),
    }
}

fn apply_predictor(parms: Option<&Dict>, data: Vec<u8>) -> PdfResult<Vec<u8>> {
    let parms = match parms {
        Some(p) => p,
        None => return Ok(data),
    };
    let predictor = parms
        .get("Predictor")
        .and_then(PdfObject::as_int)
        .unwrap_or(1);
    match predictor {
        1 => Ok(data),
        2 => Err(PdfError::Decode("TIFF predictor not supported".into())),
        10..=15 => {
            let colors = parms.get("Colors").and_then(PdfObject::as_int).unwrap_or(1) as usize;
            let bits = parms
                .get("BitsPerComponent")
                .and_then(PdfObject::as_int)
                .unwrap_or(8) as usize;
            let columns = parms
                .get("Columns")
                .and_then(PdfObject::as_int)
                .unwrap_or(1) as usize;
            undo_png_predictor(&data, colors, bits, columns)
        }
        other => Err(PdfError::Decode(format!("unknown predictor {other}"))),
    }
}

/// Reverses PNG row prediction (predictor types None/Sub/Up/Average/
/// Paeth). Each encoded row is one predictor-type byte plus the row
/// data.
pub fn undo_png_predictor(
    data: &[u8],
    colors: usize,
    bits_per_component: usize,
    columns: usize,
) -> PdfResult<Vec<u8>> {
    let pix_bytes = ((colors * bits_per_component) + 7) / 8;
    let row_bytes = ((columns * colors * bits_per_component) + 7) / 8;
    if row_bytes == 0 {
        return Err(PdfError::Decode("predictor row width is zero".into()));
    }
    let stride = row_bytes + 1;

    let mut out = Vec::with_capacity((data.len() / stride) * row_bytes);
    let mut prev = vec![0u8; row_bytes];

    for row in data.chunks_exact(stride) {
        let kind = row[0];
        let raw = &row[1..];
        let base = out.len();
        match kind {
            0 => out.extend_from_slice(raw),
            1 => {
                for i in 0..row_bytes {
                    let left = if i >= pix_bytes { out[base + i - pix_bytes] } else { 0 };
                    out.push(raw[i].wrapping_add(left));
                }
            }
            2 => {
                for i in 0..row_bytes {
                    out.push(raw[i].wrapping_add(prev[i]));
                }
            }
            3 => {
                for i in 0..row_bytes {
                    let left = if i >= pix_bytes { out[base + i - pix_bytes] } else { 0 };
                    let avg = ((left as u16 + prev[i] as u16) / 2) as u8;
                    out.push(raw[i].wrapping_add(avg));
                }
            }
            4 => {
                for i in 0..row_bytes {
                    let left = if i >= pix_bytes { out[base + i - pix_bytes] } else { 0 };
                    let up = prev[i];
                    let up_left = if i >= pix_bytes { prev[i - pix_bytes] } else { 0 };
                    out.push(raw[i].wrapping_add(paeth(left, up, up_left)));
                }
            }
            other => {
                return Err(PdfError::Decode(format!("unknown PNG predictor {other}")));
            }
        }
        prev.copy_from_slice(&out[base..base + row_bytes]);
    }

    if data.len() % stride != 0 {
        log::warn!(
            "predictor data has {} trailing bytes, ignored",
            data.len() % stride
        );
    }
    Ok(out)
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let p = left as i32 + up as i32 - up_left as i32;
    let pa = (p - left as i32).abs();
    let pb = (p - up as i32).abs();
    let pc = (p - up_left as i32).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        up_left
    }
}

/// Two hex digits per byte; whitespace ignored; `>` terminates; an odd
/// final digit implies a trailing zero.
pub fn decode_ascii_hex(data: &[u8]) -> PdfResult<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut pending: Option<u8> = None;
    for &b in data {
        let v = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            b'>' => break,
            _ if (b as i32) == 0 || b.is_ascii_whitespace() => continue,
            other => {
                return Err(PdfError::Decode(format!(
                    "invalid hex character {:#x}",
                    other
                )));
            }
        };
        match pending.take() {
            Some(hi) => out.push((hi << 4) | v),
            None => pending = Some(v),
        }
    }
    if let Some(hi) = pending {
        out.push(hi << 4);
    }
    Ok(out)
}

/// Five characters per four bytes, `z` shorthand for four zero bytes,
/// `~>` terminator. A partial final group of n characters yields n-1
/// bytes.
pub fn decode_ascii85(data: &[u8]) -> PdfResult<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut tuple: u32 = 0;
    let mut count = 0usize;
    for &b in data {
        match b {
            b'~' => break,
            b'z' if count == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                tuple = tuple
                    .checked_mul(85)
                    .and_then(|t| t.checked_add((b - b'!') as u32))
                    .ok_or_else(|| PdfError::Decode("ascii85 group overflow".into()))?;
                count += 1;
                if count == 5 {
                    out.extend_from_slice(&tuple.to_be_bytes());
                    tuple = 0;
                    count = 0;
                }
            }
            _ if b.is_ascii_whitespace() => {}
            other => {
                return Err(PdfError::Decode(format!(
                    "invalid ascii85 character {:#x}",
                    other
                )));
            }
        }
    }
    if count == 1 {
        return Err(PdfError::Decode("truncated ascii85 group".into()));
    }
    if count > 1 {
        for _ in count..5 {
            tuple = tuple.saturating_mul(85).saturating_add(84);
        }
        out.extend_from_slice(&tuple.to_be_bytes()[..count - 1]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn dict_with_filter(name: &str) -> Dict {
        let mut d = Dict::default();
        d.insert("Filter".into(), PdfObject::Name(name.into()));
        d
    }

    #[test]
    fn no_filter_passes_through() {
        let d = Dict::default();
        assert_eq!(decode_stream(&d, b"plain").unwrap(), b"plain");
    }

    #[test]
    fn flate_round_trip() {
        let d = dict_with_filter("FlateDecode");
        let packed = deflate(b"BT (Hello) Tj ET");
        assert_eq!(decode_stream(&d, &packed).unwrap(), b"BT (Hello) Tj ET");
    }

    #[test]
    fn unsupported_filter_is_reported_by_name() {
        let d = dict_with_filter("JBIG2Decode");
        match decode_stream(&d, b"...") {
            Err(PdfError::UnsupportedFilter(name)) => assert_eq!(name, "JBIG2Decode"),
            other => panic!("expected UnsupportedFilter, got {other:?}"),
        }
    }

    #[test]
    fn filter_chain_applies_in_order() {
        // data was flate-compressed, then hex-encoded; decoding reverses
        // in listed order: hex first, then flate
        let packed = deflate(b"chained");
        let hex: String = packed.iter().map(|b| format!("{b:02X}")).collect();
        let mut d = Dict::default();
        d.insert(
            "Filter".into(),
            PdfObject::Array(vec![
                PdfObject::Name("ASCIIHexDecode".into()),
                PdfObject::Name("FlateDecode".into()),
            ]),
        );
        assert_eq!(decode_stream(&d, hex.as_bytes()).unwrap(), b"chained");
    }

    #[test]
    fn ascii_hex() {
        assert_eq!(decode_ascii_hex(b"48 65 6C 6C 6F>").unwrap(), b"Hello");
        assert_eq!(decode_ascii_hex(b"7>").unwrap(), vec![0x70]);
        assert!(decode_ascii_hex(b"4G").is_err());
    }

    #[test]
    fn ascii85() {
        assert_eq!(decode_ascii85(b"9jqo^~>").unwrap(), b"Man ");
        assert_eq!(decode_ascii85(b"z~>").unwrap(), vec![0, 0, 0, 0]);
        // whitespace is insignificant
        assert_eq!(decode_ascii85(b"9jq o^ ~>").unwrap(), b"Man ");
    }

    #[test]
    fn ascii85_partial_group() {
        // three trailing characters decode to two bytes
        assert_eq!(decode_ascii85(b"9jn~>").unwrap(), b"Ma");
    }

    #[test]
    fn png_up_predictor() {
        // two rows, 3 bytes each, Up predictor
        let data = [2, 1, 2, 3, 2, 1, 1, 1];
        let out = undo_png_predictor(&data, 1, 8, 3).unwrap();
        assert_eq!(out, vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn png_sub_predictor() {
        let data = [1, 1, 1, 1];
        let out = undo_png_predictor(&data, 1, 8, 3).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn predictor_via_decode_parms() {
        let raw = [2u8, 5, 5, 2, 1, 1];
        let packed = deflate(&raw);
        let mut parms = Dict::default();
        parms.insert("Predictor".into(), PdfObject::Number(12.0));
        parms.insert("Columns".into(), PdfObject::Number(2.0));
        let mut d = dict_with_filter("FlateDecode");
        d.insert("DecodeParms".into(), PdfObject::Dictionary(parms));
        assert_eq!(decode_stream(&d, &packed).unwrap(), vec![5, 5, 6, 6]);
    }
}

use rustc_hash::FxHashMap;

/// Dictionary storage. PDF names key everything, so a fast string map
/// is used throughout.
pub type Dict = FxHashMap<String, PdfObject>;

/// An indirect object reference (`N G R`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    pub num: u32,
    pub gen: u16,
}

/// A parsed PDF object.
///
/// Numbers are kept as `f64` uniformly; integer-valued entries (object
/// numbers, lengths, counts) go through `as_int`. Stream data is the raw
/// byte payload, still encoded; filters are applied by the decode layer
/// when the content is actually needed.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Boolean(bool),
    Number(f64),
    String(Vec<u8>),
    HexString(Vec<u8>),
    Name(String),
    Array(Vec<PdfObject>),
    Dictionary(Dict),
    Stream { dict: Dict, data: Vec<u8> },
    Reference(ObjRef),
    /// A bare keyword; only meaningful inside content streams.
    Command(String),
    Eof,
}

impl PdfObject {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PdfObject::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as an integer, if it is a whole number.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PdfObject::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PdfObject]> {
        match self {
            PdfObject::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            PdfObject::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// String payload bytes, for either literal or hex form.
    pub fn as_string_bytes(&self) -> Option<&[u8]> {
        match self {
            PdfObject::String(b) | PdfObject::HexString(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjRef> {
        match self {
            PdfObject::Reference(r) => Some(*r),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PdfObject::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_accessor_rejects_fractions() {
        assert_eq!(PdfObject::Number(7.0).as_int(), Some(7));
        assert_eq!(PdfObject::Number(7.5).as_int(), None);
        assert_eq!(PdfObject::Null.as_int(), None);
    }

    #[test]
    fn string_bytes_cover_both_forms() {
        assert_eq!(
            PdfObject::String(b"ab".to_vec()).as_string_bytes(),
            Some(&b"ab"[..])
        );
        assert_eq!(
            PdfObject::HexString(b"ab".to_vec()).as_string_bytes(),
            Some(&b"ab"[..])
        );
        assert_eq!(PdfObject::Name("ab".into()).as_string_bytes(), None);
    }

    #[test]
    fn dict_accessor_covers_streams() {
        let mut d = Dict::default();
        d.insert("Length".into(), PdfObject::Number(3.0));
        let s = PdfObject::Stream {
            dict: d.clone(),
            data: vec![1, 2, 3],
        };
        assert_eq!(s.as_dict().and_then(|d| d.get("Length")?.as_int()), Some(3));
    }
}

use super::error::{PdfError, PdfResult};
use super::filters;
use super::lexer::{Lexer, Token};
use super::object::{Dict, ObjRef, PdfObject};
use super::parser::Parser;
use super::stream::ByteStream;
use lru::LruCache;
use rustc_hash::{FxHashMap, FxHashSet};
use std::num::NonZeroUsize;
use std::rc::Rc;

const OBJECT_CACHE_CAPACITY: usize = 512;

/// One cross-reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    Free,
    /// Object stored at a byte offset in the file.
    Offset { offset: usize, gen: u16 },
    /// Object stored inside a compressed object stream.
    InStream { container: u32, index: u32 },
}

/// Cross-reference machinery: the object-number index, the trailer, and
/// object fetching with a bounded cache.
///
/// Both classic `xref` tables and cross-reference streams are read,
/// following `/Prev` (and hybrid `/XRefStm`) links with the newest
/// section taking priority. When the chain is unusable the whole file
/// is scanned for `N G obj` markers instead; see `recover_by_scan`.
#[derive(Debug)]
pub struct XRef {
    stream: ByteStream,
    entries: FxHashMap<u32, XRefEntry>,
    trailer: Dict,
    cache: LruCache<u32, Rc<PdfObject>>,
    objstm_cache: FxHashMap<u32, Rc<FxHashMap<u32, Rc<PdfObject>>>>,
}

impl XRef {
    pub fn new(stream: ByteStream) -> XRef {
        let capacity =
            NonZeroUsize::new(OBJECT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        XRef {
            stream,
            entries: FxHashMap::default(),
            trailer: Dict::default(),
            cache: LruCache::new(capacity),
            objstm_cache: FxHashMap::default(),
        }
    }

    pub fn stream(&self) -> &ByteStream {
        &self.stream
    }

    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Walks the cross-reference chain starting at the `startxref`
    /// offset, merging every section it reaches.
    pub fn parse(&mut self, start: usize) -> PdfResult<()> {
        let mut pending = vec![start];
        let mut seen: FxHashSet<usize> = FxHashSet::default();
        while let Some(offset) = pending.pop() {
            if !seen.insert(offset) {
                // /Prev loop
                continue;
            }
            let section = self.read_section(offset)?;
            if let Some(prev) = section.get("Prev").and_then(PdfObject::as_int) {
                if let Ok(prev) = usize::try_from(prev) {
                    pending.push(prev);
                }
            }
            if let Some(hybrid) = section.get("XRefStm").and_then(PdfObject::as_int) {
                if let Ok(hybrid) = usize::try_from(hybrid) {
                    pending.push(hybrid);
                }
            }
            for (key, value) in section {
                self.trailer.entry(key).or_insert(value);
            }
        }
        if !self.trailer.contains_key("Root") {
            return Err(PdfError::MalformedStructure(
                "cross-reference chain has no /Root".into(),
            ));
        }
        Ok(())
    }

    /// Reads one section (classic table or xref stream) and returns its
    /// trailer dictionary.
    fn read_section(&mut self, offset: usize) -> PdfResult<Dict> {
        let mut s = self.stream.clone();
        s.seek(offset)?;
        let mut lexer = Lexer::new(s);
        let save = lexer.checkpoint();
        match lexer.next_token()? {
            Token::Command(ref c) if c == "xref" => self.read_table(Parser::new(lexer)),
            _ => {
                lexer.seek(save)?;
                self.read_xref_stream(Parser::new(lexer))
            }
        }
    }

    /// Classic table: subsections of `start count` followed by
    /// twenty-byte entries, terminated by `trailer <<...>>`.
    fn read_table(&mut self, mut parser: Parser) -> PdfResult<Dict> {
        loop {
            let tok = parser.lexer_mut().next_token()?;
            match tok {
                Token::Command(ref c) if c == "trailer" => {
                    return match parser.next_object()? {
                        PdfObject::Dictionary(d) => Ok(d),
                        other => Err(PdfError::Syntax(format!(
                            "expected trailer dictionary, found {other:?}"
                        ))),
                    };
                }
                Token::Number(first) => {
                    let first = integer(first)?;
                    let count = match parser.lexer_mut().next_token()? {
                        Token::Number(n) => integer(n)?,
                        other => {
                            return Err(PdfError::Syntax(format!(
                                "expected subsection count, found {other:?}"
                            )));
                        }
                    };
                    for i in 0..count {
                        self.read_table_entry(&mut parser, (first + i) as u32)?;
                    }
                }
                Token::Eof => {
                    return Err(PdfError::Syntax(
                        "cross-reference table ended before trailer".into(),
                    ));
                }
                other => {
                    return Err(PdfError::Syntax(format!(
                        "unexpected token in cross-reference table: {other:?}"
                    )));
                }
            }
        }
    }

    fn read_table_entry(&mut self, parser: &mut Parser, num: u32) -> PdfResult<()> {
        let a = match parser.lexer_mut().next_token()? {
            Token::Number(n) => integer(n)?,
            other => {
                return Err(PdfError::Syntax(format!(
                    "bad cross-reference entry: {other:?}"
                )));
            }
        };
        let b = match parser.lexer_mut().next_token()? {
            Token::Number(n) => integer(n)?,
            other => {
                return Err(PdfError::Syntax(format!(
                    "bad cross-reference entry: {other:?}"
                )));
            }
        };
        match parser.lexer_mut().next_token()? {
            Token::Command(ref c) if c == "n" => {
                self.insert_entry(
                    num,
                    XRefEntry::Offset {
                        offset: a as usize,
                        gen: b as u16,
                    },
                );
                Ok(())
            }
            Token::Command(ref c) if c == "f" => {
                self.insert_entry(num, XRefEntry::Free);
                Ok(())
            }
            other => Err(PdfError::Syntax(format!(
                "bad cross-reference entry type: {other:?}"
            ))),
        }
    }

    /// Cross-reference stream: binary rows described by `/W`, covering
    /// the object ranges in `/Index` (default `[0 /Size]`).
    fn read_xref_stream(&mut self, mut parser: Parser) -> PdfResult<Dict> {
        let (num, _gen) = parser.read_object_header()?;
        let (dict, data) = match parser.next_object()? {
            PdfObject::Stream { dict, data } => (dict, data),
            other => {
                return Err(PdfError::Syntax(format!(
                    "object {num} is not a cross-reference stream: {other:?}"
                )));
            }
        };
        let decoded = filters::decode_stream(&dict, &data)?;

        let widths: Vec<usize> = dict
            .get("W")
            .and_then(PdfObject::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_int().and_then(|n| usize::try_from(n).ok()))
                    .collect()
            })
            .unwrap_or_default();
        if widths.len() < 3 {
            return Err(PdfError::Syntax("cross-reference stream without /W".into()));
        }
        let (w0, w1, w2) = (widths[0], widths[1], widths[2]);
        let row_len = w0 + w1 + w2;
        if row_len == 0 {
            return Err(PdfError::Syntax("cross-reference stream /W is all zero".into()));
        }

        let size = dict
            .get("Size")
            .and_then(PdfObject::as_int)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0);
        let ranges: Vec<(u32, u32)> = match dict.get("Index").and_then(PdfObject::as_array) {
            Some(items) => items
                .chunks(2)
                .filter_map(|pair| {
                    let first = pair.first()?.as_int()?;
                    let count = pair.get(1)?.as_int()?;
                    Some((u32::try_from(first).ok()?, u32::try_from(count).ok()?))
                })
                .collect(),
            None => vec![(0, size)],
        };

        let mut pos = 0usize;
        'ranges: for (first, count) in ranges {
            for i in 0..count {
                if pos + row_len > decoded.len() {
                    log::warn!("cross-reference stream data ended early");
                    break 'ranges;
                }
                let f0 = if w0 == 0 { 1 } else { read_field(&decoded, pos, w0) };
                let f1 = read_field(&decoded, pos + w0, w1);
                let f2 = read_field(&decoded, pos + w0 + w1, w2);
                pos += row_len;

                let num = first + i;
                let entry = match f0 {
                    0 => XRefEntry::Free,
                    1 => XRefEntry::Offset {
                        offset: f1 as usize,
                        gen: f2 as u16,
                    },
                    2 => XRefEntry::InStream {
                        container: f1 as u32,
                        index: f2 as u32,
                    },
                    other => {
                        log::warn!("unknown cross-reference entry type {other} for object {num}");
                        continue;
                    }
                };
                self.insert_entry(num, entry);
            }
        }
        Ok(dict)
    }

    /// Newest section wins; a `Free` placeholder yields to a concrete
    /// entry from an older section (lenient towards hybrid files).
    fn insert_entry(&mut self, num: u32, entry: XRefEntry) {
        match self.entries.get(&num) {
            None => {
                self.entries.insert(num, entry);
            }
            Some(XRefEntry::Free) if entry != XRefEntry::Free => {
                self.entries.insert(num, entry);
            }
            _ => {}
        }
    }

    /// Rebuilds the index by scanning the raw file for `N G obj`
    /// markers. Used when the cross-reference chain is missing or
    /// unusable; later definitions of an object number win.
    pub fn recover_by_scan(&mut self) -> PdfResult<()> {
        log::warn!("cross-reference chain unusable, scanning file for objects");
        self.entries.clear();
        self.cache.clear();
        self.objstm_cache.clear();

        let mut found: Vec<(u32, u16, usize)> = Vec::new();
        {
            let bytes = self.stream.as_bytes();
            let mut i = 0usize;
            while i + 3 <= bytes.len() {
                if &bytes[i..i + 3] != b"obj" {
                    i += 1;
                    continue;
                }
                let after_ok = match bytes.get(i + 3) {
                    None => true,
                    Some(&b) => {
                        super::lexer::is_whitespace(b as i32)
                            || super::lexer::is_delimiter(b as i32)
                    }
                };
                if !after_ok {
                    i += 1;
                    continue;
                }
                if let Some(hit) = parse_marker_backwards(bytes, i) {
                    found.push(hit);
                }
                i += 3;
            }
        }
        if found.is_empty() {
            return Err(PdfError::MalformedStructure(
                "no objects found in file".into(),
            ));
        }
        for (num, gen, offset) in found {
            self.entries.insert(num, XRefEntry::Offset { offset, gen });
        }

        self.recover_trailer();
        self.index_scanned_object_streams();

        if !self.trailer.contains_key("Root") || !self.root_resolves() {
            self.search_for_catalog();
        }
        if !self.trailer.contains_key("Root") {
            return Err(PdfError::MalformedStructure(
                "no document catalog found by scan".into(),
            ));
        }
        Ok(())
    }

    /// Picks up the last syntactically valid `trailer` dictionary, if
    /// the file still has one.
    fn recover_trailer(&mut self) {
        let mut search_end = self.stream.end_pos();
        while let Some(at) = self.stream.rfind_in(b"trailer", 0, search_end) {
            search_end = at;
            let mut s = self.stream.clone();
            if s.seek(at + b"trailer".len()).is_err() {
                continue;
            }
            let mut parser = Parser::new(Lexer::new(s));
            if let Ok(PdfObject::Dictionary(d)) = parser.next_object() {
                for (key, value) in d {
                    self.trailer.insert(key, value);
                }
                return;
            }
        }
    }

    /// After a scan, objects living inside object streams have no file
    /// offset of their own. Registers `InStream` entries for the
    /// contents of every scanned `/Type /ObjStm` object.
    fn index_scanned_object_streams(&mut self) {
        let mut containers: Vec<u32> = Vec::new();
        let nums: Vec<u32> = self.entries.keys().copied().collect();
        for num in nums {
            if let Ok(obj) = self.fetch(num, 0) {
                let is_objstm = obj
                    .as_dict()
                    .and_then(|d| d.get("Type"))
                    .and_then(PdfObject::as_name)
                    == Some("ObjStm");
                if is_objstm && matches!(*obj, PdfObject::Stream { .. }) {
                    containers.push(num);
                }
            }
        }
        for container in containers {
            match self.load_object_stream(container) {
                Ok(map) => {
                    let contained: Vec<u32> = map.keys().copied().collect();
                    for (index, num) in contained.into_iter().enumerate() {
                        self.entries.entry(num).or_insert(XRefEntry::InStream {
                            container,
                            index: index as u32,
                        });
                    }
                    self.objstm_cache.insert(container, Rc::new(map));
                }
                Err(e) => log::warn!("object stream {container} unusable: {e}"),
            }
        }
    }

    fn root_resolves(&mut self) -> bool {
        let root = match self.trailer.get("Root").cloned() {
            Some(r) => r,
            None => return false,
        };
        match self.fetch_if_ref(&root) {
            Ok(obj) => obj
                .as_dict()
                .map(|d| d.contains_key("Pages") || d.get("Type").and_then(PdfObject::as_name) == Some("Catalog"))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Finds a `/Type /Catalog` dictionary among the scanned objects and
    /// installs it as `/Root`.
    fn search_for_catalog(&mut self) {
        let mut nums: Vec<u32> = self.entries.keys().copied().collect();
        nums.sort_unstable();
        for num in nums {
            let is_catalog = match self.fetch(num, 0) {
                Ok(obj) => {
                    obj.as_dict()
                        .and_then(|d| d.get("Type"))
                        .and_then(PdfObject::as_name)
                        == Some("Catalog")
                }
                Err(_) => false,
            };
            if is_catalog {
                self.trailer.insert(
                    "Root".into(),
                    PdfObject::Reference(ObjRef { num, gen: 0 }),
                );
                return;
            }
        }
    }

    /// Fetches an indirect object by number, through the cache.
    pub fn fetch(&mut self, num: u32, gen: u16) -> PdfResult<Rc<PdfObject>> {
        if let Some(hit) = self.cache.get(&num) {
            return Ok(hit.clone());
        }
        let entry = *self
            .entries
            .get(&num)
            .ok_or(PdfError::ObjectNotFound { num, gen })?;
        let obj = match entry {
            XRefEntry::Free => Rc::new(PdfObject::Null),
            XRefEntry::Offset { offset, .. } => Rc::new(self.parse_object_at(num, offset)?),
            XRefEntry::InStream { container, index } => {
                self.fetch_from_object_stream(num, container, index)?
            }
        };
        self.cache.put(num, obj.clone());
        Ok(obj)
    }

    /// Resolves a reference, or wraps a direct object unchanged.
    pub fn fetch_if_ref(&mut self, obj: &PdfObject) -> PdfResult<Rc<PdfObject>> {
        match obj.as_reference() {
            Some(r) => self.fetch(r.num, r.gen),
            None => Ok(Rc::new(obj.clone())),
        }
    }

    /// Resolved dictionary entry, or `None` when absent or unresolvable.
    pub fn resolve_entry(&mut self, dict: &Dict, key: &str) -> Option<Rc<PdfObject>> {
        let value = dict.get(key)?;
        match self.fetch_if_ref(value) {
            Ok(obj) if !obj.is_null() => Some(obj),
            Ok(_) => None,
            Err(e) => {
                log::warn!("failed to resolve /{key}: {e}");
                None
            }
        }
    }

    fn parse_object_at(&self, num: u32, offset: usize) -> PdfResult<PdfObject> {
        let mut s = self.stream.clone();
        s.seek(offset)?;
        let mut parser = Parser::new(Lexer::new(s));
        let (found_num, _found_gen) = parser.read_object_header()?;
        if found_num != num {
            return Err(PdfError::InvalidXRefEntry { num });
        }
        parser.next_object()
    }

    fn fetch_from_object_stream(
        &mut self,
        num: u32,
        container: u32,
        _index: u32,
    ) -> PdfResult<Rc<PdfObject>> {
        if !self.objstm_cache.contains_key(&container) {
            let map = self.load_object_stream(container)?;
            self.objstm_cache.insert(container, Rc::new(map));
        }
        let map = self
            .objstm_cache
            .get(&container)
            .cloned()
            .ok_or(PdfError::InvalidXRefEntry { num })?;
        map.get(&num)
            .cloned()
            .ok_or(PdfError::InvalidXRefEntry { num })
    }

    /// Parses a `/Type /ObjStm` container into its member objects.
    fn load_object_stream(&mut self, container: u32) -> PdfResult<FxHashMap<u32, Rc<PdfObject>>> {
        // the container itself must live at a direct offset, otherwise
        // the reference chain is circular
        match self.entries.get(&container) {
            Some(XRefEntry::Offset { .. }) => {}
            _ => return Err(PdfError::InvalidXRefEntry { num: container }),
        }
        let cont = self.fetch(container, 0)?;
        let (dict, data) = match &*cont {
            PdfObject::Stream { dict, data } => (dict, data),
            _ => {
                return Err(PdfError::Syntax(format!(
                    "object {container} is not an object stream"
                )));
            }
        };
        let n = dict
            .get("N")
            .and_then(PdfObject::as_int)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| PdfError::Syntax("object stream without /N".into()))?;
        let first = dict
            .get("First")
            .and_then(PdfObject::as_int)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| PdfError::Syntax("object stream without /First".into()))?;
        let decoded = filters::decode_stream(dict, data)?;

        let bs = ByteStream::new(decoded);
        let mut header = Lexer::new(bs.clone());
        let mut pairs: Vec<(u32, usize)> = Vec::with_capacity(n);
        for _ in 0..n {
            let onum = match header.next_token()? {
                Token::Number(v) => integer(v)? as u32,
                other => {
                    return Err(PdfError::Syntax(format!(
                        "bad object stream header: {other:?}"
                    )));
                }
            };
            let ooff = match header.next_token()? {
                Token::Number(v) => integer(v)? as usize,
                other => {
                    return Err(PdfError::Syntax(format!(
                        "bad object stream header: {other:?}"
                    )));
                }
            };
            pairs.push((onum, ooff));
        }

        let mut map = FxHashMap::default();
        for (onum, ooff) in pairs {
            let pos = first + ooff;
            if pos >= bs.end_pos() {
                log::warn!("object {onum} offset outside object stream");
                continue;
            }
            let mut s = bs.clone();
            s.seek(pos)?;
            match Parser::new(Lexer::new(s)).next_object() {
                Ok(obj) => {
                    map.insert(onum, Rc::new(obj));
                }
                Err(e) => log::warn!("object {onum} in stream {container} unreadable: {e}"),
            }
        }
        Ok(map)
    }
}

fn integer(n: f64) -> PdfResult<u64> {
    if n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64 {
        Ok(n as u64)
    } else {
        Err(PdfError::Syntax(format!("expected non-negative integer, found {n}")))
    }
}

fn read_field(data: &[u8], pos: usize, width: usize) -> u64 {
    let mut v = 0u64;
    for &b in &data[pos..pos + width] {
        v = (v << 8) | b as u64;
    }
    v
}

/// Validates and decodes an `N G obj` marker ending at `obj_at`,
/// returning `(num, gen, offset_of_num)`.
fn parse_marker_backwards(bytes: &[u8], obj_at: usize) -> Option<(u32, u16, usize)> {
    let mut j = obj_at;
    // whitespace between gen and `obj`
    let mut saw_space = false;
    while j > 0 && super::lexer::is_whitespace(bytes[j - 1] as i32) {
        j -= 1;
        saw_space = true;
    }
    if !saw_space {
        return None;
    }
    // generation digits
    let gen_end = j;
    while j > 0 && bytes[j - 1].is_ascii_digit() {
        j -= 1;
    }
    if j == gen_end {
        return None;
    }
    let gen_start = j;
    // whitespace between num and gen
    saw_space = false;
    while j > 0 && super::lexer::is_whitespace(bytes[j - 1] as i32) {
        j -= 1;
        saw_space = true;
    }
    if !saw_space {
        return None;
    }
    // object number digits
    let num_end = j;
    while j > 0 && bytes[j - 1].is_ascii_digit() {
        j -= 1;
    }
    if j == num_end {
        return None;
    }
    let num_start = j;
    // the marker must begin a line or follow whitespace
    if num_start > 0 && !super::lexer::is_whitespace(bytes[num_start - 1] as i32) {
        return None;
    }
    let num = std::str::from_utf8(&bytes[num_start..num_end])
        .ok()?
        .parse::<u32>()
        .ok()?;
    let gen = std::str::from_utf8(&bytes[gen_start..gen_end])
        .ok()?
        .parse::<u16>()
        .ok()?;
    Some((num, gen, num_start))
}

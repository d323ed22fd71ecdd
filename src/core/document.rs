use super::error::{PdfError, PdfResult, Warning};
use super::object::{ObjRef, PdfObject};
use super::page::Page;
use super::stream::ByteStream;
use super::xref::XRef;
use rustc_hash::FxHashSet;
use std::rc::Rc;

/// How far from the end of the file `startxref` is searched for.
const STARTXREF_WINDOW: usize = 1024;
/// How far into the file the `%PDF-` header may be preceded by junk.
const HEADER_WINDOW: usize = 1024;

/// A parsed document: the cross-reference layer plus the flattened,
/// ordered page list.
#[derive(Debug)]
pub struct Document {
    xref: XRef,
    pages: Vec<Page>,
    warnings: Vec<Warning>,
}

impl Document {
    /// Parses the document structure out of raw file bytes.
    ///
    /// The cross-reference chain is tried first; if it is missing or
    /// unusable, or yields no resolvable pages, the file is rescanned
    /// for object markers. Only when neither route produces a page does
    /// this fail, with `MalformedStructure`.
    pub fn open(bytes: Vec<u8>) -> PdfResult<Document> {
        let stream = ByteStream::new(bytes);
        if stream.find(b"%PDF-", 0).is_none_or(|at| at > HEADER_WINDOW) {
            log::warn!("missing %PDF- header");
        }

        let mut xref = XRef::new(stream);
        let mut scanned = false;
        let chain_ok = match find_startxref(xref.stream()) {
            Some(offset) => match xref.parse(offset) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("cross-reference parse failed: {e}");
                    false
                }
            },
            None => {
                log::warn!("no startxref found");
                false
            }
        };
        if !chain_ok {
            xref.recover_by_scan()?;
            scanned = true;
        }

        if xref.trailer().contains_key("Encrypt") {
            return Err(PdfError::MalformedStructure(
                "encrypted document".into(),
            ));
        }

        let mut warnings = Vec::new();
        let mut pages = collect_pages(&mut xref, &mut warnings).unwrap_or_default();
        if pages.is_empty() && !scanned {
            // structure parsed but led nowhere; one more chance
            warnings.clear();
            xref.recover_by_scan()?;
            pages = collect_pages(&mut xref, &mut warnings)?;
        }
        if pages.is_empty() {
            return Err(PdfError::MalformedStructure(
                "no pages could be resolved".into(),
            ));
        }
        Ok(Document {
            xref,
            pages,
            warnings,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Warnings recorded while resolving the page tree.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Split borrow for extraction: pages are read while objects are
    /// fetched through the mutable cross-reference layer.
    pub fn parts_mut(&mut self) -> (&[Page], &mut XRef) {
        (&self.pages, &mut self.xref)
    }
}

/// Locates the `startxref` offset near the end of the file.
pub fn find_startxref(stream: &ByteStream) -> Option<usize> {
    let end = stream.end_pos();
    let begin = end.saturating_sub(STARTXREF_WINDOW);
    let at = stream.rfind_in(b"startxref", begin, end)?;
    let mut pos = at + b"startxref".len();
    while matches!(stream.byte_at(pos), Some(b' ' | b'\r' | b'\n' | b'\t')) {
        pos += 1;
    }
    let mut value: Option<usize> = None;
    while let Some(d) = stream.byte_at(pos).filter(u8::is_ascii_digit) {
        value = Some(value.unwrap_or(0) * 10 + (d - b'0') as usize);
        pos += 1;
    }
    value
}

/// Flattens the page tree into document order.
///
/// `/Kids` arrays are walked depth-first; a visited set breaks
/// reference cycles, and unresolvable subtrees are skipped with a
/// warning rather than aborting.
fn collect_pages(xref: &mut XRef, warnings: &mut Vec<Warning>) -> PdfResult<Vec<Page>> {
    let root = xref
        .trailer()
        .get("Root")
        .cloned()
        .ok_or_else(|| PdfError::MalformedStructure("trailer has no /Root".into()))?;
    let catalog = xref
        .fetch_if_ref(&root)
        .map_err(|e| PdfError::MalformedStructure(format!("catalog unresolvable: {e}")))?;
    let catalog_dict = catalog
        .as_dict()
        .ok_or_else(|| PdfError::MalformedStructure("catalog is not a dictionary".into()))?;

    let pages_value = catalog_dict
        .get("Pages")
        .cloned()
        .ok_or_else(|| PdfError::MalformedStructure("catalog has no /Pages".into()))?;
    let pages_ref = pages_value.as_reference();
    let pages_root = xref
        .fetch_if_ref(&pages_value)
        .map_err(|e| PdfError::MalformedStructure(format!("page tree root unresolvable: {e}")))?;

    let mut out = Vec::new();
    let mut visited: FxHashSet<ObjRef> = FxHashSet::default();
    if let Some(r) = pages_ref {
        visited.insert(r);
    }
    walk_page_tree(xref, &pages_root, None, &mut visited, &mut out, warnings);
    Ok(out)
}

fn walk_page_tree(
    xref: &mut XRef,
    node: &Rc<PdfObject>,
    inherited_resources: Option<Rc<PdfObject>>,
    visited: &mut FxHashSet<ObjRef>,
    out: &mut Vec<Page>,
    warnings: &mut Vec<Warning>,
) {
    let dict = match node.as_dict() {
        Some(d) => d,
        None => {
            record_skip(warnings, out.len(), "page tree node is not a dictionary");
            return;
        }
    };

    // own resources shadow inherited ones
    let resources = xref
        .resolve_entry(dict, "Resources")
        .or(inherited_resources);

    let node_type = dict.get("Type").and_then(PdfObject::as_name);
    let kids = dict.get("Kids").cloned();
    let is_tree_node = node_type == Some("Pages") || kids.is_some();

    if !is_tree_node {
        out.push(Page::new(out.len(), node.clone(), resources));
        return;
    }

    let kids = match kids.map(|k| xref.fetch_if_ref(&k)) {
        Some(Ok(resolved)) => resolved,
        Some(Err(e)) => {
            record_skip(warnings, out.len(), &format!("kids unresolvable: {e}"));
            return;
        }
        None => {
            // a /Pages node with no /Kids contributes nothing
            return;
        }
    };
    let kids = match kids.as_array() {
        Some(items) => items.to_vec(),
        None => {
            record_skip(warnings, out.len(), "/Kids is not an array");
            return;
        }
    };

    for kid in kids {
        if let Some(r) = kid.as_reference() {
            if !visited.insert(r) {
                record_skip(
                    warnings,
                    out.len(),
                    &format!("cycle at object {} {}", r.num, r.gen),
                );
                continue;
            }
        }
        match xref.fetch_if_ref(&kid) {
            Ok(child) => walk_page_tree(
                xref,
                &child,
                resources.clone(),
                visited,
                out,
                warnings,
            ),
            Err(e) => record_skip(warnings, out.len(), &format!("kid unresolvable: {e}")),
        }
    }
}

fn record_skip(warnings: &mut Vec<Warning>, page: usize, reason: &str) {
    log::warn!("page {page}: {reason}");
    warnings.push(Warning::PageSkipped {
        page,
        reason: reason.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startxref_is_found_in_tail() {
        let bytes = b"%PDF-1.4\njunk\nstartxref\n  1234\n%%EOF".to_vec();
        let stream = ByteStream::new(bytes);
        assert_eq!(find_startxref(&stream), Some(1234));
    }

    #[test]
    fn startxref_missing() {
        let stream = ByteStream::new(b"%PDF-1.4 nothing else".to_vec());
        assert_eq!(find_startxref(&stream), None);
    }

    #[test]
    fn open_via_scan_when_startxref_is_garbage() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"%PDF-1.4\n");
        bytes.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        bytes.extend_from_slice(
            b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n",
        );
        bytes.extend_from_slice(b"3 0 obj\n<< /Type /Page /Parent 2 0 R >>\nendobj\n");
        bytes.extend_from_slice(b"startxref\n999999\n%%EOF\n");
        let doc = Document::open(bytes).unwrap();
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn open_rejects_pageless_noise() {
        let err = Document::open(b"not a pdf at all".to_vec()).unwrap_err();
        assert!(matches!(err, PdfError::MalformedStructure(_)));
    }

    #[test]
    fn nested_page_tree_keeps_order() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"%PDF-1.4\n");
        bytes.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        bytes.extend_from_slice(
            b"2 0 obj\n<< /Type /Pages /Kids [3 0 R 5 0 R] /Count 3 >>\nendobj\n",
        );
        bytes.extend_from_slice(
            b"3 0 obj\n<< /Type /Pages /Kids [4 0 R] /Count 1 >>\nendobj\n",
        );
        bytes.extend_from_slice(b"4 0 obj\n<< /Type /Page /MediaBox [0 0 10 10] >>\nendobj\n");
        bytes.extend_from_slice(b"5 0 obj\n<< /Type /Page >>\nendobj\n");
        let doc = Document::open(bytes).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages()[0].index(), 0);
        assert_eq!(doc.pages()[1].index(), 1);
    }

    #[test]
    fn cyclic_page_tree_terminates() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"%PDF-1.4\n");
        bytes.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        // the tree node lists itself as a kid after one real page
        bytes.extend_from_slice(
            b"2 0 obj\n<< /Type /Pages /Kids [3 0 R 2 0 R] /Count 1 >>\nendobj\n",
        );
        bytes.extend_from_slice(b"3 0 obj\n<< /Type /Page >>\nendobj\n");
        let mut doc = Document::open(bytes).unwrap();
        assert_eq!(doc.page_count(), 1);
        let warnings = doc.take_warnings();
        assert!(
            warnings
                .iter()
                .any(|w| matches!(w, Warning::PageSkipped { .. }))
        );
    }
}

use super::error::{PdfError, PdfResult};
use super::object::{Dict, PdfObject};
use super::xref::XRef;
use std::rc::Rc;

/// One resolved page: its dictionary plus the resources in effect
/// (own or inherited from the page tree).
#[derive(Debug)]
pub struct Page {
    index: usize,
    object: Rc<PdfObject>,
    resources: Option<Rc<PdfObject>>,
}

impl Page {
    pub fn new(index: usize, object: Rc<PdfObject>, resources: Option<Rc<PdfObject>>) -> Page {
        Page {
            index,
            object,
            resources,
        }
    }

    /// Zero-based position in document order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn dict(&self) -> Option<&Dict> {
        self.object.as_dict()
    }

    pub fn resources(&self) -> Option<&Rc<PdfObject>> {
        self.resources.as_ref()
    }

    /// Resolves `/Contents` into the page's stream objects, in order.
    ///
    /// `/Contents` may be a single stream, a reference to one, or an
    /// array of references whose streams are logically concatenated.
    /// A missing entry is an empty page, not an error; non-stream
    /// values inside the array are skipped.
    pub fn content_streams(&self, xref: &mut XRef) -> PdfResult<Vec<Rc<PdfObject>>> {
        let dict = self
            .dict()
            .ok_or_else(|| PdfError::Syntax("page object is not a dictionary".into()))?;
        let contents = match dict.get("Contents") {
            Some(c) => c,
            None => return Ok(Vec::new()),
        };
        let resolved = xref.fetch_if_ref(contents)?;
        match &*resolved {
            PdfObject::Stream { .. } => Ok(vec![resolved]),
            PdfObject::Array(items) => {
                let mut streams = Vec::with_capacity(items.len());
                for item in items {
                    match xref.fetch_if_ref(item) {
                        Ok(obj) if matches!(*obj, PdfObject::Stream { .. }) => {
                            streams.push(obj);
                        }
                        Ok(other) => {
                            log::warn!(
                                "page {}: /Contents element is not a stream: {other:?}",
                                self.index
                            );
                        }
                        Err(e) => {
                            log::warn!("page {}: /Contents element unresolvable: {e}", self.index);
                        }
                    }
                }
                Ok(streams)
            }
            other => Err(PdfError::Syntax(format!(
                "/Contents is neither stream nor array: {other:?}"
            ))),
        }
    }
}

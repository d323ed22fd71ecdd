#![allow(dead_code)]

//! Assembles small but structurally valid PDF files, with a real
//! cross-reference table and computed byte offsets.

pub struct PdfBuilder {
    bodies: Vec<Vec<u8>>,
}

impl PdfBuilder {
    pub fn new() -> PdfBuilder {
        PdfBuilder { bodies: Vec::new() }
    }

    /// Adds an object and returns its number. Numbers are assigned
    /// sequentially starting at 1, so forward references are easy to
    /// plan out.
    pub fn add_object(&mut self, body: &str) -> u32 {
        self.bodies.push(body.as_bytes().to_vec());
        self.bodies.len() as u32
    }

    /// Adds a stream object with a computed `/Length`. `dict_extra`
    /// lands inside the stream dictionary (`/Filter`, parms).
    pub fn add_stream_object(&mut self, dict_extra: &str, data: &[u8]) -> u32 {
        let mut body = format!("<< /Length {} {} >>\nstream\n", data.len(), dict_extra)
            .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.bodies.push(body);
        self.bodies.len() as u32
    }

    pub fn build(&self, root: u32) -> Vec<u8> {
        self.build_with_startxref(root, None)
    }

    /// Emits the file; `startxref_override` replaces the correct table
    /// offset to simulate a damaged cross-reference chain.
    pub fn build_with_startxref(&self, root: u32, startxref_override: Option<usize>) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(self.bodies.len());
        for (i, body) in self.bodies.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }
        let xref_at = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", self.bodies.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root {root} 0 R >>\nstartxref\n{}\n%%EOF\n",
                self.bodies.len() + 1,
                startxref_override.unwrap_or(xref_at)
            )
            .as_bytes(),
        );
        out
    }
}

/// A document with one page per entry of `page_contents`, sharing a
/// single Type1 font resource named `/F1`.
pub fn simple_doc(page_contents: &[&str]) -> Vec<u8> {
    simple_doc_with(page_contents, "")
}

/// Like [`simple_doc`], with `stream_dict_extra` spliced into every
/// content stream dictionary.
pub fn simple_doc_with(page_contents: &[&str], stream_dict_extra: &str) -> Vec<u8> {
    let n = page_contents.len();
    let mut b = PdfBuilder::new();
    // 1 catalog, 2 pages, 3 font, then per page: content stream, page
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 5 + 2 * i)).collect();
    b.add_object("<< /Type /Catalog /Pages 2 0 R >>");
    b.add_object(&format!(
        "<< /Type /Pages /Kids [{}] /Count {} /Resources << /Font << /F1 3 0 R >> >> >>",
        kids.join(" "),
        n
    ));
    b.add_object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>");
    for content in page_contents {
        let cs = b.add_stream_object(stream_dict_extra, content.as_bytes());
        b.add_object(&format!(
            "<< /Type /Page /Parent 2 0 R /Contents {cs} 0 R >>"
        ));
    }
    b.build(1)
}

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

/// A synthetic document: `pages` pages of `lines` text lines each, with
/// a proper cross-reference table.
fn synthetic_pdf(pages: usize, lines: usize) -> Vec<u8> {
    let mut bodies: Vec<Vec<u8>> = Vec::new();
    let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", 5 + 2 * i)).collect();
    bodies.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    bodies.push(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} /Resources << /Font << /F1 3 0 R >> >> >>",
            kids.join(" "),
            pages
        )
        .into_bytes(),
    );
    bodies.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec());
    for p in 0..pages {
        let mut content = String::from("BT /F1 11 Tf 72 760 Td ");
        for l in 0..lines {
            content.push_str(&format!(
                "(The quick brown fox jumps over the lazy dog, page {p} line {l}.) Tj 0 -13 Td "
            ));
        }
        content.push_str("ET");
        let data = content.into_bytes();
        let mut body = format!("<< /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(&data);
        body.extend_from_slice(b"\nendstream");
        bodies.push(body);
        bodies.push(format!("<< /Type /Page /Parent 2 0 R /Contents {} 0 R >>", 4 + 2 * p).into_bytes());
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in bodies.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }
    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", bodies.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for off in &offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            bodies.len() + 1
        )
        .as_bytes(),
    );
    out
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    for (name, pages, lines) in [("small", 2, 10), ("medium", 20, 40), ("large", 100, 60)] {
        let pdf = synthetic_pdf(pages, lines);
        group.throughput(Throughput::Bytes(pdf.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| pdftext::extract(pdf.clone()).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_extract);
criterion_main!(benches);

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::fmt::Write as _;
use svgform::overlay::{
    DocumentChange, MemoryView, NoopHost, OverlayOptions, OverlaySynchronizer, SvgDocument,
    resolve_fields,
};
use svgform::{DocumentConventions, ScanOptions, presets, scan};

/// A grid of `n` input cells and `n / 4` output cells inside translated groups.
fn generated_document(n: usize) -> String {
    let mut out = String::from(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="2000" height="2000" viewBox="0 0 1000 1000">"#,
    );
    for i in 0..n {
        let (x, y) = ((i % 20) * 50, (i / 20) * 30);
        let _ = write!(
            out,
            r#"<g transform="translate({x}, {y})"><rect id="input-f{i}" width="40" height="20"/></g>"#
        );
        if i % 4 == 0 {
            let _ = write!(
                out,
                r#"<circle id="output-r{i}" cx="{x}" cy="{y}" r="5"/>"#
            );
        }
    }
    out.push_str("</svg>");
    out
}

fn bench_scan(c: &mut Criterion) {
    let rules = presets::default_rules();
    let options = ScanOptions::default();
    let mut group = c.benchmark_group("scan");
    for n in [50usize, 500] {
        let text = generated_document(n);
        group.bench_function(format!("direct_{n}"), |b| {
            b.iter(|| {
                let result = scan(&text, &rules, &options);
                assert!(result.is_ok());
            });
        });
    }
    group.finish();
}

fn bench_resolve_and_sync(c: &mut Criterion) {
    let rules = presets::default_rules();
    let conventions = DocumentConventions::default();
    let mut group = c.benchmark_group("resolve_and_sync");
    for n in [50usize, 500] {
        let text = generated_document(n);
        let mappings = scan(&text, &rules, &ScanOptions::default()).mappings;
        let rendered = SvgDocument::parse(&text).unwrap();
        group.bench_function(format!("resolve_{n}"), |b| {
            b.iter(|| resolve_fields(&rendered, &mappings, &conventions));
        });
        let fields = resolve_fields(&rendered, &mappings, &conventions);
        group.bench_function(format!("sync_rebuild_{n}"), |b| {
            b.iter_batched(
                || OverlaySynchronizer::new(MemoryView::new(), OverlayOptions::default()),
                |mut sync| sync.sync(&fields, DocumentChange::Replaced, &mut NoopHost),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scan, bench_resolve_and_sync);
criterion_main!(benches);

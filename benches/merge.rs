use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

use csp_merge::{PolicyDocument, PolicyManager};

fn make_documents(count: usize) -> Vec<PolicyDocument> {
    // Spread sources over a few directives so unions actually grow, and give
    // every tenth document a conflicting base-uri.
    (0..count)
        .map(|i| {
            let mut rules = json!({
                "default-src": ["'self'"],
                "script-src": [format!("cdn{}.example.com", i % 32)],
                "img-src": [format!("img{i}.example.com"), "'data'"],
            });
            if i % 10 == 0 {
                rules["base-uri"] = json!(format!("base{}.example.com", i % 3));
            }
            PolicyDocument::from_value(rules)
                .unwrap()
                .identified_as(format!("doc-{i}.json"))
        })
        .collect()
}

fn bench_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge/fold");
    for count in [8usize, 64, 256] {
        let documents = make_documents(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &documents, |b, docs| {
            b.iter(|| {
                let mut manager = PolicyManager::with_documents(docs.clone());
                let outcome = manager.merge().unwrap();
                black_box(outcome.document().to_csp_header_value());
            });
        });
    }
    group.finish();
}

fn bench_header(c: &mut Criterion) {
    let mut manager = PolicyManager::with_documents(make_documents(256));
    let merged = manager.merged_document().unwrap().clone();

    c.bench_function("merge/csp_header", |b| {
        b.iter(|| black_box(merged.to_csp_header_value()));
    });
}

criterion_group!(benches, bench_fold, bench_header);
criterion_main!(benches);

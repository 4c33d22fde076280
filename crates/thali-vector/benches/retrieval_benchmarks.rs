//! Benchmarks for building and querying the retrieval index.
//!
//! Uses `MockEmbedding` so the numbers measure splitting, indexing and the
//! brute-force scan rather than model inference.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use thali_vector::embedding::MockEmbedding;
use thali_vector::retrieval::RetrievalIndex;
use thali_vector::splitter::RecursiveTextSplitter;

/// Menu-like text with `sections` paragraphs of ten priced rows each.
fn generate_menu(sections: usize) -> String {
    (0..sections)
        .map(|s| {
            let rows: Vec<String> = (0..10)
                .map(|r| format!("House Dish {} {} .... Rs {}", s, r, 120 + (s * 10 + r) * 7))
                .collect();
            format!("SECTION {}\n{}", s, rows.join("\n"))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn new_index() -> RetrievalIndex {
    let splitter = RecursiveTextSplitter::new(500, 50).expect("valid splitter");
    RetrievalIndex::new(Arc::new(MockEmbedding::new()), splitter)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime")
}

fn bench_build(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("retrieval_build");
    for sections in [4usize, 40] {
        let text = generate_menu(sections);
        group.bench_with_input(BenchmarkId::from_parameter(sections), &text, |b, text| {
            b.iter(|| {
                let mut index = new_index();
                rt.block_on(index.build(black_box(text)))
                    .expect("build succeeds")
            })
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let rt = runtime();
    let mut index = new_index();
    rt.block_on(index.build(&generate_menu(40)))
        .expect("build succeeds");

    c.bench_function("retrieval_search_top4", |b| {
        b.iter(|| {
            rt.block_on(index.search(black_box("spicy chicken under 800"), 4))
                .expect("search succeeds")
        })
    });
}

criterion_group!(benches, bench_build, bench_search);
criterion_main!(benches);

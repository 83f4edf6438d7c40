//! Benchmarks for the free-text score parsers.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use final_cut_backend::scoring::{parse_bare_number, parse_embedded_json, parse_free_text};

const EMBEDDED: &str = "Sure! Here is the evaluation you asked for:\n\
    {\"score\": 77, \"motive_points\": 20, \"method_points\": 22, \"logic_points\": 35}\n\
    Let me know if you need anything else.";

fn bench_parsers(c: &mut Criterion) {
    c.bench_function("embedded_json", |b| {
        b.iter(|| parse_embedded_json(black_box(EMBEDDED)))
    });

    c.bench_function("bare_number", |b| {
        b.iter(|| parse_bare_number(black_box("  88  ")))
    });

    // Worst case: every tier is attempted before the default.
    let prose = "I cannot compute a score for this reasoning. ".repeat(20);
    c.bench_function("free_text_fallback", |b| {
        b.iter(|| parse_free_text(black_box(&prose)))
    });
}

criterion_group!(benches, bench_parsers);
criterion_main!(benches);

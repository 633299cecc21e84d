//! Markdown conversion benchmarks.

use blocksync_bench::{code_text, large_document};
use blocksync_convert::{
    blocks_to_markdown, clean_markdown, markdown_to_blocks, parse_inline, split_code,
};
use blocksync_model::wire::encode_blocks;
use blocksync_testkit::MARKDOWN_FIXTURES;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Benchmark parsing each fixture.
fn bench_parse_fixtures(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for (name, body) in MARKDOWN_FIXTURES {
        group.bench_function(*name, |b| {
            b.iter(|| {
                let blocks = markdown_to_blocks(black_box(body));
                black_box(blocks);
            });
        });
    }

    group.finish();
}

/// Benchmark both directions on documents of growing size.
fn bench_document_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("document");

    for copies in [1, 10, 50] {
        let text = large_document(copies);
        let blocks = markdown_to_blocks(&text);
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_with_input(BenchmarkId::new("to_blocks", copies), &text, |b, text| {
            b.iter(|| black_box(markdown_to_blocks(black_box(text))));
        });
        group.bench_with_input(BenchmarkId::new("to_markdown", copies), &blocks, |b, blocks| {
            b.iter(|| black_box(blocks_to_markdown(black_box(blocks))));
        });
        group.bench_with_input(BenchmarkId::new("encode_wire", copies), &blocks, |b, blocks| {
            b.iter(|| black_box(encode_blocks(black_box(blocks))));
        });
        group.bench_with_input(BenchmarkId::new("clean", copies), &text, |b, text| {
            b.iter(|| black_box(clean_markdown(black_box(text))));
        });
    }

    group.finish();
}

/// Benchmark inline tokenizing.
fn bench_inline(c: &mut Criterion) {
    let mut group = c.benchmark_group("inline");

    group.bench_function("plain", |b| {
        let text = "A sentence with no formatting at all, just words.";
        b.iter(|| black_box(parse_inline(black_box(text))));
    });

    group.bench_function("mixed", |b| {
        let text = "Some **bold**, *italic*, `code`, ~~struck~~ and a [link](https://example.com).";
        b.iter(|| black_box(parse_inline(black_box(text))));
    });

    group.finish();
}

/// Benchmark splitting long code blocks.
fn bench_split_code(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_code");

    for lines in [10, 100, 1000] {
        let text = code_text(lines);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &text, |b, text| {
            b.iter(|| black_box(split_code(black_box(text), "rust")));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_fixtures,
    bench_document_sizes,
    bench_inline,
    bench_split_code
);
criterion_main!(benches);
